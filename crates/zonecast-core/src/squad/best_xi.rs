// Best starting XI: formation search over line depth, then slot assignment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::player::PlayerRecord;
use super::roles::{Line, Role};
use crate::rating::zscore::round_to;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SelectorSettings {
    pub min_minutes: f64,
    pub bench_size: usize,
    /// Optional preference per formation string (`"4-3-3"`), default 1.0.
    pub formation_weights: BTreeMap<String, f64>,
}

impl Default for SelectorSettings {
    fn default() -> Self {
        SelectorSettings {
            min_minutes: 910.0,
            bench_size: 7,
            formation_weights: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SelectionError {
    #[error("no players with a role, a rating and at least {min_minutes} minutes")]
    NoEligiblePlayers { min_minutes: f64 },

    #[error("no eligible goalkeeper")]
    NoGoalkeeper,

    #[error(
        "no formation fits the eligible squad ({defenders} defenders, {midfielders} midfielders, {forwards} forwards)"
    )]
    NoFormationFits {
        defenders: usize,
        midfielders: usize,
        forwards: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XiPlayer {
    /// Slot label in the formation (`"LB"`, `"ST"`) or `"SUB"`.
    pub slot: String,
    pub name: String,
    pub role: Role,
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestXi {
    /// Outfield shape, `"DEF-MID-FWD"`.
    pub formation: String,
    pub score: f64,
    pub starters: Vec<XiPlayer>,
    pub bench: Vec<XiPlayer>,
}

// ---------------------------------------------------------------------------
// Slot templates
// ---------------------------------------------------------------------------

struct SlotTemplate {
    label: &'static str,
    accepts: &'static [Role],
}

const fn slot(label: &'static str, accepts: &'static [Role]) -> SlotTemplate {
    SlotTemplate { label, accepts }
}

const GK_SLOTS: &[SlotTemplate] = &[slot("GK", &[Role::GK])];

const DEF_3: &[SlotTemplate] = &[
    slot("LCB", &[Role::LCB, Role::CB]),
    slot("CB", &[Role::CB]),
    slot("RCB", &[Role::RCB, Role::CB]),
];
const DEF_4: &[SlotTemplate] = &[
    slot("LB", &[Role::LB, Role::LWB, Role::FB]),
    slot("LCB", &[Role::LCB, Role::CB]),
    slot("RCB", &[Role::RCB, Role::CB]),
    slot("RB", &[Role::RB, Role::RWB, Role::FB]),
];
const DEF_5: &[SlotTemplate] = &[
    slot("LWB", &[Role::LWB, Role::LB, Role::FB]),
    slot("LCB", &[Role::LCB, Role::CB]),
    slot("CB", &[Role::CB]),
    slot("RCB", &[Role::RCB, Role::CB]),
    slot("RWB", &[Role::RWB, Role::RB, Role::FB]),
];

const MID_2: &[SlotTemplate] = &[slot("CDM", &[Role::DM, Role::CM]), slot("CDM", &[Role::DM, Role::CM])];
const MID_3: &[SlotTemplate] = &[
    slot("LCM", &[Role::CM]),
    slot("CM", &[Role::DM, Role::CM]),
    slot("RCM", &[Role::CM]),
];
const MID_4: &[SlotTemplate] = &[
    slot("LM", &[Role::AM]),
    slot("LCM", &[Role::CM, Role::DM]),
    slot("RCM", &[Role::CM, Role::DM]),
    slot("RM", &[Role::AM]),
];
const MID_5: &[SlotTemplate] = &[
    slot("LCM", &[Role::CM]),
    slot("CDM", &[Role::DM]),
    slot("RCM", &[Role::CM]),
    slot("LAM", &[Role::AM]),
    slot("RAM", &[Role::AM]),
];

const FWD_1: &[SlotTemplate] = &[slot("ST", &[Role::CF])];
const FWD_2: &[SlotTemplate] = &[slot("CF", &[Role::CF]), slot("ST", &[Role::CF])];
const FWD_3: &[SlotTemplate] = &[
    slot("LW", &[Role::LW, Role::W]),
    slot("ST", &[Role::CF]),
    slot("RW", &[Role::RW, Role::W]),
];
const FWD_4: &[SlotTemplate] = &[
    slot("LW", &[Role::LW, Role::W]),
    slot("CF", &[Role::CF]),
    slot("ST", &[Role::CF]),
    slot("RW", &[Role::RW, Role::W]),
];

fn template(line: Line, count: usize) -> &'static [SlotTemplate] {
    match (line, count) {
        (Line::Goalkeeper, _) => GK_SLOTS,
        (Line::Defence, 3) => DEF_3,
        (Line::Defence, 4) => DEF_4,
        (Line::Defence, _) => DEF_5,
        (Line::Midfield, 2) => MID_2,
        (Line::Midfield, 3) => MID_3,
        (Line::Midfield, 4) => MID_4,
        (Line::Midfield, _) => MID_5,
        (Line::Attack, 1) => FWD_1,
        (Line::Attack, 2) => FWD_2,
        (Line::Attack, 3) => FWD_3,
        (Line::Attack, _) => FWD_4,
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Candidate<'a> {
    name: &'a str,
    role: Role,
    rating: f64,
}

impl Candidate<'_> {
    fn to_xi(&self, slot: &str) -> XiPlayer {
        XiPlayer {
            slot: slot.to_string(),
            name: self.name.to_string(),
            role: self.role,
            rating: self.rating,
        }
    }
}

fn mean(candidates: &[Candidate<'_>]) -> f64 {
    if candidates.is_empty() {
        return 0.0;
    }
    candidates.iter().map(|c| c.rating).sum::<f64>() / candidates.len() as f64
}

/// Fill a line's slots: each slot takes the best-rated remaining player whose
/// role it accepts, or the best-rated remaining player when none match.
fn assign_slots(line: Line, mut players: Vec<Candidate<'_>>) -> Vec<XiPlayer> {
    let mut assigned = Vec::with_capacity(players.len());
    for slot in template(line, players.len()) {
        if players.is_empty() {
            break;
        }
        let pick = players
            .iter()
            .position(|c| slot.accepts.contains(&c.role))
            .unwrap_or(0);
        let candidate = players.remove(pick);
        assigned.push(candidate.to_xi(slot.label));
    }
    assigned
}

#[derive(Debug, Clone, Default)]
pub struct BestXiSelector {
    settings: SelectorSettings,
}

impl BestXiSelector {
    pub fn new(settings: SelectorSettings) -> Self {
        BestXiSelector { settings }
    }

    fn formation_weight(&self, formation: &str) -> f64 {
        self.settings
            .formation_weights
            .get(formation)
            .copied()
            .unwrap_or(1.0)
    }

    /// Pick the highest-scoring XI from `players` (one team).
    ///
    /// Eligible players have a resolved role, a rating and at least the
    /// configured minutes. Fails when no goalkeeper is eligible or no
    /// formation shape can be filled.
    pub fn select(&self, players: &[PlayerRecord]) -> Result<BestXi, SelectionError> {
        let mut eligible: Vec<Candidate<'_>> = players
            .iter()
            .filter_map(|p| {
                let role = p.role?;
                let rating = p.rating.filter(|r| r.is_finite())?;
                (p.minutes() >= self.settings.min_minutes).then_some(Candidate {
                    name: p.name.as_str(),
                    role,
                    rating,
                })
            })
            .collect();
        if eligible.is_empty() {
            return Err(SelectionError::NoEligiblePlayers {
                min_minutes: self.settings.min_minutes,
            });
        }
        eligible.sort_by(|a, b| b.rating.total_cmp(&a.rating).then_with(|| a.name.cmp(b.name)));

        let mut lines: BTreeMap<Line, Vec<Candidate<'_>>> = BTreeMap::new();
        for c in &eligible {
            lines.entry(c.role.line()).or_default().push(c.clone());
        }
        let line = |l: Line| lines.get(&l).map(Vec::as_slice).unwrap_or_default();
        let (gks, defs, mids, fwds) = (
            line(Line::Goalkeeper),
            line(Line::Defence),
            line(Line::Midfield),
            line(Line::Attack),
        );
        let Some(gk) = gks.first() else {
            return Err(SelectionError::NoGoalkeeper);
        };

        let mut best: Option<(f64, usize, usize, usize)> = None;
        for dn in 3..=5usize {
            for mn in 2..=5usize {
                let Some(fw) = 10usize.checked_sub(dn + mn) else {
                    continue;
                };
                if !(1..=4).contains(&fw) {
                    continue;
                }
                if defs.len() < dn || mids.len() < mn || fwds.len() < fw {
                    continue;
                }
                let formation = format!("{dn}-{mn}-{fw}");
                let score = (gk.rating + mean(&defs[..dn]) + mean(&mids[..mn]) + mean(&fwds[..fw])) / 4.0
                    * self.formation_weight(&formation);
                debug!(formation = %formation, score, "formation candidate");
                if best.map_or(true, |(s, ..)| score > s) {
                    best = Some((score, dn, mn, fw));
                }
            }
        }
        let Some((score, dn, mn, fw)) = best else {
            return Err(SelectionError::NoFormationFits {
                defenders: defs.len(),
                midfielders: mids.len(),
                forwards: fwds.len(),
            });
        };

        let mut starters = assign_slots(Line::Goalkeeper, vec![gk.clone()]);
        starters.extend(assign_slots(Line::Defence, defs[..dn].to_vec()));
        starters.extend(assign_slots(Line::Midfield, mids[..mn].to_vec()));
        starters.extend(assign_slots(Line::Attack, fwds[..fw].to_vec()));

        let bench = eligible
            .iter()
            .filter(|c| !starters.iter().any(|s| s.name == c.name))
            .take(self.settings.bench_size)
            .map(|c| c.to_xi("SUB"))
            .collect();

        let formation = format!("{dn}-{mn}-{fw}");
        info!(formation = %formation, score, "best XI selected");
        Ok(BestXi {
            formation,
            score: round_to(score, 2),
            starters,
            bench,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
