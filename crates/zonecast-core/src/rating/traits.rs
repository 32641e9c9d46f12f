// Mental/trait scoring: role-aware trait means, role percentiles, team summaries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::zscore::{percentile_rank, quantile, round_to};
use crate::squad::player::{MentalScore, PlayerRecord};
use crate::squad::roles::BaseRole;
use crate::stats::{is_lower_better, minutes_played};

/// Trait name -> the `"group:metric"` keys averaged into it.
pub type TraitMap = BTreeMap<String, Vec<String>>;

// ---------------------------------------------------------------------------
// Trait tables
// ---------------------------------------------------------------------------

type TraitDef = (&'static str, &'static [&'static str]);

const DISCIPLINE: &[&str] = &[
    "misc:Performance_CrdY",
    "misc:Performance_CrdR",
    "misc:Performance_2CrdY",
    "misc:Performance_Fls",
];

const RECOVERY: &[&str] = &[
    "misc:Performance_Recov",
    "defense:Int",
    "defense:Tackles_Mid 3rd",
];

const CARRY_ERRORS: &[&str] = &[
    "possession:Carries_Mis",
    "possession:Carries_Dis",
    "misc:Performance_Off",
];

/// Traits every role is scored on, on top of its own.
const GLOBAL_TRAITS: &[TraitDef] = &[
    ("Discipline", &["misc:Performance_CrdY", "misc:Performance_CrdR"]),
    ("Team Impact", &["playing_time:Team Success_+/-90"]),
];

const GK_TRAITS: &[TraitDef] = &[
    ("Resilience", &["keeper:Performance_Save%", "keeper_adv:Expected_PSxG+/-"]),
    ("Box Control", &["keeper_adv:Crosses_Stp%", "keeper_adv:Sweeper_#OPA/90", "keeper_adv:Sweeper_AvgDist"]),
    ("Decision Errors", &["defense:Err", "keeper_adv:Goals_GA", "keeper_adv:Goals_OG", "keeper:Performance_PKatt"]),
    ("Discipline", &["misc:Performance_CrdY", "misc:Performance_CrdR", "misc:Performance_2CrdY"]),
];

const CB_TRAITS: &[TraitDef] = &[
    ("Defensive Intelligence", &["defense:Tkl+Int", "defense:Blocks_Sh", "misc:Performance_Recov"]),
    ("Aerial Dominance", &["misc:Aerial Duels_Won%", "defense:Clr"]),
    ("Build-Up Vision", &["passing:PrgP", "passing:Total_Cmp%", "misc:Performance_Off", "possession:Carries_Dis", "possession:Carries_Mis"]),
    ("Decision Errors", &["defense:Err", "misc:Performance_OG"]),
    ("Discipline", DISCIPLINE),
    ("Set-Piece Threat", &["goal_shot_creation:SCA_SCA90", "shooting:Expected_xG"]),
];

const FB_TRAITS: &[TraitDef] = &[
    ("Defensive Responsibility", &["defense:Tackles_Tkl", "defense:Int", "misc:Performance_Recov"]),
    ("Aerial & Clearing", &["misc:Aerial Duels_Won%", "defense:Clr"]),
    ("Build-Up Vision", &["passing:PrgP", "passing:Total_Cmp%", "possession:Carries_PrgC", "possession:Carries_Mis"]),
    ("Errors", &["defense:Err", "misc:Performance_Off", "possession:Carries_Dis"]),
    ("Discipline", DISCIPLINE),
    ("Attacking Contribution", &["passing_types:Pass Types_Crs", "possession:Carries_PrgC", "goal_shot_creation:SCA_SCA90"]),
];

const DM_TRAITS: &[TraitDef] = &[
    ("Defensive Intelligence", &["defense:Int", "defense:Tackles_Mid 3rd", "defense:Tackles_Def 3rd", "misc:Performance_Recov"]),
    ("Build-Up Vision", &["passing:PrgP", "passing:Total_Cmp%", "passing:Medium_Cmp%", "possession:Receiving_PrgR", "possession:Carries_PrgC", "possession:Carries_Mis"]),
    ("Errors", &["defense:Err", "possession:Carries_Dis", "misc:Performance_Off"]),
    ("Discipline", DISCIPLINE),
    ("Positioning & Recovery", RECOVERY),
    ("Attacking Contribution", &["passing:KP", "passing:PrgP", "goal_shot_creation:SCA_SCA90", "possession:Carries_PrgC"]),
];

const CM_TRAITS: &[TraitDef] = &[
    ("Defensive Intelligence", &["defense:Tackles_Mid 3rd", "defense:Tackles_TklW", "defense:Int", "defense:Err"]),
    ("Build-Up Vision", &["passing:PrgP", "passing:Total_Cmp%", "passing:Medium_Cmp%", "passing_types:Pass Types_Sw", "possession:Receiving_PrgR", "possession:Carries_PrgC", "possession:Carries_Mis"]),
    ("Errors", &["possession:Carries_Dis", "misc:Performance_Off", "defense:Err"]),
    ("Discipline", DISCIPLINE),
    ("Positioning & Recovery", RECOVERY),
    ("Attacking Contribution", &["passing:KP", "passing:PrgP", "goal_shot_creation:SCA_SCA90", "possession:Carries_PrgC", "goal_shot_creation:GCA_GCA90"]),
];

const AM_TRAITS: &[TraitDef] = &[
    ("Creativity & Playmaking", &["passing:KP", "passing_types:Pass Types_TB", "passing:Expected_xAG", "goal_shot_creation:GCA_GCA90", "goal_shot_creation:SCA_SCA90"]),
    ("Build-Up & Progression", &["passing:PrgP", "possession:Receiving_PrgR", "possession:Carries_PrgC", "possession:Carries_TotDist"]),
    ("Errors", CARRY_ERRORS),
    ("Discipline", DISCIPLINE),
    ("Positioning & Recovery", RECOVERY),
    ("Attacking Output", &["goal_shot_creation:SCA_SCA90", "goal_shot_creation:GCA_GCA90", "shooting:Expected_xG", "passing:PrgP"]),
];

const W_TRAITS: &[TraitDef] = &[
    ("Explosiveness & Dribbling", &["possession:Carries_PrgC", "possession:Carries_TotDist", "possession:Take-Ons_Att", "possession:Take-Ons_Succ", "possession:Take-Ons_Succ%"]),
    ("Chance Creation & Crossing", &["passing_types:Pass Types_Crs", "goal_shot_creation:SCA_SCA90", "goal_shot_creation:GCA_GCA90", "passing:KP"]),
    ("Finishing & Conversion", &["shooting:Expected_xG", "shooting:Standard_G/SoT", "shooting:Standard_SoT/90", "shooting:Standard_Gls"]),
    ("Errors", CARRY_ERRORS),
    ("Discipline", DISCIPLINE),
    ("Positioning & Recovery", RECOVERY),
];

const CF_TRAITS: &[TraitDef] = &[
    ("Finishing & Conversion", &["shooting:Standard_Gls", "shooting:Expected_xG", "shooting:Standard_G/SoT", "shooting:Standard_SoT/90"]),
    ("Shot Selection & Composure", &["shooting:Standard_SoT%", "shooting:Expected_G-xG", "shooting:Expected_np:G-xG"]),
    ("Creativity & Assists", &["goal_shot_creation:SCA_SCA90", "goal_shot_creation:GCA_GCA90", "passing:KP", "passing:Expected_xAG"]),
    ("Duels & Physical Dominance", &["misc:Aerial Duels_Won%", "misc:Aerial Duels_Won", "misc:Performance_Recov"]),
    ("Errors", CARRY_ERRORS),
    ("Discipline", DISCIPLINE),
];

fn trait_map(defs: &[TraitDef]) -> TraitMap {
    defs.iter()
        .map(|(name, keys)| {
            (
                (*name).to_string(),
                keys.iter().map(|k| (*k).to_string()).collect(),
            )
        })
        .collect()
}

/// Global and per-role trait definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitTable {
    pub global: TraitMap,
    pub by_role: BTreeMap<BaseRole, TraitMap>,
}

impl Default for TraitTable {
    fn default() -> Self {
        TraitTable {
            global: trait_map(GLOBAL_TRAITS),
            by_role: BTreeMap::from([
                (BaseRole::GK, trait_map(GK_TRAITS)),
                (BaseRole::CB, trait_map(CB_TRAITS)),
                (BaseRole::FB, trait_map(FB_TRAITS)),
                (BaseRole::DM, trait_map(DM_TRAITS)),
                (BaseRole::CM, trait_map(CM_TRAITS)),
                (BaseRole::AM, trait_map(AM_TRAITS)),
                (BaseRole::W, trait_map(W_TRAITS)),
                (BaseRole::CF, trait_map(CF_TRAITS)),
            ]),
        }
    }
}

impl TraitTable {
    /// Global traits merged with the role's own. A trait named in both
    /// averages the union of keys; repeated keys count twice.
    pub fn merged(&self, role: BaseRole) -> TraitMap {
        let mut merged = self.global.clone();
        if let Some(own) = self.by_role.get(&role) {
            for (name, keys) in own {
                merged
                    .entry(name.clone())
                    .or_default()
                    .extend(keys.iter().cloned());
            }
        }
        merged
    }
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TraitSettings {
    /// Players below this many minutes get no mental score.
    pub min_minutes: f64,
}

impl Default for TraitSettings {
    fn default() -> Self {
        TraitSettings { min_minutes: 300.0 }
    }
}

/// Why a player was left out of trait scoring.
#[derive(Debug, Clone, PartialEq)]
pub enum TraitExclusion {
    UnresolvedRole,
    BelowMinutes { minutes: f64 },
    NoContributingStats,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraitReport {
    pub scored: usize,
    /// (player name, reason) for everyone not scored.
    pub excluded: Vec<(String, TraitExclusion)>,
}

#[derive(Debug, Clone, Default)]
pub struct TraitScorer {
    table: TraitTable,
    settings: TraitSettings,
}

impl TraitScorer {
    pub fn new(table: TraitTable, settings: TraitSettings) -> Self {
        TraitScorer { table, settings }
    }

    pub fn with_settings(settings: TraitSettings) -> Self {
        TraitScorer::new(TraitTable::default(), settings)
    }

    /// Trait scores for one player, or the reason it has none.
    fn trait_breakdown(
        &self,
        player: &PlayerRecord,
    ) -> Result<(BaseRole, BTreeMap<String, f64>), TraitExclusion> {
        let base = player.base_role().ok_or(TraitExclusion::UnresolvedRole)?;
        let flat = player.flat_stats();
        let minutes = minutes_played(&flat);
        if minutes <= 0.0 || minutes < self.settings.min_minutes {
            return Err(TraitExclusion::BelowMinutes { minutes });
        }

        let mut breakdown = BTreeMap::new();
        for (name, keys) in self.table.merged(base) {
            let values: Vec<f64> = keys
                .iter()
                .filter_map(|key| {
                    let v = *flat.get(key)?;
                    Some(if is_lower_better(key) { -v } else { v })
                })
                .collect();
            if !values.is_empty() {
                breakdown.insert(name, values.iter().sum::<f64>() / values.len() as f64);
            }
        }
        if breakdown.is_empty() {
            return Err(TraitExclusion::NoContributingStats);
        }
        Ok((base, breakdown))
    }

    /// Score every player in place. `mental` is cleared for excluded players.
    pub fn score(&self, players: &mut [PlayerRecord]) -> TraitReport {
        let mut report = TraitReport::default();
        let mut scored: Vec<(usize, BaseRole, f64, BTreeMap<String, f64>)> = Vec::new();

        for (idx, player) in players.iter_mut().enumerate() {
            player.mental = None;
            match self.trait_breakdown(player) {
                Ok((base, breakdown)) => {
                    let m_raw = breakdown.values().sum::<f64>() / breakdown.len() as f64;
                    scored.push((idx, base, m_raw, breakdown));
                }
                Err(reason) => {
                    debug!(player = %player.name, reason = ?reason, "excluded from trait scoring");
                    report.excluded.push((player.name.clone(), reason));
                }
            }
        }

        let mut pools: BTreeMap<BaseRole, Vec<f64>> = BTreeMap::new();
        for (_, base, m_raw, _) in &scored {
            pools.entry(*base).or_default().push(*m_raw);
        }

        for (idx, base, m_raw, breakdown) in scored {
            let pool = pools.get(&base).map(Vec::as_slice).unwrap_or_default();
            players[idx].mental = Some(MentalScore {
                m_raw,
                m: round_to(percentile_rank(pool, m_raw), 1),
                breakdown,
            });
            report.scored += 1;
        }

        info!(
            scored = report.scored,
            excluded = report.excluded.len(),
            "trait scoring complete"
        );
        report
    }
}

// ---------------------------------------------------------------------------
// Team summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedScore {
    pub name: String,
    pub m: f64,
}

/// Mental profile of one team's trait-scored players.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMentalSummary {
    pub team: String,
    pub avg_m: f64,
    /// Interquartile range of `m` with four or more players, max-min otherwise.
    pub spread_m: f64,
    pub count: usize,
    pub leader: NamedScore,
    pub weakest: NamedScore,
}

/// Summarize `team`'s mental scores. `None` when no player of the team has one.
pub fn summarize_team(team: &str, players: &[PlayerRecord]) -> Option<TeamMentalSummary> {
    let mut scored: Vec<(&str, f64)> = players
        .iter()
        .filter(|p| p.team == team)
        .filter_map(|p| p.mental.as_ref().map(|m| (p.name.as_str(), m.m)))
        .collect();
    if scored.is_empty() {
        return None;
    }
    scored.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));

    let values: Vec<f64> = scored.iter().map(|(_, m)| *m).collect();
    let count = values.len();
    let avg_m = values.iter().sum::<f64>() / count as f64;
    let spread_m = if count >= 4 {
        let q1 = quantile(&values, 0.25).unwrap_or(0.0);
        let q3 = quantile(&values, 0.75).unwrap_or(0.0);
        q3 - q1
    } else {
        values[count - 1] - values[0]
    };

    let (weakest_name, weakest_m) = scored[0];
    let (leader_name, leader_m) = scored[count - 1];
    Some(TeamMentalSummary {
        team: team.to_string(),
        avg_m: round_to(avg_m, 1),
        spread_m: round_to(spread_m, 1),
        count,
        leader: NamedScore {
            name: leader_name.to_string(),
            m: leader_m,
        },
        weakest: NamedScore {
            name: weakest_name.to_string(),
            m: weakest_m,
        },
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::squad::roles::Role;

    fn cb(name: &str, minutes: f64, tkl_int: f64, crdy: f64) -> PlayerRecord {
        PlayerRecord::new(name, "Rovers", "L", "2024", "DF")
            .with_role(Role::CB)
            .with_stat("standard", "Playing Time_Min", minutes)
            .with_stat("defense", "Tkl+Int", tkl_int)
            .with_stat("misc", "Performance_CrdY", crdy)
    }

    #[test]
    fn merged_extends_shared_traits() {
        let table = TraitTable::default();
        let merged = table.merged(BaseRole::CB);
        let discipline = &merged["Discipline"];
        // two global keys followed by the four CB keys
        assert_eq!(discipline.len(), 6);
        assert_eq!(
            discipline.iter().filter(|k| *k == "misc:Performance_CrdY").count(),
            2
        );
        assert!(merged.contains_key("Team Impact"));
        assert!(merged.contains_key("Aerial Dominance"));
    }

    #[test]
    fn zero_minute_player_is_excluded() {
        let mut players = vec![cb("Starter", 2000.0, 60.0, 3.0), cb("Unused", 0.0, 0.0, 0.0)];
        let report = TraitScorer::default().score(&mut players);
        assert!(players[0].mental.is_some());
        assert!(players[1].mental.is_none());
        assert_eq!(report.scored, 1);
        assert_eq!(
            report.excluded,
            vec![("Unused".to_string(), TraitExclusion::BelowMinutes { minutes: 0.0 })]
        );
    }

    #[test]
    fn zero_minutes_excluded_even_without_threshold() {
        let scorer = TraitScorer::with_settings(TraitSettings { min_minutes: 0.0 });
        let mut players = vec![cb("Unused", 0.0, 10.0, 0.0)];
        scorer.score(&mut players);
        assert!(players[0].mental.is_none());
    }

    #[test]
    fn unresolved_role_is_excluded() {
        let mut players = vec![PlayerRecord::new("X", "Rovers", "L", "2024", "??")
            .with_stat("standard", "Playing Time_Min", 2000.0)];
        let report = TraitScorer::default().score(&mut players);
        assert_eq!(report.excluded[0].1, TraitExclusion::UnresolvedRole);
    }

    #[test]
    fn player_without_trait_stats_is_excluded() {
        let mut players = vec![PlayerRecord::new("X", "Rovers", "L", "2024", "DF")
            .with_role(Role::CB)
            .with_stat("standard", "Playing Time_Min", 2000.0)];
        let report = TraitScorer::default().score(&mut players);
        assert_eq!(report.excluded[0].1, TraitExclusion::NoContributingStats);
    }

    #[test]
    fn lower_is_better_keys_are_negated() {
        let mut players = vec![cb("A", 2000.0, 60.0, 4.0)];
        TraitScorer::default().score(&mut players);
        let mental = players[0].mental.as_ref().unwrap();
        // Discipline = mean(-4, -4) from the global and CB lists
        assert_eq!(mental.breakdown["Discipline"], -4.0);
        assert_eq!(mental.breakdown["Defensive Intelligence"], 60.0);
        assert_eq!(mental.m_raw, 28.0);
    }

    #[test]
    fn m_is_percentile_within_role() {
        let mut players = vec![
            cb("Low", 2000.0, 10.0, 4.0),
            cb("Mid", 2000.0, 40.0, 4.0),
            cb("High", 2000.0, 90.0, 4.0),
            cb("Top", 2000.0, 120.0, 4.0),
        ];
        TraitScorer::default().score(&mut players);
        let m: Vec<f64> = players.iter().map(|p| p.mental.as_ref().unwrap().m).collect();
        assert_eq!(m, vec![25.0, 50.0, 75.0, 100.0]);
    }

    #[test]
    fn team_summary_uses_iqr_with_four_players() {
        let mut players = vec![
            cb("Low", 2000.0, 10.0, 4.0),
            cb("Mid", 2000.0, 40.0, 4.0),
            cb("High", 2000.0, 90.0, 4.0),
            cb("Top", 2000.0, 120.0, 4.0),
        ];
        TraitScorer::default().score(&mut players);
        let summary = summarize_team("Rovers", &players).unwrap();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.avg_m, 62.5);
        // m = [25, 50, 75, 100]: q1 = 43.75, q3 = 81.25
        assert_eq!(summary.spread_m, 37.5);
        assert_eq!(summary.leader.name, "Top");
        assert_eq!(summary.weakest.name, "Low");
    }

    #[test]
    fn team_summary_uses_range_below_four_players() {
        let mut players = vec![cb("Low", 2000.0, 10.0, 4.0), cb("High", 2000.0, 90.0, 4.0)];
        TraitScorer::default().score(&mut players);
        let summary = summarize_team("Rovers", &players).unwrap();
        assert_eq!(summary.spread_m, 50.0);
        assert!(summarize_team("Nobody", &players).is_none());
    }
}
