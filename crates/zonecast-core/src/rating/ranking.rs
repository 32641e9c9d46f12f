// Role-relative performance ranking from weighted per-metric z-scores.

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::zscore::{compute_pool_stats, compute_zscore, rescale_0_100};
use crate::squad::player::{PlayerRecord, Ranking};
use crate::squad::roles::BaseRole;
use crate::stats::{is_lower_better, FlatStats};

/// Per base role: `"group:metric"` -> weight.
pub type RankWeights = BTreeMap<BaseRole, BTreeMap<String, f64>>;

// ---------------------------------------------------------------------------
// Default weights
// ---------------------------------------------------------------------------

const GK_WEIGHTS: &[(&str, f64)] = &[
    ("keeper:Performance_Save%", 0.35),
    ("keeper:Penalty Kicks_Save%", 0.10),
    ("keeper:Performance_CS%", 0.10),
    ("keeper:Performance_CS", 0.05),
    ("passing:Total_Cmp%", 0.10),
    ("passing_types:Pass Types_Live", 0.05),
    ("passing_types:Outcomes_Cmp", 0.05),
    ("keeper:Performance_Err", -0.05),
    ("keeper_adv:Expected_PSxG+/-", 0.10),
    ("keeper_adv:Crosses_Stp%", 0.05),
    ("keeper_adv:Crosses_Stp", 0.05),
    ("keeper_adv:Sweeper_#OPA/90", 0.10),
];

const CB_WEIGHTS: &[(&str, f64)] = &[
    ("defense:Tkl+Int", 0.20),
    ("defense:Clr", 0.15),
    ("defense:Blocks_Blocks", 0.10),
    ("misc:Aerial Duels_Won%", 0.10),
    ("defense:Err", -0.10),
    ("misc:Performance_2CrdY", -0.05),
    ("misc:Performance_CrdR", -0.05),
    ("passing:Total_Cmp%", 0.05),
    ("passing:Total_PrgDist", 0.05),
    ("possession:Carries_PrgDist", 0.05),
    ("shooting:Expected_xG", 0.025),
    ("goal_shot_creation:SCA_SCA90", 0.025),
];

const FB_WEIGHTS: &[(&str, f64)] = &[
    ("defense:Tackles_Tkl", 0.15),
    ("defense:Int", 0.10),
    ("defense:Blocks_Blocks", 0.10),
    ("defense:Clr", 0.05),
    ("possession:Carries_PrgC", 0.10),
    ("passing:PrgP", 0.10),
    ("passing:Total_Cmp%", 0.10),
    ("passing_types:Pass Types_Crs", 0.05),
    ("misc:Performance_Fls", -0.05),
    ("misc:Performance_CrdY", -0.05),
    ("possession:Carries_Dis", -0.05),
    ("possession:Carries_Mis", -0.05),
];

const DM_WEIGHTS: &[(&str, f64)] = &[
    ("defense:Tackles_Tkl", 0.15),
    ("defense:Int", 0.15),
    ("defense:Tkl+Int", 0.05),
    ("defense:Err", -0.05),
    ("passing:Total_Cmp%", 0.10),
    ("passing:Total_PrgDist", 0.05),
    ("passing:Short_Cmp%", 0.05),
    ("passing:Medium_Cmp%", 0.05),
    ("passing_types:Pass Types_Sw", 0.05),
    ("possession:Carries_PrgDist", 0.05),
    ("misc:Performance_Fls", -0.05),
    ("misc:Performance_CrdY", -0.05),
];

const CM_WEIGHTS: &[(&str, f64)] = &[
    ("defense:Tackles_Tkl", 0.10),
    ("defense:Int", 0.05),
    ("passing:Total_Cmp%", 0.05),
    ("passing:Medium_Cmp%", 0.05),
    ("passing:Long_Cmp%", 0.05),
    ("passing:Total_PrgDist", 0.05),
    ("passing:KP", 0.10),
    ("goal_shot_creation:SCA_SCA90", 0.10),
    ("goal_shot_creation:GCA_GCA90", 0.05),
    ("possession:Carries_PrgDist", 0.05),
    ("possession:Carries_PrgC", 0.05),
    ("misc:Performance_Fls", -0.05),
    ("misc:Performance_CrdY", -0.05),
];

const AM_WEIGHTS: &[(&str, f64)] = &[
    ("goal_shot_creation:SCA_SCA90", 0.15),
    ("goal_shot_creation:GCA_GCA90", 0.10),
    ("passing:KP", 0.10),
    ("passing:Expected_xAG", 0.05),
    ("passing:Expected_xA", 0.05),
    ("passing:1/3", 0.05),
    ("passing:PPA", 0.05),
    ("passing_types:Pass Types_TB", 0.05),
    ("passing:Total_PrgDist", 0.05),
    ("passing:Total_Cmp%", 0.05),
    ("possession:Carries_PrgDist", 0.05),
    ("possession:Carries_PrgC", 0.05),
    ("possession:Carries_Dis", -0.05),
    ("possession:Carries_Mis", -0.05),
    ("defense:Err", -0.05),
    ("misc:Performance_CrdY", -0.05),
];

const W_WEIGHTS: &[(&str, f64)] = &[
    ("possession:Take-Ons_Att", 0.10),
    ("possession:Take-Ons_Succ", 0.10),
    ("possession:Carries_PrgC", 0.10),
    ("possession:Carries_1/3", 0.10),
    ("passing_types:Pass Types_Crs", 0.05),
    ("passing:KP", 0.05),
    ("goal_shot_creation:SCA_SCA90", 0.10),
    ("goal_shot_creation:GCA_GCA90", 0.05),
    ("shooting:Standard_SoT/90", 0.05),
    ("shooting:Expected_xG", 0.025),
    ("possession:Carries_Dis", -0.05),
    ("possession:Carries_Mis", -0.05),
    ("misc:Performance_CrdY", -0.05),
];

const CF_WEIGHTS: &[(&str, f64)] = &[
    ("shooting:Standard_SoT/90", 0.10),
    ("shooting:Standard_G/Sh", 0.10),
    ("shooting:Expected_npxG", 0.10),
    ("shooting:Standard_Gls", 0.10),
    ("passing:KP", 0.05),
    ("goal_shot_creation:SCA_SCA90", 0.05),
    ("possession:Carries_Dis", -0.02),
    ("misc:Performance_Off", -0.02),
    ("misc:Performance_CrdY", -0.01),
];

/// The built-in weight table for every base role.
pub fn default_rank_weights() -> RankWeights {
    let table = |entries: &[(&str, f64)]| {
        entries
            .iter()
            .map(|(key, w)| ((*key).to_string(), *w))
            .collect::<BTreeMap<_, _>>()
    };
    BTreeMap::from([
        (BaseRole::GK, table(GK_WEIGHTS)),
        (BaseRole::CB, table(CB_WEIGHTS)),
        (BaseRole::FB, table(FB_WEIGHTS)),
        (BaseRole::DM, table(DM_WEIGHTS)),
        (BaseRole::CM, table(CM_WEIGHTS)),
        (BaseRole::AM, table(AM_WEIGHTS)),
        (BaseRole::W, table(W_WEIGHTS)),
        (BaseRole::CF, table(CF_WEIGHTS)),
    ])
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Counts from one ranking pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankingReport {
    pub ranked: usize,
    pub unresolved: usize,
    /// Resolved players with none of their role's weighted metrics present.
    pub no_stats: usize,
}

/// Signed contribution of one metric's z-score.
///
/// A lower-is-better metric can only ever reward a below-average value,
/// whatever sign its configured weight carries.
pub fn signed_contribution(key: &str, z: f64, weight: f64) -> f64 {
    if is_lower_better(key) {
        -z * weight.abs()
    } else {
        z * weight
    }
}

#[derive(Debug, Clone)]
pub struct RankingEngine {
    weights: RankWeights,
}

impl Default for RankingEngine {
    fn default() -> Self {
        RankingEngine::new(default_rank_weights())
    }
}

impl RankingEngine {
    pub fn new(weights: RankWeights) -> Self {
        RankingEngine { weights }
    }

    /// Rank every player against the others sharing its base role.
    ///
    /// Overwrites `ranking` on every player, so running it twice over the
    /// same pool gives the same result. Unresolved players and players with
    /// no weighted metric present get `None`.
    pub fn rank(&self, players: &mut [PlayerRecord]) -> RankingReport {
        let mut report = RankingReport::default();
        let flats: Vec<FlatStats> = players.iter().map(|p| p.flat_stats()).collect();

        let mut groups: BTreeMap<BaseRole, Vec<usize>> = BTreeMap::new();
        for (idx, player) in players.iter_mut().enumerate() {
            player.ranking = None;
            match player.base_role() {
                Some(base) => groups.entry(base).or_default().push(idx),
                None => report.unresolved += 1,
            }
        }

        for (base, members) in &groups {
            let Some(weights) = self.weights.get(base) else {
                debug!(role = %base, "no ranking weights for role");
                report.no_stats += members.len();
                continue;
            };

            let mut breakdowns: BTreeMap<usize, BTreeMap<String, f64>> = BTreeMap::new();
            for (key, &weight) in weights {
                let present: Vec<(usize, f64)> = members
                    .iter()
                    .filter_map(|&idx| flats[idx].get(key).map(|&v| (idx, v)))
                    .collect();
                if present.is_empty() {
                    continue;
                }
                let values: Vec<f64> = present.iter().map(|(_, v)| *v).collect();
                let pool = compute_pool_stats(&values);
                for (idx, value) in present {
                    let z = compute_zscore(value, &pool);
                    breakdowns
                        .entry(idx)
                        .or_default()
                        .insert(key.clone(), signed_contribution(key, z, weight));
                }
            }

            for &idx in members {
                match breakdowns.remove(&idx) {
                    Some(breakdown) => {
                        let performance = breakdown.values().sum();
                        players[idx].ranking = Some(Ranking {
                            performance,
                            breakdown,
                        });
                        report.ranked += 1;
                    }
                    None => report.no_stats += 1,
                }
            }
        }

        info!(
            ranked = report.ranked,
            unresolved = report.unresolved,
            no_stats = report.no_stats,
            "ranking pass complete"
        );
        report
    }
}

/// Min-max rescale `performance` across the pool into each player's 0-100
/// `rating`. Players without a ranking get no rating.
pub fn normalize_performance(players: &mut [PlayerRecord]) {
    let scores: Vec<f64> = players
        .iter()
        .filter_map(|p| p.ranking.as_ref().map(|r| r.performance))
        .collect();
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    for player in players.iter_mut() {
        player.rating = player
            .ranking
            .as_ref()
            .map(|r| rescale_0_100(r.performance, min, max));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
