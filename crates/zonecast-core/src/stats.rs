// Stat flattening: nested player stat groups and team stat blocks into flat maps.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A single-level stat map. Player stats are keyed `"group:metric"`, team
/// stats are keyed by row label.
pub type FlatStats = BTreeMap<String, f64>;

/// Nested per-player stats: stat group -> metric label -> value.
pub type StatGroups = BTreeMap<String, BTreeMap<String, f64>>;

/// A selection of stats: stat group -> metric labels within it.
pub type StatSelection = BTreeMap<String, Vec<String>>;

/// Flat keys (`"group:metric"`) named by a selection, in group order.
pub fn selection_keys(selection: &StatSelection) -> Vec<String> {
    selection
        .iter()
        .flat_map(|(group, metrics)| metrics.iter().map(move |m| stat_key(group, m)))
        .collect()
}

/// The stat tables a team (or player) season aggregate is split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatType {
    Standard,
    Keeper,
    KeeperAdv,
    Shooting,
    Passing,
    PassingTypes,
    GoalShotCreation,
    Defense,
    Possession,
    PlayingTime,
    Misc,
}

impl StatType {
    pub const ALL: [StatType; 11] = [
        StatType::Standard,
        StatType::Keeper,
        StatType::KeeperAdv,
        StatType::Shooting,
        StatType::Passing,
        StatType::PassingTypes,
        StatType::GoalShotCreation,
        StatType::Defense,
        StatType::Possession,
        StatType::PlayingTime,
        StatType::Misc,
    ];

    /// Parse the wire name of a stat table (`"keeper_adv"`, `"misc"`, ...).
    pub fn from_name(s: &str) -> Option<Self> {
        StatType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatType::Standard => "standard",
            StatType::Keeper => "keeper",
            StatType::KeeperAdv => "keeper_adv",
            StatType::Shooting => "shooting",
            StatType::Passing => "passing",
            StatType::PassingTypes => "passing_types",
            StatType::GoalShotCreation => "goal_shot_creation",
            StatType::Defense => "defense",
            StatType::Possession => "possession",
            StatType::PlayingTime => "playing_time",
            StatType::Misc => "misc",
        }
    }
}

impl fmt::Display for StatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One labelled value in a team stat block. `rank` is the team's 1-based
/// rank for this label among all teams of the same league/season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRow {
    pub label: String,
    #[serde(default)]
    pub val: Option<f64>,
    #[serde(default)]
    pub rank: Option<u32>,
}

/// A team's season totals for one stat table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStatBlock {
    pub stat_type: StatType,
    pub rows: Vec<StatRow>,
}

impl TeamStatBlock {
    pub fn new(stat_type: StatType, rows: Vec<StatRow>) -> Self {
        TeamStatBlock { stat_type, rows }
    }
}

// ---------------------------------------------------------------------------
// Flattening
// ---------------------------------------------------------------------------

/// Build the flat key for a player stat.
pub fn stat_key(group: &str, metric: &str) -> String {
    format!("{group}:{metric}")
}

/// The metric part of a `"group:metric"` key (the whole key if it has no group).
pub fn metric_name(key: &str) -> &str {
    key.split_once(':').map_or(key, |(_, metric)| metric)
}

/// Flatten nested player stat groups into `"group:metric"` keys.
///
/// Non-finite values are dropped rather than zeroed.
pub fn flatten_groups(groups: &StatGroups) -> FlatStats {
    let mut flat = FlatStats::new();
    for (group, metrics) in groups {
        for (metric, &value) in metrics {
            if value.is_finite() {
                flat.insert(stat_key(group, metric), value);
            }
        }
    }
    flat
}

/// Flatten team stat blocks into `label -> val`, dropping `rank`.
///
/// Rows with a missing or non-finite value are dropped. When two blocks
/// carry the same label the later block wins.
pub fn flatten_blocks(blocks: &[TeamStatBlock]) -> FlatStats {
    let mut flat = FlatStats::new();
    for block in blocks {
        for row in &block.rows {
            let Some(val) = row.val.filter(|v| v.is_finite()) else {
                continue;
            };
            if flat.insert(row.label.clone(), val).is_some() {
                debug!(
                    label = %row.label,
                    stat_type = %block.stat_type,
                    "duplicate team stat label, later block wins"
                );
            }
        }
    }
    flat
}

// ---------------------------------------------------------------------------
// Metric polarity
// ---------------------------------------------------------------------------

/// Metrics where a lower raw value is the better outcome.
const LOWER_IS_BETTER: &[&str] = &[
    "Err",
    "Performance_Err",
    "Carries_Mis",
    "Carries_Dis",
    "Challenges_Lost",
    "Performance_CrdY",
    "Performance_CrdR",
    "Performance_2CrdY",
    "Performance_Fls",
    "Performance_Off",
    "Performance_OG",
    "Performance_PKcon",
    "Aerial Duels_Lost",
    "Take-Ons_Tkld",
    "Take-Ons_Tkld%",
    "Outcomes_Off",
    "Outcomes_Blocks",
    "Goals_GA",
    "Goals_OG",
];

/// Whether the metric behind `key` is one where lower is better.
pub fn is_lower_better(key: &str) -> bool {
    LOWER_IS_BETTER.contains(&metric_name(key))
}

// ---------------------------------------------------------------------------
// Playing time
// ---------------------------------------------------------------------------

/// Keys checked, in order, for a player's minutes played.
pub const MINUTES_KEYS: &[&str] = &[
    "standard:Playing Time_Min",
    "playing_time:Playing Time_Min",
    "standard:Minutes Played",
];

/// Minutes played from flattened player stats; 0.0 when absent.
pub fn minutes_played(flat: &FlatStats) -> f64 {
    MINUTES_KEYS
        .iter()
        .find_map(|key| flat.get(*key).copied())
        .unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
