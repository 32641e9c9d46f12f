// Player record: identity, raw stats and the scores computed for it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::roles::{tag_or_na, BaseRole, Role};
use crate::stats::{flatten_groups, minutes_played, FlatStats, StatGroups};

/// Role-relative performance from the weighted z-score pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub performance: f64,
    /// Per-metric signed contributions, keyed `"group:metric"`.
    pub breakdown: BTreeMap<String, f64>,
}

/// Mental/trait score for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentalScore {
    /// Mean of the player's trait scores.
    pub m_raw: f64,
    /// Percentile of `m_raw` among players of the same base role, 0-100.
    pub m: f64,
    /// Trait name -> trait score.
    pub breakdown: BTreeMap<String, f64>,
}

/// One player's season record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    pub team: String,
    pub league: String,
    pub season: String,
    /// Coarse position (`"DF"`, `"MF,FW"`).
    pub position: String,
    /// Free-text position description.
    #[serde(default)]
    pub position_text: String,
    #[serde(default, with = "tag_or_na")]
    pub role: Option<Role>,
    #[serde(default)]
    pub stats: StatGroups,
    #[serde(default)]
    pub ranking: Option<Ranking>,
    /// 0-100 rating consumed by zones and best-XI selection.
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub mental: Option<MentalScore>,
}

impl PlayerRecord {
    pub fn new(name: &str, team: &str, league: &str, season: &str, position: &str) -> Self {
        PlayerRecord {
            name: name.to_string(),
            team: team.to_string(),
            league: league.to_string(),
            season: season.to_string(),
            position: position.to_string(),
            position_text: String::new(),
            role: None,
            stats: StatGroups::new(),
            ranking: None,
            rating: None,
            mental: None,
        }
    }

    pub fn with_position_text(mut self, text: &str) -> Self {
        self.position_text = text.to_string();
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Insert (or replace) one stat value.
    pub fn with_stat(mut self, group: &str, metric: &str, value: f64) -> Self {
        self.set_stat(group, metric, value);
        self
    }

    pub fn set_stat(&mut self, group: &str, metric: &str, value: f64) {
        self.stats
            .entry(group.to_string())
            .or_default()
            .insert(metric.to_string(), value);
    }

    pub fn flat_stats(&self) -> FlatStats {
        flatten_groups(&self.stats)
    }

    pub fn minutes(&self) -> f64 {
        minutes_played(&self.flat_stats())
    }

    pub fn base_role(&self) -> Option<BaseRole> {
        self.role.map(|r| r.base())
    }

    /// Role tag for display, `"NA"` when unresolved.
    pub fn role_tag(&self) -> &'static str {
        self.role.map_or(tag_or_na::UNRESOLVED, |r| r.as_str())
    }

    /// Clear every computed score, leaving identity and raw stats.
    pub fn clear_scores(&mut self) {
        self.ranking = None;
        self.rating = None;
        self.mental = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_role_serializes_as_na() {
        let player = PlayerRecord::new("Ana Ruiz", "Rovers", "L1", "2024", "MF");
        let json = serde_json::to_value(&player).unwrap();
        assert_eq!(json["role"], "NA");

        let back: PlayerRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back.role, None);
    }

    #[test]
    fn resolved_role_serializes_as_tag() {
        let player = PlayerRecord::new("B", "Rovers", "L1", "2024", "DF").with_role(Role::RCB);
        let json = serde_json::to_value(&player).unwrap();
        assert_eq!(json["role"], "RCB");
        assert_eq!(player.role_tag(), "RCB");
        assert_eq!(player.base_role(), Some(BaseRole::CB));
    }

    #[test]
    fn missing_optional_fields_default() {
        let json = r#"{"name":"C","team":"T","league":"L","season":"2024","position":"FW"}"#;
        let player: PlayerRecord = serde_json::from_str(json).unwrap();
        assert_eq!(player.role, None);
        assert!(player.stats.is_empty());
        assert_eq!(player.minutes(), 0.0);
    }

    #[test]
    fn minutes_read_from_flattened_stats() {
        let player = PlayerRecord::new("D", "T", "L", "2024", "FW")
            .with_stat("standard", "Playing Time_Min", 1234.0);
        assert_eq!(player.minutes(), 1234.0);
    }
}
