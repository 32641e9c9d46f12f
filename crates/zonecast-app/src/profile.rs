// Per-key zone profile: the mutable scoring configuration kept in the store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use zonecast_core::rating::line_score::{default_score_config, ScoreConfig};
use zonecast_core::rating::{default_rank_weights, RankWeights, RankingEngine};
use zonecast_core::squad::roles::{Role, RoleResolver};
use zonecast_core::zones::config::default_zone_config;
use zonecast_core::zones::{ZoneAggregator, ZoneConfigMap, ZoneId, ZoneScalers, ZoneSettings};

/// Zone definitions, scalers, ranking weights, line-score table and
/// compound-role overrides for one user (or the shared `"default"` key).
///
/// Every field is optional on disk; absent fields take the built-in tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneProfile {
    pub zone_config: ZoneConfigMap,
    pub zone_scalers: ZoneScalers,
    /// Per base role: `"group:metric"` -> ranking weight.
    pub rank_weights: RankWeights,
    pub score_config: ScoreConfig,
    /// Extra or replacement entries for the compound position table.
    pub compound_roles: BTreeMap<String, Role>,
}

impl Default for ZoneProfile {
    fn default() -> Self {
        ZoneProfile {
            zone_config: default_zone_config(),
            zone_scalers: ZoneScalers::new(),
            rank_weights: default_rank_weights(),
            score_config: default_score_config(),
            compound_roles: BTreeMap::new(),
        }
    }
}

impl ZoneProfile {
    pub fn ranking_engine(&self) -> RankingEngine {
        RankingEngine::new(self.rank_weights.clone())
    }

    pub fn resolver(&self) -> RoleResolver {
        RoleResolver::with_overrides(&self.compound_roles)
    }

    pub fn aggregator(&self, settings: &ZoneSettings) -> ZoneAggregator {
        ZoneAggregator::new(
            self.zone_config.clone(),
            self.zone_scalers.clone(),
            settings.clone(),
        )
    }

    /// Set one scaler, creating the zone entry as needed.
    pub fn set_scaler(&mut self, zone: ZoneId, label: &str, value: f64) {
        self.zone_scalers
            .entry(zone)
            .or_default()
            .insert(label.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonecast_core::squad::roles::BaseRole;

    #[test]
    fn empty_json_takes_builtin_tables() {
        let profile: ZoneProfile = serde_json::from_str("{}").unwrap();
        assert_eq!(profile, ZoneProfile::default());
        assert_eq!(profile.zone_config.len(), 15);
        assert!(!profile.score_config.is_empty());
        assert_eq!(profile.rank_weights, default_rank_weights());
    }

    #[test]
    fn partial_json_keeps_given_fields() {
        let json = r#"{
            "zone_scalers": {"defCentral": {"Tkl+Int": 0.5}},
            "compound_roles": {"SW": "CB"}
        }"#;
        let profile: ZoneProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.zone_scalers[&ZoneId::DefCentral]["Tkl+Int"], 0.5);
        assert_eq!(profile.zone_config.len(), 15);
        assert_eq!(
            profile.resolver().resolve("Position: DF (SW)", "DF"),
            Some(Role::CB)
        );
    }

    #[test]
    fn rank_weights_replace_the_builtin_table() {
        let json = r#"{"rank_weights": {"GK": {"keeper:Performance_Save%": 2.0}}}"#;
        let profile: ZoneProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.rank_weights.len(), 1);
        assert_eq!(
            profile.rank_weights[&BaseRole::GK]["keeper:Performance_Save%"],
            2.0
        );
    }

    #[test]
    fn profile_survives_json() {
        let mut profile = ZoneProfile::default();
        profile.set_scaler(ZoneId::AttCentral, "Expected_xG", 1.5);
        let json = serde_json::to_string(&profile).unwrap();
        let back: ZoneProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, profile);
    }
}
