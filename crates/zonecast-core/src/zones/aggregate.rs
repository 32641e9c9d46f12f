// Zone aggregation: team stats, opponent-faced stats and player ratings
// folded into one 0-100 rating per pitch zone.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::config::{ZoneConfig, ZoneConfigMap, ZoneScalers, ZoneSettings};
use super::layout::ZoneId;
use crate::rating::zscore::round_to;
use crate::squad::player::PlayerRecord;
use crate::squad::roles::Role;
use crate::stats::{flatten_blocks, FlatStats, StatSelection, TeamStatBlock};

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Team or against component of a zone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatComponent {
    /// Normalized 0-100 score, `None` when no configured stat was present.
    pub score: Option<f64>,
    pub raw: Option<f64>,
    /// Labels that contributed positively.
    pub pros: Vec<String>,
    /// Labels that contributed negatively.
    pub cons: Vec<String>,
    /// Blend weight actually applied.
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub name: String,
    pub role: Role,
    pub rating: f64,
    pub minutes: f64,
    pub position_weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerComponent {
    pub score: Option<f64>,
    pub raw: Option<f64>,
    pub weight: f64,
    pub contributions: Vec<Contribution>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneBreakdown {
    pub team: StatComponent,
    pub against: StatComponent,
    pub players: PlayerComponent,
}

/// One team's computed rating for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneData {
    pub label: String,
    /// Final blended rating in [0, 100].
    pub rating: f64,
    pub breakdown: ZoneBreakdown,
}

impl ZoneData {
    /// A zone carrying only a final rating.
    pub fn with_rating(label: &str, rating: f64) -> Self {
        ZoneData {
            label: label.to_string(),
            rating,
            breakdown: ZoneBreakdown::default(),
        }
    }
}

pub type ZoneMap = BTreeMap<ZoneId, ZoneData>;

/// A zone that could not be scored. The zone is left out of the result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ZoneError {
    #[error("zone {zone}: invalid position weight {weight} for {role}")]
    InvalidPositionWeight { zone: ZoneId, role: Role, weight: f64 },

    #[error("zone {zone}: invalid scaler {value} for {label}")]
    InvalidScaler {
        zone: ZoneId,
        label: String,
        value: f64,
    },

    #[error("zone {zone}: {component} score is not finite")]
    NonFinite {
        zone: ZoneId,
        component: &'static str,
    },

    #[error("zone {zone}: no team, against or player data")]
    NoData { zone: ZoneId },
}

// ---------------------------------------------------------------------------
// Raw scoring
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RawStat {
    raw: Option<f64>,
    pros: Vec<String>,
    cons: Vec<String>,
}

#[derive(Debug)]
struct RawZone {
    zone: ZoneId,
    label: String,
    team: RawStat,
    against: RawStat,
    players: Option<f64>,
    contributions: Vec<Contribution>,
}

fn labels(selection: &StatSelection) -> impl Iterator<Item = &String> {
    selection.values().flatten()
}

/// Pros minus cons over the labels present in `flat`, each scaled.
fn stat_score(
    zone: ZoneId,
    component: &'static str,
    pros: &StatSelection,
    cons: &StatSelection,
    flat: &FlatStats,
    scalers: Option<&BTreeMap<String, f64>>,
) -> Result<RawStat, ZoneError> {
    let scale = |label: &String| scalers.and_then(|s| s.get(label)).copied().unwrap_or(1.0);

    let mut out = RawStat::default();
    let mut total = 0.0;
    for label in labels(pros) {
        if let Some(v) = flat.get(label) {
            total += v * scale(label);
            out.pros.push(label.clone());
        }
    }
    for label in labels(cons) {
        if let Some(v) = flat.get(label) {
            total -= v * scale(label);
            out.cons.push(label.clone());
        }
    }
    if out.pros.is_empty() && out.cons.is_empty() {
        return Ok(out);
    }
    if !total.is_finite() {
        return Err(ZoneError::NonFinite { zone, component });
    }
    out.raw = Some(total);
    Ok(out)
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ZoneAggregator {
    config: ZoneConfigMap,
    scalers: ZoneScalers,
    settings: ZoneSettings,
}

impl ZoneAggregator {
    pub fn new(config: ZoneConfigMap, scalers: ZoneScalers, settings: ZoneSettings) -> Self {
        ZoneAggregator {
            config,
            scalers,
            settings,
        }
    }

    fn validate(&self, zone: ZoneId, cfg: &ZoneConfig) -> Result<(), ZoneError> {
        for (&role, &weight) in &cfg.positions {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ZoneError::InvalidPositionWeight { zone, role, weight });
            }
        }
        if let Some(scalers) = self.scalers.get(&zone) {
            for (label, &value) in scalers {
                if !value.is_finite() {
                    return Err(ZoneError::InvalidScaler {
                        zone,
                        label: label.clone(),
                        value,
                    });
                }
            }
        }
        Ok(())
    }

    /// Minutes-weighted, position-weighted player rating for a zone.
    fn player_score(
        &self,
        zone: ZoneId,
        cfg: &ZoneConfig,
        players: &[PlayerRecord],
    ) -> Result<(Option<f64>, Vec<Contribution>), ZoneError> {
        let mut contributions = Vec::new();
        for player in players {
            let (Some(role), Some(rating)) = (player.role, player.rating) else {
                continue;
            };
            if !rating.is_finite() {
                continue;
            }
            let position_weight = self.settings.position_weight(role, &cfg.positions);
            if position_weight <= 0.0 {
                continue;
            }
            contributions.push(Contribution {
                name: player.name.clone(),
                role,
                rating,
                minutes: player.minutes(),
                position_weight,
            });
        }
        if contributions.is_empty() {
            return Ok((None, contributions));
        }

        let total_minutes: f64 = contributions.iter().map(|c| c.minutes).sum();
        let total_minutes = if total_minutes > 0.0 { total_minutes } else { 1.0 };
        let raw: f64 = contributions
            .iter()
            .map(|c| c.rating * c.position_weight * (c.minutes / total_minutes))
            .sum();
        if !raw.is_finite() {
            return Err(ZoneError::NonFinite {
                zone,
                component: "players",
            });
        }
        Ok((Some(raw), contributions))
    }

    fn score_raw(
        &self,
        zone: ZoneId,
        cfg: &ZoneConfig,
        players: &[PlayerRecord],
        own: &FlatStats,
        against: &FlatStats,
    ) -> Result<RawZone, ZoneError> {
        self.validate(zone, cfg)?;
        let scalers = self.scalers.get(&zone);
        let team = stat_score(zone, "team", &cfg.pros.team, &cfg.cons.team, own, scalers)?;
        let against = stat_score(
            zone,
            "against",
            &cfg.pros.against,
            &cfg.cons.against,
            against,
            scalers,
        )?;
        let (players, contributions) = self.player_score(zone, cfg, players)?;
        if team.raw.is_none() && against.raw.is_none() && players.is_none() {
            return Err(ZoneError::NoData { zone });
        }
        Ok(RawZone {
            zone,
            label: cfg.label.clone(),
            team,
            against,
            players,
            contributions,
        })
    }

    /// Rate every configured zone for one team.
    ///
    /// Players with an unresolved role or no rating contribute nothing.
    /// Zones that fail to score are logged and left out of the result.
    pub fn compute(
        &self,
        players: &[PlayerRecord],
        stats: &[TeamStatBlock],
        stats_against: &[TeamStatBlock],
    ) -> ZoneMap {
        let own = flatten_blocks(stats);
        let against = flatten_blocks(stats_against);

        let mut raws = Vec::with_capacity(self.config.len());
        for (&zone, cfg) in &self.config {
            match self.score_raw(zone, cfg, players, &own, &against) {
                Ok(raw) => raws.push(raw),
                Err(e) => warn!(error = %e, "zone omitted"),
            }
        }

        let max_abs = |f: &dyn Fn(&RawZone) -> Option<f64>| {
            let max = raws
                .iter()
                .filter_map(f)
                .map(f64::abs)
                .fold(0.0_f64, f64::max);
            if max > 0.0 {
                max
            } else {
                1.0
            }
        };
        let team_max = max_abs(&|r| r.team.raw);
        let against_max = max_abs(&|r| r.against.raw);
        let players_max = max_abs(&|r| r.players);

        let mut zones = ZoneMap::new();
        for raw in raws {
            let blend = self.settings.blend_for(raw.zone.third());

            let team_score = raw
                .team
                .raw
                .map(|v| (v / team_max * 100.0).clamp(0.0, 100.0));
            // Signed against score is centred on 50 so a zone conceding
            // heavily sinks towards 0 rather than below it.
            let against_score = raw
                .against
                .raw
                .map(|v| ((100.0 + v / against_max * 100.0) / 2.0).clamp(0.0, 100.0));
            let players_score = raw
                .players
                .map(|v| (v / players_max * 100.0).clamp(0.0, 100.0));

            let parts = [
                (team_score, blend.team),
                (against_score, blend.against),
                (players_score, blend.players),
            ];
            let weight_sum: f64 = parts
                .iter()
                .filter(|(s, _)| s.is_some())
                .map(|(_, w)| w)
                .sum();
            if weight_sum <= 0.0 {
                warn!(zone = %raw.zone, "zone omitted: present components carry no blend weight");
                continue;
            }
            let effective = |score: Option<f64>, w: f64| if score.is_some() { w / weight_sum } else { 0.0 };
            let blended: f64 = parts
                .iter()
                .filter_map(|(s, w)| s.map(|s| s * w / weight_sum))
                .sum();
            let rating = round_to(blended.clamp(0.0, 100.0), 2);

            debug!(zone = %raw.zone, rating, "zone rated");
            zones.insert(
                raw.zone,
                ZoneData {
                    label: raw.label,
                    rating,
                    breakdown: ZoneBreakdown {
                        team: StatComponent {
                            score: team_score,
                            raw: raw.team.raw,
                            pros: raw.team.pros,
                            cons: raw.team.cons,
                            weight: effective(team_score, blend.team),
                        },
                        against: StatComponent {
                            score: against_score,
                            raw: raw.against.raw,
                            pros: raw.against.pros,
                            cons: raw.against.cons,
                            weight: effective(against_score, blend.against),
                        },
                        players: PlayerComponent {
                            score: players_score,
                            raw: raw.players,
                            weight: effective(players_score, blend.players),
                            contributions: raw.contributions,
                        },
                    },
                },
            );
        }
        zones
    }
}

impl Default for ZoneAggregator {
    fn default() -> Self {
        ZoneAggregator::new(
            super::config::default_zone_config(),
            ZoneScalers::new(),
            ZoneSettings::default(),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{StatRow, StatType};
    use crate::zones::config::SideSelection;

    fn block(stat_type: StatType, rows: &[(&str, f64)]) -> TeamStatBlock {
        TeamStatBlock::new(
            stat_type,
            rows.iter()
                .map(|(label, val)| StatRow {
                    label: (*label).to_string(),
                    val: Some(*val),
                    rank: None,
                })
                .collect(),
        )
    }

    fn selection(group: &str, labels: &[&str]) -> StatSelection {
        BTreeMap::from([(
            group.to_string(),
            labels.iter().map(|l| (*l).to_string()).collect(),
        )])
    }

    fn zone(positions: &[(Role, f64)], pros: &[&str], cons: &[&str]) -> ZoneConfig {
        ZoneConfig {
            label: "Test".into(),
            positions: positions.iter().copied().collect(),
            pros: SideSelection {
                team: selection("defense", pros),
                against: StatSelection::new(),
            },
            cons: SideSelection {
                team: selection("defense", cons),
                against: StatSelection::new(),
            },
        }
    }

    fn player(name: &str, role: Option<Role>, rating: f64, minutes: f64) -> PlayerRecord {
        let mut p = PlayerRecord::new(name, "T", "L", "2024", "DF")
            .with_stat("standard", "Playing Time_Min", minutes);
        p.role = role;
        p.rating = Some(rating);
        p
    }

    fn aggregator(config: ZoneConfigMap) -> ZoneAggregator {
        ZoneAggregator::new(config, ZoneScalers::new(), ZoneSettings::default())
    }

    #[test]
    fn team_component_is_pros_minus_cons() {
        let config = BTreeMap::from([(ZoneId::DefCentral, zone(&[], &["Clr", "Int"], &["Err"]))]);
        let stats = vec![block(StatType::Defense, &[("Clr", 300.0), ("Int", 200.0), ("Err", 20.0)])];
        let zones = aggregator(config).compute(&[], &stats, &[]);
        let team = &zones[&ZoneId::DefCentral].breakdown.team;
        assert_eq!(team.raw, Some(480.0));
        assert_eq!(team.pros, vec!["Clr".to_string(), "Int".to_string()]);
        assert_eq!(team.cons, vec!["Err".to_string()]);
        // only component present: full weight
        assert_eq!(team.weight, 1.0);
        assert_eq!(zones[&ZoneId::DefCentral].rating, 100.0);
    }

    #[test]
    fn scalers_multiply_stat_values() {
        let config = BTreeMap::from([
            (ZoneId::DefCentral, zone(&[], &["Clr"], &[])),
            (ZoneId::DefLeftHalf, zone(&[], &["Int"], &[])),
        ]);
        let scalers = BTreeMap::from([(
            ZoneId::DefLeftHalf,
            BTreeMap::from([("Int".to_string(), 3.0)]),
        )]);
        let stats = vec![block(StatType::Defense, &[("Clr", 300.0), ("Int", 200.0)])];
        let agg = ZoneAggregator::new(config, scalers, ZoneSettings::default());
        let zones = agg.compute(&[], &stats, &[]);
        assert_eq!(zones[&ZoneId::DefLeftHalf].breakdown.team.raw, Some(600.0));
        assert_eq!(zones[&ZoneId::DefLeftHalf].rating, 100.0);
        assert_eq!(zones[&ZoneId::DefCentral].rating, 50.0);
    }

    #[test]
    fn unresolved_players_never_contribute() {
        let config = BTreeMap::from([(ZoneId::DefCentral, zone(&[(Role::CB, 1.0)], &[], &[]))]);
        let players = vec![
            player("Resolved", Some(Role::CB), 70.0, 1000.0),
            player("Unknown", None, 99.0, 3000.0),
        ];
        let zones = aggregator(config).compute(&players, &[], &[]);
        let contributions = &zones[&ZoneId::DefCentral].breakdown.players.contributions;
        assert_eq!(contributions.len(), 1);
        assert_eq!(contributions[0].name, "Resolved");
    }

    #[test]
    fn player_component_is_minutes_weighted() {
        let config = BTreeMap::from([(ZoneId::DefCentral, zone(&[(Role::CB, 0.5)], &[], &[]))]);
        let players = vec![
            player("A", Some(Role::CB), 80.0, 3000.0),
            player("B", Some(Role::CB), 40.0, 1000.0),
        ];
        let zones = aggregator(config).compute(&players, &[], &[]);
        let raw = zones[&ZoneId::DefCentral].breakdown.players.raw.unwrap();
        // 80*0.5*0.75 + 40*0.5*0.25
        assert!((raw - 35.0).abs() < 1e-9);
    }

    #[test]
    fn fallback_role_contributes_at_penalty() {
        let config = BTreeMap::from([(ZoneId::DefCentral, zone(&[(Role::CB, 0.5)], &[], &[]))]);
        let players = vec![player("Right", Some(Role::RCB), 80.0, 1000.0)];
        let zones = aggregator(config).compute(&players, &[], &[]);
        let c = &zones[&ZoneId::DefCentral].breakdown.players.contributions[0];
        assert!((c.position_weight - 0.4).abs() < 1e-12);
    }

    #[test]
    fn missing_components_renormalize_blend() {
        let config = BTreeMap::from([(ZoneId::MidCentral, zone(&[(Role::CM, 1.0)], &["PrgP"], &[]))]);
        let stats = vec![block(StatType::Passing, &[("PrgP", 900.0)])];
        let players = vec![player("A", Some(Role::CM), 60.0, 1000.0)];
        let zones = aggregator(config).compute(&players, &stats, &[]);
        let b = &zones[&ZoneId::MidCentral].breakdown;
        assert!(b.against.score.is_none());
        assert_eq!(b.against.weight, 0.0);
        assert!((b.team.weight + b.players.weight - 1.0).abs() < 1e-12);
        assert_eq!(zones[&ZoneId::MidCentral].rating, 100.0);
    }

    #[test]
    fn against_score_is_centred_and_clamped() {
        let mut cfg = zone(&[], &[], &[]);
        cfg.cons.against = selection("shooting", &["Standard_SoT"]);
        let config = BTreeMap::from([(ZoneId::DefCentral, cfg.clone()), (ZoneId::DefLeftHalf, cfg)]);
        let against = vec![block(StatType::Shooting, &[("Standard_SoT", 150.0)])];
        let zones = aggregator(config).compute(&[], &[], &against);
        let a = &zones[&ZoneId::DefCentral].breakdown.against;
        assert_eq!(a.raw, Some(-150.0));
        assert_eq!(a.score, Some(0.0));
        assert_eq!(zones[&ZoneId::DefCentral].rating, 0.0);
    }

    #[test]
    fn zone_without_any_data_is_omitted() {
        let config = BTreeMap::from([
            (ZoneId::DefCentral, zone(&[], &["Clr"], &[])),
            (ZoneId::AttCentral, zone(&[(Role::CF, 1.0)], &["Missing"], &[])),
        ]);
        let stats = vec![block(StatType::Defense, &[("Clr", 300.0)])];
        let zones = aggregator(config).compute(&[], &stats, &[]);
        assert!(zones.contains_key(&ZoneId::DefCentral));
        assert!(!zones.contains_key(&ZoneId::AttCentral));
    }

    #[test]
    fn invalid_position_weight_omits_only_that_zone() {
        let config = BTreeMap::from([
            (ZoneId::DefCentral, zone(&[(Role::CB, f64::NAN)], &["Clr"], &[])),
            (ZoneId::DefLeftHalf, zone(&[(Role::CB, 0.5)], &["Clr"], &[])),
        ]);
        let stats = vec![block(StatType::Defense, &[("Clr", 300.0)])];
        let zones = aggregator(config).compute(&[], &stats, &[]);
        assert!(!zones.contains_key(&ZoneId::DefCentral));
        assert!(zones.contains_key(&ZoneId::DefLeftHalf));
    }

    #[test]
    fn ratings_stay_in_bounds_with_extreme_inputs() {
        let stats = vec![
            block(StatType::Defense, &[("Tkl+Int", 1e9), ("Err", 5e8), ("Int", -3e7)]),
            block(StatType::Passing, &[("PrgP", 0.0), ("KP", 12.0), ("PPA", 1e-9)]),
            block(StatType::Shooting, &[("Expected_xG", 55.5), ("Expected_npxG", -4.0)]),
        ];
        let against = vec![
            block(StatType::Shooting, &[("Standard_SoT", 1e6), ("Expected_xG", 80.0)]),
            block(StatType::Misc, &[("Performance_Off", 3.0)]),
        ];
        let players = vec![
            player("GK", Some(Role::GK), 100.0, 3420.0),
            player("CB", Some(Role::CB), 0.0, 3000.0),
            player("CM", Some(Role::CM), 55.0, 0.0),
            player("CF", Some(Role::CF), 99.9, 10.0),
        ];
        let zones = ZoneAggregator::default().compute(&players, &stats, &against);
        assert!(!zones.is_empty());
        for (id, data) in &zones {
            assert!((0.0..=100.0).contains(&data.rating), "{id} = {}", data.rating);
        }
    }

    #[test]
    fn computation_is_deterministic() {
        let stats = vec![block(StatType::Defense, &[("Tkl+Int", 500.0), ("Int", 250.0)])];
        let players = vec![player("CB", Some(Role::CB), 70.0, 2000.0)];
        let agg = ZoneAggregator::default();
        assert_eq!(agg.compute(&players, &stats, &[]), agg.compute(&players, &stats, &[]));
    }
}
