// Match prediction from two teams' zone ratings.
//
// Every zone of one team is set against the opponent zone it contests
// (attack vs mirrored defence, midfield vs mirrored midfield, defence vs
// mirrored attack). Each pair adds importance-weighted expected goals and
// gets a matchup label.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::rating::zscore::round_to;
use crate::zones::{ZoneData, ZoneId, ZoneMap};

/// Tunable constants of the expected-goals model.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PredictorSettings {
    /// Multiplies raw xG after the zone-mass share is applied.
    pub xg_multiplier: f64,
    /// Share of the contributing players' mean rating added to the attack.
    pub boost_factor: f64,
    /// Largest delta counted per zone pair.
    pub delta_cap: f64,
    pub exponent: f64,
    pub scale: f64,
    /// Deltas within this band are labelled even.
    pub even_threshold: f64,
}

impl Default for PredictorSettings {
    fn default() -> Self {
        PredictorSettings {
            xg_multiplier: 2.0,
            boost_factor: 0.1,
            delta_cap: 1.5,
            exponent: 1.2,
            scale: 0.9,
            even_threshold: 0.2,
        }
    }
}

/// How much a zone pair matters for chance creation.
pub fn zone_importance(zone: ZoneId) -> f64 {
    match zone {
        ZoneId::AttCentral => 1.4,
        ZoneId::AttLeftHalf | ZoneId::AttRightHalf => 1.2,
        ZoneId::AttLeftWide | ZoneId::AttRightWide => 1.0,
        ZoneId::MidCentral => 1.0,
        ZoneId::MidLeftHalf | ZoneId::MidRightHalf => 0.8,
        ZoneId::MidLeftWide | ZoneId::MidRightWide => 0.6,
        ZoneId::DefCentral => 1.1,
        ZoneId::DefLeftHalf | ZoneId::DefRightHalf => 0.9,
        ZoneId::DefLeftWide | ZoneId::DefRightWide => 0.7,
    }
}

/// A team's name and its zone set.
#[derive(Debug, Clone, Copy)]
pub struct TeamZones<'a> {
    pub name: &'a str,
    pub zones: &'a ZoneMap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPrediction {
    pub team_a: String,
    pub team_b: String,
    /// `"{a:.1} - {b:.1}"`.
    pub score_prediction: String,
    /// Team name -> expected goals, rounded to 2 places.
    pub xg: BTreeMap<String, f64>,
    /// Team A's zone -> label describing who wins it.
    pub matchups: BTreeMap<ZoneId, String>,
}

/// Sum of a team's zone ratings.
fn zone_mass(zones: &ZoneMap) -> f64 {
    zones.values().map(|z| z.rating).sum()
}

#[derive(Debug, Clone, Default)]
pub struct MatchPredictor {
    settings: PredictorSettings,
}

impl MatchPredictor {
    pub fn new(settings: PredictorSettings) -> Self {
        MatchPredictor { settings }
    }

    /// Position-weighted mean rating of a zone's contributing players,
    /// scaled by the boost factor. 0 with no contributors.
    pub fn player_boost(&self, zone: &ZoneData) -> f64 {
        let contributions = &zone.breakdown.players.contributions;
        let weight: f64 = contributions.iter().map(|c| c.position_weight).sum();
        if weight <= 0.0 {
            return 0.0;
        }
        let weighted: f64 = contributions
            .iter()
            .map(|c| c.rating * c.position_weight)
            .sum();
        weighted / weight * self.settings.boost_factor
    }

    /// Rating delta between an attacking zone and the zone defending it,
    /// both scaled to 0-1.
    pub fn delta(&self, attacking: &ZoneData, defending: &ZoneData) -> f64 {
        let attack = (attacking.rating + self.player_boost(attacking)).min(100.0) / 100.0;
        let defence = defending.rating.min(100.0) / 100.0;
        attack - defence
    }

    /// Expected-goal contribution of a delta in `zone`.
    pub fn xg_from_delta(&self, zone: ZoneId, delta: f64) -> f64 {
        if delta <= 0.0 {
            return 0.0;
        }
        let capped = delta.min(self.settings.delta_cap);
        capped.powf(self.settings.exponent) * self.settings.scale * zone_importance(zone)
    }

    /// Raw expected goals `attacker` creates against `defender`, summed
    /// over every zone pair both sides have.
    pub fn raw_xg(&self, attacker: &ZoneMap, defender: &ZoneMap) -> f64 {
        attacker
            .iter()
            .filter_map(|(zone, att)| {
                let def = defender.get(&zone.opponent())?;
                Some(self.xg_from_delta(*zone, self.delta(att, def)))
            })
            .sum()
    }

    fn matchup_label(&self, a: &TeamZones<'_>, b: &TeamZones<'_>, zone: ZoneId) -> String {
        let (Some(za), Some(zb)) = (a.zones.get(&zone), b.zones.get(&zone.opponent())) else {
            return "missing".to_string();
        };
        let cap = self.settings.delta_cap;
        let delta = round_to(self.delta(za, zb).clamp(-cap, cap), 2);
        if delta > self.settings.even_threshold {
            format!("{} advantage ({delta:.2})", a.name)
        } else if delta < -self.settings.even_threshold {
            format!("{} advantage ({:.2})", b.name, delta.abs())
        } else {
            "even".to_string()
        }
    }

    pub fn predict(&self, a: TeamZones<'_>, b: TeamZones<'_>) -> MatchPrediction {
        let raw_a = self.raw_xg(a.zones, b.zones);
        let raw_b = self.raw_xg(b.zones, a.zones);

        let mass_a = zone_mass(a.zones);
        let mass_b = zone_mass(b.zones);
        let total = mass_a + mass_b;
        let total = if total > 0.0 && total.is_finite() { total } else { 1.0 };

        let xg_a = round_to(raw_a * (mass_a / total) * self.settings.xg_multiplier, 2);
        let xg_b = round_to(raw_b * (mass_b / total) * self.settings.xg_multiplier, 2);
        debug!(
            team_a = a.name,
            team_b = b.name,
            raw_a,
            raw_b,
            mass_a,
            mass_b,
            xg_a,
            xg_b,
            "match predicted"
        );

        let matchups = ZoneId::ALL
            .into_iter()
            .map(|zone| (zone, self.matchup_label(&a, &b, zone)))
            .collect();

        MatchPrediction {
            team_a: a.name.to_string(),
            team_b: b.name.to_string(),
            score_prediction: format!("{xg_a:.1} - {xg_b:.1}"),
            xg: BTreeMap::from([(a.name.to_string(), xg_a), (b.name.to_string(), xg_b)]),
            matchups,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zones::Third;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn zones(rating: f64) -> ZoneMap {
        ZoneId::ALL
            .into_iter()
            .map(|z| (z, ZoneData::with_rating(z.as_str(), rating)))
            .collect()
    }

    #[test]
    fn importance_covers_all_zones() {
        for zone in ZoneId::ALL {
            assert!(zone_importance(zone) > 0.0);
        }
        assert_eq!(zone_importance(ZoneId::AttCentral), 1.4);
    }

    #[test]
    fn non_positive_delta_gives_no_xg() {
        let p = MatchPredictor::default();
        assert_eq!(p.xg_from_delta(ZoneId::AttCentral, 0.0), 0.0);
        assert_eq!(p.xg_from_delta(ZoneId::AttCentral, -0.3), 0.0);
    }

    #[test]
    fn xg_is_monotonic_in_attacking_rating() {
        let p = MatchPredictor::default();
        let defender = ZoneData::with_rating("def", 60.0);
        let mut previous = 0.0;
        for rating in (0..=100).step_by(5) {
            let attacker = ZoneData::with_rating("att", rating as f64);
            let xg = p.xg_from_delta(ZoneId::AttCentral, p.delta(&attacker, &defender));
            assert!(xg >= previous, "rating {rating}: {xg} < {previous}");
            previous = xg;
        }
    }

    #[test]
    fn delta_is_capped() {
        let p = MatchPredictor::default();
        let capped = p.xg_from_delta(ZoneId::AttLeftWide, 1.5);
        assert_eq!(p.xg_from_delta(ZoneId::AttLeftWide, 9.0), capped);
    }

    #[test]
    fn eighty_vs_sixty_scenario() {
        let p = MatchPredictor::default();
        let a = zones(80.0);
        let b = zones(60.0);
        let prediction = p.predict(
            TeamZones { name: "A", zones: &a },
            TeamZones { name: "B", zones: &b },
        );

        // every pair: 0.2^1.2 * 0.9 * importance; importance sums to 13.9
        let raw_a = 0.2f64.powf(1.2) * 0.9 * 13.9;
        // zone mass share: 15*80 / (15*80 + 15*60)
        let expected = round_to(raw_a * (1200.0 / 2100.0) * 2.0, 2);
        assert_eq!(prediction.xg["A"], expected);
        assert_eq!(prediction.xg["B"], 0.0);
        assert!(prediction.xg["A"] > 0.0);
        assert_eq!(prediction.score_prediction, format!("{expected:.1} - 0.0"));
        // the 0.2 delta sits on the even threshold
        assert_eq!(prediction.matchups[&ZoneId::AttCentral], "even");
        assert_eq!(prediction.matchups.len(), 15);
    }

    #[test]
    fn xg_share_follows_zone_mass() {
        let p = MatchPredictor::default();
        let a = zones(80.0);
        let b = zones(60.0);
        let prediction = p.predict(
            TeamZones { name: "A", zones: &a },
            TeamZones { name: "B", zones: &b },
        );
        let raw_a = p.raw_xg(&a, &b);
        assert!(approx_eq(raw_a, 0.2f64.powf(1.2) * 0.9 * 13.9));
        assert!(prediction.xg["A"] < round_to(raw_a * 2.0, 2));
        assert_eq!(prediction.xg["A"], round_to(raw_a * 1200.0 / 2100.0 * 2.0, 2));
    }

    #[test]
    fn midfield_advantage_alone_creates_xg() {
        let p = MatchPredictor::default();
        let b = zones(50.0);
        let mut a = zones(50.0);
        for zone in ZoneId::ALL.into_iter().filter(|z| z.third() == Third::Mid) {
            a.insert(zone, ZoneData::with_rating(zone.as_str(), 80.0));
        }

        let raw_a = p.raw_xg(&a, &b);
        // mid importances sum to 3.8
        assert!(approx_eq(raw_a, 0.3f64.powf(1.2) * 0.9 * 3.8));
        assert_eq!(p.raw_xg(&b, &a), 0.0);

        let prediction = p.predict(
            TeamZones { name: "A", zones: &a },
            TeamZones { name: "B", zones: &b },
        );
        assert!(prediction.xg["A"] > 0.0);
        assert_eq!(prediction.xg["B"], 0.0);
        assert_eq!(prediction.matchups[&ZoneId::MidCentral], "A advantage (0.30)");
        assert_eq!(prediction.matchups[&ZoneId::AttCentral], "even");
    }

    #[test]
    fn empty_zone_sets_predict_nothing() {
        let p = MatchPredictor::default();
        let empty = ZoneMap::new();
        let prediction = p.predict(
            TeamZones { name: "A", zones: &empty },
            TeamZones { name: "B", zones: &empty },
        );
        assert_eq!(prediction.score_prediction, "0.0 - 0.0");
        assert!(prediction.matchups.values().all(|m| m == "missing"));
    }

    #[test]
    fn clear_advantage_is_labelled() {
        let p = MatchPredictor::default();
        let a = zones(90.0);
        let b = zones(40.0);
        let prediction = p.predict(
            TeamZones { name: "Home", zones: &a },
            TeamZones { name: "Away", zones: &b },
        );
        assert_eq!(prediction.matchups[&ZoneId::AttCentral], "Home advantage (0.50)");
        let reversed = p.predict(
            TeamZones { name: "Away", zones: &b },
            TeamZones { name: "Home", zones: &a },
        );
        assert_eq!(reversed.matchups[&ZoneId::MidCentral], "Home advantage (0.50)");
    }

    #[test]
    fn missing_zone_is_labelled_missing() {
        let p = MatchPredictor::default();
        let a = zones(70.0);
        let mut b = zones(70.0);
        b.remove(&ZoneId::DefCentral);
        let prediction = p.predict(
            TeamZones { name: "A", zones: &a },
            TeamZones { name: "B", zones: &b },
        );
        assert_eq!(prediction.matchups[&ZoneId::AttCentral], "missing");
    }

    #[test]
    fn equal_teams_get_no_goals_and_even_matchups() {
        let p = MatchPredictor::default();
        let a = zones(50.0);
        let prediction = p.predict(
            TeamZones { name: "A", zones: &a },
            TeamZones { name: "B", zones: &a },
        );
        assert_eq!(prediction.score_prediction, "0.0 - 0.0");
        assert!(prediction.matchups.values().all(|m| m == "even"));
    }
}
