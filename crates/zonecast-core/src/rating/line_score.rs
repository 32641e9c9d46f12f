// Line-aware percentile rater: an alternative to ranking-based ratings.
//
// Each player is rated against the other players of their formation line
// on the stats configured for that line, blended with an availability term.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::zscore::{percentile_rank, round_to};
use crate::squad::player::PlayerRecord;
use crate::squad::roles::Line;
use crate::stats::{metric_name, minutes_played, selection_keys, StatSelection};

/// How a configured stat counts towards the rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Pros,
    Cons,
    Important,
}

/// Per line, per impact: the stats that feed the rating.
pub type ScoreConfig = BTreeMap<Line, BTreeMap<Impact, StatSelection>>;

/// Magnitudes per impact. Cons always subtract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactWeights {
    pub pros: f64,
    pub cons: f64,
    pub important: f64,
}

impl Default for ImpactWeights {
    fn default() -> Self {
        ImpactWeights {
            pros: 1.0,
            cons: 1.0,
            important: 2.0,
        }
    }
}

impl ImpactWeights {
    fn signed(&self, impact: Impact) -> f64 {
        match impact {
            Impact::Pros => self.pros.abs(),
            Impact::Cons => -self.cons.abs(),
            Impact::Important => self.important.abs(),
        }
    }
}

const PERFORMANCE_SHARE: f64 = 0.8;
const AVAILABILITY_SHARE: f64 = 0.2;

fn selection(entries: &[(&str, &[&str])]) -> StatSelection {
    entries
        .iter()
        .map(|(group, labels)| {
            (
                (*group).to_string(),
                labels.iter().map(|l| (*l).to_string()).collect(),
            )
        })
        .collect()
}

/// The built-in per-line stat configuration.
pub fn default_score_config() -> ScoreConfig {
    let gk = BTreeMap::from([
        (
            Impact::Pros,
            selection(&[
                ("keeper", &["Penalty Kicks_PKsv", "Performance_CS%"]),
                ("keeper_adv", &["Crosses_Stp%", "Launched_Cmp%"]),
                ("passing", &["Total_Cmp%"]),
            ]),
        ),
        (
            Impact::Cons,
            selection(&[
                ("keeper_adv", &["Goals_OG"]),
                ("defense", &["Err"]),
                ("misc", &["Performance_Fls", "Performance_CrdR"]),
            ]),
        ),
        (
            Impact::Important,
            selection(&[("keeper", &["Performance_Save%", "Performance_CS"])]),
        ),
    ]);
    let def = BTreeMap::from([
        (
            Impact::Pros,
            selection(&[
                ("defense", &["Tkl+Int", "Blocks_Blocks", "Clr", "Challenges_Tkl%"]),
                ("misc", &["Aerial Duels_Won%"]),
                ("passing", &["PrgP", "Total_Cmp%"]),
                ("passing_types", &["Pass Types_Sw"]),
            ]),
        ),
        (
            Impact::Cons,
            selection(&[
                ("defense", &["Err"]),
                ("possession", &["Carries_Dis", "Carries_Mis"]),
                ("misc", &["Performance_OG", "Performance_Fls", "Performance_CrdR"]),
            ]),
        ),
        (
            Impact::Important,
            selection(&[
                ("defense", &["Tackles_Def 3rd", "Tackles_TklW", "Blocks_Blocks"]),
                ("standard", &["Performance_Gls"]),
            ]),
        ),
    ]);
    let mid = BTreeMap::from([
        (
            Impact::Pros,
            selection(&[
                ("passing", &["Total_Cmp%", "PrgP", "1/3"]),
                ("passing_types", &["Pass Types_Sw", "Pass Types_TB"]),
                ("possession", &["Carries_PrgC", "Carries_1/3", "Touches_Touches", "Touches_Att Pen"]),
                ("standard", &["Performance_Ast", "Expected_xG", "Performance_Gls"]),
            ]),
        ),
        (
            Impact::Cons,
            selection(&[
                ("possession", &["Carries_Dis", "Carries_Mis"]),
                ("misc", &["Performance_CrdY", "Performance_Fls"]),
            ]),
        ),
        (
            Impact::Important,
            selection(&[
                ("goal_shot_creation", &["SCA_SCA"]),
                ("passing", &["KP", "Expected_xA"]),
                ("possession", &["Carries_CPA"]),
            ]),
        ),
    ]);
    let fwd = BTreeMap::from([
        (
            Impact::Pros,
            selection(&[
                ("standard", &["Performance_Gls", "Expected_xG", "Performance_Ast", "Per 90 Minutes_xAG"]),
                ("possession", &["Carries_CPA", "Carries_PrgC"]),
                ("shooting", &["Standard_Sh/90", "Standard_SoT%"]),
                ("goal_shot_creation", &["SCA_SCA", "SCA Types_TO"]),
            ]),
        ),
        (
            Impact::Cons,
            selection(&[
                ("possession", &["Carries_Dis", "Carries_Mis"]),
                ("misc", &["Performance_Fls", "Performance_Off"]),
            ]),
        ),
        (
            Impact::Important,
            selection(&[
                ("standard", &["Performance_Gls", "Expected_xG"]),
                ("shooting", &["Standard_SoT%"]),
                ("goal_shot_creation", &["GCA_GCA90"]),
            ]),
        ),
    ]);
    BTreeMap::from([
        (Line::Goalkeeper, gk),
        (Line::Defence, def),
        (Line::Midfield, mid),
        (Line::Attack, fwd),
    ])
}

/// Value used for percentile comparison: per 90 minutes, except for
/// percentage metrics which are already rates.
fn per_90(key: &str, value: f64, minutes: f64) -> f64 {
    if metric_name(key).ends_with('%') {
        value
    } else if minutes > 0.0 {
        value / (minutes / 90.0)
    } else {
        0.0
    }
}

#[derive(Debug, Clone)]
pub struct LineScoreRater {
    config: ScoreConfig,
    weights: ImpactWeights,
    min_minutes: f64,
}

impl LineScoreRater {
    pub fn new(config: ScoreConfig, weights: ImpactWeights, min_minutes: f64) -> Self {
        LineScoreRater {
            config,
            weights,
            min_minutes,
        }
    }

    /// Overwrite `rating` for every player. Players with an unresolved role
    /// or below the minutes threshold get `None`. Returns how many were rated.
    pub fn rate(&self, players: &mut [PlayerRecord]) -> usize {
        // (index, line, minutes, per-90 values)
        let mut eligible: Vec<(usize, Line, f64, BTreeMap<String, f64>)> = Vec::new();
        for (idx, player) in players.iter_mut().enumerate() {
            player.rating = None;
            let Some(line) = player.role.map(|r| r.line()) else {
                continue;
            };
            let flat = player.flat_stats();
            let minutes = minutes_played(&flat);
            if minutes < self.min_minutes || minutes <= 0.0 {
                continue;
            }
            let mut values = BTreeMap::new();
            if let Some(impacts) = self.config.get(&line) {
                for sel in impacts.values() {
                    for key in selection_keys(sel) {
                        if let Some(&v) = flat.get(&key) {
                            values.insert(key.clone(), per_90(&key, v, minutes));
                        }
                    }
                }
            }
            eligible.push((idx, line, minutes, values));
        }

        // percentile pools are per line: a defender's key passes are ranked
        // against other defenders only
        let mut pools: BTreeMap<(Line, &str), Vec<f64>> = BTreeMap::new();
        for (_, line, _, values) in &eligible {
            for (key, &v) in values {
                pools.entry((*line, key.as_str())).or_default().push(v);
            }
        }
        let max_minutes = eligible
            .iter()
            .map(|(_, _, m, _)| *m)
            .fold(0.0_f64, f64::max);

        let mut ratings: Vec<(usize, f64)> = Vec::with_capacity(eligible.len());
        for (idx, line, minutes, values) in &eligible {
            let mut contributions = Vec::new();
            if let Some(impacts) = self.config.get(line) {
                for (impact, sel) in impacts {
                    let sign = self.weights.signed(*impact);
                    for key in selection_keys(sel) {
                        let pool = pools.get(&(*line, key.as_str()));
                        let (Some(&v), Some(pool)) = (values.get(&key), pool) else {
                            continue;
                        };
                        contributions.push(sign * percentile_rank(pool, v) / 100.0);
                    }
                }
            }
            let performance = if contributions.is_empty() {
                0.0
            } else {
                contributions.iter().sum::<f64>() / contributions.len() as f64
            };
            let availability = if max_minutes > 0.0 { minutes / max_minutes } else { 0.0 };
            let rating = (PERFORMANCE_SHARE * performance + AVAILABILITY_SHARE * availability) * 100.0;
            ratings.push((*idx, round_to(rating.clamp(0.0, 100.0), 1)));
        }

        for (idx, rating) in &ratings {
            players[*idx].rating = Some(*rating);
        }
        info!(rated = ratings.len(), "line score ratings complete");
        ratings.len()
    }
}

impl Default for LineScoreRater {
    fn default() -> Self {
        LineScoreRater::new(default_score_config(), ImpactWeights::default(), 910.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::squad::roles::Role;

    fn mid(name: &str, minutes: f64, kp: f64, dis: f64) -> PlayerRecord {
        PlayerRecord::new(name, "T", "L", "2024", "MF")
            .with_role(Role::CM)
            .with_stat("standard", "Playing Time_Min", minutes)
            .with_stat("passing", "KP", kp)
            .with_stat("possession", "Carries_Dis", dis)
    }

    fn rater() -> LineScoreRater {
        let config = BTreeMap::from([(
            Line::Midfield,
            BTreeMap::from([
                (Impact::Important, selection(&[("passing", &["KP"])])),
                (Impact::Cons, selection(&[("possession", &["Carries_Dis"])])),
            ]),
        )]);
        LineScoreRater::new(config, ImpactWeights::default(), 900.0)
    }

    #[test]
    fn per_90_leaves_percentages_alone() {
        assert_eq!(per_90("passing:Total_Cmp%", 82.0, 1800.0), 82.0);
        assert_eq!(per_90("passing:KP", 40.0, 1800.0), 2.0);
        assert_eq!(per_90("passing:KP", 40.0, 0.0), 0.0);
    }

    #[test]
    fn below_threshold_gets_no_rating() {
        let mut players = vec![mid("Regular", 1800.0, 40.0, 10.0), mid("Sub", 300.0, 10.0, 1.0)];
        let rated = rater().rate(&mut players);
        assert_eq!(rated, 1);
        assert!(players[0].rating.is_some());
        assert!(players[1].rating.is_none());
    }

    #[test]
    fn cons_lower_the_rating() {
        let mut players = vec![
            mid("Careful", 1800.0, 40.0, 5.0),
            mid("Careless", 1800.0, 40.0, 30.0),
        ];
        rater().rate(&mut players);
        assert!(players[0].rating.unwrap() > players[1].rating.unwrap());
    }

    #[test]
    fn rating_is_bounded() {
        let mut players = vec![
            mid("A", 3000.0, 90.0, 0.0),
            mid("B", 1000.0, 1.0, 80.0),
            mid("C", 2000.0, 30.0, 20.0),
        ];
        rater().rate(&mut players);
        for p in &players {
            let r = p.rating.unwrap();
            assert!((0.0..=100.0).contains(&r), "{} = {r}", p.name);
        }
    }

    #[test]
    fn known_rating_value() {
        // KP pct 1.0 x2 and Dis pct 0.5 x -1 -> mean 0.75, full availability
        let mut players = vec![mid("A", 1800.0, 40.0, 5.0), mid("B", 1800.0, 20.0, 10.0)];
        rater().rate(&mut players);
        assert_eq!(players[0].rating, Some(80.0));
    }

    #[test]
    fn percentiles_are_taken_within_each_line() {
        let pros_kp = || BTreeMap::from([(Impact::Pros, selection(&[("passing", &["KP"])]))]);
        let config = BTreeMap::from([(Line::Defence, pros_kp()), (Line::Midfield, pros_kp())]);
        let rater = LineScoreRater::new(config, ImpactWeights::default(), 900.0);

        let def = |name: &str, kp: f64| {
            PlayerRecord::new(name, "T", "L", "2024", "DF")
                .with_role(Role::CB)
                .with_stat("standard", "Playing Time_Min", 1800.0)
                .with_stat("passing", "KP", kp)
        };
        let mut players = vec![
            mid("M1", 1800.0, 80.0, 0.0),
            mid("M2", 1800.0, 60.0, 0.0),
            def("D1", 20.0),
            def("D2", 10.0),
        ];
        rater.rate(&mut players);

        // best passer among defenders tops the defence pool
        assert_eq!(players[2].rating, Some(100.0));
        assert_eq!(players[3].rating, Some(60.0));
        assert_eq!(players[0].rating, Some(100.0));
        assert_eq!(players[1].rating, Some(60.0));
    }

    #[test]
    fn default_config_covers_every_line() {
        let config = default_score_config();
        for line in [Line::Goalkeeper, Line::Defence, Line::Midfield, Line::Attack] {
            assert!(config.contains_key(&line));
        }
    }
}
