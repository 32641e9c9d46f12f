// Per-position-group maxima of every stat, with the player holding each.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::rating::zscore::round_to;
use crate::squad::player::PlayerRecord;
use crate::squad::roles::PositionGroup;

/// Best value seen for one stat within a position group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Benchmark {
    pub max: f64,
    pub player: String,
}

pub type GroupBenchmarks = BTreeMap<String, Benchmark>;

/// Compute the maximum of every stat per position group.
///
/// Players whose position does not map to a group are skipped. On ties the
/// first player to reach the value keeps the benchmark. Maxima are rounded
/// to 3 places.
pub fn compute_benchmarks(players: &[PlayerRecord]) -> BTreeMap<PositionGroup, GroupBenchmarks> {
    let mut out: BTreeMap<PositionGroup, GroupBenchmarks> = BTreeMap::new();

    for player in players {
        let Some(group) = PositionGroup::from_position(&player.position) else {
            debug!(player = %player.name, position = %player.position, "no position group, skipped");
            continue;
        };
        let benchmarks = out.entry(group).or_default();
        for (key, value) in player.flat_stats() {
            match benchmarks.get_mut(&key) {
                Some(existing) if value <= existing.max => {}
                Some(existing) => {
                    existing.max = value;
                    existing.player = player.name.clone();
                }
                None => {
                    benchmarks.insert(
                        key,
                        Benchmark {
                            max: value,
                            player: player.name.clone(),
                        },
                    );
                }
            }
        }
    }

    for benchmark in out.values_mut().flat_map(|b| b.values_mut()) {
        benchmark.max = round_to(benchmark.max, 3);
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
