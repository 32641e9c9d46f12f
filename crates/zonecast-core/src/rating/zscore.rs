// Pool statistics shared by the rating passes: z-scores, percentiles, rescaling.

// ---------------------------------------------------------------------------
// Pool statistics
// ---------------------------------------------------------------------------

/// Mean and standard deviation for a single metric across a player pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolStats {
    pub mean: f64,
    pub stdev: f64,
}

/// Threshold below which standard deviation is treated as zero.
const STDEV_EPSILON: f64 = 1e-9;

/// Compute mean and standard deviation for a slice of values.
///
/// Returns `PoolStats { mean: 0.0, stdev: 0.0 }` for an empty slice.
/// Uses the population standard deviation (N denominator): the pool is every
/// player of a role in the league, not a sample of it.
pub fn compute_pool_stats(values: &[f64]) -> PoolStats {
    if values.is_empty() {
        return PoolStats {
            mean: 0.0,
            stdev: 0.0,
        };
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    PoolStats {
        mean,
        stdev: variance.sqrt(),
    }
}

/// Compute a z-score given a value and pool stats.
///
/// Returns 0.0 if the standard deviation is approximately zero.
pub fn compute_zscore(value: f64, stats: &PoolStats) -> f64 {
    if stats.stdev < STDEV_EPSILON {
        return 0.0;
    }
    (value - stats.mean) / stats.stdev
}

// ---------------------------------------------------------------------------
// Rank-based helpers
// ---------------------------------------------------------------------------

/// Percentile rank of `value` within `pool` on a 0-100 scale: the share of
/// pool values less than or equal to `value`.
///
/// Returns 0.0 for an empty pool.
pub fn percentile_rank(pool: &[f64], value: f64) -> f64 {
    if pool.is_empty() {
        return 0.0;
    }
    let at_or_below = pool.iter().filter(|&&v| v <= value).count();
    100.0 * at_or_below as f64 / pool.len() as f64
}

/// Linear-interpolated quantile of an ascending-sorted slice, `q` in [0, 1].
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Min-max rescale `value` into 0-100. A degenerate range maps to 50.
pub fn rescale_0_100(value: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    if range.abs() < STDEV_EPSILON {
        return 50.0;
    }
    ((value - min) / range * 100.0).clamp(0.0, 100.0)
}

/// Round to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn pool_stats_empty() {
        let stats = compute_pool_stats(&[]);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.stdev, 0.0);
    }

    #[test]
    fn pool_stats_population_stdev() {
        let stats = compute_pool_stats(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!(approx_eq(stats.mean, 5.0, 1e-12));
        assert!(approx_eq(stats.stdev, 2.0, 1e-12));
    }

    #[test]
    fn zscore_zero_stdev_is_zero() {
        let stats = compute_pool_stats(&[3.0, 3.0, 3.0]);
        assert_eq!(compute_zscore(3.0, &stats), 0.0);
        assert_eq!(compute_zscore(10.0, &stats), 0.0);
    }

    #[test]
    fn zscore_basic() {
        let stats = PoolStats {
            mean: 5.0,
            stdev: 2.0,
        };
        assert!(approx_eq(compute_zscore(9.0, &stats), 2.0, 1e-12));
        assert!(approx_eq(compute_zscore(1.0, &stats), -2.0, 1e-12));
    }

    #[test]
    fn percentile_rank_counts_ties_at_or_below() {
        let pool = [1.0, 2.0, 2.0, 4.0];
        assert_eq!(percentile_rank(&pool, 2.0), 75.0);
        assert_eq!(percentile_rank(&pool, 4.0), 100.0);
        assert_eq!(percentile_rank(&pool, 0.5), 0.0);
        assert_eq!(percentile_rank(&[], 1.0), 0.0);
    }

    #[test]
    fn quantile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(&sorted, 0.25), Some(2.0));
        assert_eq!(quantile(&sorted, 0.5), Some(3.0));
        assert_eq!(quantile(&[1.0, 2.0], 0.5), Some(1.5));
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn rescale_degenerate_range_is_midpoint() {
        assert_eq!(rescale_0_100(3.0, 3.0, 3.0), 50.0);
        assert_eq!(rescale_0_100(-1.0, -1.0, 1.0), 0.0);
        assert_eq!(rescale_0_100(1.0, -1.0, 1.0), 100.0);
        assert_eq!(rescale_0_100(0.0, -1.0, 1.0), 50.0);
    }

    #[test]
    fn round_to_places() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(0.125, 1), 0.1);
    }
}
