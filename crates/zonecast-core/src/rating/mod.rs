pub mod line_score;
pub mod ranking;
pub mod traits;
pub mod zscore;

pub use ranking::{default_rank_weights, normalize_performance, RankWeights, RankingEngine, RankingReport};
pub use traits::{TraitReport, TraitScorer, TraitSettings};
