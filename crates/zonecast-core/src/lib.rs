// Library root: the zone rating and match prediction engine.
//
// Everything here is a pure function over in-memory data. Loading stat
// snapshots, persisting zone profiles and scheduling recomputation live in
// the app crate.

pub mod benchmarks;
pub mod prediction;
pub mod rating;
pub mod squad;
pub mod stats;
pub mod zones;
