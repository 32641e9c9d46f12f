// Library root: configuration, persistence, stat ingestion and the analysis
// service around the zonecast-core engine. Re-exported so the binary and
// integration tests share one API.

pub mod analysis;
pub mod config;
pub mod export;
pub mod profile;
pub mod scheduler;
pub mod source;
pub mod store;
