pub mod aggregate;
pub mod config;
pub mod layout;

pub use aggregate::{ZoneAggregator, ZoneData, ZoneError, ZoneMap};
pub use config::{Blend, BlendTable, ZoneConfig, ZoneConfigMap, ZoneScalers, ZoneSettings};
pub use layout::{Lane, Third, ZoneId};
