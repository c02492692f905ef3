//! Time zone lookup and zoned conversion with explicit DST awareness.

mod catalog;
mod provider;
mod service;

pub use catalog::{search_zones, supported_time_zones, validate_zone, TimeZone, ZoneEntry};
pub use provider::{HttpTimeProvider, TimeProvider, TimeZoneData};
pub use service::{TimeConversionResult, TimeZoneService, ZoneInstant};
