//! convertd - an offline-resilient conversion core.
//!
//! Three independent conversion domains (physical units, currencies, time
//! zones) over a shared data-freshness layer: remote fetch with retry and
//! backoff, validation, tiered persistent caching with explicit expiry,
//! and honest staleness reporting.
//!
//! The conversion arithmetic is table-driven and simple; the interesting
//! part is what happens when the network is down, slow, or lying.

pub mod cache;
pub mod config;
pub mod context;
pub mod currency;
pub mod error;
pub mod memo;
pub mod prefs;
pub mod retry;
pub mod store;
pub mod timezone;
pub mod units;

pub use cache::{CacheManager, CacheStats};
pub use config::Config;
pub use context::AppContext;
pub use currency::{CurrencyConversionResult, CurrencyService, ExchangeRates};
pub use error::{ConvertError, Result};
pub use prefs::{PreferencesStore, UserPreferences};
pub use store::{TieredStore, Ttl};
pub use timezone::{TimeConversionResult, TimeZoneService};
pub use units::{ConversionResult, UnitEngine};
