//! The cache manager.
//!
//! Sits between the domain services and the tiered store: validates every
//! domain object on the way in, re-validates on the way out, and purges
//! instead of propagating anything that fails. Read failures degrade to
//! "nothing cached" - they are logged, never thrown.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::currency::ExchangeRates;
use crate::error::{ConvertError, Result};
use crate::prefs::UserPreferences;
use crate::store::{TieredStore, Ttl};
use crate::timezone::TimeZoneData;

use super::validate::Validate;

const RATES_KEY: &str = "exchange_rates";
const PREFERENCES_KEY: &str = "user_preferences";

/// Persisted rates stay readable past the 24 h staleness threshold so
/// offline conversions can still be served, flagged stale. The TTL matches
/// the validation window; older entries are rejected on read anyway.
const RATES_TTL_DAYS: i64 = 7;

/// Remote time snapshots change slowly; keep them for a day.
const ZONE_TTL_HOURS: i64 = 24;

fn zone_key(zone_id: &str) -> String {
    format!("timezone_{}", zone_id)
}

/// Aggregated health numbers. Reporting only, no correctness impact.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total_bytes: u64,
    pub entry_count: usize,
    pub rates_age: Option<String>,
    pub has_preferences: bool,
    pub last_cleanup: Option<DateTime<Utc>>,
}

pub struct CacheManager {
    store: Arc<TieredStore>,
}

impl CacheManager {
    pub fn new(store: Arc<TieredStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<TieredStore> {
        &self.store
    }

    // ===== Exchange rates =====

    pub fn cache_exchange_rates(&self, rates: &ExchangeRates) -> Result<()> {
        let validity = rates.validity();
        if let Some(reason) = validity.reason() {
            return Err(ConvertError::Validation(format!(
                "refusing to cache exchange rates: {}",
                reason
            )));
        }
        self.store
            .set(RATES_KEY, rates, Ttl::For(Duration::days(RATES_TTL_DAYS)))
    }

    /// Re-validates on read; an invalid record is purged and reported as
    /// nothing-cached.
    pub fn cached_exchange_rates(&self) -> Option<ExchangeRates> {
        self.read_validated(RATES_KEY)
    }

    // ===== Time zone snapshots =====

    pub fn cache_time_zone_data(&self, zone_id: &str, data: &TimeZoneData) -> Result<()> {
        let validity = data.validity();
        if let Some(reason) = validity.reason() {
            return Err(ConvertError::Validation(format!(
                "refusing to cache time snapshot for {}: {}",
                zone_id, reason
            )));
        }
        self.store.set(
            &zone_key(zone_id),
            data,
            Ttl::For(Duration::hours(ZONE_TTL_HOURS)),
        )
    }

    pub fn cached_time_zone_data(&self, zone_id: &str) -> Option<TimeZoneData> {
        self.read_validated(&zone_key(zone_id))
    }

    // ===== Preferences =====

    pub fn cache_preferences(&self, prefs: &UserPreferences) -> Result<()> {
        let validity = prefs.validity();
        if let Some(reason) = validity.reason() {
            return Err(ConvertError::Validation(format!(
                "refusing to cache preferences: {}",
                reason
            )));
        }
        self.store.set(PREFERENCES_KEY, prefs, Ttl::Never)
    }

    /// Always yields a complete object: the stored record is merged over
    /// the default preferences (missing fields filled in), then validated;
    /// any failure falls back to pure defaults.
    pub fn cached_preferences(&self) -> UserPreferences {
        let raw: Option<Value> = match self.store.get(PREFERENCES_KEY) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Failed to read preferences, using defaults");
                return UserPreferences::default();
            }
        };
        let Some(raw) = raw else {
            return UserPreferences::default();
        };
        // serde(default) on the struct performs the merge: absent fields
        // take default values, unknown fields are ignored.
        match serde_json::from_value::<UserPreferences>(raw) {
            Ok(prefs) if prefs.validity().is_valid() => prefs,
            Ok(_) | Err(_) => {
                warn!("Stored preferences failed validation, purging and using defaults");
                let _ = self.store.remove(PREFERENCES_KEY);
                UserPreferences::default()
            }
        }
    }

    // ===== Staleness and health =====

    /// Nothing cached counts as stale.
    pub fn is_data_stale(&self, key: &str, max_age: Duration) -> bool {
        match self.store.get_with_timestamp::<Value>(key) {
            Ok(Some((_, written_at))) => Utc::now() - written_at > max_age,
            Ok(None) => true,
            Err(e) => {
                debug!(key, error = %e, "Failed to read entry for staleness check");
                true
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let metadata = self.store.metadata();
        let rates_age = self
            .cached_exchange_rates()
            .map(|rates| age_display(Utc::now() - rates.timestamp));
        let has_preferences = matches!(
            self.store.get::<Value>(PREFERENCES_KEY),
            Ok(Some(_))
        );
        CacheStats {
            total_bytes: metadata.total_bytes,
            entry_count: metadata.entry_count,
            rates_age,
            has_preferences,
            last_cleanup: metadata.last_cleanup,
        }
    }

    fn read_validated<T>(&self, key: &str) -> Option<T>
    where
        T: serde::de::DeserializeOwned + Validate,
    {
        let value: Option<T> = match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Failed to read cache entry");
                return None;
            }
        };
        let value = value?;
        let validity = value.validity();
        if let Some(reason) = validity.reason() {
            warn!(key, reason, "Cached entry failed re-validation, purging");
            let _ = self.store.remove(key);
            return None;
        }
        Some(value)
    }
}

/// Human-readable age for health displays.
fn age_display(age: Duration) -> String {
    let minutes = age.num_minutes();
    if minutes < 1 {
        // Also covers clock skew gracefully
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        format!("{}h ago", minutes / 60)
    } else {
        format!("{}d ago", minutes / 1440)
    }
}
