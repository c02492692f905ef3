//! One validator abstraction for every cached entity.
//!
//! Each `cache_*`/`cached_*` pair in the manager runs the same trait
//! before a write and again after a read, so a record that drifted on disk
//! is caught on the way back out.

use chrono::{Duration, Utc};

use crate::currency::ExchangeRates;
use crate::prefs::UserPreferences;
use crate::timezone::TimeZoneData;

/// Rate snapshots older than this can never have come from a sane fetch.
const RATES_MAX_AGE_DAYS: i64 = 7;

/// Tolerated forward clock skew on rate timestamps.
const RATES_MAX_SKEW_DAYS: i64 = 1;

/// Tagged validation outcome. `Invalid` carries the reason for logs and
/// validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Validity {
    Valid,
    Invalid(String),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Validity::Valid => None,
            Validity::Invalid(reason) => Some(reason),
        }
    }
}

pub trait Validate {
    fn validity(&self) -> Validity;
}

impl Validate for ExchangeRates {
    fn validity(&self) -> Validity {
        if self.base.is_empty() {
            return Validity::Invalid("empty base currency".to_string());
        }
        if self.rates.is_empty() {
            return Validity::Invalid("empty rate table".to_string());
        }
        if let Some((code, rate)) = self
            .rates
            .iter()
            .find(|(_, rate)| !rate.is_finite() || **rate <= 0.0)
        {
            return Validity::Invalid(format!("non-positive rate {} for {}", rate, code));
        }
        let age = Utc::now() - self.timestamp;
        if age > Duration::days(RATES_MAX_AGE_DAYS) {
            return Validity::Invalid(format!("timestamp too old ({} days)", age.num_days()));
        }
        if age < -Duration::days(RATES_MAX_SKEW_DAYS) {
            return Validity::Invalid("timestamp in the future".to_string());
        }
        Validity::Valid
    }
}

impl Validate for TimeZoneData {
    fn validity(&self) -> Validity {
        if self.is_well_formed() {
            Validity::Valid
        } else {
            Validity::Invalid("missing datetime or timezone".to_string())
        }
    }
}

impl Validate for UserPreferences {
    fn validity(&self) -> Validity {
        if self.is_valid() {
            Validity::Valid
        } else {
            Validity::Invalid("preference field out of range".to_string())
        }
    }
}
