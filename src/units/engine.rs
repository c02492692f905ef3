//! The conversion engine.
//!
//! Stateless table arithmetic with a small memoizing layer in front of it.
//! The memo cache is purely a repeated-input optimization; nothing here
//! persists to the store because the source tables are static.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{ConvertError, Result};
use crate::memo::MemoCache;
use crate::units::catalog::{find_unit, Unit};
use crate::units::temperature;

/// Results are rounded to at most this many decimal places.
const MAX_DECIMAL_PLACES: u32 = 10;

/// Memo cache bounds. Small and short-lived; repeated conversions in a
/// session are the only thing this helps.
const MEMO_CAPACITY: usize = 256;
const MEMO_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    pub value: f64,
    pub formatted: String,
    pub unit: Unit,
    /// Number of decimal digits actually present in `formatted`.
    pub precision: u8,
    pub timestamp: DateTime<Utc>,
}

pub struct UnitEngine {
    memo: Mutex<MemoCache<(u64, &'static str, &'static str), f64>>,
}

impl Default for UnitEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitEngine {
    pub fn new() -> Self {
        Self {
            memo: Mutex::new(MemoCache::new(
                MEMO_CAPACITY,
                Duration::from_secs(MEMO_TTL_SECS),
            )),
        }
    }

    /// Convert `value` between two units of the same category.
    pub fn convert(&self, value: f64, from_id: &str, to_id: &str) -> Result<ConversionResult> {
        if !value.is_finite() {
            return Err(ConvertError::Validation(
                "value must be a finite number".to_string(),
            ));
        }
        let from = find_unit(from_id)
            .ok_or_else(|| ConvertError::Validation(format!("unknown unit '{}'", from_id)))?;
        let to = find_unit(to_id)
            .ok_or_else(|| ConvertError::Validation(format!("unknown unit '{}'", to_id)))?;
        if from.category != to.category {
            return Err(ConvertError::Conversion(format!(
                "cannot convert {} ({}) to {} ({})",
                from.id, from.category, to.id, to.category
            )));
        }

        let key = (value.to_bits(), from.id, to.id);
        let raw = match self.memo.lock().ok().and_then(|mut memo| memo.get(&key)) {
            Some(cached) => cached,
            None => {
                let computed = compute(value, from, to)?;
                if let Ok(mut memo) = self.memo.lock() {
                    memo.put(key, computed);
                }
                computed
            }
        };

        let rounded = round_to(raw, MAX_DECIMAL_PLACES);
        let formatted = format_trimmed(rounded);
        let precision = decimal_digits(&formatted);
        Ok(ConversionResult {
            value: rounded,
            formatted,
            unit: to.clone(),
            precision,
            timestamp: Utc::now(),
        })
    }

    /// Reject raw input before a numeric value is constructed: empty,
    /// non-numeric, NaN-like, and infinite strings all fail.
    pub fn validate_input(&self, raw: &str) -> bool {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return false;
        }
        match trimmed.parse::<f64>() {
            Ok(value) => value.is_finite(),
            Err(_) => false,
        }
    }
}

fn compute(value: f64, from: &Unit, to: &Unit) -> Result<f64> {
    if from.category == "temperature" {
        temperature::convert(value, from.id, to.id)
    } else {
        let base_value = value * from.base_multiplier;
        Ok(base_value / to.base_multiplier)
    }
}

fn round_to(value: f64, places: u32) -> f64 {
    // Past this magnitude f64 carries no fractional precision and the
    // scaling below would overflow to infinity.
    if value.abs() >= 1e15 {
        return value;
    }
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Fixed-width formatting with trailing zeros stripped.
fn format_trimmed(value: f64) -> String {
    let fixed = format!("{:.*}", MAX_DECIMAL_PLACES as usize, value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}

fn decimal_digits(formatted: &str) -> u8 {
    formatted
        .split_once('.')
        .map(|(_, frac)| frac.len() as u8)
        .unwrap_or(0)
}
