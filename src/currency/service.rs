//! Currency service: fresh-snapshot, fetch-with-retry, cache-fallback.
//!
//! The layering for `exchange_rates` is, in order: an in-memory snapshot
//! younger than an hour, a remote fetch with exponential backoff, and
//! whatever snapshot survives in memory or on disk. An old snapshot is
//! still served offline; staleness is always reported to the caller
//! through `is_stale` rather than hidden.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::warn;

use crate::cache::{CacheManager, Validate};
use crate::error::{ConvertError, Result};
use crate::retry::{retry_async, RetryPolicy};

use super::catalog::{find_currency, supported_currencies, Currency};
use super::provider::RateProvider;

/// Snapshot age below which no fetch is attempted.
const FRESH_WINDOW_MINUTES: i64 = 60;

/// Rates older than this flag every conversion built on them as stale.
/// They are still served when nothing fresher exists.
const MAX_STALENESS_HOURS: i64 = 24;

/// A rate snapshot relative to one base currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRates {
    pub base: String,
    pub rates: HashMap<String, f64>,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

impl ExchangeRates {
    pub fn age(&self) -> Duration {
        Utc::now() - self.timestamp
    }

    pub fn is_fresh(&self) -> bool {
        self.age() <= Duration::minutes(FRESH_WINDOW_MINUTES)
    }

    pub fn is_stale(&self) -> bool {
        self.age() > Duration::hours(MAX_STALENESS_HOURS)
    }

    /// Recompute the table relative to a different base using existing
    /// cross-rates: `rate'[x] = rate[x] / rate[new_base]`, with the old
    /// base itself becoming `1 / rate[new_base]`.
    pub fn rebased(&self, new_base: &str) -> Result<ExchangeRates> {
        if new_base == self.base {
            return Ok(self.clone());
        }
        let pivot = *self.rates.get(new_base).ok_or_else(|| {
            ConvertError::Conversion(format!(
                "no cross-rate from {} to {}",
                self.base, new_base
            ))
        })?;
        if pivot <= 0.0 {
            return Err(ConvertError::Conversion(format!(
                "non-positive cross-rate for {}",
                new_base
            )));
        }
        let mut rates: HashMap<String, f64> = self
            .rates
            .iter()
            .filter(|(code, _)| code.as_str() != new_base)
            .map(|(code, rate)| (code.clone(), rate / pivot))
            .collect();
        rates.insert(self.base.clone(), 1.0 / pivot);
        Ok(ExchangeRates {
            base: new_base.to_string(),
            rates,
            timestamp: self.timestamp,
            source: self.source.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrencyConversionResult {
    pub amount: f64,
    pub formatted: String,
    pub from: String,
    pub to: String,
    pub rate: f64,
    pub timestamp: DateTime<Utc>,
    /// True when the rate behind this conversion is older than the
    /// staleness threshold. Always populated so callers can warn users.
    pub is_stale: bool,
}

pub struct CurrencyService<P: RateProvider> {
    provider: P,
    cache: Arc<CacheManager>,
    policy: RetryPolicy,
    snapshot: RwLock<Option<ExchangeRates>>,
    online: AtomicBool,
}

impl<P: RateProvider> CurrencyService<P> {
    pub fn new(provider: P, cache: Arc<CacheManager>, policy: RetryPolicy) -> Self {
        Self {
            provider,
            cache,
            policy,
            snapshot: RwLock::new(None),
            online: AtomicBool::new(true),
        }
    }

    pub fn supported_currencies(&self) -> &'static [Currency] {
        supported_currencies()
    }

    /// Outcome of the most recent fetch attempt. Offline-ness is otherwise
    /// discovered by attempting a fetch and falling back.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    pub fn is_rate_stale(&self, timestamp: DateTime<Utc>) -> bool {
        Utc::now() - timestamp > Duration::hours(MAX_STALENESS_HOURS)
    }

    /// Timestamp of the most recent usable snapshot, if any.
    pub async fn last_update_time(&self) -> Option<DateTime<Utc>> {
        if let Some(ref snapshot) = *self.snapshot.read().await {
            return Some(snapshot.timestamp);
        }
        self.cache.cached_exchange_rates().map(|rates| rates.timestamp)
    }

    /// Produce a rate snapshot for `base`, re-basing or fetching as needed.
    pub async fn exchange_rates(&self, base: &str) -> Result<ExchangeRates> {
        let base = validate_currency_code(base)?;

        if let Some(ref snapshot) = *self.snapshot.read().await {
            if snapshot.is_fresh() {
                if snapshot.base == base {
                    return Ok(snapshot.clone());
                }
                // A fresh snapshot without the requested cross-rate cannot
                // be re-based; fall through to a fetch instead.
                if snapshot.rates.contains_key(&base) {
                    return snapshot.rebased(&base);
                }
            }
        }

        match self.fetch_and_cache(&base).await {
            Ok(rates) => Ok(rates),
            Err(fetch_err) => {
                warn!(base = %base, error = %fetch_err, "Fetch failed, trying cached rates");
                // Old snapshots are still served; `convert` reports their
                // age through `is_stale`.
                if let Some(ref snapshot) = *self.snapshot.read().await {
                    if snapshot.base == base || snapshot.rates.contains_key(&base) {
                        return snapshot.rebased(&base);
                    }
                }
                match self.cache.cached_exchange_rates() {
                    Some(cached) => {
                        let rebased = cached.rebased(&base)?;
                        *self.snapshot.write().await = Some(cached);
                        Ok(rebased)
                    }
                    None => Err(fetch_err),
                }
            }
        }
    }

    async fn fetch_and_cache(&self, base: &str) -> Result<ExchangeRates> {
        let result = retry_async(&self.policy, "exchange_rates", || {
            self.provider.fetch_latest(base)
        })
        .await;

        match result {
            Ok(rates) => {
                if let Some(reason) = rates.validity().reason() {
                    return Err(ConvertError::Api(format!(
                        "provider returned invalid rates: {}",
                        reason
                    )));
                }
                self.online.store(true, Ordering::Relaxed);
                // Last-good rates live in memory even when the disk write
                // fails; persistence is best-effort.
                if let Err(e) = self.cache.cache_exchange_rates(&rates) {
                    warn!(error = %e, "Failed to persist fetched rates");
                }
                *self.snapshot.write().await = Some(rates.clone());
                Ok(rates)
            }
            Err(err) => {
                if matches!(err, ConvertError::Network(_)) {
                    self.online.store(false, Ordering::Relaxed);
                }
                Err(err)
            }
        }
    }

    /// Convert an amount between two supported currencies.
    pub async fn convert(
        &self,
        amount: f64,
        from: &str,
        to: &str,
    ) -> Result<CurrencyConversionResult> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(ConvertError::Validation(
                "amount must be a finite, non-negative number".to_string(),
            ));
        }
        let from = validate_currency_code(from)?;
        let to = validate_currency_code(to)?;

        if from == to {
            // Identity conversion costs nothing and can never be stale.
            return Ok(CurrencyConversionResult {
                amount,
                formatted: format_amount(amount),
                from,
                to,
                rate: 1.0,
                timestamp: Utc::now(),
                is_stale: false,
            });
        }

        let rates = self.exchange_rates(&from).await?;
        let rate = *rates.rates.get(&to).ok_or_else(|| {
            ConvertError::Conversion(format!("no rate from {} to {}", from, to))
        })?;
        let converted = amount * rate;
        Ok(CurrencyConversionResult {
            amount: converted,
            formatted: format_amount(converted),
            from,
            to,
            rate,
            timestamp: rates.timestamp,
            is_stale: self.is_rate_stale(rates.timestamp),
        })
    }
}

fn validate_currency_code(code: &str) -> Result<String> {
    let currency = find_currency(code)
        .ok_or_else(|| ConvertError::Validation(format!("unsupported currency '{}'", code)))?;
    Ok(currency.code.to_string())
}

/// Two-decimal amount with thousands grouping, e.g. 1234567.8 -> "1,234,567.80"
fn format_amount(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::new();
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(base: &str, pairs: &[(&str, f64)], age_hours: i64) -> ExchangeRates {
        ExchangeRates {
            base: base.to_string(),
            rates: pairs
                .iter()
                .map(|(code, rate)| (code.to_string(), *rate))
                .collect(),
            timestamp: Utc::now() - Duration::hours(age_hours),
            source: "test".to_string(),
        }
    }

    #[test]
    fn test_rebase_arithmetic() {
        let usd = snapshot("USD", &[("EUR", 0.8), ("GBP", 0.5)], 0);
        let eur = usd.rebased("EUR").unwrap();
        assert_eq!(eur.base, "EUR");
        assert!((eur.rates["USD"] - 1.25).abs() < 1e-12);
        assert!((eur.rates["GBP"] - 0.625).abs() < 1e-12);
        assert!(!eur.rates.contains_key("EUR"));
    }

    #[test]
    fn test_rebase_to_same_base_is_identity() {
        let usd = snapshot("USD", &[("EUR", 0.8)], 0);
        let same = usd.rebased("USD").unwrap();
        assert_eq!(same.rates["EUR"], 0.8);
    }

    #[test]
    fn test_rebase_without_cross_rate_fails() {
        let usd = snapshot("USD", &[("EUR", 0.8)], 0);
        assert!(matches!(
            usd.rebased("JPY"),
            Err(ConvertError::Conversion(_))
        ));
    }

    #[test]
    fn test_freshness_and_staleness_windows() {
        assert!(snapshot("USD", &[], 0).is_fresh());
        assert!(!snapshot("USD", &[], 2).is_fresh());
        assert!(!snapshot("USD", &[], 2).is_stale());
        assert!(snapshot("USD", &[], 25).is_stale());
    }

    #[test]
    fn test_format_amount_groups_thousands() {
        assert_eq!(format_amount(85.0), "85.00");
        assert_eq!(format_amount(1234567.8), "1,234,567.80");
        assert_eq!(format_amount(-1000.5), "-1,000.50");
        assert_eq!(format_amount(0.0), "0.00");
    }

    #[test]
    fn test_validate_currency_code_uppercases() {
        assert_eq!(validate_currency_code("usd").unwrap(), "USD");
        assert!(validate_currency_code("???").is_err());
    }
}
