//! Remote exchange-rate provider.
//!
//! The wire format is `GET {base_url}/latest?from=<BASE>` returning
//! `{ base, rates: {CUR: number, ...}, date }`. A response without a
//! `rates` object is malformed; non-2xx statuses are classified through
//! `ConvertError::from_status` (429 is rate limiting).

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ConvertError, Result};

use super::ExchangeRates;

/// Seam for the currency service: production uses HTTP, tests inject fakes.
pub trait RateProvider: Send + Sync {
    fn fetch_latest(&self, base: &str) -> impl Future<Output = Result<ExchangeRates>> + Send;
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    base: Option<String>,
    rates: Option<HashMap<String, f64>>,
    #[allow(dead_code)]
    date: Option<String>,
}

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpRateProvider {
    client: Client,
    base_url: String,
}

impl HttpRateProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConvertError::Unknown(format!("build http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

impl RateProvider for HttpRateProvider {
    async fn fetch_latest(&self, base: &str) -> Result<ExchangeRates> {
        let url = format!("{}/latest?from={}", self.base_url, base);
        debug!(url = %url, "Fetching exchange rates");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ConvertError::from_status(status, &body));
        }

        let parsed: RatesResponse = response
            .json()
            .await
            .map_err(|e| ConvertError::Api(format!("unparseable rates response: {}", e)))?;

        let rates = parsed
            .rates
            .ok_or_else(|| ConvertError::Api("malformed response: missing rates object".to_string()))?;

        Ok(ExchangeRates {
            base: parsed.base.unwrap_or_else(|| base.to_string()),
            rates,
            timestamp: Utc::now(),
            source: self.base_url.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_without_rates_is_detectable() {
        let parsed: RatesResponse =
            serde_json::from_str(r#"{"base":"USD","date":"2026-08-24"}"#).unwrap();
        assert!(parsed.rates.is_none());
    }

    #[test]
    fn test_response_parses_rates_map() {
        let parsed: RatesResponse = serde_json::from_str(
            r#"{"base":"USD","rates":{"EUR":0.85,"GBP":0.74},"date":"2026-08-24"}"#,
        )
        .unwrap();
        let rates = parsed.rates.unwrap();
        assert_eq!(rates.get("EUR"), Some(&0.85));
        assert_eq!(rates.len(), 2);
    }
}
