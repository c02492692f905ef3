//! Remote time provider.
//!
//! The wire format is `GET {base_url}/timezone/<IANA-ID>` returning
//! `{ datetime, timezone, utc_offset, dst, dst_offset }`. Missing
//! `datetime` or `timezone` makes the response malformed.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConvertError, Result};

/// One remote time snapshot for a zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeZoneData {
    pub datetime: String,
    pub timezone: String,
    #[serde(default)]
    pub utc_offset: String,
    #[serde(default)]
    pub dst: bool,
    #[serde(default)]
    pub dst_offset: i64,
}

impl TimeZoneData {
    pub fn is_well_formed(&self) -> bool {
        !self.datetime.is_empty() && !self.timezone.is_empty()
    }
}

/// Seam for the time zone service: production uses HTTP, tests inject fakes.
pub trait TimeProvider: Send + Sync {
    fn fetch_time(&self, zone_id: &str) -> impl Future<Output = Result<TimeZoneData>> + Send;
}

#[derive(Debug, Deserialize)]
struct TimeResponse {
    datetime: Option<String>,
    timezone: Option<String>,
    #[serde(default)]
    utc_offset: Option<String>,
    #[serde(default)]
    dst: Option<bool>,
    #[serde(default)]
    dst_offset: Option<i64>,
}

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTimeProvider {
    client: Client,
    base_url: String,
}

impl HttpTimeProvider {
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

impl TimeProvider for HttpTimeProvider {
    async fn fetch_time(&self, zone_id: &str) -> Result<TimeZoneData> {
        let url = format!("{}/timezone/{}", self.base_url, zone_id);
        debug!(url = %url, "Fetching remote time");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ConvertError::from_status(status, &body));
        }

        let parsed: TimeResponse = response
            .json()
            .await
            .map_err(|e| ConvertError::Api(format!("unparseable time response: {}", e)))?;

        let (Some(datetime), Some(timezone)) = (parsed.datetime, parsed.timezone) else {
            return Err(ConvertError::Api(
                "malformed response: missing datetime or timezone".to_string(),
            ));
        };
        if datetime.is_empty() || timezone.is_empty() {
            return Err(ConvertError::Api(
                "malformed response: empty datetime or timezone".to_string(),
            ));
        }

        Ok(TimeZoneData {
            datetime,
            timezone,
            utc_offset: parsed.utc_offset.unwrap_or_default(),
            dst: parsed.dst.unwrap_or(false),
            dst_offset: parsed.dst_offset.unwrap_or(0),
        })
    }
}
