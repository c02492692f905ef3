//! Time zone service: remote-first current time, zoned conversion, DST
//! transition detection.
//!
//! The remote path is an accuracy enhancement, never a requirement: every
//! operation has a local fallback driven by the chrono-tz rule database.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Offset, TimeZone as _, Utc};
use chrono_tz::{OffsetComponents, Tz};
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::CacheManager;
use crate::error::{ConvertError, Result};
use crate::retry::{retry_async, RetryPolicy};

use super::catalog::{search_zones, supported_time_zones, validate_zone, TimeZone};
use super::provider::{TimeProvider, TimeZoneData};

/// One side of a zoned conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ZoneInstant {
    pub zone_id: String,
    /// Local wall-clock rendering of the instant, RFC 3339.
    pub local: String,
    pub utc_offset_minutes: i32,
    pub is_dst: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeConversionResult {
    pub instant: DateTime<Utc>,
    pub source: ZoneInstant,
    pub target: ZoneInstant,
    /// True when a DST transition falls within a day of the instant in
    /// either zone, so the wall-clock relationship is about to shift.
    pub is_dst_transition: bool,
}

pub struct TimeZoneService<P: TimeProvider> {
    provider: P,
    cache: Arc<CacheManager>,
    policy: RetryPolicy,
    online: AtomicBool,
}

impl<P: TimeProvider> TimeZoneService<P> {
    pub fn new(provider: P, cache: Arc<CacheManager>, policy: RetryPolicy) -> Self {
        Self {
            provider,
            cache,
            policy,
            online: AtomicBool::new(true),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    pub fn supported_time_zones(&self) -> Vec<TimeZone> {
        supported_time_zones()
    }

    pub fn search(&self, query: &str) -> Vec<TimeZone> {
        search_zones(query)
    }

    pub fn validate_zone(&self, id: &str) -> bool {
        validate_zone(id)
    }

    /// Current time in a zone. Tries the remote provider for an
    /// authoritative instant; any failure falls back to the local clock
    /// shifted into the zone.
    pub async fn current_time(&self, zone_id: &str) -> Result<DateTime<Tz>> {
        let tz = parse_zone(zone_id)?;

        let fetched = retry_async(&self.policy, "current_time", || {
            self.provider.fetch_time(zone_id)
        })
        .await;

        match fetched {
            Ok(data) => {
                self.online.store(true, Ordering::Relaxed);
                if let Err(e) = self.cache.cache_time_zone_data(zone_id, &data) {
                    warn!(zone = zone_id, error = %e, "Failed to cache time snapshot");
                }
                match DateTime::parse_from_rfc3339(&data.datetime) {
                    Ok(remote) => Ok(remote.with_timezone(&tz)),
                    Err(e) => {
                        debug!(zone = zone_id, error = %e, "Unparseable remote datetime, using local clock");
                        Ok(Utc::now().with_timezone(&tz))
                    }
                }
            }
            Err(err) => {
                if matches!(err, ConvertError::Network(_)) {
                    self.online.store(false, Ordering::Relaxed);
                }
                debug!(zone = zone_id, error = %err, "Remote time unavailable, using local clock");
                Ok(Utc::now().with_timezone(&tz))
            }
        }
    }

    /// Cached remote snapshot for a zone, if one is still valid.
    pub fn cached_snapshot(&self, zone_id: &str) -> Option<TimeZoneData> {
        self.cache.cached_time_zone_data(zone_id)
    }

    /// Convert an instant between two zones and flag DST sensitivity.
    pub fn convert_time(
        &self,
        instant: DateTime<Utc>,
        from_zone: &str,
        to_zone: &str,
    ) -> Result<TimeConversionResult> {
        let from_tz = parse_zone(from_zone)?;
        let to_tz = parse_zone(to_zone)?;

        let source = zone_instant(instant, from_zone, from_tz);
        let target = zone_instant(instant, to_zone, to_tz);

        // A transition within a day on either side means the wall-clock
        // relationship between the zones is not stable around the instant.
        let is_dst_transition = transition_near(instant, from_tz) || transition_near(instant, to_tz);

        Ok(TimeConversionResult {
            instant,
            source,
            target,
            is_dst_transition,
        })
    }

    /// Whether DST is in effect in a zone at a given instant.
    pub fn is_dst_active(&self, zone_id: &str, at: DateTime<Utc>) -> Result<bool> {
        let tz = parse_zone(zone_id)?;
        Ok(dst_active(tz, at))
    }
}

fn parse_zone(zone_id: &str) -> Result<Tz> {
    Tz::from_str(zone_id)
        .map_err(|_| ConvertError::Validation(format!("unknown time zone '{}'", zone_id)))
}

fn zone_instant(instant: DateTime<Utc>, zone_id: &str, tz: Tz) -> ZoneInstant {
    let local = instant.with_timezone(&tz);
    let offset = *local.offset();
    ZoneInstant {
        zone_id: zone_id.to_string(),
        local: local.to_rfc3339(),
        utc_offset_minutes: offset.fix().local_minus_utc() / 60,
        is_dst: dst_active(tz, instant),
    }
}

/// DST status straight from the rule database, with a winter/summer offset
/// comparison as the fallback for zones whose rules encode the seasonal
/// shift without a DST component.
fn dst_active(tz: Tz, at: DateTime<Utc>) -> bool {
    let offset = *at.with_timezone(&tz).offset();
    if !offset.dst_offset().is_zero() {
        return true;
    }
    let current = offset.fix().local_minus_utc();
    let january = offset_in_month(tz, at.year(), 1);
    let july = offset_in_month(tz, at.year(), 7);
    if january == july {
        return false;
    }
    current > january.min(july)
}

fn offset_in_month(tz: Tz, year: i32, month: u32) -> i32 {
    match Utc.with_ymd_and_hms(year, month, 15, 12, 0, 0) {
        chrono::LocalResult::Single(mid_month) => {
            mid_month.with_timezone(&tz).offset().fix().local_minus_utc()
        }
        _ => 0,
    }
}

fn transition_near(instant: DateTime<Utc>, tz: Tz) -> bool {
    let before = dst_active(tz, instant - Duration::days(1));
    let at = dst_active(tz, instant);
    let after = dst_active(tz, instant + Duration::days(1));
    before != at || at != after
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    fn winter() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
    }

    fn summer() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_dst_observing_zone_differs_by_season() {
        let tz: Tz = "America/New_York".parse().unwrap();
        assert!(!dst_active(tz, winter()));
        assert!(dst_active(tz, summer()));
    }

    #[test]
    fn test_southern_hemisphere_is_inverted() {
        let tz: Tz = "Australia/Sydney".parse().unwrap();
        assert!(dst_active(tz, winter()));
        assert!(!dst_active(tz, summer()));
    }

    #[test]
    fn test_non_observing_zone_is_never_dst() {
        for id in ["UTC", "Asia/Tokyo", "America/Phoenix"] {
            let tz: Tz = id.parse().unwrap();
            assert!(!dst_active(tz, winter()), "{} in winter", id);
            assert!(!dst_active(tz, summer()), "{} in summer", id);
        }
    }

    #[test]
    fn test_transition_detected_around_spring_forward() {
        // US spring-forward 2026 is March 8 at 02:00 local.
        let tz: Tz = "America/New_York".parse().unwrap();
        let near = Utc.with_ymd_and_hms(2026, 3, 8, 12, 0, 0).unwrap();
        let far = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        assert!(transition_near(near, tz));
        assert!(!transition_near(far, tz));
    }

    #[test]
    fn test_offset_in_month_tracks_dst() {
        let tz: Tz = "Europe/Paris".parse().unwrap();
        assert_eq!(offset_in_month(tz, 2026, 1), 3600);
        assert_eq!(offset_in_month(tz, 2026, 7), 7200);
    }
}
