//! The curated zone list and search.
//!
//! Offsets and DST flags come from the chrono-tz database at query time;
//! the static table only carries identity and geography.

use std::str::FromStr;

use chrono::{Offset, Utc};
use chrono_tz::{OffsetComponents, Tz};
use serde::Serialize;

/// Maximum results returned by a search.
const SEARCH_RESULT_CAP: usize = 50;

/// Number of zones served for empty/short queries.
const DEFAULT_SLICE_LEN: usize = 10;

/// Queries shorter than this get the default slice instead of a scan.
const MIN_QUERY_LEN: usize = 2;

/// Static identity of one supported zone.
#[derive(Debug, Clone, Copy)]
pub struct ZoneEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub country: &'static str,
    pub region: &'static str,
}

/// A zone with its current offset state resolved.
#[derive(Debug, Clone, Serialize)]
pub struct TimeZone {
    pub id: String,
    pub name: String,
    pub utc_offset_minutes: i32,
    pub is_dst: bool,
    pub country: String,
    pub region: String,
}

const ZONES: &[ZoneEntry] = &[
    ZoneEntry { id: "UTC", name: "Coordinated Universal Time", country: "", region: "" },
    ZoneEntry { id: "America/New_York", name: "New York", country: "United States", region: "North America" },
    ZoneEntry { id: "America/Chicago", name: "Chicago", country: "United States", region: "North America" },
    ZoneEntry { id: "America/Denver", name: "Denver", country: "United States", region: "North America" },
    ZoneEntry { id: "America/Los_Angeles", name: "Los Angeles", country: "United States", region: "North America" },
    ZoneEntry { id: "America/Anchorage", name: "Anchorage", country: "United States", region: "North America" },
    ZoneEntry { id: "America/Toronto", name: "Toronto", country: "Canada", region: "North America" },
    ZoneEntry { id: "America/Vancouver", name: "Vancouver", country: "Canada", region: "North America" },
    ZoneEntry { id: "America/Mexico_City", name: "Mexico City", country: "Mexico", region: "North America" },
    ZoneEntry { id: "America/Sao_Paulo", name: "São Paulo", country: "Brazil", region: "South America" },
    ZoneEntry { id: "America/Argentina/Buenos_Aires", name: "Buenos Aires", country: "Argentina", region: "South America" },
    ZoneEntry { id: "America/Phoenix", name: "Phoenix", country: "United States", region: "North America" },
    ZoneEntry { id: "Europe/London", name: "London", country: "United Kingdom", region: "Europe" },
    ZoneEntry { id: "Europe/Paris", name: "Paris", country: "France", region: "Europe" },
    ZoneEntry { id: "Europe/Berlin", name: "Berlin", country: "Germany", region: "Europe" },
    ZoneEntry { id: "Europe/Madrid", name: "Madrid", country: "Spain", region: "Europe" },
    ZoneEntry { id: "Europe/Rome", name: "Rome", country: "Italy", region: "Europe" },
    ZoneEntry { id: "Europe/Amsterdam", name: "Amsterdam", country: "Netherlands", region: "Europe" },
    ZoneEntry { id: "Europe/Zurich", name: "Zurich", country: "Switzerland", region: "Europe" },
    ZoneEntry { id: "Europe/Stockholm", name: "Stockholm", country: "Sweden", region: "Europe" },
    ZoneEntry { id: "Europe/Warsaw", name: "Warsaw", country: "Poland", region: "Europe" },
    ZoneEntry { id: "Europe/Moscow", name: "Moscow", country: "Russia", region: "Europe" },
    ZoneEntry { id: "Europe/Istanbul", name: "Istanbul", country: "Turkey", region: "Europe" },
    ZoneEntry { id: "Africa/Cairo", name: "Cairo", country: "Egypt", region: "Africa" },
    ZoneEntry { id: "Africa/Lagos", name: "Lagos", country: "Nigeria", region: "Africa" },
    ZoneEntry { id: "Africa/Johannesburg", name: "Johannesburg", country: "South Africa", region: "Africa" },
    ZoneEntry { id: "Africa/Nairobi", name: "Nairobi", country: "Kenya", region: "Africa" },
    ZoneEntry { id: "Asia/Dubai", name: "Dubai", country: "United Arab Emirates", region: "Asia" },
    ZoneEntry { id: "Asia/Karachi", name: "Karachi", country: "Pakistan", region: "Asia" },
    ZoneEntry { id: "Asia/Kolkata", name: "Kolkata", country: "India", region: "Asia" },
    ZoneEntry { id: "Asia/Dhaka", name: "Dhaka", country: "Bangladesh", region: "Asia" },
    ZoneEntry { id: "Asia/Bangkok", name: "Bangkok", country: "Thailand", region: "Asia" },
    ZoneEntry { id: "Asia/Singapore", name: "Singapore", country: "Singapore", region: "Asia" },
    ZoneEntry { id: "Asia/Hong_Kong", name: "Hong Kong", country: "China", region: "Asia" },
    ZoneEntry { id: "Asia/Shanghai", name: "Shanghai", country: "China", region: "Asia" },
    ZoneEntry { id: "Asia/Tokyo", name: "Tokyo", country: "Japan", region: "Asia" },
    ZoneEntry { id: "Asia/Seoul", name: "Seoul", country: "South Korea", region: "Asia" },
    ZoneEntry { id: "Australia/Perth", name: "Perth", country: "Australia", region: "Oceania" },
    ZoneEntry { id: "Australia/Sydney", name: "Sydney", country: "Australia", region: "Oceania" },
    ZoneEntry { id: "Australia/Melbourne", name: "Melbourne", country: "Australia", region: "Oceania" },
    ZoneEntry { id: "Pacific/Auckland", name: "Auckland", country: "New Zealand", region: "Oceania" },
    ZoneEntry { id: "Pacific/Honolulu", name: "Honolulu", country: "United States", region: "Oceania" },
];

/// Whether an id resolves in the IANA database.
pub fn validate_zone(id: &str) -> bool {
    Tz::from_str(id).is_ok()
}

fn resolve(entry: &ZoneEntry) -> TimeZone {
    let (offset_minutes, is_dst) = Tz::from_str(entry.id)
        .map(|tz| {
            let offset = Utc::now().with_timezone(&tz).offset().clone();
            let minutes = offset.fix().local_minus_utc() / 60;
            let dst = !offset.dst_offset().is_zero();
            (minutes, dst)
        })
        .unwrap_or((0, false));
    TimeZone {
        id: entry.id.to_string(),
        name: entry.name.to_string(),
        utc_offset_minutes: offset_minutes,
        is_dst,
        country: entry.country.to_string(),
        region: entry.region.to_string(),
    }
}

pub fn supported_time_zones() -> Vec<TimeZone> {
    ZONES.iter().map(resolve).collect()
}

/// Case-insensitive substring search over name, id, country, and region.
/// Short queries return a fixed default slice rather than the full set.
pub fn search_zones(query: &str) -> Vec<TimeZone> {
    let query = query.trim().to_lowercase();
    if query.len() < MIN_QUERY_LEN {
        return ZONES.iter().take(DEFAULT_SLICE_LEN).map(resolve).collect();
    }
    ZONES
        .iter()
        .filter(|entry| {
            entry.name.to_lowercase().contains(&query)
                || entry.id.to_lowercase().contains(&query)
                || entry.country.to_lowercase().contains(&query)
                || entry.region.to_lowercase().contains(&query)
        })
        .take(SEARCH_RESULT_CAP)
        .map(resolve)
        .collect()
}
