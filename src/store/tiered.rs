use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{ConvertError, Result};

/// Schema version stamped into every persisted entry.
pub const ENTRY_SCHEMA_VERSION: &str = "1";

/// Default TTL applied when the caller does not specify one.
const DEFAULT_TTL_HOURS: i64 = 24;

/// Keys that survive a non-full `clear()`.
const PRESERVED_KEYS: [&str; 2] = ["user_preferences", "schema_version"];

/// Delay before the first background sweep after startup.
const SWEEP_STARTUP_DELAY_SECS: u64 = 30;

/// Interval between background sweeps.
const SWEEP_INTERVAL_SECS: u64 = 3600;

/// Time-to-live for a stored entry.
#[derive(Debug, Clone, Copy)]
pub enum Ttl {
    /// Apply the store default (24 hours).
    Default,
    /// The entry never expires.
    Never,
    /// Explicit duration. Negative durations produce an entry that is
    /// already expired on the next read.
    For(Duration),
}

/// Persisted record layout, identical for every domain.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    data: Value,
    timestamp: DateTime<Utc>,
    /// `None` means the entry never expires.
    expires_at: Option<DateTime<Utc>>,
    version: String,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now > expires_at,
            None => false,
        }
    }

    /// Structural validation: all fields usable and internally consistent.
    fn is_well_formed(&self) -> bool {
        if self.version.is_empty() {
            return false;
        }
        // A negative-TTL entry legitimately has expires_at < timestamp; it
        // is well-formed, just instantly expired. Only reject nonsense data.
        !self.data.is_null()
    }
}

/// Bookkeeping recomputed after every mutating store operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub total_bytes: u64,
    pub entry_count: usize,
    pub last_cleanup: Option<DateTime<Utc>>,
    pub version: String,
}

impl Default for CacheMetadata {
    fn default() -> Self {
        Self {
            total_bytes: 0,
            entry_count: 0,
            last_cleanup: None,
            version: ENTRY_SCHEMA_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
struct Tier {
    dir: PathBuf,
    capacity_bytes: u64,
}

impl Tier {
    fn entry_path(&self, key: &str) -> PathBuf {
        // Keys may carry zone ids with '/' in them; keep filenames flat.
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '-' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }

    fn used_bytes(&self) -> u64 {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };
        entries
            .flatten()
            .filter_map(|e| e.metadata().ok())
            .filter(|m| m.is_file())
            .map(|m| m.len())
            .sum()
    }

    fn entry_count(&self) -> usize {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };
        entries
            .flatten()
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            .count()
    }

    /// Whether a payload of `bytes` fits, accounting for an existing entry
    /// under the same key being replaced.
    fn fits(&self, key: &str, bytes: u64) -> bool {
        let existing = fs::metadata(self.entry_path(key)).map(|m| m.len()).unwrap_or(0);
        self.used_bytes().saturating_sub(existing) + bytes <= self.capacity_bytes
    }
}

/// Capacity-limited primary store with an automatic higher-capacity
/// secondary tier used only on overflow.
pub struct TieredStore {
    primary: Tier,
    secondary: Tier,
    metadata: Mutex<CacheMetadata>,
}

impl TieredStore {
    pub fn new(root: PathBuf, primary_capacity: u64, secondary_capacity: u64) -> Result<Self> {
        let primary = Tier {
            dir: root.join("primary"),
            capacity_bytes: primary_capacity,
        };
        let secondary = Tier {
            dir: root.join("secondary"),
            capacity_bytes: secondary_capacity,
        };
        for tier in [&primary, &secondary] {
            fs::create_dir_all(&tier.dir)
                .map_err(|e| ConvertError::Storage(format!("create store dir: {}", e)))?;
        }
        let store = Self {
            primary,
            secondary,
            metadata: Mutex::new(CacheMetadata::default()),
        };
        store.recompute_metadata(None);
        Ok(store)
    }

    /// Read a value. Expired or structurally damaged entries are purged and
    /// reported as absent; corruption never reaches the caller.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get_with_timestamp(key).map(|opt| opt.map(|(value, _)| value))
    }

    /// Like `get`, but also returns the entry's write timestamp for
    /// staleness classification by the layer above.
    pub fn get_with_timestamp<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<(T, DateTime<Utc>)>> {
        for tier in [&self.primary, &self.secondary] {
            let path = tier.entry_path(key);
            if !path.exists() {
                continue;
            }
            let contents = match fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    warn!(key, error = %e, "Unreadable cache entry, purging");
                    let _ = fs::remove_file(&path);
                    continue;
                }
            };
            let entry: CacheEntry = match serde_json::from_str(&contents) {
                Ok(e) => e,
                Err(e) => {
                    warn!(key, error = %e, "Malformed cache entry, purging");
                    let _ = fs::remove_file(&path);
                    self.recompute_metadata(None);
                    continue;
                }
            };
            if !entry.is_well_formed() {
                warn!(key, "Structurally invalid cache entry, purging");
                let _ = fs::remove_file(&path);
                self.recompute_metadata(None);
                continue;
            }
            if entry.is_expired(Utc::now()) {
                debug!(key, "Cache entry expired, purging");
                let _ = fs::remove_file(&path);
                self.recompute_metadata(None);
                continue;
            }
            match serde_json::from_value::<T>(entry.data) {
                Ok(value) => return Ok(Some((value, entry.timestamp))),
                Err(e) => {
                    warn!(key, error = %e, "Cache payload does not match expected shape, purging");
                    let _ = fs::remove_file(&path);
                    self.recompute_metadata(None);
                }
            }
        }
        Ok(None)
    }

    /// Write a value, spilling to the secondary tier when the primary is
    /// full even after sweeping expired entries.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Ttl) -> Result<()> {
        let now = Utc::now();
        let expires_at = match ttl {
            Ttl::Default => Some(now + Duration::hours(DEFAULT_TTL_HOURS)),
            Ttl::Never => None,
            Ttl::For(duration) => Some(now + duration),
        };
        let entry = CacheEntry {
            data: serde_json::to_value(value)
                .map_err(|e| ConvertError::Unknown(format!("serialize payload: {}", e)))?,
            timestamp: now,
            expires_at,
            version: ENTRY_SCHEMA_VERSION.to_string(),
        };
        let contents = serde_json::to_string(&entry)
            .map_err(|e| ConvertError::Unknown(format!("serialize entry: {}", e)))?;
        let bytes = contents.len() as u64;

        if !self.primary.fits(key, bytes) {
            // Sweep and retry once before falling through to the next tier.
            self.sweep_tier(&self.primary);
        }
        if self.primary.fits(key, bytes) {
            self.write_to(&self.primary, &self.secondary, key, &contents)?;
            return Ok(());
        }

        debug!(key, bytes, "Primary tier full, spilling to secondary");
        if !self.secondary.fits(key, bytes) {
            self.sweep_tier(&self.secondary);
        }
        if self.secondary.fits(key, bytes) {
            self.write_to(&self.secondary, &self.primary, key, &contents)?;
            return Ok(());
        }

        Err(ConvertError::Storage(format!(
            "entry '{}' ({} bytes) does not fit in either store tier",
            key, bytes
        )))
    }

    fn write_to(&self, target: &Tier, other: &Tier, key: &str, contents: &str) -> Result<()> {
        fs::write(target.entry_path(key), contents)
            .map_err(|e| ConvertError::Storage(format!("write entry '{}': {}", key, e)))?;
        // A key lives in exactly one tier; drop any shadow copy.
        let _ = fs::remove_file(other.entry_path(key));
        self.recompute_metadata(None);
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        for tier in [&self.primary, &self.secondary] {
            let path = tier.entry_path(key);
            if path.exists() {
                fs::remove_file(&path)
                    .map_err(|e| ConvertError::Storage(format!("remove entry '{}': {}", key, e)))?;
            }
        }
        self.recompute_metadata(None);
        Ok(())
    }

    /// Remove entries from both tiers. Unless `full` is set, the allow-list
    /// (preferences, version marker) is preserved.
    pub fn clear(&self, full: bool) -> Result<()> {
        for tier in [&self.primary, &self.secondary] {
            let Ok(entries) = fs::read_dir(&tier.dir) else {
                continue;
            };
            for dir_entry in entries.flatten() {
                let path = dir_entry.path();
                if !full {
                    let preserved = PRESERVED_KEYS
                        .iter()
                        .any(|key| path == tier.entry_path(key));
                    if preserved {
                        continue;
                    }
                }
                if let Err(e) = fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %e, "Failed to remove entry during clear");
                }
            }
        }
        self.recompute_metadata(None);
        Ok(())
    }

    /// Total bytes used across both tiers.
    pub fn size(&self) -> u64 {
        self.primary.used_bytes() + self.secondary.used_bytes()
    }

    pub fn metadata(&self) -> CacheMetadata {
        self.metadata
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Remove expired entries from both tiers. Returns the number removed.
    pub fn sweep_expired(&self) -> usize {
        let removed = self.sweep_tier(&self.primary) + self.sweep_tier(&self.secondary);
        self.recompute_metadata(Some(Utc::now()));
        if removed > 0 {
            info!(removed, "Swept expired cache entries");
        }
        removed
    }

    fn sweep_tier(&self, tier: &Tier) -> usize {
        let now = Utc::now();
        let Ok(entries) = fs::read_dir(&tier.dir) else {
            return 0;
        };
        let mut removed = 0;
        for dir_entry in entries.flatten() {
            let path = dir_entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            let expired = fs::read_to_string(&path)
                .ok()
                .and_then(|c| serde_json::from_str::<CacheEntry>(&c).ok())
                // Unparseable entries are corrupt and get swept too.
                .map_or(true, |entry| entry.is_expired(now));
            if expired && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    fn recompute_metadata(&self, cleanup_time: Option<DateTime<Utc>>) {
        if let Ok(mut meta) = self.metadata.lock() {
            meta.total_bytes = self.primary.used_bytes() + self.secondary.used_bytes();
            meta.entry_count = self.primary.entry_count() + self.secondary.entry_count();
            if cleanup_time.is_some() {
                meta.last_cleanup = cleanup_time;
            }
            meta.version = ENTRY_SCHEMA_VERSION.to_string();
        }
    }

    /// Start the hourly background sweep. Failures are logged and skipped;
    /// the sweep never interrupts in-flight requests.
    pub fn spawn_sweeper(store: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            tokio::time::sleep(StdDuration::from_secs(SWEEP_STARTUP_DELAY_SECS)).await;
            let mut ticker =
                tokio::time::interval(StdDuration::from_secs(SWEEP_INTERVAL_SECS));
            loop {
                ticker.tick().await;
                let swept = store.sweep_expired();
                debug!(swept, "Background sweep completed");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestData {
        name: String,
        value: i32,
    }

    fn sample() -> TestData {
        TestData {
            name: "sample".to_string(),
            value: 7,
        }
    }

    fn create_store(primary: u64, secondary: u64) -> (TieredStore, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let store = TieredStore::new(dir.path().to_path_buf(), primary, secondary)
            .expect("store should initialize");
        (store, dir)
    }

    #[test]
    fn test_set_then_get_roundtrip() {
        let (store, _dir) = create_store(1024 * 1024, 8 * 1024 * 1024);
        store.set("key", &sample(), Ttl::Default).unwrap();
        let read: Option<TestData> = store.get("key").unwrap();
        assert_eq!(read, Some(sample()));
    }

    #[test]
    fn test_missing_key_is_none() {
        let (store, _dir) = create_store(1024, 2048);
        let read: Option<TestData> = store.get("absent").unwrap();
        assert!(read.is_none());
    }

    #[test]
    fn test_negative_ttl_is_expired_on_next_read() {
        let (store, _dir) = create_store(1024 * 1024, 8 * 1024 * 1024);
        store
            .set("doomed", &sample(), Ttl::For(Duration::seconds(-5)))
            .unwrap();
        let read: Option<TestData> = store.get("doomed").unwrap();
        assert!(read.is_none());
    }

    #[test]
    fn test_never_expiring_entry_survives_sweep() {
        let (store, _dir) = create_store(1024 * 1024, 8 * 1024 * 1024);
        store.set("forever", &sample(), Ttl::Never).unwrap();
        store
            .set("doomed", &sample(), Ttl::For(Duration::seconds(-5)))
            .unwrap();
        let removed = store.sweep_expired();
        assert_eq!(removed, 1);
        let read: Option<TestData> = store.get("forever").unwrap();
        assert_eq!(read, Some(sample()));
    }

    #[test]
    fn test_corrupted_entry_is_purged_not_surfaced() {
        let (store, dir) = create_store(1024 * 1024, 8 * 1024 * 1024);
        store.set("key", &sample(), Ttl::Default).unwrap();
        let path = dir.path().join("primary").join("key.json");
        fs::write(&path, "{ this is not json").unwrap();
        let read: Option<TestData> = store.get("key").unwrap();
        assert!(read.is_none());
        assert!(!path.exists(), "corrupt entry should be purged");
    }

    #[test]
    fn test_wrong_shape_payload_is_purged() {
        let (store, _dir) = create_store(1024 * 1024, 8 * 1024 * 1024);
        store.set("key", &vec![1, 2, 3], Ttl::Default).unwrap();
        let read: Option<TestData> = store.get("key").unwrap();
        assert!(read.is_none());
        // Purged, so a retry under the original type also sees nothing.
        let read: Option<Vec<i32>> = store.get("key").unwrap();
        assert!(read.is_none());
    }

    #[test]
    fn test_overflow_spills_to_secondary_tier() {
        // Primary can hold almost nothing; payload must land in secondary.
        let (store, dir) = create_store(64, 8 * 1024 * 1024);
        let big = TestData {
            name: "x".repeat(512),
            value: 1,
        };
        store.set("big", &big, Ttl::Default).unwrap();
        assert!(dir.path().join("secondary").join("big.json").exists());
        let read: Option<TestData> = store.get("big").unwrap();
        assert_eq!(read, Some(big));
    }

    #[test]
    fn test_overflow_of_both_tiers_is_a_storage_error() {
        let (store, _dir) = create_store(32, 64);
        let big = TestData {
            name: "x".repeat(4096),
            value: 1,
        };
        let result = store.set("big", &big, Ttl::Default);
        assert!(matches!(result, Err(ConvertError::Storage(_))));
    }

    #[test]
    fn test_full_primary_sweeps_expired_before_spilling() {
        let (store, dir) = create_store(400, 8 * 1024 * 1024);
        store
            .set("old", &sample(), Ttl::For(Duration::seconds(-5)))
            .unwrap();
        // Filling write only fits in primary once "old" is swept.
        let filler = TestData {
            name: "y".repeat(200),
            value: 2,
        };
        store.set("new", &filler, Ttl::Default).unwrap();
        assert!(dir.path().join("primary").join("new.json").exists());
        assert!(!dir.path().join("primary").join("old.json").exists());
    }

    #[test]
    fn test_clear_preserves_allow_list() {
        let (store, _dir) = create_store(1024 * 1024, 8 * 1024 * 1024);
        store.set("user_preferences", &sample(), Ttl::Never).unwrap();
        store.set("exchange_rates", &sample(), Ttl::Default).unwrap();
        store.clear(false).unwrap();
        let prefs: Option<TestData> = store.get("user_preferences").unwrap();
        let rates: Option<TestData> = store.get("exchange_rates").unwrap();
        assert!(prefs.is_some());
        assert!(rates.is_none());
    }

    #[test]
    fn test_full_clear_wipes_everything() {
        let (store, _dir) = create_store(1024 * 1024, 8 * 1024 * 1024);
        store.set("user_preferences", &sample(), Ttl::Never).unwrap();
        store.clear(true).unwrap();
        let prefs: Option<TestData> = store.get("user_preferences").unwrap();
        assert!(prefs.is_none());
        assert_eq!(store.metadata().entry_count, 0);
    }

    #[test]
    fn test_metadata_tracks_mutations() {
        let (store, _dir) = create_store(1024 * 1024, 8 * 1024 * 1024);
        assert_eq!(store.metadata().entry_count, 0);
        store.set("a", &sample(), Ttl::Default).unwrap();
        store.set("b", &sample(), Ttl::Default).unwrap();
        assert_eq!(store.metadata().entry_count, 2);
        assert!(store.metadata().total_bytes > 0);
        store.remove("a").unwrap();
        assert_eq!(store.metadata().entry_count, 1);
    }

    #[test]
    fn test_keys_with_path_separators_are_safe() {
        let (store, _dir) = create_store(1024 * 1024, 8 * 1024 * 1024);
        store
            .set("timezone_America/New_York", &sample(), Ttl::Default)
            .unwrap();
        let read: Option<TestData> = store.get("timezone_America/New_York").unwrap();
        assert_eq!(read, Some(sample()));
    }
}
