//! The preferences store: load, per-field update, change notification,
//! import/export.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::CacheManager;
use crate::error::{ConvertError, Result};

use super::{FontSize, Theme, UserPreferences, MAX_DECIMAL_PLACES};

/// Version marker written into exports.
const EXPORT_VERSION: &str = "1";

type Listener = Box<dyn Fn(&UserPreferences) + Send + Sync>;
type ListenerList = Arc<Mutex<Vec<(u64, Listener)>>>;

/// Dropping the subscription unsubscribes the listener.
pub struct Subscription {
    id: u64,
    listeners: ListenerList,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PreferencesExport {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub preferences: UserPreferences,
}

pub struct PreferencesStore {
    cache: Arc<CacheManager>,
    current: RwLock<UserPreferences>,
    loaded: AtomicBool,
    listeners: ListenerList,
    next_listener_id: AtomicU64,
}

impl PreferencesStore {
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self {
            cache,
            current: RwLock::new(UserPreferences::default()),
            loaded: AtomicBool::new(false),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener_id: AtomicU64::new(1),
        }
    }

    /// Load persisted preferences. Until this completes, `preferences()`
    /// serves defaults.
    pub async fn load(&self) -> Result<()> {
        let prefs = self.cache.cached_preferences();
        if let Ok(mut current) = self.current.write() {
            *current = prefs;
        }
        self.loaded.store(true, Ordering::Release);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Synchronous snapshot, available before `load()` finishes.
    pub fn preferences(&self) -> UserPreferences {
        self.current
            .read()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// Apply a partial update. Each field is validated individually and
    /// invalid fields are dropped, never the whole write.
    pub fn update(&self, partial: Value) -> Result<UserPreferences> {
        let Value::Object(fields) = partial else {
            return Err(ConvertError::Validation(
                "preferences update must be an object".to_string(),
            ));
        };
        let mut next = self.preferences();
        for (key, value) in fields {
            if !apply_field(&mut next, &key, &value) {
                debug!(field = %key, "Dropping invalid preference field from update");
            }
        }
        self.persist(next)
    }

    /// Restore and persist defaults.
    pub fn reset(&self) -> Result<UserPreferences> {
        self.persist(UserPreferences::default())
    }

    fn persist(&self, next: UserPreferences) -> Result<UserPreferences> {
        self.cache.cache_preferences(&next)?;
        if let Ok(mut current) = self.current.write() {
            *current = next.clone();
        }
        self.notify(&next);
        Ok(next)
    }

    /// Register a change listener. Every successful write delivers the new
    /// full preferences object. A panicking listener is caught and logged
    /// without affecting the write or the other listeners.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&UserPreferences) + Send + Sync + 'static,
    {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push((id, Box::new(listener)));
        }
        Subscription {
            id,
            listeners: Arc::clone(&self.listeners),
        }
    }

    fn notify(&self, prefs: &UserPreferences) {
        let Ok(listeners) = self.listeners.lock() else {
            return;
        };
        for (id, listener) in listeners.iter() {
            if catch_unwind(AssertUnwindSafe(|| listener(prefs))).is_err() {
                warn!(listener = id, "Preference listener panicked, continuing");
            }
        }
    }

    /// Wrap the current preferences with a version marker and timestamp.
    pub fn export(&self) -> PreferencesExport {
        PreferencesExport {
            version: EXPORT_VERSION.to_string(),
            exported_at: Utc::now(),
            preferences: self.preferences(),
        }
    }

    /// Import a previously exported payload. A malformed payload is a
    /// structured error and leaves current preferences untouched; invalid
    /// individual fields fall back per-field, not by rejecting the import.
    pub fn import(&self, payload: Value) -> Result<UserPreferences> {
        let Value::Object(ref top) = payload else {
            return Err(ConvertError::Validation(
                "import payload must be an object".to_string(),
            ));
        };
        if !top.get("version").is_some_and(Value::is_string) {
            return Err(ConvertError::Validation(
                "import payload missing version marker".to_string(),
            ));
        }
        let Some(Value::Object(fields)) = top.get("preferences") else {
            return Err(ConvertError::Validation(
                "import payload missing preferences object".to_string(),
            ));
        };
        let mut next = self.preferences();
        for (key, value) in fields {
            if !apply_field(&mut next, key, value) {
                debug!(field = %key, "Dropping invalid preference field from import");
            }
        }
        self.persist(next)
    }
}

/// Apply one field of a partial update. Returns false when the field is
/// unknown or its value fails validation.
fn apply_field(prefs: &mut UserPreferences, key: &str, value: &Value) -> bool {
    match key {
        "default_currency" => match value.as_str() {
            Some(code) => match crate::currency::find_currency(code) {
                Some(currency) => {
                    prefs.default_currency = currency.code.to_string();
                    true
                }
                None => false,
            },
            None => false,
        },
        "default_zone" => match value.as_str() {
            Some(zone) if crate::timezone::validate_zone(zone) => {
                prefs.default_zone = zone.to_string();
                true
            }
            _ => false,
        },
        "preferred_units" => match value.as_object() {
            Some(map) => {
                let mut accepted_any = false;
                for (category, unit_value) in map {
                    let Some(unit_id) = unit_value.as_str() else {
                        continue;
                    };
                    let valid = crate::units::find_unit(unit_id)
                        .is_some_and(|u| u.category == category);
                    if valid {
                        prefs
                            .preferred_units
                            .insert(category.clone(), unit_id.to_string());
                        accepted_any = true;
                    }
                }
                accepted_any || map.is_empty()
            }
            None => false,
        },
        "decimal_places" => match value.as_f64() {
            Some(n) if n.is_finite() && n >= 0.0 && n.floor() <= MAX_DECIMAL_PLACES as f64 => {
                prefs.decimal_places = n.floor() as u8;
                true
            }
            _ => false,
        },
        "theme" => match serde_json::from_value::<Theme>(value.clone()) {
            Ok(theme) => {
                prefs.theme = theme;
                true
            }
            Err(_) => false,
        },
        "font_size" => match serde_json::from_value::<FontSize>(value.clone()) {
            Ok(size) => {
                prefs.font_size = size;
                true
            }
            Err(_) => false,
        },
        "high_contrast" => match value.as_bool() {
            Some(flag) => {
                prefs.high_contrast = flag;
                true
            }
            None => false,
        },
        "reduce_motion" => match value.as_bool() {
            Some(flag) => {
                prefs.reduce_motion = flag;
                true
            }
            None => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TieredStore;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    fn create_store() -> (PreferencesStore, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let tiered = Arc::new(
            TieredStore::new(dir.path().to_path_buf(), 1024 * 1024, 8 * 1024 * 1024)
                .expect("store"),
        );
        let cache = Arc::new(CacheManager::new(tiered));
        (PreferencesStore::new(cache), dir)
    }

    #[test]
    fn test_defaults_before_load() {
        let (store, _dir) = create_store();
        assert!(!store.is_loaded());
        assert_eq!(store.preferences(), UserPreferences::default());
    }

    #[test]
    fn test_update_applies_valid_fields() {
        let (store, _dir) = create_store();
        let updated = store
            .update(json!({"default_currency": "eur", "decimal_places": 4}))
            .unwrap();
        assert_eq!(updated.default_currency, "EUR");
        assert_eq!(updated.decimal_places, 4);
    }

    #[test]
    fn test_invalid_fields_are_dropped_not_fatal() {
        let (store, _dir) = create_store();
        store.update(json!({"decimal_places": 5})).unwrap();
        let updated = store
            .update(json!({"decimal_places": -1, "theme": "dark"}))
            .unwrap();
        // The invalid decimal count is dropped; the theme still applies.
        assert_eq!(updated.decimal_places, 5);
        assert_eq!(updated.theme, Theme::Dark);
    }

    #[test]
    fn test_decimal_places_are_floored() {
        let (store, _dir) = create_store();
        let updated = store.update(json!({"decimal_places": 3.9})).unwrap();
        assert_eq!(updated.decimal_places, 3);
    }

    #[test]
    fn test_unknown_zone_is_dropped() {
        let (store, _dir) = create_store();
        let updated = store
            .update(json!({"default_zone": "Mars/Olympus_Mons"}))
            .unwrap();
        assert_eq!(updated.default_zone, "UTC");
        let updated = store
            .update(json!({"default_zone": "Europe/Paris"}))
            .unwrap();
        assert_eq!(updated.default_zone, "Europe/Paris");
    }

    #[test]
    fn test_subscribers_see_every_write() {
        let (store, _dir) = create_store();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        let _sub = store.subscribe(move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });
        store.update(json!({"theme": "light"})).unwrap();
        store.reset().unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_dropped_subscription_stops_notifications() {
        let (store, _dir) = create_store();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        let sub = store.subscribe(move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });
        store.update(json!({"theme": "light"})).unwrap();
        drop(sub);
        store.update(json!({"theme": "dark"})).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_subscriber_does_not_break_others() {
        let (store, _dir) = create_store();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        let _panicky = store.subscribe(|_| panic!("listener bug"));
        let _healthy = store.subscribe(move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });
        let result = store.update(json!({"theme": "dark"}));
        assert!(result.is_ok(), "write must survive a panicking listener");
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_export_import_roundtrip() {
        let (store, _dir) = create_store();
        store
            .update(json!({"default_currency": "GBP", "decimal_places": 6}))
            .unwrap();
        let export = store.export();
        assert_eq!(export.version, EXPORT_VERSION);

        let (fresh, _dir2) = create_store();
        let payload = serde_json::to_value(&export).unwrap();
        let imported = fresh.import(payload).unwrap();
        assert_eq!(imported.default_currency, "GBP");
        assert_eq!(imported.decimal_places, 6);
    }

    #[test]
    fn test_malformed_import_is_rejected_and_untouched() {
        let (store, _dir) = create_store();
        store.update(json!({"decimal_places": 7})).unwrap();
        let result = store.import(json!({"not": "an export"}));
        assert!(matches!(result, Err(ConvertError::Validation(_))));
        assert_eq!(store.preferences().decimal_places, 7);
    }

    #[test]
    fn test_import_drops_invalid_fields_per_field() {
        let (store, _dir) = create_store();
        let payload = json!({
            "version": "1",
            "exported_at": Utc::now(),
            "preferences": {
                "default_currency": "NOPE",
                "theme": "dark"
            }
        });
        let imported = store.import(payload).unwrap();
        assert_eq!(imported.default_currency, "USD");
        assert_eq!(imported.theme, Theme::Dark);
    }

    #[tokio::test]
    async fn test_load_restores_persisted_preferences() {
        let dir = TempDir::new().unwrap();
        let tiered = Arc::new(
            TieredStore::new(dir.path().to_path_buf(), 1024 * 1024, 8 * 1024 * 1024).unwrap(),
        );
        let cache = Arc::new(CacheManager::new(Arc::clone(&tiered)));
        let store = PreferencesStore::new(Arc::clone(&cache));
        store.update(json!({"default_currency": "CHF"})).unwrap();

        let rehydrated = PreferencesStore::new(cache);
        rehydrated.load().await.unwrap();
        assert!(rehydrated.is_loaded());
        assert_eq!(rehydrated.preferences().default_currency, "CHF");
    }
}
