//! Top-level composition.
//!
//! No module-level singletons: the context owns one store, one cache
//! manager, and one of each service, wired together with injected
//! dependencies so tests can swap any layer.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::cache::CacheManager;
use crate::config::Config;
use crate::currency::{CurrencyService, HttpRateProvider};
use crate::error::Result;
use crate::prefs::PreferencesStore;
use crate::retry::RetryPolicy;
use crate::store::TieredStore;
use crate::timezone::{HttpTimeProvider, TimeZoneService};
use crate::units::UnitEngine;

pub struct AppContext {
    pub store: Arc<TieredStore>,
    pub cache: Arc<CacheManager>,
    pub prefs: Arc<PreferencesStore>,
    pub units: UnitEngine,
    pub currency: CurrencyService<HttpRateProvider>,
    pub timezone: TimeZoneService<HttpTimeProvider>,
    sweeper: JoinHandle<()>,
}

impl AppContext {
    /// Build the full service graph and start the background sweep.
    /// Preferences are loaded before this returns; until then callers of
    /// the preferences store would see defaults.
    pub async fn new(config: &Config) -> Result<Self> {
        let store = Arc::new(TieredStore::new(
            config.cache_dir()?,
            config.primary_capacity_bytes,
            config.secondary_capacity_bytes,
        )?);
        let cache = Arc::new(CacheManager::new(Arc::clone(&store)));
        let prefs = Arc::new(PreferencesStore::new(Arc::clone(&cache)));
        prefs.load().await?;

        let policy = RetryPolicy::default();
        let currency = CurrencyService::new(
            HttpRateProvider::new(&config.rate_provider_url, config.request_timeout())?,
            Arc::clone(&cache),
            policy,
        );
        let timezone = TimeZoneService::new(
            HttpTimeProvider::new(&config.time_provider_url, config.request_timeout())?,
            Arc::clone(&cache),
            policy,
        );

        let sweeper = TieredStore::spawn_sweeper(Arc::clone(&store));

        Ok(Self {
            store,
            cache,
            prefs,
            units: UnitEngine::new(),
            currency,
            timezone,
            sweeper,
        })
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_context_builds_and_serves_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            cache_dir: Some(dir.path().to_path_buf()),
            ..Config::default()
        };
        let ctx = AppContext::new(&config).await.unwrap();
        assert!(ctx.prefs.is_loaded());
        assert_eq!(ctx.prefs.preferences().default_currency, "USD");
        assert_eq!(ctx.units.convert(1000.0, "meter", "kilometer").unwrap().value, 1.0);
        assert!(ctx.timezone.validate_zone("Europe/Paris"));
    }
}
