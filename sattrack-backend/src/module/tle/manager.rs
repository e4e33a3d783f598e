///! TLE catalog manager - owns the current catalog snapshot
use super::{TleCatalog, TleCatalogBuilder, TleFetcher, TleRecord, cache};
use crate::config::TleConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Outcome of a successful catalog refresh
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub records: usize,
    pub sources: usize,
    pub bytes: usize,
    pub elapsed: Duration,
}

/// Holds the catalog behind a swappable pointer.
///
/// The lock only guards the pointer: readers clone the inner `Arc` and keep
/// using their snapshot while a refresh installs a new one.
pub struct TleCatalogManager {
    snapshot: Arc<RwLock<Option<Arc<TleCatalog>>>>,
    fetcher: TleFetcher,
    cache_dir: PathBuf,
    refresh_interval_minutes: u32,
}

impl TleCatalogManager {
    /// Create a new catalog manager with no catalog installed
    pub fn new(config: &TleConfig) -> Result<Arc<Self>> {
        let fetcher = TleFetcher::new(
            config.urls.clone(),
            Duration::from_secs(config.request_timeout_seconds),
        )?;

        Ok(Arc::new(Self {
            snapshot: Arc::new(RwLock::new(None)),
            fetcher,
            cache_dir: PathBuf::from(&config.cache_dir),
            refresh_interval_minutes: config.refresh_interval_minutes,
        }))
    }

    /// Initialize manager - build a catalog from the disk cache if present
    pub async fn initialize(&self) -> Result<()> {
        tracing::info!("Initializing TLE catalog manager...");

        let Some(text) = cache::load_cached_text(&self.cache_dir)
            .await
            .context("Failed to load TLE cache")?
        else {
            tracing::info!("No TLE cache found in {:?}, waiting for first refresh", self.cache_dir);
            return Ok(());
        };

        match build_catalog(text).await? {
            (Some(catalog), _) => {
                tracing::info!("Loaded {} TLEs from cache", catalog.len());
                self.install(catalog).await;
            }
            (None, _) => tracing::warn!("TLE cache contains no valid element sets"),
        }

        Ok(())
    }

    /// Fetch all sources, build a fresh catalog and swap it in.
    ///
    /// On any failure the previous snapshot stays in place.
    pub async fn refresh(&self) -> Result<RefreshReport> {
        let started = Instant::now();
        tracing::info!("Refreshing TLE catalog from {} source(s)", self.fetcher.urls().len());

        let text = self
            .fetcher
            .fetch_all()
            .await
            .context("TLE refresh cancelled")?;
        let bytes = text.len();

        let (catalog, text) = build_catalog(text).await?;
        let Some(catalog) = catalog else {
            anyhow::bail!("Fetched TLE data contains no valid element sets, keeping previous catalog");
        };

        let records = catalog.len();
        self.install(catalog).await;

        if let Err(e) = cache::save_cached_text(&self.cache_dir, &text).await {
            tracing::warn!("Failed to update TLE cache: {:#}", e);
        }

        let report = RefreshReport {
            records,
            sources: self.fetcher.urls().len(),
            bytes,
            elapsed: started.elapsed(),
        };
        tracing::info!(
            "TLE catalog refreshed: {} records from {} source(s), {} bytes in {:?}",
            report.records,
            report.sources,
            report.bytes,
            report.elapsed
        );

        Ok(report)
    }

    /// Replace the current snapshot
    pub async fn install(&self, catalog: TleCatalog) {
        *self.snapshot.write().await = Some(Arc::new(catalog));
    }

    /// Current snapshot, `None` until the first successful build
    pub async fn snapshot(&self) -> Option<Arc<TleCatalog>> {
        self.snapshot.read().await.clone()
    }

    /// Look up a satellite in the current snapshot
    pub async fn lookup(&self, search: &str) -> Option<Arc<TleRecord>> {
        self.snapshot().await?.lookup(search)
    }

    pub fn refresh_interval_minutes(&self) -> u32 {
        self.refresh_interval_minutes
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

/// Parse off the async runtime; hands the text back for caching
async fn build_catalog(text: String) -> Result<(Option<TleCatalog>, String)> {
    tokio::task::spawn_blocking(move || {
        let catalog = TleCatalogBuilder::from_text(&text);
        (catalog, text)
    })
    .await
    .context("TLE catalog build task failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::tle::record::tests::{ISS_LINE1, ISS_LINE2};

    fn test_config(name: &str) -> TleConfig {
        let dir = std::env::temp_dir().join(format!("sattrack_{}_{}", name, std::process::id()));
        TleConfig {
            cache_dir: dir.to_string_lossy().to_string(),
            ..TleConfig::default()
        }
    }

    #[tokio::test]
    async fn test_manager_creation() {
        let manager = TleCatalogManager::new(&test_config("creation")).unwrap();

        assert!(manager.snapshot().await.is_none());
        assert!(manager.lookup("25544").await.is_none());
        assert_eq!(manager.refresh_interval_minutes(), 360);
    }

    #[tokio::test]
    async fn test_initialize_from_cache() {
        let config = test_config("init");
        let manager = TleCatalogManager::new(&config).unwrap();
        let _ = tokio::fs::remove_dir_all(manager.cache_dir()).await;

        // No cache yet
        manager.initialize().await.unwrap();
        assert!(manager.snapshot().await.is_none());

        let text = format!("ISS (ZARYA)\n{}\n{}\n", ISS_LINE1, ISS_LINE2);
        cache::save_cached_text(manager.cache_dir(), &text).await.unwrap();

        manager.initialize().await.unwrap();
        let record = manager.lookup("1998-067A").await.unwrap();
        assert_eq!(record.name(), Some("ISS (ZARYA)"));

        let _ = tokio::fs::remove_dir_all(manager.cache_dir()).await;
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_snapshot() {
        let manager = TleCatalogManager::new(&test_config("refresh")).unwrap();
        let catalog = TleCatalogBuilder::build([ISS_LINE1, ISS_LINE2]).unwrap();
        manager.install(catalog).await;

        // No sources configured, so the refresh is cancelled
        assert!(manager.refresh().await.is_err());
        assert!(manager.lookup("25544").await.is_some());
    }

    #[tokio::test]
    async fn test_readers_keep_old_snapshot() {
        let manager = TleCatalogManager::new(&test_config("swap")).unwrap();
        manager
            .install(TleCatalogBuilder::build([ISS_LINE1, ISS_LINE2]).unwrap())
            .await;

        let old = manager.snapshot().await.unwrap();
        manager.install(TleCatalog::new()).await;

        assert!(old.lookup("25544").is_some());
        assert!(manager.lookup("25544").await.is_none());
    }
}
