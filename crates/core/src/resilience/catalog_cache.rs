//! Time-bounded cache for expensive catalog listings.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::connector::ConnectorError;

/// One item discovered in a site catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Item identifier derived from the URL.
    pub id: String,
    /// Canonical item URL as listed.
    pub url: String,
}

struct Snapshot {
    entries: Arc<Vec<CatalogEntry>>,
    built_at: Instant,
}

/// Single-slot cache with a time-to-live.
///
/// Readers share the current snapshot; a stale or missing snapshot is
/// rebuilt by exactly one caller while the others wait for it.
pub struct CatalogCache {
    ttl: Duration,
    state: RwLock<Option<Snapshot>>,
}

impl CatalogCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: RwLock::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached entries, rebuilding with `build` when stale.
    ///
    /// A failed rebuild leaves the previous snapshot in place.
    pub async fn get_or_build<F, Fut>(&self, build: F) -> Result<Arc<Vec<CatalogEntry>>, ConnectorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<CatalogEntry>, ConnectorError>>,
    {
        {
            let state = self.state.read().await;
            if let Some(entries) = self.fresh(&state) {
                debug!(entries = entries.len(), "Catalog cache hit");
                return Ok(entries);
            }
        }

        let mut state = self.state.write().await;
        if let Some(entries) = self.fresh(&state) {
            return Ok(entries);
        }

        let entries = Arc::new(build().await?);
        info!(entries = entries.len(), "Catalog rebuilt");
        *state = Some(Snapshot {
            entries: entries.clone(),
            built_at: Instant::now(),
        });
        Ok(entries)
    }

    /// Drop the snapshot so the next call rebuilds.
    pub async fn invalidate(&self) {
        *self.state.write().await = None;
    }

    /// Age of the current snapshot, if any.
    pub async fn age(&self) -> Option<Duration> {
        self.state.read().await.as_ref().map(|s| s.built_at.elapsed())
    }

    fn fresh(&self, state: &Option<Snapshot>) -> Option<Arc<Vec<CatalogEntry>>> {
        state
            .as_ref()
            .filter(|s| s.built_at.elapsed() < self.ttl)
            .map(|s| s.entries.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn entry(id: &str) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            url: format!("https://site.test/manga/{}/", id),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reuses_within_ttl() {
        let cache = CatalogCache::new(Duration::from_secs(1800));
        let counter = AtomicU32::new(0);
        let builds = &counter;
        let build = move || async move {
            builds.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ConnectorError>(vec![entry("a"), entry("b")])
        };

        let first = cache.get_or_build(build).await.unwrap();
        tokio::time::advance(Duration::from_secs(60)).await;
        let second = cache.get_or_build(build).await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(first.len(), 2);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rebuilds_after_ttl() {
        let cache = CatalogCache::new(Duration::from_secs(1800));
        let counter = AtomicU32::new(0);
        let builds = &counter;
        let build = move || async move {
            builds.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ConnectorError>(vec![entry("a")])
        };

        cache.get_or_build(build).await.unwrap();
        tokio::time::advance(Duration::from_secs(1801)).await;
        cache.get_or_build(build).await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_rebuild_is_not_cached() {
        let cache = CatalogCache::new(Duration::from_secs(60));
        let err = cache
            .get_or_build(|| async { Err::<Vec<CatalogEntry>, _>(ConnectorError::Transport("boom".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::Transport(_)));
        assert!(cache.age().await.is_none());

        let entries = cache
            .get_or_build(|| async { Ok::<_, ConnectorError>(vec![entry("x")]) })
            .await
            .unwrap();
        assert_eq!(entries[0].id, "x");
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_forces_rebuild() {
        let cache = CatalogCache::new(Duration::from_secs(60));
        cache.get_or_build(|| async { Ok::<_, ConnectorError>(vec![entry("a")]) }).await.unwrap();
        cache.invalidate().await;
        let entries = cache
            .get_or_build(|| async { Ok::<_, ConnectorError>(vec![entry("b")]) })
            .await
            .unwrap();
        assert_eq!(entries[0].id, "b");
    }
}
