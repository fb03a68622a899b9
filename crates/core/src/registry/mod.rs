//! In-process directory of connectors keyed by short identifier.

mod factory;

pub use factory::{build_registry, build_registry_with_transport};

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ConfigError;
use crate::connector::{Connector, ConnectorError, Descriptor, HealthStatus};
use crate::context::CallContext;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Connector key {0:?} is already registered")]
    DuplicateKey(String),

    #[error("Invalid connector: {0}")]
    InvalidConnector(String),

    #[error("Failed to build connector {key}: {source}")]
    Build {
        key: String,
        #[source]
        source: ConnectorError,
    },
}

impl From<ConfigError> for RegistryError {
    fn from(err: ConfigError) -> Self {
        Self::InvalidConnector(err.to_string())
    }
}

/// Connectors by key. Safe to share across tasks; registration and lookup
/// may interleave.
#[derive(Default)]
pub struct ConnectorRegistry {
    connectors: RwLock<HashMap<String, Arc<dyn Connector>>>,
}

impl std::fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking reader cannot leave the map half-updated, so poisoned
    // locks are recovered rather than propagated.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn Connector>>> {
        self.connectors.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<dyn Connector>>> {
        self.connectors.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a connector. Fails if its key is empty or already taken.
    pub fn register(&self, connector: Arc<dyn Connector>) -> Result<(), RegistryError> {
        let key = connector.key().trim().to_string();
        if key.is_empty() {
            return Err(RegistryError::InvalidConnector(
                "connector key is empty".to_string(),
            ));
        }

        let mut connectors = self.write();
        if connectors.contains_key(&key) {
            return Err(RegistryError::DuplicateKey(key));
        }
        debug!(connector = %key, kind = %connector.kind(), "Registered connector");
        connectors.insert(key, connector);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn Connector>> {
        self.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// All connectors, sorted by key.
    pub fn connectors(&self) -> Vec<Arc<dyn Connector>> {
        let mut all: Vec<Arc<dyn Connector>> = self.read().values().cloned().collect();
        all.sort_by(|a, b| a.key().cmp(b.key()));
        all
    }

    /// Identity of every connector, sorted by key.
    pub fn descriptors(&self) -> Vec<Descriptor> {
        self.connectors().iter().map(|c| c.descriptor()).collect()
    }

    /// Health-check every connector concurrently.
    ///
    /// A failing connector becomes a `healthy: false` entry; it never
    /// aborts the report for the others. Sorted by key.
    pub async fn health(&self, ctx: &CallContext) -> Vec<HealthStatus> {
        let connectors = self.connectors();
        let checks = connectors.iter().map(|c| async move {
            let result = c.health_check(ctx).await;
            let descriptor = c.descriptor();
            match result {
                Ok(()) => HealthStatus {
                    key: descriptor.key,
                    name: descriptor.name,
                    kind: descriptor.kind,
                    healthy: true,
                    error: None,
                },
                Err(e) => {
                    warn!(connector = %descriptor.key, error = %e, "Connector unhealthy");
                    HealthStatus {
                        key: descriptor.key,
                        name: descriptor.name,
                        kind: descriptor.kind,
                        healthy: false,
                        error: Some(e.to_string()),
                    }
                }
            }
        });

        let mut statuses = join_all(checks).await;
        statuses.sort_by(|a, b| a.key.cmp(&b.key));
        info!(
            total = statuses.len(),
            healthy = statuses.iter().filter(|s| s.healthy).count(),
            "Health check complete"
        );
        statuses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::ConnectorKind;
    use crate::testing::MockConnector;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_register_and_get() {
        let registry = ConnectorRegistry::new();
        assert_ok!(registry.register(Arc::new(MockConnector::new("beta"))));
        assert_ok!(registry.register(Arc::new(MockConnector::new("alpha"))));

        assert_eq!(registry.len(), 2);
        assert!(registry.get("alpha").is_some());
        assert!(registry.get("gamma").is_none());
        assert_eq!(registry.keys(), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let registry = ConnectorRegistry::new();
        registry.register(Arc::new(MockConnector::new("mgeko"))).unwrap();
        let err = assert_err!(registry.register(Arc::new(MockConnector::new("mgeko"))));
        assert!(matches!(err, RegistryError::DuplicateKey(k) if k == "mgeko"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_key_rejected() {
        let registry = ConnectorRegistry::new();
        let err = registry.register(Arc::new(MockConnector::new(" "))).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidConnector(_)));
    }

    #[test]
    fn test_descriptors_sorted() {
        let registry = ConnectorRegistry::new();
        for key in ["webtoons", "asura", "mgeko"] {
            registry.register(Arc::new(MockConnector::new(key))).unwrap();
        }
        let keys: Vec<String> = registry.descriptors().into_iter().map(|d| d.key).collect();
        assert_eq!(keys, vec!["asura", "mgeko", "webtoons"]);
    }

    #[tokio::test]
    async fn test_health_isolates_failures() {
        let registry = ConnectorRegistry::new();
        let broken = MockConnector::new("broken");
        broken
            .set_health_error(ConnectorError::UpstreamStatus {
                status: 503,
                url: "https://broken.test/".into(),
            })
            .await;
        registry.register(Arc::new(broken)).unwrap();
        registry.register(Arc::new(MockConnector::new("alive"))).unwrap();

        let statuses = registry.health(&CallContext::background()).await;
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].key, "alive");
        assert!(statuses[0].healthy);
        assert!(statuses[0].error.is_none());
        assert_eq!(statuses[1].key, "broken");
        assert!(!statuses[1].healthy);
        assert!(statuses[1].error.as_deref().unwrap().contains("503"));
        assert_eq!(statuses[1].kind, ConnectorKind::Native);
    }

    #[tokio::test]
    async fn test_concurrent_registration() {
        let registry = Arc::new(ConnectorRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    registry
                        .register(Arc::new(MockConnector::new(&format!("c{}", i))))
                        .unwrap();
                    registry.keys().len()
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(registry.len(), 8);
    }
}
