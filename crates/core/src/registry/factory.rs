//! Builds a registry from configuration.

use std::sync::Arc;

use tracing::info;

use super::{ConnectorRegistry, RegistryError};
use crate::config::{validate_config, Config};
use crate::connector::{Connector, ConnectorError};
use crate::declarative::DeclarativeConnector;
use crate::native::{
    AsuraConnector, MadaraConnector, MadaraSite, MgekoConnector, WebtoonsConnector,
};
use crate::resilience::{ReqwestTransport, Transport};

/// Build the registry over the real network.
pub fn build_registry(config: &Config) -> Result<ConnectorRegistry, RegistryError> {
    let transport = ReqwestTransport::new(config.request_timeout()).map_err(|source| {
        RegistryError::Build {
            key: "http".to_string(),
            source,
        }
    })?;
    build_registry_with_transport(config, Arc::new(transport))
}

/// Build the registry with every connector sharing `transport`.
///
/// Built-ins listed in `connectors.disabled` and declarative entries with
/// `enabled = false` are skipped.
pub fn build_registry_with_transport(
    config: &Config,
    transport: Arc<dyn Transport>,
) -> Result<ConnectorRegistry, RegistryError> {
    validate_config(config)?;

    let registry = ConnectorRegistry::new();
    let options = config.native_options(transport.clone());

    let mut sites = vec![MadaraSite::manhuaus()];
    sites.extend(config.connectors.madara.iter().cloned());

    if enabled(config, MgekoConnector::KEY) {
        registry.register(built(MgekoConnector::KEY, MgekoConnector::new(&options))?)?;
    }
    if enabled(config, AsuraConnector::KEY) {
        registry.register(built(AsuraConnector::KEY, AsuraConnector::new(&options))?)?;
    }
    if enabled(config, WebtoonsConnector::KEY) {
        registry.register(built(WebtoonsConnector::KEY, WebtoonsConnector::new(&options))?)?;
    }

    for site in sites {
        if !enabled(config, &site.key) {
            continue;
        }
        let key = site.key.clone();
        registry.register(built(&key, MadaraConnector::new(site, &options))?)?;
    }

    for declarative in &config.declarative {
        if !declarative.enabled || config.connectors.is_disabled(&declarative.key) {
            info!(connector = %declarative.key, "Declarative connector disabled");
            continue;
        }
        let connector = DeclarativeConnector::new(
            declarative.clone(),
            transport.clone(),
            config.fetch_settings(),
        )?;
        registry.register(Arc::new(connector))?;
    }

    info!(connectors = ?registry.keys(), "Connector registry ready");
    Ok(registry)
}

fn enabled(config: &Config, key: &str) -> bool {
    let disabled = config.connectors.is_disabled(key);
    if disabled {
        info!(connector = key, "Connector disabled by configuration");
    }
    !disabled
}

fn built<C: Connector + 'static>(
    key: &str,
    result: Result<C, ConnectorError>,
) -> Result<Arc<dyn Connector>, RegistryError> {
    match result {
        Ok(connector) => Ok(Arc::new(connector)),
        Err(source) => Err(RegistryError::Build {
            key: key.to_string(),
            source,
        }),
    }
}
