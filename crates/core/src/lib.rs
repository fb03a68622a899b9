pub mod config;
pub mod connector;
pub mod context;
pub mod declarative;
pub mod extract;
pub mod matching;
pub mod native;
pub mod registry;
pub mod resilience;
pub mod testing;

pub use config::{
    builtin_keys, load_config, load_config_from_str, validate_config, Config, ConfigError,
};
pub use connector::{
    Connector, ConnectorError, ConnectorKind, Descriptor, HealthStatus, MangaResult,
};
pub use context::{CallContext, CancelHandle};
pub use declarative::{DeclarativeConfig, DeclarativeConnector};
pub use native::{
    AsuraConnector, MadaraConnector, MadaraSite, MgekoConnector, NativeOptions, WebtoonsConnector,
};
pub use registry::{build_registry, build_registry_with_transport, ConnectorRegistry, RegistryError};
pub use resilience::{FetchSettings, HttpFetcher, ReqwestTransport, Transport};
