pub mod env;
pub mod error;
pub mod loader;
pub mod settings;

pub use env::devices_from_env;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, DEFAULT_CONFIG_PATH};
pub use settings::{BridgeConfig, DeviceConfig, ExporterConfig, InfluxDbConfig, PrometheusConfig};
