use crate::env::devices_from_env;
use crate::error::Result;
use crate::settings::ExporterConfig;
use config::{Config, File, FileFormat};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "tapo-exporter.toml";

/// 环境变量与配置键的对应关系
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("POLL_INTERVAL_SECS", "poll_interval_secs"),
    ("POLL_TIMEOUT_SECS", "poll_timeout_secs"),
    ("COST_PER_KWH", "cost_per_kwh"),
    ("LOG_LEVEL", "log_level"),
    ("PROMETHEUS_HOST", "prometheus.host"),
    ("PROMETHEUS_PORT", "prometheus.port"),
    ("INFLUXDB_ENABLED", "influxdb.enabled"),
    ("INFLUXDB_URL", "influxdb.url"),
    ("INFLUXDB_TOKEN", "influxdb.token"),
    ("INFLUXDB_ORG", "influxdb.org"),
    ("INFLUXDB_BUCKET", "influxdb.bucket"),
    ("TAPO_BRIDGE_URL", "bridge.url"),
    ("TAPO_BRIDGE_TIMEOUT_SECS", "bridge.timeout_secs"),
    ("TAPO_FALLBACK_DELAY_MS", "bridge.fallback_delay_ms"),
];

/// 配置加载器
///
/// 优先级从低到高：内置默认值、TOML 文件（可选）、环境变量
pub struct ConfigLoader {
    path: PathBuf,
    env: HashMap<String, String>,
}

impl ConfigLoader {
    /// 使用进程环境变量
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            env: std::env::vars().collect(),
        }
    }

    /// 替换环境变量来源
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// 加载并验证配置
    pub fn load(&self) -> Result<ExporterConfig> {
        let mut builder = Config::builder().add_source(
            File::from(self.path.as_path())
                .format(FileFormat::Toml)
                .required(false),
        );

        for (var, key) in ENV_OVERRIDES {
            let value = self
                .env
                .get(*var)
                .filter(|v| !v.trim().is_empty())
                .map(|v| v.trim().to_string());
            builder = builder.set_override_option(*key, value)?;
        }

        let mut config: ExporterConfig = builder.build()?.try_deserialize()?;

        if let Some(devices) = devices_from_env(&self.env)? {
            debug!(count = devices.len(), "Devices loaded from environment");
            config.devices = devices;
        }

        config.validate()?;
        Ok(config)
    }
}
