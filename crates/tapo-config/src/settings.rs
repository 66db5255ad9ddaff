use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tapo_types::{Credentials, DeviceIdentity, DeviceModel};

/// 导出器配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// 轮询周期（秒）
    pub poll_interval_secs: u64,

    /// 单个设备一次轮询的超时（秒）
    pub poll_timeout_secs: u64,

    /// 电价（每千瓦时）
    pub cost_per_kwh: f64,

    pub log_level: String,
    pub prometheus: PrometheusConfig,
    pub influxdb: InfluxDbConfig,
    pub bridge: BridgeConfig,
    pub devices: Vec<DeviceConfig>,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 2,
            poll_timeout_secs: 10,
            cost_per_kwh: 0.12,
            log_level: "info".to_string(),
            prometheus: PrometheusConfig::default(),
            influxdb: InfluxDbConfig::default(),
            bridge: BridgeConfig::default(),
            devices: Vec::new(),
        }
    }
}

/// Prometheus 抓取端点
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PrometheusConfig {
    pub host: String,
    pub port: u16,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// InfluxDB 写入
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct InfluxDbConfig {
    pub enabled: bool,
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
}

impl Default for InfluxDbConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "http://influxdb:8086".to_string(),
            token: String::new(),
            org: "tapo".to_string(),
            bucket: "tapo".to_string(),
        }
    }
}

/// 厂商协议桥接服务
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub url: String,
    pub timeout_secs: u64,

    /// 主型号连接失败后，尝试备选型号前的等待（毫秒）
    pub fallback_delay_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:4000".to_string(),
            timeout_secs: 5,
            fallback_delay_ms: 2000,
        }
    }
}

/// 单个设备配置
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeviceConfig {
    pub name: String,
    pub ip: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub device_type: DeviceModel,
}

impl DeviceConfig {
    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(
            self.name.clone(),
            self.ip.clone(),
            Credentials::new(self.email.clone(), self.password.clone()),
        )
    }
}

impl fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("name", &self.name)
            .field("ip", &self.ip)
            .field("email", &self.email)
            .field("password", &"****")
            .field("device_type", &self.device_type)
            .finish()
    }
}

impl ExporterConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn bridge_timeout(&self) -> Duration {
        Duration::from_secs(self.bridge.timeout_secs)
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.bridge.fallback_delay_ms)
    }

    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::invalid("poll_interval_secs must be greater than 0"));
        }

        if self.poll_timeout_secs == 0 {
            return Err(ConfigError::invalid("poll_timeout_secs must be greater than 0"));
        }

        if !self.cost_per_kwh.is_finite() || self.cost_per_kwh < 0.0 {
            return Err(ConfigError::invalid(format!(
                "cost_per_kwh must be a non-negative number, got {}",
                self.cost_per_kwh
            )));
        }

        if self.bridge.url.trim().is_empty() {
            return Err(ConfigError::invalid("bridge.url must not be empty"));
        }

        if self.influxdb.enabled {
            for (key, value) in [
                ("influxdb.url", &self.influxdb.url),
                ("influxdb.org", &self.influxdb.org),
                ("influxdb.bucket", &self.influxdb.bucket),
            ] {
                if value.trim().is_empty() {
                    return Err(ConfigError::invalid(format!("{} must not be empty", key)));
                }
            }
        }

        if self.devices.is_empty() {
            return Err(ConfigError::MissingDevices);
        }

        let mut names = HashSet::new();
        for device in &self.devices {
            for (key, value) in [
                ("name", &device.name),
                ("ip", &device.ip),
                ("email", &device.email),
                ("password", &device.password),
            ] {
                if value.trim().is_empty() {
                    return Err(ConfigError::invalid(format!(
                        "device '{}' has an empty {}",
                        device.name, key
                    )));
                }
            }

            if !names.insert(device.name.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "duplicate device name '{}'",
                    device.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: &str) -> DeviceConfig {
        DeviceConfig {
            name: name.to_string(),
            ip: "192.168.1.10".to_string(),
            email: "user@example.com".to_string(),
            password: "secret".to_string(),
            device_type: DeviceModel::P110,
        }
    }

    fn valid() -> ExporterConfig {
        ExporterConfig {
            devices: vec![device("office")],
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = ExporterConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.cost_per_kwh, 0.12);
        assert_eq!(config.prometheus.port, 8000);
        assert_eq!(config.influxdb.url, "http://influxdb:8086");
        assert_eq!(config.influxdb.bucket, "tapo");
        assert_eq!(config.fallback_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate().is_ok());

        let mut config = valid();
        config.poll_interval_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = valid();
        config.cost_per_kwh = -0.5;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.cost_per_kwh = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_devices() {
        let config = ExporterConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::MissingDevices)));

        let mut config = valid();
        config.devices.push(device("office"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate device name"));

        let mut config = valid();
        config.devices[0].password.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_influx_checked_only_when_enabled() {
        let mut config = valid();
        config.influxdb.bucket.clear();
        assert!(config.validate().is_err());

        config.influxdb.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_device_debug_masks_password() {
        let debug = format!("{:?}", device("office"));
        assert!(debug.contains("****"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_device_identity() {
        let identity = device("office").identity();
        assert_eq!(identity.name, "office");
        assert_eq!(identity.address, "192.168.1.10");
        assert_eq!(identity.credentials.username, "user@example.com");
    }
}
