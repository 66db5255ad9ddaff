use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 设备型号
///
/// P110 与 P115 共用同一套接口，连接时互为备选
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceModel {
    P110,
    P115,
}

/// 无法识别的设备型号
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown device model: {0}")]
pub struct UnknownModel(pub String);

impl FromStr for DeviceModel {
    type Err = UnknownModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "p110" => Ok(Self::P110),
            "p115" => Ok(Self::P115),
            _ => Err(UnknownModel(s.to_string())),
        }
    }
}

impl DeviceModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P110 => "p110",
            Self::P115 => "p115",
        }
    }

    /// 备选型号
    pub fn alternative(&self) -> Self {
        match self {
            Self::P110 => Self::P115,
            Self::P115 => Self::P110,
        }
    }
}

impl Default for DeviceModel {
    fn default() -> Self {
        Self::P110
    }
}

impl fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 设备登录凭据（厂商云账号）
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// 日志中不输出密码
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"****")
            .finish()
    }
}

/// 设备身份，配置加载时创建，进程生命周期内不变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// 设备名称（指标标签）
    pub name: String,

    /// 设备地址（IP 或主机名）
    pub address: String,

    pub credentials: Credentials,
}

impl DeviceIdentity {
    pub fn new(name: impl Into<String>, address: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            credentials,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_model_from_str() {
        assert_eq!("p110".parse::<DeviceModel>(), Ok(DeviceModel::P110));
        assert_eq!(" P115 ".parse::<DeviceModel>(), Ok(DeviceModel::P115));
        assert_eq!(
            "kp115".parse::<DeviceModel>(),
            Err(UnknownModel("kp115".to_string()))
        );
    }

    #[test]
    fn test_device_model_alternative() {
        assert_eq!(DeviceModel::P110.alternative(), DeviceModel::P115);
        assert_eq!(DeviceModel::P115.alternative(), DeviceModel::P110);
    }

    #[test]
    fn test_credentials_debug_masks_password() {
        let credentials = Credentials::new("user@example.com", "hunter2");
        let output = format!("{:?}", credentials);
        assert!(output.contains("user@example.com"));
        assert!(!output.contains("hunter2"));
    }
}
