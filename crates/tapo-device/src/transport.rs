use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use tapo_types::{Credentials, DeviceModel};

/// 厂商接口方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TapoMethod {
    GetDeviceInfo,
    GetCurrentPower,
    GetDeviceUsage,
}

impl TapoMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetDeviceInfo => "get_device_info",
            Self::GetCurrentPower => "get_current_power",
            Self::GetDeviceUsage => "get_device_usage",
        }
    }
}

/// 一次请求的目标设备
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTarget {
    pub address: String,
    pub model: DeviceModel,
    pub credentials: Credentials,
}

/// 厂商 SDK 传输层
///
/// 握手与认证由实现方负责，这里只看到 JSON 结果
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TapoTransport: Send + Sync {
    async fn request(&self, target: &DeviceTarget, method: TapoMethod) -> Result<Value>;
}
