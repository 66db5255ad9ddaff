//! P110/P115 设备门面
//!
//! 两种型号接口相同，但设备只响应自己的型号；连接时先试主型号，
//! 失败后等待一段时间再试备选型号。

use crate::adapter::{parse_info, parse_power, parse_usage, unwrap_envelope};
use crate::client::TapoClient;
use crate::transport::{DeviceTarget, TapoMethod, TapoTransport};
use crate::{DeviceError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tapo_types::{DeviceIdentity, DeviceModel, RawInfo, RawPower, RawUsage};
use tracing::{debug, info, warn};

/// 连接状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectPhase {
    TryingPrimaryType(DeviceModel),
    TryingFallbackType(DeviceModel),
    Connected(DeviceModel),
    Failed,
}

impl ConnectPhase {
    /// 根据当前尝试结果推进状态
    pub fn advance(self, succeeded: bool) -> Self {
        match (self, succeeded) {
            (Self::TryingPrimaryType(model), true) | (Self::TryingFallbackType(model), true) => {
                Self::Connected(model)
            }
            (Self::TryingPrimaryType(model), false) => Self::TryingFallbackType(model.alternative()),
            (Self::TryingFallbackType(_), false) => Self::Failed,
            (terminal, _) => terminal,
        }
    }

    /// 当前要尝试的型号
    pub fn model(&self) -> Option<DeviceModel> {
        match self {
            Self::TryingPrimaryType(model) | Self::TryingFallbackType(model) => Some(*model),
            _ => None,
        }
    }
}

/// P110/P115 智能插座
pub struct P110Device {
    identity: DeviceIdentity,
    transport: Arc<dyn TapoTransport>,

    /// 首选型号；连接成功后记住实际可用的型号
    preferred_model: DeviceModel,

    /// 当前会话使用的型号
    session: Option<DeviceModel>,

    /// 切换到备选型号前的等待时间
    fallback_delay: Duration,
}

impl P110Device {
    pub fn new(
        identity: DeviceIdentity,
        preferred_model: DeviceModel,
        transport: Arc<dyn TapoTransport>,
    ) -> Self {
        info!(
            device = %identity.name,
            address = %identity.address,
            model = %preferred_model,
            "Initialized P110 device"
        );

        Self {
            identity,
            transport,
            preferred_model,
            session: None,
            fallback_delay: Duration::from_secs(2),
        }
    }

    pub fn with_fallback_delay(mut self, delay: Duration) -> Self {
        self.fallback_delay = delay;
        self
    }

    /// 当前会话型号
    pub fn session_model(&self) -> Option<DeviceModel> {
        self.session
    }

    fn target(&self, model: DeviceModel) -> DeviceTarget {
        DeviceTarget {
            address: self.identity.address.clone(),
            model,
            credentials: self.identity.credentials.clone(),
        }
    }

    async fn call(&self, model: DeviceModel, method: TapoMethod) -> Result<Value> {
        let value = self.transport.request(&self.target(model), method).await?;
        unwrap_envelope(method, value)
    }

    async fn call_connected(&self, method: TapoMethod) -> Result<Value> {
        let model = self
            .session
            .ok_or_else(|| DeviceError::NotConnected(self.identity.name.clone()))?;
        self.call(model, method).await
    }

    /// 用设备信息请求验证会话
    async fn try_model(&self, model: DeviceModel) -> Result<RawInfo> {
        let value = self.call(model, TapoMethod::GetDeviceInfo).await?;
        parse_info(&value).ok_or_else(|| DeviceError::invalid_response("empty device info"))
    }
}

#[async_trait]
impl TapoClient for P110Device {
    fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    async fn connect(&mut self) -> Result<()> {
        info!(
            device = %self.identity.name,
            address = %self.identity.address,
            "Attempting to connect to device"
        );

        self.session = None;
        let mut phase = ConnectPhase::TryingPrimaryType(self.preferred_model);
        let mut last_error = String::new();

        while let Some(model) = phase.model() {
            if matches!(phase, ConnectPhase::TryingFallbackType(_)) {
                info!(
                    device = %self.identity.name,
                    model = %model,
                    "Trying alternative device type"
                );
            }

            match self.try_model(model).await {
                Ok(device_info) => {
                    info!(
                        device = %self.identity.name,
                        model = device_info.model.as_deref().unwrap_or("unknown"),
                        firmware = device_info.fw_ver.as_deref().unwrap_or("unknown"),
                        "Successfully connected to device"
                    );
                    phase = phase.advance(true);
                }
                Err(e) => {
                    warn!(
                        device = %self.identity.name,
                        model = %model,
                        error = %e,
                        "Failed to connect using device type"
                    );
                    last_error = e.to_string();
                    phase = phase.advance(false);
                    if phase.model().is_some() && !self.fallback_delay.is_zero() {
                        tokio::time::sleep(self.fallback_delay).await;
                    }
                }
            }
        }

        match phase {
            ConnectPhase::Connected(model) => {
                self.session = Some(model);
                self.preferred_model = model;
                Ok(())
            }
            _ => Err(DeviceError::Connection {
                device: self.identity.name.clone(),
                reason: last_error,
            }),
        }
    }

    fn disconnect(&mut self) {
        if self.session.take().is_some() {
            debug!(device = %self.identity.name, "Session dropped");
        }
    }

    async fn get_device_info(&self) -> Result<Option<RawInfo>> {
        let value = self.call_connected(TapoMethod::GetDeviceInfo).await?;
        Ok(parse_info(&value))
    }

    async fn get_current_power(&self) -> Result<Option<RawPower>> {
        let value = self.call_connected(TapoMethod::GetCurrentPower).await?;
        Ok(parse_power(&value))
    }

    async fn get_device_usage(&self) -> Result<Option<RawUsage>> {
        let value = self.call_connected(TapoMethod::GetDeviceUsage).await?;
        Ok(parse_usage(&value))
    }
}
