use crate::transport::{DeviceTarget, TapoMethod, TapoTransport};
use crate::{DeviceError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// 基于 HTTP 桥接服务的传输实现
///
/// 桥接进程封装厂商 SDK（握手、加密、会话），本进程只交换 JSON：
/// `POST {base_url}/devices/{address}/{model}/{method}`，凭据走 HTTP Basic 认证。
pub struct HttpBridgeTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBridgeTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// 请求地址
    pub fn endpoint(&self, target: &DeviceTarget, method: TapoMethod) -> String {
        format!(
            "{}/devices/{}/{}/{}",
            self.base_url,
            target.address,
            target.model.as_str(),
            method.as_str()
        )
    }
}

#[async_trait]
impl TapoTransport for HttpBridgeTransport {
    async fn request(&self, target: &DeviceTarget, method: TapoMethod) -> Result<Value> {
        let url = self.endpoint(target, method);

        let response = self
            .client
            .post(&url)
            .basic_auth(
                &target.credentials.username,
                Some(&target.credentials.password),
            )
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeviceError::request(
                method.as_str(),
                format!("bridge returned {}: {}", status, body.trim()),
            ));
        }

        let body = response.text().await?;
        let value: Value = serde_json::from_str(&body)?;

        debug!(
            address = %target.address,
            model = %target.model,
            method = method.as_str(),
            "Bridge request completed"
        );

        Ok(value)
    }
}
