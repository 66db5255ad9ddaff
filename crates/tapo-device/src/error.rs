use thiserror::Error;

/// 设备访问错误类型
#[derive(Error, Debug)]
pub enum DeviceError {
    /// 连接失败（主型号与备选型号均失败）
    #[error("Failed to connect to device {device}: {reason}")]
    Connection { device: String, reason: String },

    /// 尚未连接
    #[error("Device not connected: {0}")]
    NotConnected(String),

    /// 设备返回错误码或桥接服务拒绝请求
    #[error("Request {method} failed: {reason}")]
    Request { method: String, reason: String },

    /// HTTP 传输错误
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// 响应格式无效
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// 超时
    #[error("Timed out: {0}")]
    Timeout(String),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 设备访问结果类型
pub type Result<T> = std::result::Result<T, DeviceError>;

impl DeviceError {
    pub fn request(method: impl Into<String>, reason: impl Into<String>) -> Self {
        DeviceError::Request {
            method: method.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        DeviceError::InvalidResponse(msg.into())
    }
}
