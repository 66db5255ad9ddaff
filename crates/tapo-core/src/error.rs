use std::fmt;
use tapo_device::DeviceError;
use thiserror::Error;

/// 失败类别，用作日志字段与失败计数的标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TransportFailed,
    MissingInfo,
    MissingPower,
    MissingUsage,
    StaleTick,
    SinkWriteFailed,
    InvalidConfiguration,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransportFailed => "transport_failed",
            Self::MissingInfo => "missing_info",
            Self::MissingPower => "missing_power",
            Self::MissingUsage => "missing_usage",
            Self::StaleTick => "stale_tick",
            Self::SinkWriteFailed => "sink_write_failed",
            Self::InvalidConfiguration => "invalid_configuration",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个设备单次对账的错误
///
/// 任何变体都不会修改账本
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Device {device} returned no device info")]
    MissingInfo { device: String },

    #[error("Device {device} returned no power reading")]
    MissingPower { device: String },

    #[error("Transport failed for device {device}: {source}")]
    Transport {
        device: String,
        #[source]
        source: DeviceError,
    },

    #[error("Tick for device {device} is not newer than the last ledger update")]
    StaleTick { device: String },
}

impl ReconcileError {
    pub fn transport(device: impl Into<String>, source: DeviceError) -> Self {
        Self::Transport {
            device: device.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingInfo { .. } => ErrorKind::MissingInfo,
            Self::MissingPower { .. } => ErrorKind::MissingPower,
            Self::Transport { .. } => ErrorKind::TransportFailed,
            Self::StaleTick { .. } => ErrorKind::StaleTick,
        }
    }

    pub fn device(&self) -> &str {
        match self {
            Self::MissingInfo { device }
            | Self::MissingPower { device }
            | Self::Transport { device, .. }
            | Self::StaleTick { device } => device,
        }
    }
}

/// 调度器错误
#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("Device not found: {0}")]
    UnknownDevice(String),

    #[error("Device already exists: {0}")]
    DuplicateDevice(String),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

pub type Result<T> = std::result::Result<T, ExporterError>;
