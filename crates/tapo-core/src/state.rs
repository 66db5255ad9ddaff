use crate::error::ErrorKind;
use std::fmt;

/// 设备轮询状态
///
/// `Degraded` 与 `Unreachable` 在下一次完整成功的轮询后回到 `Reconciled`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Uninitialized,
    Connected,
    Reconciled,
    Degraded(ErrorKind),
    Unreachable,
}

impl DeviceState {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Connected | Self::Reconciled)
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("uninitialized"),
            Self::Connected => f.write_str("connected"),
            Self::Reconciled => f.write_str("reconciled"),
            Self::Degraded(kind) => write!(f, "degraded({})", kind),
            Self::Unreachable => f.write_str("unreachable"),
        }
    }
}
