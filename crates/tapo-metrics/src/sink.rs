use thiserror::Error;

/// 指标写入错误
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("Encode error: {0}")]
    Encode(String),
}

/// 设备指标标签
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceLabels {
    pub device_name: String,
    pub device_type: String,
}

impl DeviceLabels {
    pub fn new(device_name: impl Into<String>, device_type: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            device_type: device_type.into(),
        }
    }
}

/// 指标汇
///
/// 多个设备会并发写入，实现方自行保证线程安全
pub trait MetricSink: Send + Sync {
    /// 设置设备 gauge，`name` 为不带前缀的快照字段名
    fn set_gauge(&self, name: &str, labels: &DeviceLabels, value: f64) -> Result<(), SinkError>;

    /// 记录一次设备轮询失败
    fn record_failure(&self, _device_name: &str, _kind: &str) {}

    /// 更新已配置设备数量
    fn set_device_count(&self, _count: usize) {}
}
