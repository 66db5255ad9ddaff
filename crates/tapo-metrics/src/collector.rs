use crate::sink::{DeviceLabels, MetricSink, SinkError};
use prometheus::{CounterVec, Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;

/// 快照字段对应的 gauge（字段名, 帮助文本）
pub const SNAPSHOT_GAUGES: &[(&str, &str)] = &[
    ("power_watts", "Current power consumption in watts"),
    ("voltage_volts", "Voltage in volts (inferred when not reported)"),
    ("current_amps", "Current in amps as reported by the device"),
    ("calculated_current_amps", "Current in amps derived from power and voltage"),
    ("power_factor", "Power factor"),
    ("today_energy_wh", "Energy used today in watt-hours"),
    ("month_energy_wh", "Energy used this month in watt-hours"),
    ("today_runtime_minutes", "Runtime today in minutes"),
    ("month_runtime_minutes", "Runtime this month in minutes"),
    ("power_saved_wh", "Power saved in watt-hours"),
    ("accumulated_energy_wh", "Locally accumulated energy since process start in watt-hours"),
    ("accumulated_cost_usd", "Locally accumulated cost since process start"),
    ("today_cost_usd", "Cost of energy used today"),
    ("month_cost_usd", "Cost of energy used this month"),
    ("power_protection_status", "Power protection status (1 = active)"),
    ("overcurrent_status", "Overcurrent protection status (1 = active)"),
    ("overheat_status", "Overheat protection status (1 = active)"),
    ("signal_strength", "WiFi signal strength in dBm"),
    ("signal_level", "WiFi signal level"),
];

const METRIC_PREFIX: &str = "tapo";
const DEVICE_LABELS: &[&str] = &["device_name", "device_type"];

/// Prometheus 指标注册表
///
/// 每个实例拥有独立的 `Registry`，测试之间互不影响
pub struct TapoMetrics {
    // 设备 gauge，按快照字段名索引
    gauges: HashMap<&'static str, GaugeVec>,

    device_count: Gauge,
    poll_failures_total: CounterVec,

    registry: Registry,
}

impl TapoMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let mut gauges = HashMap::with_capacity(SNAPSHOT_GAUGES.len());
        for (field, help) in SNAPSHOT_GAUGES {
            let gauge = GaugeVec::new(
                Opts::new(format!("{}_{}", METRIC_PREFIX, field), *help),
                DEVICE_LABELS,
            )?;
            registry.register(Box::new(gauge.clone()))?;
            gauges.insert(*field, gauge);
        }

        let device_count = Gauge::new("tapo_device_count", "Number of configured Tapo devices")?;
        registry.register(Box::new(device_count.clone()))?;

        let poll_failures_total = CounterVec::new(
            Opts::new("tapo_poll_failures_total", "Total number of failed device polls"),
            &["device_name", "kind"],
        )?;
        registry.register(Box::new(poll_failures_total.clone()))?;

        Ok(Self {
            gauges,
            device_count,
            poll_failures_total,
            registry,
        })
    }

    /// 读取 gauge 当前值，未声明的字段返回 `None`
    pub fn gauge_value(&self, name: &str, labels: &DeviceLabels) -> Option<f64> {
        let gauge = self.gauges.get(name)?;
        gauge
            .get_metric_with_label_values(&[&labels.device_name, &labels.device_type])
            .ok()
            .map(|g| g.get())
    }

    pub fn failure_count(&self, device_name: &str, kind: &str) -> f64 {
        self.poll_failures_total
            .get_metric_with_label_values(&[device_name, kind])
            .map(|c| c.get())
            .unwrap_or(0.0)
    }

    pub fn device_count(&self) -> f64 {
        self.device_count.get()
    }

    // 导出指标
    pub fn export(&self) -> Result<String, SinkError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| SinkError::Encode(e.to_string()))
    }
}

impl MetricSink for TapoMetrics {
    fn set_gauge(&self, name: &str, labels: &DeviceLabels, value: f64) -> Result<(), SinkError> {
        let gauge = self
            .gauges
            .get(name)
            .ok_or_else(|| SinkError::UnknownMetric(name.to_string()))?;

        gauge
            .get_metric_with_label_values(&[&labels.device_name, &labels.device_type])?
            .set(value);
        Ok(())
    }

    fn record_failure(&self, device_name: &str, kind: &str) {
        self.poll_failures_total
            .with_label_values(&[device_name, kind])
            .inc();
    }

    fn set_device_count(&self, count: usize) {
        self.device_count.set(count as f64);
    }
}
