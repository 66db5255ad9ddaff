use crate::error::ErrorKind;
use crate::snapshot::MetricSnapshot;
use chrono::Utc;
use std::sync::Arc;
use tapo_metrics::{DeviceLabels, MetricSink};
use tapo_timeseries::{DataPoint, TimeSeriesSink};
use tracing::{debug, warn};

/// 时序数据 measurement 名称
pub const MEASUREMENT: &str = "tapo_metrics";

/// 一次写出的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitReport {
    pub gauges_written: usize,
    pub gauge_failures: usize,

    /// 时序写入结果；未配置时序汇时为 `None`
    pub point_written: Option<bool>,
}

impl EmitReport {
    pub fn is_complete(&self) -> bool {
        self.gauge_failures == 0 && self.point_written != Some(false)
    }
}

/// 把快照写入指标汇和时序汇
///
/// 两个汇互不影响，写入失败只记录日志和失败计数
#[derive(Clone)]
pub struct Emitter {
    metrics: Arc<dyn MetricSink>,
    timeseries: Option<Arc<dyn TimeSeriesSink>>,
}

impl Emitter {
    pub fn new(metrics: Arc<dyn MetricSink>, timeseries: Option<Arc<dyn TimeSeriesSink>>) -> Self {
        Self {
            metrics,
            timeseries,
        }
    }

    pub fn metrics(&self) -> &Arc<dyn MetricSink> {
        &self.metrics
    }

    pub async fn emit(&self, snapshot: &MetricSnapshot) -> EmitReport {
        let mut report = EmitReport::default();
        let labels = DeviceLabels::new(snapshot.device_name.as_str(), snapshot.device_type.as_str());
        let fields = snapshot.fields();

        for (name, value) in &fields {
            match self.metrics.set_gauge(name, &labels, *value) {
                Ok(()) => report.gauges_written += 1,
                Err(e) => {
                    report.gauge_failures += 1;
                    warn!(
                        device = %snapshot.device_name,
                        metric = %name,
                        kind = %ErrorKind::SinkWriteFailed,
                        error = %e,
                        "Failed to update gauge"
                    );
                }
            }
        }
        if report.gauge_failures > 0 {
            self.metrics
                .record_failure(&snapshot.device_name, ErrorKind::SinkWriteFailed.as_str());
        }

        if let Some(timeseries) = &self.timeseries {
            let point = Self::data_point(snapshot, &fields);
            match timeseries.write_point(&point).await {
                Ok(()) => report.point_written = Some(true),
                Err(e) => {
                    report.point_written = Some(false);
                    warn!(
                        device = %snapshot.device_name,
                        kind = %ErrorKind::SinkWriteFailed,
                        error = %e,
                        "Failed to write time-series point"
                    );
                    self.metrics
                        .record_failure(&snapshot.device_name, ErrorKind::SinkWriteFailed.as_str());
                }
            }
        }

        debug!(
            device = %snapshot.device_name,
            gauges = report.gauges_written,
            point_written = ?report.point_written,
            "Snapshot emitted"
        );
        report
    }

    fn data_point(snapshot: &MetricSnapshot, fields: &[(&'static str, f64)]) -> DataPoint {
        let mut point = DataPoint::new(MEASUREMENT).with_timestamp(Utc::now());
        for (key, value) in snapshot.tags() {
            point = point.tag(key, value);
        }
        for (key, value) in fields {
            point = point.field(*key, *value);
        }
        point
    }
}
