mod common;

use common::{identity, info, power, BrokenSink, RecordingStore};
use std::sync::Arc;
use std::time::Instant;
use tapo_core::{DeviceLedger, Emitter, MetricSnapshot, Reconciler};
use tapo_metrics::{DeviceLabels, MetricSink, TapoMetrics};
use tapo_timeseries::{FieldValue, TimeSeriesSink};
use tapo_types::RawInfo;

fn snapshot(raw_info: RawInfo) -> MetricSnapshot {
    let now = Instant::now();
    let mut ledger = DeviceLedger::new(now);
    Reconciler::default()
        .reconcile(
            &identity("office"),
            &mut ledger,
            Some(&raw_info),
            Some(&power(230.0, 0.0)),
            None,
            now,
        )
        .unwrap()
}

#[tokio::test]
async fn test_emit_to_both_sinks() {
    let metrics = Arc::new(TapoMetrics::new().unwrap());
    let store = Arc::new(RecordingStore::default());
    let sink: Arc<dyn MetricSink> = metrics.clone();
    let timeseries: Arc<dyn TimeSeriesSink> = store.clone();
    let emitter = Emitter::new(sink, Some(timeseries));

    let snapshot = snapshot(info("P115"));
    let report = emitter.emit(&snapshot).await;

    assert!(report.is_complete());
    assert_eq!(report.gauges_written, snapshot.fields().len());
    assert_eq!(report.point_written, Some(true));

    let labels = DeviceLabels::new("office", "p115");
    assert_eq!(metrics.gauge_value("voltage_volts", &labels), Some(120.0));

    let points = store.points.lock().unwrap();
    let point = &points[0];
    assert_eq!(point.tags.len(), 8);
    assert_eq!(point.tags.get("device_type").map(String::as_str), Some("p115"));
    assert_eq!(point.tags.get("fw_version").map(String::as_str), Some("1.1.3"));
    assert_eq!(
        point.fields.get("calculated_current_amps"),
        Some(&FieldValue::Float(230.0 / 120.0))
    );
}

#[tokio::test]
async fn test_missing_info_fields_tagged_unknown() {
    let store = Arc::new(RecordingStore::default());
    let timeseries: Arc<dyn TimeSeriesSink> = store.clone();
    let emitter = Emitter::new(Arc::new(TapoMetrics::new().unwrap()), Some(timeseries));

    let bare = RawInfo {
        model: Some("P110".to_string()),
        ..Default::default()
    };
    emitter.emit(&snapshot(bare)).await;

    let points = store.points.lock().unwrap();
    assert_eq!(points[0].tags.get("mac").map(String::as_str), Some("unknown"));
    assert_eq!(points[0].tags.get("ssid").map(String::as_str), Some("unknown"));
}

/// 指标汇失败不阻塞时序写入
#[tokio::test]
async fn test_metric_sink_failure_does_not_block_timeseries() {
    let broken = Arc::new(BrokenSink::default());
    let store = Arc::new(RecordingStore::default());
    let sink: Arc<dyn MetricSink> = broken.clone();
    let timeseries: Arc<dyn TimeSeriesSink> = store.clone();
    let emitter = Emitter::new(sink, Some(timeseries));

    let report = emitter.emit(&snapshot(info("P110"))).await;

    assert!(!report.is_complete());
    assert_eq!(report.gauges_written, 0);
    assert_eq!(report.point_written, Some(true));
    assert_eq!(store.count(), 1);
    assert_eq!(
        broken.failures.lock().unwrap().as_slice(),
        &[("office".to_string(), "sink_write_failed".to_string())]
    );
}

/// 时序写入失败不影响指标
#[tokio::test]
async fn test_timeseries_failure_does_not_block_metrics() {
    let metrics = Arc::new(TapoMetrics::new().unwrap());
    let sink: Arc<dyn MetricSink> = metrics.clone();
    let timeseries: Arc<dyn TimeSeriesSink> = Arc::new(RecordingStore::failing());
    let emitter = Emitter::new(sink, Some(timeseries));

    let report = emitter.emit(&snapshot(info("P110"))).await;

    assert_eq!(report.point_written, Some(false));
    assert_eq!(report.gauge_failures, 0);
    assert_eq!(
        metrics.gauge_value("power_watts", &DeviceLabels::new("office", "p110")),
        Some(230.0)
    );
    assert_eq!(metrics.failure_count("office", "sink_write_failed"), 1.0);
}

#[tokio::test]
async fn test_emit_without_timeseries() {
    let emitter = Emitter::new(Arc::new(TapoMetrics::new().unwrap()), None);
    let report = emitter.emit(&snapshot(info("P110"))).await;

    assert_eq!(report.point_written, None);
    assert!(report.is_complete());
}
