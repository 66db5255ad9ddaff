//! 导出器进程装配
//!
//! 启动顺序：指标注册表与 HTTP 服务 -> 时序汇（可选）-> 设备 -> 连接 -> 轮询直到收到信号

use anyhow::Context;
use std::sync::Arc;
use tapo_config::ExporterConfig;
use tapo_core::{CostCalculator, Emitter, Reconciler, TapoExporter};
use tapo_device::{HttpBridgeTransport, P110Device, TapoClient, TapoTransport};
use tapo_metrics::{MetricSink, TapoMetrics};
use tapo_shutdown::{wait_for_shutdown, SignalHandler};
use tapo_timeseries::{InfluxConfig, InfluxStore, TimeSeriesSink};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// 日志过滤器：优先 `RUST_LOG`，否则使用配置的级别
pub fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_lowercase()))
}

/// 初始化日志，重复调用时保留第一次的设置
pub fn init_tracing(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(level))
        .try_init();
}

/// 按配置创建时序汇；禁用时返回 `None`
pub fn build_timeseries(config: &ExporterConfig) -> anyhow::Result<Option<Arc<dyn TimeSeriesSink>>> {
    if !config.influxdb.enabled {
        info!("InfluxDB sink disabled");
        return Ok(None);
    }

    if config.influxdb.token.is_empty() {
        warn!("InfluxDB token is empty, writes may be rejected");
    }

    let influx = InfluxConfig {
        url: config.influxdb.url.clone(),
        token: config.influxdb.token.clone(),
        org: config.influxdb.org.clone(),
        bucket: config.influxdb.bucket.clone(),
    };
    let store = InfluxStore::new(&influx, config.poll_timeout())
        .context("failed to create InfluxDB client")?;
    Ok(Some(Arc::new(store)))
}

/// 为每个配置的设备创建客户端
pub fn build_devices(
    config: &ExporterConfig,
    transport: Arc<dyn TapoTransport>,
) -> Vec<Box<dyn TapoClient>> {
    config
        .devices
        .iter()
        .map(|device| {
            let client = P110Device::new(device.identity(), device.device_type, transport.clone())
                .with_fallback_delay(config.fallback_delay());
            Box::new(client) as Box<dyn TapoClient>
        })
        .collect()
}

/// 装配调度器并注册所有设备
pub async fn build_exporter(
    config: &ExporterConfig,
    metrics: Arc<dyn MetricSink>,
    timeseries: Option<Arc<dyn TimeSeriesSink>>,
    transport: Arc<dyn TapoTransport>,
) -> anyhow::Result<TapoExporter> {
    let reconciler = Reconciler::new(CostCalculator::new(config.cost_per_kwh));
    let exporter = TapoExporter::new(reconciler, Emitter::new(metrics, timeseries))
        .with_poll_interval(config.poll_interval())
        .with_poll_timeout(config.poll_timeout());

    for client in build_devices(config, transport) {
        exporter.add_device(client).await?;
    }

    Ok(exporter)
}

/// 运行导出器直到收到 SIGINT/SIGTERM
pub async fn run(config: ExporterConfig) -> anyhow::Result<()> {
    info!(
        devices = config.devices.len(),
        poll_interval_secs = config.poll_interval_secs,
        cost_per_kwh = config.cost_per_kwh,
        "Configuration loaded"
    );

    let metrics = Arc::new(TapoMetrics::new().context("failed to create metrics registry")?);
    let listener = tapo_metrics::bind(&config.prometheus.host, config.prometheus.port)
        .await
        .context("failed to bind metrics endpoint")?;

    let (signals, exporter_rx) = SignalHandler::new();
    let mut server_rx = signals.subscribe();
    let server = tokio::spawn(tapo_metrics::serve(listener, metrics.clone(), async move {
        wait_for_shutdown(&mut server_rx).await;
    }));

    let timeseries = build_timeseries(&config)?;
    let transport: Arc<dyn TapoTransport> = Arc::new(
        HttpBridgeTransport::new(config.bridge.url.clone(), config.bridge_timeout())
            .context("failed to create bridge transport")?,
    );
    let exporter = build_exporter(&config, metrics, timeseries, transport).await?;

    let connected = exporter.connect_devices().await;
    if connected == 0 {
        warn!("No devices connected, will keep retrying every poll");
    }

    let signal_task = {
        let signals = signals.clone();
        tokio::spawn(async move {
            if let Err(e) = signals.wait_for_system_signal().await {
                error!(error = %e, "Failed to install signal handlers, shutting down");
                signals.trigger_shutdown();
            }
        })
    };

    exporter.run(exporter_rx).await;
    signal_task.abort();

    server.await.context("metrics server task failed")??;
    info!("Tapo exporter stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tapo_config::{DeviceConfig, InfluxDbConfig};
    use tapo_device::{DeviceTarget, TapoMethod};
    use tapo_types::DeviceModel;

    /// 按方法返回固定响应的传输层
    struct StaticTransport;

    #[async_trait]
    impl TapoTransport for StaticTransport {
        async fn request(
            &self,
            _target: &DeviceTarget,
            method: TapoMethod,
        ) -> tapo_device::Result<Value> {
            Ok(match method {
                TapoMethod::GetDeviceInfo => json!({"error_code": 0, "result": {"model": "P110"}}),
                TapoMethod::GetCurrentPower => json!({"current_power": 2000, "voltage": 0}),
                TapoMethod::GetDeviceUsage => json!({"today_energy": 0, "month_energy": 4200}),
            })
        }
    }

    fn config() -> ExporterConfig {
        let device = |name: &str, ip: &str| DeviceConfig {
            name: name.to_string(),
            ip: ip.to_string(),
            email: "user@example.com".to_string(),
            password: "secret".to_string(),
            device_type: DeviceModel::P110,
        };

        ExporterConfig {
            devices: vec![device("office", "10.0.0.2"), device("garage", "10.0.0.3")],
            influxdb: InfluxDbConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_timeseries_disabled() {
        assert!(build_timeseries(&config()).unwrap().is_none());

        let mut enabled = config();
        enabled.influxdb.enabled = true;
        assert!(build_timeseries(&enabled).unwrap().is_some());
    }

    #[test]
    fn test_build_devices() {
        let devices = build_devices(&config(), Arc::new(StaticTransport));
        let names: Vec<_> = devices.iter().map(|d| d.identity().name.clone()).collect();
        assert_eq!(names, vec!["office", "garage"]);
        assert!(devices.iter().all(|d| !d.is_connected()));
    }

    #[tokio::test]
    async fn test_exporter_end_to_end() {
        let metrics = Arc::new(TapoMetrics::new().unwrap());
        let exporter = build_exporter(&config(), metrics.clone(), None, Arc::new(StaticTransport))
            .await
            .unwrap();

        assert_eq!(exporter.connect_devices().await, 2);
        let report = exporter.run_tick().await;
        assert_eq!(report.reconciled, 2);

        let exported = metrics.export().unwrap();
        assert!(exported.contains("tapo_device_count 2"));
        assert!(exported
            .contains(r#"tapo_voltage_volts{device_name="office",device_type="p110"} 240"#));
        assert!(exported
            .contains(r#"tapo_month_energy_wh{device_name="garage",device_type="p110"} 4200"#));
    }
}
