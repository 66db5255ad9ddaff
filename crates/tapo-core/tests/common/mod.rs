#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tapo_device::{DeviceError, TapoClient};
use tapo_metrics::{DeviceLabels, MetricSink, SinkError};
use tapo_timeseries::{DataPoint, StoreError, TimeSeriesSink};
use tapo_types::{Credentials, DeviceIdentity, RawInfo, RawPower, RawUsage};

/// 设备下一次返回的读数
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub info: Option<RawInfo>,
    pub power: Option<RawPower>,
    pub usage: Option<RawUsage>,
    pub transport_down: bool,

    /// 每次读取设备信息前的延迟
    pub read_delay: Duration,
    pub connect_delay: Duration,
}

impl Script {
    pub fn healthy(power_watts: f64) -> Self {
        Self {
            info: Some(info("P110")),
            power: Some(power(power_watts, 0.0)),
            usage: Some(RawUsage {
                today_energy: 500.0,
                month_energy: 5000.0,
                today_runtime: 30,
                month_runtime: 300,
                signal_strength: -48,
                ..Default::default()
            }),
            transport_down: false,
            read_delay: Duration::ZERO,
            connect_delay: Duration::ZERO,
        }
    }
}

/// 正在进行的读取数及其峰值
#[derive(Default)]
pub struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// 内存中的设备客户端
pub struct FakeClient {
    identity: DeviceIdentity,
    connected: bool,
    script: Arc<Mutex<Script>>,
    connects: Arc<AtomicUsize>,
    in_flight: Arc<InFlight>,
}

/// 测试侧对设备行为的控制句柄
#[derive(Clone)]
pub struct FakeHandle {
    script: Arc<Mutex<Script>>,
    connects: Arc<AtomicUsize>,
    in_flight: Arc<InFlight>,
}

impl FakeHandle {
    pub fn set(&self, script: Script) {
        *self.script.lock().unwrap() = script;
    }

    pub fn update(&self, f: impl FnOnce(&mut Script)) {
        f(&mut self.script.lock().unwrap());
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// 同时进行的读取数峰值
    pub fn peak_reads(&self) -> usize {
        self.in_flight.peak.load(Ordering::SeqCst)
    }
}

pub fn fake_device(name: &str, script: Script) -> (Box<dyn TapoClient>, FakeHandle) {
    let script = Arc::new(Mutex::new(script));
    let connects = Arc::new(AtomicUsize::new(0));
    let in_flight = Arc::new(InFlight::default());
    let client = FakeClient {
        identity: identity(name),
        connected: false,
        script: script.clone(),
        connects: connects.clone(),
        in_flight: in_flight.clone(),
    };
    let handle = FakeHandle {
        script,
        connects,
        in_flight,
    };
    (Box::new(client), handle)
}

impl FakeClient {
    fn check(&self) -> Result<Script, DeviceError> {
        if !self.connected {
            return Err(DeviceError::NotConnected(self.identity.name.clone()));
        }
        let script = self.script.lock().unwrap().clone();
        if script.transport_down {
            return Err(DeviceError::Timeout("device unreachable".to_string()));
        }
        Ok(script)
    }
}

#[async_trait]
impl TapoClient for FakeClient {
    fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self) -> Result<(), DeviceError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let (down, delay) = {
            let script = self.script.lock().unwrap();
            (script.transport_down, script.connect_delay)
        };
        tokio::time::sleep(delay).await;
        if down {
            return Err(DeviceError::Connection {
                device: self.identity.name.clone(),
                reason: "host unreachable".to_string(),
            });
        }
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    async fn get_device_info(&self) -> Result<Option<RawInfo>, DeviceError> {
        let script = self.check()?;
        self.in_flight.enter();
        tokio::time::sleep(script.read_delay).await;
        self.in_flight.exit();
        Ok(script.info)
    }

    async fn get_current_power(&self) -> Result<Option<RawPower>, DeviceError> {
        Ok(self.check()?.power)
    }

    async fn get_device_usage(&self) -> Result<Option<RawUsage>, DeviceError> {
        Ok(self.check()?.usage)
    }
}

/// 记录写入的时序汇
#[derive(Default)]
pub struct RecordingStore {
    pub points: Mutex<Vec<DataPoint>>,
    pub fail: bool,
}

impl RecordingStore {
    pub fn failing() -> Self {
        Self {
            points: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn count(&self) -> usize {
        self.points.lock().unwrap().len()
    }
}

#[async_trait]
impl TimeSeriesSink for RecordingStore {
    async fn write_point(&self, point: &DataPoint) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::Rejected {
                status: 503,
                body: "influx down".to_string(),
            });
        }
        self.points.lock().unwrap().push(point.clone());
        Ok(())
    }
}

/// 所有写入都失败的指标汇
#[derive(Default)]
pub struct BrokenSink {
    pub failures: Mutex<Vec<(String, String)>>,
}

impl MetricSink for BrokenSink {
    fn set_gauge(&self, name: &str, _labels: &DeviceLabels, _value: f64) -> Result<(), SinkError> {
        Err(SinkError::UnknownMetric(name.to_string()))
    }

    fn record_failure(&self, device_name: &str, kind: &str) {
        self.failures
            .lock()
            .unwrap()
            .push((device_name.to_string(), kind.to_string()));
    }
}

pub fn identity(name: &str) -> DeviceIdentity {
    DeviceIdentity::new(name, "192.168.1.50", Credentials::new("user@example.com", "secret"))
}

pub fn info(model: &str) -> RawInfo {
    RawInfo {
        model: Some(model.to_string()),
        fw_ver: Some("1.1.3".to_string()),
        hw_ver: Some("1.0".to_string()),
        device_id: Some("8022ABCDEF".to_string()),
        mac: Some("AA-BB-CC-DD-EE-FF".to_string()),
        ip: Some("192.168.1.50".to_string()),
        ssid: Some("HomeWifi".to_string()),
        nickname: Some("Office Plug".to_string()),
        signal_level: Some(3),
    }
}

pub fn power(current_power: f64, voltage: f64) -> RawPower {
    RawPower {
        current_power,
        voltage,
        current: 0.0,
        power_factor: 0.0,
    }
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
