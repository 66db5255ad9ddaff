use crate::emit::Emitter;
use crate::error::{ErrorKind, ExporterError, ReconcileError, Result};
use crate::ledger::{DeviceLedger, LedgerBook};
use crate::reconcile::Reconciler;
use crate::snapshot::MetricSnapshot;
use crate::state::DeviceState;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tapo_device::{DeviceError, TapoClient};
use tapo_shutdown::{wait_for_shutdown, ShutdownSignal};
use tapo_types::{RawInfo, RawPower, RawUsage};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

type Readings = (Option<RawInfo>, Option<RawPower>, Option<RawUsage>);

/// 单个设备的客户端，锁保证同一设备同时只有一次轮询
struct DeviceSlot {
    name: String,
    client: Mutex<Box<dyn TapoClient>>,
}

/// 一次轮询周期的汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub polled: usize,
    pub reconciled: usize,
    pub failed: usize,
}

/// 轮询调度器
///
/// 按固定周期轮询所有设备，每个设备独立对账、独立失败
pub struct TapoExporter {
    devices: RwLock<Vec<Arc<DeviceSlot>>>,
    states: RwLock<HashMap<String, DeviceState>>,
    ledgers: LedgerBook,
    reconciler: Reconciler,
    emitter: Emitter,
    poll_interval: Duration,

    /// 单个设备一次轮询的读取超时
    poll_timeout: Duration,
}

impl TapoExporter {
    pub fn new(reconciler: Reconciler, emitter: Emitter) -> Self {
        Self {
            devices: RwLock::new(Vec::new()),
            states: RwLock::new(HashMap::new()),
            ledgers: LedgerBook::new(),
            reconciler,
            emitter,
            poll_interval: Duration::from_secs(2),
            poll_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// 注册设备
    ///
    /// # 错误
    /// * `DuplicateDevice` - 设备名已存在
    pub async fn add_device(&self, client: Box<dyn TapoClient>) -> Result<()> {
        let name = client.identity().name.clone();

        let mut states = self.states.write().await;
        if states.contains_key(&name) {
            return Err(ExporterError::DuplicateDevice(name));
        }

        let mut devices = self.devices.write().await;
        devices.push(Arc::new(DeviceSlot {
            name: name.clone(),
            client: Mutex::new(client),
        }));
        states.insert(name.clone(), DeviceState::Uninitialized);
        // 账本从注册时刻开始计时
        self.ledgers.entry(&name, Instant::now()).await;
        self.emitter.metrics().set_device_count(devices.len());

        info!(device = %name, total = devices.len(), "Device added");
        Ok(())
    }

    /// 移除设备及其账本
    pub async fn remove_device(&self, name: &str) -> Result<()> {
        let mut states = self.states.write().await;
        if states.remove(name).is_none() {
            return Err(ExporterError::UnknownDevice(name.to_string()));
        }

        let mut devices = self.devices.write().await;
        devices.retain(|slot| slot.name != name);
        self.ledgers.remove(name).await;
        self.emitter.metrics().set_device_count(devices.len());

        info!(device = %name, total = devices.len(), "Device removed");
        Ok(())
    }

    pub async fn device_names(&self) -> Vec<String> {
        self.devices
            .read()
            .await
            .iter()
            .map(|slot| slot.name.clone())
            .collect()
    }

    pub async fn device_state(&self, name: &str) -> Option<DeviceState> {
        self.states.read().await.get(name).copied()
    }

    pub async fn ledger(&self, name: &str) -> Option<DeviceLedger> {
        self.ledgers.get(name).await
    }

    async fn slots(&self) -> Vec<Arc<DeviceSlot>> {
        self.devices.read().await.clone()
    }

    async fn slot(&self, name: &str) -> Result<Arc<DeviceSlot>> {
        self.devices
            .read()
            .await
            .iter()
            .find(|slot| slot.name == name)
            .cloned()
            .ok_or_else(|| ExporterError::UnknownDevice(name.to_string()))
    }

    async fn set_state(&self, name: &str, state: DeviceState) {
        let previous = self.states.write().await.insert(name.to_string(), state);

        match previous {
            Some(previous) if previous == state => {}
            Some(previous) if !previous.is_healthy() && state.is_healthy() => {
                info!(device = %name, from = %previous, to = %state, "Device recovered");
            }
            _ => debug!(device = %name, state = %state, "Device state changed"),
        }
    }

    /// 连接所有设备，返回连接成功的数量
    ///
    /// 连接失败的设备标记为 `Unreachable`，在后续轮询中重连
    pub async fn connect_devices(&self) -> usize {
        let slots = self.slots().await;
        let results = join_all(slots.iter().map(|slot| self.connect_slot(slot))).await;
        let connected = results.into_iter().filter(|ok| *ok).count();

        info!(connected, total = slots.len(), "Device connection finished");
        connected
    }

    async fn connect_slot(&self, slot: &DeviceSlot) -> bool {
        let mut client = slot.client.lock().await;
        match client.connect().await {
            Ok(()) => {
                self.set_state(&slot.name, DeviceState::Connected).await;
                true
            }
            Err(e) => {
                error!(
                    device = %slot.name,
                    kind = %ErrorKind::TransportFailed,
                    error = %e,
                    "Failed to connect to device"
                );
                self.emitter
                    .metrics()
                    .record_failure(&slot.name, ErrorKind::TransportFailed.as_str());
                self.set_state(&slot.name, DeviceState::Unreachable).await;
                false
            }
        }
    }

    /// 轮询单个设备
    pub async fn poll_device(&self, name: &str) -> Result<MetricSnapshot> {
        let slot = self.slot(name).await?;
        Ok(self.poll_slot(&slot).await?)
    }

    async fn poll_slot(&self, slot: &DeviceSlot) -> std::result::Result<MetricSnapshot, ReconcileError> {
        let mut client = slot.client.lock().await;

        let outcome = self.reconcile_locked(&mut **client).await;
        if matches!(outcome, Err(ReconcileError::Transport { .. })) {
            client.disconnect();
        }

        match &outcome {
            Ok(snapshot) => {
                self.emitter.emit(snapshot).await;

                let state = if snapshot.usage.is_some() {
                    DeviceState::Reconciled
                } else {
                    warn!(
                        device = %slot.name,
                        kind = %ErrorKind::MissingUsage,
                        "Device returned no usage data, usage metrics skipped"
                    );
                    self.emitter
                        .metrics()
                        .record_failure(&slot.name, ErrorKind::MissingUsage.as_str());
                    DeviceState::Degraded(ErrorKind::MissingUsage)
                };
                self.set_state(&slot.name, state).await;
            }
            Err(e) => {
                let kind = e.kind();
                warn!(device = %slot.name, kind = %kind, error = %e, "Device poll failed");
                self.emitter.metrics().record_failure(&slot.name, kind.as_str());

                let state = match kind {
                    ErrorKind::TransportFailed => DeviceState::Unreachable,
                    other => DeviceState::Degraded(other),
                };
                self.set_state(&slot.name, state).await;
            }
        }

        outcome
    }

    async fn reconcile_locked(
        &self,
        client: &mut dyn TapoClient,
    ) -> std::result::Result<MetricSnapshot, ReconcileError> {
        let name = client.identity().name.clone();

        // 重连可能包含型号回退，不计入读取超时
        if !client.is_connected() {
            client
                .connect()
                .await
                .map_err(|e| ReconcileError::transport(&name, e))?;
            info!(device = %name, "Reconnected to device");
        }

        let readings = match timeout(self.poll_timeout, Self::read_device(&*client)).await {
            Ok(readings) => readings,
            Err(_) => Err(DeviceError::Timeout(format!(
                "poll did not finish within {:?}",
                self.poll_timeout
            ))),
        };
        let (info, power, usage) = readings.map_err(|e| ReconcileError::transport(&name, e))?;

        // 读数齐全后再取采样时刻
        let now = Instant::now();
        let ledger = self.ledgers.entry(&name, now).await;
        let mut ledger = ledger.lock().await;

        self.reconciler.reconcile(
            client.identity(),
            &mut ledger,
            info.as_ref(),
            power.as_ref(),
            usage.as_ref(),
            now,
        )
    }

    async fn read_device(client: &dyn TapoClient) -> std::result::Result<Readings, DeviceError> {
        let info = client.get_device_info().await?;
        if info.is_none() {
            return Ok((None, None, None));
        }

        if let Some(nickname) = info.as_ref().and_then(|i| i.nickname.as_deref()) {
            debug!(device = %client.identity().name, nickname = %nickname, "Device info received");
        }

        let power = client.get_current_power().await?;
        let usage = client.get_device_usage().await?;
        Ok((info, power, usage))
    }

    /// 并发轮询所有设备一次
    pub async fn run_tick(&self) -> TickReport {
        let slots = self.slots().await;
        let results = join_all(slots.iter().map(|slot| self.poll_slot(slot))).await;

        let reconciled = results.iter().filter(|r| r.is_ok()).count();
        TickReport {
            polled: results.len(),
            reconciled,
            failed: results.len() - reconciled,
        }
    }

    /// 周期轮询直到收到关闭信号
    ///
    /// 轮询途中收到信号时放弃正在进行的轮询；账本只在对账成功时整体替换
    pub async fn run(&self, mut shutdown: broadcast::Receiver<ShutdownSignal>) {
        let device_count = self.devices.read().await.len();
        info!(
            devices = device_count,
            poll_interval = ?self.poll_interval,
            "Polling loop started"
        );

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let stop = wait_for_shutdown(&mut shutdown);
        tokio::pin!(stop);

        loop {
            tokio::select! {
                signal = &mut stop => {
                    info!(signal = %signal, "Polling loop stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }

            tokio::select! {
                signal = &mut stop => {
                    warn!(signal = %signal, "Shutdown during tick, abandoning in-flight polls");
                    return;
                }
                report = self.run_tick() => {
                    debug!(
                        polled = report.polled,
                        reconciled = report.reconciled,
                        failed = report.failed,
                        "Tick finished"
                    );
                }
            }
        }
    }
}
