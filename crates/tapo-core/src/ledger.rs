use crate::cost::CostCalculator;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};

/// 单个设备的累计能耗账本
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceLedger {
    pub last_power_w: f64,
    pub last_update_time: Instant,

    /// 进程启动以来的累计能耗，只增不减
    pub accumulated_energy_wh: f64,

    pub accumulated_cost_usd: f64,

    /// 成功更新次数
    pub updates: u64,
}

impl DeviceLedger {
    pub fn new(now: Instant) -> Self {
        Self {
            last_power_w: 0.0,
            last_update_time: now,
            accumulated_energy_wh: 0.0,
            accumulated_cost_usd: 0.0,
            updates: 0,
        }
    }

    /// 尚未有过成功更新
    pub fn is_fresh(&self) -> bool {
        self.updates == 0
    }

    /// 计算下一次账本状态，不修改自身
    ///
    /// 梯形积分：`(P_now + P_last) / 2 * Δt / 3600`，Δt 从上次更新算起；
    /// 首次更新从账本创建时刻算起，此时 `P_last` 为 0。
    ///
    /// `now` 早于上次更新时返回 `None`；非首次更新时 `now` 还必须严格晚于上次更新。
    pub fn advance(&self, power_w: f64, now: Instant, cost: &CostCalculator) -> Option<Self> {
        if now < self.last_update_time || (!self.is_fresh() && now == self.last_update_time) {
            return None;
        }
        let time_diff_secs = now.duration_since(self.last_update_time).as_secs_f64();

        let avg_power = (power_w + self.last_power_w) / 2.0;
        let energy_increment_wh = avg_power * time_diff_secs / 3600.0;
        let cost_increment = cost.calculate_cost(energy_increment_wh);

        Some(Self {
            last_power_w: power_w,
            last_update_time: now,
            accumulated_energy_wh: self.accumulated_energy_wh + energy_increment_wh,
            accumulated_cost_usd: self.accumulated_cost_usd + cost_increment,
            updates: self.updates + 1,
        })
    }
}

/// 所有设备的账本
///
/// 每个账本单独加锁；设备注册时创建
#[derive(Default)]
pub struct LedgerBook {
    ledgers: RwLock<HashMap<String, Arc<Mutex<DeviceLedger>>>>,
}

impl LedgerBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取设备账本，不存在时以 `now` 创建
    pub async fn entry(&self, device: &str, now: Instant) -> Arc<Mutex<DeviceLedger>> {
        if let Some(ledger) = self.ledgers.read().await.get(device) {
            return ledger.clone();
        }

        self.ledgers
            .write()
            .await
            .entry(device.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(DeviceLedger::new(now))))
            .clone()
    }

    /// 当前账本副本
    pub async fn get(&self, device: &str) -> Option<DeviceLedger> {
        let ledger = self.ledgers.read().await.get(device)?.clone();
        let snapshot = *ledger.lock().await;
        Some(snapshot)
    }

    /// 删除设备账本
    pub async fn remove(&self, device: &str) -> Option<DeviceLedger> {
        let ledger = self.ledgers.write().await.remove(device)?;
        let last = *ledger.lock().await;
        Some(last)
    }

    pub async fn len(&self) -> usize {
        self.ledgers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ledgers.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_update_integrates_from_creation() {
        let start = Instant::now();
        let ledger = DeviceLedger::new(start);
        let cost = CostCalculator::default();

        // (100 + 0) / 2 W * 36 s = 0.5 Wh
        let next = ledger
            .advance(100.0, start + Duration::from_secs(36), &cost)
            .unwrap();
        assert!((next.accumulated_energy_wh - 0.5).abs() < 1e-9);
        assert_eq!(next.last_power_w, 100.0);
        assert_eq!(next.last_update_time, start + Duration::from_secs(36));
        assert_eq!(next.updates, 1);
        assert!(!next.is_fresh());
    }

    #[test]
    fn test_first_update_at_creation_time() {
        let start = Instant::now();
        let next = DeviceLedger::new(start)
            .advance(100.0, start, &CostCalculator::default())
            .unwrap();
        assert_eq!(next.accumulated_energy_wh, 0.0);
        assert_eq!(next.updates, 1);
    }

    #[test]
    fn test_fresh_ledger_rejects_earlier_time() {
        let start = Instant::now();
        let ledger = DeviceLedger::new(start + Duration::from_secs(50));

        assert!(ledger
            .advance(100.0, start, &CostCalculator::default())
            .is_none());
    }

    #[test]
    fn test_trapezoid_increment() {
        let start = Instant::now();
        let cost = CostCalculator::default();
        let ledger = DeviceLedger::new(start).advance(100.0, start, &cost).unwrap();

        // (100 + 300) / 2 W * 36 s = 2 Wh
        let next = ledger
            .advance(300.0, start + Duration::from_secs(36), &cost)
            .unwrap();
        assert!((next.accumulated_energy_wh - 2.0).abs() < 1e-9);
        assert!((next.accumulated_cost_usd - 0.00024).abs() < 1e-12);
        assert_eq!(next.last_update_time, start + Duration::from_secs(36));
    }

    #[test]
    fn test_stale_tick_rejected() {
        let start = Instant::now();
        let cost = CostCalculator::default();
        let ledger = DeviceLedger::new(start)
            .advance(100.0, start + Duration::from_secs(2), &cost)
            .unwrap();

        assert!(ledger
            .advance(100.0, start + Duration::from_secs(2), &cost)
            .is_none());
        assert!(ledger.advance(100.0, start, &cost).is_none());
    }

    #[tokio::test]
    async fn test_ledger_book_lazy_entries() {
        let book = LedgerBook::new();
        let now = Instant::now();
        assert!(book.get("office").await.is_none());

        let entry = book.entry("office", now).await;
        entry.lock().await.accumulated_energy_wh = 5.0;

        let again = book.entry("office", now + Duration::from_secs(10)).await;
        assert!(Arc::ptr_eq(&entry, &again));
        assert_eq!(book.get("office").await.unwrap().accumulated_energy_wh, 5.0);
        assert_eq!(book.len().await, 1);
    }
}
