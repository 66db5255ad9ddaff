use crate::cost::CostCalculator;
use crate::error::ReconcileError;
use crate::ledger::DeviceLedger;
use crate::normalize::{normalize_power, normalize_usage};
use crate::snapshot::{MetricSnapshot, UsageMetrics};
use std::time::Instant;
use tapo_types::{DeviceIdentity, RawInfo, RawPower, RawUsage};
use tracing::debug;

/// 对账引擎
///
/// 把设备原始读数转换为指标快照，并推进该设备的账本
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    cost: CostCalculator,
}

impl Reconciler {
    pub fn new(cost: CostCalculator) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> &CostCalculator {
        &self.cost
    }

    /// 执行一次对账
    ///
    /// # 参数
    /// * `identity` - 设备身份，设备名作为指标标签
    /// * `ledger` - 设备账本，只有成功时才被整体替换
    /// * `raw_usage` - 缺失时仍产出功率类指标，用电类指标省略
    /// * `now` - 本次采样时刻
    ///
    /// # 错误
    /// * `MissingInfo` / `MissingPower` - 读数缺失
    /// * `StaleTick` - `now` 早于上次更新，或非首次更新时不晚于上次更新
    pub fn reconcile(
        &self,
        identity: &DeviceIdentity,
        ledger: &mut DeviceLedger,
        raw_info: Option<&RawInfo>,
        raw_power: Option<&RawPower>,
        raw_usage: Option<&RawUsage>,
        now: Instant,
    ) -> Result<MetricSnapshot, ReconcileError> {
        let device = identity.name.as_str();

        let info = raw_info.ok_or_else(|| ReconcileError::MissingInfo {
            device: device.to_string(),
        })?;
        let power = normalize_power(raw_power.ok_or_else(|| ReconcileError::MissingPower {
            device: device.to_string(),
        })?);

        let next = ledger
            .advance(power.power_watts, now, &self.cost)
            .ok_or_else(|| ReconcileError::StaleTick {
                device: device.to_string(),
            })?;
        *ledger = next;

        let usage = raw_usage.map(|raw| self.usage_metrics(raw, &next));

        debug!(
            device = %device,
            power = power.power_watts,
            accumulated_energy_wh = next.accumulated_energy_wh,
            usage = usage.is_some(),
            "Reconciled device readings"
        );

        Ok(MetricSnapshot {
            device_name: identity.name.clone(),
            device_type: info.device_type(),
            info: info.clone(),
            power_watts: power.power_watts,
            voltage_volts: power.voltage_volts,
            current_amps: power.current_amps,
            calculated_current_amps: power.calculated_current_amps,
            power_factor: power.power_factor,
            signal_level: info.signal_level.unwrap_or(0),
            accumulated_energy_wh: next.accumulated_energy_wh,
            accumulated_cost_usd: next.accumulated_cost_usd,
            usage,
        })
    }

    fn usage_metrics(&self, raw: &RawUsage, ledger: &DeviceLedger) -> UsageMetrics {
        let usage = normalize_usage(raw);

        // 周期切换后设备计数器会短暂归零，用本地累计值代替
        let fallback = ledger.accumulated_energy_wh.floor();
        let today_energy_wh = if usage.today_energy == 0.0 {
            fallback
        } else {
            usage.today_energy
        };
        let month_energy_wh = if usage.month_energy == 0.0 {
            fallback
        } else {
            usage.month_energy
        };

        UsageMetrics {
            today_energy_wh,
            month_energy_wh,
            today_runtime_minutes: usage.today_runtime,
            month_runtime_minutes: usage.month_runtime,
            power_saved_wh: usage.power_saved,
            today_cost_usd: self.cost.calculate_cost(today_energy_wh),
            month_cost_usd: self.cost.calculate_cost(month_energy_wh),
            power_protection_status: usage.power_protection,
            overcurrent_status: usage.overcurrent_protection,
            overheat_status: usage.overheat_protection,
            signal_strength: usage.signal_strength,
        }
    }
}
