//! 原始读数归一化
//!
//! 设备偶尔上报负值，所有数值字段先取绝对值；
//! 电压缺失时按功率推断标准电压。

use tapo_types::{RawPower, RawUsage};

/// 低压标准电压 (V)
pub const LOW_VOLTAGE: f64 = 120.0;

/// 高压标准电压 (V)
pub const HIGH_VOLTAGE: f64 = 240.0;

/// 超过该功率 (W) 时推断为高压线路
pub const HIGH_VOLTAGE_POWER_THRESHOLD: f64 = 1800.0;

/// 归一化后的功率读数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedPower {
    pub power_watts: f64,

    /// 上报电压，缺失时为推断电压
    pub voltage_volts: f64,

    /// 设备上报电流
    pub current_amps: f64,

    /// 由功率和电压计算的电流
    pub calculated_current_amps: f64,

    pub power_factor: f64,
}

/// 按功率推断标准电压
pub fn infer_voltage(power_watts: f64) -> f64 {
    if power_watts > HIGH_VOLTAGE_POWER_THRESHOLD {
        HIGH_VOLTAGE
    } else {
        LOW_VOLTAGE
    }
}

pub fn normalize_power(raw: &RawPower) -> NormalizedPower {
    let power_watts = raw.current_power.abs();
    let reported_voltage = raw.voltage.abs();

    let voltage_volts = if reported_voltage > 0.0 {
        reported_voltage
    } else {
        infer_voltage(power_watts)
    };

    let calculated_current_amps = if voltage_volts > 0.0 {
        power_watts / voltage_volts
    } else {
        0.0
    };

    NormalizedPower {
        power_watts,
        voltage_volts,
        current_amps: raw.current.abs(),
        calculated_current_amps,
        power_factor: raw.power_factor.abs(),
    }
}

/// 用电统计取绝对值；信号强度 (dBm) 本身为负，保持原值
pub fn normalize_usage(raw: &RawUsage) -> RawUsage {
    RawUsage {
        today_energy: raw.today_energy.abs(),
        month_energy: raw.month_energy.abs(),
        today_runtime: raw.today_runtime.saturating_abs(),
        month_runtime: raw.month_runtime.saturating_abs(),
        power_saved: raw.power_saved.abs(),
        ..*raw
    }
}
