use serde::{Deserialize, Serialize};

/// 设备信息（每次轮询获取，不持久化）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawInfo {
    pub model: Option<String>,
    pub fw_ver: Option<String>,
    pub hw_ver: Option<String>,
    pub device_id: Option<String>,
    pub mac: Option<String>,
    pub ip: Option<String>,
    pub ssid: Option<String>,
    pub nickname: Option<String>,
    pub signal_level: Option<i64>,
}

impl RawInfo {
    /// 设备类型标签：型号小写，缺失时为 `unknown`
    pub fn device_type(&self) -> String {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_lowercase)
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// 实时功率读数
///
/// 电压缺失按 0 处理；电流单位已在适配层统一为安培
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPower {
    /// 功率（W）
    pub current_power: f64,
    /// 电压（V）
    pub voltage: f64,
    /// 设备上报电流（A）
    pub current: f64,
    pub power_factor: f64,
}

/// 用电统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RawUsage {
    /// 今日用电量（Wh）
    pub today_energy: f64,
    /// 本月用电量（Wh）
    pub month_energy: f64,
    /// 今日运行时长（分钟）
    pub today_runtime: i64,
    /// 本月运行时长（分钟）
    pub month_runtime: i64,
    /// 节省电量（Wh）
    pub power_saved: f64,
    pub power_protection: bool,
    pub overcurrent_protection: bool,
    pub overheat_protection: bool,
    /// WiFi 信号强度（dBm）
    pub signal_strength: i64,
}
