use tapo_types::RawInfo;

const UNKNOWN: &str = "unknown";

/// 依赖用电统计的指标；统计缺失时整体省略
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageMetrics {
    pub today_energy_wh: f64,
    pub month_energy_wh: f64,
    pub today_runtime_minutes: i64,
    pub month_runtime_minutes: i64,
    pub power_saved_wh: f64,
    pub today_cost_usd: f64,
    pub month_cost_usd: f64,
    pub power_protection_status: bool,
    pub overcurrent_status: bool,
    pub overheat_status: bool,
    pub signal_strength: i64,
}

/// 一次对账产生的设备指标
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSnapshot {
    pub device_name: String,
    pub device_type: String,

    /// 设备信息，用于时序标签
    pub info: RawInfo,

    pub power_watts: f64,
    pub voltage_volts: f64,
    pub current_amps: f64,
    pub calculated_current_amps: f64,
    pub power_factor: f64,
    pub signal_level: i64,
    pub accumulated_energy_wh: f64,
    pub accumulated_cost_usd: f64,

    pub usage: Option<UsageMetrics>,
}

impl MetricSnapshot {
    /// 展平为 指标名 -> 数值，顺序固定
    pub fn fields(&self) -> Vec<(&'static str, f64)> {
        let mut fields = vec![
            ("power_watts", self.power_watts),
            ("voltage_volts", self.voltage_volts),
            ("current_amps", self.current_amps),
            ("calculated_current_amps", self.calculated_current_amps),
            ("power_factor", self.power_factor),
        ];

        if let Some(usage) = &self.usage {
            fields.extend([
                ("today_energy_wh", usage.today_energy_wh),
                ("month_energy_wh", usage.month_energy_wh),
                ("today_runtime_minutes", usage.today_runtime_minutes as f64),
                ("month_runtime_minutes", usage.month_runtime_minutes as f64),
                ("power_saved_wh", usage.power_saved_wh),
            ]);
        }

        fields.extend([
            ("accumulated_energy_wh", self.accumulated_energy_wh),
            ("accumulated_cost_usd", self.accumulated_cost_usd),
        ]);

        if let Some(usage) = &self.usage {
            fields.extend([
                ("today_cost_usd", usage.today_cost_usd),
                ("month_cost_usd", usage.month_cost_usd),
                ("power_protection_status", flag(usage.power_protection_status)),
                ("overcurrent_status", flag(usage.overcurrent_status)),
                ("overheat_status", flag(usage.overheat_status)),
                ("signal_strength", usage.signal_strength as f64),
            ]);
        }

        fields.push(("signal_level", self.signal_level as f64));
        fields
    }

    /// 按名称取值
    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields()
            .into_iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    /// 时序数据标签，缺失值记为 `unknown`
    pub fn tags(&self) -> Vec<(&'static str, String)> {
        let or_unknown = |value: &Option<String>| {
            value.clone().unwrap_or_else(|| UNKNOWN.to_string())
        };

        vec![
            ("device_name", self.device_name.clone()),
            ("device_type", self.device_type.clone()),
            ("fw_version", or_unknown(&self.info.fw_ver)),
            ("hw_version", or_unknown(&self.info.hw_ver)),
            ("device_id", or_unknown(&self.info.device_id)),
            ("mac", or_unknown(&self.info.mac)),
            ("ip", or_unknown(&self.info.ip)),
            ("ssid", or_unknown(&self.info.ssid)),
        ]
    }
}

fn flag(on: bool) -> f64 {
    if on {
        1.0
    } else {
        0.0
    }
}
