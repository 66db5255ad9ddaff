//! 厂商响应适配
//!
//! 厂商 SDK 的返回值字段类型不固定（整数、浮点、数字字符串或缺失），
//! 单位也因固件而异。这里统一转换为 `RawInfo` / `RawPower` / `RawUsage`，
//! 对账引擎只看到一种形状。

use crate::{DeviceError, Result, TapoMethod};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Value};
use tapo_types::{RawInfo, RawPower, RawUsage};

/// 解开 `{"error_code": 0, "result": {...}}` 响应信封
pub fn unwrap_envelope(method: TapoMethod, value: Value) -> Result<Value> {
    match value {
        Value::Object(mut obj) if obj.contains_key("error_code") => {
            let code = obj.get("error_code").and_then(Value::as_i64).unwrap_or(0);
            if code != 0 {
                return Err(DeviceError::request(
                    method.as_str(),
                    format!("device returned error_code {}", code),
                ));
            }
            Ok(obj.remove("result").unwrap_or(Value::Null))
        }
        other => Ok(other),
    }
}

/// 解析设备信息，空响应返回 `None`
pub fn parse_info(value: &Value) -> Option<RawInfo> {
    let obj = non_empty_object(value)?;

    Some(RawInfo {
        model: text(obj, "model"),
        fw_ver: text(obj, "fw_ver"),
        hw_ver: text(obj, "hw_ver"),
        device_id: text(obj, "device_id"),
        mac: text(obj, "mac"),
        ip: text(obj, "ip"),
        ssid: text(obj, "ssid").map(decode_vendor_text),
        nickname: text(obj, "nickname").map(decode_vendor_text),
        signal_level: integer(obj, "signal_level"),
    })
}

/// 解析实时功率，缺少功率字段视为空响应
pub fn parse_power(value: &Value) -> Option<RawPower> {
    let obj = non_empty_object(value)?;
    let current_power = scaled(obj, &[("current_power", 1.0), ("power_mw", 1000.0)])?;

    Some(RawPower {
        current_power,
        voltage: scaled(obj, &[("voltage", 1.0), ("voltage_mv", 1000.0)]).unwrap_or(0.0),
        current: scaled(obj, &[("current", 1.0), ("current_ma", 1000.0)]).unwrap_or(0.0),
        power_factor: number(obj, "power_factor").unwrap_or(0.0),
    })
}

/// 解析用电统计
///
/// 同时接受扁平字段（`today_energy`）与分周期对象（`power_usage.today`）
pub fn parse_usage(value: &Value) -> Option<RawUsage> {
    let obj = non_empty_object(value)?;

    let today_energy = number(obj, "today_energy")
        .or_else(|| nested_number(obj, "power_usage", "today"))
        .unwrap_or(0.0);
    let month_energy = number(obj, "month_energy")
        .or_else(|| nested_number(obj, "power_usage", "past30"))
        .unwrap_or(0.0);
    let today_runtime = integer(obj, "today_runtime")
        .or_else(|| nested_number(obj, "time_usage", "today").map(|v| v as i64))
        .unwrap_or(0);
    let month_runtime = integer(obj, "month_runtime")
        .or_else(|| nested_number(obj, "time_usage", "past30").map(|v| v as i64))
        .unwrap_or(0);
    let power_saved = number(obj, "power_saved")
        .or_else(|| nested_number(obj, "saved_power", "today"))
        .unwrap_or(0.0);

    Some(RawUsage {
        today_energy,
        month_energy,
        today_runtime,
        month_runtime,
        power_saved,
        power_protection: flag(obj, "power_protection")
            .or_else(|| flag(obj, "power_protection_status"))
            .unwrap_or(false),
        overcurrent_protection: flag(obj, "overcurrent_protection")
            .or_else(|| flag(obj, "overcurrent_status"))
            .unwrap_or(false),
        overheat_protection: flag(obj, "overheat_protection")
            .or_else(|| flag(obj, "overheat_status"))
            .unwrap_or(false),
        signal_strength: integer(obj, "signal_strength")
            .or_else(|| integer(obj, "rssi"))
            .unwrap_or(0),
    })
}

fn non_empty_object(value: &Value) -> Option<&Map<String, Value>> {
    value.as_object().filter(|obj| !obj.is_empty())
}

fn number(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    let value = match obj.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    value.is_finite().then_some(value)
}

fn integer(obj: &Map<String, Value>, key: &str) -> Option<i64> {
    number(obj, key).map(|v| v as i64)
}

fn nested_number(obj: &Map<String, Value>, outer: &str, key: &str) -> Option<f64> {
    obj.get(outer).and_then(Value::as_object).and_then(|inner| number(inner, key))
}

/// 按候选字段顺序取值，并换算到基本单位（如 mW -> W）
fn scaled(obj: &Map<String, Value>, candidates: &[(&str, f64)]) -> Option<f64> {
    candidates
        .iter()
        .find_map(|(key, divisor)| number(obj, key).map(|v| v / divisor))
}

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn flag(obj: &Map<String, Value>, key: &str) -> Option<bool> {
    match obj.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "" | "normal" | "false" | "off" | "0" | "none" => Some(false),
            _ => Some(true),
        },
        _ => None,
    }
}

/// 昵称、SSID 由设备以 base64 上报；无法解码时保留原文
fn decode_vendor_text(raw: String) -> String {
    match STANDARD.decode(raw.as_bytes()) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(decoded) if !decoded.is_empty() && !decoded.chars().any(char::is_control) => decoded,
            _ => raw,
        },
        Err(_) => raw,
    }
}
