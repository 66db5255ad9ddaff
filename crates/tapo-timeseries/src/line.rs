//! InfluxDB 行协议编码
//!
//! `measurement,tag=v field=1.5,count=3i 1700000000000000000`

use crate::error::{Result, StoreError};
use crate::model::{DataPoint, FieldValue};

/// 把数据点编码为一行行协议
///
/// 空标签值被丢弃；非有限浮点字段被丢弃；没有剩余字段时报错
pub fn to_line_protocol(point: &DataPoint) -> Result<String> {
    if point.measurement.is_empty() {
        return Err(StoreError::InvalidPoint("empty measurement".to_string()));
    }

    let mut line = escape(&point.measurement, &[',', ' ']);

    for (key, value) in &point.tags {
        if value.is_empty() {
            continue;
        }
        line.push(',');
        line.push_str(&escape(key, &[',', '=', ' ']));
        line.push('=');
        line.push_str(&escape(value, &[',', '=', ' ']));
    }

    let fields: Vec<String> = point
        .fields
        .iter()
        .filter_map(|(key, value)| {
            encode_field(value).map(|v| format!("{}={}", escape(key, &[',', '=', ' ']), v))
        })
        .collect();

    if fields.is_empty() {
        return Err(StoreError::InvalidPoint(format!(
            "point '{}' has no fields",
            point.measurement
        )));
    }

    let timestamp = point.timestamp.timestamp_nanos_opt().ok_or_else(|| {
        StoreError::InvalidPoint(format!("timestamp out of range: {}", point.timestamp))
    })?;

    line.push(' ');
    line.push_str(&fields.join(","));
    line.push(' ');
    line.push_str(&timestamp.to_string());
    Ok(line)
}

fn encode_field(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Float(v) if v.is_finite() => Some(v.to_string()),
        FieldValue::Float(_) => None,
        FieldValue::Integer(v) => Some(format!("{}i", v)),
        FieldValue::Bool(v) => Some(v.to_string()),
        FieldValue::Text(v) => Some(format!(
            "\"{}\"",
            v.replace('\\', "\\\\").replace('"', "\\\"")
        )),
    }
}

fn escape(raw: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
