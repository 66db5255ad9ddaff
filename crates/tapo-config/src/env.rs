//! 从环境变量读取设备列表
//!
//! 支持两种格式：
//! - 共享账号：`TAPO_USERNAME` / `TAPO_PASSWORD` / `TAPO_DEVICES=ip1,ip2`
//! - 逐个编号：`TAPO_DEVICE_COUNT=N` 与 `TAPO_DEVICE_{i}_NAME|IP|EMAIL|PASSWORD|TYPE`

use crate::error::{ConfigError, Result};
use crate::settings::DeviceConfig;
use std::collections::HashMap;
use tapo_types::DeviceModel;
use tracing::{debug, info, warn};

/// 解析环境变量中的设备；两种格式都未设置时返回 `None`
pub fn devices_from_env(env: &HashMap<String, String>) -> Result<Option<Vec<DeviceConfig>>> {
    if let Some(devices) = shared_account_devices(env) {
        debug!("Using shared account device format");
        return Ok(Some(devices));
    }

    let Some(count) = non_empty(env, "TAPO_DEVICE_COUNT") else {
        return Ok(None);
    };

    debug!("Using indexed device format");
    let count: usize = count.trim().parse().map_err(|_| {
        ConfigError::invalid(format!("invalid TAPO_DEVICE_COUNT value: {}", count))
    })?;

    let mut devices = Vec::with_capacity(count);
    for i in 1..=count {
        if let Some(device) = indexed_device(env, i) {
            devices.push(device);
        }
    }
    Ok(Some(devices))
}

fn shared_account_devices(env: &HashMap<String, String>) -> Option<Vec<DeviceConfig>> {
    let username = non_empty(env, "TAPO_USERNAME")?;
    let password = non_empty(env, "TAPO_PASSWORD")?;
    let addresses = non_empty(env, "TAPO_DEVICES")?;

    let devices = addresses
        .split(',')
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(|ip| {
            info!(address = %ip, "Added P110 device");
            DeviceConfig {
                name: format!("tapo_{}", ip.replace('.', "_")),
                ip: ip.to_string(),
                email: username.to_string(),
                password: password.to_string(),
                device_type: DeviceModel::P110,
            }
        })
        .collect();
    Some(devices)
}

fn indexed_device(env: &HashMap<String, String>, i: usize) -> Option<DeviceConfig> {
    let var = |field: &str| non_empty(env, &format!("TAPO_DEVICE_{}_{}", i, field));

    let (Some(name), Some(ip), Some(email), Some(password)) =
        (var("NAME"), var("IP"), var("EMAIL"), var("PASSWORD"))
    else {
        warn!(index = i, "Missing configuration for device, skipping");
        return None;
    };

    let raw_type = var("TYPE").unwrap_or("p110");
    let device_type = raw_type.parse::<DeviceModel>().unwrap_or_else(|e| {
        warn!(
            index = i,
            error = %e,
            "Invalid device type, using P110"
        );
        DeviceModel::P110
    });

    info!(device = %name, address = %ip, model = %device_type, "Added device");
    Some(DeviceConfig {
        name: name.to_string(),
        ip: ip.to_string(),
        email: email.to_string(),
        password: password.to_string(),
        device_type,
    })
}

fn non_empty<'a>(env: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env.get(key).map(String::as_str).filter(|v| !v.trim().is_empty())
}
