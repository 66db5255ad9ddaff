use crate::Result;
use async_trait::async_trait;
use tapo_types::{DeviceIdentity, RawInfo, RawPower, RawUsage};

/// 设备门面接口
///
/// 读取接口返回 `Ok(None)` 表示设备响应为空，`Err` 表示传输失败
#[async_trait]
pub trait TapoClient: Send + Sync {
    /// 设备身份
    fn identity(&self) -> &DeviceIdentity;

    /// 是否已连接
    fn is_connected(&self) -> bool;

    /// 连接设备
    async fn connect(&mut self) -> Result<()>;

    /// 丢弃当前会话，下次轮询时重连
    fn disconnect(&mut self);

    /// 获取设备信息
    async fn get_device_info(&self) -> Result<Option<RawInfo>>;

    /// 获取实时功率
    async fn get_current_power(&self) -> Result<Option<RawPower>>;

    /// 获取用电统计
    async fn get_device_usage(&self) -> Result<Option<RawUsage>>;
}
