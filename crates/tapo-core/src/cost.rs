/// 电费计算
///
/// 电价在启动时加载，进程生命周期内不变
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostCalculator {
    cost_per_kwh: f64,
}

impl CostCalculator {
    /// 默认电价（每千瓦时）
    pub const DEFAULT_COST_PER_KWH: f64 = 0.12;

    pub fn new(cost_per_kwh: f64) -> Self {
        Self { cost_per_kwh }
    }

    pub fn cost_per_kwh(&self) -> f64 {
        self.cost_per_kwh
    }

    /// 把瓦时换算为费用；输入由调用方先取绝对值
    pub fn calculate_cost(&self, energy_wh: f64) -> f64 {
        (energy_wh / 1000.0) * self.cost_per_kwh
    }
}

impl Default for CostCalculator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_COST_PER_KWH)
    }
}
