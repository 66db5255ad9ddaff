//! 功率遥测对账引擎
//!
//! 每个轮询周期读取设备原始读数，归一化后推进设备账本（梯形积分累计能耗与电费），
//! 再把快照写入指标汇与时序汇。

pub mod cost;
pub mod emit;
pub mod error;
pub mod exporter;
pub mod ledger;
pub mod normalize;
pub mod reconcile;
pub mod snapshot;
pub mod state;

pub use cost::CostCalculator;
pub use emit::{EmitReport, Emitter, MEASUREMENT};
pub use error::{ErrorKind, ExporterError, ReconcileError, Result};
pub use exporter::{TapoExporter, TickReport};
pub use ledger::{DeviceLedger, LedgerBook};
pub use normalize::{infer_voltage, normalize_power, normalize_usage, NormalizedPower};
pub use reconcile::Reconciler;
pub use snapshot::{MetricSnapshot, UsageMetrics};
pub use state::DeviceState;
