pub mod collector;
pub mod server;
pub mod sink;

pub use collector::{TapoMetrics, SNAPSHOT_GAUGES};
pub use server::{bind, router, serve};
pub use sink::{DeviceLabels, MetricSink, SinkError};
