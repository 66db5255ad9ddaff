pub mod error;
pub mod line;
pub mod model;
pub mod store;

pub use error::{Result, StoreError};
pub use line::to_line_protocol;
pub use model::{DataPoint, FieldValue};
pub use store::{InfluxConfig, InfluxStore, TimeSeriesSink};
