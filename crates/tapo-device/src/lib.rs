pub mod adapter;
pub mod bridge;
pub mod client;
pub mod error;
pub mod p110;
pub mod transport;

pub use bridge::HttpBridgeTransport;
pub use client::TapoClient;
pub use error::{DeviceError, Result};
pub use p110::{ConnectPhase, P110Device};
pub use transport::{DeviceTarget, TapoMethod, TapoTransport};
