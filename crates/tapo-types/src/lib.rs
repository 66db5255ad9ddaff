pub mod device;
pub mod reading;

pub use device::{Credentials, DeviceIdentity, DeviceModel, UnknownModel};
pub use reading::{RawInfo, RawPower, RawUsage};
