mod backend;
mod claims;
pub mod mock;
mod transport;

pub use crate::backend::{DeviceHandle, HidBackend, READ_TIMEOUT_MS};
pub use crate::claims::ClaimedPaths;
pub use crate::transport::{DeviceInfo, HidDeviceIo, HidTransport, HidapiTransport};
