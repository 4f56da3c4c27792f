use spacemouse_protocol::Model;
use thiserror::Error;

/// Error type for driver construction.
///
/// Device loss at runtime is not an error: it surfaces as a `Disconnected`
/// state transition and the reconnection loop takes over.
#[derive(Debug, Error)]
pub enum Error {
    /// The HID backend could not be initialized.
    #[error("failed to initialize HID backend: {0}")]
    BackendInit(String),
    /// A requested model has no registry entry.
    #[error("unsupported device model: {0}")]
    UnsupportedModel(Model),
    /// Device selection needs at least one model.
    #[error("no device models specified")]
    EmptyModelList,
    /// Path-based selection needs a non-empty path.
    #[error("device path cannot be empty")]
    EmptyDevicePath,
}

/// Convenient result alias for driver operations.
pub type Result<T> = std::result::Result<T, Error>;
