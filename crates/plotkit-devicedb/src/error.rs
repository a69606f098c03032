use thiserror::Error;

/// Device database errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    /// The requested model id is not in the registry
    #[error("Unknown device model '{id}'")]
    UnknownModel {
        /// The requested model id.
        id: String,
    },

    /// Microstepping mode outside the supported range
    #[error("Microstepping mode {mode} out of range (expected 1..=5)")]
    InvalidMicrostepping {
        /// The requested mode.
        mode: u8,
    },
}

/// Result type for device database operations.
pub type DeviceResult<T> = std::result::Result<T, DeviceError>;
