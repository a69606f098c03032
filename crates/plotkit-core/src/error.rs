//! Error handling for Plotkit
//!
//! Provides error types for all layers of the driver:
//! - Configuration errors (invalid or unknown options)
//! - Connection errors (port discovery, open, I/O)
//! - Protocol errors (command validation, engine lifecycle)
//! - Driver errors (dispatch and orchestration)
//!
//! All error types use `thiserror`. Inter-component failures that are part
//! of normal operation (query timeouts, rejected commands) travel as values
//! on message channels, not as these errors.

use thiserror::Error;

/// Configuration error type
///
/// Invalid options are fatal at startup; the orchestrator refuses to start.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    /// A servo position is outside the percent range
    #[error("Pen position {value} out of range for '{option}' (expected 0..=100)")]
    PositionOutOfRange {
        /// The offending option name.
        option: &'static str,
        /// The configured value.
        value: i32,
    },

    /// A pen transition speed is negative
    #[error("Negative speed {value} for '{option}'")]
    NegativeSpeed {
        /// The offending option name.
        option: &'static str,
        /// The configured value.
        value: i32,
    },

    /// Microstepping mode outside 1..=5
    #[error("Microstepping mode {mode} out of range (expected 1..=5)")]
    InvalidMicrostepping {
        /// The configured mode.
        mode: u8,
    },

    /// Dispatcher timeslice must be at least one millisecond
    #[error("Timeslice of {timeslice_ms}ms is too short")]
    InvalidTimeslice {
        /// The configured timeslice in milliseconds.
        timeslice_ms: u64,
    },

    /// A kinematic limit must be strictly positive
    #[error("'{option}' must be positive, got {value}")]
    NonPositiveLimit {
        /// The offending option name.
        option: &'static str,
        /// The configured value.
        value: f64,
    },

    /// The configured device model id is not in the registry
    #[error("Unknown device model '{id}'")]
    UnknownModel {
        /// The configured model id.
        id: String,
    },

    /// Configuration file could not be read or parsed
    #[error("Configuration file error: {reason}")]
    FileError {
        /// The reason the file could not be used.
        reason: String,
    },
}

/// Connection error type
///
/// Errors talking to the serial device. Fatal at startup; at runtime the
/// affected requests fail individually and are logged.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// No plotter found during port discovery
    #[error("No plotter device found")]
    NoDeviceFound,

    /// Failed to open the serial port
    #[error("Failed to open port {port}: {reason}")]
    FailedToOpen {
        /// The name of the port that failed to open.
        port: String,
        /// The reason the port failed to open.
        reason: String,
    },

    /// Port enumeration failed
    #[error("Failed to enumerate serial ports: {reason}")]
    EnumerationFailed {
        /// The underlying enumeration failure.
        reason: String,
    },

    /// I/O error on an open port
    #[error("I/O error on {port}: {source}")]
    Io {
        /// The port the error occurred on.
        port: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Protocol error type
///
/// Command-level failures. A rejected command leaves the engine healthy.
#[derive(Error, Debug, Clone)]
pub enum ProtocolError {
    /// Command exceeds the wire length limit
    #[error("Command too long: {len} bytes (limit 64)")]
    TooLong {
        /// Encoded length including the trailing CR.
        len: usize,
    },

    /// Command contains a byte outside printable ASCII
    #[error("Command contains non-ASCII-printable byte 0x{byte:02X}")]
    NonPrintable {
        /// The offending byte.
        byte: u8,
    },

    /// A command parameter is outside its documented range
    #[error("{command}: {field} = {value} out of range")]
    ParameterOutOfRange {
        /// The command mnemonic.
        command: &'static str,
        /// The parameter name.
        field: &'static str,
        /// The offending value.
        value: i64,
    },

    /// A stepper move resolves to an unreachable per-motor step rate
    #[error("XM: motor {axis} rate {rate:.2} steps/s outside 1.31..=25000")]
    StepRateOutOfRange {
        /// The resolved motor axis (1 or 2).
        axis: u8,
        /// The resolved step rate in steps per second.
        rate: f64,
    },

    /// The engine task has stopped and can no longer accept requests
    #[error("Protocol engine stopped")]
    EngineStopped,
}

/// Driver error type
///
/// Dispatch and orchestration failures.
#[derive(Error, Debug, Clone)]
pub enum DriverError {
    /// A drawing was submitted while another is in progress
    #[error("Plotter is busy; drawing rejected")]
    Busy,

    /// The background dispatch task failed
    #[error("Dispatch failed: {reason}")]
    DispatchFailed {
        /// The reason dispatch failed.
        reason: String,
    },
}

/// Main error type for Plotkit
///
/// A unified error type for the public APIs of every crate in the
/// workspace.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Connection error
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Protocol error
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Driver error
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Check if this is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
