//! # Plotkit DeviceDB
//!
//! Per-model constants for supported plotters: native step resolution,
//! usable travel envelope, pen travel, and speed limits.

pub mod error;
pub mod model;

pub use error::{DeviceError, DeviceResult};
pub use model::PlotterModel;
