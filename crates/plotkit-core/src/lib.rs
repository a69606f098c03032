//! # Plotkit Core
//!
//! Core types for Plotkit: plane geometry in millimetre coordinates
//! (points, polyline paths, drawings) and the error types shared by the
//! planner, communication, and driver layers.

pub mod error;
pub mod geometry;

pub use error::{ConfigError, ConnectionError, DriverError, Error, ProtocolError, Result};
pub use geometry::{simplify, Drawing, Path, Point};
