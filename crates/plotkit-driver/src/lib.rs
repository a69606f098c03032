//! # Plotkit Driver
//!
//! The execution layer over the planner and protocol engine:
//!
//! - `dispatcher`: samples motion plans on the configured timeslice and
//!   turns position deltas into timed stepper commands, carrying
//!   fractional step error so long drawings do not drift. Interleaves
//!   pen lifts and travel moves between disjoint paths.
//! - `orchestrator`: owns the device lifecycle - startup configuration,
//!   accepting one drawing at a time, and shutdown.

pub mod dispatcher;
pub mod orchestrator;

pub use dispatcher::{CommandSink, Dispatcher};
pub use orchestrator::{Orchestrator, PlotterState};
