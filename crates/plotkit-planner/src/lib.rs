//! # Plotkit Planner
//!
//! Converts polylines into time-parameterised motion plans. Three layers:
//!
//! 1. **Throttler** - per-vertex velocity ceilings so that straight
//!    steps sampled on the dispatcher's time grid stay within a small
//!    deviation of the polyline.
//! 2. **Planner** - a forward-backward pass over the polyline's segments
//!    producing constant-acceleration blocks (triangle or trapezoid
//!    profiles) with corner-velocity derating at junctions.
//! 3. **Plan** - the immutable result, indexable by time.

pub mod plan;
pub mod planner;
pub mod throttler;

pub use plan::{Block, Instant, Plan};
pub use planner::{plan_path, PlannerOptions};
pub use throttler::throttle;

/// Length and block-duration comparison tolerance.
pub(crate) const EPS: f64 = 1e-9;
