//! The immutable plan model: constant-acceleration blocks and the
//! time-indexed evaluator over them.

use plotkit_core::Point;
use serde::{Deserialize, Serialize};

/// A constant-acceleration motion element.
///
/// Moves from `p1` to `p2` in `t` seconds, entering at `vi` mm/s under
/// signed acceleration `a` mm/s². A block with `a == 0` is a cruise.
/// The straight-line distance `p1` to `p2` equals the arc length implied
/// by `vi`, `a`, `t` within numeric tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Signed acceleration, mm/s².
    pub a: f64,
    /// Duration, seconds.
    pub t: f64,
    /// Initial velocity, mm/s.
    pub vi: f64,
    /// Start point.
    pub p1: Point,
    /// End point.
    pub p2: Point,
}

impl Block {
    pub fn new(a: f64, t: f64, vi: f64, p1: Point, p2: Point) -> Self {
        Self { a, t, vi, p1, p2 }
    }

    /// Arc length covered by the block.
    pub fn distance(&self) -> f64 {
        self.vi * self.t + 0.5 * self.a * self.t * self.t
    }

    /// Velocity at the end of the block.
    pub fn exit_velocity(&self) -> f64 {
        self.vi + self.a * self.t
    }

    /// Evaluate the block `t_local` seconds after its start. `t0` and
    /// `s0` are the cumulative time and distance at the block boundary.
    fn instant_at(&self, t_local: f64, t0: f64, s0: f64) -> Instant {
        let t_local = t_local.clamp(0.0, self.t);
        let v = self.vi + self.a * t_local;
        let s_local =
            (self.vi * t_local + 0.5 * self.a * t_local * t_local).clamp(0.0, self.distance());
        Instant {
            t: t0 + t_local,
            p: self.p1.lerp(&self.p2, s_local),
            s: s0 + s_local,
            v,
            a: self.a,
        }
    }
}

/// A time-parameterised sample of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Instant {
    /// Time since the start of the plan, seconds.
    pub t: f64,
    /// Position, mm.
    pub p: Point,
    /// Cumulative distance travelled, mm.
    pub s: f64,
    /// Tangential velocity, mm/s.
    pub v: f64,
    /// Tangential acceleration, mm/s².
    pub a: f64,
}

/// The immutable output of the planner: a sequence of blocks with
/// prefix-sum indexes over time and distance for `instant_at` lookup.
///
/// A degenerate plan (zero-length input) has no blocks, zero total time,
/// and evaluates to its start point at every `t`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    blocks: Vec<Block>,
    /// Cumulative start time of each block, plus the total; len = blocks + 1.
    times: Vec<f64>,
    /// Cumulative start distance of each block, plus the total.
    distances: Vec<f64>,
    start: Point,
}

impl Plan {
    pub fn new(start: Point, blocks: Vec<Block>) -> Self {
        let mut times = Vec::with_capacity(blocks.len() + 1);
        let mut distances = Vec::with_capacity(blocks.len() + 1);
        let mut t = 0.0;
        let mut s = 0.0;
        for block in &blocks {
            times.push(t);
            distances.push(s);
            t += block.t;
            s += block.distance();
        }
        times.push(t);
        distances.push(s);
        Self {
            blocks,
            times,
            distances,
            start,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn total_time(&self) -> f64 {
        *self.times.last().unwrap_or(&0.0)
    }

    pub fn total_distance(&self) -> f64 {
        *self.distances.last().unwrap_or(&0.0)
    }

    /// Sample the plan at time `t`, clamped to `[0, total_time]`.
    pub fn instant_at(&self, t: f64) -> Instant {
        if self.blocks.is_empty() {
            return Instant {
                t: 0.0,
                p: self.start,
                s: 0.0,
                v: 0.0,
                a: 0.0,
            };
        }
        let t = t.clamp(0.0, self.total_time());
        // Owning block: the last whose start time is <= t.
        let idx = self
            .times
            .partition_point(|&bt| bt <= t)
            .saturating_sub(1)
            .min(self.blocks.len() - 1);
        self.blocks[idx].instant_at(t - self.times[idx], self.times[idx], self.distances[idx])
    }
}
