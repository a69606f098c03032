//! Constant-acceleration trajectory planning.
//!
//! A polyline is planned segment by segment. Each junction gets a maximum
//! entry velocity from the corner rule and from the throttler; the pass
//! then fits a triangle or trapezoid velocity profile to every segment,
//! backing up whenever a segment cannot decelerate to its exit velocity
//! in the distance available.

use crate::plan::{Block, Plan};
use crate::throttler::throttle;
use crate::EPS;
use plotkit_core::Point;

/// Kinematic limits and sampling parameters for planning.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerOptions {
    /// Acceleration magnitude, mm/s².
    pub acceleration: f64,
    /// Ceiling tangential velocity, mm/s.
    pub max_velocity: f64,
    /// Dimensionless corner derating constant.
    pub corner_factor: f64,
    /// Dispatcher sampling period, seconds. Drives the throttler.
    pub timeslice: f64,
    /// Allowed deviation of a sampled straight step from the polyline, mm.
    pub deviation: f64,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            acceleration: 16.0,
            max_velocity: 4.0,
            corner_factor: 0.001,
            timeslice: 0.1,
            deviation: 0.01,
        }
    }
}

/// A planner-internal segment: one polyline edge plus the mutable
/// velocity bounds the pass converges on.
struct Segment {
    p1: Point,
    p2: Point,
    direction: Point,
    length: f64,
    max_entry_velocity: f64,
    entry_velocity: f64,
    blocks: Vec<Block>,
}

impl Segment {
    fn new(p1: Point, p2: Point) -> Self {
        Self {
            p1,
            p2,
            direction: (p2 - p1).normalized(),
            length: p1.distance(&p2),
            max_entry_velocity: f64::INFINITY,
            entry_velocity: 0.0,
            blocks: Vec::new(),
        }
    }

    /// The trailing zero-length sentinel. Its entry bound of zero forces
    /// the final segment to decelerate to a stop.
    fn sentinel(p: Point) -> Self {
        Self {
            max_entry_velocity: 0.0,
            ..Self::new(p, p)
        }
    }
}

/// Maximum velocity through the junction of `s1` into `s2`.
///
/// The guards are load-bearing: a straight reversal must stop and a
/// straight pass-through must not, even though the derating expression is
/// singular at both ends.
fn corner_velocity(s1: &Segment, s2: &Segment, vmax: f64, a: f64, corner_factor: f64) -> f64 {
    let cosine = -s1.direction.dot(&s2.direction);
    if (cosine - 1.0).abs() < EPS {
        return 0.0;
    }
    let sine = ((1.0 - cosine) / 2.0).sqrt();
    if (sine - 1.0).abs() < EPS {
        return vmax;
    }
    let v = (a * corner_factor * sine / (1.0 - sine)).sqrt();
    v.min(vmax)
}

/// Plan a polyline into a time-parameterised sequence of motion blocks.
///
/// Consecutive duplicate vertices are dropped first; a polyline with
/// fewer than two distinct vertices yields a degenerate plan with no
/// blocks and zero total time.
pub fn plan_path(points: &[Point], opts: &PlannerOptions) -> Plan {
    let points = dedup(points);
    if points.len() < 2 {
        let start = points.first().copied().unwrap_or(Point::ZERO);
        return Plan::new(start, Vec::new());
    }

    let a = opts.acceleration;
    let vmax = opts.max_velocity;
    let limits = throttle(&points, vmax, opts.timeslice, opts.deviation);

    let mut segments: Vec<Segment> = points
        .windows(2)
        .map(|w| Segment::new(w[0], w[1]))
        .collect();
    let last = segments.len();
    segments.push(Segment::sentinel(points[points.len() - 1]));

    // Junction ceilings from the corner rule, then the throttler's
    // per-vertex ceiling on every segment entry.
    let corner_caps: Vec<f64> = (1..last)
        .map(|i| corner_velocity(&segments[i - 1], &segments[i], vmax, a, opts.corner_factor))
        .collect();
    for (i, cap) in corner_caps.into_iter().enumerate() {
        segments[i + 1].max_entry_velocity = cap;
    }
    for (i, segment) in segments[..last].iter_mut().enumerate() {
        segment.max_entry_velocity = segment.max_entry_velocity.min(limits[i]);
    }

    let mut i = 0;
    while i < last {
        let s = segments[i].length;
        let vi = segments[i].entry_velocity;
        let vexit = segments[i + 1].max_entry_velocity;
        let (p1, p2) = (segments[i].p1, segments[i].p2);

        // Candidate triangle profile: accelerate to a peak, decelerate
        // to vexit.
        let s1 = (2.0 * a * s + vexit * vexit - vi * vi) / (4.0 * a);
        let s2 = s - s1;

        if s1 < -EPS {
            // Entering too fast to decelerate to vexit within s. Lower
            // this segment's ceiling and revisit the previous segment.
            segments[i].max_entry_velocity = (vexit * vexit + 2.0 * a * s).sqrt();
            i = i.saturating_sub(1);
            continue;
        }

        if s2 < 0.0 {
            // Pure acceleration: vexit is unreachable within s.
            let vf = (vi * vi + 2.0 * a * s).sqrt();
            let t = (vf - vi) / a;
            segments[i].blocks = vec![Block::new(a, t, vi, p1, p2)];
            segments[i + 1].entry_velocity = vf;
            i += 1;
            continue;
        }

        let vpeak = (vi * vi + 2.0 * a * s1).sqrt();
        if vpeak > vmax {
            // Trapezoid: accelerate to vmax, cruise, decelerate to vexit.
            let t1 = (vmax - vi) / a;
            let d1 = 0.5 * (vmax + vi) * t1;
            let t3 = (vmax - vexit) / a;
            let d3 = 0.5 * (vmax + vexit) * t3;
            let d2 = s - d1 - d3;
            let t2 = d2 / vmax;
            let pa = p1.lerp(&p2, d1);
            let pb = p1.lerp(&p2, d1 + d2);
            segments[i].blocks = vec![
                Block::new(a, t1, vi, p1, pa),
                Block::new(0.0, t2, vmax, pa, pb),
                Block::new(-a, t3, vmax, pb, p2),
            ];
        } else {
            // Triangle: accelerate to vpeak, decelerate to vexit.
            let t1 = (vpeak - vi) / a;
            let t2 = (vpeak - vexit) / a;
            let pm = p1.lerp(&p2, s1);
            segments[i].blocks = vec![
                Block::new(a, t1, vi, p1, pm),
                Block::new(-a, t2, vpeak, pm, p2),
            ];
        }
        segments[i + 1].entry_velocity = vexit;
        i += 1;
    }

    let blocks: Vec<Block> = segments
        .iter_mut()
        .flat_map(|segment| std::mem::take(&mut segment.blocks))
        .filter(|block| block.t > EPS)
        .collect();

    tracing::trace!(
        blocks = blocks.len(),
        vertices = points.len(),
        "planned polyline"
    );
    Plan::new(points[0], blocks)
}

fn dedup(points: &[Point]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        let duplicate = out.last().map_or(false, |last| last.distance(&p) < EPS);
        if !duplicate {
            out.push(p);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corner_velocity_guards() {
        let up = Segment::new(Point::new(0.0, 0.0), Point::new(0.0, 10.0));
        let down = Segment::new(Point::new(0.0, 10.0), Point::new(0.0, 0.0));
        let right = Segment::new(Point::new(0.0, 10.0), Point::new(10.0, 10.0));
        let on_up = Segment::new(Point::new(0.0, 10.0), Point::new(0.0, 20.0));

        // straight reversal stops
        assert_eq!(corner_velocity(&up, &down, 4.0, 16.0, 0.001), 0.0);
        // straight pass-through keeps the ceiling
        assert_eq!(corner_velocity(&up, &on_up, 4.0, 16.0, 0.001), 4.0);
        // a right angle derates hard
        let v = corner_velocity(&up, &right, 4.0, 16.0, 0.001);
        assert!(v > 0.0 && v < 0.5, "90 degree corner velocity was {v}");
    }

    #[test]
    fn right_angle_corner_velocity_value() {
        let up = Segment::new(Point::new(0.0, 0.0), Point::new(0.0, 10.0));
        let right = Segment::new(Point::new(0.0, 10.0), Point::new(10.0, 10.0));
        let v = corner_velocity(&up, &right, 4.0, 16.0, 0.001);
        let sine = (0.5f64).sqrt();
        let expected = (16.0 * 0.001 * sine / (1.0 - sine)).sqrt();
        assert!((v - expected).abs() < 1e-9);
        assert!((v - 0.1965).abs() < 1e-3);
    }

    #[test]
    fn duplicate_vertices_are_dropped() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 0.0),
        ];
        let plan = plan_path(&points, &PlannerOptions::default());
        assert!((plan.total_distance() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_polyline_yields_empty_plan() {
        let plan = plan_path(&[Point::new(5.0, 5.0)], &PlannerOptions::default());
        assert!(plan.is_empty());
        assert_eq!(plan.total_time(), 0.0);
        assert_eq!(plan.instant_at(0.0).p, Point::new(5.0, 5.0));

        let empty = plan_path(&[], &PlannerOptions::default());
        assert!(empty.is_empty());
    }
}
