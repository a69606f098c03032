//! Geometric velocity throttling.
//!
//! The dispatcher samples a plan on a fixed time grid and drives the
//! carriage in straight steps between samples. A step of length `v * dt`
//! taken from a vertex must stay within a small deviation of the
//! polyline, so curvature that the grid cannot follow caps the velocity
//! at that vertex.

use plotkit_core::Point;

const BISECTION_ITERATIONS: u32 = 16;

/// Compute per-vertex maximum velocities for `points`.
///
/// `vmax` is the ceiling velocity (mm/s), `dt` the sampling period
/// (seconds), and `threshold` the allowed deviation (mm). Every returned
/// value lies in `[0, vmax]`; the final vertex is always `vmax` since no
/// step leaves it.
pub fn throttle(points: &[Point], vmax: f64, dt: f64, threshold: f64) -> Vec<f64> {
    let cumulative = arc_lengths(points);
    (0..points.len())
        .map(|i| max_velocity_at(points, &cumulative, i, vmax, dt, threshold))
        .collect()
}

fn arc_lengths(points: &[Point]) -> Vec<f64> {
    let mut cumulative = Vec::with_capacity(points.len());
    let mut total = 0.0;
    cumulative.push(0.0);
    for w in points.windows(2) {
        total += w[0].distance(&w[1]);
        cumulative.push(total);
    }
    cumulative
}

fn max_velocity_at(
    points: &[Point],
    cumulative: &[f64],
    i: usize,
    vmax: f64,
    dt: f64,
    threshold: f64,
) -> f64 {
    if is_feasible(points, cumulative, i, vmax, dt, threshold) {
        return vmax;
    }
    let mut lo = 0.0;
    let mut hi = vmax;
    let mut best = 0.0;
    for _ in 0..BISECTION_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if is_feasible(points, cumulative, i, mid, dt, threshold) {
            best = mid;
            lo = mid;
        } else {
            hi = mid;
        }
    }
    best
}

/// Can a straight step of length `v * dt` from vertex `i` approximate the
/// polyline within `threshold`?
fn is_feasible(
    points: &[Point],
    cumulative: &[f64],
    i: usize,
    v: f64,
    dt: f64,
    threshold: f64,
) -> bool {
    let n = points.len();
    let x1 = cumulative[i] + v * dt;

    // Largest j with cumulative[j] <= x1.
    let j = cumulative
        .partition_point(|&c| c <= x1)
        .saturating_sub(1)
        .min(n - 1);
    if j <= i {
        return true;
    }

    // Endpoint of the straight step, interpolated at arc position x1.
    // Past the final vertex, the last segment's direction is reused.
    let p_end = if j >= n - 1 {
        points[n - 2].lerp(&points[n - 1], x1 - cumulative[n - 2])
    } else {
        points[j].lerp(&points[j + 1], x1 - cumulative[j])
    };

    let start = points[i];
    points[i + 1..=j]
        .iter()
        .all(|p| p.distance_to_segment(&start, &p_end) <= threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VMAX: f64 = 4.0;
    const DT: f64 = 0.1;
    const THRESHOLD: f64 = 0.01;

    fn right_angle() -> Vec<Point> {
        // Dense samples along two legs of a right angle.
        let mut points = Vec::new();
        for i in 0..=20 {
            points.push(Point::new(0.0, i as f64 * 0.05));
        }
        for i in 1..=20 {
            points.push(Point::new(i as f64 * 0.05, 1.0));
        }
        points
    }

    #[test]
    fn straight_line_is_never_throttled() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(10.0, 0.0),
        ];
        for v in throttle(&points, VMAX, DT, THRESHOLD) {
            assert_eq!(v, VMAX);
        }
    }

    #[test]
    fn velocities_stay_within_bounds() {
        for v in throttle(&right_angle(), VMAX, DT, THRESHOLD) {
            assert!((0.0..=VMAX).contains(&v));
        }
    }

    #[test]
    fn corner_is_throttled() {
        let points = right_angle();
        let velocities = throttle(&points, VMAX, DT, THRESHOLD);
        // Vertices approaching the corner cannot take a full-speed step.
        let corner = points.len() / 2;
        assert!(velocities[corner - 1] < VMAX);
        // The final vertex is always defined and unthrottled.
        assert_eq!(*velocities.last().unwrap(), VMAX);
    }

    #[test]
    fn throttled_velocity_is_maximal() {
        let points = right_angle();
        let cumulative = super::arc_lengths(&points);
        let velocities = throttle(&points, VMAX, DT, THRESHOLD);
        for (i, &v) in velocities.iter().enumerate() {
            assert!(is_feasible(&points, &cumulative, i, v, DT, THRESHOLD));
            if v < VMAX {
                // A slightly higher velocity must fail.
                let bumped = v + VMAX / 1000.0;
                assert!(
                    !is_feasible(&points, &cumulative, i, bumped, DT, THRESHOLD),
                    "vertex {i}: {v} was not maximal"
                );
            }
        }
    }
}
