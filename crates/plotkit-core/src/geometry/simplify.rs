//! Polyline simplification using the Ramer-Douglas-Peucker algorithm.

use super::Point;

/// Simplify a polyline, removing every vertex that lies within
/// `tolerance` of the polyline through the retained vertices.
///
/// Endpoints are always kept. The operation is idempotent: simplifying an
/// already-simplified polyline with the same tolerance returns it
/// unchanged.
pub fn simplify(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let tolerance = tolerance.max(0.0);
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    rdp_mark(points, tolerance, 0, points.len() - 1, &mut keep);

    points
        .iter()
        .zip(keep.iter())
        .filter(|(_, &k)| k)
        .map(|(p, _)| *p)
        .collect()
}

fn rdp_mark(points: &[Point], tolerance: f64, start: usize, end: usize, keep: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_distance = -1.0;
    let mut max_idx = start;
    for i in start + 1..end {
        let d = points[i].distance_to_segment(&points[start], &points[end]);
        if d > max_distance {
            max_distance = d;
            max_idx = i;
        }
    }

    if max_distance > tolerance {
        keep[max_idx] = true;
        rdp_mark(points, tolerance, start, max_idx, keep);
        rdp_mark(points, tolerance, max_idx, end, keep);
    }
}
