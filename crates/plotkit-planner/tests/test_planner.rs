//! Scenario tests for the trajectory planner: profile shapes, continuity,
//! kinematic bounds, and endpoint fidelity.

use plotkit_core::Point;
use plotkit_planner::{plan_path, Plan, PlannerOptions};

const VEL_TOL: f64 = 1e-6;

fn defaults() -> PlannerOptions {
    PlannerOptions::default()
}

fn square() -> Vec<Point> {
    vec![
        Point::new(0.0, 0.0),
        Point::new(0.0, 10.0),
        Point::new(10.0, 10.0),
        Point::new(10.0, 0.0),
        Point::new(0.0, 0.0),
    ]
}

fn assert_continuous(plan: &Plan) {
    for w in plan.blocks().windows(2) {
        let exit = w[0].vi + w[0].a * w[0].t;
        assert!(
            (exit - w[1].vi).abs() < VEL_TOL,
            "velocity discontinuity: {exit} then {}",
            w[1].vi
        );
    }
}

fn assert_bounded(plan: &Plan, vmax: f64) {
    for block in plan.blocks() {
        for &t in &[0.0, 0.5 * block.t, block.t] {
            let v = block.vi + block.a * t;
            assert!(
                (-VEL_TOL..=vmax + VEL_TOL).contains(&v),
                "velocity {v} outside [0, {vmax}]"
            );
        }
    }
}

#[test]
fn square_at_defaults() {
    let opts = defaults();
    let plan = plan_path(&square(), &opts);

    assert!((plan.total_distance() - 40.0).abs() < 1e-6);
    // Each 10 mm edge is long enough to reach vmax: accel, cruise, decel.
    assert!(plan.blocks().len() >= 12, "got {}", plan.blocks().len());

    assert_continuous(&plan);
    assert_bounded(&plan, opts.max_velocity);

    // 90 degree corners derate to sqrt(a*cf*sin(45)/(1-sin(45))).
    let sine = (0.5f64).sqrt();
    let corner = (opts.acceleration * opts.corner_factor * sine / (1.0 - sine)).sqrt();
    assert!((corner - 0.196).abs() < 1e-3);
    let hits = plan
        .blocks()
        .windows(2)
        .filter(|w| {
            let boundary = w[0].vi + w[0].a * w[0].t;
            (boundary - corner).abs() < 1e-6
        })
        .count();
    assert_eq!(hits, 3, "expected each interior corner to hit {corner}");

    // Endpoints.
    let start = plan.instant_at(0.0);
    let end = plan.instant_at(plan.total_time());
    assert!(start.p.distance(&Point::new(0.0, 0.0)) < 1e-9);
    assert!(end.p.distance(&Point::new(0.0, 0.0)) < 1e-6);
    assert!(end.v.abs() < VEL_TOL);
}

#[test]
fn short_line_is_a_triangle() {
    // 0.5 mm is too short to reach vmax from rest: accel then decel.
    let opts = defaults();
    let points = vec![Point::new(0.0, 0.0), Point::new(0.5, 0.0)];
    let plan = plan_path(&points, &opts);

    assert_eq!(plan.blocks().len(), 2);
    let vpeak = (2.0 * opts.acceleration * 0.25).sqrt();
    assert!(vpeak < opts.max_velocity);

    let mid = plan.instant_at(plan.total_time() / 2.0);
    assert!((mid.v - vpeak).abs() < 1e-6);

    assert_continuous(&plan);
    assert_bounded(&plan, opts.max_velocity);
    assert!((plan.total_distance() - 0.5).abs() < 1e-6);
}

#[test]
fn long_line_is_a_trapezoid() {
    let opts = defaults();
    let points = vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)];
    let plan = plan_path(&points, &opts);

    assert_eq!(plan.blocks().len(), 3);
    let cruise = &plan.blocks()[1];
    assert_eq!(cruise.a, 0.0);
    assert!((cruise.vi - opts.max_velocity).abs() < VEL_TOL);

    assert_continuous(&plan);
    assert!((plan.total_distance() - 200.0f64.sqrt()).abs() < 1e-6);
}

#[test]
fn backward_propagation_limits_entry() {
    // A 0.4 mm edge into a full reversal. The reversal pins the edge's
    // exit to zero, the edge is too short to shed full speed, so the
    // planner must back up and slow the long approach.
    let opts = defaults();
    let points = vec![
        Point::new(0.0, 0.0),
        Point::new(10.0, 0.0),
        Point::new(10.4, 0.0),
        Point::new(0.0, 0.0),
    ];
    let plan = plan_path(&points, &opts);

    assert_continuous(&plan);
    assert_bounded(&plan, opts.max_velocity);

    // Entry into the short edge can be at most sqrt(2*a*s).
    let cap = (2.0 * opts.acceleration * 0.4).sqrt();
    assert!(cap < opts.max_velocity);
    let mut entered = false;
    for w in plan.blocks().windows(2) {
        let boundary = w[0].vi + w[0].a * w[0].t;
        if w[1].p1.distance(&Point::new(10.0, 0.0)) < 1e-9 {
            entered = true;
            assert!(
                boundary <= cap + VEL_TOL,
                "entered the short edge at {boundary}, cap {cap}"
            );
        }
    }
    assert!(entered, "no block boundary at the short edge");
    assert!((plan.total_distance() - (10.0 + 0.4 + 10.4)).abs() < 1e-6);
}

#[test]
fn cumulative_distance_is_monotonic() {
    let plan = plan_path(&square(), &defaults());
    let mut last = 0.0;
    let steps = 500;
    for k in 0..=steps {
        let t = plan.total_time() * k as f64 / steps as f64;
        let s = plan.instant_at(t).s;
        assert!(s + 1e-9 >= last, "distance regressed at t={t}");
        last = s;
    }
    assert!((last - plan.total_distance()).abs() < 1e-6);
}

#[test]
fn total_distance_matches_polyline_length() {
    let opts = defaults();
    let points = vec![
        Point::new(0.0, 0.0),
        Point::new(3.0, 4.0),
        Point::new(3.0, 10.0),
        Point::new(-2.0, 10.0),
    ];
    let expected: f64 = points.windows(2).map(|w| w[0].distance(&w[1])).sum();
    let plan = plan_path(&points, &opts);
    assert!((plan.total_distance() - expected).abs() < 1e-6);
}

#[test]
fn zero_length_polyline() {
    let plan = plan_path(&[Point::new(2.0, 2.0), Point::new(2.0, 2.0)], &defaults());
    assert_eq!(plan.total_time(), 0.0);
    assert!(plan.blocks().is_empty());
}
