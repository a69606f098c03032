//! Dispatcher tests against a recording command sink.

use async_trait::async_trait;
use plotkit_communication::EbbCommand;
use plotkit_core::{Drawing, Path, Point, Result};
use plotkit_driver::{CommandSink, Dispatcher};
use plotkit_settings::DeviceOptions;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct RecordingSink {
    commands: Arc<Mutex<Vec<EbbCommand>>>,
}

impl RecordingSink {
    fn commands(&self) -> Vec<EbbCommand> {
        self.commands.lock().unwrap().clone()
    }

    fn pen_states(&self) -> Vec<bool> {
        self.commands()
            .iter()
            .filter_map(|c| match c {
                EbbCommand::SetPenState { up, .. } => Some(*up),
                _ => None,
            })
            .collect()
    }

    fn moves(&self) -> Vec<(u32, i32, i32)> {
        self.commands()
            .iter()
            .filter_map(|c| match c {
                EbbCommand::StepperMove {
                    duration_ms,
                    axis_a,
                    axis_b,
                } => Some((*duration_ms, *axis_a, *axis_b)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl CommandSink for RecordingSink {
    async fn submit(&self, command: EbbCommand) -> Result<()> {
        self.commands.lock().unwrap().push(command);
        Ok(())
    }
}

fn dispatcher(sink: RecordingSink) -> Dispatcher<RecordingSink> {
    let options = DeviceOptions::default();
    let model = options.resolve_model().unwrap();
    Dispatcher::new(options, model, sink)
}

fn line(x0: f64, y0: f64, x1: f64, y1: f64) -> Path {
    Path::new(vec![Point::new(x0, y0), Point::new(x1, y1)])
}

#[tokio::test]
async fn step_totals_match_distance() {
    let sink = RecordingSink::default();
    let mut dispatcher = dispatcher(sink.clone());

    // 10 mm along X at 80 steps/mm is 800 steps.
    let drawing = Drawing::new(vec![line(0.0, 0.0, 10.0, 0.0)]);
    dispatcher.dispatch(&drawing).await.unwrap();

    let moves = sink.moves();
    assert!(!moves.is_empty());
    let sum_a: i64 = moves.iter().map(|m| m.1 as i64).sum();
    let sum_b: i64 = moves.iter().map(|m| m.2 as i64).sum();
    assert!((sum_a - 800).abs() <= 1, "axis A drifted: {sum_a}");
    assert_eq!(sum_b, 0);
}

#[tokio::test]
async fn fractional_steps_carry_across_slices() {
    let sink = RecordingSink::default();
    let mut dispatcher = dispatcher(sink.clone());

    let drawing = Drawing::new(vec![line(0.0, 0.0, 3.33, 7.77)]);
    dispatcher.dispatch(&drawing).await.unwrap();

    let moves = sink.moves();
    let sum_a: i64 = moves.iter().map(|m| m.1 as i64).sum();
    let sum_b: i64 = moves.iter().map(|m| m.2 as i64).sum();
    assert!((sum_a as f64 - 3.33 * 80.0).abs() < 1.0 + 1e-9, "{sum_a}");
    assert!((sum_b as f64 - 7.77 * 80.0).abs() < 1.0 + 1e-9, "{sum_b}");
}

#[tokio::test]
async fn every_slice_lasts_one_timeslice_except_the_last() {
    let sink = RecordingSink::default();
    let mut dispatcher = dispatcher(sink.clone());

    let drawing = Drawing::new(vec![line(0.0, 0.0, 10.0, 0.0)]);
    dispatcher.dispatch(&drawing).await.unwrap();

    let moves = sink.moves();
    let (last, rest) = moves.split_last().unwrap();
    for (duration_ms, _, _) in rest {
        assert_eq!(*duration_ms, 100);
    }
    assert!(last.0 <= 100);
}

#[tokio::test]
async fn disjoint_paths_get_pen_lifts_and_a_connector() {
    let sink = RecordingSink::default();
    let mut dispatcher = dispatcher(sink.clone());

    let drawing = Drawing::new(vec![
        line(0.0, 0.0, 10.0, 0.0),
        line(20.0, 0.0, 30.0, 0.0),
    ]);
    dispatcher.dispatch(&drawing).await.unwrap();

    // down, draw, up, travel, down, draw, up
    assert_eq!(sink.pen_states(), vec![false, true, false, true]);

    // The connector's moves sit between the first pen-up and the second
    // pen-down.
    let commands = sink.commands();
    let up_at = commands
        .iter()
        .position(|c| matches!(c, EbbCommand::SetPenState { up: true, .. }))
        .unwrap();
    let down_again_at = commands
        .iter()
        .skip(up_at)
        .position(|c| matches!(c, EbbCommand::SetPenState { up: false, .. }))
        .map(|i| i + up_at)
        .unwrap();
    let connector_steps: i64 = commands[up_at..down_again_at]
        .iter()
        .filter_map(|c| match c {
            EbbCommand::StepperMove { axis_a, .. } => Some(*axis_a as i64),
            _ => None,
        })
        .sum();
    assert!(
        (connector_steps - 800).abs() <= 1,
        "connector covered {connector_steps} steps"
    );

    // Whole-drawing totals still land on the final position.
    let total: i64 = sink.moves().iter().map(|m| m.1 as i64).sum();
    assert!((total - 2400).abs() <= 1, "{total}");
}

#[tokio::test]
async fn touching_paths_keep_the_pen_down() {
    let sink = RecordingSink::default();
    let mut dispatcher = dispatcher(sink.clone());

    let drawing = Drawing::new(vec![
        line(0.0, 0.0, 10.0, 0.0),
        line(10.0, 0.0, 10.0, 10.0),
    ]);
    dispatcher.dispatch(&drawing).await.unwrap();

    assert_eq!(sink.pen_states(), vec![false, true]);
}

#[tokio::test]
async fn empty_drawing_emits_nothing() {
    let sink = RecordingSink::default();
    let mut dispatcher = dispatcher(sink.clone());

    dispatcher.dispatch(&Drawing::default()).await.unwrap();
    assert!(sink.commands().is_empty());
}

#[tokio::test]
async fn degenerate_path_moves_no_steppers() {
    let sink = RecordingSink::default();
    let mut dispatcher = dispatcher(sink.clone());

    let drawing = Drawing::new(vec![Path::new(vec![Point::new(5.0, 5.0)])]);
    dispatcher.dispatch(&drawing).await.unwrap();

    assert!(sink.moves().is_empty());
    assert_eq!(sink.pen_states(), vec![false, true]);
}
