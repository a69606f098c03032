//! Plan sampling and stepper command dispatch.
//!
//! The dispatcher walks a plan on the configured timeslice grid and
//! emits one stepper move per slice. Position deltas are converted to
//! integer step counts with the fractional remainder carried into the
//! next slice; the carry lives for the whole drawing because all paths
//! share the device's absolute coordinate frame.

use async_trait::async_trait;
use plotkit_communication::{EbbCommand, ProtocolHandle};
use plotkit_core::{Drawing, Path, Point, Result};
use plotkit_devicedb::PlotterModel;
use plotkit_planner::{plan_path, Plan, PlannerOptions};
use plotkit_settings::DeviceOptions;

/// Gap below which two consecutive paths are treated as connected.
const GAP_EPS: f64 = 1e-9;

/// Destination for dispatched commands. Production uses the protocol
/// engine; tests record.
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn submit(&self, command: EbbCommand) -> Result<()>;
}

#[async_trait]
impl CommandSink for ProtocolHandle {
    async fn submit(&self, command: EbbCommand) -> Result<()> {
        self.send(&command).await
    }
}

/// Samples plans and drives the pen and steppers through a sink.
pub struct Dispatcher<S: CommandSink> {
    options: DeviceOptions,
    model: &'static PlotterModel,
    sink: S,
    error_x: f64,
    error_y: f64,
}

impl<S: CommandSink> Dispatcher<S> {
    pub fn new(options: DeviceOptions, model: &'static PlotterModel, sink: S) -> Self {
        Self {
            options,
            model,
            sink,
            error_x: 0.0,
            error_y: 0.0,
        }
    }

    fn planner_options(&self) -> PlannerOptions {
        PlannerOptions {
            acceleration: self.options.acceleration,
            max_velocity: self.options.max_velocity,
            corner_factor: self.options.corner_factor,
            timeslice: self.options.timeslice(),
            ..PlannerOptions::default()
        }
    }

    /// Dispatch a whole drawing: pen down before the first path, pen-up
    /// travel between disjoint paths, pen up at the end.
    pub async fn dispatch(&mut self, drawing: &Drawing) -> Result<()> {
        self.error_x = 0.0;
        self.error_y = 0.0;

        let paths: Vec<&Path> = drawing.paths.iter().filter(|p| !p.is_empty()).collect();
        if paths.is_empty() {
            tracing::debug!("empty drawing, nothing to dispatch");
            return Ok(());
        }

        let planner_options = self.planner_options();
        tracing::info!(
            paths = paths.len(),
            pen_down_mm = drawing.pen_down_length(),
            "dispatching drawing"
        );

        self.pen_down().await?;
        let mut previous_end: Option<Point> = None;
        for path in paths {
            let Some(start) = path.first() else { continue };
            if let Some(prev) = previous_end {
                if prev.distance(&start) > GAP_EPS {
                    self.pen_up().await?;
                    let connector = plan_path(&[prev, start], &planner_options);
                    self.dispatch_plan(&connector).await?;
                    self.pen_down().await?;
                }
            }
            let plan = plan_path(&path.points, &planner_options);
            self.dispatch_plan(&plan).await?;
            previous_end = path.last();
        }
        self.pen_up().await?;
        Ok(())
    }

    /// Sample one plan on the timeslice grid and emit stepper moves.
    pub async fn dispatch_plan(&mut self, plan: &Plan) -> Result<()> {
        let dt = self.options.timeslice();
        let steps_per_mm = self.model.steps_per_mm(self.options.microstepping_mode);
        let total = plan.total_time();
        if total <= 0.0 {
            return Ok(());
        }

        let mut prev = plan.instant_at(0.0);
        let mut slice = 1u64;
        loop {
            let t = slice as f64 * dt;
            let clamped = t.min(total);
            let cur = plan.instant_at(clamped);

            let raw_x = (cur.p.x - prev.p.x) * steps_per_mm + self.error_x;
            let raw_y = (cur.p.y - prev.p.y) * steps_per_mm + self.error_y;
            let steps_x = raw_x.floor();
            let steps_y = raw_y.floor();
            self.error_x = raw_x - steps_x;
            self.error_y = raw_y - steps_y;

            let mut duration_ms = if t < total {
                self.options.timeslice_ms as u32
            } else {
                ((clamped - prev.t) * 1000.0).round() as u32
            };
            if duration_ms == 0 && (steps_x != 0.0 || steps_y != 0.0) {
                // A sub-millisecond final slice still owes its steps.
                duration_ms = 1;
            }
            if duration_ms > 0 {
                self.sink
                    .submit(EbbCommand::StepperMove {
                        duration_ms,
                        axis_a: steps_x as i32,
                        axis_b: steps_y as i32,
                    })
                    .await?;
            }

            prev = cur;
            if t >= total {
                break;
            }
            slice += 1;
        }
        Ok(())
    }

    /// Raise the pen, letting the board pace the servo transition.
    pub async fn pen_up(&mut self) -> Result<()> {
        let delay = self.pen_delay(self.options.pen_up_speed, self.options.pen_up_delay);
        self.sink
            .submit(EbbCommand::SetPenState {
                up: true,
                duration_ms: delay,
                pin: None,
            })
            .await
    }

    /// Lower the pen.
    pub async fn pen_down(&mut self) -> Result<()> {
        let delay = self.pen_delay(self.options.pen_down_speed, self.options.pen_down_delay);
        self.sink
            .submit(EbbCommand::SetPenState {
                up: false,
                duration_ms: delay,
                pin: None,
            })
            .await
    }

    /// Servo transition time plus the configured extra delay, clamped at
    /// zero. A zero result is omitted from the command entirely.
    fn pen_delay(&self, speed: i32, extra_ms: i64) -> Option<u32> {
        let delta = (self.options.pen_up_position - self.options.pen_down_position).abs() as f64;
        let transition_ms = if speed > 0 {
            (1000.0 * delta / speed as f64).round() as i64
        } else {
            0
        };
        let delay = (transition_ms + extra_ms).max(0);
        (delay > 0).then_some(delay as u32)
    }
}
