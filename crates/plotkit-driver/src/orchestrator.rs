//! Device lifecycle orchestration.
//!
//! The orchestrator owns the protocol engine, configures the servo on
//! startup, and accepts one drawing at a time: a `draw` while a drawing
//! is in progress is rejected, not queued. Dispatch runs in a background
//! task; completion or failure returns the orchestrator to idle.

use crate::dispatcher::Dispatcher;
use parking_lot::RwLock;
use plotkit_communication::engine::spawn_engine;
use plotkit_communication::port::PlotterPort;
use plotkit_communication::EbbCommand;
use plotkit_core::{Drawing, DriverError, Result};
use plotkit_devicedb::PlotterModel;
use plotkit_settings::DeviceOptions;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Servo count at 0 percent travel.
const SERVO_MIN_COUNTS: f64 = 7500.0;
/// Servo counts per percent of travel; 100 percent maps to 28000.
const SERVO_COUNTS_PER_PERCENT: f64 = 205.0;

/// Orchestrator lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotterState {
    /// Ready to accept a drawing.
    Idle,
    /// A drawing is being dispatched.
    Busy,
}

/// Owns the device for its whole session.
#[derive(Debug)]
pub struct Orchestrator {
    options: DeviceOptions,
    model: &'static PlotterModel,
    protocol: plotkit_communication::ProtocolHandle,
    engine_task: JoinHandle<()>,
    state: Arc<RwLock<PlotterState>>,
    idle: Arc<Notify>,
}

impl Orchestrator {
    /// Validate the options, spawn the protocol engine over `port`, and
    /// run the startup sequence: servo limits and speeds, motors on, pen
    /// up.
    pub async fn connect(port: Box<dyn PlotterPort>, options: DeviceOptions) -> Result<Self> {
        options.validate()?;
        let model = options.resolve_model()?;
        let (protocol, engine_task) = spawn_engine(port);

        tracing::info!(model = model.id, "configuring plotter");
        let startup = [
            EbbCommand::Configure {
                parameter: 4,
                value: servo_counts(options.pen_up_position),
            },
            EbbCommand::Configure {
                parameter: 5,
                value: servo_counts(options.pen_down_position),
            },
            EbbCommand::Configure {
                parameter: 11,
                value: servo_rate(options.pen_up_speed),
            },
            EbbCommand::Configure {
                parameter: 12,
                value: servo_rate(options.pen_down_speed),
            },
            EbbCommand::EnableMotors {
                motor1: true,
                motor2: true,
            },
            EbbCommand::SetPenState {
                up: true,
                duration_ms: None,
                pin: None,
            },
        ];
        for command in &startup {
            protocol.send(command).await?;
        }

        Ok(Self {
            options,
            model,
            protocol,
            engine_task,
            state: Arc::new(RwLock::new(PlotterState::Idle)),
            idle: Arc::new(Notify::new()),
        })
    }

    pub fn state(&self) -> PlotterState {
        *self.state.read()
    }

    /// Start dispatching a drawing in the background.
    ///
    /// Returns `DriverError::Busy` if a drawing is already in progress.
    pub async fn draw(&self, drawing: Drawing) -> Result<()> {
        {
            let mut state = self.state.write();
            if *state == PlotterState::Busy {
                tracing::warn!("drawing rejected: a drawing is already in progress");
                return Err(DriverError::Busy.into());
            }
            *state = PlotterState::Busy;
        }

        let mut dispatcher =
            Dispatcher::new(self.options.clone(), self.model, self.protocol.clone());
        let state = self.state.clone();
        let idle = self.idle.clone();
        tokio::spawn(async move {
            match dispatcher.dispatch(&drawing).await {
                Ok(()) => tracing::info!("drawing complete"),
                Err(e) => tracing::error!("dispatch failed: {}", e),
            }
            *state.write() = PlotterState::Idle;
            idle.notify_waiters();
        });
        Ok(())
    }

    /// Wait for the current drawing, if any, to finish.
    pub async fn wait_until_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if *self.state.read() == PlotterState::Idle {
                return;
            }
            notified.await;
        }
    }

    /// Release the device: motors off, pen dropped, engine stopped.
    pub async fn shutdown(self) -> Result<()> {
        self.protocol
            .send(&EbbCommand::EnableMotors {
                motor1: false,
                motor2: false,
            })
            .await?;
        self.protocol
            .send(&EbbCommand::SetPenState {
                up: false,
                duration_ms: None,
                pin: None,
            })
            .await?;
        self.protocol.shutdown().await;
        let _ = self.engine_task.await;
        Ok(())
    }
}

/// Servo position counts for a percent of pen travel: `[0, 100]` maps
/// linearly onto `[7500, 28000]`.
fn servo_counts(percent: i32) -> u16 {
    (SERVO_MIN_COUNTS + SERVO_COUNTS_PER_PERCENT * percent as f64).round() as u16
}

/// Servo speed as sent to the board. The firmware unit is five times the
/// configured percent-per-second.
fn servo_rate(speed: i32) -> u16 {
    (speed as i64 * 5).clamp(0, u16::MAX as i64) as u16
}
