//! # Plotkit
//!
//! A driver for two-axis CoreXY pen plotters speaking the EiBotBoard
//! ASCII serial protocol.
//!
//! ## Architecture
//!
//! Plotkit is organized as a workspace with focused crates:
//!
//! 1. **plotkit-core** - geometry primitives and shared error types
//! 2. **plotkit-planner** - velocity throttling and constant-acceleration
//!    motion planning
//! 3. **plotkit-devicedb** - per-model step resolution and travel limits
//! 4. **plotkit-settings** - validated device options with file
//!    persistence
//! 5. **plotkit-communication** - serial transport, command validation,
//!    and the request/response protocol engine
//! 6. **plotkit-driver** - plan dispatch and device orchestration
//! 7. **plotkit** - this facade and the command-line binary
//!
//! The data flow is: drawing -> planner -> plan -> dispatcher ->
//! protocol engine -> serial device.

pub use plotkit_core::{
    simplify, ConfigError, ConnectionError, Drawing, DriverError, Error, Path, Point,
    ProtocolError, Result,
};

pub use plotkit_planner::{plan_path, throttle, Block, Instant, Plan, PlannerOptions};

pub use plotkit_devicedb::{DeviceError, PlotterModel};

pub use plotkit_settings::DeviceOptions;

pub use plotkit_communication::{
    find_plotter_port, list_ports, spawn_engine, EbbCommand, PlotterPort, ProtocolHandle,
    ProtocolRequest, ProtocolResponse, SerialPlotterPort, SerialPortInfo,
};

pub use plotkit_driver::{CommandSink, Dispatcher, Orchestrator, PlotterState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with console output, `RUST_LOG`
/// environment variable support, and an INFO default level.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}
