//! # Plotkit Communication
//!
//! The serial transport and protocol engine for EiBotBoard-style
//! plotters. Three layers:
//!
//! - `port`: a narrow serial-port capability (`PlotterPort`) with a
//!   `serialport`-backed implementation, port enumeration, and plotter
//!   discovery.
//! - `command`: typed constructors for the board's ASCII command set with
//!   range validation.
//! - `engine`: a single-outstanding-request actor that serialises
//!   commands onto the port, correlates CR-terminated replies, times out
//!   unanswered queries, and queues requests that arrive while one is in
//!   flight.

pub mod command;
pub mod engine;
pub mod port;

pub use command::EbbCommand;
pub use engine::{
    spawn_engine, ProtocolHandle, ProtocolRequest, ProtocolResponse, RESPONSE_TIMEOUT,
    STASH_CAPACITY,
};
pub use port::{find_plotter_port, list_ports, PlotterPort, SerialPlotterPort, SerialPortInfo};
