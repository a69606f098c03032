//! Serial port access for plotter hardware.
//!
//! Provides port enumeration, plotter discovery, and a narrow
//! `PlotterPort` capability over the `serialport` crate so the protocol
//! engine can be driven by an in-memory fake in tests.

use plotkit_core::{ConnectionError, Error, Result};
use std::io::{self, Read, Write};
use std::time::Duration;

/// Wire settings for the EiBotBoard: 9600 baud, 8-N-1.
pub const PLOTTER_BAUD: u32 = 9600;

/// USB vendor id of the plotter controller.
pub const PLOTTER_VID: u16 = 0x04D8;
/// USB product id of the plotter controller.
pub const PLOTTER_PID: u16 = 0xFD92;

/// Descriptor prefix announced by the controller firmware.
const DESCRIPTOR_PREFIX: &str = "EiBotBoard";

/// Read timeout; the engine loop polls the port with short reads.
const READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyACM0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "EiBotBoard")
    pub description: String,

    /// USB vendor ID if applicable
    pub vid: Option<u16>,

    /// USB product ID if applicable
    pub pid: Option<u16>,
}

impl SerialPortInfo {
    /// Whether this port looks like a plotter controller.
    pub fn is_plotter(&self) -> bool {
        if self.description.starts_with(DESCRIPTOR_PREFIX) {
            return true;
        }
        self.vid == Some(PLOTTER_VID) && self.pid == Some(PLOTTER_PID)
    }
}

/// List available serial ports on the system.
pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    let ports = serialport::available_ports().map_err(|e| {
        tracing::error!("Failed to enumerate serial ports: {}", e);
        Error::from(ConnectionError::EnumerationFailed {
            reason: e.to_string(),
        })
    })?;

    Ok(ports
        .iter()
        .map(|port| match &port.port_type {
            serialport::SerialPortType::UsbPort(usb) => SerialPortInfo {
                port_name: port.port_name.clone(),
                description: usb.product.clone().unwrap_or_else(|| "USB Serial".into()),
                vid: Some(usb.vid),
                pid: Some(usb.pid),
            },
            _ => SerialPortInfo {
                port_name: port.port_name.clone(),
                description: "Serial Port".to_string(),
                vid: None,
                pid: None,
            },
        })
        .collect())
}

/// Find the first connected plotter.
///
/// A port qualifies when its descriptor begins with `EiBotBoard` or its
/// USB ids match the controller's VID:PID.
pub fn find_plotter_port() -> Result<SerialPortInfo> {
    list_ports()?
        .into_iter()
        .find(SerialPortInfo::is_plotter)
        .ok_or_else(|| ConnectionError::NoDeviceFound.into())
}

/// The serial-port capability the protocol engine runs against.
///
/// `read` returns `Ok(0)` when nothing arrived within the short port
/// timeout; the engine treats that as "no data yet".
pub trait PlotterPort: Send {
    /// Write the whole buffer to the port.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Discard unsent output and unread input.
    fn flush_io(&mut self) -> io::Result<()>;

    /// Read available bytes, returning 0 on timeout.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Port name for logging.
    fn name(&self) -> &str;
}

/// Real serial port implementation over the `serialport` crate.
pub struct SerialPlotterPort {
    inner: Box<dyn serialport::SerialPort>,
    name: String,
}

impl SerialPlotterPort {
    /// Open a plotter port at the fixed 9600 8-N-1 wire settings.
    pub fn open(port_name: &str) -> Result<Self> {
        let inner = serialport::new(port_name, PLOTTER_BAUD)
            .timeout(READ_TIMEOUT)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|e| {
                tracing::warn!("Failed to open serial port {}: {}", port_name, e);
                Error::from(ConnectionError::FailedToOpen {
                    port: port_name.to_string(),
                    reason: e.to_string(),
                })
            })?;

        Ok(Self {
            inner,
            name: port_name.to_string(),
        })
    }
}

impl PlotterPort for SerialPlotterPort {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.inner.write_all(data)?;
        self.inner.flush()
    }

    fn flush_io(&mut self) -> io::Result<()> {
        self.inner
            .clear(serialport::ClearBuffer::All)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
