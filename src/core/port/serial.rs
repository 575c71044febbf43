//! Serial port driver implementation

use super::{PortDriver, PortError, PortHandle};
use serde::{Deserialize, Serialize};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{Read, Write};
use std::time::Duration;

/// Serial port flow control type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SerialFlowControl {
    /// No flow control
    #[default]
    None,
    /// Hardware flow control (RTS/CTS)
    Hardware,
    /// Software flow control (XON/XOFF)
    Software,
}

/// Serial port parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SerialParity {
    /// No parity
    #[default]
    None,
    /// Odd parity
    Odd,
    /// Even parity
    Even,
}

impl std::str::FromStr for SerialParity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "odd" | "o" => Ok(Self::Odd),
            "even" | "e" => Ok(Self::Even),
            _ => Ok(Self::None),
        }
    }
}

impl std::str::FromStr for SerialFlowControl {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hw" | "hardware" => Ok(Self::Hardware),
            "sw" | "software" => Ok(Self::Software),
            _ => Ok(Self::None),
        }
    }
}

/// Line settings applied to every port the driver opens
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Baud rate
    pub baud_rate: u32,
    /// Data bits (5, 6, 7, 8)
    pub data_bits: u8,
    /// Stop bits (1, 2)
    pub stop_bits: u8,
    /// Parity
    pub parity: SerialParity,
    /// Flow control
    pub flow_control: SerialFlowControl,
    /// Read timeout in milliseconds. Bounds how long a blocking read can
    /// keep the reader thread from noticing a mode change.
    pub read_timeout_ms: u64,
}

impl SerialSettings {
    /// Create settings with the given baud rate and defaults for the rest
    pub fn new(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            data_bits: 8,
            stop_bits: 1,
            parity: SerialParity::None,
            flow_control: SerialFlowControl::None,
            read_timeout_ms: 100,
        }
    }

    /// Set data bits
    #[must_use]
    pub fn data_bits(mut self, bits: u8) -> Self {
        self.data_bits = bits;
        self
    }

    /// Set stop bits
    #[must_use]
    pub fn stop_bits(mut self, bits: u8) -> Self {
        self.stop_bits = bits;
        self
    }

    /// Set parity
    #[must_use]
    pub fn parity(mut self, parity: SerialParity) -> Self {
        self.parity = parity;
        self
    }

    /// Set flow control
    #[must_use]
    pub fn flow_control(mut self, flow: SerialFlowControl) -> Self {
        self.flow_control = flow;
        self
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self::new(115_200)
    }
}

/// Serial port driver backed by the `serialport` crate
#[derive(Debug, Clone, Default)]
pub struct SerialDriver {
    settings: SerialSettings,
}

impl SerialDriver {
    /// Create a driver that opens ports with the given line settings
    pub fn new(settings: SerialSettings) -> Self {
        Self { settings }
    }
}

impl PortDriver for SerialDriver {
    fn open(&self, port: &str) -> Result<Box<dyn PortHandle>, PortError> {
        let data_bits = match self.settings.data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            _ => DataBits::Eight,
        };

        let stop_bits = match self.settings.stop_bits {
            2 => StopBits::Two,
            _ => StopBits::One,
        };

        let parity = match self.settings.parity {
            SerialParity::None => Parity::None,
            SerialParity::Odd => Parity::Odd,
            SerialParity::Even => Parity::Even,
        };

        let flow_control = match self.settings.flow_control {
            SerialFlowControl::None => FlowControl::None,
            SerialFlowControl::Hardware => FlowControl::Hardware,
            SerialFlowControl::Software => FlowControl::Software,
        };

        let handle = serialport::new(port, self.settings.baud_rate)
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(parity)
            .flow_control(flow_control)
            .timeout(Duration::from_millis(self.settings.read_timeout_ms))
            .open()
            .map_err(|e| PortError::Open {
                port: port.to_string(),
                source: e.into(),
            })?;

        tracing::info!(port, baud = self.settings.baud_rate, "serial port opened");

        Ok(Box::new(SerialHandle { port: handle }))
    }

    fn list_ports(&self) -> Result<Vec<String>, PortError> {
        let ports = serialport::available_ports()
            .map_err(|e| PortError::Enumerate(e.into()))?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }
}

/// An open serial port
struct SerialHandle {
    port: Box<dyn SerialPort>,
}

impl PortHandle for SerialHandle {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, PortError> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::Interrupted =>
            {
                Ok(0)
            }
            Err(e) => Err(PortError::Read(e)),
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, PortError> {
        self.port.write(buf).map_err(PortError::Write)
    }

    fn close(&mut self) -> Result<(), PortError> {
        // The handle itself closes on drop; flush so buffered output is not
        // lost with it.
        self.port.flush().map_err(PortError::Close)
    }
}
