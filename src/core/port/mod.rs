//! Port driver layer
//!
//! The session core treats the communication endpoint as an opaque driver
//! with a small contract: enumerate targets, open one, then blocking reads,
//! writes, and a close on the returned handle. The production driver wraps
//! a serial port; tests substitute stubs.

mod serial;

pub use serial::{SerialDriver, SerialFlowControl, SerialParity, SerialSettings};

use std::io;
use thiserror::Error;

/// Port driver error types
#[derive(Debug, Error)]
pub enum PortError {
    /// Opening the named port failed
    #[error("failed to open {port}: {source}")]
    Open {
        /// The port that was being opened
        port: String,
        /// Underlying I/O error
        source: io::Error,
    },

    /// A read on the open port failed
    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    /// A write on the open port failed
    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    /// Closing the port failed
    #[error("close failed: {0}")]
    Close(#[source] io::Error),

    /// Enumerating available ports failed
    #[error("port enumeration failed: {0}")]
    Enumerate(#[source] io::Error),

    /// Operation requires an open port
    #[error("port is not open")]
    NotOpen,
}

impl PortError {
    /// The underlying OS error code, where one exists.
    pub fn os_code(&self) -> Option<i32> {
        match self {
            Self::Open { source, .. }
            | Self::Read(source)
            | Self::Write(source)
            | Self::Close(source)
            | Self::Enumerate(source) => source.raw_os_error(),
            Self::NotOpen => None,
        }
    }
}

/// An open communication endpoint.
///
/// Reads block for at most the driver's configured timeout; a timeout is
/// reported as `Ok(0)`, not an error, so the reader loop can re-check the
/// session mode between reads.
pub trait PortHandle: Send {
    /// Blocking read into `buf`. Returns the number of bytes read; `Ok(0)`
    /// means the timeout elapsed with no data.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, PortError>;

    /// Write `buf` to the port, returning the number of bytes written.
    fn write(&mut self, buf: &[u8]) -> Result<usize, PortError>;

    /// Close the endpoint. Called at most once; the handle is dropped after.
    fn close(&mut self) -> Result<(), PortError>;
}

/// Factory side of the driver contract: enumerate and open ports.
pub trait PortDriver: Send {
    /// Open the named port and hand ownership of the endpoint to the caller.
    fn open(&self, port: &str) -> Result<Box<dyn PortHandle>, PortError>;

    /// List the names of currently available ports.
    ///
    /// Enumeration failures degrade to an empty list at the call site; the
    /// session treats "no ports" and "cannot enumerate" the same way.
    fn list_ports(&self) -> Result<Vec<String>, PortError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_code_passthrough() {
        let err = PortError::Open {
            port: "COM3".to_string(),
            source: io::Error::from_raw_os_error(5),
        };
        assert_eq!(err.os_code(), Some(5));
        assert!(err.to_string().contains("COM3"));
    }

    #[test]
    fn test_not_open_has_no_code() {
        assert_eq!(PortError::NotOpen.os_code(), None);
    }
}
