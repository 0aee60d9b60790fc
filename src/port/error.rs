//! Port-specific error types.
//!
//! Everything a port operation can surface to the task awaiting it. The
//! "would block" condition is deliberately absent: the adapters absorb it and
//! suspend instead.

use super::pending::Direction;
use thiserror::Error;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// An OS-level failure during a raw read or write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Port configuration failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A blocking-style timeout option was supplied at construction.
    #[error(
        "`{option}` is not supported; wrap the operation in tokio::time::timeout \
         or drop its future to cancel it"
    )]
    UnsupportedOption {
        /// Name of the rejected option.
        option: &'static str,
    },

    /// Attempted to use a port that has been closed.
    #[error("Port is not open")]
    NotOpen,

    /// An operation was started while another one in the same direction is
    /// still in flight.
    #[error("A {0} operation is already pending on this port")]
    OperationPending(Direction),

    /// The descriptor signalled readiness but yielded no data: the other end
    /// hung up or the device was removed.
    #[error("Device disconnected")]
    Disconnected,

    /// The operation has no meaning for this port implementation.
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// A serialport-specific error occurred while opening or configuring.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Config error from a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Map an error from the serial-line driver, keeping "no such device" and
    /// "bad settings" distinguishable.
    pub(crate) fn from_driver(port_name: &str, err: serialport::Error) -> Self {
        match err.kind() {
            serialport::ErrorKind::NoDevice => Self::not_found(port_name),
            serialport::ErrorKind::InvalidInput => Self::config(err.to_string()),
            _ => Self::Serial(err),
        }
    }
}
