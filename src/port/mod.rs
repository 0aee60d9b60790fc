//! Port abstraction layer for serial communication.
//!
//! Two structurally different adapters implement the same [`SerialIo`]
//! capability, and the build target picks one of them as [`SerialPort`]:
//!
//! - Unix: [`ReadinessPort`], driven by reactor readiness notifications.
//! - Windows: [`CompletionPort`], driven by overlapped I/O completions.
//!
//! [`ExactTransfer`] layers exact-length reads, writes and line reads on top
//! of either.

pub mod error;
pub mod mock;
pub mod pending;
pub mod traits;
pub mod transfer;

#[cfg(unix)]
pub mod device;
#[cfg(unix)]
pub mod readiness;

#[cfg(windows)]
pub mod completion;

pub use error::PortError;
pub use mock::MockSerialIo;
pub use pending::{Direction, OperationState};
pub use traits::*;
pub use transfer::{ExactTransfer, NEWLINE};

#[cfg(unix)]
pub use device::{open_native, DeviceHandle};
#[cfg(unix)]
pub use readiness::ReadinessPort;

#[cfg(windows)]
pub use completion::CompletionPort;

use crate::config::Config;
use tokio::runtime::Handle;

/// The serial port implementation for this platform.
#[cfg(unix)]
pub type SerialPort = ReadinessPort<mio_serial::SerialStream>;

/// The serial port implementation for this platform.
#[cfg(windows)]
pub type SerialPort = CompletionPort;

/// Open the device named in `config` with its `[port]` settings.
pub fn open_configured(handle: &Handle, config: &Config) -> Result<SerialPort, PortError> {
    let device = config
        .device
        .as_deref()
        .ok_or_else(|| PortError::config("no device configured"))?;
    SerialPort::open(handle, device, &config.port)
}
