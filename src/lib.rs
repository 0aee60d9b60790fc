//! Awaitable serial port I/O for the tokio event loop.
//!
//! Operations never block the runtime thread: a `read` or `write` that cannot
//! complete right away suspends the calling task until the device is ready
//! (Unix readiness notification) or the overlapped request completes
//! (Windows completion notification). At most one read and one write may be
//! in flight per port.
//!
//! # Modules
//!
//! - `port`: the platform adapters, the `SerialIo` capability and the
//!   exact-transfer layer
//! - `config`: TOML configuration with environment overrides
//! - `logging`: tracing subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use async_serial::{ExactTransfer, PortConfiguration, SerialPort};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = tokio::runtime::Handle::current();
//! let port = SerialPort::open(&handle, "/dev/ttyUSB0", &PortConfiguration::with_baud_rate(115200))?;
//!
//! port.write_exactly(b"AT\r\n").await?;
//! // Timeouts are composed around operations, never configured on the port.
//! let reply = tokio::time::timeout(Duration::from_secs(1), port.readline()).await??;
//! println!("{}", String::from_utf8_lossy(&reply));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod logging;
pub mod port;

// Re-export commonly used types for convenience
pub use port::{
    open_configured, DataBits, Direction, ExactTransfer, FlowControl, MockSerialIo,
    OperationState, Parity, PortConfiguration, PortError, RawDeviceId, SerialIo, SerialPort,
    StopBits,
};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
