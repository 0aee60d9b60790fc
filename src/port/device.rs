//! Device handle glue for the readiness-based port.
//!
//! `mio-serial` opens and configures the line and returns it non-blocking
//! and in raw mode (`VMIN = 1`, `VTIME = 0`), so an idle line reports
//! `EAGAIN` and a zero-length read can only mean hangup. From then on the
//! port only needs single non-blocking reads and writes through the handle.

use super::error::PortError;
use super::traits::PortConfiguration;
use mio_serial::SerialStream;
use std::io::{self, Read, Write};
use std::os::unix::io::AsRawFd;
use std::os::unix::net::UnixStream;
use tracing::debug;

/// An OS descriptor that can back a [`ReadinessPort`](super::ReadinessPort).
///
/// Reads and writes go through a shared reference, so one read and one
/// write can be in flight at the same time. Dropping the handle closes the
/// descriptor.
pub trait DeviceHandle: AsRawFd + Send + Sync + 'static {
    /// Put the descriptor into non-blocking mode.
    fn enable_nonblocking(&self) -> io::Result<()>;

    /// One read attempt. "Would block" comes back as
    /// [`io::ErrorKind::WouldBlock`].
    fn read_once(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// One write attempt. "Would block" comes back as
    /// [`io::ErrorKind::WouldBlock`].
    fn write_once(&self, buf: &[u8]) -> io::Result<usize>;
}

impl DeviceHandle for SerialStream {
    // Opened with O_NONBLOCK by the driver.
    fn enable_nonblocking(&self) -> io::Result<()> {
        Ok(())
    }

    fn read_once(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut device = self;
        device.read(buf)
    }

    fn write_once(&self, buf: &[u8]) -> io::Result<usize> {
        let mut device = self;
        device.write(buf)
    }
}

impl DeviceHandle for UnixStream {
    fn enable_nonblocking(&self) -> io::Result<()> {
        UnixStream::set_nonblocking(self, true)
    }

    fn read_once(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut device = self;
        device.read(buf)
    }

    fn write_once(&self, buf: &[u8]) -> io::Result<usize> {
        let mut device = self;
        device.write(buf)
    }
}

/// Open and configure a serial line, returning it in non-blocking mode.
///
/// # Example
/// ```no_run
/// use async_serial::port::{open_native, PortConfiguration};
///
/// let stream = open_native("/dev/ttyUSB0", &PortConfiguration::with_baud_rate(115200))?;
/// # Ok::<(), async_serial::PortError>(())
/// ```
pub fn open_native(path: &str, config: &PortConfiguration) -> Result<SerialStream, PortError> {
    config.validate()?;

    let stream =
        SerialStream::open(&config.builder(path)).map_err(|e| PortError::from_driver(path, e))?;

    debug!(path, baud_rate = config.baud_rate, fd = stream.as_raw_fd(), "opened serial device");
    Ok(stream)
}
