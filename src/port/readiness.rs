//! Readiness-based serial port for Unix.
//!
//! The descriptor is registered with the tokio reactor for the lifetime of the
//! port. Each operation first tries one non-blocking read or write; only when
//! that would block does it suspend on the reactor's readiness notification,
//! then retry.
//! Dropping a suspended operation drops its readiness waiter with it, so a
//! cancelled read never consumes data.

use super::device::{open_native, DeviceHandle};
use super::error::PortError;
use super::pending::{Direction, OperationState, PendingSlot};
use super::traits::{PortConfiguration, RawDeviceId, SerialIo};
use async_trait::async_trait;
use mio_serial::SerialStream;
use std::io;
use std::os::unix::io::AsRawFd;
use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

/// Serial port driven by readiness notifications.
///
/// Read and write directions are independent: one read and one write may be
/// pending at the same time. The port is closed when dropped.
pub struct ReadinessPort<D: DeviceHandle = SerialStream> {
    /// Reactor registration; `None` once closed.
    io: Option<AsyncFd<D>>,
    read_slot: PendingSlot,
    write_slot: PendingSlot,
}

impl ReadinessPort<SerialStream> {
    /// Open a serial device and register it with the given runtime.
    ///
    /// # Example
    /// ```no_run
    /// use async_serial::port::{PortConfiguration, ReadinessPort};
    ///
    /// # async fn example() -> Result<(), async_serial::PortError> {
    /// let handle = tokio::runtime::Handle::current();
    /// let port = ReadinessPort::open(&handle, "/dev/ttyUSB0", &PortConfiguration::default())?;
    /// port.write(b"AT\r\n").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(
        handle: &Handle,
        path: &str,
        config: &PortConfiguration,
    ) -> Result<Self, PortError> {
        let stream = open_native(path, config)?;
        Self::from_device(handle, stream)
    }
}

impl<D: DeviceHandle> ReadinessPort<D> {
    /// Wrap an already-open descriptor, switching it to non-blocking mode and
    /// registering it with the reactor behind `handle`.
    ///
    /// # Panics
    ///
    /// Panics if the runtime behind `handle` was built without the I/O
    /// driver (`Builder::enable_io` or `enable_all`).
    pub fn from_device(handle: &Handle, device: D) -> Result<Self, PortError> {
        device.enable_nonblocking()?;

        let _runtime = handle.enter();
        let io = AsyncFd::with_interest(device, Interest::READABLE | Interest::WRITABLE)?;
        debug!(fd = io.as_raw_fd(), "registered device with reactor");

        Ok(Self {
            io: Some(io),
            read_slot: PendingSlot::new(Direction::Read),
            write_slot: PendingSlot::new(Direction::Write),
        })
    }

    fn registered(&self) -> Result<&AsyncFd<D>, PortError> {
        self.io.as_ref().ok_or(PortError::NotOpen)
    }

    /// The wrapped device, while the port is open.
    pub fn get_ref(&self) -> Option<&D> {
        self.io.as_ref().map(AsyncFd::get_ref)
    }

    /// Whether the port has not been closed yet.
    pub fn is_open(&self) -> bool {
        self.io.is_some()
    }

    /// Whether a read is currently in flight.
    pub fn read_state(&self) -> OperationState {
        self.read_slot.state()
    }

    /// Whether a write is currently in flight.
    pub fn write_state(&self) -> OperationState {
        self.write_slot.state()
    }

    /// Read up to `n` bytes.
    ///
    /// Completes without suspending when `n` is 0 or when data is already
    /// buffered. Otherwise waits for the descriptor to become readable and
    /// returns whatever one read then yields.
    pub async fn read(&self, n: usize) -> Result<Vec<u8>, PortError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let io = self.registered()?;
        let pending = self.read_slot.begin()?;

        let mut buf = vec![0u8; n];
        let result = read_when_ready(io, &mut buf).await;
        pending.resolve(result.map(|len| {
            buf.truncate(len);
            buf
        }))
    }

    /// Write a prefix of `data`, returning the number of bytes accepted.
    ///
    /// Completes without suspending when `data` is empty or the device has
    /// room. Otherwise waits for writability and writes once.
    pub async fn write(&self, data: &[u8]) -> Result<usize, PortError> {
        if data.is_empty() {
            return Ok(0);
        }
        let io = self.registered()?;
        let pending = self.write_slot.begin()?;

        let result = write_when_ready(io, data).await;
        pending.resolve(result)
    }

    /// Raw descriptor of the device.
    pub fn fileno(&self) -> Result<RawDeviceId, PortError> {
        Ok(self.registered()?.as_raw_fd())
    }

    /// Deregister from the reactor and close the device.
    ///
    /// Closing an already closed port does nothing.
    pub fn close(&mut self) -> Result<(), PortError> {
        let Some(io) = self.io.take() else {
            return Ok(());
        };
        let fd = io.as_raw_fd();
        // Deregisters from the reactor the descriptor was registered with.
        let device = io.into_inner();
        drop(device);

        debug!(fd, "closed serial device");
        Ok(())
    }
}

async fn read_when_ready<D: DeviceHandle>(
    io: &AsyncFd<D>,
    buf: &mut [u8],
) -> Result<usize, PortError> {
    let fd = io.as_raw_fd();

    // An empty immediate read counts as "nothing available yet".
    match io.get_ref().read_once(buf) {
        Ok(0) => {}
        Ok(len) => {
            trace!(fd, len, "read completed immediately");
            return Ok(len);
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
        Err(e) => return Err(e.into()),
    }

    debug!(fd, requested = buf.len(), "read would block, waiting for readability");
    loop {
        let mut guard = io.readable().await?;
        match guard.try_io(|inner| inner.get_ref().read_once(buf)) {
            Ok(Ok(0)) => return Err(PortError::Disconnected),
            Ok(Ok(len)) => {
                trace!(fd, len, "read completed after readiness");
                return Ok(len);
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_would_block) => continue,
        }
    }
}

async fn write_when_ready<D: DeviceHandle>(
    io: &AsyncFd<D>,
    data: &[u8],
) -> Result<usize, PortError> {
    let fd = io.as_raw_fd();

    match io.get_ref().write_once(data) {
        Ok(len) => {
            trace!(fd, len, "write completed immediately");
            return Ok(len);
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
        Err(e) => return Err(e.into()),
    }

    debug!(fd, len = data.len(), "write would block, waiting for writability");
    loop {
        let mut guard = io.writable().await?;
        match guard.try_io(|inner| inner.get_ref().write_once(data)) {
            Ok(Ok(len)) => {
                trace!(fd, len, "write completed after readiness");
                return Ok(len);
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_would_block) => continue,
        }
    }
}

#[async_trait]
impl<D: DeviceHandle> SerialIo for ReadinessPort<D> {
    async fn read(&self, n: usize) -> Result<Vec<u8>, PortError> {
        ReadinessPort::read(self, n).await
    }

    async fn write(&self, data: &[u8]) -> Result<usize, PortError> {
        ReadinessPort::write(self, data).await
    }

    fn fileno(&self) -> Result<RawDeviceId, PortError> {
        ReadinessPort::fileno(self)
    }

    fn close(&mut self) -> Result<(), PortError> {
        ReadinessPort::close(self)
    }
}

impl<D: DeviceHandle> Drop for ReadinessPort<D> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(%err, "failed to close serial device on drop");
        }
    }
}

impl<D: DeviceHandle> std::fmt::Debug for ReadinessPort<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessPort")
            .field("fd", &self.io.as_ref().map(AsRawFd::as_raw_fd))
            .field("read", &self.read_slot.state())
            .field("write", &self.write_slot.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::os::unix::net::UnixStream;

    fn pair() -> (ReadinessPort<UnixStream>, ReadinessPort<UnixStream>) {
        let handle = Handle::current();
        let (a, b) = UnixStream::pair().unwrap();
        (
            ReadinessPort::from_device(&handle, a).unwrap(),
            ReadinessPort::from_device(&handle, b).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_zero_length_read_never_suspends() {
        let (a, _b) = pair();
        let result = a.read(0).now_or_never();
        assert!(matches!(result, Some(Ok(ref data)) if data.is_empty()));
        assert_eq!(a.read_state(), OperationState::Idle);
    }

    #[tokio::test]
    async fn test_empty_write_never_suspends() {
        let (a, _b) = pair();
        let result = a.write(b"").now_or_never();
        assert!(matches!(result, Some(Ok(0))));
    }

    #[tokio::test]
    async fn test_buffered_data_reads_immediately() {
        let (a, b) = pair();
        assert_eq!(a.write(b"hello").await.unwrap(), 5);

        // Asking for more than is buffered returns what is there.
        let data = b.read(64).now_or_never().unwrap().unwrap();
        assert_eq!(data, b"hello");
    }

    #[tokio::test]
    async fn test_fileno_matches_device() {
        let (a, _b) = pair();
        let fd = a.get_ref().unwrap().as_raw_fd();
        assert_eq!(a.fileno().unwrap(), fd);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_terminal() {
        let (mut a, _b) = pair();
        assert!(a.is_open());

        a.close().unwrap();
        a.close().unwrap();
        assert!(!a.is_open());

        assert!(matches!(a.read(1).await, Err(PortError::NotOpen)));
        assert!(matches!(a.write(b"x").await, Err(PortError::NotOpen)));
        assert!(matches!(a.fileno(), Err(PortError::NotOpen)));
    }

    #[tokio::test]
    async fn test_zero_length_ops_ignore_closed_state() {
        let (mut a, _b) = pair();
        a.close().unwrap();
        assert!(a.read(0).await.unwrap().is_empty());
        assert_eq!(a.write(b"").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_hangup_surfaces_as_disconnected() {
        let (a, b) = pair();
        drop(b);
        assert!(matches!(a.read(4).await, Err(PortError::Disconnected)));
        assert_eq!(a.read_state(), OperationState::Idle);
    }

    #[test]
    #[should_panic(expected = "IO is disabled")]
    fn test_runtime_without_io_driver_panics() {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let (a, _b) = UnixStream::pair().unwrap();
        let _ = ReadinessPort::from_device(rt.handle(), a);
    }

    #[tokio::test]
    async fn test_debug_shows_slot_states() {
        let (a, _b) = pair();
        let debug = format!("{:?}", a);
        assert!(debug.contains("ReadinessPort"));
        assert!(debug.contains("Idle"));
    }
}
