//! Completion-based serial port for Windows.
//!
//! `mio-serial` opens the COM port for overlapped I/O, applies the line
//! settings and sets the comm timeouts so that a receive returns as soon as
//! anything is buffered instead of waiting for a full buffer or a fixed
//! interval. The handle is then given to tokio's IOCP driver through
//! `NamedPipeClient`, which issues the overlapped receive and send requests.

use super::error::PortError;
use super::pending::{Direction, OperationState, PendingSlot};
use super::traits::{PortConfiguration, RawDeviceId, SerialIo};
use async_trait::async_trait;
use mio_serial::SerialStream;
use std::io;
use std::mem::ManuallyDrop;
use std::os::windows::io::{AsRawHandle, FromRawHandle};
use tokio::net::windows::named_pipe::NamedPipeClient;
use tokio::runtime::Handle;
use tracing::{debug, trace, warn};

/// Serial port driven by I/O completion notifications.
///
/// Holds no per-operation state beyond the direction slots: outstanding
/// requests live in the runtime's completion dispatcher, not in a standing
/// registration. The port is closed when dropped.
pub struct CompletionPort {
    /// Overlapped view of the COM handle; `None` once closed.
    pipe: Option<NamedPipeClient>,
    read_slot: PendingSlot,
    write_slot: PendingSlot,
}

impl CompletionPort {
    /// Open a COM port for overlapped I/O and attach it to the given runtime.
    ///
    /// # Panics
    ///
    /// Panics if the runtime behind `handle` was built without the I/O
    /// driver.
    pub fn open(
        handle: &Handle,
        path: &str,
        config: &PortConfiguration,
    ) -> Result<Self, PortError> {
        config.validate()?;

        let stream =
            SerialStream::open(&config.builder(path)).map_err(|e| PortError::from_driver(path, e))?;
        let raw = stream.as_raw_handle();
        // The pipe takes over the handle; the driver's wrapper must not close it.
        let _driver = ManuallyDrop::new(stream);

        let _runtime = handle.enter();
        // SAFETY: `raw` is an open overlapped handle whose only other owner
        // is never dropped.
        let pipe = unsafe { NamedPipeClient::from_raw_handle(raw)? };
        debug!(path, baud_rate = config.baud_rate, "opened serial device");

        Ok(Self::from_pipe(pipe))
    }

    /// Wrap a handle already attached to the runtime, skipping line setup.
    pub(crate) fn from_pipe(pipe: NamedPipeClient) -> Self {
        Self {
            pipe: Some(pipe),
            read_slot: PendingSlot::new(Direction::Read),
            write_slot: PendingSlot::new(Direction::Write),
        }
    }

    fn pipe(&self) -> Result<&NamedPipeClient, PortError> {
        self.pipe.as_ref().ok_or(PortError::NotOpen)
    }

    /// Whether the port has not been closed yet.
    pub fn is_open(&self) -> bool {
        self.pipe.is_some()
    }

    /// Whether a read is currently in flight.
    pub fn read_state(&self) -> OperationState {
        self.read_slot.state()
    }

    /// Whether a write is currently in flight.
    pub fn write_state(&self) -> OperationState {
        self.write_slot.state()
    }

    /// Receive up to `n` bytes.
    ///
    /// A completion carrying zero bytes resolves with an empty buffer.
    pub async fn read(&self, n: usize) -> Result<Vec<u8>, PortError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let pipe = self.pipe()?;
        let pending = self.read_slot.begin()?;

        let mut buf = vec![0u8; n];
        let result = receive(pipe, &mut buf).await;
        pending.resolve(result.map(|len| {
            buf.truncate(len);
            buf
        }))
    }

    /// Send a prefix of `data`, returning the number of bytes accepted.
    pub async fn write(&self, data: &[u8]) -> Result<usize, PortError> {
        if data.is_empty() {
            return Ok(0);
        }
        let pipe = self.pipe()?;
        let pending = self.write_slot.begin()?;

        let result = send(pipe, data).await;
        pending.resolve(result)
    }

    /// Raw handle of the device.
    pub fn fileno(&self) -> Result<RawDeviceId, PortError> {
        Ok(self.pipe()?.as_raw_handle())
    }

    /// Close the handle. Closing an already closed port does nothing.
    pub fn close(&mut self) -> Result<(), PortError> {
        if let Some(pipe) = self.pipe.take() {
            drop(pipe);
            debug!("closed serial device");
        }
        Ok(())
    }
}

async fn receive(pipe: &NamedPipeClient, buf: &mut [u8]) -> Result<usize, PortError> {
    loop {
        pipe.readable().await?;
        match pipe.try_read(buf) {
            Ok(len) => {
                trace!(len, "receive completed");
                return Ok(len);
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

async fn send(pipe: &NamedPipeClient, data: &[u8]) -> Result<usize, PortError> {
    loop {
        pipe.writable().await?;
        match pipe.try_write(data) {
            Ok(len) => {
                trace!(len, "send completed");
                return Ok(len);
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

#[async_trait]
impl SerialIo for CompletionPort {
    async fn read(&self, n: usize) -> Result<Vec<u8>, PortError> {
        CompletionPort::read(self, n).await
    }

    async fn write(&self, data: &[u8]) -> Result<usize, PortError> {
        CompletionPort::write(self, data).await
    }

    fn fileno(&self) -> Result<RawDeviceId, PortError> {
        CompletionPort::fileno(self)
    }

    fn close(&mut self) -> Result<(), PortError> {
        CompletionPort::close(self)
    }
}

impl Drop for CompletionPort {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(%err, "failed to close serial device on drop");
        }
    }
}

impl std::fmt::Debug for CompletionPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionPort")
            .field("open", &self.is_open())
            .field("read", &self.read_slot.state())
            .field("write", &self.write_slot.state())
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::ExactTransfer;
    use futures::{poll, FutureExt};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::windows::named_pipe::{ClientOptions, NamedPipeServer, ServerOptions};

    static PIPE_ID: AtomicUsize = AtomicUsize::new(0);

    /// A port on the client end of a fresh named pipe, plus the server end.
    async fn pipe_pair() -> (CompletionPort, NamedPipeServer) {
        let name = format!(
            r"\\.\pipe\async-serial-{}-{}",
            std::process::id(),
            PIPE_ID.fetch_add(1, Ordering::Relaxed)
        );
        let server = ServerOptions::new()
            .first_pipe_instance(true)
            .create(&name)
            .unwrap();
        let client = ClientOptions::new().open(&name).unwrap();
        server.connect().await.unwrap();
        (CompletionPort::from_pipe(client), server)
    }

    #[tokio::test]
    async fn test_port_not_found_error() {
        let handle = Handle::current();
        let result = CompletionPort::open(&handle, "COM254", &PortConfiguration::default());
        match result {
            Err(PortError::NotFound(name)) => assert_eq!(name, "COM254"),
            other => panic!("Expected NotFound error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_rejected_before_open() {
        let handle = Handle::current();
        let config = PortConfiguration {
            inter_byte_timeout_ms: Some(10),
            ..Default::default()
        };
        let result = CompletionPort::open(&handle, "COM254", &config);
        assert!(matches!(
            result,
            Err(PortError::UnsupportedOption {
                option: "inter_byte_timeout_ms"
            })
        ));
    }

    #[tokio::test]
    async fn test_zero_length_ops_never_suspend() {
        let (port, _server) = pipe_pair().await;

        let read = port.read(0).now_or_never();
        assert!(matches!(read, Some(Ok(ref data)) if data.is_empty()));
        assert!(matches!(port.write(b"").now_or_never(), Some(Ok(0))));
        assert_eq!(port.read_state(), OperationState::Idle);
        assert_eq!(port.write_state(), OperationState::Idle);
    }

    #[tokio::test]
    async fn test_read_returns_what_is_available() {
        let (port, mut server) = pipe_pair().await;
        server.write_all(b"abc").await.unwrap();

        assert_eq!(port.read(100).await.unwrap(), b"abc");
    }

    #[tokio::test]
    async fn test_second_read_while_pending_is_rejected() {
        let (port, mut server) = pipe_pair().await;

        {
            let first = port.read(4);
            tokio::pin!(first);
            assert!(poll!(first.as_mut()).is_pending());
            assert_eq!(port.read_state(), OperationState::Pending);

            match port.read(1).await {
                Err(PortError::OperationPending(Direction::Read)) => {}
                other => panic!("Expected OperationPending(Read), got: {:?}", other),
            }
        }
        assert_eq!(port.read_state(), OperationState::Idle);

        server.write_all(b"z").await.unwrap();
        assert_eq!(port.read(4).await.unwrap(), b"z");
    }

    #[tokio::test]
    async fn test_second_write_while_pending_is_rejected() {
        let (port, mut server) = pipe_pair().await;

        // The first send is still in flight when the next one starts.
        let head = vec![0x5Au8; 1024];
        assert_eq!(port.write(&head).await.unwrap(), head.len());

        let second = port.write(b"more");
        tokio::pin!(second);
        assert!(poll!(second.as_mut()).is_pending());
        assert_eq!(port.write_state(), OperationState::Pending);

        match port.write(b"x").await {
            Err(PortError::OperationPending(Direction::Write)) => {}
            other => panic!("Expected OperationPending(Write), got: {:?}", other),
        }

        let mut received = vec![0u8; head.len() + 4];
        let (written, drained) = tokio::join!(second, server.read_exact(&mut received));
        assert_eq!(written.unwrap(), 4);
        drained.unwrap();
        assert_eq!(&received[head.len()..], b"more");
    }

    #[tokio::test]
    async fn test_timed_out_read_can_be_restarted() {
        let (port, mut server) = pipe_pair().await;

        let result = tokio::time::timeout(Duration::from_millis(20), port.read(1)).await;
        assert!(result.is_err(), "read should have timed out");
        assert_eq!(port.read_state(), OperationState::Idle);

        server.write_all(b"q").await.unwrap();
        assert_eq!(port.read(1).await.unwrap(), b"q");
    }

    #[tokio::test]
    async fn test_exact_transfer_round_trip() {
        let (port, mut server) = pipe_pair().await;
        let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();

        let mut echoed = vec![0u8; payload.len()];
        let (sent, drained) = tokio::join!(port.write_exactly(&payload), server.read_exact(&mut echoed));
        sent.unwrap();
        drained.unwrap();
        assert_eq!(echoed, payload);

        let (written, received) =
            tokio::join!(server.write_all(&payload), port.read_exactly(payload.len()));
        written.unwrap();
        assert_eq!(received.unwrap(), payload);

        server.write_all(b"ok\nnext").await.unwrap();
        assert_eq!(port.readline().await.unwrap(), b"ok\n");
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_terminal() {
        let (mut port, _server) = pipe_pair().await;
        assert!(port.fileno().is_ok());

        port.close().unwrap();
        port.close().unwrap();
        assert!(!port.is_open());

        assert!(matches!(port.read(1).await, Err(PortError::NotOpen)));
        assert!(matches!(port.write(b"x").await, Err(PortError::NotOpen)));
        assert!(matches!(port.fileno(), Err(PortError::NotOpen)));
        assert!(port.read(0).await.unwrap().is_empty());
    }
}
