//! In-memory serial port for testing code written against [`SerialIo`].
//!
//! Provides a `MockSerialIo` that serves scripted read chunks and records
//! writes, without a device or a reactor. Useful for exercising the
//! exact-transfer layer against partial reads, partial writes and
//! zero-length completions.

use super::error::PortError;
use super::traits::{RawDeviceId, SerialIo};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Inner state of the mock port.
#[derive(Debug, Default)]
struct MockPortState {
    /// Chunks returned by read operations, front first.
    read_chunks: VecDeque<Vec<u8>>,
    /// Sizes requested by each non-empty read call.
    read_requests: Vec<usize>,
    /// Every accepted write, in order.
    write_log: Vec<Vec<u8>>,
    /// Largest number of bytes a single write accepts.
    max_write: Option<usize>,
    closed: bool,
}

/// Mock serial port implementation for testing.
///
/// - A read returns at most the front chunk (truncated to the request); an
///   explicitly enqueued empty chunk produces one zero-length result.
/// - With nothing enqueued, a read fails with [`PortError::Disconnected`].
/// - A write accepts at most `max_write` bytes.
///
/// # Example
/// ```
/// use async_serial::port::{ExactTransfer, MockSerialIo};
///
/// # tokio_test::block_on(async {
/// let port = MockSerialIo::new("MOCK0").with_max_write(2);
/// port.enqueue_read(b"OK\r\n");
///
/// assert_eq!(port.readline().await.unwrap(), b"OK\r\n");
///
/// port.write_exactly(b"ATZ").await.unwrap();
/// assert_eq!(port.get_write_log(), vec![b"AT".to_vec(), b"Z".to_vec()]);
/// # });
/// ```
#[derive(Clone)]
pub struct MockSerialIo {
    name: String,
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialIo {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState::default())),
        }
    }

    /// Limit how many bytes a single write accepts.
    pub fn with_max_write(self, max_write: usize) -> Self {
        self.state.lock().max_write = Some(max_write);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a chunk to be returned by subsequent reads.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state.lock().read_chunks.push_back(data.to_vec());
    }

    /// Sizes requested by each read call so far.
    pub fn read_requests(&self) -> Vec<usize> {
        self.state.lock().read_requests.clone()
    }

    /// Get a copy of all data written to the port.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Everything written so far, concatenated.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.state.lock().write_log.concat()
    }

    /// Get the number of bytes still queued for reading.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_chunks.iter().map(Vec::len).sum()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

#[async_trait]
impl SerialIo for MockSerialIo {
    async fn read(&self, n: usize) -> Result<Vec<u8>, PortError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let mut state = self.state.lock();
        if state.closed {
            return Err(PortError::NotOpen);
        }
        state.read_requests.push(n);

        let Some(front) = state.read_chunks.front_mut() else {
            return Err(PortError::Disconnected);
        };
        let take = n.min(front.len());
        let data: Vec<u8> = front.drain(..take).collect();
        if front.is_empty() {
            state.read_chunks.pop_front();
        }
        Ok(data)
    }

    async fn write(&self, data: &[u8]) -> Result<usize, PortError> {
        if data.is_empty() {
            return Ok(0);
        }
        let mut state = self.state.lock();
        if state.closed {
            return Err(PortError::NotOpen);
        }

        let accepted = state.max_write.map_or(data.len(), |max| max.min(data.len()));
        if accepted > 0 {
            state.write_log.push(data[..accepted].to_vec());
        }
        Ok(accepted)
    }

    fn fileno(&self) -> Result<RawDeviceId, PortError> {
        Err(PortError::Unsupported("mock port has no OS descriptor"))
    }

    fn close(&mut self) -> Result<(), PortError> {
        self.state.lock().closed = true;
        Ok(())
    }
}

impl std::fmt::Debug for MockSerialIo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialIo")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}
