//! Exact-length transfers built on the primitive `read`/`write`.
//!
//! Every [`SerialIo`] gets these through a blanket implementation of
//! [`ExactTransfer`]; the loops here never look past the primitive contract.

use super::error::PortError;
use super::traits::SerialIo;
use async_trait::async_trait;
use std::io;

/// Line delimiter recognized by [`ExactTransfer::readline`].
pub const NEWLINE: u8 = b'\n';

/// Exact-count and line-oriented transfers.
#[async_trait]
pub trait ExactTransfer: SerialIo {
    /// Read exactly `n` bytes, suspending as often as needed.
    ///
    /// Zero-length results from the primitive are tolerated; the loop simply
    /// asks again for the remainder.
    async fn read_exactly(&self, n: usize) -> Result<Vec<u8>, PortError> {
        let mut data = Vec::with_capacity(n);
        while data.len() < n {
            let remaining = n - data.len();
            let chunk = self.read(remaining).await?;
            data.extend_from_slice(&chunk);
        }
        Ok(data)
    }

    /// Write all of `data`, resubmitting the unsent suffix after partial
    /// writes.
    async fn write_exactly(&self, data: &[u8]) -> Result<(), PortError> {
        let mut rest = data;
        while !rest.is_empty() {
            let written = self.write(rest).await?;
            if written == 0 {
                return Err(PortError::Io(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "device accepted no bytes",
                )));
            }
            rest = &rest[written..];
        }
        Ok(())
    }

    /// Read one byte at a time until a newline arrives, returning the line
    /// including its terminator.
    ///
    /// Byte-at-a-time keeps everything after the newline in the device
    /// buffer for the next caller, at the cost of one primitive call per
    /// byte.
    async fn readline(&self) -> Result<Vec<u8>, PortError> {
        let mut line = Vec::new();
        while line.last() != Some(&NEWLINE) {
            let byte = self.read_exactly(1).await?;
            line.extend_from_slice(&byte);
        }
        Ok(line)
    }
}

impl<T: SerialIo + ?Sized> ExactTransfer for T {}
