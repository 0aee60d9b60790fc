//! Core traits for serial port abstraction.
//!
//! Defines the `SerialIo` capability that both the readiness-based and the
//! completion-based port implement, and the line settings handed to the
//! serial-line driver when a port is opened.

use super::error::PortError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Raw OS identifier of an open device: a file descriptor on Unix.
#[cfg(unix)]
pub type RawDeviceId = std::os::unix::io::RawFd;

/// Raw OS identifier of an open device: a handle on Windows.
#[cfg(windows)]
pub type RawDeviceId = std::os::windows::io::RawHandle;

/// Line settings for a serial port.
///
/// Only options understood by the serial-line driver are accepted. The three
/// timeout fields exist so that configurations written for blocking APIs fail
/// loudly instead of being silently ignored; see [`PortConfiguration::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortConfiguration {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Number of data bits (5, 6, 7, or 8).
    pub data_bits: DataBits,

    /// Flow control mode, passed through to the driver.
    pub flow_control: FlowControl,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Rejected: blocking read timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Rejected: blocking write timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_timeout_ms: Option<u64>,

    /// Rejected: inter-character timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inter_byte_timeout_ms: Option<u64>,
}

impl Default for PortConfiguration {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            timeout_ms: None,
            write_timeout_ms: None,
            inter_byte_timeout_ms: None,
        }
    }
}

impl PortConfiguration {
    /// Default settings at the given baud rate.
    pub fn with_baud_rate(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..Self::default()
        }
    }

    /// Reject settings the cooperative model cannot honor.
    ///
    /// Blocking-style timeouts are refused; compose `tokio::time::timeout`
    /// around the operation instead.
    pub fn validate(&self) -> Result<(), PortError> {
        let rejected = [
            ("timeout_ms", self.timeout_ms),
            ("write_timeout_ms", self.write_timeout_ms),
            ("inter_byte_timeout_ms", self.inter_byte_timeout_ms),
        ];
        if let Some(&(option, _)) = rejected.iter().find(|(_, value)| value.is_some()) {
            return Err(PortError::UnsupportedOption { option });
        }

        if self.baud_rate == 0 {
            return Err(PortError::config("baud rate must be greater than zero"));
        }

        Ok(())
    }

    /// Driver builder carrying these settings.
    pub(crate) fn builder(&self, path: &str) -> serialport::SerialPortBuilder {
        serialport::new(path, self.baud_rate)
            .data_bits(self.data_bits.into())
            .flow_control(self.flow_control.into())
            .parity(self.parity.into())
            .stop_bits(self.stop_bits.into())
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Flow control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// Awaitable byte I/O on one serial device.
///
/// Implementations allow one in-flight operation per direction: a `read` and
/// a `write` may be pending at the same time, but a second `read` started
/// while the first is still pending fails with
/// [`PortError::OperationPending`]. Dropping an operation's future cancels it.
#[async_trait]
pub trait SerialIo: Send + Sync {
    /// Read up to `n` bytes. Returns at once with an empty buffer when `n` is 0.
    async fn read(&self, n: usize) -> Result<Vec<u8>, PortError>;

    /// Write a prefix of `data` and return how many bytes were accepted.
    /// Returns `0` at once for an empty payload.
    async fn write(&self, data: &[u8]) -> Result<usize, PortError>;

    /// Raw descriptor or handle of the underlying device.
    fn fileno(&self) -> Result<RawDeviceId, PortError>;

    /// Release the device and its event-loop registration.
    fn close(&mut self) -> Result<(), PortError>;
}
