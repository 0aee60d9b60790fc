//! Configuration module.
//!
//! TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the first of these that exists:
//!
//! 1. `ASYNC_SERIAL_CONFIG` environment variable (explicit path)
//! 2. `./async-serial.toml` (current directory)
//! 3. `<platform config dir>/async-serial/config.toml`
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! - `ASYNC_SERIAL_DEVICE=/dev/ttyUSB0`
//! - `ASYNC_SERIAL_PORT_BAUD_RATE=115200`
//! - `ASYNC_SERIAL_LOG_LEVEL=debug`
//! - `ASYNC_SERIAL_LOG_FORMAT=json`
//!
//! # Example
//!
//! ```toml
//! device = "/dev/ttyUSB0"
//!
//! [port]
//! baud_rate = 115200
//! parity = "none"
//!
//! [logging]
//! level = "debug"
//! format = "compact"
//! ```
//!
//! A `[port]` section carrying `timeout_ms`, `write_timeout_ms` or
//! `inter_byte_timeout_ms` is rejected at load time.

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{get_default_config_path, resolve_config_path, ConfigLoader};
pub use schema::{Config, LogFormat, LoggingConfig};
