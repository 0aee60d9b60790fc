//! Echo every line received on a serial port back to the sender.
//!
//! The device and line settings come from the usual configuration lookup
//! (`ASYNC_SERIAL_CONFIG`, `./async-serial.toml`, platform config dir) and
//! the environment:
//!
//! ```bash
//! ASYNC_SERIAL_DEVICE=/dev/ttyUSB0 ASYNC_SERIAL_PORT_BAUD_RATE=115200 \
//!     cargo run --example line_echo
//! ```
//!
//! Stops after ten seconds without input.

use async_serial::{logging, open_configured, ConfigLoader, ExactTransfer, PortError};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{info, warn};

const IDLE_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let loader = ConfigLoader::load()?;
    logging::init(&loader.config().logging);

    if let Some(path) = &loader.config_path {
        info!(path = %path.display(), "using configuration file");
    }

    let mut port = open_configured(&Handle::current(), loader.config())?;
    info!(port = ?port, "echoing lines");

    let mut lines = 0u64;
    loop {
        let line = match tokio::time::timeout(IDLE_TIMEOUT, port.readline()).await {
            Ok(Ok(line)) => line,
            Ok(Err(PortError::Disconnected)) => {
                warn!("device disconnected");
                break;
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                info!(idle = ?IDLE_TIMEOUT, "no input, stopping");
                break;
            }
        };

        lines += 1;
        info!(line = %String::from_utf8_lossy(&line).trim_end(), "received");
        port.write_exactly(&line).await?;
    }

    port.close()?;
    info!(lines, "done");
    Ok(())
}
