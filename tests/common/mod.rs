//! Shared test utilities.
//!
//! - Loopback pairs: two connected ports backed by a Unix socket pair
//! - Tracing setup for tests that want to see adapter events

#![allow(dead_code)]

use async_serial::config::{LogFormat, LoggingConfig};
use async_serial::port::ReadinessPort;
use std::os::unix::net::UnixStream;
use std::sync::Once;
use tokio::runtime::Handle;

pub type LoopbackPort = ReadinessPort<UnixStream>;

/// Two ports wired to each other: bytes written to one are read from the
/// other.
pub fn loopback_pair() -> (LoopbackPort, LoopbackPort) {
    loopback_pair_on(&Handle::current())
}

/// Like [`loopback_pair`], registered with an explicit runtime.
pub fn loopback_pair_on(handle: &Handle) -> (LoopbackPort, LoopbackPort) {
    let (a, b) = UnixStream::pair().expect("socket pair");
    (
        ReadinessPort::from_device(handle, a).expect("register a"),
        ReadinessPort::from_device(handle, b).expect("register b"),
    )
}

/// Fill the socket buffer of `port` until a write no longer completes
/// synchronously. Returns how many bytes went in.
pub fn fill_until_would_block(port: &LoopbackPort) -> usize {
    use futures::FutureExt;

    let chunk = vec![0xA5u8; 64 * 1024];
    let mut total = 0;
    loop {
        match port.write(&chunk).now_or_never() {
            Some(Ok(n)) => total += n,
            Some(Err(e)) => panic!("unexpected write error while filling: {e}"),
            None => return total,
        }
    }
}

static TRACING: Once = Once::new();

/// Print adapter events when `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING.call_once(|| {
        async_serial::logging::init(&LoggingConfig {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        });
    });
}
