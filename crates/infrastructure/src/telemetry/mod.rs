//! Telemetry bootstrap
//!
//! Builds the `tracing` subscriber from the configured level and format.
//! When a log collector address is configured, formatted lines are
//! shipped over UDP; if the socket cannot be set up the proxy keeps
//! running and logs to stderr instead.

use std::io::{self, Write};
use std::net::UdpSocket;
use std::sync::Arc;

use tracing::warn;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::TelemetrySettings;

/// Best-effort line shipper to a UDP log collector
///
/// Dropped datagrams are invisible by design: logging must never stall
/// the data plane.
#[derive(Debug, Clone)]
struct UdpWriter {
    socket: Arc<UdpSocket>,
}

impl UdpWriter {
    /// Bind an ephemeral socket and connect it to the collector
    fn connect(addr: &str) -> io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(addr)?;
        Ok(Self {
            socket: Arc::new(socket),
        })
    }
}

impl Write for UdpWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Send errors are swallowed; the collector being away is not the
        // proxy's problem
        let _ = self.socket.send(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Install the global tracing subscriber
///
/// An unparsable log level falls back to `info`; an unreachable log
/// collector falls back to stderr. Neither stops startup. Calling this
/// twice (as tests do) leaves the first subscriber in place.
pub fn init_telemetry(settings: &TelemetrySettings) {
    let filter = EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| {
        eprintln!(
            "invalid log level {:?}, defaulting to info",
            settings.log_level
        );
        EnvFilter::new("info")
    });

    let shipper = settings.logstash_addr.as_deref().and_then(|addr| {
        match UdpWriter::connect(addr) {
            Ok(writer) => Some(writer),
            Err(e) => {
                eprintln!("could not reach log collector at {addr}: {e}; logging to stderr");
                None
            },
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match (settings.wants_json(), shipper) {
        (true, Some(writer)) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(move || writer.clone()),
            )
            .try_init(),
        (true, None) => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        (false, Some(writer)) => registry
            .with(tracing_subscriber::fmt::layer().with_writer(move || writer.clone()))
            .try_init(),
        (false, None) => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };

    if installed.is_err() {
        warn!("telemetry already initialized, keeping existing subscriber");
    }
}
