//! Lifecycle events of the nREPL daemon, reported as structured logs.
//!
//! Bootstrap, the listening socket, every client connect and disconnect,
//! and the final shutdown tally pass through a [`HealthReporter`]. The
//! production reporter writes them under the `lanternd::health` target so
//! operators can filter the daemon's lifecycle from request traffic.

use camino::Utf8Path;
use tracing::{error, info};

use lantern_config::Config;

use crate::bootstrap::BootstrapError;
use crate::transport::ListenerSummary;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer for daemon lifecycle events.
pub trait HealthReporter: Send + Sync {
    /// Configuration loading is about to begin.
    fn bootstrap_starting(&self);

    /// Configuration loaded and the engine is built.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Bootstrap gave up.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Clients can connect to `address`. `port_file` is set when the bound
    /// port was advertised to editors.
    fn listening(&self, address: &str, port_file: Option<&Utf8Path>);

    /// A client connected; `live` counts it.
    fn client_connected(&self, peer: &str, live: usize);

    /// A client hung up; `live` no longer counts it.
    fn client_disconnected(&self, peer: &str, live: usize);

    /// The listener stopped and its clients drained.
    fn shutdown_complete(&self, summary: ListenerSummary);
}

/// Reporter that writes every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        info!(target: HEALTH_TARGET, event = "bootstrap_starting", "loading configuration");
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            listen = %config.listen(),
            port_file = config.port_file().map(Utf8Path::as_str),
            log_format = %config.log_format(),
            "engine ready"
        );
    }

    fn bootstrap_failed(&self, failure: &BootstrapError) {
        error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %failure,
            "daemon cannot start"
        );
    }

    fn listening(&self, address: &str, port_file: Option<&Utf8Path>) {
        info!(
            target: HEALTH_TARGET,
            event = "listening",
            address,
            port_file = port_file.map(Utf8Path::as_str),
            "nREPL server started on {address}"
        );
    }

    fn client_connected(&self, peer: &str, live: usize) {
        info!(target: HEALTH_TARGET, event = "client_connected", peer, live, "client connected");
    }

    fn client_disconnected(&self, peer: &str, live: usize) {
        info!(
            target: HEALTH_TARGET,
            event = "client_disconnected",
            peer,
            live,
            "client disconnected"
        );
    }

    fn shutdown_complete(&self, summary: ListenerSummary) {
        info!(
            target: HEALTH_TARGET,
            event = "shutdown_complete",
            served = summary.served,
            abandoned = summary.abandoned,
            "nREPL server stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    use tracing_subscriber::fmt::MakeWriter;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("capture mutex").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn logged(report: impl FnOnce(&StructuredHealthReporter)) -> String {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(captured.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || report(&StructuredHealthReporter::new()));
        let bytes = captured.0.lock().expect("capture mutex").clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[test]
    fn listening_names_the_address_and_port_file() {
        let text = logged(|reporter| {
            reporter.listening("127.0.0.1:7888", Some(Utf8Path::new(".nrepl-port")));
        });
        assert!(text.contains("nREPL server started on 127.0.0.1:7888"), "{text}");
        assert!(text.contains(".nrepl-port"), "{text}");
    }

    #[test]
    fn client_events_carry_the_live_count() {
        let text = logged(|reporter| {
            reporter.client_connected("127.0.0.1:50000", 1);
            reporter.client_disconnected("127.0.0.1:50000", 0);
        });
        assert!(text.contains("client connected"), "{text}");
        assert!(text.contains("live=1"), "{text}");
        assert!(text.contains("live=0"), "{text}");
    }

    #[test]
    fn shutdown_reports_served_and_abandoned_clients() {
        let text = logged(|reporter| {
            reporter.shutdown_complete(ListenerSummary {
                served: 3,
                abandoned: 1,
            });
        });
        assert!(text.contains("served=3"), "{text}");
        assert!(text.contains("abandoned=1"), "{text}");
    }
}
