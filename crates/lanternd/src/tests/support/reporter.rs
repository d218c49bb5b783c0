//! Test double for [`HealthReporter`] that records lifecycle events.

use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};
use lantern_config::Config;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;
use crate::transport::ListenerSummary;

/// Structured health events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// The server accepts clients, optionally advertised through a port file.
    Listening {
        address: String,
        port_file: Option<Utf8PathBuf>,
    },
    /// A client connected from the given peer.
    ClientConnected(String),
    /// The client from the given peer hung up.
    ClientDisconnected(String),
    /// The listener wound down.
    ShutdownComplete { served: u64, abandoned: usize },
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    /// Peers named by connect events, in arrival order.
    #[must_use]
    pub fn connected_peers(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                HealthEvent::ClientConnected(peer) => Some(peer),
                _ => None,
            })
            .collect()
    }

    pub fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn listening(&self, address: &str, port_file: Option<&Utf8Path>) {
        self.record(HealthEvent::Listening {
            address: address.to_owned(),
            port_file: port_file.map(Utf8Path::to_path_buf),
        });
    }

    fn client_connected(&self, peer: &str, _live: usize) {
        self.record(HealthEvent::ClientConnected(peer.to_owned()));
    }

    fn client_disconnected(&self, peer: &str, _live: usize) {
        self.record(HealthEvent::ClientDisconnected(peer.to_owned()));
    }

    fn shutdown_complete(&self, summary: ListenerSummary) {
        self.record(HealthEvent::ShutdownComplete {
            served: summary.served,
            abandoned: summary.abandoned,
        });
    }
}
