//! Tests for the socket listener.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rstest::{fixture, rstest};

use lantern_config::SocketEndpoint;

use crate::health::HealthReporter;
use crate::tests::support::{HealthEvent, RecordingHealthReporter};

use super::listener::SocketListener;
use super::{ConnectionHandler, ConnectionStream, ListenerError, ListenerSummary};

const DESCRIBE: &[u8] = b"d2:op8:describee";
const GRACE: Duration = Duration::from_secs(2);

/// Keeps whatever each client sent before it hung up.
#[derive(Debug, Default)]
struct TranscriptHandler {
    received: Mutex<Vec<(String, Vec<u8>)>>,
}

impl TranscriptHandler {
    fn received(&self) -> Vec<(String, Vec<u8>)> {
        self.received.lock().expect("transcript mutex poisoned").clone()
    }

    fn wait_for(&self, clients: usize) -> bool {
        let deadline = Instant::now() + GRACE;
        while Instant::now() < deadline {
            if self.received().len() >= clients {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }
}

impl ConnectionHandler for TranscriptHandler {
    fn handle(&self, mut stream: ConnectionStream) {
        let mut bytes = Vec::new();
        let _ = stream.read_to_end(&mut bytes);
        let peer = stream.peer().to_owned();
        self.received
            .lock()
            .expect("transcript mutex poisoned")
            .push((peer, bytes));
    }
}

struct Harness {
    handler: Arc<TranscriptHandler>,
    reporter: Arc<RecordingHealthReporter>,
}

impl Harness {
    fn start(&self, listener: SocketListener) -> super::ListenerHandle {
        let handler: Arc<dyn ConnectionHandler> = self.handler.clone();
        let reporter: Arc<dyn HealthReporter> = self.reporter.clone();
        listener.start(handler, reporter).expect("start listener")
    }
}

#[fixture]
fn harness() -> Harness {
    Harness {
        handler: Arc::new(TranscriptHandler::default()),
        reporter: Arc::new(RecordingHealthReporter::default()),
    }
}

#[fixture]
fn tcp_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp("127.0.0.1", 0)
}

fn send_and_hang_up(mut client: TcpStream) -> String {
    let peer = client.local_addr().expect("client address").to_string();
    client.write_all(DESCRIBE).expect("send describe");
    peer
}

#[rstest]
fn tcp_clients_are_served_and_tallied(tcp_endpoint: SocketEndpoint, harness: Harness) {
    let listener = SocketListener::bind(&tcp_endpoint).expect("bind tcp listener");
    let addr = listener.local_addr().expect("bound tcp address");
    assert_ne!(addr.port(), 0, "ephemeral port should be resolved");
    let handle = harness.start(listener);

    let first = send_and_hang_up(TcpStream::connect(addr).expect("connect first client"));
    let second = send_and_hang_up(TcpStream::connect(addr).expect("connect second client"));
    assert!(harness.handler.wait_for(2), "expected two served clients");

    let summary = handle.finish(GRACE).expect("finish listener");
    assert_eq!(
        summary,
        ListenerSummary {
            served: 2,
            abandoned: 0
        }
    );

    let mut received = harness.handler.received();
    received.sort();
    let mut expected = vec![(first, DESCRIBE.to_vec()), (second, DESCRIBE.to_vec())];
    expected.sort();
    assert_eq!(received, expected);

    let events = harness.reporter.events();
    let disconnects = events
        .iter()
        .filter(|event| matches!(event, HealthEvent::ClientDisconnected(_)))
        .count();
    assert_eq!(harness.reporter.connected_peers().len(), 2);
    assert_eq!(disconnects, 2, "{events:?}");
}

#[rstest]
fn clients_outliving_the_grace_period_are_counted_as_abandoned(
    tcp_endpoint: SocketEndpoint,
    harness: Harness,
) {
    let listener = SocketListener::bind(&tcp_endpoint).expect("bind tcp listener");
    let addr = listener.local_addr().expect("bound tcp address");
    let handle = harness.start(listener);

    let lingering = TcpStream::connect(addr).expect("connect client");
    let deadline = Instant::now() + GRACE;
    while handle.live_clients() == 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(handle.live_clients(), 1, "client should be accepted");

    let summary = handle.finish(Duration::from_millis(50)).expect("finish listener");
    assert_eq!(summary.abandoned, 1);
    assert_eq!(summary.served, 1);
    drop(lingering);
    assert!(harness.handler.wait_for(1), "client thread should still finish");
}

#[rstest]
fn listener_reports_configured_endpoint(tcp_endpoint: SocketEndpoint) {
    let listener = SocketListener::bind(&tcp_endpoint).expect("bind tcp listener");
    assert_eq!(listener.endpoint(), &tcp_endpoint);
}

#[cfg(unix)]
#[fixture]
fn unix_tempdir() -> tempfile::TempDir {
    tempfile::tempdir().expect("temp dir")
}

#[cfg(unix)]
fn unix_endpoint(dir: &tempfile::TempDir) -> (std::path::PathBuf, SocketEndpoint) {
    let path = dir.path().join("nrepl.sock");
    let endpoint = SocketEndpoint::unix(path.to_str().expect("utf8 path").to_owned());
    (path, endpoint)
}

#[cfg(unix)]
#[rstest]
fn unix_listener_reclaims_stale_socket_files(unix_tempdir: tempfile::TempDir, harness: Harness) {
    let (path, endpoint) = unix_endpoint(&unix_tempdir);
    {
        let _stale = std::os::unix::net::UnixListener::bind(&path).expect("bind stale listener");
    }
    assert!(path.exists(), "stale socket should remain");

    let listener = SocketListener::bind(&endpoint).expect("bind new listener");
    assert!(listener.local_addr().is_none());
    let handle = harness.start(listener);

    let mut client = std::os::unix::net::UnixStream::connect(&path).expect("connect unix client");
    client.write_all(DESCRIBE).expect("send describe");
    drop(client);
    assert!(harness.handler.wait_for(1), "unix client should be served");

    let summary = handle.finish(GRACE).expect("finish listener");
    assert_eq!(summary.served, 1);
    assert_eq!(harness.reporter.connected_peers(), ["unix client"]);
    assert!(!path.exists(), "socket file should be removed on shutdown");
}

#[cfg(unix)]
#[rstest]
fn unix_listener_rejects_in_use_socket(unix_tempdir: tempfile::TempDir) {
    let (path, endpoint) = unix_endpoint(&unix_tempdir);
    let _existing = std::os::unix::net::UnixListener::bind(&path).expect("bind existing listener");

    let error = SocketListener::bind(&endpoint).expect_err("should fail bind");
    assert!(matches!(error, ListenerError::SocketInUse { .. }));
}

#[cfg(unix)]
#[rstest]
fn unix_listener_refuses_regular_files(unix_tempdir: tempfile::TempDir) {
    let (path, endpoint) = unix_endpoint(&unix_tempdir);
    std::fs::write(&path, b"not a socket").expect("write file");

    let error = SocketListener::bind(&endpoint).expect_err("should fail bind");
    assert!(matches!(error, ListenerError::NotASocket { .. }));
}
