//! Binds the configured endpoint and accepts nREPL clients.
//!
//! A single accept thread polls the non-blocking socket so it can notice a
//! stop request. Every accepted client is served on its own
//! `nrepl-client-N` thread and counted by a [`ClientTracker`] so shutdown
//! can wait for open sessions to finish their current exchange.

use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use camino::Utf8Path;
#[cfg(unix)]
use camino::Utf8PathBuf;
use tracing::{debug, info, warn};

use lantern_config::SocketEndpoint;

use crate::health::HealthReporter;

use super::{ConnectionHandler, ConnectionStream, LISTENER_TARGET, ListenerError};

#[cfg(unix)]
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::FileTypeExt;
#[cfg(unix)]
use std::os::unix::net::{UnixListener, UnixStream};

const IDLE_POLL: Duration = Duration::from_millis(25);
const FAILED_ACCEPT_PAUSE: Duration = Duration::from_millis(150);
const DRAIN_POLL: Duration = Duration::from_millis(10);

/// Socket the server owns.
#[derive(Debug)]
enum BoundSocket {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix {
        listener: UnixListener,
        path: Utf8PathBuf,
    },
}

impl BoundSocket {
    fn set_nonblocking(&self) -> io::Result<()> {
        match self {
            Self::Tcp(listener) => listener.set_nonblocking(true),
            #[cfg(unix)]
            Self::Unix { listener, .. } => listener.set_nonblocking(true),
        }
    }

    /// Accepts one waiting client, or `None` when nobody is queued.
    fn poll_accept(&self) -> io::Result<Option<ConnectionStream>> {
        let accepted = match self {
            Self::Tcp(listener) => listener.accept().and_then(|(stream, _)| {
                stream.set_nonblocking(false)?;
                stream.set_nodelay(true)?;
                Ok(ConnectionStream::from(stream))
            }),
            #[cfg(unix)]
            Self::Unix { listener, .. } => listener.accept().and_then(|(stream, _)| {
                stream.set_nonblocking(false)?;
                Ok(ConnectionStream::from(stream))
            }),
        };
        match accepted {
            Ok(stream) => Ok(Some(stream)),
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn tcp_addr(&self) -> Option<SocketAddr> {
        match self {
            Self::Tcp(listener) => listener.local_addr().ok(),
            #[cfg(unix)]
            Self::Unix { .. } => None,
        }
    }

    /// Removes the socket file so the next start does not find it stale.
    fn release(&self) {
        match self {
            Self::Tcp(_) => {}
            #[cfg(unix)]
            Self::Unix { path, .. } => remove_socket_file(path),
        }
    }
}

/// Listener bound to a socket endpoint but not yet accepting.
#[derive(Debug)]
pub struct SocketListener {
    endpoint: SocketEndpoint,
    socket: BoundSocket,
}

impl SocketListener {
    /// Binds `endpoint`. A socket file left behind by a server that is no
    /// longer running is removed first.
    ///
    /// # Errors
    ///
    /// Fails when the address cannot be resolved or bound, or when a live
    /// server already owns the Unix socket path.
    pub fn bind(endpoint: &SocketEndpoint) -> Result<Self, ListenerError> {
        let socket = match endpoint {
            SocketEndpoint::Tcp { host, port } => BoundSocket::Tcp(bind_tcp(host, *port)?),
            SocketEndpoint::Unix { path } => bind_unix(path)?,
        };
        Ok(Self {
            endpoint: endpoint.clone(),
            socket,
        })
    }

    /// The endpoint as configured.
    #[must_use]
    pub const fn endpoint(&self) -> &SocketEndpoint {
        &self.endpoint
    }

    /// Bound TCP address, including the port the OS picked for port `0`.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.tcp_addr()
    }

    /// Starts accepting clients on a background thread. Connects and
    /// disconnects are announced through `reporter`.
    ///
    /// # Errors
    ///
    /// Fails when the socket cannot be polled or the thread cannot start.
    pub fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Result<ListenerHandle, ListenerError> {
        if let Err(source) = self.socket.set_nonblocking() {
            self.socket.release();
            return Err(ListenerError::NonBlocking { source });
        }
        let stop = Arc::new(AtomicBool::new(false));
        let clients = Arc::new(ClientTracker::default());
        let accept_loop = AcceptLoop {
            listener: self,
            stop: Arc::clone(&stop),
            clients: Arc::clone(&clients),
            handler,
            reporter,
        };
        let accept = thread::Builder::new()
            .name("nrepl-accept".to_owned())
            .spawn(move || accept_loop.run())
            .map_err(|source| ListenerError::Spawn { source })?;
        Ok(ListenerHandle {
            stop,
            accept: Some(accept),
            clients,
        })
    }
}

/// Totals reported once the listener has wound down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerSummary {
    /// Clients accepted over the listener's lifetime.
    pub served: u64,
    /// Clients still connected when the grace period ran out.
    pub abandoned: usize,
}

/// Control over a running listener.
#[derive(Debug)]
pub struct ListenerHandle {
    stop: Arc<AtomicBool>,
    accept: Option<thread::JoinHandle<()>>,
    clients: Arc<ClientTracker>,
}

impl ListenerHandle {
    /// Stops accepting new clients. Connected clients keep being served.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Clients currently connected.
    #[must_use]
    pub fn live_clients(&self) -> usize {
        self.clients.live.load(Ordering::SeqCst)
    }

    /// Stops accepting, then gives connected clients up to `grace` to hang
    /// up. Clients still connected afterwards are left to their threads.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::AcceptPanicked`] when the accept thread
    /// panicked.
    pub fn finish(mut self, grace: Duration) -> Result<ListenerSummary, ListenerError> {
        self.stop();
        if let Some(accept) = self.accept.take() {
            accept.join().map_err(|_| ListenerError::AcceptPanicked)?;
        }
        let deadline = Instant::now() + grace;
        while self.live_clients() > 0 && Instant::now() < deadline {
            thread::sleep(DRAIN_POLL);
        }
        let summary = ListenerSummary {
            served: self.clients.served.load(Ordering::SeqCst),
            abandoned: self.live_clients(),
        };
        if summary.abandoned > 0 {
            warn!(
                target: LISTENER_TARGET,
                abandoned = summary.abandoned,
                "clients still connected after the grace period"
            );
        }
        Ok(summary)
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Live and lifetime client counts.
#[derive(Debug, Default)]
struct ClientTracker {
    live: AtomicUsize,
    served: AtomicU64,
}

/// Keeps one client counted as live until dropped.
struct ClientSlot {
    clients: Arc<ClientTracker>,
    reporter: Arc<dyn HealthReporter>,
    peer: String,
}

impl ClientSlot {
    fn claim(clients: &Arc<ClientTracker>, reporter: &Arc<dyn HealthReporter>, peer: &str) -> Self {
        let live = clients.live.fetch_add(1, Ordering::SeqCst) + 1;
        clients.served.fetch_add(1, Ordering::SeqCst);
        reporter.client_connected(peer, live);
        Self {
            clients: Arc::clone(clients),
            reporter: Arc::clone(reporter),
            peer: peer.to_owned(),
        }
    }
}

impl Drop for ClientSlot {
    fn drop(&mut self) {
        // Report before releasing the slot so a draining shutdown observes
        // the disconnect before it finishes.
        let remaining = self.clients.live.load(Ordering::SeqCst).saturating_sub(1);
        self.reporter.client_disconnected(&self.peer, remaining);
        self.clients.live.fetch_sub(1, Ordering::SeqCst);
    }
}

struct AcceptLoop {
    listener: SocketListener,
    stop: Arc<AtomicBool>,
    clients: Arc<ClientTracker>,
    handler: Arc<dyn ConnectionHandler>,
    reporter: Arc<dyn HealthReporter>,
}

impl AcceptLoop {
    fn run(self) {
        info!(
            target: LISTENER_TARGET,
            endpoint = %self.listener.endpoint,
            "accepting nREPL clients"
        );
        let mut last_failure = None::<io::ErrorKind>;
        while !self.stop.load(Ordering::SeqCst) {
            match self.listener.socket.poll_accept() {
                Ok(Some(stream)) => {
                    last_failure = None;
                    self.serve(stream);
                }
                Ok(None) => thread::sleep(IDLE_POLL),
                Err(error) => {
                    // Repeated failures of one kind are logged once.
                    if last_failure != Some(error.kind()) {
                        warn!(target: LISTENER_TARGET, %error, "accept failed");
                    }
                    last_failure = Some(error.kind());
                    thread::sleep(FAILED_ACCEPT_PAUSE);
                }
            }
        }
        self.listener.socket.release();
        debug!(target: LISTENER_TARGET, "accept loop stopped");
    }

    fn serve(&self, stream: ConnectionStream) {
        let slot = ClientSlot::claim(&self.clients, &self.reporter, stream.peer());
        let ordinal = self.clients.served.load(Ordering::SeqCst);
        let handler = Arc::clone(&self.handler);
        let spawned = thread::Builder::new()
            .name(format!("nrepl-client-{ordinal}"))
            .spawn(move || {
                let _slot = slot;
                handler.handle(stream);
            });
        if let Err(error) = spawned {
            warn!(target: LISTENER_TARGET, %error, "cannot spawn a client thread");
        }
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let addr = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?
        .next()
        .ok_or_else(|| ListenerError::NoAddress {
            host: host.to_owned(),
            port,
        })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::Bind {
        endpoint: addr.to_string(),
        source,
    })
}

#[cfg(unix)]
fn bind_unix(path: &Utf8Path) -> Result<BoundSocket, ListenerError> {
    reclaim_stale_socket(path)?;
    let listener = UnixListener::bind(path).map_err(|source| ListenerError::Bind {
        endpoint: path.to_string(),
        source,
    })?;
    Ok(BoundSocket::Unix {
        listener,
        path: path.to_owned(),
    })
}

#[cfg(not(unix))]
fn bind_unix(path: &Utf8Path) -> Result<BoundSocket, ListenerError> {
    Err(ListenerError::UnsupportedUnix {
        path: path.to_owned(),
    })
}

/// Clears `path` for binding when it holds a socket nobody answers on.
#[cfg(unix)]
fn reclaim_stale_socket(path: &Utf8Path) -> Result<(), ListenerError> {
    let reclaim = |source: io::Error| ListenerError::Reclaim {
        path: path.to_owned(),
        source,
    };
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(error) => return Err(reclaim(error)),
    };
    if !metadata.file_type().is_socket() {
        return Err(ListenerError::NotASocket {
            path: path.to_owned(),
        });
    }
    match UnixStream::connect(path) {
        Ok(_) => Err(ListenerError::SocketInUse {
            path: path.to_owned(),
        }),
        Err(error)
            if matches!(
                error.kind(),
                io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound
            ) =>
        {
            debug!(target: LISTENER_TARGET, %path, "removing stale socket file");
            fs::remove_file(path).map_err(reclaim)
        }
        Err(error) => Err(reclaim(error)),
    }
}

#[cfg(unix)]
fn remove_socket_file(path: &Utf8Path) {
    match fs::remove_file(path) {
        Err(error) if error.kind() != io::ErrorKind::NotFound => {
            warn!(target: LISTENER_TARGET, %error, %path, "cannot remove socket file");
        }
        _ => {}
    }
}
