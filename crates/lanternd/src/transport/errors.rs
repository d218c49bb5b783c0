//! Failures raised while binding or running the nREPL listener.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Why the listener could not start or stop cleanly.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The configured host name did not resolve.
    #[error("cannot resolve {host}:{port}: {source}")]
    Resolve {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
        /// Resolver failure.
        #[source]
        source: io::Error,
    },
    /// The host resolved, but to no address at all.
    #[error("{host}:{port} resolved to no addresses")]
    NoAddress {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
    },
    /// The operating system refused the bind.
    #[error("cannot bind {endpoint}: {source}")]
    Bind {
        /// Address or socket path, as printed.
        endpoint: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// A live server already answers on the socket path.
    #[error("another nREPL server is listening on {path}")]
    SocketInUse {
        /// Contested socket path.
        path: Utf8PathBuf,
    },
    /// Something other than a socket occupies the socket path.
    #[error("{path} exists and is not a socket")]
    NotASocket {
        /// Occupied path.
        path: Utf8PathBuf,
    },
    /// Inspecting or removing a leftover socket file failed.
    #[error("cannot reclaim socket path {path}: {source}")]
    Reclaim {
        /// Leftover socket path.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// Unix sockets were configured on a platform without them.
    #[error("unix sockets are unavailable on this platform ({path})")]
    UnsupportedUnix {
        /// Configured socket path.
        path: Utf8PathBuf,
    },
    /// The socket could not be polled without blocking.
    #[error("cannot switch the listener to non-blocking mode: {source}")]
    NonBlocking {
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The accept thread could not be started.
    #[error("cannot spawn the accept thread: {source}")]
    Spawn {
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The accept thread panicked.
    #[error("the accept thread panicked")]
    AcceptPanicked,
}
