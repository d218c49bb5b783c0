//! Everything that can stop `run_daemon` from serving or shutting down.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::transport::ListenerError;

use super::shutdown::ShutdownError;

/// Why the daemon run ended in failure.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The engine never got ready.
    #[error("cannot start the nREPL server: {0}")]
    Bootstrap(#[from] BootstrapError),
    /// The endpoint could not be bound or served.
    #[error("cannot accept nREPL clients: {0}")]
    Listener(#[from] ListenerError),
    /// Editors could not be told which port to use.
    #[error("cannot write port file {path}: {source}")]
    PortFile {
        /// Configured port file.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// Termination signals could not be watched.
    #[error("cannot wait for a shutdown signal: {0}")]
    Shutdown(#[from] ShutdownError),
}
