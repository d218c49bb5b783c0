//! Waiting for the signal that ends a daemon run.

use std::io;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Signals that stop the server. Editors usually send SIGTERM or SIGHUP
/// when they close the REPL buffer; SIGINT covers a terminal Ctrl-C.
const STOP_SIGNALS: [i32; 4] = [SIGTERM, SIGINT, SIGHUP, SIGQUIT];

/// Blocks the launching thread while the server runs.
pub trait ShutdownSignal: Send + Sync {
    /// Returns once the server should stop.
    ///
    /// # Errors
    ///
    /// Fails when the notification source cannot be set up.
    fn wait(&self) -> Result<(), ShutdownError>;
}

/// Why the stop signal could not be awaited.
#[derive(Debug, Error)]
#[error("cannot register handlers for termination signals: {source}")]
pub struct ShutdownError {
    #[source]
    source: io::Error,
}

/// Waits for the first of [`STOP_SIGNALS`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl SystemShutdownSignal {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let mut signals = Signals::new(STOP_SIGNALS).map_err(|source| ShutdownError { source })?;
        if let Some(signal) = signals.forever().next() {
            info!(
                target: PROCESS_TARGET,
                signal = signal_name(signal),
                "stopping on signal"
            );
        }
        Ok(())
    }
}

fn signal_name(signal: i32) -> &'static str {
    match signal {
        SIGTERM => "SIGTERM",
        SIGINT => "SIGINT",
        SIGHUP => "SIGHUP",
        SIGQUIT => "SIGQUIT",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(SIGTERM, "SIGTERM")]
    #[case(SIGHUP, "SIGHUP")]
    #[case(0, "unknown")]
    fn stop_signals_are_named_in_logs(#[case] signal: i32, #[case] name: &str) {
        assert_eq!(signal_name(signal), name);
    }
}
