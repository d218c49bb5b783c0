//! Process-wide `tracing` subscriber for the daemon.
//!
//! Logs always go to stderr. Responses only ever travel over the client
//! socket, and stdout is often a pipe owned by the editor that spawned the
//! server.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::Subscriber;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;

use lantern_config::{Config, LogFormat};

static INSTALLED: OnceCell<LogFormat> = OnceCell::new();

/// Describes the subscriber installed for this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Format chosen by the first configuration that installed logging.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }
}

/// Why logging could not start.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The filter directive did not parse.
    #[error("log filter {directive:?} does not parse: {reason}")]
    Filter {
        /// Directive as configured.
        directive: String,
        /// Parser message.
        reason: String,
    },
    /// Something else already owns the global subscriber.
    #[error("another tracing subscriber is already installed")]
    AlreadyInstalled(#[source] SetGlobalDefaultError),
}

/// Installs the global subscriber on first use.
///
/// Later calls leave the installed subscriber alone and describe it, so
/// bootstrapping twice in one process is harmless.
///
/// # Errors
///
/// Fails when the filter directive does not parse or a foreign subscriber
/// is already installed.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED
        .get_or_try_init(|| install(config))
        .map(|&format| TelemetryHandle { format })
}

fn parse_filter(directive: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directive).map_err(|error| TelemetryError::Filter {
        directive: directive.to_owned(),
        reason: error.to_string(),
    })
}

fn install(config: &Config) -> Result<LogFormat, TelemetryError> {
    let format = config.log_format();
    let base = tracing_subscriber::fmt()
        .with_env_filter(parse_filter(config.log_filter())?)
        .with_thread_names(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(UtcTime::rfc_3339());
    match format {
        LogFormat::Json => install_global(base.json().flatten_event(true).finish())?,
        LogFormat::Compact => install_global(base.compact().finish())?,
    }
    Ok(format)
}

fn install_global<S>(subscriber: S) -> Result<(), TelemetryError>
where
    S: Subscriber + Send + Sync + 'static,
{
    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::AlreadyInstalled)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("lanternd=[")]
    fn unparseable_filters_keep_the_directive(#[case] directive: &str) {
        match parse_filter(directive) {
            Err(TelemetryError::Filter { directive: kept, .. }) => assert_eq!(kept, directive),
            other => panic!("expected a filter error, got {other:?}"),
        }
    }

    #[rstest]
    #[case("info")]
    #[case("lanternd::dispatch=debug,warn")]
    fn per_target_filters_parse(#[case] directive: &str) {
        assert!(parse_filter(directive).is_ok());
    }
}
