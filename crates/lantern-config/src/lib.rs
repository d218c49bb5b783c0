//! Shared configuration for the Lantern nREPL daemon.
//!
//! [`Config`] is layered by `ortho_config`: built-in defaults, then a TOML
//! file (`--config-path` or `LANTERN_CONFIG_PATH`), then `LANTERN_*`
//! environment variables, then command-line flags. Later layers win.
//!
//! ```text
//! lanternd --listen tcp://127.0.0.1:7888 --log-filter lanternd=debug
//! LANTERN_LOG_FORMAT=json lanternd
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;
mod socket;

pub use defaults::{
    DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_PORT, DEFAULT_PORT_FILE, default_listen_endpoint,
    default_log_filter, default_log_filter_string, default_log_format, default_port_file,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{SocketEndpoint, SocketParseError, SocketPreparationError};

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "LANTERN")]
pub struct Config {
    /// Endpoint the nREPL server binds.
    #[ortho_config(default = default_listen_endpoint())]
    pub listen: SocketEndpoint,
    /// `tracing` filter directive, e.g. `info` or `lanternd=debug`.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// File receiving the bound TCP port. An empty path disables it.
    #[ortho_config(default = default_port_file())]
    pub port_file: Utf8PathBuf,
}

impl Config {
    /// Endpoint the nREPL server binds.
    #[must_use]
    pub const fn listen(&self) -> &SocketEndpoint {
        &self.listen
    }

    /// Log filter directive.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Port file location, or `None` when writing it is disabled.
    #[must_use]
    pub fn port_file(&self) -> Option<&Utf8Path> {
        if self.port_file.as_str().is_empty() {
            None
        } else {
            Some(self.port_file.as_path())
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen_endpoint(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            port_file: default_port_file(),
        }
    }
}
