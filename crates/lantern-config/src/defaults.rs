use camino::Utf8PathBuf;

use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// Loopback address the server binds by default.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default TCP port; `0` lets the operating system pick a free one.
pub const DEFAULT_PORT: u16 = 0;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// File that editors read to discover the server's port.
pub const DEFAULT_PORT_FILE: &str = ".nrepl-port";

/// Default log filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value for serde and the configuration derive.
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::default()
}

/// Endpoint the server listens on when nothing else is configured.
#[must_use]
pub fn default_listen_endpoint() -> SocketEndpoint {
    SocketEndpoint::tcp(DEFAULT_HOST, DEFAULT_PORT)
}

/// Location of the port file relative to the working directory.
#[must_use]
pub fn default_port_file() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_PORT_FILE)
}
