//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;

use lantern_config::{Config, SocketEndpoint};

use crate::bootstrap::ConfigLoader;

/// Loader binding an ephemeral loopback port and writing the port file
/// into a private temporary directory.
#[derive(Clone)]
pub struct TestConfigLoader {
    dir: Arc<TempDir>,
    port_file: Utf8PathBuf,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory");
        let port_file = Utf8PathBuf::from_path_buf(dir.path().join(".nrepl-port"))
            .expect("temporary path was not valid UTF-8");
        Self {
            dir: Arc::new(dir),
            port_file,
        }
    }

    /// Points the port file into a directory that does not exist.
    #[must_use]
    pub fn with_missing_port_directory(mut self) -> Self {
        self.port_file = Utf8PathBuf::from_path_buf(self.dir.path().join("absent/.nrepl-port"))
            .expect("temporary path was not valid UTF-8");
        self
    }

    /// Where the daemon is told to write its port.
    #[must_use]
    pub fn port_file(&self) -> &Utf8PathBuf {
        &self.port_file
    }
}

impl Default for TestConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            listen: SocketEndpoint::tcp("127.0.0.1", 0),
            port_file: self.port_file.clone(),
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing an unusable endpoint on the
/// command line.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("lanternd"),
            OsString::from("--listen"),
            OsString::from("invalid://endpoint"),
        ];
        Config::load_from_iter(args)
    }
}
