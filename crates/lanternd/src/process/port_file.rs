//! The `.nrepl-port` file editors read to find the server.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;
use tracing::{info, warn};

use super::PROCESS_TARGET;
use super::errors::LaunchError;

/// Owns a written port file and removes it on drop.
#[derive(Debug)]
pub(super) struct PortFile {
    path: Utf8PathBuf,
}

impl PortFile {
    /// Writes `port` in decimal, without a trailing newline.
    pub(super) fn write(path: &Utf8Path, port: u16) -> Result<Self, LaunchError> {
        atomic_write(path.as_std_path(), port.to_string().as_bytes()).map_err(|source| {
            LaunchError::PortFile {
                path: path.to_path_buf(),
                source,
            }
        })?;
        info!(
            target: PROCESS_TARGET,
            port,
            file = %path,
            "port file written"
        );
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Where the port was written.
    pub(super) fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Drop for PortFile {
    fn drop(&mut self) {
        match fs::remove_file(self.path.as_std_path()) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => {
                warn!(
                    target: PROCESS_TARGET,
                    file = %self.path,
                    error = %error,
                    "failed to remove port file"
                );
            }
            _ => {}
        }
    }
}

/// Writes `contents` through a temporary file renamed into place, so
/// editors never read a half-written port.
fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut builder = Builder::new();
    builder.prefix(
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("nrepl-port"),
    );
    let mut file = builder.tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}
