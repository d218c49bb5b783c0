//! Accepted client connections and the trait that serves them.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::TcpStream;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// Byte stream both socket kinds provide.
trait Duplex: Read + Write + Send {}

impl<T: Read + Write + Send> Duplex for T {}

/// One nREPL client, over TCP or a Unix domain socket.
pub struct ConnectionStream {
    io: Box<dyn Duplex>,
    peer: String,
}

impl ConnectionStream {
    /// Label naming the client in logs and health events.
    #[must_use]
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

impl From<TcpStream> for ConnectionStream {
    fn from(stream: TcpStream) -> Self {
        let peer = stream
            .peer_addr()
            .map_or_else(|_| "tcp client".to_owned(), |addr| addr.to_string());
        Self {
            io: Box::new(stream),
            peer,
        }
    }
}

#[cfg(unix)]
impl From<UnixStream> for ConnectionStream {
    fn from(stream: UnixStream) -> Self {
        // Clients rarely bind their end, so the address is usually unnamed.
        let peer = stream
            .peer_addr()
            .ok()
            .and_then(|addr| addr.as_pathname().map(|path| path.display().to_string()))
            .unwrap_or_else(|| "unix client".to_owned());
        Self {
            io: Box::new(stream),
            peer,
        }
    }
}

impl fmt::Debug for ConnectionStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionStream")
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.io.read(buf)
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.io.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.io.flush()
    }
}

/// Serves one accepted client until it leaves.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Runs on the client's own thread. Must not panic.
    fn handle(&self, stream: ConnectionStream);
}
