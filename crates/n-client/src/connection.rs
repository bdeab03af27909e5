// SPDX-License-Identifier: MIT
//
// Server connection: background connect, non-blocking line I/O.
//
// Name resolution and `connect(2)` block, so they run on a helper thread.
// The finished stream comes back over an mpsc channel that the event loop
// polls with `try_recv` on each tick; everything after that (reading,
// framing, writing) happens on the loop thread with the socket in
// non-blocking mode.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use tracing::{debug, info, warn};

use crate::error::ConnectionError;
use crate::framer::{Framer, Line, ReadStatus};

/// Record terminator on the wire.
pub const CRLF: &str = "\r\n";

/// Where the client stands with its server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting { target: String },
    Connected { peer: Option<SocketAddr> },
}

impl ConnectionState {
    /// Short label for the title bar.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Disconnected => "disconnected".to_owned(),
            Self::Connecting { target } => format!("connecting to {target}"),
            Self::Connected { peer: Some(addr) } => format!("connected to {addr}"),
            Self::Connected { peer: None } => "connected".to_owned(),
        }
    }
}

// ─── Connector ───────────────────────────────────────────────────────────────

/// A connection attempt running on a helper thread.
#[derive(Debug)]
pub struct Connector {
    target: String,
    rx: Receiver<Result<TcpStream, ConnectionError>>,
}

impl Connector {
    /// Start resolving and connecting to `host:port` in the background.
    ///
    /// # Errors
    ///
    /// Returns an error if the helper thread cannot be spawned.
    pub fn spawn(host: &str, port: u16) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let target = format!("{host}:{port}");
        let owned_host = host.to_owned();

        thread::Builder::new()
            .name("connector".into())
            .spawn(move || {
                // The receiver may be gone if the app quit meanwhile.
                let _ = tx.send(connect(&owned_host, port));
            })?;

        info!(%target, "connecting");
        Ok(Self { target, rx })
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The attempt's result if it has finished, without blocking.
    pub fn poll(&self) -> Option<Result<Connection, ConnectionError>> {
        match self.rx.try_recv() {
            Ok(Ok(stream)) => Some(Connection::new(stream).map_err(ConnectionError::Io)),
            Ok(Err(err)) => Some(Err(err)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(ConnectionError::Io(io::Error::other(
                "connector thread exited without a result",
            )))),
        }
    }
}

/// Resolve `host` and try each address in turn.
fn connect(host: &str, port: u16) -> Result<TcpStream, ConnectionError> {
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ConnectionError::Resolve {
            host: host.to_owned(),
            source,
        })?;

    let mut last = None;
    for addr in addrs {
        debug!(%addr, "trying");
        match TcpStream::connect(addr) {
            Ok(stream) => return Ok(stream),
            Err(source) => last = Some(ConnectionError::Connect { addr, source }),
        }
    }

    Err(last.unwrap_or_else(|| ConnectionError::Resolve {
        host: host.to_owned(),
        source: io::Error::new(io::ErrorKind::NotFound, "no addresses"),
    }))
}

// ─── Connection ──────────────────────────────────────────────────────────────

/// An established, non-blocking connection.
///
/// Generic over the stream so tests can drive it without a socket.
#[derive(Debug)]
pub struct Connection<S = TcpStream> {
    stream: S,
    framer: Framer,
    /// Bytes queued but not yet accepted by the socket.
    outbox: Vec<u8>,
    peer: Option<SocketAddr>,
}

impl Connection<TcpStream> {
    /// Take ownership of a connected stream and switch it to non-blocking.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket options cannot be set.
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr().ok();
        info!(?peer, "connected");
        Ok(Self {
            peer,
            ..Self::from_stream(stream)
        })
    }
}

impl<S: Read + Write> Connection<S> {
    /// Wrap a stream that is already non-blocking (or a test double).
    pub fn from_stream(stream: S) -> Self {
        Self {
            stream,
            framer: Framer::new(),
            outbox: Vec::new(),
            peer: None,
        }
    }

    #[must_use]
    pub const fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Bytes still waiting to be written.
    #[must_use]
    pub fn pending_output(&self) -> usize {
        self.outbox.len()
    }

    /// Read once and return the lines that read completed.
    ///
    /// An empty batch means nothing was available. One read per call keeps
    /// each readiness notification to a single service; anything left in
    /// the kernel buffer makes the socket ready again on the next poll.
    ///
    /// # Errors
    ///
    /// [`ConnectionError::Closed`] when the peer hung up, or
    /// [`ConnectionError::Io`] for a hard socket error. Either way the
    /// connection is finished and should be dropped.
    pub fn receive(&mut self) -> Result<Vec<Line>, ConnectionError> {
        let feed = self.framer.read_from(&mut self.stream)?;
        match feed.status {
            ReadStatus::Closed => {
                self.framer.reset();
                Err(ConnectionError::Closed)
            }
            ReadStatus::Data(_) | ReadStatus::WouldBlock => Ok(feed.lines),
        }
    }

    /// Queue `text` as one record and write as much as the socket takes.
    ///
    /// Embedded CR and LF would split the record, so they become spaces.
    ///
    /// # Errors
    ///
    /// See [`flush`](Self::flush).
    pub fn send_line(&mut self, text: &str) -> Result<(), ConnectionError> {
        self.outbox.extend(
            text.bytes()
                .map(|b| if b == b'\r' || b == b'\n' { b' ' } else { b }),
        );
        self.outbox.extend_from_slice(CRLF.as_bytes());
        self.flush().map(|_| ())
    }

    /// Write queued bytes until the socket would block. Returns how many
    /// bytes went out.
    ///
    /// # Errors
    ///
    /// [`ConnectionError::Closed`] if the socket accepts nothing, or
    /// [`ConnectionError::Io`] on a write error.
    pub fn flush(&mut self) -> Result<usize, ConnectionError> {
        let mut sent = 0;
        while !self.outbox.is_empty() {
            match self.stream.write(&self.outbox) {
                Ok(0) => return Err(ConnectionError::Closed),
                Ok(n) => {
                    self.outbox.drain(..n);
                    sent += n;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    debug!(queued = self.outbox.len(), "socket full");
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!(error = %e, "write failed");
                    return Err(e.into());
                }
            }
        }
        Ok(sent)
    }
}

#[cfg(unix)]
impl<S: std::os::fd::AsRawFd> std::os::fd::AsRawFd for Connection<S> {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        self.stream.as_raw_fd()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
