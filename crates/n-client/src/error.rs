// SPDX-License-Identifier: MIT
//
// Connection errors.
//
// Only failures the loop must react to are errors. A socket with nothing to
// read is `ReadStatus::WouldBlock` and never reaches this type; a framing
// overflow is handled inside the framer and only logged.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Why a connection attempt or an established connection failed.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The peer closed the stream (a zero-length read).
    #[error("connection closed by peer")]
    Closed,

    /// A hard I/O failure on an established connection.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// The host name did not resolve to any address.
    #[error("cannot resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: io::Error,
    },

    /// Every resolved address refused or timed out; `addr` is the last one tried.
    #[error("cannot connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

impl ConnectionError {
    /// Whether the peer went away cleanly rather than failing.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn messages_name_the_target() {
        let err = ConnectionError::Resolve {
            host: "irc.invalid".into(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such host"),
        };
        assert_eq!(err.to_string(), "cannot resolve irc.invalid: no such host");

        let addr: SocketAddr = "127.0.0.1:6667".parse().unwrap();
        let err = ConnectionError::Connect {
            addr,
            source: io::ErrorKind::ConnectionRefused.into(),
        };
        assert!(err.to_string().starts_with("cannot connect to 127.0.0.1:6667: "));
    }

    #[test]
    fn io_errors_convert() {
        let err: ConnectionError = io::Error::from(io::ErrorKind::BrokenPipe).into();
        assert!(matches!(err, ConnectionError::Io(_)));
        assert!(!err.is_closed());
        assert!(ConnectionError::Closed.is_closed());
    }
}
