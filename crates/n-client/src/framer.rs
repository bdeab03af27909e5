// SPDX-License-Identifier: MIT
//
// Stream framing: CRLF-delimited records out of an arbitrary byte stream.
//
// A TCP read returns whatever the kernel has: half a line, forty lines, a
// line whose `\r` ends one read and whose `\n` starts the next. The framer
// stages bytes in a fixed buffer and hands back every complete record in
// arrival order, keeping the unfinished tail for the next read.
//
// The staging buffer never grows past `STAGING_CAPACITY`. A record that does
// not fit (with its delimiter) is an overflow: the staged bytes are thrown
// away and the framer skips input up to and including the next `\r\n`, so no
// fragment of the oversized record is ever emitted as if it were a line.

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Read};

use tracing::{debug, warn};

/// Bytes the framer can hold while waiting for a delimiter.
pub const STAGING_CAPACITY: usize = 8192;

const CR: u8 = b'\r';
const LF: u8 = b'\n';

// ─── Line ────────────────────────────────────────────────────────────────────

/// One record, delimiter stripped. The framer does not interpret the bytes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Line(Vec<u8>);

impl Line {
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The record as text; invalid UTF-8 becomes U+FFFD.
    #[must_use]
    pub fn to_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<&[u8]> for Line {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<&str> for Line {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line({:?})", self.to_text())
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

// ─── Read status ─────────────────────────────────────────────────────────────

/// What the last read from the source did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// `n > 0` bytes were read.
    Data(usize),
    /// Nothing available right now. Not an error.
    WouldBlock,
    /// The peer closed the stream.
    Closed,
}

/// Result of [`Framer::read_from`]: the lines completed by this read and
/// what the read itself reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub lines: Vec<Line>,
    pub status: ReadStatus,
}

// ─── Framer ──────────────────────────────────────────────────────────────────

/// Bounded CRLF framer.
///
/// ```
/// use n_client::framer::{Framer, Line};
///
/// let mut framer = Framer::new();
/// assert_eq!(framer.feed(b"foo\r\nbar\r"), vec![Line::from("foo")]);
/// assert_eq!(framer.feed(b"\nbaz"), vec![Line::from("bar")]);
/// assert_eq!(framer.pending(), b"baz");
/// ```
#[derive(Debug)]
pub struct Framer {
    staging: Vec<u8>,
    /// Discarding input until the next delimiter after an overflow.
    resync: bool,
    /// In resync, the last discarded byte was `\r`.
    resync_cr: bool,
    overflows: u64,
}

impl Framer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            staging: Vec::with_capacity(STAGING_CAPACITY),
            resync: false,
            resync_cr: false,
            overflows: 0,
        }
    }

    /// Bytes staged but not yet part of a complete line.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.staging
    }

    /// How many oversized records have been dropped.
    #[inline]
    #[must_use]
    pub const fn overflows(&self) -> u64 {
        self.overflows
    }

    /// Whether the framer is skipping the rest of an oversized record.
    #[inline]
    #[must_use]
    pub const fn is_resyncing(&self) -> bool {
        self.resync
    }

    /// Forget staged bytes and any resync in progress.
    pub fn reset(&mut self) {
        self.staging.clear();
        self.resync = false;
        self.resync_cr = false;
    }

    /// Stage `bytes` and return every line they complete, oldest first.
    ///
    /// Input larger than the free staging space is taken in steps, so the
    /// buffer never exceeds [`STAGING_CAPACITY`].
    pub fn feed(&mut self, mut bytes: &[u8]) -> Vec<Line> {
        let mut lines = Vec::new();

        while !bytes.is_empty() {
            if self.resync {
                bytes = self.skip_record(bytes);
                continue;
            }

            let room = STAGING_CAPACITY - self.staging.len();
            let (head, tail) = bytes.split_at(room.min(bytes.len()));
            // A delimiter may straddle the old tail and the new bytes.
            let scan_from = self.staging.len().saturating_sub(1);
            self.staging.extend_from_slice(head);
            bytes = tail;

            self.extract(scan_from, &mut lines);

            if self.staging.len() == STAGING_CAPACITY {
                self.overflow();
            }
        }

        lines
    }

    /// Read once from `src` and frame what arrived.
    ///
    /// `WouldBlock` is a status, not an error. An interrupted read is
    /// retried once and then reported as `WouldBlock`.
    ///
    /// # Errors
    ///
    /// Any other I/O error from `src`.
    pub fn read_from(&mut self, src: &mut impl Read) -> io::Result<Feed> {
        let mut buf = [0u8; STAGING_CAPACITY];
        // Never read more than staging can take in one step.
        let room = (STAGING_CAPACITY - self.staging.len()).max(1);
        let buf = &mut buf[..room];

        let mut retried = false;
        let n = loop {
            match src.read(buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(Feed {
                        lines: Vec::new(),
                        status: ReadStatus::WouldBlock,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted && !retried => retried = true,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    return Ok(Feed {
                        lines: Vec::new(),
                        status: ReadStatus::WouldBlock,
                    });
                }
                Err(e) => return Err(e),
            }
        };

        if n == 0 {
            debug!(pending = self.staging.len(), "stream closed");
            return Ok(Feed {
                lines: Vec::new(),
                status: ReadStatus::Closed,
            });
        }

        Ok(Feed {
            lines: self.feed(&buf[..n]),
            status: ReadStatus::Data(n),
        })
    }

    /// Move every complete record out of staging.
    fn extract(&mut self, scan_from: usize, lines: &mut Vec<Line>) {
        let mut start = 0;
        let mut i = scan_from;
        while i + 1 < self.staging.len() {
            if self.staging[i] == CR && self.staging[i + 1] == LF {
                lines.push(Line(self.staging[start..i].to_vec()));
                start = i + 2;
                i = start;
            } else {
                i += 1;
            }
        }
        if start > 0 {
            self.staging.drain(..start);
        }
    }

    fn overflow(&mut self) {
        self.overflows += 1;
        warn!(
            capacity = STAGING_CAPACITY,
            total = self.overflows,
            "record exceeds staging buffer; discarding until next delimiter"
        );
        self.resync_cr = self.staging.last() == Some(&CR);
        self.staging.clear();
        self.resync = true;
    }

    /// Drop bytes through the next delimiter. Returns what follows it.
    fn skip_record<'a>(&mut self, bytes: &'a [u8]) -> &'a [u8] {
        if self.resync_cr && bytes.first() == Some(&LF) {
            self.end_resync();
            return &bytes[1..];
        }
        if let Some(pos) = bytes.windows(2).position(|w| w == [CR, LF]) {
            self.end_resync();
            return &bytes[pos + 2..];
        }
        self.resync_cr = bytes.last() == Some(&CR);
        &[]
    }

    fn end_resync(&mut self) {
        debug!("resynchronized after overflow");
        self.resync = false;
        self.resync_cr = false;
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
