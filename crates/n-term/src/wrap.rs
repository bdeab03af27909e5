// SPDX-License-Identifier: MIT
//
// Line wrapping for styled, multi-byte chat text.
//
// Turns one message string into display rows of at most `width` visible
// columns. The input is already "rendered": it carries its own SGR escape
// sequences for nick colors, highlights and the like. The wrapper must
//
//   - never count an escape sequence toward the width,
//   - never split a codepoint across rows,
//   - re-establish the active style at the start of every continuation row,
//   - close every row with SGR 0 so no color bleeds into the chrome that is
//     drawn after it,
//   - terminate on any input, including truncated or garbage escapes.
//
// Escape handling:
//
//   ESC [ params m        SGR: kept verbatim in the row, folded into Style
//   ESC [ params <final>  other CSI: consumed and dropped (cursor motion or
//                         erase codes inside a message would wreck the layout)
//   anything else         malformed: the ESC byte alone is dropped and the
//                         bytes after it are ordinary text
//   other C0 bytes, DEL   shown as their Control Pictures glyph (CR as U+240D
//                         and so on); a raw CR or TAB would move the cursor
//                         and a raw BEL rings the bell
//
// "Ordinary text" is counted as one column per codepoint. A chat line is
// not a terminal emulator: wide glyphs are rare and the width guarantee we
// care about is the one the compositor relies on (row count = ceil(L / W)).

use std::fmt;

use crate::ansi;
use crate::style::Style;

/// Longest CSI sequence we will look through for a final byte.
///
/// Real SGR sequences are short (`ESC[38;2;255;255;255m` is 19 bytes).
/// Bounding the lookahead keeps a stray `ESC[` followed by a wall of digits
/// from being swallowed whole.
pub const MAX_ESCAPE_LEN: usize = 32;

const ESC: u8 = 0x1B;

// ─── WrappedLine ─────────────────────────────────────────────────────────────

/// One display-ready row: carried style prefix + content + SGR reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedLine {
    text: String,
    columns: usize,
}

impl WrappedLine {
    /// The full row, escape sequences included.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of visible columns the row occupies.
    #[inline]
    #[must_use]
    pub const fn columns(&self) -> usize {
        self.columns
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for WrappedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// ─── Scanning ────────────────────────────────────────────────────────────────

/// What starts at a given byte offset.
enum Token {
    /// A complete SGR sequence ending at the given offset (exclusive).
    Sgr { end: usize },
    /// A complete non-SGR CSI sequence ending at the given offset.
    Control { end: usize },
    /// An ESC that does not introduce a well-formed sequence.
    StrayEscape,
    /// One visible codepoint.
    Char(char),
}

fn scan(text: &str, pos: usize) -> Option<Token> {
    let bytes = text.as_bytes();
    let first = *bytes.get(pos)?;

    if first != ESC {
        return text[pos..].chars().next().map(Token::Char);
    }

    if bytes.get(pos + 1) != Some(&b'[') {
        return Some(Token::StrayEscape);
    }

    let limit = (pos + MAX_ESCAPE_LEN).min(bytes.len());
    for (i, &b) in bytes.iter().enumerate().take(limit).skip(pos + 2) {
        match b {
            0x20..=0x3F => {}
            b'm' => return Some(Token::Sgr { end: i + 1 }),
            0x40..=0x7E => return Some(Token::Control { end: i + 1 }),
            _ => return Some(Token::StrayEscape),
        }
    }

    // Ran out of input or lookahead before a final byte.
    Some(Token::StrayEscape)
}

/// Count the visible columns of `text` under the same rules as [`wrap`].
#[must_use]
pub fn visible_width(text: &str) -> usize {
    let mut pos = 0;
    let mut columns = 0;
    while let Some(token) = scan(text, pos) {
        pos = match token {
            Token::Sgr { end } | Token::Control { end } => end,
            Token::StrayEscape => pos + 1,
            Token::Char(ch) => {
                columns += 1;
                pos + ch.len_utf8()
            }
        };
    }
    columns
}

/// The character painted for `ch`: C0 controls and DEL map to their
/// Control Pictures glyph, everything else is itself.
#[must_use]
pub fn printable(ch: char) -> char {
    match u32::from(ch) {
        c @ 0x00..=0x1F => char::from_u32(0x2400 + c).unwrap_or(char::REPLACEMENT_CHARACTER),
        0x7F => '\u{2421}',
        _ => ch,
    }
}

// ─── Wrapping ────────────────────────────────────────────────────────────────

/// Accumulates the row being built.
struct Row {
    /// Style in effect when this row started.
    carried: Style,
    content: String,
    columns: usize,
}

impl Row {
    const fn new(carried: Style) -> Self {
        Self {
            carried,
            content: String::new(),
            columns: 0,
        }
    }

    fn finish(self, first: bool) -> WrappedLine {
        let prefix = if first || self.carried.is_plain() {
            String::new()
        } else {
            ansi::sgr_string(&self.carried)
        };
        let mut text = String::with_capacity(prefix.len() + self.content.len() + ansi::RESET.len());
        text.push_str(&prefix);
        text.push_str(&self.content);
        text.push_str(ansi::RESET);
        WrappedLine {
            text,
            columns: self.columns,
        }
    }
}

/// Wrap `text` into rows of at most `width` visible columns.
///
/// Rows after the first begin with the style that was active where the
/// previous row ended; every row ends with `ESC[0m`. Text with no visible
/// columns, or a zero width, yields no rows.
///
/// ```
/// use n_term::wrap::wrap;
///
/// let rows = wrap("\x1b[32mHello World\x1b[0m", 5);
/// assert_eq!(rows.len(), 3);
/// assert!(rows[1].as_str().starts_with("\x1b[32m"));
/// assert!(rows.iter().all(|r| r.as_str().ends_with("\x1b[0m")));
/// ```
#[must_use]
pub fn wrap(text: &str, width: usize) -> Vec<WrappedLine> {
    let mut lines = Vec::new();
    if width == 0 {
        return lines;
    }

    let mut active = Style::default();
    let mut row = Row::new(active);
    let mut pos = 0;

    while let Some(token) = scan(text, pos) {
        match token {
            Token::Sgr { end } => {
                row.content.push_str(&text[pos..end]);
                // Params sit between `ESC [` and the final `m`.
                active.apply_sgr(&text.as_bytes()[pos + 2..end - 1]);
                pos = end;
            }
            Token::Control { end } => pos = end,
            Token::StrayEscape => pos += 1,
            Token::Char(ch) => {
                if row.columns == width {
                    let done = std::mem::replace(&mut row, Row::new(active));
                    lines.push(done.finish(lines.is_empty()));
                }
                row.content.push(printable(ch));
                row.columns += 1;
                pos += ch.len_utf8();
            }
        }
    }

    if row.columns > 0 {
        lines.push(row.finish(lines.is_empty()));
    }

    lines
}

// ─── Tests ───────────────────────────────────────────────────────────────────
