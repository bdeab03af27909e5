// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions that write escape sequences to any `impl Write`. No state,
// no decisions about when to emit. This module just knows the byte-level
// encoding of every terminal command the client needs.
//
// All cursor positions are 0-indexed in our API and converted to 1-indexed
// for the terminal (ANSI standard uses 1-based coordinates).
//
// All functions return `io::Result` propagated from the underlying writer.
// In practice they never fail when writing to `OutputBuffer` (backed by a Vec).
use std::io::{self, Write};

use crate::style::{Attr, Color, Style};

/// SGR 0 as a string, for callers composing display strings by hand.
pub const RESET: &str = "\x1b[0m";

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to `(x, y)` using the CUP (Cursor Position) sequence.
///
/// Our coordinates are 0-indexed; ANSI CUP is 1-indexed.
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", y + 1, x + 1)
}

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Clear the entire screen (ED 2).
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Clear the whole line the cursor is on (EL 2).
#[inline]
pub fn clear_line(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2K")
}

/// Reset all SGR attributes to terminal defaults (SGR 0).
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(RESET.as_bytes())
}

// ─── Style ───────────────────────────────────────────────────────────────────

/// Emit a [`Style`] as a single SGR sequence.
///
/// Uses compact codes for standard colors (30–37, 90–97 and their
/// background twins), the 256-color form for palette indices 16–255, and
/// 24-bit `TrueColor` for RGB. A plain style writes nothing: callers that
/// need a clean slate should [`reset`] first.
pub fn sgr(w: &mut impl Write, style: &Style) -> io::Result<()> {
    if style.is_plain() {
        return Ok(());
    }

    const ATTR_CODES: [(Attr, &str); 9] = [
        (Attr::BOLD, "1"),
        (Attr::DIM, "2"),
        (Attr::ITALIC, "3"),
        (Attr::UNDERLINE, "4"),
        (Attr::SLOW_BLINK, "5"),
        (Attr::RAPID_BLINK, "6"),
        (Attr::INVERSE, "7"),
        (Attr::HIDDEN, "8"),
        (Attr::STRIKETHROUGH, "9"),
    ];

    let mut codes: Vec<String> = Vec::with_capacity(4);
    for (flag, code) in ATTR_CODES {
        if style.attrs.contains(flag) {
            codes.push(code.to_owned());
        }
    }

    if let Some(code) = color_code(style.fg, 30, 90, 38) {
        codes.push(code);
    }
    if let Some(code) = color_code(style.bg, 40, 100, 48) {
        codes.push(code);
    }

    write!(w, "\x1b[{}m", codes.join(";"))
}

/// Encode one color. `base` is the 0–7 code, `bright` the 8–15 code,
/// `extended` the 38/48 introducer.
fn color_code(color: Color, base: u16, bright: u16, extended: u16) -> Option<String> {
    match color {
        Color::Default => None,
        Color::Ansi256(idx) if idx < 8 => Some((base + u16::from(idx)).to_string()),
        Color::Ansi256(idx) if idx < 16 => Some((bright + u16::from(idx) - 8).to_string()),
        Color::Ansi256(idx) => Some(format!("{extended};5;{idx}")),
        Color::Rgb(r, g, b) => Some(format!("{extended};2;{r};{g};{b}")),
    }
}

/// Render a style to an owned string (used for wrap prefixes).
#[must_use]
pub fn sgr_string(style: &Style) -> String {
    let mut out = Vec::new();
    // Writing to a Vec cannot fail.
    let _ = sgr(&mut out, style);
    String::from_utf8(out).unwrap_or_default()
}

// ─── Synchronized Output ─────────────────────────────────────────────────────

/// Begin synchronized output (DEC Private Mode 2026).
///
/// Tells the terminal to buffer all subsequent output until [`end_sync`].
/// A full redraw then appears in one step instead of flickering through a
/// cleared screen. Terminals without support ignore it.
#[inline]
pub fn begin_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026h")
}

/// End synchronized output; the terminal renders the buffered frame.
#[inline]
pub fn end_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026l")
}

// ─── Alternate Screen ───────────────────────────────────────────────────────

/// Enter the alternate screen buffer (DEC Private Mode 1049).
#[inline]
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

/// Exit the alternate screen buffer and restore original content.
#[inline]
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

// ─── Bracketed Paste ────────────────────────────────────────────────────────

/// Enable bracketed paste mode (DEC 2004).
///
/// Pasted text is wrapped with `\x1b[200~` / `\x1b[201~` so a multi-line
/// paste lands in the prompt instead of sending one message per line.
#[inline]
pub fn enable_bracketed_paste(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2004h")
}

/// Disable bracketed paste mode.
#[inline]
pub fn disable_bracketed_paste(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2004l")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
