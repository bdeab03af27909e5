// SPDX-License-Identifier: MIT
//
// Frame output.
//
//   OutputBuffer: accumulates all ANSI bytes for one frame in memory so the
//   whole frame reaches the terminal in a single write() call.
//
//   Screen: a row-oriented painter on top of the buffer. A chat screen is
//   a stack of full-width rows (title, message lines, separator, prompt),
//   so instead of diffing a cell grid we repaint every row of every frame:
//   move to the row, erase it, write the pre-styled text, reset SGR. The
//   frame is wrapped in synchronized output so the terminal swaps it in at
//   once.
//
// Writes into the buffer cannot fail (it is a Vec), so the painter methods
// discard the `io::Result` of the ANSI helpers with `.ok()`. Only the final
// flush to the terminal reports errors.

use std::io::{self, Write};

use unicode_width::UnicodeWidthChar;

use crate::ansi;
use crate::style::Style;
use crate::terminal::Size;

// ─── OutputBuffer ────────────────────────────────────────────────────────────

/// A byte buffer that accumulates ANSI output for a single `write()` syscall.
///
/// Default capacity: 16 KB, which covers a full-screen chat frame.
pub struct OutputBuffer {
    buf: Vec<u8>,
}

const DEFAULT_CAPACITY: usize = 16_384;

impl OutputBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(DEFAULT_CAPACITY),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The accumulated bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Append a string verbatim.
    #[inline]
    pub fn push_str(&mut self, s: &str) {
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Clear the buffer for reuse (keeps allocated capacity).
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Write accumulated output to stdout and clear the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to stdout fails.
    pub fn flush_stdout(&mut self) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        self.flush_to(&mut stdout)
    }

    /// Write accumulated output to an arbitrary writer and clear the buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if !self.buf.is_empty() {
            w.write_all(&self.buf)?;
            w.flush()?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Real flushing happens in flush_stdout() / flush_to().
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Screen ──────────────────────────────────────────────────────────────────

/// Full-redraw row painter.
///
/// ```
/// use n_term::output::Screen;
/// use n_term::terminal::Size;
///
/// let mut screen = Screen::new(Size { cols: 20, rows: 5 });
/// screen.begin_frame();
/// screen.line(0, "hello\x1b[0m");
/// let mut out = Vec::new();
/// screen.finish_to(&mut out, None)?;
/// assert!(String::from_utf8_lossy(&out).contains("hello"));
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct Screen {
    out: OutputBuffer,
    size: Size,
}

impl Screen {
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            out: OutputBuffer::new(),
            size,
        }
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    pub fn resize(&mut self, size: Size) {
        self.size = size;
    }

    /// The frame built so far.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.out.as_bytes()
    }

    /// Start a new frame: drop anything unflushed, open synchronized
    /// output and hide the cursor while rows are repainted.
    pub fn begin_frame(&mut self) {
        self.out.clear();
        ansi::begin_sync(&mut self.out).ok();
        ansi::cursor_hide(&mut self.out).ok();
        ansi::reset(&mut self.out).ok();
    }

    /// Erase a row without writing anything to it.
    pub fn clear_row(&mut self, row: u16) {
        if row >= self.size.rows {
            return;
        }
        ansi::cursor_to(&mut self.out, 0, row).ok();
        ansi::clear_line(&mut self.out).ok();
    }

    /// Replace a row with pre-styled text.
    ///
    /// The caller guarantees `text` fits the width (wrapped lines do); it is
    /// written as is, escape sequences included, followed by SGR 0.
    pub fn line(&mut self, row: u16, text: &str) {
        if row >= self.size.rows {
            return;
        }
        self.clear_row(row);
        self.out.push_str(text);
        ansi::reset(&mut self.out).ok();
    }

    /// Write plain `text` at `(col, row)` in `style`, clipped to the right
    /// edge by display width. Returns the column after the last glyph.
    pub fn text(&mut self, col: u16, row: u16, text: &str, style: Style) -> u16 {
        if row >= self.size.rows || col >= self.size.cols {
            return col;
        }
        let room = usize::from(self.size.cols - col);
        let (clipped, used) = clip(text, room);

        ansi::cursor_to(&mut self.out, col, row).ok();
        ansi::sgr(&mut self.out, &style).ok();
        self.out.push_str(clipped);
        ansi::reset(&mut self.out).ok();

        // `used <= room <= u16::MAX`.
        col + u16::try_from(used).unwrap_or(0)
    }

    /// Paint a whole row with one repeated character.
    pub fn fill(&mut self, row: u16, ch: char, style: Style) {
        if row >= self.size.rows {
            return;
        }
        let width = ch.width().unwrap_or(1).max(1);
        let count = usize::from(self.size.cols) / width;
        self.clear_row(row);
        ansi::sgr(&mut self.out, &style).ok();
        let mut enc = [0u8; 4];
        let glyph = ch.encode_utf8(&mut enc);
        for _ in 0..count {
            self.out.push_str(glyph);
        }
        ansi::reset(&mut self.out).ok();
    }

    /// Close the frame, place the cursor and write everything to `w`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn finish_to(&mut self, w: &mut impl Write, cursor: Option<(u16, u16)>) -> io::Result<()> {
        if let Some((x, y)) = cursor {
            ansi::cursor_to(&mut self.out, x, y).ok();
            ansi::cursor_show(&mut self.out).ok();
        }
        ansi::end_sync(&mut self.out).ok();
        self.out.flush_to(w)
    }
}

/// Longest prefix of `text` that fits in `room` columns, and its width.
fn clip(text: &str, room: usize) -> (&str, usize) {
    let mut used = 0;
    for (i, ch) in text.char_indices() {
        let w = ch.width().unwrap_or(0);
        if used + w > room {
            return (&text[..i], used);
        }
        used += w;
    }
    (text, used)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{Attr, Color};
    use pretty_assertions::assert_eq;

    fn screen(cols: u16, rows: u16) -> Screen {
        Screen::new(Size { cols, rows })
    }

    fn frame(s: &Screen) -> String {
        String::from_utf8_lossy(s.as_bytes()).into_owned()
    }

    // ── OutputBuffer ────────────────────────────────────────────────────

    #[test]
    fn output_buffer_write_trait() {
        let mut buf = OutputBuffer::new();
        write!(buf, "hello {}", 42).unwrap();
        assert_eq!(buf.as_bytes(), b"hello 42");
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn output_buffer_clear_keeps_capacity() {
        let mut buf = OutputBuffer::new();
        buf.push_str("some data");
        let cap = buf.buf.capacity();
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.buf.capacity(), cap);
    }

    #[test]
    fn output_buffer_flush_to_clears() {
        let mut buf = OutputBuffer::new();
        buf.push_str("frame data");
        let mut dest = Vec::new();
        buf.flush_to(&mut dest).unwrap();
        assert_eq!(dest, b"frame data");
        assert!(buf.is_empty());
    }

    #[test]
    fn output_buffer_flush_empty_writes_nothing() {
        let mut buf = OutputBuffer::new();
        let mut dest = Vec::new();
        buf.flush_to(&mut dest).unwrap();
        assert!(dest.is_empty());
    }

    // ── Screen ──────────────────────────────────────────────────────────

    #[test]
    fn begin_frame_opens_sync_and_hides_cursor() {
        let mut s = screen(10, 3);
        s.begin_frame();
        assert_eq!(frame(&s), "\x1b[?2026h\x1b[?25l\x1b[0m");
    }

    #[test]
    fn begin_frame_discards_previous_bytes() {
        let mut s = screen(10, 3);
        s.begin_frame();
        s.line(0, "stale");
        s.begin_frame();
        assert!(!frame(&s).contains("stale"));
    }

    #[test]
    fn line_clears_row_and_resets() {
        let mut s = screen(10, 3);
        s.line(1, "\x1b[32mhi");
        assert_eq!(frame(&s), "\x1b[2;1H\x1b[2K\x1b[32mhi\x1b[0m");
    }

    #[test]
    fn rows_outside_screen_are_ignored() {
        let mut s = screen(10, 3);
        s.line(3, "nope");
        s.fill(7, '-', Style::default());
        assert_eq!(s.text(0, 9, "nope", Style::default()), 0);
        assert!(s.as_bytes().is_empty());
    }

    #[test]
    fn text_is_styled_and_positioned() {
        let mut s = screen(20, 3);
        let style = Style::fg(Color::Ansi256(3)).with_attrs(Attr::BOLD);
        let end = s.text(2, 0, "abc", style);
        assert_eq!(end, 5);
        assert_eq!(frame(&s), "\x1b[1;3H\x1b[1;33mabc\x1b[0m");
    }

    #[test]
    fn text_clips_by_display_width() {
        let mut s = screen(5, 1);
        let end = s.text(1, 0, "日本語", Style::default());
        // Two wide glyphs fill columns 1..5.
        assert_eq!(end, 5);
        assert!(frame(&s).contains("日本\x1b[0m"));
        assert!(!frame(&s).contains('語'));
    }

    #[test]
    fn fill_repeats_to_width() {
        let mut s = screen(4, 2);
        s.fill(1, '─', Style::default());
        assert_eq!(frame(&s), "\x1b[2;1H\x1b[2K────\x1b[0m");
    }

    #[test]
    fn finish_places_cursor_and_closes_sync() {
        let mut s = screen(10, 3);
        s.begin_frame();
        let mut out = Vec::new();
        s.finish_to(&mut out, Some((4, 2))).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.ends_with("\x1b[3;5H\x1b[?25h\x1b[?2026l"));
        assert!(s.as_bytes().is_empty());
    }

    #[test]
    fn finish_without_cursor_keeps_it_hidden() {
        let mut s = screen(10, 3);
        s.begin_frame();
        let mut out = Vec::new();
        s.finish_to(&mut out, None).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(!out.contains("\x1b[?25h"));
    }

    #[test]
    fn clip_helper() {
        assert_eq!(clip("hello", 3), ("hel", 3));
        assert_eq!(clip("hi", 10), ("hi", 2));
        assert_eq!(clip("日x", 1), ("", 0));
    }
}
