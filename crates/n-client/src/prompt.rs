// SPDX-License-Identifier: MIT
//
// The input prompt: a one-line editor with command history.
//
// The cursor is a byte offset that always sits on a grapheme cluster
// boundary, so left/right/backspace treat "e + combining acute" or a flag
// emoji as one unit. The display column is the unicode-width of the text
// before the cursor.

use std::collections::VecDeque;

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Entries kept in the command history.
pub const HISTORY_LEN: usize = 15;

#[derive(Debug, Default)]
pub struct Prompt {
    input: String,
    /// Byte offset into `input`, on a grapheme boundary.
    cursor: usize,
    history: VecDeque<String>,
    /// Index into `history` while browsing (0 = newest).
    browsing: Option<usize>,
}

impl Prompt {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    /// Cursor position as a byte offset.
    #[inline]
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Display columns between the start of the input and the cursor.
    #[must_use]
    pub fn cursor_column(&self) -> usize {
        self.input[..self.cursor].width()
    }

    /// What to show in a field `room` columns wide: the input from the
    /// first grapheme that keeps the cursor in view, and the cursor's
    /// column within that slice. The caller clips the right edge.
    #[must_use]
    pub fn view(&self, room: usize) -> (&str, usize) {
        if room == 0 {
            return ("", 0);
        }
        let mut start = 0;
        let mut col = self.cursor_column();
        let mut graphemes = self.input[..self.cursor].grapheme_indices(true);
        while col >= room {
            match graphemes.next() {
                Some((i, g)) => {
                    start = i + g.len();
                    col -= g.width();
                }
                None => break,
            }
        }
        (&self.input[start..], col)
    }

    /// History entries, newest first.
    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    // ── Editing ─────────────────────────────────────────────────────────

    pub fn insert_char(&mut self, ch: char) {
        if ch.is_control() {
            return;
        }
        self.input.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
        self.snap_cursor();
    }

    /// Insert pasted text. Line breaks and tabs become spaces; other
    /// control characters are dropped.
    pub fn insert_str(&mut self, text: &str) {
        let clean: String = text
            .chars()
            .filter_map(|c| match c {
                '\r' | '\n' | '\t' => Some(' '),
                c if c.is_control() => None,
                c => Some(c),
            })
            .collect();
        self.input.insert_str(self.cursor, &clean);
        self.cursor += clean.len();
        self.snap_cursor();
    }

    /// Delete the grapheme before the cursor. Returns whether anything went.
    pub fn backspace(&mut self) -> bool {
        match self.prev_boundary() {
            Some(start) => {
                self.input.replace_range(start..self.cursor, "");
                self.cursor = start;
                true
            }
            None => false,
        }
    }

    /// Delete the grapheme under the cursor.
    pub fn delete(&mut self) -> bool {
        match self.next_boundary() {
            Some(end) => {
                self.input.replace_range(self.cursor..end, "");
                true
            }
            None => false,
        }
    }

    pub fn move_left(&mut self) {
        if let Some(at) = self.prev_boundary() {
            self.cursor = at;
        }
    }

    pub fn move_right(&mut self) {
        if let Some(at) = self.next_boundary() {
            self.cursor = at;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.input.len();
    }

    /// Delete from the cursor to the end of the line.
    pub fn kill_to_end(&mut self) {
        self.input.truncate(self.cursor);
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.cursor = 0;
        self.browsing = None;
    }

    /// Take the input for sending, record it in history and clear the
    /// prompt. `None` if there is nothing to send.
    pub fn submit(&mut self) -> Option<String> {
        if self.input.trim().is_empty() {
            self.clear();
            return None;
        }
        let line = std::mem::take(&mut self.input);
        self.clear();
        if self.history.front() != Some(&line) {
            self.history.push_front(line.clone());
            self.history.truncate(HISTORY_LEN);
        }
        Some(line)
    }

    // ── History ─────────────────────────────────────────────────────────

    /// Step to the next older history entry.
    pub fn history_prev(&mut self) {
        let next = self.browsing.map_or(0, |i| i + 1);
        if let Some(entry) = self.history.get(next) {
            self.input.clone_from(entry);
            self.cursor = self.input.len();
            self.browsing = Some(next);
        }
    }

    /// Step to the next newer entry; past the newest clears the prompt.
    pub fn history_next(&mut self) {
        match self.browsing {
            None => {}
            Some(0) => self.clear(),
            Some(i) => {
                self.input.clone_from(&self.history[i - 1]);
                self.cursor = self.input.len();
                self.browsing = Some(i - 1);
            }
        }
    }

    // ── Grapheme boundaries ─────────────────────────────────────────────

    fn prev_boundary(&self) -> Option<usize> {
        self.input[..self.cursor]
            .grapheme_indices(true)
            .next_back()
            .map(|(i, _)| i)
    }

    fn next_boundary(&self) -> Option<usize> {
        self.input[self.cursor..]
            .graphemes(true)
            .next()
            .map(|g| self.cursor + g.len())
    }

    /// An inserted combining mark can merge with the previous cluster and
    /// leave the cursor inside it; move it to the end of that cluster.
    fn snap_cursor(&mut self) {
        let mut at = 0;
        for g in self.input.graphemes(true) {
            let end = at + g.len();
            if self.cursor > at && self.cursor < end {
                self.cursor = end;
                return;
            }
            at = end;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn typed(text: &str) -> Prompt {
        let mut p = Prompt::new();
        for ch in text.chars() {
            p.insert_char(ch);
        }
        p
    }

    // ── Editing ─────────────────────────────────────────────────────────

    #[test]
    fn insert_and_move() {
        let mut p = typed("helo");
        p.move_left();
        p.insert_char('l');
        assert_eq!(p.input(), "hello");
        assert_eq!(p.cursor(), 4);
        p.move_home();
        p.insert_char('>');
        p.move_end();
        p.insert_char('!');
        assert_eq!(p.input(), ">hello!");
    }

    #[test]
    fn backspace_removes_whole_cluster() {
        let mut p = typed("ae\u{301}");
        assert_eq!(p.cursor(), p.input().len());
        assert!(p.backspace());
        assert_eq!(p.input(), "a");
        assert!(p.backspace());
        assert!(!p.backspace());
    }

    #[test]
    fn delete_under_cursor() {
        let mut p = typed("日本");
        p.move_home();
        assert!(p.delete());
        assert_eq!(p.input(), "本");
        p.move_end();
        assert!(!p.delete());
    }

    #[test]
    fn cursor_column_uses_display_width() {
        let mut p = typed("日本x");
        assert_eq!(p.cursor_column(), 5);
        p.move_left();
        assert_eq!(p.cursor_column(), 4);
    }

    #[test]
    fn view_scrolls_to_keep_cursor_visible() {
        let mut p = typed("abcdef");
        assert_eq!(p.view(10), ("abcdef", 6));
        assert_eq!(p.view(4), ("def", 3));
        p.move_home();
        assert_eq!(p.view(4), ("abcdef", 0));
        assert_eq!(p.view(0), ("", 0));
    }

    #[test]
    fn view_steps_over_wide_glyphs() {
        let p = typed("日本語");
        assert_eq!(p.view(4), ("語", 2));
    }

    #[test]
    fn kill_to_end_keeps_head() {
        let mut p = typed("hello world");
        for _ in 0..6 {
            p.move_left();
        }
        p.kill_to_end();
        assert_eq!(p.input(), "hello");
    }

    #[test]
    fn paste_flattens_newlines() {
        let mut p = Prompt::new();
        p.insert_str("one\r\ntwo\x07");
        assert_eq!(p.input(), "one  two");
    }

    #[test]
    fn control_chars_are_ignored() {
        let p = typed("a\x1bb");
        assert_eq!(p.input(), "ab");
    }

    // ── Submit and history ──────────────────────────────────────────────

    #[test]
    fn submit_clears_and_records() {
        let mut p = typed("hi");
        assert_eq!(p.submit().as_deref(), Some("hi"));
        assert!(p.is_empty());
        assert_eq!(p.history().collect::<Vec<_>>(), vec!["hi"]);
    }

    #[test]
    fn blank_submit_is_nothing() {
        let mut p = typed("   ");
        assert_eq!(p.submit(), None);
        assert!(p.is_empty());
        assert_eq!(p.history().count(), 0);
    }

    #[test]
    fn consecutive_duplicates_collapse() {
        let mut p = Prompt::new();
        for line in ["a", "a", "b", "a"] {
            p.insert_str(line);
            p.submit();
        }
        assert_eq!(p.history().collect::<Vec<_>>(), vec!["a", "b", "a"]);
    }

    #[test]
    fn history_is_bounded() {
        let mut p = Prompt::new();
        for i in 0..20 {
            p.insert_str(&format!("cmd{i}"));
            p.submit();
        }
        assert_eq!(p.history().count(), HISTORY_LEN);
        assert_eq!(p.history().next(), Some("cmd19"));
        assert_eq!(p.history().last(), Some("cmd5"));
    }

    #[test]
    fn browse_up_and_down() {
        let mut p = Prompt::new();
        for line in ["first", "second"] {
            p.insert_str(line);
            p.submit();
        }
        p.history_prev();
        assert_eq!(p.input(), "second");
        p.history_prev();
        assert_eq!(p.input(), "first");
        p.history_prev();
        assert_eq!(p.input(), "first", "stops at the oldest");
        p.history_next();
        assert_eq!(p.input(), "second");
        p.history_next();
        assert!(p.is_empty(), "past the newest clears");
        p.history_next();
        assert!(p.is_empty());
    }
}
