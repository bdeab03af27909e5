// SPDX-License-Identifier: MIT
//
// Keyboard decoder.
//
// Turns raw stdin bytes into key and paste events for the chat prompt. The
// terminal is put in a plain xterm-compatible mode (no mouse reporting, no
// kitty keyboard protocol), so the table is small:
//
//   printable ASCII / UTF-8      Char
//   0x01..=0x1A                  Ctrl+letter (except Tab, Enter)
//   0x08, 0x7F                   Backspace
//   ESC [ ... A-D, H, F          arrows, Home, End with xterm modifiers
//   ESC [ n ~                    Insert, Delete, PageUp/Down, Home, End, F5-F12
//   ESC O A-D, H, F, P-S         SS3 arrows and F1-F4
//   ESC <byte>                   Alt+byte
//   ESC [ 200~ ... ESC [ 201~    one Paste event
//
// Anything else that starts with ESC decodes to a plain Escape press and
// consumes the whole sequence, so an unknown key never dumps its tail into
// the prompt as text.
//
// Sequences may be split across reads. Incomplete input stays buffered until
// the next `advance`. A lone trailing ESC is ambiguous (Escape key, or the
// first byte of a sequence still in flight): the event loop waits briefly
// and then calls `flush`.

use bitflags::bitflags;

// ─── Event Types ────────────────────────────────────────────────────────────

/// A decoded input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Key(KeyEvent),
    /// Text delivered between bracketed-paste delimiters.
    Paste(String),
}

/// A key press with its modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    #[must_use]
    pub const fn new(code: KeyCode, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }

    /// A key with no modifiers held.
    #[must_use]
    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, Modifiers::empty())
    }

    /// Whether this is Ctrl + `ch` with no other modifiers.
    #[must_use]
    pub fn is_ctrl(&self, ch: char) -> bool {
        self.modifiers == Modifiers::CTRL && self.code == KeyCode::Char(ch)
    }
}

/// Identity of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Escape,
    Delete,
    Insert,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    /// F1 through F12.
    F(u8),
}

bitflags! {
    /// Modifier keys, in xterm's bit order (`param = 1 + bits`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
        const SUPER = 0b1000;
    }
}

// ─── Parser ─────────────────────────────────────────────────────────────────

const ESC: u8 = 0x1B;
const PASTE_START: &[u8] = b"\x1b[200~";
const PASTE_END: &[u8] = b"\x1b[201~";

/// Incremental key decoder.
///
/// ```
/// use n_term::input::{Event, KeyCode, KeyEvent, Modifiers, Parser};
///
/// let mut parser = Parser::new();
/// let events = parser.advance(b"\x1b[1;5A");
/// assert_eq!(events, vec![Event::Key(KeyEvent::new(KeyCode::Up, Modifiers::CTRL))]);
/// ```
#[derive(Debug, Default)]
pub struct Parser {
    buf: Vec<u8>,
    in_paste: bool,
}

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as many events as `data` (plus any buffered bytes) allows.
    pub fn advance(&mut self, data: &[u8]) -> Vec<Event> {
        self.buf.extend_from_slice(data);
        let mut events = Vec::new();
        let mut pos = 0;

        while pos < self.buf.len() {
            let rest = &self.buf[pos..];

            if self.in_paste {
                let Some(end) = find(rest, PASTE_END) else { break };
                events.push(Event::Paste(String::from_utf8_lossy(&rest[..end]).into_owned()));
                pos += end + PASTE_END.len();
                self.in_paste = false;
                continue;
            }

            if rest.starts_with(PASTE_START) {
                self.in_paste = true;
                pos += PASTE_START.len();
                continue;
            }

            match decode(rest) {
                Decoded::Event(event, used) => {
                    events.push(event);
                    pos += used;
                }
                Decoded::Skip(used) => pos += used,
                Decoded::Incomplete => break,
            }
        }

        self.buf.drain(..pos);
        events
    }

    /// Whether bytes are waiting for the rest of a sequence.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty() && !self.in_paste
    }

    /// Resolve whatever is buffered without waiting for more input.
    ///
    /// A pending ESC becomes an Escape press; the bytes after it are
    /// decoded again on their own. An unterminated paste is left alone.
    pub fn flush(&mut self) -> Vec<Event> {
        if self.in_paste {
            return Vec::new();
        }
        let pending = std::mem::take(&mut self.buf);
        let mut events = Vec::new();
        let mut rest = pending.as_slice();
        while let Some((&first, tail)) = rest.split_first() {
            if first == ESC {
                events.push(Event::Key(KeyEvent::plain(KeyCode::Escape)));
                rest = tail;
                continue;
            }
            match decode(rest) {
                Decoded::Event(event, used) => {
                    events.push(event);
                    rest = &rest[used..];
                }
                // A truncated UTF-8 lead or garbage byte: nothing to show.
                Decoded::Skip(_) | Decoded::Incomplete => rest = tail,
            }
        }
        events
    }
}

// ─── Decoding ───────────────────────────────────────────────────────────────

enum Decoded {
    Event(Event, usize),
    Skip(usize),
    Incomplete,
}

const fn key(code: KeyCode, modifiers: Modifiers, used: usize) -> Decoded {
    Decoded::Event(Event::Key(KeyEvent::new(code, modifiers)), used)
}

const fn plain(code: KeyCode, used: usize) -> Decoded {
    key(code, Modifiers::empty(), used)
}

const fn ctrl_letter(b: u8) -> char {
    (b + b'a' - 1) as char
}

fn decode(buf: &[u8]) -> Decoded {
    let Some(&first) = buf.first() else {
        return Decoded::Incomplete;
    };
    match first {
        ESC => decode_escape(buf),
        0x00 => key(KeyCode::Char('@'), Modifiers::CTRL, 1),
        0x09 => plain(KeyCode::Tab, 1),
        0x0A | 0x0D => plain(KeyCode::Enter, 1),
        0x08 | 0x7F => plain(KeyCode::Backspace, 1),
        b @ 0x01..=0x1A => key(KeyCode::Char(ctrl_letter(b)), Modifiers::CTRL, 1),
        b @ 0x20..=0x7E => plain(KeyCode::Char(char::from(b)), 1),
        0xC0..=0xF7 => decode_utf8(buf),
        _ => Decoded::Skip(1),
    }
}

fn decode_escape(buf: &[u8]) -> Decoded {
    let Some(&second) = buf.get(1) else {
        return Decoded::Incomplete;
    };
    match second {
        b'[' => decode_csi(buf),
        b'O' => decode_ss3(buf),
        ESC => key(KeyCode::Escape, Modifiers::ALT, 2),
        b @ 0x01..=0x1A => key(KeyCode::Char(ctrl_letter(b)), Modifiers::ALT.union(Modifiers::CTRL), 2),
        b @ 0x20..=0x7E => key(KeyCode::Char(char::from(b)), Modifiers::ALT, 2),
        _ => plain(KeyCode::Escape, 1),
    }
}

fn decode_csi(buf: &[u8]) -> Decoded {
    let mut end = 2;
    loop {
        match buf.get(end) {
            None => return Decoded::Incomplete,
            Some(0x20..=0x3F) => end += 1,
            Some(0x40..=0x7E) => break,
            // Not a CSI after all: report the ESC and decode the rest fresh.
            Some(_) => return plain(KeyCode::Escape, 1),
        }
    }

    let final_byte = buf[end];
    let params = parse_params(&buf[2..end]);
    let modifiers = params.get(1).map_or(Modifiers::empty(), |&p| decode_modifiers(p));
    let used = end + 1;

    let code = match final_byte {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        b'Z' => return key(KeyCode::Tab, Modifiers::SHIFT, used),
        b'~' => match params.first().copied().unwrap_or(0) {
            1 | 7 => KeyCode::Home,
            2 => KeyCode::Insert,
            3 => KeyCode::Delete,
            4 | 8 => KeyCode::End,
            5 => KeyCode::PageUp,
            6 => KeyCode::PageDown,
            15 => KeyCode::F(5),
            17 => KeyCode::F(6),
            18 => KeyCode::F(7),
            19 => KeyCode::F(8),
            20 => KeyCode::F(9),
            21 => KeyCode::F(10),
            23 => KeyCode::F(11),
            24 => KeyCode::F(12),
            _ => return plain(KeyCode::Escape, used),
        },
        _ => return plain(KeyCode::Escape, used),
    };
    key(code, modifiers, used)
}

fn decode_ss3(buf: &[u8]) -> Decoded {
    let Some(&b) = buf.get(2) else {
        return Decoded::Incomplete;
    };
    let code = match b {
        b'A' => KeyCode::Up,
        b'B' => KeyCode::Down,
        b'C' => KeyCode::Right,
        b'D' => KeyCode::Left,
        b'H' => KeyCode::Home,
        b'F' => KeyCode::End,
        b'P' => KeyCode::F(1),
        b'Q' => KeyCode::F(2),
        b'R' => KeyCode::F(3),
        b'S' => KeyCode::F(4),
        _ => KeyCode::Escape,
    };
    plain(code, 3)
}

fn decode_utf8(buf: &[u8]) -> Decoded {
    let len = match buf[0] {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    };
    if buf.len() < len {
        // Only wait if what we have so far is well-formed.
        return if buf[1..].iter().all(|b| b & 0xC0 == 0x80) {
            Decoded::Incomplete
        } else {
            Decoded::Skip(1)
        };
    }
    std::str::from_utf8(&buf[..len])
        .ok()
        .and_then(|s| s.chars().next())
        .map_or(Decoded::Skip(1), |ch| plain(KeyCode::Char(ch), len))
}

/// `1;5` -> `[1, 5]`. Colon sub-parameters are ignored.
fn parse_params(raw: &[u8]) -> Vec<u16> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(|&b| b == b';')
        .map(|field| {
            field
                .iter()
                .take_while(|b| b.is_ascii_digit())
                .fold(0u16, |acc, &b| acc.saturating_mul(10).saturating_add(u16::from(b - b'0')))
        })
        .collect()
}

/// xterm encodes modifiers as `1 + bits`; 0 and 1 both mean none.
#[allow(clippy::cast_possible_truncation)] // Only the low bits carry flags.
const fn decode_modifiers(param: u16) -> Modifiers {
    Modifiers::from_bits_truncate(param.saturating_sub(1) as u8)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(data: &[u8]) -> Vec<Event> {
        Parser::new().advance(data)
    }

    fn k(code: KeyCode) -> Event {
        Event::Key(KeyEvent::plain(code))
    }

    fn km(code: KeyCode, modifiers: Modifiers) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    // ── Plain keys ──────────────────────────────────────────────────────

    #[test]
    fn printable_ascii() {
        assert_eq!(
            parse(b"hi!"),
            vec![k(KeyCode::Char('h')), k(KeyCode::Char('i')), k(KeyCode::Char('!'))]
        );
    }

    #[test]
    fn enter_tab_backspace() {
        assert_eq!(
            parse(b"\r\n\t\x7f\x08"),
            vec![
                k(KeyCode::Enter),
                k(KeyCode::Enter),
                k(KeyCode::Tab),
                k(KeyCode::Backspace),
                k(KeyCode::Backspace),
            ]
        );
    }

    #[test]
    fn control_letters() {
        let events = parse(b"\x01\x03\x0c\x15");
        let expected: Vec<Event> = ['a', 'c', 'l', 'u']
            .into_iter()
            .map(|c| km(KeyCode::Char(c), Modifiers::CTRL))
            .collect();
        assert_eq!(events, expected);
    }

    #[test]
    fn is_ctrl_helper() {
        let Event::Key(ev) = &parse(b"\x03")[0] else {
            panic!("expected key");
        };
        assert!(ev.is_ctrl('c'));
        assert!(!ev.is_ctrl('d'));
    }

    #[test]
    fn utf8_characters() {
        assert_eq!(
            parse("é日🙂".as_bytes()),
            vec![k(KeyCode::Char('é')), k(KeyCode::Char('日')), k(KeyCode::Char('🙂'))]
        );
    }

    #[test]
    fn utf8_split_across_reads() {
        let bytes = "日".as_bytes();
        let mut p = Parser::new();
        assert!(p.advance(&bytes[..2]).is_empty());
        assert_eq!(p.advance(&bytes[2..]), vec![k(KeyCode::Char('日'))]);
    }

    #[test]
    fn invalid_utf8_is_skipped() {
        assert_eq!(parse(b"\xC3a"), vec![k(KeyCode::Char('a'))]);
        assert_eq!(parse(b"\x80b"), vec![k(KeyCode::Char('b'))]);
    }

    // ── CSI ─────────────────────────────────────────────────────────────

    #[test]
    fn arrows() {
        assert_eq!(
            parse(b"\x1b[A\x1b[B\x1b[C\x1b[D"),
            vec![k(KeyCode::Up), k(KeyCode::Down), k(KeyCode::Right), k(KeyCode::Left)]
        );
    }

    #[test]
    fn arrow_modifiers() {
        assert_eq!(parse(b"\x1b[1;5A"), vec![km(KeyCode::Up, Modifiers::CTRL)]);
        assert_eq!(parse(b"\x1b[1;5B"), vec![km(KeyCode::Down, Modifiers::CTRL)]);
        assert_eq!(parse(b"\x1b[1;3C"), vec![km(KeyCode::Right, Modifiers::ALT)]);
        assert_eq!(parse(b"\x1b[1;2D"), vec![km(KeyCode::Left, Modifiers::SHIFT)]);
        assert_eq!(
            parse(b"\x1b[1;6A"),
            vec![km(KeyCode::Up, Modifiers::CTRL | Modifiers::SHIFT)]
        );
    }

    #[test]
    fn home_end_forms() {
        assert_eq!(
            parse(b"\x1b[H\x1b[F\x1b[1~\x1b[4~\x1b[7~\x1b[8~"),
            vec![
                k(KeyCode::Home),
                k(KeyCode::End),
                k(KeyCode::Home),
                k(KeyCode::End),
                k(KeyCode::Home),
                k(KeyCode::End),
            ]
        );
    }

    #[test]
    fn tilde_keys() {
        assert_eq!(
            parse(b"\x1b[2~\x1b[3~\x1b[5~\x1b[6~"),
            vec![k(KeyCode::Insert), k(KeyCode::Delete), k(KeyCode::PageUp), k(KeyCode::PageDown)]
        );
        assert_eq!(parse(b"\x1b[15~"), vec![k(KeyCode::F(5))]);
        assert_eq!(parse(b"\x1b[24~"), vec![k(KeyCode::F(12))]);
        assert_eq!(parse(b"\x1b[5;5~"), vec![km(KeyCode::PageUp, Modifiers::CTRL)]);
    }

    #[test]
    fn shift_tab() {
        assert_eq!(parse(b"\x1b[Z"), vec![km(KeyCode::Tab, Modifiers::SHIFT)]);
    }

    #[test]
    fn unknown_csi_is_escape() {
        assert_eq!(parse(b"\x1b[99~x"), vec![k(KeyCode::Escape), k(KeyCode::Char('x'))]);
        assert_eq!(parse(b"\x1b[<0;1;1M"), vec![k(KeyCode::Escape)]);
    }

    #[test]
    fn broken_csi_reports_escape_then_text() {
        assert_eq!(
            parse(b"\x1b[1\x01"),
            vec![
                k(KeyCode::Escape),
                k(KeyCode::Char('[')),
                k(KeyCode::Char('1')),
                km(KeyCode::Char('a'), Modifiers::CTRL),
            ]
        );
    }

    // ── SS3 and Alt ─────────────────────────────────────────────────────

    #[test]
    fn ss3_keys() {
        assert_eq!(
            parse(b"\x1bOA\x1bOP\x1bOS"),
            vec![k(KeyCode::Up), k(KeyCode::F(1)), k(KeyCode::F(4))]
        );
    }

    #[test]
    fn alt_keys() {
        assert_eq!(parse(b"\x1b."), vec![km(KeyCode::Char('.'), Modifiers::ALT)]);
        assert_eq!(parse(b"\x1b\x1b"), vec![km(KeyCode::Escape, Modifiers::ALT)]);
        assert_eq!(
            parse(b"\x1b\x02"),
            vec![km(KeyCode::Char('b'), Modifiers::ALT | Modifiers::CTRL)]
        );
    }

    // ── Pending ESC ─────────────────────────────────────────────────────

    #[test]
    fn lone_escape_waits_then_flushes() {
        let mut p = Parser::new();
        assert!(p.advance(b"\x1b").is_empty());
        assert!(p.has_pending());
        assert_eq!(p.flush(), vec![k(KeyCode::Escape)]);
        assert!(!p.has_pending());
    }

    #[test]
    fn split_sequence_completes() {
        let mut p = Parser::new();
        assert!(p.advance(b"\x1b[1;").is_empty());
        assert_eq!(p.advance(b"5A"), vec![km(KeyCode::Up, Modifiers::CTRL)]);
    }

    #[test]
    fn flush_of_partial_csi() {
        let mut p = Parser::new();
        assert!(p.advance(b"\x1b[1").is_empty());
        assert_eq!(
            p.flush(),
            vec![k(KeyCode::Escape), k(KeyCode::Char('[')), k(KeyCode::Char('1'))]
        );
    }

    // ── Paste ───────────────────────────────────────────────────────────

    #[test]
    fn paste_is_one_event() {
        assert_eq!(
            parse(b"\x1b[200~hello\r\nworld\x1b[201~x"),
            vec![Event::Paste("hello\r\nworld".into()), k(KeyCode::Char('x'))]
        );
    }

    #[test]
    fn paste_split_across_reads() {
        let mut p = Parser::new();
        assert!(p.advance(b"\x1b[200~abc").is_empty());
        assert!(!p.has_pending());
        assert!(p.flush().is_empty());
        assert_eq!(p.advance(b"def\x1b[201~"), vec![Event::Paste("abcdef".into())]);
    }

    #[test]
    fn empty_paste() {
        assert_eq!(parse(b"\x1b[200~\x1b[201~"), vec![Event::Paste(String::new())]);
    }

    // ── Helpers ─────────────────────────────────────────────────────────

    #[test]
    fn modifier_param_decoding() {
        assert_eq!(decode_modifiers(0), Modifiers::empty());
        assert_eq!(decode_modifiers(1), Modifiers::empty());
        assert_eq!(decode_modifiers(5), Modifiers::CTRL);
        assert_eq!(decode_modifiers(9), Modifiers::SUPER);
    }

    #[test]
    fn params_saturate() {
        assert_eq!(parse_params(b""), Vec::<u16>::new());
        assert_eq!(parse_params(b"1;5"), vec![1, 5]);
        assert_eq!(parse_params(b"99999999"), vec![u16::MAX]);
    }
}
