// SPDX-License-Identifier: MIT
//
// Viewport compositor: the tail of the scrollback, wrapped to the screen.
//
// Each message wraps independently; the wrapped rows are concatenated in
// message order and only the last `height` rows are kept. Work per frame is
// bounded twice: the log hands over at most `VISIBLE_WINDOW` messages, and
// wrapping runs newest-first and stops as soon as the viewport is full.

use n_term::terminal::Size;
use n_term::wrap::{wrap, WrappedLine};

/// Most messages read from a log per frame.
pub const VISIBLE_WINDOW: usize = 200;

/// Rows not available to messages: title bar, separator, prompt.
pub const CHROME_ROWS: u16 = 3;

/// The message area of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: usize,
    pub height: usize,
}

impl Viewport {
    /// Message area for a terminal of `size`: full width, every row but
    /// the chrome. Collapses to zero on a terminal too small for chrome.
    #[must_use]
    pub fn from_size(size: Size) -> Self {
        Self {
            width: usize::from(size.cols),
            height: usize::from(size.rows.saturating_sub(CHROME_ROWS)),
        }
    }

    #[must_use]
    pub fn compose<S: AsRef<str>>(self, messages: &[S]) -> Vec<WrappedLine> {
        compose(messages, self.width, self.height)
    }
}

/// The last `height` wrapped rows of `messages`, oldest row first.
#[must_use]
pub fn compose<S: AsRef<str>>(messages: &[S], width: usize, height: usize) -> Vec<WrappedLine> {
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let mut rows: Vec<WrappedLine> = Vec::with_capacity(height);
    for message in messages.iter().rev() {
        let lines = wrap(message.as_ref(), width);
        let need = height - rows.len();
        // Gathered back to front; reversed once at the end.
        rows.extend(lines.into_iter().rev().take(need));
        if rows.len() == height {
            break;
        }
    }
    rows.reverse();
    rows
}
