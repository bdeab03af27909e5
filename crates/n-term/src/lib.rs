// SPDX-License-Identifier: MIT
//
// n-term: terminal engine for n-chat.
//
// Raw termios and hand-written ANSI output instead of a TUI framework
// (ratatui, crossterm). The chat screen is a handful of full-width rows
// redrawn every frame, so the engine is small: an SGR style model, a line
// wrapper that keeps styles intact across row breaks, a key decoder, a row
// painter and a poll(2)-driven event loop that can watch one extra
// descriptor besides the keyboard.

pub mod ansi;
#[cfg(unix)]
pub mod event_loop;
pub mod input;
pub mod output;
pub mod style;
pub mod terminal;
pub mod wrap;
