// SPDX-License-Identifier: MIT
//
// n-client: the chat client's data path.
//
// Socket bytes are framed into records (`framer`), dispatched into a pane's
// history (`pane`, `scrollback`) and laid out for the screen each frame
// (`compositor`). `connection` owns the socket and `prompt` the input line.
// Nothing here touches the terminal directly; rendering goes through
// n-term.

pub mod compositor;
pub mod connection;
pub mod error;
pub mod framer;
pub mod pane;
pub mod prompt;
pub mod scrollback;

pub use error::ConnectionError;
