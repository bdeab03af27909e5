// SPDX-License-Identifier: MIT
//
// n-chat: a terminal chat client.
//
// This is the main binary that wires the crates together:
//
//   n-term   → raw mode, key decoding, row painting, line wrapping, event loop
//   n-client → framing, scrollback, viewport composition, connection, prompt
//
// The Chat struct implements n-term's App trait. Data flows:
//
//   socket → on_readable → Framer → RawDispatcher → ScrollbackLog.append
//   stdin  → Parser → on_event → prompt edits / scroll ops / send_line
//   paint  → ScrollbackLog.visible → compose → Screen rows
//
// Layout:
//
//   ┌──────────────────────────────┐
//   │ title bar (INVERSE)          │  ← 1 row
//   ├──────────────────────────────┤
//   │ messages, bottom-aligned     │  ← h - 3 rows
//   ├──────────────────────────────┤
//   │ separator                    │  ← 1 row
//   │ > prompt                     │  ← 1 row
//   └──────────────────────────────┘

mod cli;
mod logging;

use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::process::ExitCode;

use clap::Parser as _;
use thiserror::Error;
use tracing::{info, warn};

use n_client::compositor::Viewport;
use n_client::connection::{Connection, ConnectionState, Connector};
use n_client::framer::Line;
use n_client::pane::{Dispatch, Pane};
use n_client::prompt::Prompt;
use n_client::ConnectionError;

use n_term::event_loop::{Action, App, EventLoop};
use n_term::input::{Event, KeyCode, KeyEvent, Modifiers};
use n_term::output::Screen;
use n_term::style::{Attr, Color, Style};
use n_term::terminal::Size;

use crate::logging::LoggingError;

/// Ticks between scroll-indicator blinks (about a second at 100 ms).
const BLINK_TICKS: u64 = 10;

/// The prompt's leading marker.
const PROMPT_MARK: &str = "> ";

// ─── Errors ─────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
enum AppError {
    #[error("logging setup failed: {0}")]
    Logging(#[from] LoggingError),

    #[error("terminal: {0}")]
    Terminal(#[from] io::Error),

    #[error("cannot start connector: {0}")]
    Connector(#[source] io::Error),
}

// ─── Dispatcher ─────────────────────────────────────────────────────────────

/// Shows every record as-is, dimmed, with a `<` marker.
struct RawDispatcher;

impl Dispatch for RawDispatcher {
    fn dispatch(&mut self, line: &Line, pane: &mut Pane) {
        pane.log.append(format!("\x1b[90m< {}\x1b[0m", line.to_text()));
    }
}

// ─── Chat ───────────────────────────────────────────────────────────────────

struct Chat<D> {
    pane: Pane,
    prompt: Prompt,
    dispatcher: D,
    state: ConnectionState,
    connection: Option<Connection>,
    connector: Option<Connector>,
    size: Size,
    ticks: u64,
    /// Scroll indicator highlight, toggled while scrolled back.
    blink: bool,
}

impl<D: Dispatch> Chat<D> {
    fn new(pane: Pane, dispatcher: D, size: Size) -> Self {
        Self {
            pane,
            prompt: Prompt::new(),
            dispatcher,
            state: ConnectionState::Disconnected,
            connection: None,
            connector: None,
            size,
            ticks: 0,
            blink: false,
        }
    }

    fn viewport(&self) -> Viewport {
        Viewport::from_size(self.size)
    }

    fn connecting(&mut self, connector: Connector) {
        self.state = ConnectionState::Connecting {
            target: connector.target().to_owned(),
        };
        self.connector = Some(connector);
    }

    fn attach(&mut self, connection: Connection) {
        self.state = ConnectionState::Connected {
            peer: connection.peer(),
        };
        self.notice(&format!("\x1b[32m{}\x1b[0m", self.state.label()));
        self.connection = Some(connection);
    }

    /// Drop the connection after `err`. No reconnect.
    fn disconnect(&mut self, err: &ConnectionError) {
        warn!(error = %err, "connection finished");
        self.connection = None;
        self.state = ConnectionState::Disconnected;
        if err.is_closed() {
            self.notice("\x1b[33mconnection closed\x1b[0m");
        } else {
            self.error(&err.to_string());
        }
    }

    fn notice(&mut self, text: &str) {
        self.pane.log.append(text);
    }

    fn error(&mut self, text: &str) {
        self.pane.log.append(format!("\x1b[31m{text}\x1b[0m"));
    }

    /// Pick up the background connect result, if it has arrived.
    fn poll_connector(&mut self) -> bool {
        let Some(result) = self.connector.as_ref().and_then(Connector::poll) else {
            return false;
        };
        self.connector = None;
        match result {
            Ok(connection) => self.attach(connection),
            Err(err) => {
                warn!(error = %err, "connect failed");
                self.state = ConnectionState::Disconnected;
                self.error(&err.to_string());
            }
        }
        true
    }

    fn flush_outbox(&mut self) -> bool {
        let Some(conn) = self.connection.as_mut() else {
            return false;
        };
        if conn.pending_output() == 0 {
            return false;
        }
        match conn.flush() {
            Ok(_) => false,
            Err(err) => {
                self.disconnect(&err);
                true
            }
        }
    }

    fn submit(&mut self) {
        let Some(line) = self.prompt.submit() else {
            return;
        };
        let Some(conn) = self.connection.as_mut() else {
            self.error("not connected");
            return;
        };
        match conn.send_line(&line) {
            Ok(()) => self.notice(&format!("\x1b[36m> {line}\x1b[0m")),
            Err(err) => self.disconnect(&err),
        }
    }

    fn page(&self) -> usize {
        self.viewport().height.max(1)
    }

    fn handle_key(&mut self, key: KeyEvent) -> Action {
        let ctrl = key.modifiers.contains(Modifiers::CTRL);

        match key.code {
            KeyCode::Char('c') if key.is_ctrl('c') => return Action::Quit,

            // ── Scrollback ──
            KeyCode::Up if ctrl => {
                self.pane.log.scroll_up();
            }
            KeyCode::Down if ctrl => {
                self.pane.log.scroll_down();
            }
            KeyCode::PageUp => {
                let page = self.page();
                self.pane.log.scroll_up_by(page);
            }
            KeyCode::PageDown => {
                let page = self.page();
                self.pane.log.scroll_down_by(page);
            }
            KeyCode::Char('b') if key.is_ctrl('b') => self.pane.log.scroll_to_top(),
            KeyCode::Char('e') if key.is_ctrl('e') => self.pane.log.scroll_to_bottom(),
            KeyCode::Char('.') if key.modifiers == Modifiers::ALT => self.pane.log.clear(),

            // ── Prompt ──
            KeyCode::Enter => self.submit(),
            KeyCode::Up => self.prompt.history_prev(),
            KeyCode::Down => self.prompt.history_next(),
            KeyCode::Left => self.prompt.move_left(),
            KeyCode::Right => self.prompt.move_right(),
            KeyCode::Home => self.prompt.move_home(),
            KeyCode::End => self.prompt.move_end(),
            KeyCode::Backspace => {
                self.prompt.backspace();
            }
            KeyCode::Delete => {
                self.prompt.delete();
            }
            KeyCode::Char('a') if key.is_ctrl('a') => self.prompt.move_home(),
            KeyCode::Char('k') if key.is_ctrl('k') => self.prompt.kill_to_end(),
            KeyCode::Char('u') if key.is_ctrl('u') => self.prompt.clear(),
            KeyCode::Char(ch) if !key.modifiers.intersects(Modifiers::CTRL | Modifiers::ALT) => {
                self.prompt.insert_char(ch);
            }
            _ => {}
        }
        Action::Continue
    }

    // ── Painting ──

    fn paint_title(&self, screen: &mut Screen) {
        let bar = Style::default().with_attrs(Attr::INVERSE);
        screen.fill(0, ' ', bar);
        let title = format!(" n-chat │ {} │ {} ", self.pane.title, self.state.label());
        let col = screen.text(0, 0, &title, bar);

        let offset = self.pane.log.offset();
        if offset > 0 {
            let alert = if self.blink {
                Style::fg(Color::Ansi256(11)).with_attrs(Attr::BOLD | Attr::INVERSE)
            } else {
                bar
            };
            screen.text(col, 0, &format!(" ↑ {offset} more "), alert);
        }
    }

    fn paint_messages(&self, screen: &mut Screen) {
        let viewport = self.viewport();
        let rows = self.pane.compose(viewport);
        let top = 1 + (viewport.height - rows.len());
        for (i, row) in rows.iter().enumerate() {
            screen.line(to_u16(top + i), row.as_str());
        }
    }

    fn paint_prompt(&self, screen: &mut Screen) {
        let rows = self.size.rows;
        if rows < 2 {
            return;
        }
        screen.fill(rows - 2, '─', Style::default().with_attrs(Attr::DIM));
        screen.clear_row(rows - 1);
        let col = screen.text(0, rows - 1, PROMPT_MARK, Style::fg(Color::Ansi256(6)));
        let room = usize::from(self.size.cols.saturating_sub(col));
        let (visible, _) = self.prompt.view(room);
        screen.text(col, rows - 1, visible, Style::default());
    }
}

fn to_u16(row: usize) -> u16 {
    u16::try_from(row).unwrap_or(u16::MAX)
}

impl<D: Dispatch> App for Chat<D> {
    fn source_fd(&self) -> Option<RawFd> {
        self.connection.as_ref().map(AsRawFd::as_raw_fd)
    }

    fn on_readable(&mut self) -> Action {
        let Some(conn) = self.connection.as_mut() else {
            return Action::Continue;
        };
        match conn.receive() {
            Ok(lines) => {
                for line in &lines {
                    self.dispatcher.dispatch(line, &mut self.pane);
                }
            }
            Err(err) => self.disconnect(&err),
        }
        Action::Continue
    }

    fn on_event(&mut self, event: &Event) -> Action {
        match event {
            Event::Key(key) => self.handle_key(*key),
            Event::Paste(text) => {
                self.prompt.insert_str(text);
                Action::Continue
            }
        }
    }

    fn on_resize(&mut self, size: Size) {
        self.size = size;
    }

    fn on_tick(&mut self) -> bool {
        self.ticks += 1;
        let mut dirty = self.poll_connector();
        dirty |= self.flush_outbox();

        if self.pane.log.is_pinned() {
            dirty |= std::mem::take(&mut self.blink);
        } else if self.ticks % BLINK_TICKS == 0 {
            self.blink = !self.blink;
            dirty = true;
        }
        dirty
    }

    fn paint(&mut self, screen: &mut Screen) {
        self.paint_title(screen);
        self.paint_messages(screen);
        self.paint_prompt(screen);
    }

    fn cursor(&self) -> Option<(u16, u16)> {
        if self.size.rows == 0 {
            return None;
        }
        let room = usize::from(self.size.cols).saturating_sub(PROMPT_MARK.len());
        let (_, col) = self.prompt.view(room);
        let x = to_u16(PROMPT_MARK.len() + col).min(self.size.cols.saturating_sub(1));
        Some((x, self.size.rows - 1))
    }
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn run(args: &cli::Args) -> Result<(), AppError> {
    logging::init(&args.log_path())?;
    info!(host = %args.host, port = args.port, "starting");

    let mut pane = Pane::new(args.host.clone(), args.retention());
    if args.no_scrollback {
        pane.log.set_enabled(false);
    }

    let mut event_loop = EventLoop::new(args.loop_config())?;
    let mut chat = Chat::new(pane, RawDispatcher, event_loop.size());
    chat.connecting(Connector::spawn(&args.host, args.port).map_err(AppError::Connector)?);

    event_loop.run(&mut chat)?;
    info!("exiting");
    Ok(())
}

fn main() -> ExitCode {
    let args = cli::Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("n-chat: {e}");
            ExitCode::FAILURE
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
