// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Terminal ownership for the chat session.
//
// `Terminal::enter` hands the tty to the chat UI: stdin goes raw, the
// alternate screen comes up with the cursor hidden, and bracketed paste is
// switched on so a pasted block reaches the prompt as one edit.
// `Terminal::leave` undoes that and is what every orderly exit runs: the app
// quitting, stdin closing and a termination signal all return through
// `EventLoop::run`, which calls it. `Drop` calls it as well.
//
// A panic is the one exit that skips `leave`. For that the pre-raw termios
// lives in a process-wide slot rather than in the handle, and a panic hook
// replays the restore sequence straight to fd 1 before the default hook
// prints the message. Writing to the raw fd keeps a panic in the middle of
// a frame (stdout lock held) from deadlocking.
//
// The unsafe blocks are the POSIX calls: tcgetattr/tcsetattr, the
// TIOCGWINSZ ioctl, isatty and write(2).

use std::io::{self, Write};
use std::sync::{Mutex, Once};

use tracing::debug;

use crate::ansi;

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub cols: u16,
    pub rows: u16,
}

impl Size {
    /// Used when the size cannot be queried (not a TTY, tests).
    pub const FALLBACK: Self = Self { cols: 80, rows: 24 };
}

/// Size of the terminal on stdout, or `None` if stdout is not a terminal.
#[cfg(unix)]
#[must_use]
pub fn get_size() -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };
    (rc == 0 && ws.ws_col > 0 && ws.ws_row > 0).then_some(Size {
        cols: ws.ws_col,
        rows: ws.ws_row,
    })
}

#[cfg(not(unix))]
#[must_use]
pub fn get_size() -> Option<Size> {
    None
}

/// Whether stdin is a terminal. Raw mode is skipped when it is not, so the
/// client can be driven from a pipe.
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

// ─── Mode Sequences ─────────────────────────────────────────────────────────

/// Switch the screen over to the chat UI.
fn write_takeover(w: &mut impl Write) -> io::Result<()> {
    ansi::enter_alt_screen(w)?;
    ansi::cursor_hide(w)?;
    ansi::clear_screen(w)?;
    ansi::enable_bracketed_paste(w)
}

/// Undo [`write_takeover`] plus anything a half-written frame may have left
/// on: an open synchronized update and a non-default SGR. The alternate
/// screen goes last so the shell reappears clean.
fn write_restore(w: &mut impl Write) -> io::Result<()> {
    ansi::end_sync(w)?;
    ansi::disable_bracketed_paste(w)?;
    ansi::reset(w)?;
    ansi::cursor_show(w)?;
    ansi::exit_alt_screen(w)
}

// ─── Saved termios ──────────────────────────────────────────────────────────

/// Line settings from before raw mode; `Some` exactly while raw mode is on.
#[cfg(unix)]
static SAVED_TERMIOS: Mutex<Option<libc::termios>> = Mutex::new(None);

#[cfg(unix)]
fn apply_termios(termios: &libc::termios, when: libc::c_int) -> io::Result<()> {
    if unsafe { libc::tcsetattr(libc::STDIN_FILENO, when, termios) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Put stdin in raw mode and remember the previous settings. Does nothing
/// if stdin is not a terminal or raw mode is already on.
#[cfg(unix)]
fn enable_raw_mode() -> io::Result<()> {
    if !is_tty() {
        return Ok(());
    }
    let mut saved = SAVED_TERMIOS.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    if saved.is_some() {
        return Ok(());
    }

    let mut termios: libc::termios = unsafe { std::mem::zeroed() };
    if unsafe { libc::tcgetattr(libc::STDIN_FILENO, &raw mut termios) } != 0 {
        return Err(io::Error::last_os_error());
    }
    let original = termios;

    // cfmakeraw: no echo, no line editing, no signals from ^C, no output
    // post-processing. ^C and ^D reach the key parser as ordinary keys.
    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;
    // Reads only happen after poll(2) says stdin is readable.
    termios.c_cc[libc::VMIN] = 1;
    termios.c_cc[libc::VTIME] = 0;

    apply_termios(&termios, libc::TCSAFLUSH)?;
    *saved = Some(original);
    Ok(())
}

#[cfg(unix)]
fn disable_raw_mode() -> io::Result<()> {
    let mut saved = SAVED_TERMIOS.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    if let Some(original) = saved.take() {
        apply_termios(&original, libc::TCSAFLUSH)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn enable_raw_mode() -> io::Result<()> {
    Ok(())
}

#[cfg(not(unix))]
fn disable_raw_mode() -> io::Result<()> {
    Ok(())
}

// ─── Panic Hook ─────────────────────────────────────────────────────────────

static PANIC_HOOK: Once = Once::new();

fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            restore_after_panic();
            previous(info);
        }));
    });
}

/// Best effort: every error is ignored, and a termios slot locked by the
/// panicking thread is skipped rather than waited on.
fn restore_after_panic() {
    let mut seq = Vec::with_capacity(32);
    let _ = write_restore(&mut seq);

    #[cfg(unix)]
    {
        unsafe {
            let _ = libc::write(libc::STDOUT_FILENO, seq.as_ptr().cast::<libc::c_void>(), seq.len());
        }
        if let Ok(mut saved) = SAVED_TERMIOS.try_lock() {
            if let Some(original) = saved.take() {
                let _ = apply_termios(&original, libc::TCSANOW);
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = io::stdout().write_all(&seq);
        let _ = io::stdout().flush();
    }
}

// ─── Terminal ───────────────────────────────────────────────────────────────

/// The chat session's hold on the terminal.
///
/// ```no_run
/// use n_term::terminal::Terminal;
///
/// let mut term = Terminal::new()?;
/// term.enter()?;
/// // ... run the chat ...
/// term.leave()?;
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct Terminal {
    size: Size,
    active: bool,
}

impl Terminal {
    /// A handle sized to the current terminal, or [`Size::FALLBACK`].
    /// Nothing is changed until [`enter`](Self::enter).
    ///
    /// # Errors
    ///
    /// Infallible today; the signature leaves room for platform setup.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            size: get_size().unwrap_or(Size::FALLBACK),
            active: false,
        })
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Re-query the size after SIGWINCH; keeps the cached size if the
    /// query fails.
    pub fn refresh_size(&mut self) -> Size {
        if let Some(size) = get_size() {
            self.size = size;
        }
        self.size
    }

    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Take over the terminal. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if raw mode or terminal output fails.
    pub fn enter(&mut self) -> io::Result<()> {
        if self.active {
            return Ok(());
        }
        install_panic_hook();
        enable_raw_mode()?;

        let mut out = io::stdout().lock();
        write_takeover(&mut out)?;
        out.flush()?;

        self.active = true;
        debug!(cols = self.size.cols, rows = self.size.rows, raw = is_tty(), "terminal entered");
        Ok(())
    }

    /// Give the terminal back. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if terminal output or the termios restore fails.
    pub fn leave(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        // Cleared first: a failed write must not make Drop try again.
        self.active = false;

        let mut out = io::stdout().lock();
        write_restore(&mut out)?;
        out.flush()?;
        drop(out);

        disable_raw_mode()?;
        debug!("terminal restored");
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
