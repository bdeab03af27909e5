// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Event loop: the single-threaded heartbeat of the chat client.
//
// One thread, one `poll(2)` per iteration over up to two descriptors:
//
//   stdin              keyboard bytes -> Parser -> App::on_event
//   App::source_fd()   the application's socket -> App::on_readable
//
// The poll timeout is the time left until the next tick, so the loop wakes
// at least every `tick_interval` (100 ms by default) even when nothing
// arrives. Each ready descriptor is serviced once per iteration, which
// keeps a flooding socket from starving the keyboard and vice versa.
//
// # Escape timeout
//
// A lone ESC is either the Escape key or the first byte of a sequence whose
// tail is still in flight. When a read leaves the parser holding a partial
// sequence we poll stdin alone for `escape_timeout` (25 ms), feed whatever
// arrives, and flush the rest as literal keys.
//
// # Signals
//
// SIGWINCH sets a resize flag; SIGINT, SIGTERM and SIGHUP set a termination
// flag. Both are plain atomics (the only thing a handler may safely touch)
// and are checked once per iteration. The termination handler is installed
// without SA_RESTART so a blocked poll returns EINTR immediately.
//
// # Rendering
//
// Whenever anything may have changed (input, socket data, resize, a tick
// that reported a change) the whole screen is repainted before the loop
// waits again.

use std::io::{self, Write};
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::input::{Event, Parser};
use crate::output::Screen;
use crate::terminal::{Size, Terminal};

/// Bytes taken from stdin per read. A keypress is 1-6 bytes; a paste can be
/// kilobytes and simply spans several reads.
const READ_BUF_SIZE: usize = 4096;

// ─── Signals ─────────────────────────────────────────────────────────────────

static RESIZED: AtomicBool = AtomicBool::new(false);
static TERMINATE: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigwinch(_sig: libc::c_int) {
    RESIZED.store(true, Ordering::Relaxed);
}

extern "C" fn on_terminate(_sig: libc::c_int) {
    TERMINATE.store(true, Ordering::Relaxed);
}

fn install_handler(signal: libc::c_int, handler: extern "C" fn(libc::c_int), flags: libc::c_int) {
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = handler as *const () as usize;
        sa.sa_flags = flags;
        libc::sigemptyset(&raw mut sa.sa_mask);
        libc::sigaction(signal, &raw const sa, std::ptr::null_mut());
    }
}

fn install_signal_handlers() {
    install_handler(libc::SIGWINCH, on_sigwinch, libc::SA_RESTART);
    for signal in [libc::SIGINT, libc::SIGTERM, libc::SIGHUP] {
        install_handler(signal, on_terminate, 0);
    }
}

// ─── App Trait ───────────────────────────────────────────────────────────────

/// What the application tells the loop after handling something.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Continue,
    Quit,
}

/// Application interface for the event loop.
///
/// Per iteration the loop calls, as applicable:
///
/// 1. [`on_resize`](App::on_resize) after SIGWINCH
/// 2. [`on_readable`](App::on_readable) when [`source_fd`](App::source_fd)
///    is ready (or hung up)
/// 3. [`on_event`](App::on_event) for each decoded key or paste
/// 4. [`on_tick`](App::on_tick) when the tick deadline has passed
/// 5. [`paint`](App::paint) and [`cursor`](App::cursor) if anything changed
pub trait App {
    /// An extra descriptor to watch, typically the connection's socket.
    /// `None` while disconnected.
    fn source_fd(&self) -> Option<RawFd> {
        None
    }

    /// The source descriptor is readable, or reported hang-up/error. The
    /// app should read once; anything left makes the descriptor ready
    /// again on the next poll.
    fn on_readable(&mut self) -> Action {
        Action::Continue
    }

    /// Handle one decoded input event.
    fn on_event(&mut self, _event: &Event) -> Action {
        Action::Continue
    }

    /// The terminal was resized.
    fn on_resize(&mut self, _size: Size) {}

    /// Called once per tick interval. Return `true` to request a repaint.
    fn on_tick(&mut self) -> bool {
        false
    }

    /// Repaint every row. The screen already has a frame open.
    fn paint(&mut self, screen: &mut Screen);

    /// Where to show the hardware cursor after painting, or `None` to keep
    /// it hidden.
    fn cursor(&self) -> Option<(u16, u16)> {
        None
    }
}

// ─── Config ──────────────────────────────────────────────────────────────────

/// Loop timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Longest the loop sleeps without input; also the `on_tick` period.
    pub tick_interval: Duration,
    /// How long a partial escape sequence may wait for its tail.
    pub escape_timeout: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            escape_timeout: Duration::from_millis(25),
        }
    }
}

// ─── Polling ─────────────────────────────────────────────────────────────────

/// Which descriptors came back ready from one poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Ready {
    stdin: bool,
    source: bool,
}

fn poll_timeout_ms(timeout: Duration) -> libc::c_int {
    // Round up so a 0.4 ms remainder doesn't spin.
    let ms = timeout.as_micros().div_ceil(1000);
    libc::c_int::try_from(ms).unwrap_or(libc::c_int::MAX)
}

/// Wait until stdin or `source` is ready, or `timeout` passes.
///
/// EINTR is reported as "nothing ready" so the caller re-checks its
/// signal flags.
fn wait(stdin: RawFd, source: Option<RawFd>, timeout: Duration) -> io::Result<Ready> {
    let mut fds = [
        libc::pollfd {
            fd: stdin,
            events: libc::POLLIN,
            revents: 0,
        },
        libc::pollfd {
            fd: source.unwrap_or(-1),
            events: libc::POLLIN,
            revents: 0,
        },
    ];
    let count: libc::nfds_t = if source.is_some() { 2 } else { 1 };

    let rc = unsafe { libc::poll(fds.as_mut_ptr(), count, poll_timeout_ms(timeout)) };
    if rc < 0 {
        let err = io::Error::last_os_error();
        return if err.kind() == io::ErrorKind::Interrupted {
            Ok(Ready::default())
        } else {
            Err(err)
        };
    }

    // Hang-up and error count as readable: the reader will see EOF or the
    // error and tear the connection down.
    let readable = libc::POLLIN | libc::POLLHUP | libc::POLLERR;
    Ok(Ready {
        stdin: fds[0].revents & readable != 0,
        source: source.is_some() && fds[1].revents & readable != 0,
    })
}

/// Outcome of one `read(2)` on stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyRead {
    Data(usize),
    /// Interrupted or spuriously woken; try again next iteration.
    Nothing,
    Eof,
}

fn read_stdin(fd: RawFd, buf: &mut [u8]) -> io::Result<KeyRead> {
    let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
    if n < 0 {
        let err = io::Error::last_os_error();
        return match err.kind() {
            io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock => Ok(KeyRead::Nothing),
            _ => Err(err),
        };
    }
    #[allow(clippy::cast_sign_loss)] // n >= 0 checked above.
    Ok(match n as usize {
        0 => KeyRead::Eof,
        n => KeyRead::Data(n),
    })
}

// ─── EventLoop ───────────────────────────────────────────────────────────────

/// The terminal event loop.
///
/// ```no_run
/// use n_term::event_loop::{Action, App, EventLoop, LoopConfig};
/// use n_term::input::{Event, KeyCode, KeyEvent};
/// use n_term::output::Screen;
///
/// struct Hello;
///
/// impl App for Hello {
///     fn on_event(&mut self, event: &Event) -> Action {
///         match event {
///             Event::Key(KeyEvent { code: KeyCode::Char('q'), .. }) => Action::Quit,
///             _ => Action::Continue,
///         }
///     }
///
///     fn paint(&mut self, screen: &mut Screen) {
///         screen.line(0, "press q to quit");
///     }
/// }
///
/// EventLoop::new(LoopConfig::default())?.run(&mut Hello)?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct EventLoop {
    terminal: Terminal,
    parser: Parser,
    screen: Screen,
    config: LoopConfig,
    stdin: RawFd,
    /// Where finished frames go.
    output: Box<dyn Write>,
}

impl EventLoop {
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be initialized.
    pub fn new(config: LoopConfig) -> io::Result<Self> {
        let terminal = Terminal::new()?;
        let screen = Screen::new(terminal.size());
        Ok(Self {
            terminal,
            parser: Parser::new(),
            screen,
            config,
            stdin: libc::STDIN_FILENO,
            output: Box::new(io::stdout()),
        })
    }

    /// A loop reading keys from `stdin` and discarding frames, for driving
    /// `run_inner` without a terminal.
    #[cfg(test)]
    fn scripted(stdin: RawFd, config: LoopConfig) -> io::Result<Self> {
        let terminal = Terminal::new()?;
        let screen = Screen::new(terminal.size());
        Ok(Self {
            terminal,
            parser: Parser::new(),
            screen,
            config,
            stdin,
            output: Box::new(io::sink()),
        })
    }

    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.terminal.size()
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> LoopConfig {
        self.config
    }

    /// Take over the terminal and run until the app quits, stdin closes or
    /// a termination signal arrives. The terminal is restored on every one
    /// of those paths, and on error.
    ///
    /// # Errors
    ///
    /// Returns an error if terminal setup, polling or output fails.
    pub fn run(&mut self, app: &mut impl App) -> io::Result<()> {
        self.terminal.enter()?;
        install_signal_handlers();
        info!(size = ?self.terminal.size(), "event loop started");

        let result = self.run_inner(app);

        self.terminal.leave()?;
        info!("event loop stopped");
        result
    }

    fn run_inner(&mut self, app: &mut impl App) -> io::Result<()> {
        let mut buf = [0u8; READ_BUF_SIZE];
        let mut next_tick = Instant::now() + self.config.tick_interval;
        let mut dirty = true;

        loop {
            if TERMINATE.swap(false, Ordering::Relaxed) {
                info!("termination signal");
                return Ok(());
            }

            if RESIZED.swap(false, Ordering::Relaxed) {
                let size = self.terminal.refresh_size();
                debug!(cols = size.cols, rows = size.rows, "resize");
                self.screen.resize(size);
                app.on_resize(size);
                dirty = true;
            }

            if dirty {
                self.render(app)?;
                dirty = false;
            }

            let timeout = next_tick.saturating_duration_since(Instant::now());
            let ready = wait(self.stdin, app.source_fd(), timeout)?;

            if ready.source {
                dirty = true;
                if app.on_readable() == Action::Quit {
                    return Ok(());
                }
            }

            if ready.stdin {
                let Some(events) = self.read_keys(&mut buf)? else {
                    info!("stdin closed");
                    return Ok(());
                };
                dirty |= !events.is_empty();
                for event in &events {
                    if app.on_event(event) == Action::Quit {
                        return Ok(());
                    }
                }
            }

            let now = Instant::now();
            if now >= next_tick {
                next_tick = now + self.config.tick_interval;
                dirty |= app.on_tick();
            }
        }
    }

    /// Read once from stdin and decode, resolving a dangling escape
    /// sequence within `escape_timeout`. `None` on EOF.
    fn read_keys(&mut self, buf: &mut [u8]) -> io::Result<Option<Vec<Event>>> {
        let mut events = match read_stdin(self.stdin, buf)? {
            KeyRead::Eof => return Ok(None),
            KeyRead::Nothing => Vec::new(),
            KeyRead::Data(n) => self.parser.advance(&buf[..n]),
        };

        if self.parser.has_pending() {
            let ready = wait(self.stdin, None, self.config.escape_timeout)?;
            if ready.stdin {
                match read_stdin(self.stdin, buf)? {
                    KeyRead::Eof => return Ok(None),
                    KeyRead::Nothing => {}
                    KeyRead::Data(n) => events.extend(self.parser.advance(&buf[..n])),
                }
            }
            if self.parser.has_pending() {
                events.extend(self.parser.flush());
            }
        }

        Ok(Some(events))
    }

    fn render(&mut self, app: &mut impl App) -> io::Result<()> {
        self.screen.begin_frame();
        app.paint(&mut self.screen);
        self.screen.finish_to(&mut self.output, app.cursor())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::os::fd::AsRawFd;
    use std::os::unix::net::UnixStream;

    #[test]
    fn default_config_is_ten_hertz() {
        let config = LoopConfig::default();
        assert_eq!(config.tick_interval, Duration::from_millis(100));
        assert_eq!(config.escape_timeout, Duration::from_millis(25));
    }

    #[test]
    fn timeout_rounds_up_to_whole_ms() {
        assert_eq!(poll_timeout_ms(Duration::ZERO), 0);
        assert_eq!(poll_timeout_ms(Duration::from_micros(400)), 1);
        assert_eq!(poll_timeout_ms(Duration::from_millis(100)), 100);
        assert_eq!(poll_timeout_ms(Duration::from_secs(u64::MAX)), libc::c_int::MAX);
    }

    #[test]
    fn wait_times_out_when_idle() {
        let (a, _b) = UnixStream::pair().unwrap();
        let start = Instant::now();
        let ready = wait(a.as_raw_fd(), None, Duration::from_millis(20)).unwrap();
        assert_eq!(ready, Ready::default());
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn wait_reports_each_descriptor() {
        let (keys, mut keys_peer) = UnixStream::pair().unwrap();
        let (sock, mut sock_peer) = UnixStream::pair().unwrap();

        sock_peer.write_all(b"x").unwrap();
        let ready = wait(keys.as_raw_fd(), Some(sock.as_raw_fd()), Duration::from_secs(1)).unwrap();
        assert_eq!(ready, Ready { stdin: false, source: true });

        keys_peer.write_all(b"y").unwrap();
        let ready = wait(keys.as_raw_fd(), Some(sock.as_raw_fd()), Duration::from_secs(1)).unwrap();
        assert_eq!(ready, Ready { stdin: true, source: true });
    }

    #[test]
    fn hangup_counts_as_readable() {
        let (keys, _keys_peer) = UnixStream::pair().unwrap();
        let (sock, sock_peer) = UnixStream::pair().unwrap();
        drop(sock_peer);
        let ready = wait(keys.as_raw_fd(), Some(sock.as_raw_fd()), Duration::from_secs(1)).unwrap();
        assert!(ready.source);
        assert!(!ready.stdin);
    }

    #[test]
    fn read_stdin_reads_and_sees_eof() {
        let (a, mut b) = UnixStream::pair().unwrap();
        b.write_all(b"hi").unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(read_stdin(a.as_raw_fd(), &mut buf).unwrap(), KeyRead::Data(2));
        assert_eq!(&buf[..2], b"hi");
        drop(b);
        assert_eq!(read_stdin(a.as_raw_fd(), &mut buf).unwrap(), KeyRead::Eof);
    }

    // ── App trait defaults ─────────────────────────────────────

    struct MinimalApp;
    impl App for MinimalApp {
        fn paint(&mut self, _screen: &mut Screen) {}
    }

    #[test]
    fn app_defaults() {
        let mut app = MinimalApp;
        assert_eq!(app.source_fd(), None);
        assert_eq!(app.on_readable(), Action::Continue);
        assert_eq!(app.on_event(&Event::Paste(String::new())), Action::Continue);
        assert!(!app.on_tick());
        assert!(app.cursor().is_none());
        app.on_resize(Size::FALLBACK);
    }

    // ── Driving the loop ───────────────────────────────────────

    use crate::input::{KeyCode, KeyEvent};
    use std::io::Read;
    use std::sync::Mutex;
    use std::thread;

    /// The signal flags are process-wide; loops under test take turns.
    static LOOP_LOCK: Mutex<()> = Mutex::new(());

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Resize,
        Readable(u8),
        Key(KeyCode),
        Tick,
        Paint,
    }

    /// Records every callback. Quits on `q`, or on reading `quit_byte`
    /// from the source. Each readiness reads a single byte.
    #[derive(Default)]
    struct Scripted {
        source: Option<UnixStream>,
        quit_byte: Option<u8>,
        calls: Vec<Call>,
    }

    impl Scripted {
        fn ticks(&self) -> usize {
            self.calls.iter().filter(|c| **c == Call::Tick).count()
        }

        fn keys(&self) -> Vec<KeyCode> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Key(code) => Some(*code),
                    _ => None,
                })
                .collect()
        }
    }

    impl App for Scripted {
        fn source_fd(&self) -> Option<RawFd> {
            self.source.as_ref().map(AsRawFd::as_raw_fd)
        }

        fn on_readable(&mut self) -> Action {
            let mut byte = [0u8; 1];
            let Some(source) = self.source.as_mut() else {
                return Action::Continue;
            };
            if source.read(&mut byte).unwrap() == 0 {
                self.source = None;
                return Action::Continue;
            }
            self.calls.push(Call::Readable(byte[0]));
            if self.quit_byte == Some(byte[0]) {
                Action::Quit
            } else {
                Action::Continue
            }
        }

        fn on_event(&mut self, event: &Event) -> Action {
            let Event::Key(key) = event else {
                return Action::Continue;
            };
            self.calls.push(Call::Key(key.code));
            if *key == KeyEvent::plain(KeyCode::Char('q')) {
                Action::Quit
            } else {
                Action::Continue
            }
        }

        fn on_resize(&mut self, _size: Size) {
            self.calls.push(Call::Resize);
        }

        fn on_tick(&mut self) -> bool {
            self.calls.push(Call::Tick);
            false
        }

        fn paint(&mut self, _screen: &mut Screen) {
            self.calls.push(Call::Paint);
        }
    }

    fn config(tick_ms: u64, escape_ms: u64) -> LoopConfig {
        LoopConfig {
            tick_interval: Duration::from_millis(tick_ms),
            escape_timeout: Duration::from_millis(escape_ms),
        }
    }

    fn send_later(mut peer: UnixStream, after: Duration, bytes: &'static [u8]) -> thread::JoinHandle<UnixStream> {
        thread::spawn(move || {
            thread::sleep(after);
            peer.write_all(bytes).unwrap();
            peer
        })
    }

    #[test]
    fn lone_escape_becomes_a_key_after_the_timeout() {
        let _turn = LOOP_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let (keys, mut keys_peer) = UnixStream::pair().unwrap();
        keys_peer.write_all(b"\x1b").unwrap();
        let later = send_later(keys_peer, Duration::from_millis(300), b"q");

        let mut app = Scripted::default();
        let mut ev = EventLoop::scripted(keys.as_raw_fd(), config(1000, 20)).unwrap();
        let start = Instant::now();
        ev.run_inner(&mut app).unwrap();
        later.join().unwrap();

        assert_eq!(app.keys(), vec![KeyCode::Escape, KeyCode::Char('q')]);
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[test]
    fn escape_tail_within_the_timeout_completes_the_sequence() {
        let _turn = LOOP_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let (keys, mut keys_peer) = UnixStream::pair().unwrap();
        keys_peer.write_all(b"\x1b").unwrap();
        let later = send_later(keys_peer, Duration::from_millis(10), b"[Aq");

        let mut app = Scripted::default();
        let mut ev = EventLoop::scripted(keys.as_raw_fd(), config(1000, 500)).unwrap();
        ev.run_inner(&mut app).unwrap();
        later.join().unwrap();

        assert_eq!(app.keys(), vec![KeyCode::Up, KeyCode::Char('q')]);
    }

    #[test]
    fn idle_loop_ticks_once_per_interval() {
        let _turn = LOOP_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let (keys, keys_peer) = UnixStream::pair().unwrap();
        let later = send_later(keys_peer, Duration::from_millis(300), b"q");

        let mut app = Scripted::default();
        let mut ev = EventLoop::scripted(keys.as_raw_fd(), config(40, 25)).unwrap();
        let start = Instant::now();
        ev.run_inner(&mut app).unwrap();
        let elapsed = start.elapsed();
        later.join().unwrap();

        let ticks = app.ticks();
        assert!(ticks >= 3, "only {ticks} ticks in {elapsed:?}");
        assert!(ticks as u128 <= elapsed.as_millis() / 40, "{ticks} ticks in {elapsed:?}");
        // Ticks that report no change do not repaint.
        assert_eq!(app.calls.iter().filter(|c| **c == Call::Paint).count(), 1);
    }

    #[test]
    fn each_ready_descriptor_is_serviced_once_per_iteration() {
        let _turn = LOOP_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let (keys, mut keys_peer) = UnixStream::pair().unwrap();
        let (sock, mut sock_peer) = UnixStream::pair().unwrap();
        sock_peer.write_all(b"xyz").unwrap();
        keys_peer.write_all(b"a").unwrap();

        let mut app = Scripted {
            source: Some(sock),
            quit_byte: Some(b'z'),
            ..Scripted::default()
        };
        let mut ev = EventLoop::scripted(keys.as_raw_fd(), config(1000, 25)).unwrap();
        ev.run_inner(&mut app).unwrap();

        assert_eq!(
            app.calls,
            vec![
                Call::Paint,
                Call::Readable(b'x'),
                Call::Key(KeyCode::Char('a')),
                Call::Paint,
                Call::Readable(b'y'),
                Call::Paint,
                Call::Readable(b'z'),
            ]
        );
    }

    #[test]
    fn quit_from_the_source_ends_the_loop() {
        let _turn = LOOP_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let (keys, _keys_peer) = UnixStream::pair().unwrap();
        let (sock, sock_peer) = UnixStream::pair().unwrap();
        let later = send_later(sock_peer, Duration::from_millis(20), b"!");

        let mut app = Scripted {
            source: Some(sock),
            quit_byte: Some(b'!'),
            ..Scripted::default()
        };
        let mut ev = EventLoop::scripted(keys.as_raw_fd(), config(1000, 25)).unwrap();
        ev.run_inner(&mut app).unwrap();
        drop(later.join().unwrap());

        assert_eq!(app.calls, vec![Call::Paint, Call::Readable(b'!')]);
    }

    #[test]
    fn quit_key_stops_before_the_rest_of_the_read() {
        let _turn = LOOP_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let (keys, mut keys_peer) = UnixStream::pair().unwrap();
        keys_peer.write_all(b"aqb").unwrap();

        let mut app = Scripted::default();
        let mut ev = EventLoop::scripted(keys.as_raw_fd(), config(1000, 25)).unwrap();
        ev.run_inner(&mut app).unwrap();

        assert_eq!(app.keys(), vec![KeyCode::Char('a'), KeyCode::Char('q')]);
    }

    #[test]
    fn stdin_eof_ends_the_loop() {
        let _turn = LOOP_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let (keys, keys_peer) = UnixStream::pair().unwrap();
        drop(keys_peer);

        let mut app = Scripted::default();
        let mut ev = EventLoop::scripted(keys.as_raw_fd(), config(1000, 25)).unwrap();
        ev.run_inner(&mut app).unwrap();
        assert_eq!(app.calls, vec![Call::Paint]);
    }

    #[test]
    fn signal_flags_are_honoured_each_iteration() {
        let _turn = LOOP_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let (keys, mut keys_peer) = UnixStream::pair().unwrap();

        let mut app = Scripted::default();
        let mut ev = EventLoop::scripted(keys.as_raw_fd(), config(1000, 25)).unwrap();

        TERMINATE.store(true, Ordering::Relaxed);
        ev.run_inner(&mut app).unwrap();
        assert!(app.calls.is_empty(), "terminates before the first paint");

        RESIZED.store(true, Ordering::Relaxed);
        keys_peer.write_all(b"q").unwrap();
        ev.run_inner(&mut app).unwrap();
        assert_eq!(app.calls, vec![Call::Resize, Call::Paint, Call::Key(KeyCode::Char('q'))]);
    }
}
