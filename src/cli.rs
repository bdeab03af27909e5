// SPDX-License-Identifier: MIT
//
// Command-line options.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use n_client::scrollback::Retention;
use n_term::event_loop::LoopConfig;

#[derive(Parser, Debug)]
#[command(name = "n-chat")]
#[command(version)]
#[command(about = "Terminal chat client")]
pub struct Args {
    /// Server host name or address
    #[arg(env = "N_CHAT_HOST")]
    pub host: String,

    /// Server port
    #[arg(short, long, env = "N_CHAT_PORT", default_value_t = 6667)]
    pub port: u16,

    /// Keep only the latest message instead of a scrollback history
    #[arg(long)]
    pub no_scrollback: bool,

    /// Keep at most this many messages per pane
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub scrollback_limit: Option<u32>,

    /// Event loop tick in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 100, value_parser = clap::value_parser!(u64).range(10..=1000))]
    pub tick_ms: u64,

    /// How long to wait for the rest of an escape sequence, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 25, value_parser = clap::value_parser!(u64).range(1..=1000))]
    pub escape_timeout_ms: u64,

    /// Log file (default: n-chat.log in the temp directory)
    #[arg(long, env = "N_CHAT_LOG")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    #[must_use]
    pub fn retention(&self) -> Retention {
        self.scrollback_limit
            .map_or(Retention::Unbounded, |n| Retention::Latest(usize::try_from(n).unwrap_or(usize::MAX)))
    }

    #[must_use]
    pub const fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            tick_interval: Duration::from_millis(self.tick_ms),
            escape_timeout: Duration::from_millis(self.escape_timeout_ms),
        }
    }

    #[must_use]
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("n-chat.log"))
    }
}
