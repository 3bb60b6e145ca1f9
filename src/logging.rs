use std::fmt::Display;
use std::io::{self, IsTerminal, Write};

use colored::Colorize;
use tracing_subscriber::EnvFilter;

pub const PROGRAM: &str = "pipex";

/// Initialize structured logging with tracing-subscriber.
///
/// Uses `PIPEX_LOG` if set, then `RUST_LOG`, otherwise falls back to the
/// provided level. Everything goes to stderr: stdout may be a pipeline sink.
pub fn init(log_level: &str) {
    let env_filter = EnvFilter::try_from_env("PIPEX_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

/// Write a user-facing diagnostic to stderr, prefixed with the program name.
pub fn report(message: impl Display) {
    let mut stderr = io::stderr().lock();
    let prefix = if stderr.is_terminal() {
        format!("{}:", PROGRAM).red().bold().to_string()
    } else {
        format!("{}:", PROGRAM)
    };
    let _ = writeln!(stderr, "{} {}", prefix, message);
}
