use std::io;
use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

/// Failures owned by the orchestrating process. All of them are fatal:
/// they are reported once from `main` and the process exits with status 1.
#[derive(Error, Debug)]
pub enum PipexError {
    #[error("{0}")]
    Usage(&'static str),

    #[error("unexpected error: empty environment")]
    Environment,

    #[error("{}: {}", .path.display(), io_reason(.source))]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {}", .path.display(), io_reason(.source))]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("here_doc: {}", io_reason(.0))]
    Heredoc(#[source] io::Error),

    #[error("pipe: {}", .0.desc())]
    Pipe(#[source] Errno),

    #[error("fork: {}", .0.desc())]
    Fork(#[source] Errno),

    #[error("wait: {}", .0.desc())]
    Wait(#[source] Errno),
}

impl PipexError {
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Failures on the child side of the fork. The child reports one of these
/// and terminates; it never hands it back to the fork loop.
#[derive(Error, Debug)]
pub enum ChildError {
    #[error("command not found: {name}")]
    NotFound { name: String },

    #[error("dup2: {}", .0.desc())]
    Redirect(#[source] Errno),

    #[error("signal: {}", .0.desc())]
    Signal(#[source] Errno),

    #[error("{name}: {}", .source.desc())]
    Exec {
        name: String,
        #[source]
        source: Errno,
    },
}

impl ChildError {
    pub fn exit_code(&self) -> i32 {
        match self {
            ChildError::NotFound { .. } => 127,
            ChildError::Redirect(_) | ChildError::Signal(_) => 1,
            ChildError::Exec { source, .. } => match source {
                Errno::ENOENT => 127,
                Errno::EACCES | Errno::ENOEXEC | Errno::EISDIR | Errno::EPERM => 126,
                _ => 1,
            },
        }
    }
}

/// `io::Error`'s Display appends "(os error N)"; diagnostics only want the text.
fn io_reason(err: &io::Error) -> String {
    match err.raw_os_error() {
        Some(code) => Errno::from_raw(code).desc().to_string(),
        None => err.to_string(),
    }
}
