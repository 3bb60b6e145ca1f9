use std::os::fd::OwnedFd;

use nix::unistd::pipe;
use tracing::debug;

use crate::error::PipexError;

/// One inter-process channel between command `i` and command `i + 1`.
#[derive(Debug)]
pub struct Pipe {
    pub read: OwnedFd,
    pub write: OwnedFd,
}

/// Create the `count` pipes that connect `count + 1` commands.
///
/// All pipes exist before the first fork so every child inherits the full
/// set. On failure the pipes created so far are closed as the partial
/// vector drops.
pub fn create_pipes(count: usize) -> Result<Vec<Pipe>, PipexError> {
    let mut pipes = Vec::with_capacity(count);
    for _ in 0..count {
        let (read, write) = pipe().map_err(PipexError::Pipe)?;
        pipes.push(Pipe { read, write });
    }
    debug!(count, descriptors = 2 * count, "pipes created");
    Ok(pipes)
}
