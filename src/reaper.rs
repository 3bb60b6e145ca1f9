use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{wait, waitpid, WaitStatus};
use nix::unistd::Pid;
use tracing::{debug, warn};

use crate::error::PipexError;
use crate::pipeline::ChildRecord;

/// Exit code used when the last command's status cannot be read as a
/// normal exit.
pub const FALLBACK_STATUS: i32 = 1;

/// Wait for every child and return the last command's exit status.
///
/// Children are collected in whatever order they terminate; only the
/// status of the last one in the pipeline decides the result.
pub fn reap(children: &[ChildRecord]) -> Result<i32, PipexError> {
    let last = children.last().map(|c| c.pid);
    let mut pending: Vec<&ChildRecord> = children.iter().collect();
    let mut exit_code = FALLBACK_STATUS;

    while !pending.is_empty() {
        let status = match wait() {
            Ok(status) => status,
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => {
                warn!(remaining = pending.len(), "no children left to wait for");
                break;
            }
            Err(e) => return Err(PipexError::Wait(e)),
        };

        let Some(pid) = terminated_pid(&status) else {
            continue;
        };
        if let Some(pos) = pending.iter().position(|c| c.pid == pid) {
            let child = pending.swap_remove(pos);
            debug!(index = child.index, command = %child.name, ?status, "reaped");
        }

        if Some(pid) == last {
            exit_code = exit_code_of(&status);
        }
    }

    Ok(exit_code)
}

/// Stop and reap children forked before a setup failure.
pub fn abort(children: &[ChildRecord]) {
    for child in children {
        if let Err(e) = kill(child.pid, Signal::SIGTERM) {
            debug!(pid = child.pid.as_raw(), error = %e, "kill failed");
        }
    }
    for child in children {
        let _ = waitpid(child.pid, None);
    }
}

/// Pipeline status carried by a terminated child.
pub fn exit_code_of(status: &WaitStatus) -> i32 {
    match status {
        WaitStatus::Exited(_, code) => *code,
        _ => FALLBACK_STATUS,
    }
}

fn terminated_pid(status: &WaitStatus) -> Option<Pid> {
    match status {
        WaitStatus::Exited(pid, _) | WaitStatus::Signaled(pid, _, _) => Some(*pid),
        _ => None,
    }
}
