use std::convert::Infallible;
use std::os::fd::{AsRawFd, IntoRawFd, RawFd};

use libc::{STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use nix::errno::Errno;
use nix::sys::signal::{signal, SigHandler, Signal};
use nix::unistd::{execv, fork, ForkResult, Pid};
use tracing::debug;

use crate::command::CommandSpec;
use crate::endpoints::Endpoints;
use crate::error::{ChildError, PipexError};
use crate::logging;
use crate::pipes::{create_pipes, Pipe};
use crate::reaper;
use crate::resolve::SearchPath;

/// Where a child's standard input comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Input,
    /// Read end of `pipes[i]`.
    Pipe(usize),
}

/// Where a child's standard output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    Output,
    /// Write end of `pipes[i]`.
    Pipe(usize),
}

/// Redirection of one child, decided only by its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wiring {
    pub stdin: Source,
    pub stdout: Sink,
}

impl Wiring {
    /// First reads the input endpoint, last writes the output endpoint,
    /// everything else sits between `pipes[index - 1]` and `pipes[index]`.
    /// A lone command gets both endpoints.
    pub fn for_position(index: usize, count: usize) -> Self {
        let stdin = if index == 0 {
            Source::Input
        } else {
            Source::Pipe(index - 1)
        };
        let stdout = if index + 1 == count {
            Sink::Output
        } else {
            Sink::Pipe(index)
        };
        Self { stdin, stdout }
    }
}

/// Immutable half of the pipeline: what to run, in order.
#[derive(Debug, Clone)]
pub struct Plan {
    commands: Vec<CommandSpec>,
}

impl Plan {
    pub fn new<S: AsRef<str>>(raw: &[S], search: &SearchPath) -> Self {
        let commands: Vec<CommandSpec> = raw
            .iter()
            .map(|cmd| CommandSpec::parse(cmd.as_ref(), search))
            .collect();
        for (index, command) in commands.iter().enumerate() {
            if !command.is_resolved() {
                debug!(index, command = command.name(), "unresolved, child will fail");
            }
        }
        Self { commands }
    }

    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }
}

/// Per-process half: every descriptor the pipeline owns.
#[derive(Debug)]
pub struct Resources {
    endpoints: Endpoints,
    pipes: Vec<Pipe>,
}

impl Resources {
    fn source_fd(&self, source: Source) -> RawFd {
        match source {
            Source::Input => self.endpoints.input.as_raw_fd(),
            Source::Pipe(i) => self.pipes[i].read.as_raw_fd(),
        }
    }

    fn sink_fd(&self, sink: Sink) -> RawFd {
        match sink {
            Sink::Output => self.endpoints.output.as_raw_fd(),
            Sink::Pipe(i) => self.pipes[i].write.as_raw_fd(),
        }
    }

    /// Close every owned descriptor after redirection. Descriptors that
    /// already sit on a standard slot now carry the redirected stream and
    /// are left open.
    fn close_after_redirect(self) {
        let Resources { endpoints, pipes } = self;
        let all = [endpoints.input, endpoints.output]
            .into_iter()
            .chain(pipes.into_iter().flat_map(|p| [p.read, p.write]));
        for fd in all {
            if is_standard_slot(fd.as_raw_fd()) {
                let _ = fd.into_raw_fd();
            } else {
                drop(fd);
            }
        }
    }

    pub fn descriptor_count(&self) -> usize {
        2 + 2 * self.pipes.len()
    }
}

fn is_standard_slot(fd: RawFd) -> bool {
    matches!(fd, STDIN_FILENO | STDOUT_FILENO | STDERR_FILENO)
}

/// A forked child, index `i` running `plan.commands()[i]`.
#[derive(Debug, Clone)]
pub struct ChildRecord {
    pub index: usize,
    pub pid: Pid,
    pub name: String,
}

pub struct Pipeline {
    plan: Plan,
    resources: Resources,
}

impl Pipeline {
    /// Create the pipe fabric for `plan` around already opened endpoints.
    pub fn new(plan: Plan, endpoints: Endpoints) -> Result<Self, PipexError> {
        let pipes = create_pipes(plan.len().saturating_sub(1))?;
        let resources = Resources { endpoints, pipes };
        debug!(
            commands = plan.len(),
            descriptors = resources.descriptor_count(),
            "pipeline ready"
        );
        Ok(Self { plan, resources })
    }

    /// Fork every command, release the parent's descriptors and reap.
    ///
    /// Returns the exit status of the last command.
    pub fn run(self) -> Result<i32, PipexError> {
        let Pipeline { plan, resources } = self;
        let count = plan.len();
        let mut children: Vec<ChildRecord> = Vec::with_capacity(count);

        for (index, command) in plan.commands().iter().enumerate() {
            let wiring = Wiring::for_position(index, count);

            // SAFETY: the process is single threaded; the child only
            // redirects, closes, execs or exits.
            match unsafe { fork() } {
                Ok(ForkResult::Child) => run_child(command, wiring, resources),
                Ok(ForkResult::Parent { child }) => {
                    debug!(
                        index,
                        pid = child.as_raw(),
                        args = ?command.tokens(),
                        path = ?command.target().map(|t| &t.path),
                        "forked"
                    );
                    children.push(ChildRecord {
                        index,
                        pid: child,
                        name: command.name().to_string(),
                    });
                }
                Err(errno) => {
                    drop(resources);
                    reaper::abort(&children);
                    return Err(PipexError::Fork(errno));
                }
            }
        }

        // The parent does no I/O; its copies must go before waiting or
        // readers downstream never see end of file.
        drop(resources);
        reaper::reap(&children)
    }
}

/// Child entry point after `fork`. Never returns.
fn run_child(command: &CommandSpec, wiring: Wiring, resources: Resources) -> ! {
    let err = match exec_child(command, wiring, resources) {
        Ok(never) => match never {},
        Err(err) => err,
    };
    logging::report(&err);
    // SAFETY: terminates the forked child without running parent-owned
    // destructors or flushing buffers copied from the parent.
    unsafe { libc::_exit(err.exit_code()) }
}

fn exec_child(
    command: &CommandSpec,
    wiring: Wiring,
    resources: Resources,
) -> Result<Infallible, ChildError> {
    let target = command.target().ok_or_else(|| ChildError::NotFound {
        name: command.name().to_string(),
    })?;

    redirect(resources.source_fd(wiring.stdin), STDIN_FILENO)?;
    redirect(resources.sink_fd(wiring.stdout), STDOUT_FILENO)?;
    resources.close_after_redirect();
    restore_default_signals()?;

    execv(&target.c_path, &target.c_args).map_err(|source| ChildError::Exec {
        name: command.name().to_string(),
        source,
    })
}

/// The Rust runtime starts with SIGPIPE ignored, and an ignored disposition
/// survives exec. Commands must get the default so an upstream writer dies
/// when its reader goes away.
fn restore_default_signals() -> Result<(), ChildError> {
    // SAFETY: installs the default disposition, no handler code involved.
    unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) }
        .map(drop)
        .map_err(ChildError::Signal)
}

fn redirect(fd: RawFd, slot: RawFd) -> Result<(), ChildError> {
    if fd == slot {
        return Ok(());
    }
    // SAFETY: both descriptors are plain integers; dup2 does not touch memory.
    Errno::result(unsafe { libc::dup2(fd, slot) })
        .map(drop)
        .map_err(ChildError::Redirect)
}
