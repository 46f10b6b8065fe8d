use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::process::{Child, ChildStdin, ChildStdout, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{Result, TransportError};
use crate::stream::{HelperStream, Readiness};

const SHELL: &str = "/bin/sh";

/// How long drop waits for a helper to exit after its pipes close.
const REAP_GRACE: Duration = Duration::from_millis(100);
const REAP_POLL: Duration = Duration::from_millis(2);

/// The server's ends of a running helper's stdin/stdout pipes.
///
/// Both ends are non-blocking. Dropping this closes both pipes and gives the
/// helper a short grace period to exit. A helper still running after that is
/// handed to a detached reaper thread, so no zombie outlives the channel.
pub struct HelperPipes {
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    child: Option<Child>,
    pid: u32,
}

/// Launch `command` through `/bin/sh -c` with piped stdin/stdout.
///
/// The helper's stderr is inherited so its diagnostics reach the server's
/// log. Both server-side pipe ends are switched to non-blocking mode before
/// returning.
pub fn launch(command: &str) -> Result<HelperPipes> {
    let mut child = Command::new(SHELL)
        .arg("-c")
        .arg(command)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| TransportError::Spawn {
            command: command.to_string(),
            source,
        })?;

    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let pipes = HelperPipes {
        stdin,
        stdout,
        pid: child.id(),
        child: Some(child),
    };

    let stdin_fd = pipes
        .stdin
        .as_ref()
        .map(AsRawFd::as_raw_fd)
        .ok_or(TransportError::MissingPipe("stdin"))?;
    let stdout_fd = pipes
        .stdout
        .as_ref()
        .map(AsRawFd::as_raw_fd)
        .ok_or(TransportError::MissingPipe("stdout"))?;

    set_nonblocking(stdin_fd).map_err(|source| TransportError::NonBlocking {
        pipe: "stdin",
        source,
    })?;
    set_nonblocking(stdout_fd).map_err(|source| TransportError::NonBlocking {
        pipe: "stdout",
        source,
    })?;

    debug!(pid = pipes.pid, command, "launched login helper");
    Ok(pipes)
}

fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    // SAFETY: `fd` is an open pipe descriptor owned by a live `ChildStdin`/`ChildStdout`.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: Same descriptor as above; only the O_NONBLOCK status flag is added.
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn closed(pipe: &str) -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, format!("helper {pipe} closed"))
}

impl HelperPipes {
    /// Non-blocking check for helper exit; reaps it if it has exited.
    pub fn try_reap(&mut self) -> io::Result<Option<ExitStatus>> {
        match self.child.as_mut() {
            Some(child) => child.try_wait(),
            None => Ok(None),
        }
    }

    /// Close the write side so the helper sees end-of-input.
    pub fn close_input(&mut self) {
        if self.stdin.take().is_some() {
            debug!(pid = self.pid, "closed helper stdin");
        }
    }
}

impl HelperStream for HelperPipes {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.stdout.as_mut() {
            Some(stdout) => stdout.read(buf),
            None => Err(closed("stdout")),
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.stdin.as_mut() {
            Some(stdin) => stdin.write(buf),
            None => Err(closed("stdin")),
        }
    }

    fn poll_ready(&mut self, want_write: bool) -> io::Result<Readiness> {
        let mut fds = [
            libc::pollfd {
                fd: self.stdout.as_ref().map_or(-1, AsRawFd::as_raw_fd),
                events: libc::POLLIN,
                revents: 0,
            },
            libc::pollfd {
                fd: match (&self.stdin, want_write) {
                    (Some(stdin), true) => stdin.as_raw_fd(),
                    _ => -1,
                },
                events: libc::POLLOUT,
                revents: 0,
            },
        ];

        // SAFETY: `fds` is a valid array of two pollfd entries for the duration of the call;
        // negative descriptors are ignored by poll(2). A zero timeout never blocks.
        let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, 0) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(Readiness::NONE);
            }
            return Err(err);
        }

        // Hang-up and error conditions count as ready so the following
        // read/write observes them.
        let wake = libc::POLLHUP | libc::POLLERR | libc::POLLNVAL;
        Ok(Readiness {
            readable: fds[0].revents & (libc::POLLIN | wake) != 0,
            writable: fds[1].revents & (libc::POLLOUT | wake) != 0,
        })
    }

    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }
}

impl Drop for HelperPipes {
    fn drop(&mut self) {
        self.stdin.take();
        self.stdout.take();

        let pid = self.pid;
        let Some(mut child) = self.child.take() else {
            return;
        };

        let deadline = Instant::now() + REAP_GRACE;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!(pid, %status, "helper exited");
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(REAP_POLL),
                Ok(None) => break,
                Err(err) => {
                    warn!(pid, error = %err, "failed to reap helper");
                    return;
                }
            }
        }

        debug!(pid, "helper still running after pipes closed, reaping in background");
        let spawned = thread::Builder::new()
            .name(format!("helperlink-reap-{pid}"))
            .spawn(move || match child.wait() {
                Ok(status) => debug!(pid, %status, "helper exited"),
                Err(err) => warn!(pid, error = %err, "failed to reap helper"),
            });
        if let Err(err) = spawned {
            warn!(pid, error = %err, "failed to start helper reaper");
        }
    }
}

impl std::fmt::Debug for HelperPipes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelperPipes")
            .field("pid", &self.pid)
            .field("stdin_open", &self.stdin.is_some())
            .field("stdout_open", &self.stdout.is_some())
            .finish()
    }
}
