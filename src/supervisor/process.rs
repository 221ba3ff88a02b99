// src/supervisor/process.rs

//! A single supervised child process.

use std::os::unix::process::ExitStatusExt;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::{Id, WaitPidFlag, waitid};
use nix::unistd::Pid;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{CommandSpec, Completion, ExitReport, OutputMode};
use crate::errors::{Result, SherlockError};
use crate::exit_codes;

/// Handle to a running (or finished) child.
///
/// The child is placed in a new process group, so a Ctrl-C on the terminal
/// reaches only the supervisor; everything the child receives is forwarded
/// explicitly through [`ManagedProcess::signal`].
#[derive(Debug)]
pub struct ManagedProcess {
    pid: Pid,
    command: String,
    exited: Arc<AtomicBool>,
    completion: oneshot::Receiver<Completion>,
}

impl ManagedProcess {
    /// Spawn `spec` and start its wait worker.
    ///
    /// Fails synchronously if the process cannot be created. Must be called
    /// from within a Tokio runtime.
    pub fn start(spec: &CommandSpec, output: OutputMode) -> Result<Self> {
        let command = spec.to_string();

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .process_group(0)
            .stdin(Stdio::inherit())
            .kill_on_drop(true);
        match output {
            OutputMode::Inherit => {
                cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
            OutputMode::Capture => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
        }

        let mut child = cmd.spawn().map_err(|source| SherlockError::Spawn {
            command: command.clone(),
            source,
        })?;

        let raw_pid = child.id().ok_or_else(|| SherlockError::Spawn {
            command: command.clone(),
            source: std::io::Error::other("child exited before its pid was read"),
        })?;
        let pid = Pid::from_raw(raw_pid as i32);
        info!(pid = raw_pid, %command, "process started");

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let exited = Arc::new(AtomicBool::new(false));
        let (tx, rx) = oneshot::channel::<Completion>();

        let exited_flag = Arc::clone(&exited);
        tokio::spawn(async move {
            // The pid stays reserved until it is reaped, so the flag is set
            // before `child.wait()` reaps it.
            await_exit(pid).await;
            exited_flag.store(true, Ordering::SeqCst);
            let status = child.wait().await;

            let completion = match status {
                Ok(status) => {
                    let (code, signal) = match (status.code(), status.signal()) {
                        (Some(code), _) => (code, None),
                        (None, Some(sig)) => (exit_codes::from_signal(sig), Some(sig)),
                        (None, None) => (exit_codes::PROCESS_FAILURE, None),
                    };
                    debug!(pid = raw_pid, status = code, ?signal, "process exited");
                    Ok(ExitReport {
                        status: code,
                        signal,
                        stdout: collect(stdout).await,
                        stderr: collect(stderr).await,
                    })
                }
                Err(err) => Err(SherlockError::Wait(err)),
            };

            if tx.send(completion).is_err() {
                debug!(pid = raw_pid, "nobody waiting for process completion");
            }
        });

        Ok(Self {
            pid,
            command,
            exited,
            completion: rx,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid.as_raw() as u32
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Whether the wait worker has observed the child's termination.
    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    /// Forward `sig` to the child.
    ///
    /// Returns [`SherlockError::ProcessExited`] once the child has
    /// terminated. The wait worker marks the child exited before reaping
    /// it, so the pid cannot have been recycled while the flag is unset.
    pub fn signal(&self, sig: Signal) -> Result<()> {
        if self.has_exited() {
            return Err(SherlockError::ProcessExited);
        }
        kill(self.pid, sig)?;
        Ok(())
    }

    /// Wait for the completion event.
    ///
    /// Cancel safe, so it can sit in a `select!` loop. Must not be awaited
    /// again after it has returned.
    pub async fn wait(&mut self) -> Completion {
        match (&mut self.completion).await {
            Ok(completion) => completion,
            Err(_) => {
                warn!(pid = self.pid(), "process wait worker stopped without reporting");
                Err(SherlockError::Wait(std::io::Error::other(
                    "wait worker stopped without reporting",
                )))
            }
        }
    }
}

/// Block until `pid` has terminated, leaving it unreaped.
async fn await_exit(pid: Pid) {
    let waited = tokio::task::spawn_blocking(move || {
        loop {
            match waitid(Id::Pid(pid), WaitPidFlag::WEXITED | WaitPidFlag::WNOWAIT) {
                Err(Errno::EINTR) => continue,
                other => return other,
            }
        }
    })
    .await;

    match waited {
        Ok(Ok(_)) => {}
        Ok(Err(errno)) => warn!(pid = pid.as_raw(), %errno, "waitid failed"),
        Err(err) => warn!(pid = pid.as_raw(), error = %err, "exit watcher stopped"),
    }
}

fn drain<R>(mut pipe: R) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Err(err) = pipe.read_to_end(&mut buf).await {
            debug!(error = %err, "reading captured output failed");
        }
        buf
    })
}

async fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Option<Vec<u8>> {
    match handle {
        Some(handle) => Some(handle.await.unwrap_or_default()),
        None => None,
    }
}
