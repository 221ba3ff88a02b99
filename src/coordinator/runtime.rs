// src/coordinator/runtime.rs

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;

use nix::sys::signal::Signal;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::RunConfiguration;
use crate::errors::SherlockError;
use crate::exit_codes;
use crate::lock::{Acquisition, LockGuard, LockManager};
use crate::supervisor::{
    CommandSpec, Completion, ExitReport, ManagedProcess, OutputMode, SignalSource,
};

use super::core::CoordinatorCore;
use super::{CoordinatorCommand, CoordinatorEvent};

/// Drives [`CoordinatorCore`] against the real world: the lock store, the
/// child process and the signal stream.
///
/// This is the single place where the lock is released and the final exit
/// status is chosen.
pub struct Coordinator<S: SignalSource> {
    core: CoordinatorCore,
    lock: LockManager,
    command: CommandSpec,
    output: OutputMode,
    signal_source: S,
    guard: Option<LockGuard>,
    child: Option<ManagedProcess>,
    signals: Option<mpsc::Receiver<Signal>>,
}

impl<S: SignalSource> fmt::Debug for Coordinator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("core", &self.core)
            .field("lock", &self.lock)
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

impl<S: SignalSource + 'static> Coordinator<S> {
    pub fn new(config: &RunConfiguration, lock: LockManager, signal_source: S) -> Self {
        Self {
            core: CoordinatorCore::new(),
            lock,
            command: config.command().clone(),
            output: config.output(),
            signal_source,
            guard: None,
            child: None,
            signals: None,
        }
    }

    /// Run to completion and return the exit status for this process.
    ///
    /// The state machine is driven on its own Tokio task. If that task
    /// panics, the fault is logged, the lock is released if it is still
    /// held, and [`exit_codes::PROCESS_FAILURE`] is returned.
    pub async fn run(self) -> i32 {
        let lock = self.lock.clone();
        let command = self.command.to_string();

        match tokio::spawn(self.drive()).await {
            Ok(status) => status,
            Err(err) => {
                let detail = if err.is_panic() {
                    panic_message(err.into_panic())
                } else {
                    err.to_string()
                };
                error!(
                    %command,
                    key = lock.key(),
                    fault = %detail,
                    "unexpected fault while supervising; releasing lock"
                );
                lock.release_if_held().await;
                exit_codes::PROCESS_FAILURE
            }
        }
    }

    /// Main event loop.
    ///
    /// - Feeds events into the core.
    /// - Executes the commands it returns; executing a command may queue
    ///   follow-up events (lock outcome, child started, ...).
    /// - With nothing queued, waits for whichever comes first: child
    ///   completion or a signal.
    async fn drive(mut self) -> i32 {
        let mut queue = VecDeque::from([CoordinatorEvent::Start]);

        loop {
            let event = match queue.pop_front() {
                Some(event) => event,
                None => self.next_event().await,
            };
            debug!(?event, state = ?self.core.state(), "coordinator received event");

            let step = self.core.step(event);
            for command in step.commands {
                if let Some(status) = self.execute(command, &mut queue).await {
                    info!(status, "sherlock finished");
                    return status;
                }
            }

            if !step.keep_running {
                let status = self
                    .core
                    .exit_status()
                    .unwrap_or(exit_codes::PROCESS_FAILURE);
                info!(status, "sherlock finished");
                return status;
            }
        }
    }

    async fn execute(
        &mut self,
        command: CoordinatorCommand,
        queue: &mut VecDeque<CoordinatorEvent>,
    ) -> Option<i32> {
        match command {
            CoordinatorCommand::AcquireLock => queue.push_back(self.acquire().await),
            CoordinatorCommand::SpawnChild => queue.push_back(self.spawn_child()),
            CoordinatorCommand::ForwardSignal(signal) => self.forward(signal),
            CoordinatorCommand::ReleaseLock => {
                match self.guard.take() {
                    Some(guard) => guard.release().await,
                    None => {
                        self.lock.release_if_held().await;
                    }
                }
                queue.push_back(CoordinatorEvent::LockReleased);
            }
            CoordinatorCommand::Exit(status) => return Some(status),
        }
        None
    }

    async fn acquire(&mut self) -> CoordinatorEvent {
        match self.lock.acquire().await {
            Ok(Acquisition::Acquired(guard)) => {
                self.guard = Some(guard);
                CoordinatorEvent::LockAcquired
            }
            Ok(Acquisition::Denied) => {
                info!(
                    key = self.lock.key(),
                    "acquired by somebody else and retry disabled with --once; not running"
                );
                CoordinatorEvent::LockDenied
            }
            Err(err) => {
                error!(key = self.lock.key(), error = %err, "failed to acquire lock");
                CoordinatorEvent::LockFailed(err.to_string())
            }
        }
    }

    /// Start listening for signals, then spawn the child.
    ///
    /// Listening first means a signal sent while the child is being created
    /// is held by the core and delivered once the child exists.
    fn spawn_child(&mut self) -> CoordinatorEvent {
        match self.signal_source.listen() {
            Ok(rx) => self.signals = Some(rx),
            Err(err) => warn!(error = %err, "signal forwarding unavailable"),
        }

        info!(command = %self.command, "running");
        match ManagedProcess::start(&self.command, self.output) {
            Ok(child) => {
                let pid = child.pid();
                self.child = Some(child);
                CoordinatorEvent::ChildStarted { pid }
            }
            Err(err) => {
                error!(command = %self.command, error = %err, "failed to start process");
                CoordinatorEvent::SpawnFailed(err.to_string())
            }
        }
    }

    fn forward(&self, signal: Signal) {
        let Some(child) = self.child.as_ref() else {
            warn!(%signal, "no child to forward signal to");
            return;
        };
        match child.signal(signal) {
            Ok(()) => info!(%signal, pid = child.pid(), "forwarded signal to process"),
            Err(SherlockError::ProcessExited) => {
                debug!(%signal, "process already exited; signal not forwarded")
            }
            Err(err) => warn!(%signal, error = %err, "failed to forward signal"),
        }
    }

    async fn next_event(&mut self) -> CoordinatorEvent {
        let Some(child) = self.child.as_mut() else {
            return CoordinatorEvent::Fault("waiting for events with no child running".to_string());
        };

        let completion = match self.signals.as_mut() {
            Some(signals) => tokio::select! {
                completion = child.wait() => completion,
                Some(signal) = signals.recv() => {
                    debug!(%signal, "signal received while child running");
                    return CoordinatorEvent::SignalReceived(signal);
                }
            },
            None => child.wait().await,
        };

        self.child = None;
        self.signals = None;
        completion_event(completion)
    }
}

fn completion_event(completion: Completion) -> CoordinatorEvent {
    match completion {
        Ok(report) => {
            log_captured_output(&report);
            debug!(status = report.status, signal = ?report.signal, "program exited");
            CoordinatorEvent::ChildExited {
                status: report.status,
            }
        }
        Err(err) => {
            error!(error = %err, "process execution failed");
            CoordinatorEvent::WaitFailed(err.to_string())
        }
    }
}

fn log_captured_output(report: &ExitReport) {
    if let Some(stdout) = &report.stdout {
        info!("Program stdout:\n{}", String::from_utf8_lossy(stdout));
    }
    if let Some(stderr) = &report.stderr {
        info!("Program stderr:\n{}", String::from_utf8_lossy(stderr));
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
