// src/coordinator/mod.rs

//! Coordination of one guarded run.
//!
//! Acquire the lock, start the child, forward termination signals to it
//! while it runs, release the lock once it has terminated, report its exit
//! status.
//!
//! The pure state machine lives in [`core`] (with the per-event handlers in
//! [`transitions`]); the async/IO shell that talks to the lock store, the
//! child process and the signal stream is implemented in [`runtime`].

use nix::sys::signal::Signal;

pub mod core;
pub mod runtime;
pub mod transitions;

pub use core::CoordinatorCore;
pub use runtime::Coordinator;

/// States of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Acquiring,
    /// Lock held. `child_started` flips once the process exists.
    Running { child_started: bool },
    /// Lost the race with retry disabled. Terminal, exit status 0.
    Denied,
    /// Child is gone; waiting for the lock release before reporting `status`.
    Releasing { status: i32 },
    Done { status: i32 },
}

impl CoordinatorState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CoordinatorState::Denied | CoordinatorState::Done { .. })
    }
}

/// Events flowing into the core from the lock manager, the supervisor and
/// the signal stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEvent {
    Start,
    LockAcquired,
    /// Key held elsewhere and retry disabled.
    LockDenied,
    /// Store transport/backend failure while acquiring.
    LockFailed(String),
    ChildStarted { pid: u32 },
    SpawnFailed(String),
    SignalReceived(Signal),
    ChildExited { status: i32 },
    WaitFailed(String),
    LockReleased,
    /// Something the shell did not expect went wrong.
    Fault(String),
}

/// Command produced by the core, to be executed by the IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorCommand {
    AcquireLock,
    SpawnChild,
    ForwardSignal(Signal),
    ReleaseLock,
    /// Stop and report this exit status.
    Exit(i32),
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorStep {
    /// Commands the shell should execute, in order.
    pub commands: Vec<CoordinatorCommand>,
    /// Whether the shell loop should keep running.
    pub keep_running: bool,
}

impl CoordinatorStep {
    pub(crate) fn run(commands: Vec<CoordinatorCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    pub(crate) fn exit(status: i32) -> Self {
        Self {
            commands: vec![CoordinatorCommand::Exit(status)],
            keep_running: false,
        }
    }

    pub(crate) fn idle() -> Self {
        Self::run(Vec::new())
    }
}
