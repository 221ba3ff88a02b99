// src/coordinator/core.rs

//! Pure coordinator state machine.
//!
//! Consumes [`CoordinatorEvent`]s and produces the updated state plus the
//! commands the shell (`coordinator::runtime::Coordinator`) should run.
//! No Tokio, channels, sockets or processes in here, so every transition
//! can be driven from a unit test with synthetic events.

use nix::sys::signal::Signal;
use tracing::debug;

use crate::coordinator::transitions::{
    handle_child_exit, handle_child_started, handle_fault, handle_lock_outcome,
    handle_release, handle_signal, handle_spawn_failure, handle_start,
};
use crate::coordinator::{CoordinatorEvent, CoordinatorState, CoordinatorStep};

/// Pure core state.
///
/// Besides the state itself it keeps the signals that arrived after the
/// lock was taken but before the child existed; they are forwarded as soon
/// as the child has started.
#[derive(Debug)]
pub struct CoordinatorCore {
    state: CoordinatorState,
    pending_signals: Vec<Signal>,
}

impl Default for CoordinatorCore {
    fn default() -> Self {
        Self::new()
    }
}

impl CoordinatorCore {
    pub fn new() -> Self {
        Self {
            state: CoordinatorState::Idle,
            pending_signals: Vec::new(),
        }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Exit status once the run is over.
    pub fn exit_status(&self) -> Option<i32> {
        match self.state {
            CoordinatorState::Denied => Some(crate::exit_codes::SUCCESS),
            CoordinatorState::Done { status } => Some(status),
            _ => None,
        }
    }

    /// Handle a single event, updating state and returning the commands
    /// for the IO shell.
    pub fn step(&mut self, event: CoordinatorEvent) -> CoordinatorStep {
        if self.state.is_terminal() {
            debug!(?event, state = ?self.state, "event after run finished; ignoring");
            return CoordinatorStep {
                commands: Vec::new(),
                keep_running: false,
            };
        }

        let state = &mut self.state;
        match event {
            CoordinatorEvent::Start => handle_start(state),
            CoordinatorEvent::LockAcquired => handle_lock_outcome(state, Ok(true)),
            CoordinatorEvent::LockDenied => handle_lock_outcome(state, Ok(false)),
            CoordinatorEvent::LockFailed(reason) => handle_lock_outcome(state, Err(reason)),
            CoordinatorEvent::ChildStarted { pid } => {
                handle_child_started(state, &mut self.pending_signals, pid)
            }
            CoordinatorEvent::SpawnFailed(reason) => handle_spawn_failure(state, reason),
            CoordinatorEvent::SignalReceived(signal) => {
                handle_signal(state, &mut self.pending_signals, signal)
            }
            CoordinatorEvent::ChildExited { status } => handle_child_exit(state, Ok(status)),
            CoordinatorEvent::WaitFailed(reason) => handle_child_exit(state, Err(reason)),
            CoordinatorEvent::LockReleased => handle_release(state),
            CoordinatorEvent::Fault(reason) => handle_fault(state, reason),
        }
    }
}
