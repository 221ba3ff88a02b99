// src/coordinator/transitions.rs

//! Per-event transition logic for the coordinator core.
//!
//! Each handler only sees the current state (and the pending-signal buffer
//! where relevant) and returns the commands for the shell. Events that make
//! no sense in the current state are dropped without commands.

use nix::sys::signal::Signal;
use tracing::debug;

use crate::coordinator::CoordinatorCommand::{
    AcquireLock, ForwardSignal, ReleaseLock, SpawnChild,
};
use crate::coordinator::{CoordinatorState, CoordinatorStep};
use crate::exit_codes;

fn ignored(state: &CoordinatorState, what: &str) -> CoordinatorStep {
    debug!(?state, event = what, "event not applicable in current state; ignoring");
    CoordinatorStep::idle()
}

/// `Idle -> Acquiring`
pub fn handle_start(state: &mut CoordinatorState) -> CoordinatorStep {
    match state {
        CoordinatorState::Idle => {
            *state = CoordinatorState::Acquiring;
            CoordinatorStep::run(vec![AcquireLock])
        }
        _ => ignored(state, "start"),
    }
}

/// Result of the acquire step.
///
/// - `Ok(true)`: lock held, go start the child.
/// - `Ok(false)`: lost the race under once-mode. Nothing to release.
/// - `Err(_)`: store failure. Nothing was acquired, nothing runs.
pub fn handle_lock_outcome(
    state: &mut CoordinatorState,
    outcome: Result<bool, String>,
) -> CoordinatorStep {
    if *state != CoordinatorState::Acquiring {
        return ignored(state, "lock outcome");
    }

    match outcome {
        Ok(true) => {
            *state = CoordinatorState::Running {
                child_started: false,
            };
            CoordinatorStep::run(vec![SpawnChild])
        }
        Ok(false) => {
            *state = CoordinatorState::Denied;
            CoordinatorStep::exit(exit_codes::SUCCESS)
        }
        Err(reason) => {
            debug!(%reason, "lock acquisition failed");
            *state = CoordinatorState::Done {
                status: exit_codes::LOCK_FAILURE,
            };
            CoordinatorStep::exit(exit_codes::LOCK_FAILURE)
        }
    }
}

/// Child exists; flush any signals that arrived while it was being spawned.
pub fn handle_child_started(
    state: &mut CoordinatorState,
    pending: &mut Vec<Signal>,
    pid: u32,
) -> CoordinatorStep {
    match state {
        CoordinatorState::Running {
            child_started: false,
        } => {
            debug!(pid, pending = pending.len(), "child started");
            *state = CoordinatorState::Running {
                child_started: true,
            };
            let commands = pending.drain(..).map(ForwardSignal).collect();
            CoordinatorStep::run(commands)
        }
        _ => ignored(state, "child started"),
    }
}

pub fn handle_spawn_failure(state: &mut CoordinatorState, reason: String) -> CoordinatorStep {
    match state {
        CoordinatorState::Running {
            child_started: false,
        } => {
            debug!(%reason, "child never started");
            *state = CoordinatorState::Releasing {
                status: exit_codes::PROCESS_FAILURE,
            };
            CoordinatorStep::run(vec![ReleaseLock])
        }
        _ => ignored(state, "spawn failure"),
    }
}

/// Signals never end the run by themselves; they are relayed to the child.
pub fn handle_signal(
    state: &mut CoordinatorState,
    pending: &mut Vec<Signal>,
    signal: Signal,
) -> CoordinatorStep {
    match state {
        CoordinatorState::Running {
            child_started: true,
        } => CoordinatorStep::run(vec![ForwardSignal(signal)]),
        CoordinatorState::Running {
            child_started: false,
        } => {
            pending.push(signal);
            CoordinatorStep::idle()
        }
        _ => ignored(state, "signal"),
    }
}

/// Child terminated (`Ok(status)`) or could not be waited on (`Err`).
pub fn handle_child_exit(
    state: &mut CoordinatorState,
    outcome: Result<i32, String>,
) -> CoordinatorStep {
    match state {
        CoordinatorState::Running {
            child_started: true,
        } => {
            let status = match outcome {
                Ok(status) => status,
                Err(reason) => {
                    debug!(%reason, "waiting for child failed");
                    exit_codes::PROCESS_FAILURE
                }
            };
            *state = CoordinatorState::Releasing { status };
            CoordinatorStep::run(vec![ReleaseLock])
        }
        _ => ignored(state, "child exit"),
    }
}

/// `Releasing -> Done`
pub fn handle_release(state: &mut CoordinatorState) -> CoordinatorStep {
    match *state {
        CoordinatorState::Releasing { status } => {
            *state = CoordinatorState::Done { status };
            CoordinatorStep::exit(status)
        }
        _ => ignored(state, "lock released"),
    }
}

/// Unexpected internal failure. Holding the lock means it still has to be
/// released before we report the failure status.
pub fn handle_fault(state: &mut CoordinatorState, reason: String) -> CoordinatorStep {
    debug!(%reason, ?state, "coordinator fault");
    match state {
        CoordinatorState::Idle | CoordinatorState::Acquiring => {
            *state = CoordinatorState::Done {
                status: exit_codes::PROCESS_FAILURE,
            };
            CoordinatorStep::exit(exit_codes::PROCESS_FAILURE)
        }
        CoordinatorState::Running { .. } => {
            *state = CoordinatorState::Releasing {
                status: exit_codes::PROCESS_FAILURE,
            };
            CoordinatorStep::run(vec![ReleaseLock])
        }
        _ => ignored(state, "fault"),
    }
}
