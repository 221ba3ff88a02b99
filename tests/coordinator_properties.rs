// tests/coordinator_properties.rs

use nix::sys::signal::Signal;
use proptest::prelude::*;

use sherlock::coordinator::{CoordinatorCommand, CoordinatorCore, CoordinatorEvent};

fn event_strategy() -> impl Strategy<Value = CoordinatorEvent> {
    prop_oneof![
        Just(CoordinatorEvent::Start),
        Just(CoordinatorEvent::LockAcquired),
        Just(CoordinatorEvent::LockDenied),
        Just(CoordinatorEvent::LockFailed("store down".to_string())),
        (1u32..50_000).prop_map(|pid| CoordinatorEvent::ChildStarted { pid }),
        Just(CoordinatorEvent::SpawnFailed("no such file".to_string())),
        prop_oneof![
            Just(Signal::SIGINT),
            Just(Signal::SIGTERM),
            Just(Signal::SIGQUIT)
        ]
        .prop_map(CoordinatorEvent::SignalReceived),
        (0i32..=255).prop_map(|status| CoordinatorEvent::ChildExited { status }),
        Just(CoordinatorEvent::WaitFailed("ECHILD".to_string())),
        Just(CoordinatorEvent::LockReleased),
        Just(CoordinatorEvent::Fault("boom".to_string())),
    ]
}

proptest! {
    /// Whatever order events arrive in, the core never asks for more than
    /// one release or exit, never spawns without the lock, never forwards a
    /// signal before the child has started, and never releases a lock it
    /// did not take.
    #[test]
    fn core_commands_respect_ordering(events in proptest::collection::vec(event_strategy(), 0..40)) {
        let mut core = CoordinatorCore::new();
        let mut lock_acquired = false;
        let mut child_started = false;
        let mut spawns = 0;
        let mut releases = 0;
        let mut exits = 0;

        for event in std::iter::once(CoordinatorEvent::Start).chain(events) {
            let accepted_acquire = matches!(event, CoordinatorEvent::LockAcquired);
            let started_event = matches!(event, CoordinatorEvent::ChildStarted { .. });
            let step = core.step(event);

            for command in &step.commands {
                prop_assert_eq!(exits, 0, "no commands after exit");
                match command {
                    CoordinatorCommand::SpawnChild => {
                        prop_assert!(accepted_acquire);
                        lock_acquired = true;
                        spawns += 1;
                    }
                    CoordinatorCommand::ForwardSignal(_) => {
                        prop_assert!(child_started || started_event);
                    }
                    CoordinatorCommand::ReleaseLock => {
                        prop_assert!(lock_acquired);
                        releases += 1;
                    }
                    CoordinatorCommand::Exit(_) => exits += 1,
                    CoordinatorCommand::AcquireLock => {}
                }
            }

            if started_event && lock_acquired && releases == 0 {
                child_started = true;
            }
        }

        prop_assert!(spawns <= 1);
        prop_assert!(releases <= 1);
        prop_assert!(exits <= 1);
        if exits == 1 {
            prop_assert!(core.exit_status().is_some());
        }
    }

    /// Normal completion always reports the child's own status.
    #[test]
    fn child_status_passes_through(status in 0i32..=255) {
        let mut core = CoordinatorCore::new();
        core.step(CoordinatorEvent::Start);
        core.step(CoordinatorEvent::LockAcquired);
        core.step(CoordinatorEvent::ChildStarted { pid: 1 });
        core.step(CoordinatorEvent::ChildExited { status });
        let step = core.step(CoordinatorEvent::LockReleased);

        prop_assert_eq!(step.commands, vec![CoordinatorCommand::Exit(status)]);
        prop_assert_eq!(core.exit_status(), Some(status));
    }
}
