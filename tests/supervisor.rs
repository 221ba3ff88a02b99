// tests/supervisor.rs

use std::error::Error;
use std::time::Duration;

use nix::sys::signal::Signal;
use nix::unistd::{getpgid, Pid};

use sherlock::errors::SherlockError;
use sherlock::supervisor::{CommandSpec, ManagedProcess, OutputMode};
use sherlock_test_utils::{init_tracing, wait_until, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn sh(script: &str) -> CommandSpec {
    CommandSpec::new("sh", ["-c", script])
}

#[tokio::test]
async fn reports_the_child_exit_code() -> TestResult {
    init_tracing();
    let mut child = ManagedProcess::start(&sh("exit 7"), OutputMode::Inherit)?;

    let report = with_timeout(child.wait()).await?;
    assert_eq!(report.status, 7);
    assert_eq!(report.signal, None);
    assert_eq!(report.stdout, None);
    Ok(())
}

#[tokio::test]
async fn child_runs_in_its_own_process_group() -> TestResult {
    init_tracing();
    let mut child = ManagedProcess::start(&sh("sleep 1"), OutputMode::Inherit)?;

    let child_group = getpgid(Some(Pid::from_raw(child.pid() as i32)))?;
    let our_group = getpgid(None)?;
    assert_ne!(child_group, our_group);
    assert_eq!(child_group.as_raw() as u32, child.pid());

    child.signal(Signal::SIGKILL)?;
    with_timeout(child.wait()).await?;
    Ok(())
}

#[tokio::test]
async fn forwarded_signal_terminates_child() -> TestResult {
    init_tracing();
    let mut child = ManagedProcess::start(&sh("while :; do sleep 0.05; done"), OutputMode::Inherit)?;

    tokio::time::sleep(Duration::from_millis(50)).await;
    child.signal(Signal::SIGTERM)?;

    let report = with_timeout(child.wait()).await?;
    assert_eq!(report.signal, Some(Signal::SIGTERM as i32));
    assert_eq!(report.status, 128 + Signal::SIGTERM as i32);
    Ok(())
}

#[tokio::test]
async fn signalling_an_exited_child_is_an_error() -> TestResult {
    init_tracing();
    let mut child = ManagedProcess::start(&sh("exit 0"), OutputMode::Inherit)?;
    with_timeout(child.wait()).await?;

    assert!(child.has_exited());
    assert!(matches!(
        child.signal(Signal::SIGTERM),
        Err(SherlockError::ProcessExited)
    ));
    Ok(())
}

#[tokio::test]
async fn exit_is_observed_before_anyone_waits() -> TestResult {
    init_tracing();
    let mut child = ManagedProcess::start(&sh("exit 4"), OutputMode::Inherit)?;

    wait_until("child exit to be observed", || child.has_exited()).await;
    assert!(matches!(
        child.signal(Signal::SIGTERM),
        Err(SherlockError::ProcessExited)
    ));

    let report = with_timeout(child.wait()).await?;
    assert_eq!(report.status, 4);
    Ok(())
}

#[tokio::test]
async fn captures_output_when_asked() -> TestResult {
    init_tracing();
    let mut child = ManagedProcess::start(
        &sh("echo 'normal output'; echo 'error output' >&2; exit 3"),
        OutputMode::Capture,
    )?;

    let report = with_timeout(child.wait()).await?;
    assert_eq!(report.status, 3);
    assert_eq!(report.stdout.as_deref(), Some(&b"normal output\n"[..]));
    assert_eq!(report.stderr.as_deref(), Some(&b"error output\n"[..]));
    Ok(())
}

#[tokio::test]
async fn missing_program_fails_synchronously() {
    init_tracing();
    let spec = CommandSpec::new("/nonexistent/sherlock-test-program", Vec::<String>::new());

    match ManagedProcess::start(&spec, OutputMode::Inherit) {
        Err(SherlockError::Spawn { command, .. }) => {
            assert_eq!(command, "/nonexistent/sherlock-test-program");
        }
        other => panic!("expected spawn error, got {other:?}"),
    }
}
