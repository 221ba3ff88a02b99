// src/supervisor/mod.rs

//! Process supervision layer.
//!
//! - [`process`] spawns the target command in its own process group and
//!   publishes a single completion event from a dedicated Tokio task.
//! - [`signals`] provides the stream of termination signals that the
//!   coordinator forwards to the child.

use std::fmt;

use crate::errors::Result;

pub mod process;
pub mod signals;

pub use process::ManagedProcess;
pub use signals::{ChannelSignals, FORWARDED_SIGNALS, OsSignals, SignalSource};

/// The command to supervise: program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split an argv-style list into program and arguments.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.iter().cloned()))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// What happens to the child's stdout/stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Child writes straight to our stdout/stderr.
    #[default]
    Inherit,
    /// Collect both streams and log them once the child exits.
    Capture,
}

/// Terminal state of a child that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
    /// Exit code, or `128 + n` when the child was killed by signal `n`.
    pub status: i32,
    /// Signal that terminated the child, if any.
    pub signal: Option<i32>,
    /// Captured stdout (only with [`OutputMode::Capture`]).
    pub stdout: Option<Vec<u8>>,
    /// Captured stderr (only with [`OutputMode::Capture`]).
    pub stderr: Option<Vec<u8>>,
}

/// The single event a supervised child produces: its exit report, or the
/// failure that prevented us from getting one.
pub type Completion = Result<ExitReport>;
