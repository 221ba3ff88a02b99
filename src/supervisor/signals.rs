// src/supervisor/signals.rs

//! Sources of signals to forward to the supervised child.

use anyhow::anyhow;
use nix::sys::signal::Signal;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::{Result, SherlockError};

/// Termination signals relayed to the child. Anything else keeps its
/// default disposition.
pub const FORWARDED_SIGNALS: [Signal; 3] = [Signal::SIGINT, Signal::SIGTERM, Signal::SIGQUIT];

/// Something that can start delivering signals for forwarding.
///
/// `listen` is called once, right before the child is spawned. Until then
/// the signals keep their default behaviour, so Ctrl-C while waiting for
/// the lock still stops the tool.
pub trait SignalSource: Send {
    fn listen(&mut self) -> Result<mpsc::Receiver<Signal>>;
}

/// Real OS signals via Tokio's unix signal handlers.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSignals;

impl SignalSource for OsSignals {
    fn listen(&mut self) -> Result<mpsc::Receiver<Signal>> {
        let (tx, rx) = mpsc::channel(8);

        for sig in FORWARDED_SIGNALS {
            let mut stream = signal(SignalKind::from_raw(sig as i32))?;
            let tx = tx.clone();
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    debug!(signal = %sig, "received signal");
                    if tx.send(sig).await.is_err() {
                        break;
                    }
                }
            });
        }

        Ok(rx)
    }
}

/// Signals injected through a channel, for driving the coordinator without
/// real signal delivery.
#[derive(Debug)]
pub struct ChannelSignals {
    rx: Option<mpsc::Receiver<Signal>>,
}

impl ChannelSignals {
    /// Returns the source plus the sender used to inject signals.
    pub fn new() -> (Self, mpsc::Sender<Signal>) {
        let (tx, rx) = mpsc::channel(8);
        (Self { rx: Some(rx) }, tx)
    }
}

impl SignalSource for ChannelSignals {
    fn listen(&mut self) -> Result<mpsc::Receiver<Signal>> {
        self.rx
            .take()
            .ok_or_else(|| SherlockError::Other(anyhow!("signal source already consumed")))
    }
}
