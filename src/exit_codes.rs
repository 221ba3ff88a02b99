// src/exit_codes.rs

//! Exit statuses reported by the supervising process.
//!
//! A supervised child that exits normally hands its own status straight
//! through, so these values share the 0-255 range with the child's codes.
//! A child that legitimately exits with [`PROCESS_FAILURE`] cannot be told
//! apart from a spawn or wait failure.

/// The child succeeded, or the lock was held elsewhere under `--once`.
pub const SUCCESS: i32 = 0;

/// The lock store could not be reached or answered with garbage while
/// acquiring. No child was started.
pub const LOCK_FAILURE: i32 = 24;

/// The child could not be spawned or waited on, or the supervisor hit an
/// internal fault. The lock has been released.
pub const PROCESS_FAILURE: i32 = 25;

/// Shell convention for a child terminated by signal `n`: `128 + n`.
pub fn from_signal(signal: i32) -> i32 {
    128 + signal
}
