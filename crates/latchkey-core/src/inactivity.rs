//! Inactivity tracker: the persisted last-active timestamp and the re-lock
//! decision derived from it.

use std::sync::Arc;

use crate::store::{keys, SecureStore};

/// `(now - last_active) >= timeout`, in whole milliseconds.
///
/// A clock that moved backwards gives an elapsed time of zero. A timeout
/// of zero is therefore always exceeded.
#[must_use]
pub fn elapsed_exceeds(last_active_ms: u64, timeout_secs: u64, now_ms: u64) -> bool {
    let elapsed_ms = now_ms.saturating_sub(last_active_ms);
    elapsed_ms >= timeout_secs.saturating_mul(1000)
}

/// Last-active bookkeeping on top of a [`SecureStore`].
#[derive(Clone)]
pub struct InactivityTracker {
    store: Arc<dyn SecureStore>,
}

impl std::fmt::Debug for InactivityTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InactivityTracker").finish_non_exhaustive()
    }
}

impl InactivityTracker {
    #[must_use]
    pub fn new(store: Arc<dyn SecureStore>) -> Self {
        Self { store }
    }

    /// Persist `now_ms` as the last-active time. Fire-and-forget: failures
    /// are logged and never reach the caller.
    pub fn record_active(&self, now_ms: u64) {
        if let Err(e) = self.store.set(keys::LAST_ACTIVE_TIME, &now_ms.to_string()) {
            tracing::warn!(error = %e, "failed to record last-active time");
        }
    }

    /// Stored last-active time, if present and readable.
    #[must_use]
    pub fn last_active(&self) -> Option<u64> {
        match self.store.get(keys::LAST_ACTIVE_TIME) {
            Ok(Some(raw)) => match raw.parse() {
                Ok(ms) => Some(ms),
                Err(e) => {
                    tracing::warn!(error = %e, "last-active time is not a number");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read last-active time");
                None
            }
        }
    }

    /// Whether the session has been idle for at least `timeout_secs`.
    ///
    /// A missing timestamp counts as epoch zero, so a never-recorded
    /// session locks. Read and parse failures return `false`: the check
    /// fails open and logs.
    #[must_use]
    pub fn should_lock(&self, timeout_secs: u64, now_ms: u64) -> bool {
        let last = match self.store.get(keys::LAST_ACTIVE_TIME) {
            Ok(Some(raw)) => match raw.parse::<u64>() {
                Ok(ms) => ms,
                Err(e) => {
                    tracing::warn!(error = %e, "last-active time is not a number, not locking");
                    return false;
                }
            },
            Ok(None) => 0,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read last-active time, not locking");
                return false;
            }
        };
        elapsed_exceeds(last, timeout_secs, now_ms)
    }

    /// Forget the last-active time. Errors are logged.
    pub fn clear(&self) {
        if let Err(e) = self.store.delete(keys::LAST_ACTIVE_TIME) {
            tracing::warn!(error = %e, "failed to clear last-active time");
        }
    }
}
