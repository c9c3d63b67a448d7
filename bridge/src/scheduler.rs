//! Periodic auto-lock check.
//!
//! Foreground transitions already lock a stale session, but a session left
//! open in the foreground would otherwise never lock. The scheduler asks
//! the gate every tick; the gate decides.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use latchkey_core::LifecycleOutcome;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::state::ManagedGateState;

pub struct AutoLockScheduler {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl AutoLockScheduler {
    /// Spawn the check loop on the current runtime.
    #[must_use]
    pub fn start(gate: ManagedGateState, every: Duration) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if flag.load(Ordering::Relaxed) {
                    break;
                }
                let outcome = match gate.lock() {
                    Ok(mut g) => g.poll_inactivity(),
                    Err(_) => {
                        tracing::error!("gate lock poisoned; auto-lock stopped");
                        break;
                    }
                };
                if outcome == LifecycleOutcome::Locked {
                    tracing::info!("auto-lock engaged after inactivity");
                }
            }
        });

        tracing::debug!(interval_secs = every.as_secs(), "auto-lock scheduler started");
        Self { cancel, handle }
    }

    /// Signal the loop to stop at its next tick.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Cancel and abort without waiting for the next tick.
    pub fn stop(self) {
        self.cancel();
        self.handle.abort();
    }
}
