//! Process-wide state shared by the command loop and the scheduler.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use latchkey_core::{
    AppGate, BiometricAuthenticator, Clock, CredentialValidator, DemoCredentialValidator,
    GateDeps, LocalAccountValidator, NotificationCenter, SystemClock,
};

use crate::auth_utils::ErrorResponse;
use crate::config::{AccountsBackend, BridgeConfig};
use crate::platform::{create_biometric_authenticator, create_store};

/// The lock/auth gate, shared with the auto-lock scheduler.
pub type ManagedGateState = Arc<Mutex<AppGate>>;

/// Persisted notification ledger.
pub type ManagedNotificationState = Arc<Mutex<NotificationCenter>>;

#[derive(Clone)]
pub struct BridgeState {
    pub gate: ManagedGateState,
    pub notifications: ManagedNotificationState,
    pub validator: Arc<dyn CredentialValidator>,
    pub biometrics: Arc<dyn BiometricAuthenticator>,
    pub clock: Arc<dyn Clock>,
    /// Deadline for one biometric prompt.
    pub biometric_timeout: Duration,
}

impl std::fmt::Debug for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeState")
            .field("biometrics", &self.biometrics.provider_name())
            .field("biometric_timeout", &self.biometric_timeout)
            .finish_non_exhaustive()
    }
}

impl BridgeState {
    /// Restore the gate and the ledger from `deps.store`.
    #[must_use]
    pub fn new(
        deps: GateDeps,
        validator: Arc<dyn CredentialValidator>,
        biometric_timeout: Duration,
    ) -> Self {
        let notifications = NotificationCenter::load(Arc::clone(&deps.store));
        let biometrics = Arc::clone(&deps.biometrics);
        let clock = Arc::clone(&deps.clock);
        let gate = AppGate::restore(deps);
        tracing::info!(phase = %gate.phase(), "gate restored");
        Self {
            gate: Arc::new(Mutex::new(gate)),
            notifications: Arc::new(Mutex::new(notifications)),
            validator,
            biometrics,
            clock,
            biometric_timeout,
        }
    }

    /// Open the configured backends and restore.
    ///
    /// # Errors
    ///
    /// Fails if the secure store cannot be opened.
    pub fn from_config(config: &BridgeConfig) -> anyhow::Result<Self> {
        let store = create_store(config)?;
        let biometrics = create_biometric_authenticator(config.biometric);
        let validator: Arc<dyn CredentialValidator> = match config.accounts {
            AccountsBackend::Demo => Arc::new(DemoCredentialValidator),
            AccountsBackend::Local => Arc::new(LocalAccountValidator::new(Arc::clone(&store))),
        };
        let deps = GateDeps {
            store,
            biometrics,
            clock: Arc::new(SystemClock),
        };
        Ok(Self::new(deps, validator, config.biometric_timeout()))
    }

    /// Lock the gate mutex.
    ///
    /// Poisoning is terminal: once a holder has panicked, every later call
    /// answers `INTERNAL` and the process has to be restarted.
    ///
    /// # Errors
    ///
    /// `INTERNAL` if a previous holder panicked.
    pub fn lock_gate(&self) -> Result<MutexGuard<'_, AppGate>, ErrorResponse> {
        self.gate.lock().map_err(|_| {
            tracing::error!("gate lock poisoned");
            ErrorResponse::internal()
        })
    }

    /// Lock the notification mutex. Callers that need both take the gate
    /// first.
    ///
    /// # Errors
    ///
    /// `INTERNAL` if a previous holder panicked.
    pub fn lock_notifications(&self) -> Result<MutexGuard<'_, NotificationCenter>, ErrorResponse> {
        self.notifications.lock().map_err(|_| {
            tracing::error!("notification lock poisoned");
            ErrorResponse::internal()
        })
    }
}
