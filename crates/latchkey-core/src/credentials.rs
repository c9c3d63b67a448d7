//! Credential vault: the hashed PIN, the biometric flag and its marker key.
//!
//! The vault is the only writer of `pin_code_hash`, `biometric_auth_enabled`,
//! `biometric_key` and `pin_attempts`. The gate reads credentials through
//! [`CredentialVault::credential`] and never touches those keys directly.

use std::fmt;
use std::sync::Arc;

use latchkey_crypto::{generate_marker_key, hash_pin, is_valid_pin, PinHash, PIN_LENGTH};
use serde::Serialize;

use crate::biometric::{BiometricAuthenticator, BiometricError};
use crate::error::GateError;
use crate::store::{keys, load_json, save_json, SecureStore, StoreError};
use crate::throttle::PinAttempts;

const FLAG_ON: &str = "true";
const FLAG_OFF: &str = "false";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Read-only view of the stored credentials.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Stored digest, if a PIN is set. Never serialized.
    #[serde(skip)]
    pub pin_hash: Option<PinHash>,
    /// `biometric_auth_enabled == "true"`.
    pub biometric_enabled: bool,
    /// A marker key is present under `biometric_key`.
    pub biometric_key_present: bool,
}

impl Credential {
    /// Whether a PIN is set.
    #[must_use]
    pub const fn has_pin(&self) -> bool {
        self.pin_hash.is_some()
    }
}

/// Result of a throttled PIN check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinCheck {
    /// The PIN matched; the failure counter was reset.
    Accepted,
    /// The PIN did not match.
    Rejected {
        /// Failures since the last success, including this one.
        consecutive_failures: u32,
    },
}

/// Proof that a biometric prompt succeeded on available hardware.
///
/// Only obtainable through [`BiometricVerification::run`] or
/// [`BiometricVerification::from_prompt`], so enabling biometrics cannot
/// skip the prompt.
pub struct BiometricVerification {
    _private: (),
}

impl fmt::Debug for BiometricVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BiometricVerification")
    }
}

impl BiometricVerification {
    /// Check availability, then show one prompt.
    ///
    /// # Errors
    ///
    /// [`GateError::Unavailable`] without hardware or enrolment,
    /// [`GateError::AuthFailure`] when the prompt is refused.
    pub fn run(auth: &dyn BiometricAuthenticator, prompt: &str) -> Result<Self, GateError> {
        if !auth.is_available() {
            return Err(GateError::Unavailable);
        }
        Self::from_prompt(auth.authenticate(prompt))
    }

    /// Convert the answer of a prompt run elsewhere (e.g. on a blocking
    /// task with a deadline).
    ///
    /// # Errors
    ///
    /// Same mapping as [`BiometricVerification::run`].
    pub fn from_prompt(result: Result<(), BiometricError>) -> Result<Self, GateError> {
        match result {
            Ok(()) => Ok(Self { _private: () }),
            Err(e) if e.is_unavailable() => Err(GateError::Unavailable),
            Err(e) => Err(GateError::AuthFailure(e.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// PIN and biometric credentials on top of a [`SecureStore`].
#[derive(Clone)]
pub struct CredentialVault {
    store: Arc<dyn SecureStore>,
    biometrics: Arc<dyn BiometricAuthenticator>,
}

impl fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialVault")
            .field("biometrics", &self.biometrics.provider_name())
            .finish_non_exhaustive()
    }
}

impl CredentialVault {
    /// Build a vault over the injected store and authenticator.
    #[must_use]
    pub fn new(store: Arc<dyn SecureStore>, biometrics: Arc<dyn BiometricAuthenticator>) -> Self {
        Self { store, biometrics }
    }

    /// The injected authenticator.
    #[must_use]
    pub fn biometrics(&self) -> &Arc<dyn BiometricAuthenticator> {
        &self.biometrics
    }

    // ── PIN ─────────────────────────────────────────────────────────

    /// Hash and store a PIN, replacing any previous one.
    ///
    /// # Errors
    ///
    /// [`GateError::Validation`] unless `pin` is four digits;
    /// [`GateError::Storage`] if the write fails.
    pub fn set_pin(&self, pin: &str) -> Result<(), GateError> {
        if !is_valid_pin(pin) {
            return Err(GateError::Validation(format!(
                "PIN must be exactly {PIN_LENGTH} digits"
            )));
        }
        let digest = hash_pin(pin)?;
        self.store.set(keys::PIN_CODE_HASH, digest.as_str())?;
        tracing::info!("PIN updated");
        Ok(())
    }

    /// Whether `pin` matches the stored digest.
    ///
    /// `false` when no PIN is set. Read failures and malformed digests are
    /// logged and also yield `false`.
    #[must_use]
    pub fn verify_pin(&self, pin: &str) -> bool {
        self.stored_pin_hash().is_some_and(|h| h.matches(pin))
    }

    /// Whether a PIN is set. Read failures yield `false`.
    #[must_use]
    pub fn has_pin(&self) -> bool {
        self.stored_pin_hash().is_some()
    }

    /// Replace the PIN after re-checking the current one.
    ///
    /// # Errors
    ///
    /// [`GateError::AuthFailure`] if `current` does not match,
    /// [`GateError::Validation`] if `new_pin` is malformed or differs from
    /// `confirm`, [`GateError::Storage`] if the write fails.
    pub fn change_pin(&self, current: &str, new_pin: &str, confirm: &str) -> Result<(), GateError> {
        if !self.verify_pin(current) {
            return Err(GateError::AuthFailure("current PIN is incorrect".into()));
        }
        if new_pin != confirm {
            return Err(GateError::Validation("PINs do not match".into()));
        }
        self.set_pin(new_pin)
    }

    /// Delete the stored PIN and its failure counter.
    ///
    /// # Errors
    ///
    /// [`GateError::Storage`] if the delete fails.
    pub fn clear_pin(&self) -> Result<(), GateError> {
        self.store.delete(keys::PIN_CODE_HASH)?;
        self.store.delete(keys::PIN_ATTEMPTS)?;
        tracing::info!("PIN cleared");
        Ok(())
    }

    /// Check a PIN under the failure backoff.
    ///
    /// # Errors
    ///
    /// [`GateError::RateLimited`] while a cooldown is running. The attempt
    /// is not evaluated and not counted in that case.
    pub fn attempt_pin(&self, pin: &str, now_ms: u64) -> Result<PinCheck, GateError> {
        let mut attempts = self.pin_attempts();
        if let Some(remaining_ms) = attempts.cooldown_remaining(now_ms) {
            return Err(GateError::RateLimited { remaining_ms });
        }

        if self.verify_pin(pin) {
            if attempts.failures > 0 {
                self.reset_pin_attempts();
            }
            return Ok(PinCheck::Accepted);
        }

        attempts.record_failure(now_ms);
        if let Err(e) = save_json(self.store.as_ref(), keys::PIN_ATTEMPTS, &attempts) {
            tracing::warn!(error = %e, "failed to persist PIN attempt counter");
        }
        tracing::info!(failures = attempts.failures, "PIN rejected");
        Ok(PinCheck::Rejected {
            consecutive_failures: attempts.failures,
        })
    }

    /// Current failure counter. Unreadable counters count as zero.
    #[must_use]
    pub fn pin_attempts(&self) -> PinAttempts {
        match load_json::<PinAttempts>(self.store.as_ref(), keys::PIN_ATTEMPTS) {
            Ok(a) => a.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "unreadable PIN attempt counter, treating as zero");
                PinAttempts::default()
            }
        }
    }

    /// Forget PIN failures. Errors are logged.
    pub fn reset_pin_attempts(&self) {
        if let Err(e) = self.store.delete(keys::PIN_ATTEMPTS) {
            tracing::warn!(error = %e, "failed to reset PIN attempt counter");
        }
    }

    fn stored_pin_hash(&self) -> Option<PinHash> {
        let raw = match self.store.get(keys::PIN_CODE_HASH) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "PIN hash unreadable, treating as absent");
                return None;
            }
        };
        match PinHash::from_stored(&raw) {
            Ok(h) => Some(h),
            Err(e) => {
                tracing::warn!(error = %e, "stored PIN hash is malformed, treating as absent");
                None
            }
        }
    }

    // ── Biometrics ──────────────────────────────────────────────────

    /// Whether the hardware can be used right now.
    #[must_use]
    pub fn is_biometric_available(&self) -> bool {
        self.biometrics.is_available()
    }

    /// Whether biometric unlock is enabled. Read failures yield `false`.
    #[must_use]
    pub fn is_biometric_enabled(&self) -> bool {
        match self.store.get(keys::BIOMETRIC_ENABLED) {
            Ok(v) => v.as_deref() == Some(FLAG_ON),
            Err(e) => {
                tracing::warn!(error = %e, "biometric flag unreadable, treating as disabled");
                false
            }
        }
    }

    /// Enable (with a fresh prompt) or disable biometric unlock.
    ///
    /// # Errors
    ///
    /// See [`BiometricVerification::run`] and
    /// [`CredentialVault::enable_biometric_with`].
    pub fn set_biometric_enabled(&self, enabled: bool, prompt: &str) -> Result<(), GateError> {
        if enabled {
            let proof = BiometricVerification::run(self.biometrics.as_ref(), prompt)?;
            self.enable_biometric_with(&proof)
        } else {
            self.disable_biometric()
        }
    }

    /// Provision a marker key and set the flag.
    ///
    /// # Errors
    ///
    /// [`GateError::Storage`] if either write fails. A failed flag write
    /// removes the marker key again.
    pub fn enable_biometric_with(&self, _proof: &BiometricVerification) -> Result<(), GateError> {
        let marker = generate_marker_key();
        self.store.set(keys::BIOMETRIC_KEY, &marker)?;
        if let Err(e) = self.store.set(keys::BIOMETRIC_ENABLED, FLAG_ON) {
            let _ = self.store.delete(keys::BIOMETRIC_KEY);
            return Err(e.into());
        }
        tracing::info!(provider = self.biometrics.provider_name(), "biometric unlock enabled");
        Ok(())
    }

    /// Remove the marker key and clear the flag. Idempotent.
    ///
    /// # Errors
    ///
    /// [`GateError::Storage`] if a write fails.
    pub fn disable_biometric(&self) -> Result<(), GateError> {
        self.store.delete(keys::BIOMETRIC_KEY)?;
        self.store.set(keys::BIOMETRIC_ENABLED, FLAG_OFF)?;
        tracing::info!("biometric unlock disabled");
        Ok(())
    }

    // ── Snapshot / reset ────────────────────────────────────────────

    /// Read-only snapshot of the stored credentials.
    #[must_use]
    pub fn credential(&self) -> Credential {
        let key_present = match self.store.get(keys::BIOMETRIC_KEY) {
            Ok(v) => v.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, "biometric key unreadable");
                false
            }
        };
        Credential {
            pin_hash: self.stored_pin_hash(),
            biometric_enabled: self.is_biometric_enabled(),
            biometric_key_present: key_present,
        }
    }

    /// Delete every credential key.
    ///
    /// Every delete is attempted; the first failure is returned.
    ///
    /// # Errors
    ///
    /// [`GateError::Storage`] if any delete fails.
    pub fn wipe(&self) -> Result<(), GateError> {
        let mut first: Option<StoreError> = None;
        for key in [
            keys::PIN_CODE_HASH,
            keys::PIN_ATTEMPTS,
            keys::BIOMETRIC_KEY,
            keys::BIOMETRIC_ENABLED,
        ] {
            if let Err(e) = self.store.delete(key) {
                tracing::warn!(key, error = %e, "failed to delete credential key");
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), |e| Err(e.into()))
    }
}
