//! Lock/auth state machine.
//!
//! [`AppGate`] is the single owner of [`Session`] and [`LockState`]. Every
//! transition goes through one of its commands so the phase invariants hold
//! at one choke point:
//!
//! ```text
//! Onboarding ──complete_onboarding──▶ SignedOut ──sign_in──▶ Unlocked ⇄ Locked
//!      ▲                                  ▲                     │         │
//!      └──────── reset_to_defaults ───────┴────── sign_out ─────┴─────────┘
//! ```
//!
//! - `locked` is only ever true while signed in.
//! - Entering `Locked` requires an unlock credential (PIN or biometrics).
//! - At most one unlock attempt is in flight at a time.

use std::sync::Arc;

use latchkey_crypto::generate_session_token;
use serde::Serialize;

use crate::account::{
    validate_sign_in, validate_sign_up, Account, CredentialValidator, SignInRequest,
    SignUpRequest,
};
use crate::biometric::{BiometricAuthenticator, BiometricError};
use crate::clock::Clock;
use crate::credentials::{BiometricVerification, Credential, CredentialVault, PinCheck};
use crate::error::GateError;
use crate::inactivity::InactivityTracker;
use crate::session::{
    LifecycleSignal, LockState, PersistedAuth, Phase, Screen, Session, UnlockMethod,
    UnlockOutcome,
};
use crate::settings::{Settings, SettingsPatch};
use crate::store::{keys, load_json, save_json, SecureStore, StoreError};
use crate::throttle::RateLimiter;

/// Rate-limiter key for sign-in attempts.
const SIGN_IN_LIMIT_KEY: &str = "sign_in_attempts";

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Injected collaborators.
#[derive(Clone)]
pub struct GateDeps {
    pub store: Arc<dyn SecureStore>,
    pub biometrics: Arc<dyn BiometricAuthenticator>,
    pub clock: Arc<dyn Clock>,
}

/// What a lifecycle signal or scheduled check did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleOutcome {
    /// Not signed in, or the lock screen is off.
    Ignored,
    /// Activity recorded; still unlocked.
    StillUnlocked,
    /// This call locked the app.
    Locked,
    /// The app was already locked.
    AlreadyLocked,
}

/// Handle for an outstanding biometric unlock.
///
/// Returned by [`AppGate::begin_biometric_unlock`] and consumed by
/// [`AppGate::finish_biometric_unlock`]. A ticket from an attempt that was
/// superseded (sign-out, manual unlock) is refused.
#[derive(Debug, PartialEq, Eq)]
pub struct UnlockTicket {
    id: u64,
}

impl UnlockTicket {
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}

/// Read-only view for the host UI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateSnapshot {
    pub phase: Phase,
    pub screen: Screen,
    pub session: Session,
    pub lock: LockState,
    pub has_pin: bool,
    pub credential: Credential,
    pub biometric_available: bool,
    pub pin_failures: u32,
    pub unlock_in_progress: bool,
    pub foreground: bool,
    pub settings: Settings,
}

// ---------------------------------------------------------------------------
// AppGate
// ---------------------------------------------------------------------------

/// The lock/auth state machine.
pub struct AppGate {
    store: Arc<dyn SecureStore>,
    clock: Arc<dyn Clock>,
    vault: CredentialVault,
    tracker: InactivityTracker,
    settings: Settings,
    session: Session,
    lock: LockState,
    foreground: bool,
    sign_in_limiter: RateLimiter,
    unlock_in_flight: Option<u64>,
    next_ticket: u64,
    biometric_prompt_armed: bool,
}

impl std::fmt::Debug for AppGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppGate")
            .field("phase", &self.phase())
            .field("lock", &self.lock)
            .field("foreground", &self.foreground)
            .finish_non_exhaustive()
    }
}

impl AppGate {
    /// Rebuild the gate from persisted state.
    ///
    /// Unreadable blobs fall back to defaults (logged). A persisted lock
    /// is kept only while the session is signed in, the lock screen is on
    /// and an unlock credential exists. A signed-in session whose
    /// inactivity timeout has already passed starts locked.
    #[must_use]
    pub fn restore(deps: GateDeps) -> Self {
        let GateDeps {
            store,
            biometrics,
            clock,
        } = deps;
        let vault = CredentialVault::new(Arc::clone(&store), biometrics);
        let tracker = InactivityTracker::new(Arc::clone(&store));
        let settings = Settings::load(store.as_ref());

        let persisted = match load_json::<PersistedAuth>(store.as_ref(), keys::AUTH_STORE) {
            Ok(p) => p.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "session blob unreadable, starting signed out");
                PersistedAuth::default()
            }
        };

        let mut gate = Self {
            lock: LockState {
                locked: false,
                lock_screen_enabled: settings.lock_screen,
                timeout_secs: settings.lock_screen_timeout_secs,
                last_active_at: tracker.last_active(),
            },
            store,
            clock,
            vault,
            tracker,
            settings,
            session: persisted.session,
            foreground: true,
            sign_in_limiter: RateLimiter::default(),
            unlock_in_flight: None,
            next_ticket: 1,
            biometric_prompt_armed: false,
        };

        if !gate.session.logged_in {
            gate.session.is_vip = false;
            gate.session.account = None;
        }

        let guarded = gate.session.logged_in && gate.lock.lock_screen_enabled && gate.can_unlock();
        if guarded {
            let now = gate.clock.now_ms();
            if persisted.locked || gate.tracker.should_lock(gate.lock.timeout_secs, now) {
                gate.enter_locked();
            }
        } else if persisted.locked {
            tracing::warn!("dropping persisted lock: no signed-in session or no unlock credential");
            gate.persist_auth_logged();
        }

        tracing::info!(phase = %gate.phase(), "gate restored");
        gate.check_invariants();
        gate
    }

    // ── Queries ─────────────────────────────────────────────────────

    #[must_use]
    pub const fn phase(&self) -> Phase {
        if !self.session.onboarded {
            Phase::Onboarding
        } else if !self.session.logged_in {
            Phase::SignedOut
        } else if self.lock.locked {
            Phase::Locked
        } else {
            Phase::Unlocked
        }
    }

    #[must_use]
    pub const fn screen(&self) -> Screen {
        self.phase().screen()
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub const fn lock_state(&self) -> &LockState {
        &self.lock
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The credential vault (read access for hosts).
    #[must_use]
    pub const fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    #[must_use]
    pub const fn is_foreground(&self) -> bool {
        self.foreground
    }

    #[must_use]
    pub fn snapshot(&self) -> GateSnapshot {
        let credential = self.vault.credential();
        GateSnapshot {
            phase: self.phase(),
            screen: self.screen(),
            session: self.session.clone(),
            lock: self.lock.clone(),
            has_pin: credential.has_pin(),
            credential,
            biometric_available: self.vault.is_biometric_available(),
            pin_failures: self.vault.pin_attempts().failures,
            unlock_in_progress: self.unlock_in_flight.is_some(),
            foreground: self.foreground,
            settings: self.settings.clone(),
        }
    }

    // ── Onboarding / sign-in ────────────────────────────────────────

    /// Onboarding → SignedOut. Idempotent once onboarded.
    ///
    /// # Errors
    ///
    /// [`GateError::Storage`] if the session blob cannot be written; the
    /// gate stays in Onboarding.
    pub fn complete_onboarding(&mut self) -> Result<(), GateError> {
        if self.session.onboarded {
            return Ok(());
        }
        self.session.onboarded = true;
        if let Err(e) = self.persist_auth() {
            self.session.onboarded = false;
            return Err(e.into());
        }
        tracing::info!("onboarding completed");
        Ok(())
    }

    /// SignedOut → Unlocked when `validator` accepts.
    ///
    /// # Errors
    ///
    /// - [`GateError::InvalidTransition`] outside SignedOut
    /// - [`GateError::RateLimited`] after 5 attempts in 5 minutes
    /// - [`GateError::Validation`] for malformed input
    /// - whatever the validator returns ([`GateError::AuthFailure`])
    /// - [`GateError::Storage`] if the session cannot be persisted
    pub fn sign_in(
        &mut self,
        request: &SignInRequest,
        validator: &dyn CredentialValidator,
    ) -> Result<Account, GateError> {
        self.require_phase("sign in", Phase::SignedOut)?;
        let now = self.clock.now_ms();
        self.sign_in_limiter
            .check(SIGN_IN_LIMIT_KEY, now)
            .map_err(|remaining_ms| GateError::RateLimited { remaining_ms })?;

        let email = validate_sign_in(request)?;
        let sanitized = SignInRequest {
            email,
            password: request.password.clone(),
            remember_me: request.remember_me,
        };
        let account = match validator.validate(&sanitized, now) {
            Ok(a) => a,
            Err(e) => {
                tracing::info!(error = %e, "sign-in refused");
                return Err(e);
            }
        };
        self.commit_sign_in(account, now)
    }

    /// SignedOut → Unlocked with a newly registered account.
    ///
    /// # Errors
    ///
    /// [`GateError::InvalidTransition`] outside SignedOut,
    /// [`GateError::Validation`] for any failing form rule, or the
    /// validator's registration error.
    pub fn sign_up(
        &mut self,
        request: &SignUpRequest,
        validator: &dyn CredentialValidator,
    ) -> Result<Account, GateError> {
        self.require_phase("sign up", Phase::SignedOut)?;
        validate_sign_up(request)?;
        let now = self.clock.now_ms();
        let account = validator.register(request, now)?;
        self.commit_sign_in(account, now)
    }

    fn commit_sign_in(&mut self, account: Account, now: u64) -> Result<Account, GateError> {
        self.store
            .set(keys::SESSION_TOKEN, &generate_session_token())?;

        let next = Session {
            logged_in: true,
            onboarded: true,
            is_vip: account.is_vip,
            account: Some(account.clone()),
        };
        let blob = PersistedAuth {
            session: next.clone(),
            locked: false,
        };
        if let Err(e) = save_json(self.store.as_ref(), keys::AUTH_STORE, &blob) {
            let _ = self.store.delete(keys::SESSION_TOKEN);
            return Err(e.into());
        }

        self.session = next;
        self.lock.locked = false;
        self.sign_in_limiter.reset(SIGN_IN_LIMIT_KEY);
        self.mark_active(now);
        tracing::info!(account_id = %account.id, vip = account.is_vip, "signed in");
        self.check_invariants();
        Ok(account)
    }

    /// Any phase → SignedOut (Onboarding stays Onboarding).
    ///
    /// Clears the session, the lock, the session token, failure counters
    /// and any in-flight unlock. The PIN hash and biometric settings are
    /// kept. Persistence failures are logged; the in-memory session is
    /// always cleared.
    pub fn sign_out(&mut self) {
        let was_signed_in = self.session.logged_in;
        self.session = Session {
            onboarded: self.session.onboarded,
            ..Session::default()
        };
        self.lock.locked = false;
        self.lock.last_active_at = None;
        self.unlock_in_flight = None;
        self.biometric_prompt_armed = false;
        self.sign_in_limiter.clear();
        self.vault.reset_pin_attempts();
        self.tracker.clear();
        if let Err(e) = self.store.delete(keys::SESSION_TOKEN) {
            tracing::warn!(error = %e, "failed to delete session token");
        }
        self.persist_auth_logged();
        if was_signed_in {
            tracing::info!("signed out");
        }
        self.check_invariants();
    }

    /// Wipe every secret and blob and return to Onboarding.
    ///
    /// All deletes are attempted; in-memory state is reset regardless.
    ///
    /// # Errors
    ///
    /// The first storage failure encountered.
    pub fn reset_to_defaults(&mut self) -> Result<(), GateError> {
        let mut first: Option<GateError> = None;
        for key in [keys::SESSION_TOKEN, keys::AUTH_STORE, keys::SETTINGS] {
            if let Err(e) = self.store.delete(key) {
                tracing::warn!(key, error = %e, "reset: delete failed");
                first.get_or_insert(e.into());
            }
        }
        if let Err(e) = self.vault.wipe() {
            first.get_or_insert(e);
        }
        self.tracker.clear();

        self.session = Session::default();
        self.settings = Settings::default();
        self.lock = LockState {
            locked: false,
            lock_screen_enabled: self.settings.lock_screen,
            timeout_secs: self.settings.lock_screen_timeout_secs,
            last_active_at: None,
        };
        self.unlock_in_flight = None;
        self.biometric_prompt_armed = false;
        self.sign_in_limiter.clear();
        tracing::info!("reset to defaults");
        self.check_invariants();

        first.map_or(Ok(()), Err)
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// React to a host lifecycle signal.
    pub fn handle_lifecycle(&mut self, signal: LifecycleSignal) -> LifecycleOutcome {
        match signal {
            LifecycleSignal::Foreground => self.app_foregrounded(),
            LifecycleSignal::Background | LifecycleSignal::Inactive => self.app_backgrounded(),
        }
    }

    /// Foreground check: lock if idle for at least the timeout, otherwise
    /// refresh the last-active time.
    pub fn app_foregrounded(&mut self) -> LifecycleOutcome {
        self.foreground = true;
        if !self.session.logged_in || !self.lock.lock_screen_enabled {
            return LifecycleOutcome::Ignored;
        }
        if self.lock.locked {
            return LifecycleOutcome::AlreadyLocked;
        }
        let now = self.clock.now_ms();
        if self.tracker.should_lock(self.lock.timeout_secs, now) {
            if self.can_unlock() {
                self.enter_locked();
                return LifecycleOutcome::Locked;
            }
            tracing::warn!("inactivity timeout passed but no unlock credential is set");
        }
        self.mark_active(now);
        LifecycleOutcome::StillUnlocked
    }

    /// Background: start the re-lock countdown.
    pub fn app_backgrounded(&mut self) -> LifecycleOutcome {
        self.foreground = false;
        if !self.session.logged_in || !self.lock.lock_screen_enabled {
            return LifecycleOutcome::Ignored;
        }
        let now = self.clock.now_ms();
        self.mark_active(now);
        if self.lock.locked {
            LifecycleOutcome::AlreadyLocked
        } else {
            LifecycleOutcome::StillUnlocked
        }
    }

    /// Scheduled inactivity check.
    ///
    /// Locks an unlocked session once the timeout has passed since the last
    /// recorded activity, foreground or not. A zero timeout means "lock on
    /// foreground" and is left to [`AppGate::app_foregrounded`].
    pub fn poll_inactivity(&mut self) -> LifecycleOutcome {
        if !self.session.logged_in || !self.lock.lock_screen_enabled {
            return LifecycleOutcome::Ignored;
        }
        if self.lock.locked {
            return LifecycleOutcome::AlreadyLocked;
        }
        if self.lock.timeout_secs == 0 || !self.can_unlock() {
            return LifecycleOutcome::Ignored;
        }
        let now = self.clock.now_ms();
        if self.tracker.should_lock(self.lock.timeout_secs, now) {
            tracing::info!("inactivity timeout reached, locking");
            self.enter_locked();
            LifecycleOutcome::Locked
        } else {
            LifecycleOutcome::StillUnlocked
        }
    }

    /// User interaction while unlocked: push the countdown back.
    pub fn record_activity(&mut self) {
        if self.session.logged_in && !self.lock.locked {
            let now = self.clock.now_ms();
            self.mark_active(now);
        }
    }

    // ── Lock / unlock ───────────────────────────────────────────────

    /// Lock immediately.
    ///
    /// # Errors
    ///
    /// [`GateError::InvalidTransition`] when not signed in,
    /// [`GateError::Validation`] when no PIN or biometric unlock is set.
    pub fn lock_now(&mut self) -> Result<(), GateError> {
        match self.phase() {
            Phase::Locked => Ok(()),
            Phase::Unlocked => {
                if !self.can_unlock() {
                    return Err(GateError::Validation(
                        "set a PIN or enable biometrics before locking".into(),
                    ));
                }
                tracing::info!("manual lock");
                self.enter_locked();
                Ok(())
            }
            phase => Err(GateError::InvalidTransition {
                action: "lock",
                phase,
            }),
        }
    }

    /// Unlock with a PIN.
    ///
    /// # Errors
    ///
    /// [`GateError::NotLocked`] unless Locked, [`GateError::Busy`] while a
    /// biometric attempt is outstanding, [`GateError::RateLimited`] during
    /// the failure backoff.
    pub fn unlock_with_pin(&mut self, pin: &str) -> Result<UnlockOutcome, GateError> {
        self.require_unlockable()?;
        let now = self.clock.now_ms();
        match self.vault.attempt_pin(pin, now)? {
            PinCheck::Accepted => {
                self.finish_unlock(now, UnlockMethod::Pin);
                Ok(UnlockOutcome::Unlocked)
            }
            PinCheck::Rejected {
                consecutive_failures,
            } => Ok(UnlockOutcome::Rejected {
                method: UnlockMethod::Pin,
                consecutive_failures,
            }),
        }
    }

    /// Claim the single unlock slot for a biometric prompt.
    ///
    /// The prompt itself runs outside the gate (it may block for a long
    /// time); report its answer with [`AppGate::finish_biometric_unlock`].
    ///
    /// # Errors
    ///
    /// [`GateError::NotLocked`], [`GateError::Busy`], or
    /// [`GateError::Unavailable`] when biometric unlock is off or the
    /// hardware is gone.
    pub fn begin_biometric_unlock(&mut self) -> Result<UnlockTicket, GateError> {
        self.require_unlockable()?;
        if !self.vault.is_biometric_enabled() || !self.vault.is_biometric_available() {
            return Err(GateError::Unavailable);
        }
        let id = self.next_ticket;
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.unlock_in_flight = Some(id);
        self.biometric_prompt_armed = false;
        tracing::debug!(ticket = id, "biometric unlock started");
        Ok(UnlockTicket { id })
    }

    /// Apply the answer of a biometric prompt.
    ///
    /// # Errors
    ///
    /// [`GateError::NotLocked`] if the gate left Locked meanwhile,
    /// [`GateError::InvalidTransition`] for a superseded ticket,
    /// [`GateError::Unavailable`] when the platform reports no hardware or
    /// enrolment.
    pub fn finish_biometric_unlock(
        &mut self,
        ticket: UnlockTicket,
        result: Result<(), BiometricError>,
    ) -> Result<UnlockOutcome, GateError> {
        if self.unlock_in_flight != Some(ticket.id) {
            return if self.lock.locked {
                Err(GateError::InvalidTransition {
                    action: "finish a superseded biometric unlock",
                    phase: self.phase(),
                })
            } else {
                Err(GateError::NotLocked)
            };
        }
        self.unlock_in_flight = None;
        if !self.lock.locked {
            return Err(GateError::NotLocked);
        }

        match result {
            Ok(()) => {
                let now = self.clock.now_ms();
                self.finish_unlock(now, UnlockMethod::Biometric);
                Ok(UnlockOutcome::Unlocked)
            }
            Err(e) if e.is_unavailable() => Err(GateError::Unavailable),
            Err(e) => {
                tracing::info!(error = %e, "biometric unlock rejected");
                Ok(UnlockOutcome::Rejected {
                    method: UnlockMethod::Biometric,
                    consecutive_failures: self.vault.pin_attempts().failures,
                })
            }
        }
    }

    /// Run a biometric prompt synchronously on the calling thread.
    ///
    /// # Errors
    ///
    /// See [`AppGate::begin_biometric_unlock`] and
    /// [`AppGate::finish_biometric_unlock`].
    pub fn unlock_with_biometric(&mut self, prompt: &str) -> Result<UnlockOutcome, GateError> {
        let ticket = self.begin_biometric_unlock()?;
        let result = self.vault.biometrics().authenticate(prompt);
        self.finish_biometric_unlock(ticket, result)
    }

    /// `true` exactly once after entering Locked with biometric unlock
    /// enabled and available: the host should show the prompt right away.
    pub fn take_biometric_prompt(&mut self) -> bool {
        let armed = std::mem::take(&mut self.biometric_prompt_armed);
        armed && self.lock.locked && self.unlock_in_flight.is_none()
    }

    // ── Settings and credentials ────────────────────────────────────

    /// Apply a settings patch, persist it, and mirror the lock fields.
    ///
    /// # Errors
    ///
    /// [`GateError::InvalidTransition`] while locked,
    /// [`GateError::Validation`] for out-of-range values or when enabling
    /// the lock screen without a PIN, [`GateError::Storage`] if the blob
    /// cannot be written (nothing changes in that case).
    pub fn update_settings(&mut self, patch: &SettingsPatch) -> Result<Settings, GateError> {
        self.require_not_locked("change settings")?;
        if patch.lock_screen == Some(true) && !self.settings.lock_screen && !self.vault.has_pin() {
            return Err(GateError::Validation(
                "set a PIN before enabling the lock screen".into(),
            ));
        }
        let next = self.settings.apply(patch)?;
        next.save(self.store.as_ref())?;

        let enabling = next.lock_screen && !self.settings.lock_screen;
        self.settings = next;
        self.lock.lock_screen_enabled = self.settings.lock_screen;
        self.lock.timeout_secs = self.settings.lock_screen_timeout_secs;

        if enabling && self.session.logged_in {
            let now = self.clock.now_ms();
            self.mark_active(now);
        }
        self.check_invariants();
        Ok(self.settings.clone())
    }

    /// Turn the lock screen on or off.
    ///
    /// # Errors
    ///
    /// See [`AppGate::update_settings`].
    pub fn set_lock_screen(&mut self, enabled: bool) -> Result<(), GateError> {
        self.update_settings(&SettingsPatch {
            lock_screen: Some(enabled),
            ..SettingsPatch::default()
        })
        .map(drop)
    }

    /// Change the inactivity timeout (0..=3600 seconds).
    ///
    /// # Errors
    ///
    /// See [`AppGate::update_settings`].
    pub fn set_lock_timeout(&mut self, secs: u64) -> Result<(), GateError> {
        self.update_settings(&SettingsPatch {
            lock_screen_timeout_secs: Some(secs),
            ..SettingsPatch::default()
        })
        .map(drop)
    }

    /// Set or replace the PIN. Refused while locked.
    ///
    /// # Errors
    ///
    /// [`GateError::InvalidTransition`] while locked, otherwise see
    /// [`CredentialVault::set_pin`].
    pub fn set_pin(&mut self, pin: &str) -> Result<(), GateError> {
        self.require_not_locked("set a PIN")?;
        self.vault.set_pin(pin)
    }

    /// Replace the PIN after re-entering the current one.
    ///
    /// # Errors
    ///
    /// [`GateError::InvalidTransition`] while locked, otherwise see
    /// [`CredentialVault::change_pin`].
    pub fn change_pin(&mut self, current: &str, new_pin: &str, confirm: &str) -> Result<(), GateError> {
        self.require_not_locked("change the PIN")?;
        self.vault.change_pin(current, new_pin, confirm)
    }

    /// Remove the PIN.
    ///
    /// # Errors
    ///
    /// [`GateError::InvalidTransition`] while locked,
    /// [`GateError::Validation`] while the lock screen is enabled.
    pub fn clear_pin(&mut self) -> Result<(), GateError> {
        self.require_not_locked("clear the PIN")?;
        if self.settings.lock_screen {
            return Err(GateError::Validation(
                "disable the lock screen before removing the PIN".into(),
            ));
        }
        self.vault.clear_pin()
    }

    /// Enable (with a prompt on the calling thread) or disable biometric
    /// unlock, keeping the settings mirror in sync.
    ///
    /// # Errors
    ///
    /// [`GateError::InvalidTransition`] while locked, otherwise see
    /// [`CredentialVault::set_biometric_enabled`].
    pub fn set_biometric_enabled(&mut self, enabled: bool, prompt: &str) -> Result<(), GateError> {
        self.require_not_locked("change biometric unlock")?;
        self.vault.set_biometric_enabled(enabled, prompt)?;
        self.mirror_biometric_flag(enabled);
        Ok(())
    }

    /// Enable biometric unlock with a prompt answered elsewhere.
    ///
    /// # Errors
    ///
    /// [`GateError::InvalidTransition`] while locked, or
    /// [`GateError::Storage`].
    pub fn enable_biometric_with(&mut self, proof: &BiometricVerification) -> Result<(), GateError> {
        self.require_not_locked("change biometric unlock")?;
        self.vault.enable_biometric_with(proof)?;
        self.mirror_biometric_flag(true);
        Ok(())
    }

    fn mirror_biometric_flag(&mut self, enabled: bool) {
        if self.settings.biometric_auth == enabled {
            return;
        }
        let mut next = self.settings.clone();
        next.biometric_auth = enabled;
        if let Err(e) = next.save(self.store.as_ref()) {
            tracing::warn!(error = %e, "failed to mirror biometric flag into settings");
        }
        self.settings = next;
    }

    // ── Internals ───────────────────────────────────────────────────

    fn can_unlock(&self) -> bool {
        self.vault.has_pin() || self.vault.is_biometric_enabled()
    }

    fn require_phase(&self, action: &'static str, expected: Phase) -> Result<(), GateError> {
        let phase = self.phase();
        if phase == expected {
            Ok(())
        } else {
            Err(GateError::InvalidTransition { action, phase })
        }
    }

    fn require_not_locked(&self, action: &'static str) -> Result<(), GateError> {
        if self.lock.locked {
            Err(GateError::InvalidTransition {
                action,
                phase: Phase::Locked,
            })
        } else {
            Ok(())
        }
    }

    fn require_unlockable(&self) -> Result<(), GateError> {
        if !self.lock.locked {
            return Err(GateError::NotLocked);
        }
        if self.unlock_in_flight.is_some() {
            return Err(GateError::Busy);
        }
        Ok(())
    }

    fn mark_active(&mut self, now: u64) {
        self.tracker.record_active(now);
        self.lock.last_active_at = Some(now);
    }

    fn enter_locked(&mut self) {
        self.lock.locked = true;
        self.unlock_in_flight = None;
        self.biometric_prompt_armed =
            self.vault.is_biometric_enabled() && self.vault.is_biometric_available();
        self.persist_auth_logged();
        tracing::info!(auto_prompt = self.biometric_prompt_armed, "locked");
        self.check_invariants();
    }

    fn finish_unlock(&mut self, now: u64, method: UnlockMethod) {
        self.lock.locked = false;
        self.unlock_in_flight = None;
        self.biometric_prompt_armed = false;
        self.vault.reset_pin_attempts();
        self.mark_active(now);
        self.persist_auth_logged();
        tracing::info!(?method, "unlocked");
        self.check_invariants();
    }

    fn persist_auth(&self) -> Result<(), StoreError> {
        let blob = PersistedAuth {
            session: self.session.clone(),
            locked: self.lock.locked,
        };
        save_json(self.store.as_ref(), keys::AUTH_STORE, &blob)
    }

    fn persist_auth_logged(&self) {
        if let Err(e) = self.persist_auth() {
            tracing::warn!(error = %e, "failed to persist session");
        }
    }

    fn check_invariants(&self) {
        debug_assert!(
            !self.lock.locked || self.session.logged_in,
            "locked without a signed-in session"
        );
        debug_assert!(
            self.session.onboarded || !self.session.logged_in,
            "signed in before onboarding"
        );
    }
}
