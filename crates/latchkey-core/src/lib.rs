//! `latchkey-core`: app-lock business logic for Latchkey.
//!
//! Owns the lock/auth state machine ([`AppGate`]) and the collaborators it
//! coordinates: the credential vault, the inactivity tracker, the settings
//! blob and the notification ledger. Storage and biometric hardware are
//! injected through the [`SecureStore`] and [`BiometricAuthenticator`]
//! traits so hosts choose the backend and tests use in-memory fakes.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod store;

pub mod clock;

pub mod biometric;

pub mod throttle;

pub mod credentials;

pub mod inactivity;

pub mod settings;

pub mod account;

pub mod session;

pub mod gate;

pub mod notifications;

pub use account::{
    sanitize_email, sanitize_input, validate_email, validate_sign_in, validate_sign_up, Account,
    CredentialValidator, DemoCredentialValidator, LocalAccountValidator, SignInRequest,
    SignUpRequest,
};
pub use biometric::{
    BiometricAuthenticator, BiometricError, BiometricKind, FixedBiometricAuthenticator,
    NullBiometricAuthenticator,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::{BiometricVerification, Credential, CredentialVault, PinCheck};
pub use error::GateError;
pub use gate::{AppGate, GateDeps, GateSnapshot, LifecycleOutcome, UnlockTicket};
pub use inactivity::{elapsed_exceeds, InactivityTracker};
pub use notifications::{
    LedgerSnapshot, NotificationCenter, NotificationKind, NotificationLedger, NotificationRecord,
};
pub use session::{LifecycleSignal, LockState, Phase, Screen, Session, UnlockMethod, UnlockOutcome};
pub use settings::{Language, Settings, SettingsPatch, ThemeMode, MAX_LOCK_TIMEOUT_SECS};
pub use store::{keys, FileStore, MemoryStore, SecureStore, StoreError};
pub use throttle::{required_delay_ms, PinAttempts, RateLimiter};
