//! Gate error types for `latchkey-core`.

use latchkey_crypto::CryptoError;
use thiserror::Error;

use crate::session::Phase;
use crate::store::StoreError;

/// Errors produced by gate, vault and ledger operations.
///
/// A wrong PIN or a rejected fingerprint is not an error: those come back
/// as [`crate::UnlockOutcome::Rejected`].
#[derive(Debug, Error)]
pub enum GateError {
    /// Malformed input (PIN format, email, settings range).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Biometric hardware is missing or nothing is enrolled.
    #[error("biometric authentication is not available on this device")]
    Unavailable,

    /// Credentials were checked and refused (sign-in, biometric enrolment).
    #[error("authentication failed: {0}")]
    AuthFailure(String),

    /// The secure store failed to read or write.
    #[error(transparent)]
    Storage(#[from] StoreError),

    /// Too many failed attempts; retry after the cooldown.
    #[error("rate limited: {remaining_ms}ms remaining")]
    RateLimited {
        /// Milliseconds remaining in the cooldown period.
        remaining_ms: u64,
    },

    /// The command is not valid in the current phase.
    #[error("cannot {action} while {phase}")]
    InvalidTransition {
        /// The rejected command.
        action: &'static str,
        /// Phase at the time of the call.
        phase: Phase,
    },

    /// Unlock attempted while the app is not locked.
    #[error("app is not locked")]
    NotLocked,

    /// Another unlock attempt is still outstanding.
    #[error("an unlock attempt is already in progress")]
    Busy,

    /// Credential primitive failure (delegated from latchkey-crypto).
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
