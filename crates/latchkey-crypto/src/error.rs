//! Error types for `latchkey-crypto`.

use thiserror::Error;

/// Errors produced by credential primitives.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The PIN is not exactly four ASCII digits.
    #[error("PIN code must be exactly {expected} digits")]
    InvalidPin {
        /// Required PIN length.
        expected: usize,
    },

    /// A stored digest could not be decoded (not lowercase hex, wrong length).
    #[error("malformed digest: {0}")]
    MalformedDigest(String),

    /// Password hashing failed (parameter validation, PHC encoding).
    #[error("password hashing failed: {0}")]
    PasswordHashing(String),

    /// Sealing failed (bad key length, AEAD failure).
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Opening failed: truncated input, wrong key, or tampered data.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// The OS random source failed.
    #[error("random source failure: {0}")]
    Randomness(String),
}
