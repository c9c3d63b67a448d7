//! `latchkey-crypto`: pure credential primitives for Latchkey.
//!
//! Zero I/O, zero async. Everything here is deterministic given its inputs
//! except the generators in [`token`] and the nonces in [`seal`], which
//! draw from `OsRng`.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod memory;

pub mod pin;

pub mod password;

pub mod seal;

pub mod token;

pub use error::CryptoError;
pub use memory::{SecretBytes, SecretText};
pub use password::{
    evaluate_password_strength, hash_password, hash_password_with, verify_password,
    PasswordHashParams, PasswordStrength, MIN_PASSWORD_LENGTH,
};
pub use pin::{constant_time_eq, hash_pin, is_valid_pin, PinHash, PIN_LENGTH};
pub use seal::{generate_seal_key, open, seal, SealKey, SEAL_KEY_LEN};
pub use token::{generate_id, generate_marker_key, generate_session_token, SESSION_TOKEN_LEN};
