//! Account password strength scoring and Argon2id hashing.
//!
//! Strength scoring awards one point per satisfied rule (length, upper,
//! lower, digit, symbol); a password is acceptable at four points.
//! Hashes are PHC strings (`$argon2id$v=19$m=...`) so the parameters travel
//! with the hash and verification needs no side channel.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Minimum length for the length rule.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Points required for [`PasswordStrength::is_valid`].
const ACCEPTABLE_SCORE: u8 = 4;

/// Characters that satisfy the symbol rule.
const SYMBOLS: &str = "!@#$%^&*(),.?\":{}|<>";

// ---------------------------------------------------------------------------
// Strength
// ---------------------------------------------------------------------------

/// Result of [`evaluate_password_strength`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordStrength {
    /// `score >= 4`.
    pub is_valid: bool,
    /// Number of satisfied rules (0-5).
    pub score: u8,
    /// One message per unsatisfied rule, in rule order.
    pub feedback: Vec<String>,
}

/// Score a candidate account password.
#[must_use]
pub fn evaluate_password_strength(password: &str) -> PasswordStrength {
    let rules: [(bool, &str); 5] = [
        (
            password.chars().count() >= MIN_PASSWORD_LENGTH,
            "Password must be at least 8 characters long",
        ),
        (
            password.chars().any(|c| c.is_ascii_uppercase()),
            "Password must contain at least one uppercase letter",
        ),
        (
            password.chars().any(|c| c.is_ascii_lowercase()),
            "Password must contain at least one lowercase letter",
        ),
        (
            password.chars().any(|c| c.is_ascii_digit()),
            "Password must contain at least one number",
        ),
        (
            password.chars().any(|c| SYMBOLS.contains(c)),
            "Password should contain at least one special character",
        ),
    ];

    let mut score = 0u8;
    let mut feedback = Vec::new();
    for (passed, message) in rules {
        if passed {
            score = score.saturating_add(1);
        } else {
            feedback.push(message.to_owned());
        }
    }

    PasswordStrength {
        is_valid: score >= ACCEPTABLE_SCORE,
        score,
        feedback,
    }
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// Argon2id cost parameters for account password hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHashParams {
    /// Memory cost in KiB.
    pub m_cost: u32,
    /// Iterations.
    pub t_cost: u32,
    /// Lanes.
    pub p_cost: u32,
}

impl Default for PasswordHashParams {
    /// OWASP's baseline Argon2id recommendation (19 MiB, 2 passes, 1 lane).
    fn default() -> Self {
        Self {
            m_cost: 19_456,
            t_cost: 2,
            p_cost: 1,
        }
    }
}

/// Hash a password with default parameters and a fresh random salt.
///
/// # Errors
///
/// Returns [`CryptoError::PasswordHashing`] if Argon2 rejects the input.
pub fn hash_password(password: &str) -> Result<String, CryptoError> {
    hash_password_with(password, &PasswordHashParams::default())
}

/// Hash a password with explicit parameters and a fresh random salt.
///
/// # Errors
///
/// Returns [`CryptoError::PasswordHashing`] if the parameters are out of
/// range or hashing fails.
pub fn hash_password_with(
    password: &str,
    params: &PasswordHashParams,
) -> Result<String, CryptoError> {
    let argon2_params = Params::new(params.m_cost, params.t_cost, params.p_cost, None)
        .map_err(|e| CryptoError::PasswordHashing(e.to_string()))?;
    let hasher = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);
    let salt = SaltString::generate(&mut OsRng);
    hasher
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| CryptoError::PasswordHashing(e.to_string()))
}

/// Verify a password against a PHC string produced by [`hash_password`].
///
/// # Errors
///
/// Returns [`CryptoError::PasswordHashing`] if `phc` is not a valid PHC
/// string. A wrong password is `Ok(false)`.
pub fn verify_password(password: &str, phc: &str) -> Result<bool, CryptoError> {
    let parsed =
        PasswordHash::new(phc).map_err(|e| CryptoError::PasswordHashing(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Small parameters so the suite stays fast.
    fn fast() -> PasswordHashParams {
        PasswordHashParams {
            m_cost: 64,
            t_cost: 1,
            p_cost: 1,
        }
    }

    #[test]
    fn strong_password_scores_five() {
        let s = evaluate_password_strength("Tr0ub4dor&3");
        assert_eq!(s.score, 5);
        assert!(s.is_valid);
        assert!(s.feedback.is_empty());
    }

    #[test]
    fn missing_symbol_is_still_valid() {
        let s = evaluate_password_strength("Password1");
        assert_eq!(s.score, 4);
        assert!(s.is_valid);
        assert_eq!(s.feedback.len(), 1);
    }

    #[test]
    fn short_lowercase_password_is_weak() {
        let s = evaluate_password_strength("abc");
        assert_eq!(s.score, 1);
        assert!(!s.is_valid);
        assert_eq!(s.feedback.len(), 4);
        assert!(s.feedback[0].contains("8 characters"));
    }

    #[test]
    fn empty_password_scores_zero() {
        let s = evaluate_password_strength("");
        assert_eq!(s.score, 0);
        assert_eq!(s.feedback.len(), 5);
    }

    #[test]
    fn hash_then_verify() {
        let phc = hash_password_with("Correct-Horse-1", &fast()).unwrap();
        assert!(phc.starts_with("$argon2id$"));
        assert!(verify_password("Correct-Horse-1", &phc).unwrap());
        assert!(!verify_password("correct-horse-1", &phc).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        let a = hash_password_with("same", &fast()).unwrap();
        let b = hash_password_with("same", &fast()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn verify_rejects_malformed_phc() {
        assert!(matches!(
            verify_password("x", "not a phc string"),
            Err(CryptoError::PasswordHashing(_))
        ));
    }

    #[test]
    fn invalid_params_are_reported() {
        let bad = PasswordHashParams {
            m_cost: 1,
            t_cost: 0,
            p_cost: 0,
        };
        assert!(hash_password_with("x", &bad).is_err());
    }
}
