//! PIN validation and digest.
//!
//! A PIN is exactly four ASCII digits. It is stored only as the lowercase
//! hex SHA-256 digest of its UTF-8 bytes: deterministic and unsalted, so the
//! same PIN always yields the same [`PinHash`]. This keeps stored hashes
//! comparable across reinstalls of the host app but offers no resistance to
//! offline guessing (10 000 candidates); throttling lives in the caller.

use std::fmt;

use data_encoding::HEXLOWER;
use ring::digest::{digest, SHA256};
use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// Number of digits in a PIN.
pub const PIN_LENGTH: usize = 4;

/// SHA-256 output length in bytes.
const DIGEST_LEN: usize = 32;

/// `true` iff `pin` matches `^\d{4}$`.
#[must_use]
pub fn is_valid_pin(pin: &str) -> bool {
    pin.len() == PIN_LENGTH && pin.bytes().all(|b| b.is_ascii_digit())
}

/// Hash a PIN after validating its format.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidPin`] if `pin` is not four ASCII digits.
pub fn hash_pin(pin: &str) -> Result<PinHash, CryptoError> {
    if !is_valid_pin(pin) {
        return Err(CryptoError::InvalidPin {
            expected: PIN_LENGTH,
        });
    }
    let out = digest(&SHA256, pin.as_bytes());
    Ok(PinHash(HEXLOWER.encode(out.as_ref())))
}

/// Constant-time comparison for digests and key material.
///
/// The early return on length mismatch is acceptable because digest
/// lengths are public knowledge.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

// ---------------------------------------------------------------------------
// PinHash
// ---------------------------------------------------------------------------

/// Hex-encoded SHA-256 digest of a PIN, as persisted under `pin_code_hash`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinHash(String);

impl PinHash {
    /// Rehydrate a digest read back from storage.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MalformedDigest`] unless `hex` is 64 lowercase
    /// hex characters.
    pub fn from_stored(hex: &str) -> Result<Self, CryptoError> {
        let bytes = HEXLOWER
            .decode(hex.as_bytes())
            .map_err(|e| CryptoError::MalformedDigest(e.to_string()))?;
        if bytes.len() != DIGEST_LEN {
            return Err(CryptoError::MalformedDigest(format!(
                "expected {DIGEST_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(hex.to_owned()))
    }

    /// The stored representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check a candidate PIN against this digest.
    ///
    /// Malformed candidates never match; they are not an error here because
    /// the caller treats any mismatch as a rejected attempt.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        hash_pin(candidate).is_ok_and(|h| constant_time_eq(h.0.as_bytes(), self.0.as_bytes()))
    }
}

impl fmt::Debug for PinHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PinHash(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_four_digits() {
        assert!(is_valid_pin("1234"));
        assert!(is_valid_pin("0000"));
    }

    #[test]
    fn rejects_wrong_length_or_non_digits() {
        assert!(!is_valid_pin(""));
        assert!(!is_valid_pin("12"));
        assert!(!is_valid_pin("12345"));
        assert!(!is_valid_pin("12a4"));
        assert!(!is_valid_pin(" 123"));
        // Non-ASCII digits are not accepted.
        assert!(!is_valid_pin("١٢٣٤"));
    }

    #[test]
    fn hash_matches_known_sha256_vector() {
        let h = hash_pin("1234").unwrap();
        assert_eq!(
            h.as_str(),
            "03ac674216f3e15c761ee1a5e255f067953623c8b388b4459e13f978d7c846f4"
        );
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_pin("4821").unwrap(), hash_pin("4821").unwrap());
    }

    #[test]
    fn hash_rejects_invalid_pin() {
        assert!(matches!(
            hash_pin("12"),
            Err(CryptoError::InvalidPin { expected: 4 })
        ));
    }

    #[test]
    fn matches_only_the_original_pin() {
        let h = hash_pin("1234").unwrap();
        assert!(h.matches("1234"));
        assert!(!h.matches("0000"));
        assert!(!h.matches("123"));
    }

    #[test]
    fn from_stored_roundtrips() {
        let h = hash_pin("9876").unwrap();
        let back = PinHash::from_stored(h.as_str()).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn from_stored_rejects_garbage() {
        assert!(PinHash::from_stored("not-hex").is_err());
        assert!(PinHash::from_stored("abcd").is_err());
        assert!(PinHash::from_stored("").is_err());
    }

    #[test]
    fn debug_does_not_leak_digest() {
        let h = hash_pin("1234").unwrap();
        assert_eq!(format!("{h:?}"), "PinHash(***)");
    }

    #[test]
    fn constant_time_eq_behaviour() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
        assert!(constant_time_eq(b"", b""));
    }
}
