//! Wrappers for user-entered secrets (PINs, passwords) and random key material.
//!
//! Both types zeroize on drop and mask their `Debug` output so a stray
//! `tracing::debug!(?request)` never writes a PIN to the log file.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

// ---------------------------------------------------------------------------
// SecretText: variable-length UTF-8 secret
// ---------------------------------------------------------------------------

/// A PIN or password as typed by the user.
///
/// Wraps [`SecretString`] from the `secrecy` crate. Deserializes from a plain
/// JSON string so command payloads can carry it directly.
pub struct SecretText {
    inner: SecretString,
}

impl SecretText {
    /// Wrap a string. The original allocation moves into the secret.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: SecretString::from(value.into()),
        }
    }

    /// Borrow the plaintext.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.inner.expose_secret()
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.expose().len()
    }

    /// Whether the secret is the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl From<&str> for SecretText {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SecretText {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl Clone for SecretText {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for SecretText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretText(***)")
    }
}

impl<'de> Deserialize<'de> for SecretText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

// ---------------------------------------------------------------------------
// SecretBytes: fixed-size key material
// ---------------------------------------------------------------------------

/// Fixed-size random key material, zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> SecretBytes<N> {
    /// Take ownership of `bytes`. The caller should zeroize its copy.
    #[must_use]
    pub const fn new(bytes: [u8; N]) -> Self {
        Self { bytes }
    }

    /// Borrow the raw bytes.
    #[must_use]
    pub const fn expose(&self) -> &[u8; N] {
        &self.bytes
    }
}

impl<const N: usize> fmt::Debug for SecretBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes<{N}>(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_text_debug_is_masked() {
        let pin = SecretText::new("1234");
        let rendered = format!("{pin:?}");
        assert_eq!(rendered, "SecretText(***)");
        assert!(!rendered.contains("1234"));
    }

    #[test]
    fn secret_text_exposes_plaintext() {
        let pw = SecretText::from("hunter2");
        assert_eq!(pw.expose(), "hunter2");
        assert_eq!(pw.len(), 7);
        assert!(!pw.is_empty());
    }

    #[test]
    fn secret_text_deserializes_from_json_string() {
        let pin: SecretText = serde_json::from_str("\"0420\"").unwrap();
        assert_eq!(pin.expose(), "0420");
    }

    #[test]
    fn secret_bytes_debug_is_masked() {
        let key = SecretBytes::new([0xAB_u8; 32]);
        assert_eq!(format!("{key:?}"), "SecretBytes<32>(***)");
        assert_eq!(key.expose()[0], 0xAB);
    }
}
