//! AES-256-GCM sealing for blobs written to disk.
//!
//! Wire format: `nonce (12 bytes) || ciphertext || tag (16 bytes)`. The
//! nonce is drawn from `OsRng` on every call, so sealing the same plaintext
//! twice never yields the same bytes.

use rand::rngs::OsRng;
use rand::RngCore;
use ring::aead;
use zeroize::{Zeroize, Zeroizing};

use crate::error::CryptoError;
use crate::memory::SecretBytes;

/// Key length in bytes (256 bits).
pub const SEAL_KEY_LEN: usize = 32;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// A 256-bit sealing key, zeroized on drop.
pub type SealKey = SecretBytes<SEAL_KEY_LEN>;

/// Draw a fresh sealing key from `OsRng`.
#[must_use]
pub fn generate_seal_key() -> SealKey {
    let mut raw = [0u8; SEAL_KEY_LEN];
    OsRng.fill_bytes(&mut raw);
    let key = SealKey::new(raw);
    raw.zeroize();
    key
}

fn aead_key(key: &SealKey) -> Result<aead::LessSafeKey, CryptoError> {
    let unbound = aead::UnboundKey::new(&aead::AES_256_GCM, key.expose())
        .map_err(|_| CryptoError::Encryption("failed to create AES-256-GCM key".into()))?;
    Ok(aead::LessSafeKey::new(unbound))
}

/// Encrypt and authenticate `plaintext`, binding `aad` to the result.
///
/// # Errors
///
/// Returns [`CryptoError::Encryption`] if the AEAD operation fails.
pub fn seal(plaintext: &[u8], key: &SealKey, aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let key = aead_key(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = aead::Nonce::assume_unique_for_key(nonce_bytes);

    let mut in_out = plaintext.to_vec();
    let Ok(tag) = key.seal_in_place_separate_tag(nonce, aead::Aad::from(aad), &mut in_out) else {
        in_out.zeroize();
        return Err(CryptoError::Encryption(
            "AES-256-GCM encryption failed".into(),
        ));
    };

    let capacity = NONCE_LEN
        .saturating_add(in_out.len())
        .saturating_add(TAG_LEN);
    let mut out = Vec::with_capacity(capacity);
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&in_out);
    out.extend_from_slice(tag.as_ref());
    Ok(out)
}

/// Authenticate and decrypt a blob produced by [`seal`].
///
/// The plaintext comes back in a buffer that is wiped on drop.
///
/// # Errors
///
/// Returns [`CryptoError::Decryption`] if the blob is too short, or if the
/// key, the `aad` or any byte of the blob does not match.
pub fn open(sealed: &[u8], key: &SealKey, aad: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if sealed.len() < NONCE_LEN.saturating_add(TAG_LEN) {
        return Err(CryptoError::Decryption(format!(
            "sealed blob too short: {} bytes",
            sealed.len()
        )));
    }
    let key = aead_key(key)?;

    let (nonce_bytes, body) = sealed.split_at(NONCE_LEN);
    let nonce = aead::Nonce::try_assume_unique_for_key(nonce_bytes)
        .map_err(|_| CryptoError::Decryption("bad nonce".into()))?;

    let mut in_out = Zeroizing::new(body.to_vec());
    let plain_len = key
        .open_in_place(nonce, aead::Aad::from(aad), in_out.as_mut_slice())
        .map_err(|_| CryptoError::Decryption("authentication failed".into()))?
        .len();
    in_out.truncate(plain_len);
    Ok(in_out)
}
