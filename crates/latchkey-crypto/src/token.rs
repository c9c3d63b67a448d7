//! Random identifiers and opaque tokens drawn from `OsRng`.

use data_encoding::BASE64URL_NOPAD;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use zeroize::Zeroize;

use crate::memory::SecretBytes;

/// Length of a session token in characters.
pub const SESSION_TOKEN_LEN: usize = 64;

/// Marker key entropy in bytes.
const MARKER_KEY_LEN: usize = 32;

/// Generate the opaque biometric marker key stored under `biometric_key`.
///
/// 32 bytes of CSPRNG output, base64url without padding (43 characters).
/// The value is never interpreted; its presence is what signals that
/// biometric unlock was provisioned.
#[must_use]
pub fn generate_marker_key() -> String {
    let mut raw = [0u8; MARKER_KEY_LEN];
    OsRng.fill_bytes(&mut raw);
    let key = SecretBytes::new(raw);
    raw.zeroize();
    BASE64URL_NOPAD.encode(key.expose())
}

/// Generate an alphanumeric session token.
#[must_use]
pub fn generate_session_token() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Generate a UUIDv4-like string using `OsRng`.
///
/// Format: `xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx` where x is random hex
/// and y is one of `{8, 9, a, b}`.
#[must_use]
pub fn generate_id() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);

    bytes[6] = (bytes[6] & 0x0F) | 0x40; // version 4
    bytes[8] = (bytes[8] & 0x3F) | 0x80; // variant 1

    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        bytes[6], bytes[7],
        bytes[8], bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15],
    )
}
