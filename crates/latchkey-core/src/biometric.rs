//! Biometric authenticator abstraction.
//!
//! The core never talks to sensor hardware. Hosts inject a
//! [`BiometricAuthenticator`]; the vault and the gate only ask whether it is
//! available and whether a single prompt succeeded.
//!
//! ```text
//! BiometricAuthenticator (trait)
//! ├── NullBiometricAuthenticator   (always unavailable, fallback)
//! ├── FixedBiometricAuthenticator  (scripted answer, headless hosts and tests)
//! └── platform providers           (host shell)
//! ```

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors from a biometric prompt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BiometricError {
    /// No biometric hardware detected on this device.
    #[error("biometric hardware not available")]
    NotAvailable,
    /// Hardware exists but nothing is enrolled.
    #[error("no biometrics enrolled on this device")]
    NotEnrolled,
    /// User dismissed the prompt.
    #[error("biometric verification cancelled")]
    UserCancelled,
    /// Verification failed (wrong finger, face not recognised).
    #[error("biometric authentication failed: {0}")]
    AuthenticationFailed(String),
    /// The prompt did not answer before its deadline.
    #[error("biometric prompt timed out")]
    TimedOut,
    /// Platform-specific failure.
    #[error("platform error: {0}")]
    PlatformError(String),
}

impl BiometricError {
    /// Whether the failure means biometrics cannot be used at all, as
    /// opposed to a single rejected attempt.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::NotAvailable | Self::NotEnrolled)
    }
}

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// Sensor family reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BiometricKind {
    /// Fingerprint reader.
    Fingerprint,
    /// Face recognition camera.
    FacialRecognition,
    /// Iris scanner.
    Iris,
}

impl BiometricKind {
    /// Label shown next to the biometric toggle.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Fingerprint => "Fingerprint",
            Self::FacialRecognition => "Face ID",
            Self::Iris => "Iris",
        }
    }
}

// ---------------------------------------------------------------------------
// Authenticator trait
// ---------------------------------------------------------------------------

/// Platform biometric capability.
pub trait BiometricAuthenticator: Send + Sync {
    /// Hardware present and at least one biometric enrolled.
    fn is_available(&self) -> bool;

    /// Supported sensor kinds. Empty when unknown.
    fn kinds(&self) -> Vec<BiometricKind> {
        Vec::new()
    }

    /// Human-readable provider name (e.g. "Touch ID").
    fn provider_name(&self) -> &'static str;

    /// Show one prompt and block until the user answers.
    ///
    /// # Errors
    ///
    /// Returns [`BiometricError`] if the prompt is rejected, cancelled or
    /// the hardware is unusable.
    fn authenticate(&self, prompt: &str) -> Result<(), BiometricError>;
}

// ---------------------------------------------------------------------------
// Null authenticator (fallback)
// ---------------------------------------------------------------------------

/// Fallback when no biometric hardware is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBiometricAuthenticator;

impl BiometricAuthenticator for NullBiometricAuthenticator {
    fn is_available(&self) -> bool {
        false
    }

    fn provider_name(&self) -> &'static str {
        "None"
    }

    fn authenticate(&self, _prompt: &str) -> Result<(), BiometricError> {
        Err(BiometricError::NotAvailable)
    }
}

// ---------------------------------------------------------------------------
// Fixed authenticator
// ---------------------------------------------------------------------------

/// Authenticator with a scripted answer.
///
/// Used by the headless bridge (`--biometric accept|reject`) and by tests.
/// The answer can be flipped at runtime; every prompt is counted.
#[derive(Debug)]
pub struct FixedBiometricAuthenticator {
    available: bool,
    accept: AtomicBool,
    kinds: Vec<BiometricKind>,
    prompts: AtomicU32,
}

impl FixedBiometricAuthenticator {
    /// Available hardware that accepts every prompt.
    #[must_use]
    pub fn accepting() -> Self {
        Self::new(true, true)
    }

    /// Available hardware that rejects every prompt.
    #[must_use]
    pub fn rejecting() -> Self {
        Self::new(true, false)
    }

    /// Build with explicit availability and answer.
    #[must_use]
    pub fn new(available: bool, accept: bool) -> Self {
        Self {
            available,
            accept: AtomicBool::new(accept),
            kinds: vec![BiometricKind::Fingerprint],
            prompts: AtomicU32::new(0),
        }
    }

    /// Change the answer for subsequent prompts.
    pub fn set_accept(&self, accept: bool) {
        self.accept.store(accept, Ordering::SeqCst);
    }

    /// Number of prompts shown so far.
    #[must_use]
    pub fn prompt_count(&self) -> u32 {
        self.prompts.load(Ordering::SeqCst)
    }
}

impl BiometricAuthenticator for FixedBiometricAuthenticator {
    fn is_available(&self) -> bool {
        self.available
    }

    fn kinds(&self) -> Vec<BiometricKind> {
        if self.available {
            self.kinds.clone()
        } else {
            Vec::new()
        }
    }

    fn provider_name(&self) -> &'static str {
        "Fixed"
    }

    fn authenticate(&self, prompt: &str) -> Result<(), BiometricError> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        if !self.available {
            return Err(BiometricError::NotAvailable);
        }
        if self.accept.load(Ordering::SeqCst) {
            tracing::debug!(prompt, "scripted biometric prompt accepted");
            Ok(())
        } else {
            Err(BiometricError::AuthenticationFailed(
                "scripted rejection".into(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_never_available() {
        let auth = NullBiometricAuthenticator;
        assert!(!auth.is_available());
        assert!(auth.kinds().is_empty());
        assert_eq!(auth.authenticate("x"), Err(BiometricError::NotAvailable));
    }

    #[test]
    fn fixed_answers_as_scripted() {
        let auth = FixedBiometricAuthenticator::accepting();
        assert!(auth.authenticate("Unlock").is_ok());
        auth.set_accept(false);
        assert!(matches!(
            auth.authenticate("Unlock"),
            Err(BiometricError::AuthenticationFailed(_))
        ));
        assert_eq!(auth.prompt_count(), 2);
    }

    #[test]
    fn fixed_unavailable_reports_not_available() {
        let auth = FixedBiometricAuthenticator::new(false, true);
        assert!(auth.kinds().is_empty());
        assert_eq!(auth.authenticate("x"), Err(BiometricError::NotAvailable));
    }

    #[test]
    fn unavailable_classification() {
        assert!(BiometricError::NotAvailable.is_unavailable());
        assert!(BiometricError::NotEnrolled.is_unavailable());
        assert!(!BiometricError::UserCancelled.is_unavailable());
        assert!(!BiometricError::TimedOut.is_unavailable());
    }

    #[test]
    fn kind_labels() {
        assert_eq!(BiometricKind::FacialRecognition.display_name(), "Face ID");
        assert_eq!(BiometricKind::Fingerprint.display_name(), "Fingerprint");
    }
}
