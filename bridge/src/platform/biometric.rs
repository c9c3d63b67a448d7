//! Platform biometric authenticators.
//!
//! On macOS a keychain item guarded by the current biometric set is read
//! back on every prompt; reading it is what raises Touch ID. Other
//! platforms have no sensor integration and fall back to
//! [`NullBiometricAuthenticator`](latchkey_core::NullBiometricAuthenticator).

use std::sync::Arc;

use latchkey_core::BiometricAuthenticator;
#[cfg(not(target_os = "macos"))]
use latchkey_core::NullBiometricAuthenticator;

// ---------------------------------------------------------------------------
// macOS provider
// ---------------------------------------------------------------------------

#[cfg(target_os = "macos")]
mod macos {
    use latchkey_core::{BiometricAuthenticator, BiometricError, BiometricKind};
    use security_framework::passwords::{
        delete_generic_password, get_generic_password, set_generic_password_options,
    };
    use security_framework::passwords_options::{AccessControlOptions, PasswordOptions};

    /// Keychain service and account of the prompt guard item.
    const KEYCHAIN_SERVICE: &str = "com.latchkey.biometric";
    const GUARD_ACCOUNT: &str = "com.latchkey.biometric.guard";
    const GUARD_VALUE: &[u8] = b"latchkey";

    pub struct MacOsBiometricAuthenticator;

    impl MacOsBiometricAuthenticator {
        /// Recreate the guard item so it is bound to the currently
        /// enrolled fingers. Writing does not prompt.
        fn provision_guard() -> Result<(), BiometricError> {
            let _ = delete_generic_password(KEYCHAIN_SERVICE, GUARD_ACCOUNT);
            let mut opts = PasswordOptions::new_generic_password(KEYCHAIN_SERVICE, GUARD_ACCOUNT);
            opts.set_access_control_options(AccessControlOptions::BIOMETRY_CURRENT_SET);
            set_generic_password_options(GUARD_VALUE, opts)
                .map_err(|e| BiometricError::PlatformError(format!("keychain add failed: {e}")))
        }
    }

    impl BiometricAuthenticator for MacOsBiometricAuthenticator {
        fn is_available(&self) -> bool {
            check_biometric_hardware_available()
        }

        fn kinds(&self) -> Vec<BiometricKind> {
            vec![BiometricKind::Fingerprint]
        }

        fn provider_name(&self) -> &'static str {
            "Touch ID"
        }

        fn authenticate(&self, prompt: &str) -> Result<(), BiometricError> {
            if !self.is_available() {
                return Err(BiometricError::NotAvailable);
            }
            Self::provision_guard()?;
            tracing::debug!(prompt, "requesting Touch ID");
            let secret = get_generic_password(KEYCHAIN_SERVICE, GUARD_ACCOUNT).map_err(|e| {
                let code = e.code();
                match code {
                    -128 => BiometricError::UserCancelled, // errSecUserCanceled
                    -25293 => BiometricError::AuthenticationFailed(
                        "biometric authentication failed".into(),
                    ), // errSecAuthFailed
                    -25300 => BiometricError::NotEnrolled, // errSecItemNotFound
                    _ => BiometricError::PlatformError(format!(
                        "keychain get failed (code {code}): {e}"
                    )),
                }
            })?;
            if secret == GUARD_VALUE {
                Ok(())
            } else {
                Err(BiometricError::PlatformError("keychain guard item mismatch".into()))
            }
        }
    }

    /// `LAContext canEvaluatePolicy:` for
    /// `LAPolicyDeviceOwnerAuthenticationWithBiometrics`.
    fn check_biometric_hardware_available() -> bool {
        unsafe {
            let Some(cls) = objc2::runtime::AnyClass::get(c"LAContext") else {
                return false;
            };

            let ctx: *mut objc2::runtime::AnyObject = objc2::msg_send![cls, new];
            if ctx.is_null() {
                return false;
            }

            let mut error: *mut objc2::runtime::AnyObject = std::ptr::null_mut();
            let policy: i64 = 1;
            let can_evaluate: bool =
                objc2::msg_send![&*ctx, canEvaluatePolicy: policy, error: &mut error];

            let _: () = objc2::msg_send![&*ctx, release];

            can_evaluate
        }
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// The sensor-backed authenticator for this platform.
#[must_use]
pub fn platform_authenticator() -> Arc<dyn BiometricAuthenticator> {
    #[cfg(target_os = "macos")]
    {
        Arc::new(macos::MacOsBiometricAuthenticator)
    }

    #[cfg(not(target_os = "macos"))]
    {
        Arc::new(NullBiometricAuthenticator)
    }
}
