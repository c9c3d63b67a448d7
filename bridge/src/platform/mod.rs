//! Backend selection for the secure store and the biometric sensor.

pub mod biometric;
#[cfg(target_os = "macos")]
pub mod keychain;

use std::sync::Arc;

use anyhow::Context;
use latchkey_core::{
    BiometricAuthenticator, FileStore, FixedBiometricAuthenticator, MemoryStore,
    NullBiometricAuthenticator, SecureStore,
};

use crate::config::{BiometricBackend, BridgeConfig, StoreBackend};

/// Open the configured secure store.
///
/// # Errors
///
/// Fails if the file store directory cannot be opened, or the keychain
/// backend is requested on a platform without one.
pub fn create_store(config: &BridgeConfig) -> anyhow::Result<Arc<dyn SecureStore>> {
    match config.store {
        StoreBackend::File => {
            let store = FileStore::open(&config.data_dir).with_context(|| {
                format!("cannot open secure store in {}", config.data_dir.display())
            })?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Keychain => keychain_store(),
    }
}

#[cfg(target_os = "macos")]
#[allow(clippy::unnecessary_wraps)]
fn keychain_store() -> anyhow::Result<Arc<dyn SecureStore>> {
    Ok(Arc::new(keychain::KeychainStore))
}

#[cfg(not(target_os = "macos"))]
fn keychain_store() -> anyhow::Result<Arc<dyn SecureStore>> {
    anyhow::bail!("the keychain store is only available on macOS")
}

/// Build the configured biometric authenticator.
#[must_use]
pub fn create_biometric_authenticator(
    backend: BiometricBackend,
) -> Arc<dyn BiometricAuthenticator> {
    match backend {
        BiometricBackend::Platform => biometric::platform_authenticator(),
        BiometricBackend::None => Arc::new(NullBiometricAuthenticator),
        BiometricBackend::Accept => {
            tracing::warn!("headless biometric backend: every prompt is accepted");
            Arc::new(FixedBiometricAuthenticator::accepting())
        }
        BiometricBackend::Reject => Arc::new(FixedBiometricAuthenticator::rejecting()),
    }
}
