//! macOS keychain backend for [`SecureStore`].
//!
//! Each logical key is a generic-password item under one service name.

use latchkey_core::{SecureStore, StoreError};
use security_framework::passwords::{
    delete_generic_password, get_generic_password, set_generic_password,
};

/// Keychain service name for store items.
const KEYCHAIN_SERVICE: &str = "com.latchkey.secure-store";

/// errSecItemNotFound
const ERR_SEC_ITEM_NOT_FOUND: i32 = -25300;

#[derive(Debug, Default, Clone, Copy)]
pub struct KeychainStore;

impl SecureStore for KeychainStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match get_generic_password(KEYCHAIN_SERVICE, key) {
            Ok(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| StoreError::Encoding(e.to_string())),
            Err(e) if e.code() == ERR_SEC_ITEM_NOT_FOUND => Ok(None),
            Err(e) => Err(StoreError::Backend(format!(
                "keychain get failed (code {}): {e}",
                e.code()
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        set_generic_password(KEYCHAIN_SERVICE, key, value.as_bytes())
            .map_err(|e| StoreError::Backend(format!("keychain set failed: {e}")))
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        match delete_generic_password(KEYCHAIN_SERVICE, key) {
            Ok(()) => Ok(()),
            Err(e) if e.code() == ERR_SEC_ITEM_NOT_FOUND => Ok(()),
            Err(e) => Err(StoreError::Backend(format!("keychain delete failed: {e}"))),
        }
    }
}
