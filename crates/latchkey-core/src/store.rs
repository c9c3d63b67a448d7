//! Secure key-value store seam and the two portable backends.
//!
//! The platform keychain backend lives in the host shell; this module only
//! defines the trait, an in-memory map and an AES-256-GCM sealed file
//! backend that is written atomically with owner-only permissions.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use latchkey_crypto::{generate_seal_key, open, seal, SealKey, SEAL_KEY_LEN};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Logical keys persisted by the gate and its collaborators.
pub mod keys {
    /// Hex SHA-256 digest of the PIN.
    pub const PIN_CODE_HASH: &str = "pin_code_hash";
    /// `"true"` when biometric unlock is enabled.
    pub const BIOMETRIC_ENABLED: &str = "biometric_auth_enabled";
    /// Opaque marker provisioned when biometric unlock was enabled.
    pub const BIOMETRIC_KEY: &str = "biometric_key";
    /// Epoch milliseconds of the last recorded activity.
    pub const LAST_ACTIVE_TIME: &str = "last_active_time";
    /// Opaque token issued on sign-in.
    pub const SESSION_TOKEN: &str = "session_token";
    /// Failed PIN attempt counter (JSON).
    pub const PIN_ATTEMPTS: &str = "pin_attempts";
    /// Session blob (JSON).
    pub const AUTH_STORE: &str = "auth-store";
    /// Settings blob (JSON).
    pub const SETTINGS: &str = "settings-storage";
    /// Notification ledger snapshot (JSON).
    pub const NOTIFICATIONS: &str = "notifications-storage";
    /// Local account directory (JSON).
    pub const ACCOUNTS: &str = "accounts";
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors from a [`SecureStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("store I/O error: {0}")]
    Io(#[from] io::Error),

    /// A value could not be encoded or decoded.
    #[error("store encoding error: {0}")]
    Encoding(String),

    /// Backend-specific failure (keychain status, poisoned lock).
    #[error("store backend error: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Durable, encrypted-at-rest string storage keyed by string.
///
/// Methods take `&self`; backends synchronise internally so one store can be
/// shared by the vault, the tracker and the gate.
pub trait SecureStore: Send + Sync {
    /// Read a value. `Ok(None)` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend rejects the write.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a key. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend rejects the delete.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Read and decode a JSON blob.
///
/// # Errors
///
/// Returns [`StoreError::Encoding`] if the stored value is not valid JSON
/// for `T`, or the backend error if the read fails.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn SecureStore,
    key: &str,
) -> Result<Option<T>, StoreError> {
    store
        .get(key)?
        .map(|raw| serde_json::from_str(&raw).map_err(|e| StoreError::Encoding(e.to_string())))
        .transpose()
}

/// Encode and write a JSON blob.
///
/// # Errors
///
/// Returns [`StoreError::Encoding`] if serialization fails, or the backend
/// error if the write fails.
pub fn save_json<T: Serialize>(
    store: &dyn SecureStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let json = serde_json::to_string(value).map_err(|e| StoreError::Encoding(e.to_string()))?;
    store.set(key, &json)
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Ephemeral store for tests and hosts without persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |m| m.len())
    }

    /// Whether the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("store lock poisoned".into())
}

impl SecureStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let map = self.entries.lock().map_err(|_| poisoned())?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut map = self.entries.lock().map_err(|_| poisoned())?;
        map.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut map = self.entries.lock().map_err(|_| poisoned())?;
        map.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

const STORE_FILE: &str = "secure-store.bin";
const STORE_TMP_FILE: &str = ".secure-store.bin.tmp";
const KEY_FILE: &str = "secure-store.key";
const KEY_TMP_FILE: &str = ".secure-store.key.tmp";
const STORE_AAD: &[u8] = b"latchkey/secure-store/v1";

/// Encrypted file store under a data directory.
///
/// The whole map is serialized to JSON, sealed with AES-256-GCM and written
/// to `secure-store.bin`. The key lives in `secure-store.key` unless the
/// host supplies one through [`FileStore::open_with_key`]. Both files are
/// created owner-only.
///
/// The map is cached in memory and rewritten on every mutation. A failed
/// write leaves both the file and the cache unchanged.
pub struct FileStore {
    dir: PathBuf,
    key: SealKey,
    entries: Mutex<BTreeMap<String, String>>,
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl FileStore {
    /// Open (or lazily create) the store in `dir`, keyed by the key file
    /// beside it. A missing key file is generated.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory or key file cannot be
    /// created or read, and [`StoreError::Encoding`] if the key file has the
    /// wrong length.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir)?;
        let key = load_or_create_key(dir)?;
        Self::open_with_key(dir, key)
    }

    /// Open the store in `dir` with a key held elsewhere.
    ///
    /// A missing file yields an empty store. A file that is corrupt or was
    /// sealed with another key is logged and also yields an empty store; it
    /// is overwritten by the next write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created or the
    /// file exists but cannot be read.
    pub fn open_with_key(dir: &Path, key: SealKey) -> Result<Self, StoreError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(STORE_FILE);
        let entries = match fs::read(&path) {
            Ok(sealed) => decode_entries(&sealed, &key).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "secure store file is unreadable; starting empty");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            dir: dir.to_path_buf(),
            key,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the sealed store file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(STORE_FILE)
    }

    fn persist(&self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let json = Zeroizing::new(
            serde_json::to_vec(map).map_err(|e| StoreError::Encoding(e.to_string()))?,
        );
        let sealed =
            seal(&json, &self.key, STORE_AAD).map_err(|e| StoreError::Encoding(e.to_string()))?;
        write_private(&self.dir, STORE_TMP_FILE, STORE_FILE, &sealed)
    }

    fn mutate(&self, apply: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<(), StoreError> {
        let mut cached = self.entries.lock().map_err(|_| poisoned())?;
        let mut next = cached.clone();
        apply(&mut next);
        self.persist(&next)?;
        *cached = next;
        Ok(())
    }
}

fn decode_entries(sealed: &[u8], key: &SealKey) -> Result<BTreeMap<String, String>, StoreError> {
    let plain = open(sealed, key, STORE_AAD).map_err(|e| StoreError::Encoding(e.to_string()))?;
    serde_json::from_slice(&plain).map_err(|e| StoreError::Encoding(e.to_string()))
}

fn load_or_create_key(dir: &Path) -> Result<SealKey, StoreError> {
    let path = dir.join(KEY_FILE);
    match fs::read(&path) {
        Ok(raw) => {
            let raw = Zeroizing::new(raw);
            let mut bytes: [u8; SEAL_KEY_LEN] = raw.as_slice().try_into().map_err(|_| {
                StoreError::Encoding(format!(
                    "{} holds {} bytes, expected {SEAL_KEY_LEN}",
                    path.display(),
                    raw.len()
                ))
            })?;
            let key = SealKey::new(bytes);
            bytes.zeroize();
            Ok(key)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let key = generate_seal_key();
            write_private(dir, KEY_TMP_FILE, KEY_FILE, key.expose())?;
            tracing::info!(path = %path.display(), "generated secure store key");
            Ok(key)
        }
        Err(e) => Err(e.into()),
    }
}

/// Write `bytes` to `dir/tmp_name` created at 0600, then rename it over
/// `dir/name`.
fn write_private(dir: &Path, tmp_name: &str, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = dir.join(tmp_name);

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(&tmp)?;

    // A tmp file left by another umask keeps its old mode; tighten it.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp, dir.join(name))?;
    Ok(())
}

impl SecureStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let map = self.entries.lock().map_err(|_| poisoned())?;
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.mutate(|m| {
            m.insert(key.to_owned(), value.to_owned());
        })
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.mutate(|m| {
            m.remove(key);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_store_get_set_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.set("k", "w").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("w"));
        store.delete("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn delete_absent_key_is_ok() {
        let store = MemoryStore::new();
        store.delete("missing").unwrap();
    }

    #[test]
    fn json_helpers_roundtrip() {
        let store = MemoryStore::new();
        save_json(&store, "n", &vec![1u32, 2, 3]).unwrap();
        let back: Option<Vec<u32>> = load_json(&store, "n").unwrap();
        assert_eq!(back, Some(vec![1, 2, 3]));
    }

    #[test]
    fn load_json_reports_bad_encoding() {
        let store = MemoryStore::new();
        store.set("n", "{{nope").unwrap();
        let back: Result<Option<Vec<u32>>, _> = load_json(&store, "n");
        assert!(matches!(back, Err(StoreError::Encoding(_))));
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            store.set(keys::PIN_CODE_HASH, "abc").unwrap();
            store.set(keys::LAST_ACTIVE_TIME, "42").unwrap();
            store.delete(keys::LAST_ACTIVE_TIME).unwrap();
        }
        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(
            reopened.get(keys::PIN_CODE_HASH).unwrap().as_deref(),
            Some("abc")
        );
        assert_eq!(reopened.get(keys::LAST_ACTIVE_TIME).unwrap(), None);
    }

    #[test]
    fn file_store_recovers_from_corrupt_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(STORE_FILE), "{ not json").unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.get("anything").unwrap(), None);
        store.set("k", "v").unwrap();
        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn file_store_leaves_no_tmp_file() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set("k", "v").unwrap();
        assert!(!dir.path().join(STORE_TMP_FILE).exists());
        assert!(store.path().exists());
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set("k", "v").unwrap();
        for path in [store.path(), dir.path().join(KEY_FILE)] {
            let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600, "{} should be owner-only (0600)", path.display());
        }
    }

    #[test]
    fn file_store_contents_are_sealed() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let digest = latchkey_crypto::hash_pin("1234").unwrap();
        store.set(keys::PIN_CODE_HASH, digest.as_str()).unwrap();
        store.set(keys::SESSION_TOKEN, "tok-abc").unwrap();

        let raw = fs::read(store.path()).unwrap();
        let text = String::from_utf8_lossy(&raw);
        for needle in [digest.as_str(), "tok-abc", keys::PIN_CODE_HASH, keys::SESSION_TOKEN] {
            assert!(!text.contains(needle), "{needle} stored in clear");
        }
    }

    #[test]
    fn file_store_reuses_its_key_file() {
        let dir = TempDir::new().unwrap();
        FileStore::open(dir.path()).unwrap().set("k", "v").unwrap();
        let key_before = fs::read(dir.path().join(KEY_FILE)).unwrap();
        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(fs::read(dir.path().join(KEY_FILE)).unwrap(), key_before);
    }

    #[test]
    fn file_store_with_another_key_starts_empty() {
        let dir = TempDir::new().unwrap();
        FileStore::open(dir.path()).unwrap().set("k", "v").unwrap();
        let other = FileStore::open_with_key(dir.path(), generate_seal_key()).unwrap();
        assert_eq!(other.get("k").unwrap(), None);
    }

    #[test]
    fn truncated_key_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(KEY_FILE), [0u8; 7]).unwrap();
        assert!(matches!(
            FileStore::open(dir.path()),
            Err(StoreError::Encoding(_))
        ));
    }
}
