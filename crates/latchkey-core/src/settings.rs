//! User settings: persisted as one JSON blob under `settings-storage`.
//!
//! Loaded before anything else on start so the lock-screen toggle and the
//! timeout are known when the gate restores its session.

use serde::{Deserialize, Serialize};

use crate::error::GateError;
use crate::store::{keys, load_json, save_json, SecureStore, StoreError};

/// Upper bound for the lock-screen timeout (one hour).
pub const MAX_LOCK_TIMEOUT_SECS: u64 = 3_600;

// ── Enums ──────────────────────────────────────────────────────────

/// Colour scheme preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    System,
}

/// UI language preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Uz,
    System,
}

// ── Settings ───────────────────────────────────────────────────────

/// Persisted application settings.
///
/// Every field has a default, so a blob written by an older build (or a
/// partial one) still loads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub theme_mode: ThemeMode,

    #[serde(default)]
    pub language: Language,

    /// Local notifications on/off.
    #[serde(default = "default_true")]
    pub notifications: bool,

    #[serde(default = "default_true")]
    pub haptic_feedback: bool,

    #[serde(default = "default_true")]
    pub auto_save: bool,

    /// Mirror of the vault's biometric flag, for display. Written only by
    /// the gate after the vault changed.
    #[serde(default)]
    pub biometric_auth: bool,

    /// Whether the lock screen guards the signed-in session.
    #[serde(default)]
    pub lock_screen: bool,

    /// Seconds of inactivity before re-lock (0 = lock on every foreground).
    #[serde(default = "default_lock_timeout")]
    pub lock_screen_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme_mode: ThemeMode::default(),
            language: Language::default(),
            notifications: true,
            haptic_feedback: true,
            auto_save: true,
            biometric_auth: false,
            lock_screen: false,
            lock_screen_timeout_secs: default_lock_timeout(),
        }
    }
}

const fn default_true() -> bool {
    true
}
const fn default_lock_timeout() -> u64 {
    30
}

/// Partial update. `None` leaves a field unchanged.
///
/// The biometric flag is absent on purpose: it changes only through the
/// vault, which needs a successful prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default)]
    pub theme_mode: Option<ThemeMode>,
    #[serde(default)]
    pub language: Option<Language>,
    #[serde(default)]
    pub notifications: Option<bool>,
    #[serde(default)]
    pub haptic_feedback: Option<bool>,
    #[serde(default)]
    pub auto_save: Option<bool>,
    #[serde(default)]
    pub lock_screen: Option<bool>,
    #[serde(default)]
    pub lock_screen_timeout_secs: Option<u64>,
}

impl Settings {
    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// [`GateError::Validation`] if the timeout exceeds
    /// [`MAX_LOCK_TIMEOUT_SECS`].
    pub fn validate(&self) -> Result<(), GateError> {
        if self.lock_screen_timeout_secs > MAX_LOCK_TIMEOUT_SECS {
            return Err(GateError::Validation(format!(
                "lock screen timeout must be between 0 and {MAX_LOCK_TIMEOUT_SECS} seconds"
            )));
        }
        Ok(())
    }

    /// Return a copy with `patch` applied, validated.
    ///
    /// # Errors
    ///
    /// [`GateError::Validation`] if the result is out of range.
    pub fn apply(&self, patch: &SettingsPatch) -> Result<Self, GateError> {
        let mut next = self.clone();
        if let Some(v) = patch.theme_mode {
            next.theme_mode = v;
        }
        if let Some(v) = patch.language {
            next.language = v;
        }
        if let Some(v) = patch.notifications {
            next.notifications = v;
        }
        if let Some(v) = patch.haptic_feedback {
            next.haptic_feedback = v;
        }
        if let Some(v) = patch.auto_save {
            next.auto_save = v;
        }
        if let Some(v) = patch.lock_screen {
            next.lock_screen = v;
        }
        if let Some(v) = patch.lock_screen_timeout_secs {
            next.lock_screen_timeout_secs = v;
        }
        next.validate()?;
        Ok(next)
    }

    /// Load from the store.
    ///
    /// Missing, unreadable, corrupt or out-of-range blobs all yield
    /// [`Settings::default`]; the cause is logged.
    #[must_use]
    pub fn load(store: &dyn SecureStore) -> Self {
        match load_json::<Self>(store, keys::SETTINGS) {
            Ok(Some(s)) if s.validate().is_ok() => s,
            Ok(Some(_)) => {
                tracing::warn!("stored settings out of range, using defaults");
                Self::default()
            }
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, "stored settings unreadable, using defaults");
                Self::default()
            }
        }
    }

    /// Persist to the store.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    pub fn save(&self, store: &dyn SecureStore) -> Result<(), StoreError> {
        save_json(store, keys::SETTINGS, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn defaults_match_first_launch() {
        let s = Settings::default();
        assert_eq!(s.theme_mode, ThemeMode::System);
        assert_eq!(s.language, Language::En);
        assert!(s.notifications && s.haptic_feedback && s.auto_save);
        assert!(!s.biometric_auth);
        assert!(!s.lock_screen);
        assert_eq!(s.lock_screen_timeout_secs, 30);
    }

    #[test]
    fn partial_blob_fills_defaults() {
        let s: Settings = serde_json::from_str(r#"{"themeMode":"dark","lockScreen":true}"#).unwrap();
        assert_eq!(s.theme_mode, ThemeMode::Dark);
        assert!(s.lock_screen);
        assert_eq!(s.lock_screen_timeout_secs, 30);
        assert!(s.notifications);
    }

    #[test]
    fn apply_patch_and_validate() {
        let s = Settings::default();
        let next = s
            .apply(&SettingsPatch {
                language: Some(Language::Uz),
                lock_screen_timeout_secs: Some(3_600),
                ..SettingsPatch::default()
            })
            .unwrap();
        assert_eq!(next.language, Language::Uz);
        assert_eq!(next.lock_screen_timeout_secs, 3_600);

        let too_long = s.apply(&SettingsPatch {
            lock_screen_timeout_secs: Some(3_601),
            ..SettingsPatch::default()
        });
        assert!(matches!(too_long, Err(GateError::Validation(_))));
    }

    #[test]
    fn load_save_roundtrip_and_corrupt_recovery() {
        let store = MemoryStore::new();
        assert_eq!(Settings::load(&store), Settings::default());

        let mut s = Settings::default();
        s.theme_mode = ThemeMode::Light;
        s.save(&store).unwrap();
        assert_eq!(Settings::load(&store), s);

        store.set(keys::SETTINGS, "{not json").unwrap();
        assert_eq!(Settings::load(&store), Settings::default());

        store
            .set(keys::SETTINGS, r#"{"lockScreenTimeoutSecs":99999}"#)
            .unwrap();
        assert_eq!(Settings::load(&store), Settings::default());
    }

    #[test]
    fn unknown_enum_values_are_rejected() {
        assert!(serde_json::from_str::<Language>(r#""fr""#).is_err());
        assert_eq!(
            serde_json::from_str::<ThemeMode>(r#""system""#).unwrap(),
            ThemeMode::System
        );
    }
}
