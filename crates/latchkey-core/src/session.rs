//! Session and lock-state records owned by the gate.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::account::Account;

// ---------------------------------------------------------------------------
// Phase / Screen
// ---------------------------------------------------------------------------

/// Where the app is in the onboarding → sign-in → locked/unlocked flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// First launch; onboarding not completed.
    Onboarding,
    /// Onboarded, nobody signed in.
    SignedOut,
    /// Signed in, content visible.
    Unlocked,
    /// Signed in, lock screen shown.
    Locked,
}

impl Phase {
    /// Signed in, locked or not.
    #[must_use]
    pub const fn is_signed_in(self) -> bool {
        matches!(self, Self::Unlocked | Self::Locked)
    }

    /// Screen the host should present.
    #[must_use]
    pub const fn screen(self) -> Screen {
        match self {
            Self::Onboarding => Screen::Onboarding,
            Self::SignedOut => Screen::SignIn,
            Self::Unlocked => Screen::Home,
            Self::Locked => Screen::LockScreen,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Onboarding => "onboarding",
            Self::SignedOut => "signed out",
            Self::Unlocked => "unlocked",
            Self::Locked => "locked",
        })
    }
}

/// Top-level screen derived from the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Screen {
    Onboarding,
    SignIn,
    Home,
    LockScreen,
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// App lifecycle signal from the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleSignal {
    /// App visible and interactive.
    #[serde(alias = "active")]
    Foreground,
    /// App moved to the background.
    Background,
    /// Transitional state (app switcher, incoming call).
    Inactive,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Who is signed in. Persisted inside the `auth-store` blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub logged_in: bool,
    #[serde(default)]
    pub onboarded: bool,
    #[serde(default)]
    pub is_vip: bool,
    #[serde(default)]
    pub account: Option<Account>,
}

/// Lock bookkeeping.
///
/// `locked` implies a signed-in session. `lock_screen_enabled` and
/// `timeout_secs` mirror the settings blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockState {
    pub locked: bool,
    pub lock_screen_enabled: bool,
    pub timeout_secs: u64,
    pub last_active_at: Option<u64>,
}

/// The `auth-store` blob.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PersistedAuth {
    #[serde(default)]
    pub session: Session,
    #[serde(default)]
    pub locked: bool,
}

// ---------------------------------------------------------------------------
// Unlock
// ---------------------------------------------------------------------------

/// Credential used for an unlock attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UnlockMethod {
    Pin,
    Biometric,
}

/// Result of an unlock attempt that reached a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum UnlockOutcome {
    /// The gate is now unlocked.
    Unlocked,
    /// Wrong credential; still locked.
    #[serde(rename_all = "camelCase")]
    Rejected {
        method: UnlockMethod,
        /// Consecutive PIN failures (biometric rejections report the
        /// current PIN count unchanged).
        consecutive_failures: u32,
    },
}
