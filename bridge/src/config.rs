//! Process configuration: command-line flags with environment fallbacks.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

/// Default deadline for a biometric prompt.
pub const DEFAULT_BIOMETRIC_TIMEOUT_SECS: u64 = 30;

/// Default period of the auto-lock check.
pub const DEFAULT_AUTO_LOCK_INTERVAL_SECS: u64 = 10;

/// Which secure store backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// AES-256-GCM sealed file in the data directory (0600).
    File,
    /// In-process map; nothing survives a restart.
    Memory,
    /// macOS login keychain.
    Keychain,
}

/// Which biometric authenticator to install.
///
/// The headless variants can only be picked on the command line in debug
/// builds; release builds refuse `accept` and `reject`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BiometricBackend {
    /// The platform sensor when one exists, otherwise none.
    Platform,
    /// No biometric hardware.
    None,
    /// Headless: every prompt succeeds.
    #[cfg_attr(not(debug_assertions), value(skip))]
    Accept,
    /// Headless: every prompt is refused.
    #[cfg_attr(not(debug_assertions), value(skip))]
    Reject,
}

/// Which account directory validates sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AccountsBackend {
    /// Built-in demo accounts.
    Demo,
    /// Accounts registered on this device.
    Local,
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "latchkey",
    version,
    about = "App-lock and authentication gate driven over JSON lines on stdin/stdout"
)]
pub struct BridgeConfig {
    /// Directory for the secure store file and logs
    #[arg(long, env = "LATCHKEY_DATA_DIR", default_value = ".latchkey")]
    pub data_dir: PathBuf,

    /// Secure store backend
    #[arg(long, env = "LATCHKEY_STORE", value_enum, default_value_t = StoreBackend::File)]
    pub store: StoreBackend,

    /// Biometric authenticator
    #[arg(long, env = "LATCHKEY_BIOMETRIC", value_enum, default_value_t = BiometricBackend::Platform)]
    pub biometric: BiometricBackend,

    /// Seconds before an unanswered biometric prompt counts as a rejection
    #[arg(long, env = "LATCHKEY_BIOMETRIC_TIMEOUT_SECS", default_value_t = DEFAULT_BIOMETRIC_TIMEOUT_SECS)]
    pub biometric_timeout_secs: u64,

    /// Seconds between auto-lock checks (0 disables the scheduler)
    #[arg(long, env = "LATCHKEY_AUTO_LOCK_INTERVAL_SECS", default_value_t = DEFAULT_AUTO_LOCK_INTERVAL_SECS)]
    pub auto_lock_interval_secs: u64,

    /// Account directory used by signIn / signUp
    #[arg(long, env = "LATCHKEY_ACCOUNTS", value_enum, default_value_t = AccountsBackend::Demo)]
    pub accounts: AccountsBackend,

    /// Log directory (defaults to <data-dir>/logs)
    #[arg(long, env = "LATCHKEY_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl BridgeConfig {
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("logs"))
    }

    #[must_use]
    pub const fn biometric_timeout(&self) -> Duration {
        Duration::from_secs(self.biometric_timeout_secs)
    }

    /// `None` when the scheduler is disabled.
    #[must_use]
    pub const fn auto_lock_interval(&self) -> Option<Duration> {
        if self.auto_lock_interval_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.auto_lock_interval_secs))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BridgeConfig::try_parse_from(["latchkey"]).unwrap();
        assert_eq!(config.store, StoreBackend::File);
        assert_eq!(config.biometric, BiometricBackend::Platform);
        assert_eq!(config.accounts, AccountsBackend::Demo);
        assert_eq!(config.biometric_timeout(), Duration::from_secs(30));
        assert_eq!(config.auto_lock_interval(), Some(Duration::from_secs(10)));
        assert_eq!(config.log_dir(), PathBuf::from(".latchkey").join("logs"));
    }

    #[test]
    fn flags_override_defaults() {
        let config = BridgeConfig::try_parse_from([
            "latchkey",
            "--data-dir",
            "/tmp/lk",
            "--store",
            "memory",
            "--biometric",
            "none",
            "--accounts",
            "local",
            "--auto-lock-interval-secs",
            "0",
            "--log-dir",
            "/tmp/lk-logs",
        ])
        .unwrap();
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.biometric, BiometricBackend::None);
        assert_eq!(config.accounts, AccountsBackend::Local);
        assert_eq!(config.auto_lock_interval(), None);
        assert_eq!(config.log_dir(), PathBuf::from("/tmp/lk-logs"));
    }

    #[test]
    fn headless_biometrics_need_a_debug_build() {
        for value in ["accept", "reject"] {
            let parsed = BridgeConfig::try_parse_from(["latchkey", "--biometric", value]);
            assert_eq!(parsed.is_ok(), cfg!(debug_assertions), "--biometric {value}");
        }
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(BridgeConfig::try_parse_from(["latchkey", "--store", "cloud"]).is_err());
    }
}
