//! JSON-lines wire format.
//!
//! One request object per input line, tagged by `command`; one response
//! object per output line.

use latchkey_core::{LifecycleSignal, NotificationKind, SettingsPatch, SignInRequest, SignUpRequest};
use latchkey_crypto::SecretText;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth_utils::ErrorResponse;

/// Prompt shown when a request does not supply one.
pub const DEFAULT_UNLOCK_PROMPT: &str = "Unlock the app";
pub const DEFAULT_ENROL_PROMPT: &str = "Confirm to enable biometric unlock";

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    // ── Session ──
    GetState,
    CompleteOnboarding,
    SignIn(SignInRequest),
    SignUp(SignUpRequest),
    SignOut,
    ResetToDefaults,

    // ── Lock ──
    Lifecycle {
        signal: LifecycleSignal,
    },
    RecordActivity,
    LockNow,
    UnlockWithPin {
        pin: SecretText,
    },
    UnlockWithBiometric {
        #[serde(default)]
        prompt: Option<String>,
    },
    TakeBiometricPrompt,

    // ── Security ──
    SetPin {
        pin: SecretText,
    },
    ChangePin {
        current: SecretText,
        new_pin: SecretText,
        confirm: SecretText,
    },
    ClearPin,
    SetBiometricEnabled {
        enabled: bool,
        #[serde(default)]
        prompt: Option<String>,
    },
    BiometricStatus,

    // ── Settings ──
    GetSettings,
    UpdateSettings(SettingsPatch),
    SetLockScreen {
        enabled: bool,
    },
    SetLockTimeout {
        secs: u64,
    },

    // ── Notifications ──
    ListNotifications,
    AddNotification {
        title: String,
        body: String,
        #[serde(rename = "type")]
        kind: NotificationKind,
        #[serde(default)]
        sender: Option<String>,
        #[serde(default)]
        action_url: Option<String>,
    },
    MarkNotificationRead {
        id: String,
    },
    MarkAllNotificationsRead,
    DeleteNotification {
        id: String,
    },
    ClearNotifications,
}

impl Request {
    /// Command name for logs. Never includes arguments.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GetState => "getState",
            Self::CompleteOnboarding => "completeOnboarding",
            Self::SignIn(_) => "signIn",
            Self::SignUp(_) => "signUp",
            Self::SignOut => "signOut",
            Self::ResetToDefaults => "resetToDefaults",
            Self::Lifecycle { .. } => "lifecycle",
            Self::RecordActivity => "recordActivity",
            Self::LockNow => "lockNow",
            Self::UnlockWithPin { .. } => "unlockWithPin",
            Self::UnlockWithBiometric { .. } => "unlockWithBiometric",
            Self::TakeBiometricPrompt => "takeBiometricPrompt",
            Self::SetPin { .. } => "setPin",
            Self::ChangePin { .. } => "changePin",
            Self::ClearPin => "clearPin",
            Self::SetBiometricEnabled { .. } => "setBiometricEnabled",
            Self::BiometricStatus => "biometricStatus",
            Self::GetSettings => "getSettings",
            Self::UpdateSettings(_) => "updateSettings",
            Self::SetLockScreen { .. } => "setLockScreen",
            Self::SetLockTimeout { .. } => "setLockTimeout",
            Self::ListNotifications => "listNotifications",
            Self::AddNotification { .. } => "addNotification",
            Self::MarkNotificationRead { .. } => "markNotificationRead",
            Self::MarkAllNotificationsRead => "markAllNotificationsRead",
            Self::DeleteNotification { .. } => "deleteNotification",
            Self::ClearNotifications => "clearNotifications",
        }
    }
}

/// One response line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

impl Response {
    #[must_use]
    pub const fn success(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    #[must_use]
    pub const fn failure(error: ErrorResponse) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error),
        }
    }

    /// Serialize to a single line (no trailing newline).
    #[must_use]
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"ok":false,"error":{"code":"INTERNAL","message":"Internal error. Please restart the app."}}"#
                .to_owned()
        })
    }
}

/// Parse one input line.
///
/// # Errors
///
/// Returns a `BAD_REQUEST` error body for invalid JSON, an unknown command
/// or missing arguments.
pub fn parse_request(line: &str) -> Result<Request, ErrorResponse> {
    serde_json::from_str(line).map_err(|e| {
        // serde_json messages can echo input; keep only the position.
        ErrorResponse::bad_request(&format!("line {} column {}", e.line(), e.column()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_unit_commands() {
        assert!(matches!(parse_request(r#"{"command":"getState"}"#), Ok(Request::GetState)));
        assert!(matches!(parse_request(r#"{"command":"lockNow"}"#), Ok(Request::LockNow)));
    }

    #[test]
    fn parses_sign_in_form() {
        let req = parse_request(
            r#"{"command":"signIn","email":"vip@example.com","password":"vip123","rememberMe":true}"#,
        )
        .unwrap();
        let Request::SignIn(form) = req else {
            panic!("expected signIn");
        };
        assert_eq!(form.email, "vip@example.com");
        assert_eq!(form.password.expose(), "vip123");
        assert!(form.remember_me);
    }

    #[test]
    fn parses_change_pin_in_camel_case() {
        let req = parse_request(
            r#"{"command":"changePin","current":"1234","newPin":"5678","confirm":"5678"}"#,
        )
        .unwrap();
        let Request::ChangePin { new_pin, .. } = req else {
            panic!("expected changePin");
        };
        assert_eq!(new_pin.expose(), "5678");
    }

    #[test]
    fn parses_lifecycle_alias() {
        let req = parse_request(r#"{"command":"lifecycle","signal":"active"}"#).unwrap();
        assert!(matches!(
            req,
            Request::Lifecycle {
                signal: LifecycleSignal::Foreground
            }
        ));
    }

    #[test]
    fn parses_settings_patch() {
        let req = parse_request(
            r#"{"command":"updateSettings","themeMode":"dark","lockScreenTimeoutSecs":60}"#,
        )
        .unwrap();
        let Request::UpdateSettings(patch) = req else {
            panic!("expected updateSettings");
        };
        assert_eq!(patch.lock_screen_timeout_secs, Some(60));
        assert_eq!(patch.lock_screen, None);
    }

    #[test]
    fn parses_notification_with_type_field() {
        let req = parse_request(
            r#"{"command":"addNotification","title":"Hi","body":"There","type":"system","actionUrl":"/inbox"}"#,
        )
        .unwrap();
        let Request::AddNotification { kind, action_url, .. } = req else {
            panic!("expected addNotification");
        };
        assert_eq!(kind, NotificationKind::System);
        assert_eq!(action_url.as_deref(), Some("/inbox"));
    }

    #[test]
    fn unknown_command_is_bad_request() {
        let err = parse_request(r#"{"command":"selfDestruct"}"#).unwrap_err();
        assert_eq!(err.code, "BAD_REQUEST");
    }

    #[test]
    fn bad_request_does_not_echo_secrets() {
        let err = parse_request(r#"{"command":"unlockWithPin","pin":1234}"#).unwrap_err();
        assert_eq!(err.code, "BAD_REQUEST");
        assert!(!err.message.contains("1234"));
    }

    #[test]
    fn pin_is_masked_in_debug() {
        let req = parse_request(r#"{"command":"unlockWithPin","pin":"4321"}"#).unwrap();
        assert!(!format!("{req:?}").contains("4321"));
        assert_eq!(req.name(), "unlockWithPin");
    }

    #[test]
    fn response_shapes() {
        let ok = Response::success(json!({"phase": "locked"}));
        insta::assert_json_snapshot!(ok, @r###"
        {
          "ok": true,
          "data": {
            "phase": "locked"
          }
        }
        "###);

        let err = Response::failure(ErrorResponse::new("NOT_LOCKED", "The app is not locked."));
        insta::assert_json_snapshot!(err, @r###"
        {
          "ok": false,
          "error": {
            "code": "NOT_LOCKED",
            "message": "The app is not locked."
          }
        }
        "###);
    }

    #[test]
    fn to_line_is_single_line() {
        let line = Response::success(json!({"a": [1, 2]})).to_line();
        assert!(!line.contains('\n'));
        assert_eq!(line, r#"{"ok":true,"data":{"a":[1,2]}}"#);
    }
}
