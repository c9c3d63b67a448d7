//! Structured error responses shared by all commands.

use latchkey_core::GateError;
use serde::Serialize;

/// Error body sent to the host.
///
/// `remaining_ms` is present only for `RATE_LIMITED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_ms: Option<u64>,
}

impl ErrorResponse {
    #[must_use]
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            remaining_ms: None,
        }
    }

    /// A request line that could not be parsed.
    #[must_use]
    pub fn bad_request(detail: &str) -> Self {
        Self::new("BAD_REQUEST", &format!("Malformed request: {detail}"))
    }

    /// Lock poisoning or a task that panicked.
    #[must_use]
    pub fn internal() -> Self {
        Self::new("INTERNAL", "Internal error. Please restart the app.")
    }
}

impl From<&GateError> for ErrorResponse {
    fn from(err: &GateError) -> Self {
        match err {
            GateError::Validation(msg) => Self::new("VALIDATION", msg),
            GateError::Unavailable => Self::new(
                "BIOMETRIC_UNAVAILABLE",
                "Biometric authentication is not available on this device.",
            ),
            GateError::AuthFailure(msg) => Self::new("AUTH_FAILED", msg),
            GateError::Storage(e) => {
                tracing::error!(error = %e, "secure store failure");
                Self::new("STORAGE", "Secure storage is unavailable. Please try again.")
            }
            GateError::RateLimited { remaining_ms } => {
                let secs = remaining_ms.saturating_add(999) / 1000;
                Self {
                    code: "RATE_LIMITED".into(),
                    message: format!("Too many attempts. Try again in {secs}s."),
                    remaining_ms: Some(*remaining_ms),
                }
            }
            GateError::InvalidTransition { .. } => Self::new("INVALID_STATE", &err.to_string()),
            GateError::NotLocked => Self::new("NOT_LOCKED", "The app is not locked."),
            GateError::Busy => Self::new("BUSY", "An unlock attempt is already in progress."),
            GateError::Crypto(e) => {
                tracing::error!(error = %e, "credential primitive failure");
                Self::internal()
            }
        }
    }
}

impl From<GateError> for ErrorResponse {
    fn from(err: GateError) -> Self {
        Self::from(&err)
    }
}

/// Format a structured error response as a JSON string.
#[must_use]
pub fn err_json(code: &str, message: &str) -> String {
    serde_json::to_string(&ErrorResponse::new(code, message))
        .unwrap_or_else(|_| message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use latchkey_core::{Phase, StoreError};

    #[test]
    fn err_json_produces_valid_json() {
        let json = err_json("VALIDATION", "PIN must be exactly 4 digits");
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["code"], "VALIDATION");
        assert_eq!(parsed["message"], "PIN must be exactly 4 digits");
        assert!(parsed.get("remainingMs").is_none());
    }

    #[test]
    fn rate_limited_rounds_seconds_up() {
        let resp = ErrorResponse::from(GateError::RateLimited { remaining_ms: 1001 });
        assert_eq!(resp.code, "RATE_LIMITED");
        assert_eq!(resp.message, "Too many attempts. Try again in 2s.");
        assert_eq!(resp.remaining_ms, Some(1001));

        let exact = ErrorResponse::from(GateError::RateLimited { remaining_ms: 5000 });
        assert_eq!(exact.message, "Too many attempts. Try again in 5s.");
    }

    #[test]
    fn rate_limited_shape() {
        let resp = ErrorResponse::from(GateError::RateLimited { remaining_ms: 30_000 });
        insta::assert_json_snapshot!(resp, @r###"
        {
          "code": "RATE_LIMITED",
          "message": "Too many attempts. Try again in 30s.",
          "remainingMs": 30000
        }
        "###);
    }

    #[test]
    fn storage_details_do_not_leak() {
        let resp = ErrorResponse::from(GateError::Storage(StoreError::Backend(
            "keychain set failed: /Users/alice/Library".into(),
        )));
        assert_eq!(resp.code, "STORAGE");
        assert!(!resp.message.contains("alice"));
    }

    #[test]
    fn invalid_transition_names_the_phase() {
        let resp = ErrorResponse::from(GateError::InvalidTransition {
            action: "sign in",
            phase: Phase::Locked,
        });
        assert_eq!(resp.code, "INVALID_STATE");
        assert_eq!(resp.message, "cannot sign in while locked");
    }

    #[test]
    fn every_variant_has_a_code() {
        let cases = [
            (GateError::Validation("x".into()), "VALIDATION"),
            (GateError::Unavailable, "BIOMETRIC_UNAVAILABLE"),
            (GateError::AuthFailure("x".into()), "AUTH_FAILED"),
            (GateError::NotLocked, "NOT_LOCKED"),
            (GateError::Busy, "BUSY"),
        ];
        for (err, code) in cases {
            assert_eq!(ErrorResponse::from(err).code, code);
        }
    }
}
