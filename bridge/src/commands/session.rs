//! Onboarding, sign-in/out and factory reset.

use latchkey_core::{Account, GateSnapshot, SignInRequest, SignUpRequest};
use serde::Serialize;
use serde_json::Value;

use super::{snapshot, to_data};
use crate::auth_utils::ErrorResponse;
use crate::state::BridgeState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignedIn {
    account: Account,
    state: GateSnapshot,
}

pub fn get_state(state: &BridgeState) -> Result<Value, ErrorResponse> {
    snapshot(state)
}

pub fn complete_onboarding(state: &BridgeState) -> Result<Value, ErrorResponse> {
    state.lock_gate()?.complete_onboarding()?;
    snapshot(state)
}

/// Password hashing can take a while with the local validator, so the
/// whole attempt runs on the blocking pool.
pub async fn sign_in(state: &BridgeState, form: SignInRequest) -> Result<Value, ErrorResponse> {
    let worker = state.clone();
    let result = tokio::task::spawn_blocking(move || -> Result<SignedIn, ErrorResponse> {
        let mut gate = worker.lock_gate()?;
        let account = gate.sign_in(&form, worker.validator.as_ref())?;
        Ok(SignedIn {
            account,
            state: gate.snapshot(),
        })
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "sign-in task failed");
        ErrorResponse::internal()
    })??;
    to_data(&result)
}

pub async fn sign_up(state: &BridgeState, form: SignUpRequest) -> Result<Value, ErrorResponse> {
    let worker = state.clone();
    let result = tokio::task::spawn_blocking(move || -> Result<SignedIn, ErrorResponse> {
        let mut gate = worker.lock_gate()?;
        let account = gate.sign_up(&form, worker.validator.as_ref())?;
        Ok(SignedIn {
            account,
            state: gate.snapshot(),
        })
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "sign-up task failed");
        ErrorResponse::internal()
    })??;
    to_data(&result)
}

pub fn sign_out(state: &BridgeState) -> Result<Value, ErrorResponse> {
    state.lock_gate()?.sign_out();
    snapshot(state)
}

/// Wipe credentials, session and settings, and empty the ledger.
pub fn reset_to_defaults(state: &BridgeState) -> Result<Value, ErrorResponse> {
    state.lock_gate()?.reset_to_defaults()?;
    state.lock_notifications()?.clear_all();
    snapshot(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::Harness;
    use latchkey_core::{keys, NotificationKind, NotificationRecord, SecureStore};

    fn vip() -> SignInRequest {
        SignInRequest {
            email: "VIP@example.com ".into(),
            password: "vip123".into(),
            remember_me: true,
        }
    }

    #[tokio::test]
    async fn sign_in_returns_account_and_unlocked_state() {
        let h = Harness::new();
        complete_onboarding(&h.state).unwrap();
        let data = sign_in(&h.state, vip()).await.unwrap();
        assert_eq!(data["account"]["id"], "vip-user-1");
        assert_eq!(data["account"]["isVip"], true);
        assert_eq!(data["state"]["phase"], "unlocked");
        assert_eq!(data["state"]["screen"], "home");
        assert!(h.store.get(keys::SESSION_TOKEN).unwrap().is_some());
    }

    #[tokio::test]
    async fn sign_in_before_onboarding_is_invalid_state() {
        let h = Harness::new();
        let err = sign_in(&h.state, vip()).await.unwrap_err();
        assert_eq!(err.code, "INVALID_STATE");
    }

    #[tokio::test]
    async fn malformed_email_is_a_validation_error() {
        let h = Harness::new();
        complete_onboarding(&h.state).unwrap();
        let form = SignInRequest {
            email: "not-an-email".into(),
            password: "secret1".into(),
            remember_me: false,
        };
        let err = sign_in(&h.state, form).await.unwrap_err();
        assert_eq!(err.code, "VALIDATION");
    }

    #[test]
    fn sign_out_keeps_onboarding() {
        let h = Harness::guarded();
        let data = sign_out(&h.state).unwrap();
        assert_eq!(data["phase"], "signedOut");
        assert_eq!(data["session"]["onboarded"], true);
        assert_eq!(data["hasPin"], true);
    }

    #[test]
    fn reset_clears_everything() {
        let h = Harness::guarded();
        h.state.lock_notifications().unwrap().add(
            NotificationRecord::compose("Hi", "There", NotificationKind::System, 1).unwrap(),
        );

        let data = reset_to_defaults(&h.state).unwrap();
        assert_eq!(data["phase"], "onboarding");
        assert_eq!(data["hasPin"], false);
        assert!(h.state.lock_notifications().unwrap().ledger().is_empty());
        assert_eq!(h.store.get(keys::PIN_CODE_HASH).unwrap(), None);
    }
}
