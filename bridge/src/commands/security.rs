//! PIN and biometric enrolment.

use std::sync::Arc;

use latchkey_core::{BiometricKind, BiometricVerification, GateError, Phase};
use serde::Serialize;
use serde_json::Value;

use super::lock::run_prompt;
use super::{snapshot, to_data};
use crate::auth_utils::ErrorResponse;
use crate::protocol::DEFAULT_ENROL_PROMPT;
use crate::state::BridgeState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BiometricStatus {
    available: bool,
    enabled: bool,
    provider: &'static str,
    kinds: Vec<BiometricKind>,
}

pub fn set_pin(state: &BridgeState, pin: &str) -> Result<Value, ErrorResponse> {
    state.lock_gate()?.set_pin(pin)?;
    snapshot(state)
}

pub fn change_pin(
    state: &BridgeState,
    current: &str,
    new_pin: &str,
    confirm: &str,
) -> Result<Value, ErrorResponse> {
    state.lock_gate()?.change_pin(current, new_pin, confirm)?;
    snapshot(state)
}

pub fn clear_pin(state: &BridgeState) -> Result<Value, ErrorResponse> {
    state.lock_gate()?.clear_pin()?;
    snapshot(state)
}

/// Enabling needs one successful prompt, run with the same deadline as an
/// unlock. Disabling never prompts.
pub async fn set_biometric_enabled(
    state: &BridgeState,
    enabled: bool,
    prompt: Option<String>,
) -> Result<Value, ErrorResponse> {
    if !enabled {
        state.lock_gate()?.set_biometric_enabled(false, "")?;
        return snapshot(state);
    }

    let phase = state.lock_gate()?.phase();
    if phase == Phase::Locked {
        return Err(GateError::InvalidTransition {
            action: "change biometric unlock",
            phase,
        }
        .into());
    }
    if !state.biometrics.is_available() {
        return Err(GateError::Unavailable.into());
    }

    let prompt = prompt.unwrap_or_else(|| DEFAULT_ENROL_PROMPT.to_owned());
    let answer = run_prompt(
        Arc::clone(&state.biometrics),
        prompt,
        state.biometric_timeout,
    )
    .await;
    let proof = BiometricVerification::from_prompt(answer)?;

    state.lock_gate()?.enable_biometric_with(&proof)?;
    snapshot(state)
}

pub fn biometric_status(state: &BridgeState) -> Result<Value, ErrorResponse> {
    let enabled = state.lock_gate()?.vault().is_biometric_enabled();
    let status = BiometricStatus {
        available: state.biometrics.is_available(),
        enabled,
        provider: state.biometrics.provider_name(),
        kinds: state.biometrics.kinds(),
    };
    to_data(&status)
}
