//! Lifecycle signals, manual lock and the two unlock paths.

use std::sync::Arc;
use std::time::Duration;

use latchkey_core::{
    BiometricAuthenticator, BiometricError, GateSnapshot, LifecycleOutcome, LifecycleSignal,
    UnlockOutcome,
};
use serde::Serialize;
use serde_json::{json, Value};

use super::{snapshot, to_data};
use crate::auth_utils::ErrorResponse;
use crate::protocol::DEFAULT_UNLOCK_PROMPT;
use crate::state::BridgeState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LifecycleReply {
    outcome: LifecycleOutcome,
    state: GateSnapshot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UnlockReply {
    outcome: UnlockOutcome,
    state: GateSnapshot,
}

pub fn lifecycle(state: &BridgeState, signal: LifecycleSignal) -> Result<Value, ErrorResponse> {
    let reply = {
        let mut gate = state.lock_gate()?;
        let outcome = gate.handle_lifecycle(signal);
        LifecycleReply {
            outcome,
            state: gate.snapshot(),
        }
    };
    to_data(&reply)
}

pub fn record_activity(state: &BridgeState) -> Result<Value, ErrorResponse> {
    state.lock_gate()?.record_activity();
    Ok(Value::Null)
}

pub fn lock_now(state: &BridgeState) -> Result<Value, ErrorResponse> {
    state.lock_gate()?.lock_now()?;
    snapshot(state)
}

pub fn unlock_with_pin(state: &BridgeState, pin: &str) -> Result<Value, ErrorResponse> {
    let reply = {
        let mut gate = state.lock_gate()?;
        let outcome = gate.unlock_with_pin(pin)?;
        UnlockReply {
            outcome,
            state: gate.snapshot(),
        }
    };
    to_data(&reply)
}

/// Claim the unlock slot, prompt off the runtime with a deadline, then
/// report the answer. The gate mutex is released while the prompt is open;
/// an overlapping attempt gets `BUSY`.
///
/// If the mutex is poisoned while the prompt is open, the ticket is never
/// finished. That is unobservable: [`BridgeState::lock_gate`] answers
/// `INTERNAL` to every later command.
pub async fn unlock_with_biometric(
    state: &BridgeState,
    prompt: Option<String>,
) -> Result<Value, ErrorResponse> {
    let ticket = state.lock_gate()?.begin_biometric_unlock()?;

    let prompt = prompt.unwrap_or_else(|| DEFAULT_UNLOCK_PROMPT.to_owned());
    let answer = run_prompt(
        Arc::clone(&state.biometrics),
        prompt,
        state.biometric_timeout,
    )
    .await;

    let reply = {
        let mut gate = state.lock_gate()?;
        let outcome = gate.finish_biometric_unlock(ticket, answer)?;
        UnlockReply {
            outcome,
            state: gate.snapshot(),
        }
    };
    to_data(&reply)
}

pub fn take_biometric_prompt(state: &BridgeState) -> Result<Value, ErrorResponse> {
    let prompt = state.lock_gate()?.take_biometric_prompt();
    Ok(json!({ "prompt": prompt }))
}

/// Show one biometric prompt on the blocking pool.
///
/// A prompt still open after `deadline` counts as
/// [`BiometricError::TimedOut`]; the platform call is left to finish on its
/// own and its answer is dropped.
pub(crate) async fn run_prompt(
    auth: Arc<dyn BiometricAuthenticator>,
    prompt: String,
    deadline: Duration,
) -> Result<(), BiometricError> {
    let task = tokio::task::spawn_blocking(move || auth.authenticate(&prompt));
    match tokio::time::timeout(deadline, task).await {
        Ok(Ok(answer)) => answer,
        Ok(Err(e)) => Err(BiometricError::PlatformError(format!(
            "biometric task failed: {e}"
        ))),
        Err(_) => {
            tracing::warn!(deadline_secs = deadline.as_secs(), "biometric prompt timed out");
            Err(BiometricError::TimedOut)
        }
    }
}
