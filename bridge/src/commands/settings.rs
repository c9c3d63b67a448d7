//! Settings blob commands. All writes go through the gate so the lock
//! fields stay mirrored.

use latchkey_core::SettingsPatch;
use serde_json::Value;

use super::to_data;
use crate::auth_utils::ErrorResponse;
use crate::state::BridgeState;

pub fn get_settings(state: &BridgeState) -> Result<Value, ErrorResponse> {
    let settings = state.lock_gate()?.settings().clone();
    to_data(&settings)
}

pub fn update_settings(state: &BridgeState, patch: &SettingsPatch) -> Result<Value, ErrorResponse> {
    let settings = state.lock_gate()?.update_settings(patch)?;
    to_data(&settings)
}

pub fn set_lock_screen(state: &BridgeState, enabled: bool) -> Result<Value, ErrorResponse> {
    state.lock_gate()?.set_lock_screen(enabled)?;
    get_settings(state)
}

pub fn set_lock_timeout(state: &BridgeState, secs: u64) -> Result<Value, ErrorResponse> {
    state.lock_gate()?.set_lock_timeout(secs)?;
    get_settings(state)
}
