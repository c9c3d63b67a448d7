//! Command dispatch. Each submodule owns one area of the protocol.
//!
//! Handlers return `Result<Value, ErrorResponse>`; [`dispatch`] wraps the
//! result into a [`Response`]. No handler holds a mutex guard across an
//! `.await`.

pub mod lock;
pub mod notifications;
pub mod security;
pub mod session;
pub mod settings;

use serde::Serialize;
use serde_json::Value;

use crate::auth_utils::ErrorResponse;
use crate::protocol::{Request, Response};
use crate::state::BridgeState;

/// Run one request to completion.
pub async fn dispatch(state: &BridgeState, request: Request) -> Response {
    let name = request.name();
    tracing::debug!(command = name, "dispatching");

    let result = match request {
        Request::GetState => session::get_state(state),
        Request::CompleteOnboarding => session::complete_onboarding(state),
        Request::SignIn(form) => session::sign_in(state, form).await,
        Request::SignUp(form) => session::sign_up(state, form).await,
        Request::SignOut => session::sign_out(state),
        Request::ResetToDefaults => session::reset_to_defaults(state),

        Request::Lifecycle { signal } => lock::lifecycle(state, signal),
        Request::RecordActivity => lock::record_activity(state),
        Request::LockNow => lock::lock_now(state),
        Request::UnlockWithPin { pin } => lock::unlock_with_pin(state, pin.expose()),
        Request::UnlockWithBiometric { prompt } => {
            lock::unlock_with_biometric(state, prompt).await
        }
        Request::TakeBiometricPrompt => lock::take_biometric_prompt(state),

        Request::SetPin { pin } => security::set_pin(state, pin.expose()),
        Request::ChangePin {
            current,
            new_pin,
            confirm,
        } => security::change_pin(state, current.expose(), new_pin.expose(), confirm.expose()),
        Request::ClearPin => security::clear_pin(state),
        Request::SetBiometricEnabled { enabled, prompt } => {
            security::set_biometric_enabled(state, enabled, prompt).await
        }
        Request::BiometricStatus => security::biometric_status(state),

        Request::GetSettings => settings::get_settings(state),
        Request::UpdateSettings(patch) => settings::update_settings(state, &patch),
        Request::SetLockScreen { enabled } => settings::set_lock_screen(state, enabled),
        Request::SetLockTimeout { secs } => settings::set_lock_timeout(state, secs),

        Request::ListNotifications => notifications::list(state),
        Request::AddNotification {
            title,
            body,
            kind,
            sender,
            action_url,
        } => notifications::add(state, &title, &body, kind, sender, action_url),
        Request::MarkNotificationRead { id } => notifications::mark_read(state, &id),
        Request::MarkAllNotificationsRead => notifications::mark_all_read(state),
        Request::DeleteNotification { id } => notifications::delete(state, &id),
        Request::ClearNotifications => notifications::clear_all(state),
    };

    match result {
        Ok(data) => Response::success(data),
        Err(error) => {
            tracing::info!(command = name, code = %error.code, "command failed");
            Response::failure(error)
        }
    }
}

/// Serialize a handler result.
pub(crate) fn to_data<T: Serialize>(value: &T) -> Result<Value, ErrorResponse> {
    serde_json::to_value(value).map_err(|e| {
        tracing::error!(error = %e, "response serialization failed");
        ErrorResponse::internal()
    })
}

/// Current gate snapshot as response data.
pub(crate) fn snapshot(state: &BridgeState) -> Result<Value, ErrorResponse> {
    let snap = state.lock_gate()?.snapshot();
    to_data(&snap)
}
