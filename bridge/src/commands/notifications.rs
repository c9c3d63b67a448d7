//! Notification ledger commands.

use latchkey_core::{GateError, NotificationCenter, NotificationKind, NotificationRecord, Phase};
use serde_json::{json, Value};

use super::to_data;
use crate::auth_utils::ErrorResponse;
use crate::state::BridgeState;

/// Run `f` on the ledger unless the lock screen is up.
///
/// The gate guard is held until `f` returns so a lock cannot land between
/// the check and the read.
fn with_ledger<T>(
    state: &BridgeState,
    action: &'static str,
    f: impl FnOnce(&mut NotificationCenter) -> T,
) -> Result<T, ErrorResponse> {
    let gate = state.lock_gate()?;
    let phase = gate.phase();
    if phase == Phase::Locked {
        return Err(GateError::InvalidTransition { action, phase }.into());
    }
    let mut center = state.lock_notifications()?;
    let out = f(&mut center);
    drop(center);
    drop(gate);
    Ok(out)
}

pub fn list(state: &BridgeState) -> Result<Value, ErrorResponse> {
    let snapshot = with_ledger(state, "list notifications", |c| c.ledger().snapshot())?;
    to_data(&snapshot)
}

/// Record a new notification. Allowed on the lock screen: the reply only
/// echoes what the caller sent.
pub fn add(
    state: &BridgeState,
    title: &str,
    body: &str,
    kind: NotificationKind,
    sender: Option<String>,
    action_url: Option<String>,
) -> Result<Value, ErrorResponse> {
    let mut record = NotificationRecord::compose(title, body, kind, state.clock.now_ms())?;
    if let Some(sender) = sender {
        record = record.with_sender(sender);
    }
    if let Some(url) = action_url {
        record = record.with_action_url(url);
    }
    let data = to_data(&record)?;
    state.lock_notifications()?.add(record);
    Ok(data)
}

pub fn mark_read(state: &BridgeState, id: &str) -> Result<Value, ErrorResponse> {
    with_ledger(state, "mark a notification read", |c| {
        let changed = c.mark_read(id);
        json!({ "changed": changed, "unreadCount": c.ledger().unread_count() })
    })
}

pub fn mark_all_read(state: &BridgeState) -> Result<Value, ErrorResponse> {
    let snapshot = with_ledger(state, "mark notifications read", |c| {
        c.mark_all_read();
        c.ledger().snapshot()
    })?;
    to_data(&snapshot)
}

pub fn delete(state: &BridgeState, id: &str) -> Result<Value, ErrorResponse> {
    with_ledger(state, "delete a notification", |c| {
        let removed = c.delete(id);
        json!({ "removed": removed, "unreadCount": c.ledger().unread_count() })
    })
}

pub fn clear_all(state: &BridgeState) -> Result<Value, ErrorResponse> {
    let snapshot = with_ledger(state, "clear notifications", |c| {
        c.clear_all();
        c.ledger().snapshot()
    })?;
    to_data(&snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{Harness, START_MS};
    use latchkey_core::{keys, SecureStore};

    fn add_one(h: &Harness, title: &str) -> String {
        let data = add(&h.state, title, "body", NotificationKind::Message, None, None).unwrap();
        data["id"].as_str().unwrap().to_owned()
    }

    #[test]
    fn add_stamps_clock_and_persists() {
        let h = Harness::new();
        let data = add(
            &h.state,
            "Welcome",
            "Thanks for joining",
            NotificationKind::System,
            Some("Team".into()),
            Some("/welcome".into()),
        )
        .unwrap();
        assert_eq!(data["timestamp"], START_MS);
        assert_eq!(data["type"], "system");
        assert_eq!(data["read"], false);
        assert_eq!(data["sender"], "Team");
        assert_eq!(data["actionUrl"], "/welcome");
        assert!(h.store.get(keys::NOTIFICATIONS).unwrap().is_some());
    }

    #[test]
    fn empty_title_is_rejected() {
        let h = Harness::new();
        let err = add(&h.state, "", "body", NotificationKind::Reminder, None, None).unwrap_err();
        assert_eq!(err.code, "VALIDATION");
    }

    #[test]
    fn newest_first_and_unread_count() {
        let h = Harness::new();
        let first = add_one(&h, "first");
        add_one(&h, "second");

        let data = list(&h.state).unwrap();
        assert_eq!(data["notifications"][0]["title"], "second");
        assert_eq!(data["unreadCount"], 2);

        let marked = mark_read(&h.state, &first).unwrap();
        assert_eq!(marked, json!({ "changed": true, "unreadCount": 1 }));
        let again = mark_read(&h.state, &first).unwrap();
        assert_eq!(again["changed"], false);
    }

    #[test]
    fn delete_and_clear() {
        let h = Harness::new();
        let id = add_one(&h, "one");
        add_one(&h, "two");

        assert_eq!(delete(&h.state, &id).unwrap()["removed"], true);
        assert_eq!(delete(&h.state, "missing").unwrap()["removed"], false);

        let data = mark_all_read(&h.state).unwrap();
        assert_eq!(data["unreadCount"], 0);

        let data = clear_all(&h.state).unwrap();
        assert_eq!(data["notifications"], json!([]));
    }

    #[test]
    fn lock_screen_hides_the_ledger() {
        let h = Harness::guarded();
        let id = add_one(&h, "Your code is 998877");
        h.state.lock_gate().unwrap().lock_now().unwrap();

        for err in [
            list(&h.state).unwrap_err(),
            mark_read(&h.state, &id).unwrap_err(),
            mark_all_read(&h.state).unwrap_err(),
            delete(&h.state, &id).unwrap_err(),
            clear_all(&h.state).unwrap_err(),
        ] {
            assert_eq!(err.code, "INVALID_STATE");
            assert!(!err.message.contains("998877"));
        }

        // Arrivals are still recorded and show up after unlock.
        add_one(&h, "second");
        h.state.lock_gate().unwrap().unlock_with_pin("1234").unwrap();
        let data = list(&h.state).unwrap();
        assert_eq!(data["unreadCount"], 2);
        assert_eq!(data["notifications"][1]["title"], "Your code is 998877");
    }
}
