//! Notification ledger: newest-first records with an unread counter.
//!
//! [`NotificationLedger`] is pure in-memory state. [`NotificationCenter`]
//! wraps it and writes a snapshot to `notifications-storage` after every
//! mutation so the ledger survives restarts.

use std::collections::HashSet;
use std::sync::Arc;

use latchkey_crypto::generate_id;
use serde::{Deserialize, Serialize};

use crate::error::GateError;
use crate::store::{keys, load_json, save_json, SecureStore};

const TITLE_MAX: usize = 100;
const BODY_MAX: usize = 500;

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Message,
    System,
    Reminder,
    Update,
}

/// One notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: String,
    pub title: String,
    pub body: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Epoch milliseconds.
    #[serde(rename = "timestamp")]
    pub timestamp_ms: u64,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
}

impl NotificationRecord {
    /// Build an unread record with a fresh id.
    ///
    /// # Errors
    ///
    /// [`GateError::Validation`] if the title is empty or longer than 100
    /// characters, or the body is empty or longer than 500.
    pub fn compose(
        title: &str,
        body: &str,
        kind: NotificationKind,
        now_ms: u64,
    ) -> Result<Self, GateError> {
        Self::new(generate_id(), title, body, kind, now_ms)
    }

    /// Build an unread record with a caller-chosen id.
    ///
    /// # Errors
    ///
    /// Same rules as [`NotificationRecord::compose`], plus a non-empty id.
    pub fn new(
        id: impl Into<String>,
        title: &str,
        body: &str,
        kind: NotificationKind,
        now_ms: u64,
    ) -> Result<Self, GateError> {
        let id = id.into();
        if id.is_empty() {
            return Err(GateError::Validation("notification id is required".into()));
        }
        let title_len = title.chars().count();
        if title_len == 0 || title_len > TITLE_MAX {
            return Err(GateError::Validation(format!(
                "title must be 1 to {TITLE_MAX} characters"
            )));
        }
        let body_len = body.chars().count();
        if body_len == 0 || body_len > BODY_MAX {
            return Err(GateError::Validation(format!(
                "body must be 1 to {BODY_MAX} characters"
            )));
        }
        Ok(Self {
            id,
            title: title.to_owned(),
            body: body.to_owned(),
            kind,
            timestamp_ms: now_ms,
            read: false,
            sender: None,
            action_url: None,
        })
    }

    #[must_use]
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    #[must_use]
    pub fn with_action_url(mut self, url: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Serialized ledger state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub notifications: Vec<NotificationRecord>,
    #[serde(default)]
    pub unread_count: usize,
}

/// Ordered notifications, newest first.
///
/// `unread_count()` equals the number of unread records after every
/// mutation.
#[derive(Debug, Clone, Default)]
pub struct NotificationLedger {
    records: Vec<NotificationRecord>,
    unread: usize,
}

impl NotificationLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a snapshot. The stored count is ignored and recomputed.
    ///
    /// Ids stay unique: when a snapshot repeats an id, the first (newest)
    /// record wins and later copies are dropped.
    #[must_use]
    pub fn restore(snapshot: LedgerSnapshot) -> Self {
        let mut seen = HashSet::with_capacity(snapshot.notifications.len());
        let mut records = snapshot.notifications;
        let before = records.len();
        records.retain(|r| seen.insert(r.id.clone()));
        if records.len() != before {
            tracing::warn!(
                dropped = before.saturating_sub(records.len()),
                "notification snapshot repeated ids; kept the newest"
            );
        }
        let mut ledger = Self {
            records,
            unread: 0,
        };
        ledger.recount();
        ledger
    }

    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            notifications: self.records.clone(),
            unread_count: self.unread,
        }
    }

    /// Prepend a record. A record with the same id is replaced.
    pub fn add(&mut self, record: NotificationRecord) {
        self.records.retain(|r| r.id != record.id);
        self.records.insert(0, record);
        self.recount();
    }

    /// Mark one record read. Returns whether a record changed.
    pub fn mark_read(&mut self, id: &str) -> bool {
        let changed = match self.records.iter_mut().find(|r| r.id == id && !r.read) {
            Some(r) => {
                r.read = true;
                true
            }
            None => false,
        };
        self.recount();
        changed
    }

    /// Mark every record read.
    pub fn mark_all_read(&mut self) {
        for r in &mut self.records {
            r.read = true;
        }
        self.recount();
    }

    /// Remove one record. Returns whether it existed.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        self.recount();
        self.records.len() != before
    }

    pub fn clear_all(&mut self) {
        self.records.clear();
        self.recount();
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&NotificationRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Records, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &NotificationRecord> {
        self.records.iter()
    }

    /// Unread records, newest first.
    pub fn unread(&self) -> impl Iterator<Item = &NotificationRecord> {
        self.records.iter().filter(|r| !r.read)
    }

    #[must_use]
    pub const fn unread_count(&self) -> usize {
        self.unread
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn recount(&mut self) {
        self.unread = self.records.iter().filter(|r| !r.read).count();
    }
}

// ---------------------------------------------------------------------------
// Center (persisted ledger)
// ---------------------------------------------------------------------------

/// Ledger plus persistence. Write failures are logged; the in-memory
/// ledger stays authoritative for the running process.
pub struct NotificationCenter {
    ledger: NotificationLedger,
    store: Arc<dyn SecureStore>,
}

impl std::fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationCenter")
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl NotificationCenter {
    /// Restore from `notifications-storage`. Unreadable snapshots start an
    /// empty ledger.
    #[must_use]
    pub fn load(store: Arc<dyn SecureStore>) -> Self {
        let ledger = match load_json::<LedgerSnapshot>(store.as_ref(), keys::NOTIFICATIONS) {
            Ok(Some(snapshot)) => NotificationLedger::restore(snapshot),
            Ok(None) => NotificationLedger::new(),
            Err(e) => {
                tracing::warn!(error = %e, "notification snapshot unreadable, starting empty");
                NotificationLedger::new()
            }
        };
        tracing::debug!(count = ledger.len(), unread = ledger.unread_count(), "notifications restored");
        Self { ledger, store }
    }

    #[must_use]
    pub const fn ledger(&self) -> &NotificationLedger {
        &self.ledger
    }

    pub fn add(&mut self, record: NotificationRecord) {
        self.ledger.add(record);
        self.persist();
    }

    pub fn mark_read(&mut self, id: &str) -> bool {
        let changed = self.ledger.mark_read(id);
        if changed {
            self.persist();
        }
        changed
    }

    pub fn mark_all_read(&mut self) {
        self.ledger.mark_all_read();
        self.persist();
    }

    pub fn delete(&mut self, id: &str) -> bool {
        let removed = self.ledger.delete(id);
        if removed {
            self.persist();
        }
        removed
    }

    pub fn clear_all(&mut self) {
        self.ledger.clear_all();
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = save_json(self.store.as_ref(), keys::NOTIFICATIONS, &self.ledger.snapshot()) {
            tracing::warn!(error = %e, "failed to persist notifications");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn rec(id: &str) -> NotificationRecord {
        NotificationRecord::new(id, "Title", "Body", NotificationKind::Message, 0).unwrap()
    }

    #[test]
    fn newest_first_and_unread_drops_by_one() {
        let mut l = NotificationLedger::new();
        l.add(rec("a"));
        l.add(rec("b"));
        l.add(rec("c"));
        let ids: Vec<&str> = l.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["c", "b", "a"]);
        assert_eq!(l.unread_count(), 3);

        assert!(l.mark_read("b"));
        assert_eq!(l.unread_count(), 2);
        assert!(!l.mark_read("b"));
        assert_eq!(l.unread_count(), 2);
    }

    #[test]
    fn unknown_ids_are_no_ops() {
        let mut l = NotificationLedger::new();
        l.add(rec("a"));
        assert!(!l.mark_read("zzz"));
        assert!(!l.delete("zzz"));
        assert_eq!(l.len(), 1);
        assert_eq!(l.unread_count(), 1);
    }

    #[test]
    fn mark_all_read_is_idempotent() {
        let mut l = NotificationLedger::new();
        l.add(rec("a"));
        l.add(rec("b"));
        l.mark_all_read();
        assert_eq!(l.unread_count(), 0);
        l.mark_all_read();
        assert_eq!(l.unread_count(), 0);
        assert_eq!(l.unread().count(), 0);
    }

    #[test]
    fn delete_and_clear() {
        let mut l = NotificationLedger::new();
        l.add(rec("a"));
        l.add(rec("b"));
        assert!(l.delete("a"));
        assert_eq!(l.unread_count(), 1);
        assert!(l.get("a").is_none());
        l.clear_all();
        assert!(l.is_empty());
        assert_eq!(l.unread_count(), 0);
    }

    #[test]
    fn duplicate_id_replaces_previous() {
        let mut l = NotificationLedger::new();
        l.add(rec("a"));
        l.add(rec("b"));
        l.add(rec("a"));
        let ids: Vec<&str> = l.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(l.unread_count(), 2);
    }

    #[test]
    fn restore_recounts() {
        let mut r = rec("a");
        r.read = true;
        let l = NotificationLedger::restore(LedgerSnapshot {
            notifications: vec![r, rec("b")],
            unread_count: 99,
        });
        assert_eq!(l.unread_count(), 1);
    }

    #[test]
    fn restore_keeps_first_of_repeated_ids() {
        let mut older = rec("a");
        older.title = "older".into();
        older.read = true;
        let mut l = NotificationLedger::restore(LedgerSnapshot {
            notifications: vec![rec("a"), rec("b"), older, rec("b")],
            unread_count: 4,
        });
        let ids: Vec<&str> = l.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(l.get("a").unwrap().title, "Title");
        assert_eq!(l.unread_count(), 2);

        assert!(l.delete("a"));
        assert!(l.get("a").is_none());
    }

    #[test]
    fn compose_validates_lengths() {
        assert!(NotificationRecord::compose("", "b", NotificationKind::System, 0).is_err());
        assert!(NotificationRecord::compose("t", "", NotificationKind::System, 0).is_err());
        assert!(
            NotificationRecord::compose(&"x".repeat(101), "b", NotificationKind::System, 0)
                .is_err()
        );
        assert!(
            NotificationRecord::compose("t", &"x".repeat(501), NotificationKind::System, 0)
                .is_err()
        );
        let r = NotificationRecord::compose("t", "b", NotificationKind::Reminder, 5).unwrap();
        assert_eq!(r.id.len(), 36);
        assert!(!r.read);
    }

    #[test]
    fn record_wire_shape() {
        let r = rec("n1").with_sender("ops");
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["timestamp"], 0);
        assert_eq!(json["sender"], "ops");
        assert!(json.get("actionUrl").is_none());
    }

    #[test]
    fn center_persists_across_reload() {
        let store: Arc<dyn SecureStore> = Arc::new(MemoryStore::new());
        {
            let mut c = NotificationCenter::load(store.clone());
            c.add(rec("a"));
            c.add(rec("b"));
            c.mark_read("a");
        }
        let c = NotificationCenter::load(store.clone());
        let ids: Vec<&str> = c.ledger().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
        assert_eq!(c.ledger().unread_count(), 1);
    }

    #[test]
    fn center_ignores_corrupt_snapshot() {
        let store: Arc<dyn SecureStore> = Arc::new(MemoryStore::new());
        store.set(keys::NOTIFICATIONS, "[[[").unwrap();
        let c = NotificationCenter::load(store);
        assert!(c.ledger().is_empty());
    }
}
