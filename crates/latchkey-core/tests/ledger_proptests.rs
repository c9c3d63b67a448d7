#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

//! Property-based tests for the notification ledger counter invariant.

use latchkey_core::{NotificationKind, NotificationLedger, NotificationRecord};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Add(u8),
    MarkRead(u8),
    MarkAllRead,
    Delete(u8),
    ClearAll,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..16).prop_map(Op::Add),
        3 => (0u8..16).prop_map(Op::MarkRead),
        1 => Just(Op::MarkAllRead),
        2 => (0u8..16).prop_map(Op::Delete),
        1 => Just(Op::ClearAll),
    ]
}

fn record(n: u8) -> NotificationRecord {
    NotificationRecord::new(
        format!("n{n}"),
        "Title",
        "Body",
        NotificationKind::System,
        u64::from(n),
    )
    .unwrap()
}

proptest! {
    /// `unread_count` equals the number of unread records after every op.
    #[test]
    fn unread_count_matches_records(ops in prop::collection::vec(op(), 0..64)) {
        let mut ledger = NotificationLedger::new();
        for op in ops {
            match op {
                Op::Add(n) => ledger.add(record(n)),
                Op::MarkRead(n) => { ledger.mark_read(&format!("n{n}")); }
                Op::MarkAllRead => ledger.mark_all_read(),
                Op::Delete(n) => { ledger.delete(&format!("n{n}")); }
                Op::ClearAll => ledger.clear_all(),
            }
            let actual = ledger.iter().filter(|r| !r.read).count();
            prop_assert_eq!(ledger.unread_count(), actual);
            prop_assert_eq!(ledger.unread().count(), actual);
        }
    }

    /// Ids stay unique and the most recent add is always first.
    #[test]
    fn newest_first_and_unique(ids in prop::collection::vec(0u8..8, 1..32)) {
        let mut ledger = NotificationLedger::new();
        for &n in &ids {
            ledger.add(record(n));
            prop_assert_eq!(&ledger.iter().next().unwrap().id, &format!("n{n}"));
        }
        let mut seen: Vec<&str> = ledger.iter().map(|r| r.id.as_str()).collect();
        let total = seen.len();
        seen.sort_unstable();
        seen.dedup();
        prop_assert_eq!(seen.len(), total);
    }

    /// Marking an unread record drops the count by exactly one.
    #[test]
    fn mark_read_drops_count_by_one(count in 1u8..16, pick in 0u8..16) {
        let mut ledger = NotificationLedger::new();
        for n in 0..count {
            ledger.add(record(n));
        }
        let target = pick % count;
        let before = ledger.unread_count();
        let id = format!("n{target}");
        prop_assert!(ledger.mark_read(&id));
        prop_assert_eq!(ledger.unread_count(), before - 1);
    }

    /// Snapshots restore to an identical ledger.
    #[test]
    fn snapshot_restores(ids in prop::collection::vec(0u8..8, 0..16), read in 0u8..8) {
        let mut ledger = NotificationLedger::new();
        for &n in &ids {
            ledger.add(record(n));
        }
        ledger.mark_read(&format!("n{read}"));
        let back = NotificationLedger::restore(ledger.snapshot());
        prop_assert_eq!(back.snapshot(), ledger.snapshot());
    }
}
