// Integration tests for the snapshot history.
//
// These tests exercise the undo buffer the way the engine drives it:
// one push per committed batch, one pop per undo request.

use chrono::{DateTime, Duration, TimeZone, Utc};

use patchpad_mod_history::{HistoryConfig, UndoBuffer};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

#[test]
fn test_batches_undo_in_reverse_order() {
    let mut buf = UndoBuffer::new(HistoryConfig::default());
    let mut doc = String::from("v0");

    for i in 1..=10 {
        buf.push(doc.clone(), base() + Duration::seconds(i));
        doc = format!("v{i}");
    }

    for i in (0..10).rev() {
        let snap = buf.pop().unwrap();
        assert_eq!(snap.text, format!("v{i}"));
        doc = snap.text;
    }
    assert_eq!(doc, "v0");
    assert!(buf.pop().is_none());
}

#[test]
fn test_overflow_keeps_newest_capacity_snapshots() {
    let mut buf = UndoBuffer::new(HistoryConfig::with_capacity(5));
    for i in 0..12 {
        buf.push(format!("s{i}"), base() + Duration::seconds(i));
    }

    assert_eq!(buf.len(), 5);
    let mut popped = Vec::new();
    while let Some(snap) = buf.pop() {
        popped.push(snap.text);
    }
    assert_eq!(popped, vec!["s11", "s10", "s9", "s8", "s7"]);
}

#[test]
fn test_timestamps_preserved() {
    let mut buf = UndoBuffer::default();
    let ts = base() + Duration::minutes(3);
    buf.push("text", ts);
    assert_eq!(buf.peek().unwrap().timestamp, ts);
}
