//! Integration tests for the undo flow
//!
//! Drives the stack through a mock record store and verifies inverse
//! dispatch, retry-after-failure, and the one-reversal-at-a-time rule.

use std::sync::Arc;

use serde_json::json;
use tokio_test::assert_ok;

use rewind::mock::{MockConfig, MockRecordStore, StoreCall};
use rewind::{FieldMap, RecordData, ReversibleActionStack, UndoError};

use super::init_tracing;

fn fields(pairs: &[(&str, serde_json::Value)]) -> FieldMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn task(id: &str, title: &str) -> RecordData {
    RecordData::new(id, fields(&[("title", json!(title))]))
}

/// Undoing a create with no explicit id deletes the created record and
/// leaves the pending list empty.
#[tokio::test]
async fn test_undo_create_deletes_record() {
    init_tracing();
    let store = Arc::new(MockRecordStore::new());
    let stack = ReversibleActionStack::new(store.clone());

    stack.record_create(task("t1", "Buy milk"));
    let undone = assert_ok!(stack.undo(None).await);

    assert_eq!(undone.record_id().as_str(), "t1");
    assert_eq!(undone.description, "Created task: Buy milk");
    assert!(stack.is_empty());
    assert_eq!(
        store.calls(),
        vec![StoreCall::Delete("t1".into())],
        "inverse of create is a delete by id"
    );
}

/// Undoing an update by action id restores exactly the overwritten fields.
#[tokio::test]
async fn test_undo_update_restores_previous_fields() {
    let store = Arc::new(MockRecordStore::new());
    let stack = ReversibleActionStack::new(store.clone());

    let previous = fields(&[("status", json!("Open"))]);
    let updated = RecordData::new(
        "t2",
        fields(&[("title", json!("File report")), ("status", json!("Done"))]),
    );
    let action = stack.record_update(previous.clone(), &updated);

    assert_ok!(stack.undo(Some(&action.id)).await);

    assert!(stack.is_empty());
    match store.last_call() {
        Some(StoreCall::Update { id, fields }) => {
            assert_eq!(id.as_str(), "t2");
            assert_eq!(fields, previous);
        }
        other => panic!("Expected Update call, got {other:?}"),
    }
}

/// Undoing a delete recreates the record, preserving the original id.
#[tokio::test]
async fn test_undo_delete_recreates_with_original_id() {
    let store = Arc::new(MockRecordStore::new());
    let stack = ReversibleActionStack::new(store.clone());

    let snapshot = RecordData::new(
        "t3",
        fields(&[("title", json!("Old task")), ("status", json!("Done"))]),
    );
    stack.record_delete(snapshot.clone());

    stack.undo(None).await.expect("undo should succeed");

    assert!(stack.is_empty());
    match store.last_call() {
        Some(StoreCall::Create(data)) => {
            assert_eq!(data.id.as_str(), "t3");
            assert_eq!(data, snapshot);
        }
        other => panic!("Expected Create call, got {other:?}"),
    }
}

/// A failed reversal keeps the action in the stack; a retry can succeed.
#[tokio::test]
async fn test_failed_undo_retains_action_for_retry() {
    let store = Arc::new(MockRecordStore::new().with_config(MockConfig::default().failing_once()));
    let stack = ReversibleActionStack::new(store.clone());

    let action = stack.record_create(task("t1", "Buy milk"));

    let err = stack.undo(None).await.unwrap_err();
    match err {
        UndoError::ReversalFailed { action: id, .. } => assert_eq!(id, action.id),
        other => panic!("Expected ReversalFailed, got {other:?}"),
    }
    assert_eq!(stack.len(), 1, "failed undo must not remove the action");
    assert!(!stack.is_reversing(), "flag must reset after failure");

    stack.undo(None).await.expect("retry should succeed");
    assert!(stack.is_empty());
    assert_eq!(store.call_count(), 2);
}

/// A second undo issued while one is in flight is rejected and does not
/// disturb the first.
#[tokio::test]
async fn test_concurrent_undo_is_rejected() {
    init_tracing();
    let (store, gate) = MockRecordStore::gated();
    let store = Arc::new(store);
    let stack = ReversibleActionStack::new(store.clone());

    stack.record_create(task("t1", "Buy milk"));

    let first = tokio::spawn({
        let stack = stack.clone();
        async move { stack.undo(None).await }
    });

    // Let the first undo reach the in-flight store call.
    tokio::task::yield_now().await;
    assert!(stack.is_reversing());

    let err = stack.undo(None).await.unwrap_err();
    assert!(matches!(err, UndoError::ReversalInProgress));

    gate.release();
    let undone = first.await.unwrap().expect("first undo should succeed");
    assert_eq!(undone.record_id().as_str(), "t1");
    assert!(stack.is_empty());
    assert!(!stack.is_reversing());
    assert_eq!(store.call_count(), 1, "the rejected undo never dispatched");
}

/// `undo(None)` targets the front at call time: a record racing in while
/// the reversal is awaited does not change the target.
#[tokio::test]
async fn test_undo_targets_front_at_call_time() {
    let (store, gate) = MockRecordStore::gated();
    let store = Arc::new(store);
    let stack = ReversibleActionStack::new(store.clone());

    stack.record_create(task("t1", "First"));

    let pending_undo = tokio::spawn({
        let stack = stack.clone();
        async move { stack.undo(None).await }
    });
    tokio::task::yield_now().await;

    // A new action lands at the front while the reversal is in flight.
    stack.record_create(task("t2", "Second"));

    gate.release();
    let undone = pending_undo.await.unwrap().expect("undo should succeed");

    assert_eq!(undone.record_id().as_str(), "t1");
    assert!(matches!(&store.calls()[0], StoreCall::Delete(id) if id.as_str() == "t1"));

    let pending = stack.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].record_id().as_str(), "t2");
}

/// An in-flight reversal tolerates its target being evicted underneath it:
/// the inverse call still settles and nothing panics or double-removes.
#[tokio::test]
async fn test_undo_tolerates_eviction_of_target() {
    let (store, gate) = MockRecordStore::gated();
    let store = Arc::new(store);
    let stack = ReversibleActionStack::new(store.clone());
    let mut events = stack.subscribe();

    let target = stack.record_create(task("t0", "Oldest"));

    let pending_undo = tokio::spawn({
        let stack = stack.clone();
        async move { stack.undo(None).await }
    });
    tokio::task::yield_now().await;

    // Ten more records overflow the stack and evict the undo target.
    for i in 1..=10 {
        stack.record_create(task(&format!("t{i}"), "Filler"));
    }
    assert!(stack
        .pending()
        .iter()
        .all(|action| action.id != target.id));

    gate.release();
    let undone = pending_undo.await.unwrap().expect("undo should still settle");
    assert_eq!(undone.id, target.id);
    assert_eq!(stack.len(), 10);

    // The target's removal was announced once, as an eviction; the
    // completed reversal must not announce a second removal for it.
    let mut removals_of_target = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let rewind::StackEvent::Removed { id, reason } = event {
            if id == target.id {
                removals_of_target.push(reason);
            }
        }
    }
    assert_eq!(removals_of_target, vec![rewind::RemovalReason::Evicted]);
}
