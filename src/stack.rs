//! Bounded stack of reversible actions with per-action expiry.
//!
//! The stack records the inverse of each completed mutation, keeps at most
//! [`DEFAULT_CAPACITY`] entries (FIFO eviction on overflow), expires each
//! entry after [`DEFAULT_TTL`], and guarantees at most one reversal is in
//! flight at a time.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::action::{ActionId, ActionPayload, ReversibleAction};
use crate::error::UndoError;
use crate::events::{RemovalReason, StackEvent};
use crate::record::{FieldMap, RecordData};
use crate::store::{RecordStore, StoreError};

/// Maximum number of pending actions; recording beyond this evicts the
/// oldest entry.
pub const DEFAULT_CAPACITY: usize = 10;

/// Window during which a recorded action can be reversed.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Mutable state, guarded by one mutex so the reversing check-and-set is
/// atomic across threads.
struct Inner {
    /// Pending actions, front = most recent.
    actions: VecDeque<ReversibleAction>,
    /// True while an inverse operation is in flight.
    reversing: bool,
    /// One expiry task per pending action, aborted when its action is
    /// removed by any other path.
    timers: HashMap<ActionId, JoinHandle<()>>,
    /// Notification subscribers; dead senders are pruned on emit.
    subscribers: Vec<mpsc::UnboundedSender<StackEvent>>,
}

impl Inner {
    fn new() -> Self {
        Self {
            actions: VecDeque::new(),
            reversing: false,
            timers: HashMap::new(),
            subscribers: Vec::new(),
        }
    }

    fn emit(&mut self, event: StackEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Remove an action by id, returning it if it was still present.
    fn take_action(&mut self, id: &ActionId) -> Option<ReversibleAction> {
        let position = self.actions.iter().position(|action| action.id == *id)?;
        self.actions.remove(position)
    }

    fn abort_timer(&mut self, id: &ActionId) {
        if let Some(handle) = self.timers.remove(id) {
            handle.abort();
        }
    }
}

/// Process-local registry of undoable mutations.
///
/// Cloning is cheap and shares the same underlying stack; independent
/// stacks (e.g. in tests) are created with [`ReversibleActionStack::new`]
/// and never cross-contaminate.
///
/// Recording is synchronous and infallible; reversal awaits the injected
/// inverse operation with the internal lock released, so `record` and
/// `clear` keep working while a reversal is in flight.
#[derive(Clone)]
pub struct ReversibleActionStack {
    store: Arc<dyn RecordStore>,
    inner: Arc<Mutex<Inner>>,
    capacity: usize,
    ttl: Duration,
}

impl ReversibleActionStack {
    /// Create a stack over the given record operations with the default
    /// capacity and reversal window.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            inner: Arc::new(Mutex::new(Inner::new())),
            capacity: DEFAULT_CAPACITY,
            ttl: DEFAULT_TTL,
        }
    }

    /// Override the capacity (primarily for tests; must be at least 1).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity >= 1, "stack capacity must be at least 1");
        self.capacity = capacity;
        self
    }

    /// Override the reversal window (primarily for tests).
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Register a completed record creation.
    ///
    /// `record` is the record as it was created; undoing deletes it by id.
    pub fn record_create(&self, record: RecordData) -> ReversibleAction {
        let title = record.display_title().map(str::to_owned);
        self.record(ActionPayload::Create { record }, title.as_deref())
    }

    /// Register a completed record update.
    ///
    /// `previous` holds exactly the field values the update overwrote;
    /// undoing restores those fields and no others. `updated` is the
    /// post-update record: only its id and title are used, but requiring
    /// it keeps the before/after intent explicit at the call site.
    pub fn record_update(&self, previous: FieldMap, updated: &RecordData) -> ReversibleAction {
        assert!(
            !previous.is_empty(),
            "update action requires the overwritten field values"
        );
        let title = updated.display_title().map(str::to_owned);
        self.record(
            ActionPayload::Update {
                record_id: updated.id.clone(),
                previous,
            },
            title.as_deref(),
        )
    }

    /// Register a completed record deletion.
    ///
    /// `record` is the record as it existed immediately before deletion;
    /// undoing recreates it with the original id.
    pub fn record_delete(&self, record: RecordData) -> ReversibleAction {
        let title = record.display_title().map(str::to_owned);
        self.record(ActionPayload::Delete { record }, title.as_deref())
    }

    /// Insert a new action at the front, evicting the oldest entry on
    /// overflow and scheduling the expiry timer.
    fn record(&self, payload: ActionPayload, title: Option<&str>) -> ReversibleAction {
        let action = ReversibleAction::new(payload, title);
        let mut inner = self.inner.lock();

        inner.actions.push_front(action.clone());
        tracing::debug!(id = %action.id, kind = %action.kind(), "Recorded reversible action");

        if inner.actions.len() > self.capacity {
            if let Some(oldest) = inner.actions.pop_back() {
                inner.abort_timer(&oldest.id);
                tracing::debug!(id = %oldest.id, "Evicted oldest action on overflow");
                inner.emit(StackEvent::Removed {
                    id: oldest.id,
                    reason: RemovalReason::Evicted,
                });
            }
        }

        let handle = self.spawn_expiry(action.id);
        inner.timers.insert(action.id, handle);
        inner.emit(StackEvent::Recorded(action.clone()));

        action
    }

    /// Spawn the expiry task for an action.
    ///
    /// The task holds only a weak reference to the stack state: dropping
    /// the last stack handle lets the timer fall through harmlessly. If the
    /// action was already removed by another path, firing is a no-op.
    fn spawn_expiry(&self, id: ActionId) -> JoinHandle<()> {
        let ttl = self.ttl;
        let inner = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let mut inner = inner.lock();
            if inner.take_action(&id).is_some() {
                inner.timers.remove(&id);
                tracing::debug!(id = %id, "Reversible action expired");
                inner.emit(StackEvent::Removed {
                    id,
                    reason: RemovalReason::Expired,
                });
            }
        })
    }

    /// Reverse a pending action.
    ///
    /// With no id, targets whatever is at the front at the moment of the
    /// call; a later `record` racing in while the inverse operation is
    /// awaited does not change the target. On success the action is
    /// removed and returned; on failure it stays in the stack so the
    /// caller can retry until it expires.
    pub async fn undo(&self, action_id: Option<&ActionId>) -> Result<ReversibleAction, UndoError> {
        // Resolve the target and claim the reversal slot in one critical
        // section.
        let action = {
            let mut inner = self.inner.lock();
            if inner.reversing {
                tracing::warn!("Undo rejected: a reversal is already in progress");
                return Err(UndoError::ReversalInProgress);
            }
            let action = match action_id {
                Some(id) => inner
                    .actions
                    .iter()
                    .find(|action| action.id == *id)
                    .cloned()
                    .ok_or(UndoError::ActionNotFound(*id))?,
                None => inner
                    .actions
                    .front()
                    .cloned()
                    .ok_or(UndoError::NoActionAvailable)?,
            };
            inner.reversing = true;
            action
        };

        // The guard clears the flag however the dispatch settles, so a
        // panicking or rejecting inverse can never wedge the stack.
        let _guard = ReversingGuard(Arc::clone(&self.inner));
        let result = self.dispatch_inverse(&action).await;

        match result {
            Ok(()) => {
                let mut inner = self.inner.lock();
                // Flag and removal settle in one critical section: a
                // competing undo either still sees the flag or no longer
                // sees the action, never a reverted action it could target
                // again.
                inner.reversing = false;
                // The target may have been evicted, cleared, or expired
                // while the inverse call was in flight; its removal was
                // already announced in that case.
                if inner.take_action(&action.id).is_some() {
                    inner.abort_timer(&action.id);
                    inner.emit(StackEvent::Removed {
                        id: action.id,
                        reason: RemovalReason::Reverted,
                    });
                }
                drop(inner);
                tracing::info!(id = %action.id, kind = %action.kind(), "Reversed action");
                Ok(action)
            }
            Err(source) => {
                tracing::warn!(
                    id = %action.id,
                    error = %source,
                    "Reversal failed; action retained for retry"
                );
                Err(UndoError::ReversalFailed {
                    action: action.id,
                    source,
                })
            }
        }
    }

    /// Dispatch the inverse operation for the action's kind.
    async fn dispatch_inverse(&self, action: &ReversibleAction) -> Result<(), StoreError> {
        match &action.payload {
            ActionPayload::Create { record } => self.store.delete_record(&record.id).await,
            ActionPayload::Update {
                record_id,
                previous,
            } => self
                .store
                .update_record(record_id, previous.clone())
                .await
                .map(|_| ()),
            // The snapshot carries the original id, so the recreated record
            // keeps it.
            ActionPayload::Delete { record } => self
                .store
                .create_record(record.clone())
                .await
                .map(|_| ()),
        }
    }

    /// Dismiss pending actions without reversing them.
    ///
    /// With an id, removes that single action if still present (silent
    /// no-op otherwise); with `None`, removes everything. Expiry timers
    /// for removed actions are cancelled.
    pub fn clear(&self, action_id: Option<&ActionId>) {
        let mut inner = self.inner.lock();
        match action_id {
            Some(id) => {
                if inner.take_action(id).is_some() {
                    inner.abort_timer(id);
                    tracing::debug!(id = %id, "Cleared reversible action");
                    inner.emit(StackEvent::Removed {
                        id: *id,
                        reason: RemovalReason::Cleared,
                    });
                }
            }
            None => {
                let drained: Vec<ReversibleAction> = inner.actions.drain(..).collect();
                for action in drained {
                    inner.abort_timer(&action.id);
                    inner.emit(StackEvent::Removed {
                        id: action.id,
                        reason: RemovalReason::Cleared,
                    });
                }
                tracing::debug!("Cleared all reversible actions");
            }
        }
    }

    /// Snapshot of the pending actions, most recent first.
    pub fn pending(&self) -> Vec<ReversibleAction> {
        self.inner.lock().actions.iter().cloned().collect()
    }

    /// True while an inverse operation is in flight. Consumers use this to
    /// disable duplicate-undo controls.
    pub fn is_reversing(&self) -> bool {
        self.inner.lock().reversing
    }

    pub fn len(&self) -> usize {
        self.inner.lock().actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().actions.is_empty()
    }

    /// Subscribe to stack notifications. Each subscriber receives every
    /// subsequent [`StackEvent`]; dropped receivers are pruned on the next
    /// emit.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<StackEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().subscribers.push(tx);
        rx
    }
}

impl std::fmt::Debug for ReversibleActionStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ReversibleActionStack")
            .field("pending", &inner.actions.len())
            .field("reversing", &inner.reversing)
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Clears the in-flight flag when dropped, on success, failure, and panic
/// paths alike.
struct ReversingGuard(Arc<Mutex<Inner>>);

impl Drop for ReversingGuard {
    fn drop(&mut self) {
        self.0.lock().reversing = false;
    }
}
