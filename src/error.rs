//! Undo error taxonomy.

use thiserror::Error;

use crate::action::ActionId;
use crate::store::StoreError;

/// Failure modes of [`undo`](crate::stack::ReversibleActionStack::undo).
///
/// All variants are recoverable from the stack's point of view: the UI
/// disables its control, drops a stale reference, or offers a retry.
#[derive(Debug, Error)]
pub enum UndoError {
    /// Undo requested with no id while nothing is pending.
    #[error("no reversible action available")]
    NoActionAvailable,

    /// The targeted action already expired, was evicted, or was undone.
    #[error("reversible action {0} not found")]
    ActionNotFound(ActionId),

    /// Another reversal is still in flight.
    #[error("a reversal is already in progress")]
    ReversalInProgress,

    /// The injected inverse operation rejected. The action stays in the
    /// stack so the caller can retry until it expires.
    #[error("failed to reverse action {action}: {source}")]
    ReversalFailed {
        action: ActionId,
        #[source]
        source: StoreError,
    },
}
