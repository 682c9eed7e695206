//! Events emitted to the notification/UI layer.

use serde::{Deserialize, Serialize};

use crate::action::{ActionId, ReversibleAction};

/// Why an action left the stack.
///
/// The four removal paths are mutually exclusive; every action leaves
/// through exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// Dropped from the back when the stack overflowed its capacity.
    Evicted,
    /// The reversal window elapsed.
    Expired,
    /// Dismissed by the consumer without reversing.
    Cleared,
    /// Its reversal completed successfully.
    Reverted,
}

impl RemovalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalReason::Evicted => "evicted",
            RemovalReason::Expired => "expired",
            RemovalReason::Cleared => "cleared",
            RemovalReason::Reverted => "reverted",
        }
    }
}

impl std::fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Notification emitted by the stack as actions come and go.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StackEvent {
    /// A new reversible action is pending.
    Recorded(ReversibleAction),
    /// An action left the stack.
    Removed { id: ActionId, reason: RemovalReason },
}

impl StackEvent {
    /// Human-readable event type name for display
    pub fn event_type_name(&self) -> &'static str {
        match self {
            StackEvent::Recorded(_) => "Recorded",
            StackEvent::Removed { .. } => "Removed",
        }
    }
}
