//! Reversible actions and the inverse data they carry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{FieldMap, RecordData, RecordId};

/// Unique identifier for a recorded action.
///
/// Generated at record time; unique across the process lifetime of the
/// stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(Uuid);

impl ActionId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of mutation an action reverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Create,
    Update,
    Delete,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Create => "create",
            ActionKind::Update => "update",
            ActionKind::Delete => "delete",
        }
    }

    /// Past-tense verb used when synthesizing descriptions.
    fn verb(&self) -> &'static str {
        match self {
            ActionKind::Create => "Created",
            ActionKind::Update => "Updated",
            ActionKind::Delete => "Deleted",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inverse data captured per mutation kind.
///
/// A closed sum so the inverse dispatch is exhaustively checked: there is
/// no way to record an update without its overwritten fields, or a delete
/// without the full pre-deletion snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionPayload {
    /// The record as it was created; undo deletes it by id.
    Create { record: RecordData },
    /// The field values the update overwrote; undo restores exactly these,
    /// leaving fields absent from the snapshot untouched.
    Update {
        record_id: RecordId,
        previous: FieldMap,
    },
    /// The record as it existed immediately before deletion; undo recreates
    /// it, re-using the original id.
    Delete { record: RecordData },
}

impl ActionPayload {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionPayload::Create { .. } => ActionKind::Create,
            ActionPayload::Update { .. } => ActionKind::Update,
            ActionPayload::Delete { .. } => ActionKind::Delete,
        }
    }

    /// Id of the record this action affects.
    pub fn record_id(&self) -> &RecordId {
        match self {
            ActionPayload::Create { record } => &record.id,
            ActionPayload::Update { record_id, .. } => record_id,
            ActionPayload::Delete { record } => &record.id,
        }
    }
}

/// A recorded mutation plus the data needed to reverse it.
///
/// Immutable once recorded. The description is synthesized when the action
/// is registered and never recomputed, since the underlying record may
/// change or vanish afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReversibleAction {
    pub id: ActionId,
    /// Human-readable summary for the notification layer.
    pub description: String,
    /// When the action was registered. Ordering and debugging only; expiry
    /// is scheduled relative to registration, never polled against this.
    pub recorded_at: DateTime<Utc>,
    pub payload: ActionPayload,
}

impl ReversibleAction {
    pub(crate) fn new(payload: ActionPayload, title: Option<&str>) -> Self {
        let description = describe(payload.kind(), title);
        Self {
            id: ActionId::generate(),
            description,
            recorded_at: Utc::now(),
            payload,
        }
    }

    pub fn kind(&self) -> ActionKind {
        self.payload.kind()
    }

    pub fn record_id(&self) -> &RecordId {
        self.payload.record_id()
    }
}

/// Synthesize the display description for an action.
///
/// Falls back to a generic placeholder when the record carries no title.
fn describe(kind: ActionKind, title: Option<&str>) -> String {
    format!("{} task: {}", kind.verb(), title.unwrap_or("(untitled)"))
}
