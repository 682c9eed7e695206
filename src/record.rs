//! Record snapshots exchanged with the host application.
//!
//! The stack treats records as opaque JSON shapes: it never interprets
//! field contents beyond extracting a display title at record time.

use serde::{Deserialize, Serialize};

/// Opaque record identifier assigned by the host API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Partial set of record field values, keyed by field name.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// Full record snapshot as known to the host at capture time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordData {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: FieldMap,
}

impl RecordData {
    pub fn new(id: impl Into<RecordId>, fields: FieldMap) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Display title for notifications.
    ///
    /// Reads the `title` field, falling back to `name`. Returns `None`
    /// when neither is a string.
    pub fn display_title(&self) -> Option<&str> {
        self.fields
            .get("title")
            .or_else(|| self.fields.get("name"))
            .and_then(|value| value.as_str())
    }
}
