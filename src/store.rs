//! Injected record mutation capabilities.
//!
//! The stack never talks to a backend itself. The host supplies an
//! implementation of [`RecordStore`] (typically a thin wrapper over its
//! API client) and owns its own failure and retry semantics.

use async_trait::async_trait;
use thiserror::Error;

use crate::record::{FieldMap, RecordData, RecordId};

/// Failure reported by an injected record operation.
///
/// Opaque to the stack: the message is carried for display and logging
/// only, never inspected.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(String);

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        Self(format!("{err:#}"))
    }
}

/// Asynchronous create/update/delete operations over the host's records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create a record, honoring any id present in `data`.
    async fn create_record(&self, data: RecordData) -> Result<RecordData, StoreError>;

    /// Apply `fields` to an existing record, leaving fields absent from the
    /// map untouched.
    async fn update_record(
        &self,
        id: &RecordId,
        fields: FieldMap,
    ) -> Result<RecordData, StoreError>;

    /// Delete a record by id.
    async fn delete_record(&self, id: &RecordId) -> Result<(), StoreError>;
}
