//! Mock record store for deterministic testing
//!
//! Implements the [`RecordStore`] trait without any network or storage.
//! Captures every call for later verification, can be scripted to fail,
//! and can gate calls so tests hold a reversal in flight at a precise
//! point.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use rewind::mock::{MockConfig, MockRecordStore};
//! use rewind::ReversibleActionStack;
//!
//! # async fn demo() {
//! let store = Arc::new(MockRecordStore::new().with_config(MockConfig::default().failing_once()));
//! let stack = ReversibleActionStack::new(store.clone());
//! // First undo fails, the retry succeeds...
//! # }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::record::{FieldMap, RecordData, RecordId};
use crate::store::{RecordStore, StoreError};

/// A single captured store call.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Create(RecordData),
    Update { id: RecordId, fields: FieldMap },
    Delete(RecordId),
}

/// Configuration for mock failure behavior
#[derive(Clone, Default)]
pub struct MockConfig {
    /// Number of leading calls that fail before the mock starts succeeding
    pub fail_first: usize,
    /// Whether every call should fail
    pub always_fail: bool,
}

impl MockConfig {
    /// Configure every call to fail
    pub fn failing(mut self) -> Self {
        self.always_fail = true;
        self
    }

    /// Configure only the first call to fail (for retry tests)
    pub fn failing_once(mut self) -> Self {
        self.fail_first = 1;
        self
    }

    /// Configure the first `count` calls to fail
    pub fn failing_first(mut self, count: usize) -> Self {
        self.fail_first = count;
        self
    }
}

/// Mock record store for testing
///
/// Each call is captured before it settles. When gated, a call waits for
/// one [`Gate::release`] permit before resolving, which lets a test assert
/// on the stack's in-flight state deterministically.
pub struct MockRecordStore {
    config: MockConfig,
    /// Captured calls for verification
    calls: Arc<Mutex<Vec<StoreCall>>>,
    /// Remaining scripted failures (decremented per failing call)
    failures_remaining: Arc<Mutex<usize>>,
    /// Permits consumed by gated calls; `None` means calls settle
    /// immediately
    gate: Option<Arc<Semaphore>>,
}

impl MockRecordStore {
    /// Create a mock store where every call succeeds immediately
    pub fn new() -> Self {
        Self {
            config: MockConfig::default(),
            calls: Arc::new(Mutex::new(Vec::new())),
            failures_remaining: Arc::new(Mutex::new(0)),
            gate: None,
        }
    }

    /// Configure the mock with a MockConfig
    pub fn with_config(mut self, config: MockConfig) -> Self {
        *self.failures_remaining.lock() = config.fail_first;
        self.config = config;
        self
    }

    /// Create a gated mock store: every call blocks until the returned
    /// [`Gate`] releases a permit for it
    pub fn gated() -> (Self, Gate) {
        let semaphore = Arc::new(Semaphore::new(0));
        let store = Self {
            gate: Some(semaphore.clone()),
            ..Self::new()
        };
        (store, Gate(semaphore))
    }

    /// Get captured calls for assertions
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    /// Get the last captured call (most recent)
    pub fn last_call(&self) -> Option<StoreCall> {
        self.calls.lock().last().cloned()
    }

    /// Number of captured calls
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Reset all captured state
    pub fn reset(&self) {
        self.calls.lock().clear();
        *self.failures_remaining.lock() = self.config.fail_first;
    }

    /// Capture the call, wait on the gate if configured, and apply the
    /// scripted failure behavior.
    async fn settle(&self, call: StoreCall) -> Result<(), StoreError> {
        self.calls.lock().push(call);

        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        if self.config.always_fail {
            return Err(StoreError::new("mock store failure"));
        }
        let mut remaining = self.failures_remaining.lock();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(StoreError::new("mock store failure"));
        }
        Ok(())
    }
}

impl Default for MockRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn create_record(&self, data: RecordData) -> Result<RecordData, StoreError> {
        self.settle(StoreCall::Create(data.clone())).await?;
        Ok(data)
    }

    async fn update_record(
        &self,
        id: &RecordId,
        fields: FieldMap,
    ) -> Result<RecordData, StoreError> {
        self.settle(StoreCall::Update {
            id: id.clone(),
            fields: fields.clone(),
        })
        .await?;
        Ok(RecordData::new(id.clone(), fields))
    }

    async fn delete_record(&self, id: &RecordId) -> Result<(), StoreError> {
        self.settle(StoreCall::Delete(id.clone())).await
    }
}

/// Releases gated store calls one at a time
pub struct Gate(Arc<Semaphore>);

impl Gate {
    /// Let exactly one pending (or future) call settle
    pub fn release(&self) {
        self.0.add_permits(1);
    }

    /// Let `count` calls settle
    pub fn release_many(&self, count: usize) {
        self.0.add_permits(count);
    }
}
