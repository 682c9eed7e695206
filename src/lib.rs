pub mod action;
pub mod error;
pub mod events;
pub mod mock;
pub mod record;
pub mod stack;
pub mod store;

pub use action::{ActionId, ActionKind, ActionPayload, ReversibleAction};
pub use error::UndoError;
pub use events::{RemovalReason, StackEvent};
pub use record::{FieldMap, RecordData, RecordId};
pub use stack::{ReversibleActionStack, DEFAULT_CAPACITY, DEFAULT_TTL};
pub use store::{RecordStore, StoreError};
