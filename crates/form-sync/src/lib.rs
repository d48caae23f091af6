#![allow(missing_docs)]

pub mod client;
pub mod cursor;
pub mod error;
pub mod response;
pub mod store;
pub mod submit;
pub mod worker;

pub use client::{
    AccessTokenProvider, ChangeBatch, ChangePayload, HttpRecordStore, RecordStore, StaticToken,
    TableChanges, TableRef,
};
pub use cursor::CursorState;
pub use error::SyncError;
pub use response::{Response, ResponseStatus, Transition};
pub use store::{CursorStore, MemoryCursorStore, MemoryResponseStore, ResponseStore};
pub use submit::{SubmissionReceipt, SubmitError, submit};
pub use worker::{BatchOutcome, Reconciler, Subscription, WorkerConfig, WorkerSet};
