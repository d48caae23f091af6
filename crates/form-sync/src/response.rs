use chrono::{DateTime, Utc};
use gridform_spec::AnswerMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a stored response.
///
/// The only transition is `Active -> DeletedExternally`, applied by the
/// reconciliation worker when the backing record disappears from the
/// external store. There is no way back: if the record reappears it is a
/// new record, never a resurrection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResponseStatus {
    Active,
    DeletedExternally,
}

/// Outcome of applying a state-machine event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// The response was already in the target state; at-least-once delivery
    /// makes this an expected no-op, not an error.
    NoOp,
}

/// A locally persisted form submission, 1:1 with one external record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: Uuid,
    pub form_id: String,
    pub record_id: String,
    pub answers: AnswerMap,
    pub status: ResponseStatus,
    pub submitted_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Response {
    pub fn new(form_id: impl Into<String>, record_id: impl Into<String>, answers: AnswerMap) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            form_id: form_id.into(),
            record_id: record_id.into(),
            answers,
            status: ResponseStatus::Active,
            submitted_by: "anonymous".into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Records that the external record changed. The field-level delta is
    /// keyed by external field id and is not reliably mappable back onto
    /// question keys, so this is a freshness signal only.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Applies the external-deletion event. Idempotent.
    pub fn mark_deleted_externally(&mut self, now: DateTime<Utc>) -> Transition {
        if self.status == ResponseStatus::DeletedExternally {
            return Transition::NoOp;
        }
        self.status = ResponseStatus::DeletedExternally;
        self.updated_at = now;
        Transition::Applied
    }
}
