use gridform_spec::{FormSpec, ValidationErrors, answer_map, validate};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::client::{RecordStore, TableRef};
use crate::error::SyncError;
use crate::response::Response;
use crate::store::ResponseStore;

/// What the respondent gets back after a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub response_id: Uuid,
    pub record_id: String,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    /// Field-level failures, always the complete list.
    #[error(transparent)]
    Rejected(#[from] ValidationErrors),

    /// The form is not accepting submissions.
    #[error("form '{0}' is not published")]
    Unpublished(String),

    /// Record creation or local persistence failed; surfaced to the
    /// respondent as a generic failure.
    #[error(transparent)]
    Api(#[from] SyncError),
}

/// Runs one submission end to end: validate, create the external record,
/// persist the local response.
///
/// Validation fully completes (success or the accumulated error list)
/// before the record-store call is attempted.
pub async fn submit(
    form: &FormSpec,
    raw_answers: &Value,
    client: &dyn RecordStore,
    responses: &dyn ResponseStore,
) -> Result<SubmissionReceipt, SubmitError> {
    if !form.published {
        return Err(SubmitError::Unpublished(form.id.clone()));
    }

    let fields = validate(form, raw_answers)?;

    let table = TableRef::new(&form.store_id, &form.table_id);
    let record_id = client.create_record(&table, &fields).await?;

    let response = Response::new(&form.id, &record_id, answer_map(raw_answers));
    let response_id = response.id;
    responses.insert(response).await?;

    info!(form = %form.id, record = %record_id, "submission stored");
    Ok(SubmissionReceipt {
        response_id,
        record_id,
    })
}
