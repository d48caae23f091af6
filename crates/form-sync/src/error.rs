use thiserror::Error;

/// Failures on the record-store and reconciliation paths.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The external record-store API call failed (transport or non-success
    /// status). On the reconciliation path this aborts the current batch
    /// without advancing the cursor.
    #[error("record store request failed: {0}")]
    Api(String),

    /// The API response did not have the expected shape.
    #[error("unexpected record store response: {0}")]
    Malformed(String),

    /// Local persistence failed.
    #[error("store error: {0}")]
    Store(String),

    /// The subscription has no registered worker.
    #[error("no worker registered for subscription '{0}'")]
    UnknownSubscription(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(error: reqwest::Error) -> Self {
        SyncError::Api(error.to_string())
    }
}
