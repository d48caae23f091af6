use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Raw answers keyed by question key.
pub type AnswerMap = Map<String, Value>;

/// Validated output keyed by the external store's field name.
pub type FieldMap = BTreeMap<String, Value>;

/// Extracts the answer object from an arbitrary JSON payload; anything that
/// is not an object is treated as an empty answer set.
pub fn answer_map(raw: &Value) -> AnswerMap {
    raw.as_object().cloned().unwrap_or_default()
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub question_key: String,
    pub message: String,
    pub code: String,
}

impl ValidationError {
    pub fn new(
        question_key: impl Into<String>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            question_key: question_key.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.message)
    }
}

/// The complete set of failures from one validation pass. Never partial:
/// a submission either yields a field map or this full list.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("submission rejected: {}", summary(.0))]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(|error| error.message.clone()).collect()
    }
}

fn summary(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|error| error.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
