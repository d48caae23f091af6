use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::rule::Rule;

/// Field kinds supported by the external record store mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum QuestionType {
    ShortText,
    LongText,
    SingleChoice,
    MultiChoice,
    Attachments,
}

impl QuestionType {
    /// Whether answers for this kind carry a choice domain.
    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionType::SingleChoice | QuestionType::MultiChoice)
    }
}

/// One form question, mapped onto a column of the external table.
///
/// `key` is the stable identity answers are stored under; it must never
/// change once responses reference it. `field_id`/`field_name` address the
/// external column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Question {
    pub key: String,
    pub field_id: String,
    pub field_name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_if: Option<Rule>,
}
