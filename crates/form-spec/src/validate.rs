use serde_json::Value;

use crate::answers::{FieldMap, ValidationError, ValidationErrors, answer_map};
use crate::spec::form::FormSpec;
use crate::spec::question::{Question, QuestionType};
use crate::visibility::resolve_visibility;

/// Validates a raw submission against the form and translates it into the
/// external store's field map.
///
/// Hidden questions are skipped entirely, required or not. Errors are
/// accumulated across the whole form; the result is either the complete
/// field map or the complete error list, never a mix.
pub fn validate(form: &FormSpec, raw_answers: &Value) -> Result<FieldMap, ValidationErrors> {
    let answers = answer_map(raw_answers);
    let visibility = resolve_visibility(&form.questions, &answers);

    let mut errors = Vec::new();
    let mut fields = FieldMap::new();

    for question in &form.questions {
        if !visibility.get(&question.key).copied().unwrap_or(true) {
            continue;
        }

        let answer = answers.get(&question.key).filter(|value| !value.is_null());

        let Some(answer) = answer else {
            if question.required {
                errors.push(required_error(question));
            }
            continue;
        };

        if is_empty_answer(answer) {
            if question.required {
                errors.push(required_error(question));
            } else {
                fields.insert(question.field_name.clone(), answer.clone());
            }
            continue;
        }

        match validate_value(question, answer) {
            Some(error) => errors.push(error),
            None => {
                fields.insert(question.field_name.clone(), answer.clone());
            }
        }
    }

    if errors.is_empty() {
        Ok(fields)
    } else {
        Err(ValidationErrors(errors))
    }
}

fn required_error(question: &Question) -> ValidationError {
    ValidationError::new(
        &question.key,
        format!("{} is required", question.label),
        "required",
    )
}

fn is_empty_answer(value: &Value) -> bool {
    match value {
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn validate_value(question: &Question, value: &Value) -> Option<ValidationError> {
    match question.kind {
        QuestionType::ShortText | QuestionType::LongText => {
            if !value.is_string() {
                return Some(ValidationError::new(
                    &question.key,
                    format!("{} must be text", question.label),
                    "type_mismatch",
                ));
            }
        }
        QuestionType::SingleChoice => {
            let valid = value
                .as_str()
                .is_some_and(|choice| question.options.iter().any(|option| option == choice));
            if !valid {
                return Some(ValidationError::new(
                    &question.key,
                    format!("Invalid choice for {}", question.label),
                    "invalid_choice",
                ));
            }
        }
        QuestionType::MultiChoice => {
            let Some(items) = value.as_array() else {
                return Some(ValidationError::new(
                    &question.key,
                    format!("{} must be a list of choices", question.label),
                    "type_mismatch",
                ));
            };
            let invalid: Vec<&str> = items
                .iter()
                .map(|item| item.as_str().unwrap_or_default())
                .filter(|choice| !question.options.iter().any(|option| option == choice))
                .collect();
            if !invalid.is_empty() {
                return Some(ValidationError::new(
                    &question.key,
                    format!(
                        "Invalid choices for {}: {}",
                        question.label,
                        invalid.join(", ")
                    ),
                    "invalid_choices",
                ));
            }
        }
        QuestionType::Attachments => {
            // Element shape is the upload collaborator's concern; only the
            // sequence shape is checked here.
            if !value.is_array() {
                return Some(ValidationError::new(
                    &question.key,
                    format!("{} must be a list of attachments", question.label),
                    "type_mismatch",
                ));
            }
        }
    }

    None
}
