use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rule::Combinator;
use crate::spec::question::Question;

/// Top-level form definition bound to one external table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormSpec {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub store_id: String,
    pub table_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    pub questions: Vec<Question>,
}

/// Authoring-time problems in a form definition.
///
/// These are configuration errors: they must be rejected when the form is
/// saved, before any respondent sees it. The evaluator itself stays
/// forgiving.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecIssue {
    #[error("duplicate question key '{key}'")]
    DuplicateKey { key: String },
    #[error("question '{key}' of type {kind} must not carry options")]
    OptionsOnNonChoice { key: String, kind: String },
    #[error("choice question '{key}' has an empty option set")]
    EmptyOptions { key: String },
    #[error("question '{key}' uses an unrecognized rule combinator")]
    UnknownCombinator { key: String },
    #[error("condition on question '{key}' targets '{target}', which is not an earlier question")]
    InvalidTarget { key: String, target: String },
}

impl FormSpec {
    /// Checks the structural invariants of the form definition and returns
    /// every issue found.
    ///
    /// Rule targets may only reference questions positioned strictly before
    /// the owning question; this bounds visibility resolution to a single
    /// forward pass and rules out cycles.
    pub fn lint(&self) -> Vec<SpecIssue> {
        let mut issues = Vec::new();
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut earlier: BTreeSet<&str> = BTreeSet::new();

        for question in &self.questions {
            if !seen.insert(&question.key) {
                issues.push(SpecIssue::DuplicateKey {
                    key: question.key.clone(),
                });
            }

            if !question.options.is_empty() && !question.kind.is_choice() {
                issues.push(SpecIssue::OptionsOnNonChoice {
                    key: question.key.clone(),
                    kind: format!("{:?}", question.kind),
                });
            }
            if question.options.is_empty() && question.kind.is_choice() {
                issues.push(SpecIssue::EmptyOptions {
                    key: question.key.clone(),
                });
            }

            if let Some(rule) = &question.visible_if {
                if rule.combinator == Combinator::Unknown {
                    issues.push(SpecIssue::UnknownCombinator {
                        key: question.key.clone(),
                    });
                }
                for condition in &rule.conditions {
                    if !earlier.contains(condition.target_key.as_str()) {
                        issues.push(SpecIssue::InvalidTarget {
                            key: question.key.clone(),
                            target: condition.target_key.clone(),
                        });
                    }
                }
            }

            earlier.insert(&question.key);
        }

        issues
    }

    /// Looks up a question by its stable key.
    pub fn question(&self, key: &str) -> Option<&Question> {
        self.questions.iter().find(|question| question.key == key)
    }
}
