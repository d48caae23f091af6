use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How a rule combines its condition results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Combinator {
    #[default]
    And,
    Or,
    /// Catch-all for combinators this build does not know. Rejected by the
    /// form lint; the evaluator falls back to AND semantics if one slips
    /// through.
    #[serde(other)]
    Unknown,
}

/// Comparison applied between a stored answer and a literal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
}

/// A single comparison against the answer for `target_key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Condition {
    pub target_key: String,
    pub operator: Operator,
    pub value: Value,
}

/// Visibility rule: a combinator over an ordered list of conditions.
///
/// A rule with no conditions is always satisfied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Rule {
    #[serde(default)]
    pub combinator: Combinator,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl Condition {
    /// Evaluates this condition against the current answer map.
    ///
    /// A missing or null answer satisfies `notEquals` (absence is not equal
    /// to anything) and fails `equals` and `contains`.
    pub fn evaluate(&self, answers: &Map<String, Value>) -> bool {
        let answer = match answers.get(&self.target_key) {
            Some(value) if !value.is_null() => value,
            _ => return matches!(self.operator, Operator::NotEquals),
        };

        match self.operator {
            Operator::Equals => equals_match(answer, &self.value),
            Operator::NotEquals => !equals_match(answer, &self.value),
            Operator::Contains => contains_match(answer, &self.value),
        }
    }
}

impl Rule {
    /// Evaluates the rule to a visibility decision. Pure and reentrant: the
    /// same implementation backs authoritative validation and preview.
    pub fn evaluate(&self, answers: &Map<String, Value>) -> bool {
        if self.conditions.is_empty() {
            return true;
        }

        match self.combinator {
            Combinator::Or => self
                .conditions
                .iter()
                .any(|condition| condition.evaluate(answers)),
            Combinator::And => self
                .conditions
                .iter()
                .all(|condition| condition.evaluate(answers)),
            Combinator::Unknown => {
                tracing::warn!("rule has unrecognized combinator; applying AND semantics");
                self.conditions
                    .iter()
                    .all(|condition| condition.evaluate(answers))
            }
        }
    }
}

/// `equals` semantics shared by `equals` and `notEquals`.
///
/// A sequence answer matches a scalar value by membership, and another
/// sequence by order-independent multiset comparison. Everything else is
/// plain value equality.
fn equals_match(answer: &Value, value: &Value) -> bool {
    match (answer, value) {
        (Value::Array(items), Value::Array(expected)) => multiset_eq(items, expected),
        (Value::Array(items), _) => items.contains(value),
        _ => answer == value,
    }
}

fn multiset_eq(left: &[Value], right: &[Value]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    let mut matched = vec![false; right.len()];
    left.iter().all(|item| {
        right.iter().enumerate().any(|(index, candidate)| {
            if !matched[index] && candidate == item {
                matched[index] = true;
                true
            } else {
                false
            }
        })
    })
}

fn contains_match(answer: &Value, value: &Value) -> bool {
    let needle = text_form(value).to_lowercase();
    match answer {
        Value::Array(items) => items
            .iter()
            .any(|item| text_form(item).to_lowercase().contains(&needle)),
        _ => text_form(answer).to_lowercase().contains(&needle),
    }
}

/// String form used by `contains`: strings verbatim, everything else via its
/// JSON rendering.
fn text_form(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn multiset_ignores_order_but_not_counts() {
        let a = vec![json!("A"), json!("B"), json!("A")];
        let b = vec![json!("B"), json!("A"), json!("A")];
        let c = vec![json!("A"), json!("B"), json!("B")];
        assert!(multiset_eq(&a, &b));
        assert!(!multiset_eq(&a, &c));
        assert!(!multiset_eq(&a, &b[..2].to_vec()));
    }

    #[test]
    fn text_form_renders_non_strings_as_json() {
        assert_eq!(text_form(&json!("plain")), "plain");
        assert_eq!(text_form(&json!(42)), "42");
        assert_eq!(text_form(&json!(true)), "true");
    }

    #[test]
    fn unknown_combinator_deserializes_and_applies_and_semantics() {
        let rule: Rule = serde_json::from_value(json!({
            "combinator": "XOR",
            "conditions": [
                { "target_key": "a", "operator": "equals", "value": "1" },
                { "target_key": "b", "operator": "equals", "value": "2" }
            ]
        }))
        .expect("deserialize");
        assert_eq!(rule.combinator, Combinator::Unknown);

        let mut answers = Map::new();
        answers.insert("a".into(), json!("1"));
        assert!(!rule.evaluate(&answers));
        answers.insert("b".into(), json!("2"));
        assert!(rule.evaluate(&answers));
    }
}
