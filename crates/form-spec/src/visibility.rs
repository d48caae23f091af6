use std::collections::BTreeMap;

use crate::answers::AnswerMap;
use crate::spec::question::Question;

/// Per-question visibility decisions keyed by question key.
pub type VisibilityMap = BTreeMap<String, bool>;

/// Computes visibility for every question against the full answer map.
///
/// A rule may reference any earlier question's answer whether or not that
/// question is itself visible, so each rule sees the complete map. Questions
/// without a rule are always visible.
pub fn resolve_visibility(questions: &[Question], answers: &AnswerMap) -> VisibilityMap {
    let mut map = VisibilityMap::new();
    for question in questions {
        let visible = match &question.visible_if {
            Some(rule) => rule.evaluate(answers),
            None => true,
        };
        map.insert(question.key.clone(), visible);
    }
    map
}

/// Filters the question list down to the currently visible ones, preserving
/// form order.
pub fn visible_questions<'a>(questions: &'a [Question], answers: &AnswerMap) -> Vec<&'a Question> {
    questions
        .iter()
        .filter(|question| match &question.visible_if {
            Some(rule) => rule.evaluate(answers),
            None => true,
        })
        .collect()
}
