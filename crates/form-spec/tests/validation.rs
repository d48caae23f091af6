use serde_json::{Value, json};

use gridform_spec::{
    Combinator, Condition, FormSpec, Operator, Question, QuestionType, Rule, SpecIssue, answer_map,
    validate, visible_questions,
};

fn question(key: &str, kind: QuestionType, required: bool) -> Question {
    Question {
        key: key.into(),
        field_id: format!("fld_{key}"),
        field_name: format!("Field {key}"),
        label: format!("Label {key}"),
        kind,
        options: vec![],
        required,
        visible_if: None,
    }
}

fn rule_equals(target: &str, value: Value) -> Rule {
    Rule {
        combinator: Combinator::And,
        conditions: vec![Condition {
            target_key: target.into(),
            operator: Operator::Equals,
            value,
        }],
    }
}

/// Q1 single choice (Engineer/Designer), Q2 short text required iff Q1 is
/// Engineer.
fn role_form() -> FormSpec {
    let mut q1 = question("q1", QuestionType::SingleChoice, false);
    q1.options = vec!["Engineer".into(), "Designer".into()];
    let mut q2 = question("q2", QuestionType::ShortText, true);
    q2.visible_if = Some(rule_equals("q1", json!("Engineer")));

    FormSpec {
        id: "role-form".into(),
        name: "Role form".into(),
        description: None,
        store_id: "app123".into(),
        table_id: "tbl123".into(),
        store_name: None,
        table_name: None,
        published: true,
        subscription_id: None,
        questions: vec![q1, q2],
    }
}

#[test]
fn hidden_required_question_is_skipped() {
    let form = role_form();
    let fields = validate(&form, &json!({ "q1": "Designer" })).expect("valid");
    assert_eq!(fields.len(), 1);
    assert_eq!(fields.get("Field q1"), Some(&json!("Designer")));
    assert!(!fields.contains_key("Field q2"));
}

#[test]
fn visible_required_question_must_be_answered() {
    let form = role_form();
    let errors = validate(&form, &json!({ "q1": "Engineer" })).expect_err("rejected");
    assert_eq!(errors.messages(), vec!["Label q2 is required"]);
}

#[test]
fn visible_answered_form_maps_all_fields() {
    let form = role_form();
    let fields = validate(&form, &json!({ "q1": "Engineer", "q2": "hi" })).expect("valid");
    assert_eq!(fields.get("Field q1"), Some(&json!("Engineer")));
    assert_eq!(fields.get("Field q2"), Some(&json!("hi")));
}

#[test]
fn empty_string_counts_as_missing_for_required() {
    let form = role_form();
    let errors = validate(&form, &json!({ "q1": "Engineer", "q2": "" })).expect_err("rejected");
    assert_eq!(errors.messages(), vec!["Label q2 is required"]);
}

#[test]
fn errors_accumulate_across_questions() {
    let mut form = role_form();
    form.questions.push(question("q3", QuestionType::LongText, true));

    let errors = validate(&form, &json!({ "q1": "Engineer" })).expect_err("rejected");
    assert_eq!(
        errors.messages(),
        vec!["Label q2 is required", "Label q3 is required"]
    );
}

#[test]
fn single_choice_must_be_a_member_of_options() {
    let form = role_form();
    let errors = validate(&form, &json!({ "q1": "Manager" })).expect_err("rejected");
    assert_eq!(errors.messages(), vec!["Invalid choice for Label q1"]);
}

#[test]
fn multi_choice_error_names_every_invalid_member() {
    let mut form = role_form();
    let mut q3 = question("q3", QuestionType::MultiChoice, false);
    q3.options = vec!["Rust".into(), "Go".into()];
    form.questions.push(q3);

    let errors = validate(&form, &json!({ "q1": "Designer", "q3": ["Rust", "Zig", "COBOL"] }))
        .expect_err("rejected");
    assert_eq!(
        errors.messages(),
        vec!["Invalid choices for Label q3: Zig, COBOL"]
    );
}

#[test]
fn attachments_answer_must_be_a_sequence() {
    let mut form = role_form();
    form.questions
        .push(question("files", QuestionType::Attachments, false));

    let errors = validate(&form, &json!({ "q1": "Designer", "files": "not-a-list" }))
        .expect_err("rejected");
    assert_eq!(errors.0[0].code, "type_mismatch");

    let fields = validate(&form, &json!({ "q1": "Designer", "files": [{ "url": "x" }] }))
        .expect("valid");
    assert!(fields.contains_key("Field files"));
}

#[test]
fn unknown_answer_keys_are_ignored() {
    let form = role_form();
    let fields = validate(&form, &json!({ "q1": "Designer", "mystery": "value" })).expect("valid");
    assert_eq!(fields.len(), 1);
}

#[test]
fn visible_questions_preserve_form_order() {
    let form = role_form();
    let answers = answer_map(&json!({ "q1": "Engineer" }));
    let visible = visible_questions(&form.questions, &answers);
    let keys: Vec<&str> = visible.iter().map(|question| question.key.as_str()).collect();
    assert_eq!(keys, vec!["q1", "q2"]);

    let answers = answer_map(&json!({ "q1": "Designer" }));
    let visible = visible_questions(&form.questions, &answers);
    let keys: Vec<&str> = visible.iter().map(|question| question.key.as_str()).collect();
    assert_eq!(keys, vec!["q1"]);
}

#[test]
fn rules_see_answers_of_hidden_questions() {
    // q3 depends on q2 even when q2 is itself hidden; visibility is computed
    // against the full submitted map, not the visible subset.
    let mut form = role_form();
    let mut q3 = question("q3", QuestionType::ShortText, false);
    q3.visible_if = Some(rule_equals("q2", json!("secret")));
    form.questions.push(q3);

    let answers = answer_map(&json!({ "q1": "Designer", "q2": "secret" }));
    let visible = visible_questions(&form.questions, &answers);
    let keys: Vec<&str> = visible.iter().map(|question| question.key.as_str()).collect();
    assert_eq!(keys, vec!["q1", "q3"]);
}

#[test]
fn lint_flags_forward_and_unknown_targets() {
    let mut form = role_form();
    // q2's rule targets q1: fine. Add a rule on q1 targeting q2: forward.
    form.questions[0].visible_if = Some(rule_equals("q2", json!("x")));

    let issues = form.lint();
    assert!(issues.iter().any(|issue| matches!(
        issue,
        SpecIssue::InvalidTarget { key, target } if key == "q1" && target == "q2"
    )));
}

#[test]
fn lint_flags_duplicate_keys_and_option_misuse() {
    let mut form = role_form();
    form.questions.push(question("q1", QuestionType::ShortText, false));
    let mut texty = question("q4", QuestionType::ShortText, false);
    texty.options = vec!["stray".into()];
    form.questions.push(texty);
    let bare_choice = question("q5", QuestionType::MultiChoice, false);
    form.questions.push(bare_choice);

    let issues = form.lint();
    assert!(issues
        .iter()
        .any(|issue| matches!(issue, SpecIssue::DuplicateKey { key } if key == "q1")));
    assert!(issues
        .iter()
        .any(|issue| matches!(issue, SpecIssue::OptionsOnNonChoice { key, .. } if key == "q4")));
    assert!(issues
        .iter()
        .any(|issue| matches!(issue, SpecIssue::EmptyOptions { key } if key == "q5")));
}

#[test]
fn lint_flags_unknown_combinator() {
    let mut form = role_form();
    form.questions[1].visible_if = Some(
        serde_json::from_value(json!({
            "combinator": "XOR",
            "conditions": [
                { "target_key": "q1", "operator": "equals", "value": "Engineer" }
            ]
        }))
        .expect("deserialize"),
    );

    let issues = form.lint();
    assert!(issues
        .iter()
        .any(|issue| matches!(issue, SpecIssue::UnknownCombinator { key } if key == "q2")));
}

#[test]
fn clean_form_lints_clean() {
    assert!(role_form().lint().is_empty());
}
