use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use predicates::prelude::*;

const FORM: &str = r#"{
  "id": "role-form",
  "name": "Role form",
  "store_id": "app1",
  "table_id": "tbl1",
  "published": true,
  "questions": [
    {
      "key": "q1",
      "field_id": "fld1",
      "field_name": "Role",
      "label": "Your role",
      "type": "singleChoice",
      "options": ["Engineer", "Designer"],
      "required": true
    },
    {
      "key": "q2",
      "field_id": "fld2",
      "field_name": "GitHub",
      "label": "GitHub URL",
      "type": "shortText",
      "required": true,
      "visible_if": {
        "combinator": "AND",
        "conditions": [
          { "target_key": "q1", "operator": "equals", "value": "Engineer" }
        ]
      }
    }
  ]
}"#;

fn gridform() -> Command {
    Command::cargo_bin("gridform").expect("binary built")
}

fn write_form(dir: &TempDir) -> std::path::PathBuf {
    let file = dir.child("form.json");
    file.write_str(FORM).expect("write form");
    file.path().to_path_buf()
}

#[test]
fn lint_accepts_a_clean_form() {
    let dir = TempDir::new().expect("tempdir");
    let form = write_form(&dir);

    gridform()
        .args(["lint", "--form"])
        .arg(&form)
        .assert()
        .success()
        .stdout(predicate::str::contains("ok (2 questions)"));
}

#[test]
fn lint_rejects_forward_rule_targets() {
    let dir = TempDir::new().expect("tempdir");
    let broken = FORM.replace("\"target_key\": \"q1\"", "\"target_key\": \"q9\"");
    let file = dir.child("broken.json");
    file.write_str(&broken).expect("write form");

    gridform()
        .args(["lint", "--form"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("q9"));
}

#[test]
fn preview_hides_gated_questions() {
    let dir = TempDir::new().expect("tempdir");
    let form = write_form(&dir);
    let answers = dir.child("answers.json");
    answers
        .write_str(r#"{ "q1": "Designer" }"#)
        .expect("write answers");

    gridform()
        .args(["preview", "--form"])
        .arg(&form)
        .args(["--answers"])
        .arg(answers.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("q1").and(predicate::str::contains("q2").not()));
}

#[test]
fn preview_shows_gated_questions_when_rule_matches() {
    let dir = TempDir::new().expect("tempdir");
    let form = write_form(&dir);
    let answers = dir.child("answers.json");
    answers
        .write_str(r#"{ "q1": "Engineer" }"#)
        .expect("write answers");

    gridform()
        .args(["preview", "--form"])
        .arg(&form)
        .args(["--answers"])
        .arg(answers.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("q2 (GitHub URL) [required]"));
}

#[test]
fn validate_prints_the_field_map() {
    let dir = TempDir::new().expect("tempdir");
    let form = write_form(&dir);
    let answers = dir.child("answers.json");
    answers
        .write_str(r#"{ "q1": "Engineer", "q2": "https://github.com/x" }"#)
        .expect("write answers");

    gridform()
        .args(["validate", "--form"])
        .arg(&form)
        .args(["--answers"])
        .arg(answers.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Role: \"Engineer\"")
                .and(predicate::str::contains("GitHub: \"https://github.com/x\"")),
        );
}

#[test]
fn validate_reports_missing_required_answers() {
    let dir = TempDir::new().expect("tempdir");
    let form = write_form(&dir);
    let answers = dir.child("answers.json");
    answers
        .write_str(r#"{ "q1": "Engineer" }"#)
        .expect("write answers");

    gridform()
        .args(["validate", "--form"])
        .arg(&form)
        .args(["--answers"])
        .arg(answers.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("GitHub URL is required"));
}
