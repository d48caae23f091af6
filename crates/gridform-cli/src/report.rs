use gridform_spec::{FieldMap, FormSpec, Question, SpecIssue, ValidationErrors};

pub fn print_issues(issues: &[SpecIssue]) {
    eprintln!("{} issue(s) found:", issues.len());
    for issue in issues {
        eprintln!(" - {issue}");
    }
}

pub fn print_visible(form: &FormSpec, visible: &[&Question], verbose: bool) {
    println!("Form: {}", form.name);
    println!("Visible questions:");
    for question in visible {
        let mut entry = format!(" - {} ({})", question.key, question.label);
        if question.required {
            entry.push_str(" [required]");
        }
        println!("{entry}");
    }
    if verbose {
        let hidden: Vec<&Question> = form
            .questions
            .iter()
            .filter(|question| !visible.iter().any(|shown| shown.key == question.key))
            .collect();
        if !hidden.is_empty() {
            println!("Hidden questions:");
            for question in hidden {
                println!(" - {} ({})", question.key, question.label);
            }
        }
    }
}

pub fn print_field_map(fields: &FieldMap) {
    println!("Valid. Field map:");
    for (field_name, value) in fields {
        println!(" - {field_name}: {value}");
    }
}

pub fn print_validation_errors(errors: &ValidationErrors) {
    eprintln!("Rejected with {} error(s):", errors.0.len());
    for error in &errors.0 {
        eprintln!(" - [{}] {}", error.question_key, error.message);
    }
}
