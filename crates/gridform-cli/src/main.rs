mod report;

use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use gridform_spec::{FormSpec, answer_map, validate, visible_questions};
use gridform_sync::{
    HttpRecordStore, MemoryCursorStore, MemoryResponseStore, Reconciler, StaticToken,
    Subscription, WorkerConfig, WorkerSet,
};
use report::{print_field_map, print_issues, print_validation_errors, print_visible};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Gridform form tooling",
    long_about = "Lints form definitions, previews conditional visibility, validates answer payloads, and runs the change-feed sync worker."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a form definition for structural problems.
    Lint {
        /// Path to the form JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
    },
    /// Show which questions are visible for a partial answer set.
    Preview {
        /// Path to the form JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Optional JSON file with the answers so far.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// Also list hidden questions.
        #[arg(long)]
        verbose: bool,
    },
    /// Validate an answers file and print the resulting field map.
    Validate {
        /// Path to the form JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Path to the answers JSON file.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Run the reconciliation worker for a form's subscription.
    Sync {
        /// Path to the form JSON (must carry a subscription id).
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Base URL of the record-store API.
        #[arg(long, value_name = "URL")]
        base_url: String,
        /// Safety-net re-poll interval in seconds.
        #[arg(long, value_name = "SECS", default_value = "300")]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> CliResult<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,gridform_sync=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Lint { form } => run_lint(form),
        Command::Preview {
            form,
            answers,
            verbose,
        } => run_preview(form, answers, verbose),
        Command::Validate { form, answers } => run_validate(form, answers),
        Command::Sync {
            form,
            base_url,
            interval,
        } => run_sync(form, base_url, interval).await,
    }
}

fn load_form(path: &PathBuf) -> CliResult<FormSpec> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn load_answers(path: Option<&PathBuf>) -> CliResult<Value> {
    match path {
        Some(path) => {
            let raw = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&raw)?)
        }
        None => Ok(Value::Object(Default::default())),
    }
}

fn run_lint(path: PathBuf) -> CliResult<()> {
    let form = load_form(&path)?;
    let issues = form.lint();
    if issues.is_empty() {
        println!("{}: ok ({} questions)", form.name, form.questions.len());
        return Ok(());
    }
    print_issues(&issues);
    std::process::exit(1);
}

fn run_preview(path: PathBuf, answers: Option<PathBuf>, verbose: bool) -> CliResult<()> {
    let form = load_form(&path)?;
    let answers = answer_map(&load_answers(answers.as_ref())?);
    let visible = visible_questions(&form.questions, &answers);
    print_visible(&form, &visible, verbose);
    Ok(())
}

fn run_validate(form_path: PathBuf, answers_path: PathBuf) -> CliResult<()> {
    let form = load_form(&form_path)?;
    let answers = load_answers(Some(&answers_path))?;
    match validate(&form, &answers) {
        Ok(fields) => {
            print_field_map(&fields);
            Ok(())
        }
        Err(errors) => {
            print_validation_errors(&errors);
            std::process::exit(1);
        }
    }
}

async fn run_sync(form_path: PathBuf, base_url: String, interval: u64) -> CliResult<()> {
    let form = load_form(&form_path)?;
    let subscription = Subscription::for_form(&form)
        .ok_or_else(|| format!("form '{}' has no subscription id", form.id))?;
    let token =
        env::var("GRIDFORM_TOKEN").map_err(|_| "GRIDFORM_TOKEN environment variable not set")?;

    let client = Arc::new(HttpRecordStore::new(base_url, Arc::new(StaticToken(token))));
    let reconciler = Arc::new(Reconciler::new(
        client,
        Arc::new(MemoryResponseStore::new()),
        Arc::new(MemoryCursorStore::new()),
    ));
    let workers = WorkerSet::new(
        reconciler,
        WorkerConfig {
            poll_interval: Duration::from_secs(interval),
        },
    );

    info!(subscription = %subscription.subscription_id, "sync running; press Ctrl-C to stop");
    workers.start_worker(subscription).await;

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "failed to listen for shutdown signal");
    }
    workers.shutdown().await;
    Ok(())
}
