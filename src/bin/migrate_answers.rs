//! Move legacy single answers into the expected-answer table.
//!
//! Usage: `migrate_answers [--live [--yes]] | --verify`
//!
//! Without flags the migration only reports what it would write.

use std::io::{BufRead, Write};
use std::process::ExitCode;

use quizparty::config::AppConfig;
use quizparty::migrate::{self, MigrationMode, MigrationReport, VerifyReport};
use quizparty::store::ContentStore;

#[derive(Debug, PartialEq)]
enum Command {
    Migrate { mode: MigrationMode, assume_yes: bool },
    Verify,
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut live = false;
    let mut assume_yes = false;
    let mut verify = false;
    for arg in args {
        match arg.as_str() {
            "--live" => live = true,
            "--yes" | "-y" => assume_yes = true,
            "--verify" => verify = true,
            other => return Err(format!("unknown argument: {}", other)),
        }
    }
    if verify {
        if live {
            return Err("--verify cannot be combined with --live".to_string());
        }
        return Ok(Command::Verify);
    }
    let mode = if live {
        MigrationMode::Live
    } else {
        MigrationMode::Preview
    };
    Ok(Command::Migrate { mode, assume_yes })
}

fn confirm() -> bool {
    print!("This writes expected answers to the content file. Type 'yes' to continue: ");
    if std::io::stdout().flush().is_err() {
        return false;
    }
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(_) => line.trim() == "yes",
        Err(_) => false,
    }
}

fn print_migration(report: &MigrationReport) {
    let label = if report.live { "LIVE" } else { "PREVIEW" };
    println!("=== Answer migration ({}) ===", label);
    for plan in &report.planned {
        println!(
            "  question {:>5}: {:?} -> {:?} [{:?}] hint {:?}",
            plan.question_id, plan.answer_raw, plan.answer_normalized, plan.input_type, plan.hint
        );
    }
    println!("Questions with legacy answers: {}", report.processed);
    println!(
        "{}: {}",
        if report.live { "Migrated" } else { "Would migrate" },
        report.migrated
    );
    println!("Skipped (already migrated): {}", report.skipped);
    if !report.failures.is_empty() {
        println!("Failures: {}", report.failures.len());
        for failure in &report.failures {
            println!("  question {}: {}", failure.question_id, failure.reason);
        }
    }
}

fn print_verify(report: &VerifyReport) {
    println!("=== Verification ===");
    println!(
        "Questions with legacy answers: {}",
        report.questions_with_answers
    );
    println!("Expected answer rows: {}", report.expected_rows);
    if report.is_complete() {
        println!("Every question with a legacy answer has expected answers");
    } else {
        println!("Missing expected answers for: {:?}", report.missing);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quizparty=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("Usage: migrate_answers [--live [--yes]] | --verify");
            return ExitCode::from(2);
        }
    };

    let config = AppConfig::from_env();
    let store = match ContentStore::load_from_path(&config.content_path).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!(
                "Failed to load {}: {}",
                config.content_path.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };

    match command {
        Command::Verify => {
            let report = migrate::verify(&store).await;
            print_verify(&report);
            if report.is_complete() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Command::Migrate { mode, assume_yes } => {
            if mode == MigrationMode::Live && !assume_yes && !confirm() {
                println!("Aborted");
                return ExitCode::FAILURE;
            }

            let report = migrate::run_migration(&store, mode).await;
            print_migration(&report);
            if mode == MigrationMode::Preview {
                return if report.is_success() {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                };
            }

            if let Err(e) = store.save_to_path(&config.content_path).await {
                eprintln!("Failed to save {}: {}", config.content_path.display(), e);
                return ExitCode::FAILURE;
            }
            let verification = migrate::verify(&store).await;
            print_verify(&verification);
            if report.is_success() && verification.is_complete() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
