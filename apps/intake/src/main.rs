use std::{io::Write as _, path::PathBuf, sync::Arc};

use anyhow::{bail, Result};
use clap::Parser;
use client_core::{HttpSurveyBackend, StepError, StepId, StepResult, SurveyWizard};
use tracing::info;

mod answers;

use answers::{load_answers, Answers};

/// Fills in the store survey from an answers file and submits it.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    server_url: String,
    /// TOML file with one table per survey step.
    #[arg(long)]
    answers: PathBuf,
    /// Submit without asking for confirmation.
    #[arg(long)]
    yes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let answers = load_answers(&args.answers).await?;
    let backend = Arc::new(HttpSurveyBackend::new(args.server_url));
    let mut wizard = SurveyWizard::new(backend);
    info!(session = %wizard.session_id(), "survey started");

    fill_steps(&mut wizard, &answers).await?;

    println!("== {}", StepId::Confirmation.title());
    for (question, answer) in wizard.summary() {
        println!("{question}: {answer}");
    }

    if !args.yes && !confirm("この内容で送信しますか？ [y/N] ")? {
        println!("送信を中止しました");
        return Ok(());
    }

    wizard.submit().await?;
    println!("送信が完了しました");
    Ok(())
}

async fn fill_steps(wizard: &mut SurveyWizard, answers: &Answers) -> Result<()> {
    while let Some(step) = wizard.current_step() {
        let outcome: Result<StepResult, StepError> = match step {
            StepId::Store => answers.store.validate().map_err(Into::into),
            StepId::FacilityManager => answers.facility_manager.validate().map_err(Into::into),
            StepId::Photos => {
                answers
                    .photos
                    .submit(wizard.owner_name(), wizard.uploads())
                    .await
            }
            StepId::Construction => {
                answers
                    .construction
                    .submit(wizard.owner_name(), wizard.uploads())
                    .await
            }
            StepId::FacilityAccess => {
                answers
                    .facility_access
                    .submit(wizard.owner_name(), wizard.uploads())
                    .await
            }
            StepId::WorkDetails => answers.work_details.validate().map_err(Into::into),
            StepId::Confirmation => return Ok(()),
        };

        match outcome {
            Ok(result) => {
                wizard.advance(result)?;
            }
            Err(StepError::Validation(errors)) => {
                eprintln!("{} の入力内容を確認してください:", step.title());
                for error in &errors.0 {
                    eprintln!("  {}: {}", error.field, error.message);
                }
                bail!("{} step is invalid", step.title());
            }
            Err(StepError::Upload(error)) => bail!("{}: {error}", step.title()),
        }
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}
