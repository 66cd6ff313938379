use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use agrocontract::config::PipelineConfig;
use agrocontract::pipeline::merge::BatchRunner;
use agrocontract::wizard::{Wizard, WizardError};

#[derive(Parser, Debug)]
#[command(author, version, about = "Contract proposals to contract data")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract and merge proposal files, in the order given.
    Extract {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Pipeline configuration (JSON).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the template dictionary instead of the merged record.
        #[arg(long)]
        render: bool,

        /// Signing date for --render (YYYY-MM-DD). Defaults to today.
        #[arg(long, value_parser = parse_date)]
        signed_on: Option<NaiveDate>,
    },
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    agrocontract::init_tracing();
    let args = Args::parse();

    match args.command {
        Command::Extract {
            files,
            config,
            render,
            signed_on,
        } => {
            let config = match config {
                Some(path) => PipelineConfig::from_json_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => PipelineConfig::default(),
            };
            extract(files, config, render, signed_on).await
        }
    }
}

async fn extract(
    files: Vec<PathBuf>,
    config: PipelineConfig,
    render: bool,
    signed_on: Option<NaiveDate>,
) -> Result<()> {
    let runner = BatchRunner::with_default_extractors(config);
    let outcome = runner.run_paths(&files).await;
    let warnings = outcome.as_ref().map(|o| o.warnings()).unwrap_or_default();

    let mut wizard = Wizard::new();
    if let Err(e) = wizard.accept_batch(outcome) {
        bail!("{e}");
    }
    for warning in &warnings {
        tracing::info!(%warning, "Extraction warning");
    }
    for notice in wizard.notices() {
        eprintln!("{notice}");
    }

    let record = wizard.record().cloned().unwrap_or_default();
    if !render {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    match wizard.submit_review(record.clone()) {
        Ok(()) => {
            let signed_on = signed_on.unwrap_or_else(|| Local::now().date_naive());
            let data = wizard.generate(signed_on)?;
            println!("{}", serde_json::to_string_pretty(&data)?);
        }
        Err(WizardError::Invalid(issues)) => {
            for issue in &issues {
                eprintln!("{issue}");
            }
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
