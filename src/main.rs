use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod classifier;
mod ingest;
mod models;
mod report;
mod risk;
mod server;

use classifier::RiskModel;
use server::AppState;

#[derive(Parser)]
#[command(name = "student-risk-analyzer")]
#[command(about = "Student dropout risk analysis service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP analysis service
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 5001)]
        port: u16,
        /// Trained classifier artifact; rule-based scoring when omitted
        #[arg(long)]
        model: Option<PathBuf>,
    },
    /// Assess a single student from a JSON request document
    Analyze {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        model: Option<PathBuf>,
    },
    /// Assess a CSV file row by row
    Batch {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        model: Option<PathBuf>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown report from a CSV file
    Report {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        model: Option<PathBuf>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port, model } => {
            let state = AppState {
                model: load_model(model.as_deref())?,
            };
            server::serve(&host, port, state).await?;
        }
        Commands::Analyze { input, model } => {
            let model = load_model(model.as_deref())?;
            let data = std::fs::read_to_string(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let request: models::AnalyzeRequest = serde_json::from_str(&data)
                .with_context(|| format!("failed to parse {}", input.display()))?;
            let subjects = request
                .subjects
                .context("input document has no subjects field")?;

            let assessment = risk::assess(&subjects, request.fees_paid, model.as_deref());
            println!("{}", serde_json::to_string_pretty(&assessment)?);
        }
        Commands::Batch { csv, model, limit } => {
            let model = load_model(model.as_deref())?;
            let file = std::fs::File::open(&csv)
                .with_context(|| format!("failed to open {}", csv.display()))?;
            let batch = ingest::assess_csv(file, model.as_deref());

            if batch.results.is_empty() {
                println!("No assessable rows in {}.", csv.display());
            } else {
                let mut ranked = batch.results.clone();
                ranked.sort_by(|a, b| {
                    b.assessment
                        .predicted_risk_score
                        .partial_cmp(&a.assessment.predicted_risk_score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });

                println!("Highest risk rows:");
                for row in ranked.iter().take(limit) {
                    println!(
                        "- {} (row {}) {} risk, score {:.3}: {}",
                        row.name,
                        row.row,
                        row.assessment.risk_level,
                        row.assessment.predicted_risk_score,
                        row.assessment.factors.join("; ")
                    );
                }
            }

            if !batch.skipped.is_empty() {
                println!("Skipped {} rows:", batch.skipped.len());
                for skip in &batch.skipped {
                    println!("- row {}: {}", skip.row, skip.reason);
                }
            }
        }
        Commands::Report { csv, model, out } => {
            let model = load_model(model.as_deref())?;
            let file = std::fs::File::open(&csv)
                .with_context(|| format!("failed to open {}", csv.display()))?;
            let batch = ingest::assess_csv(file, model.as_deref());
            let report = report::build_report(
                &csv.display().to_string(),
                chrono::Utc::now().date_naive(),
                &batch,
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn load_model(path: Option<&Path>) -> anyhow::Result<Option<Arc<RiskModel>>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let model = RiskModel::load(path)?;
    info!(path = %path.display(), trees = model.tree_count(), "classifier loaded");
    Ok(Some(Arc::new(model)))
}
