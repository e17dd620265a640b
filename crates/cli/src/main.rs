//! Incubator project success predictor CLI
//!
//! Trains the success classifier from labeled CSV data, predicts the
//! success tier of a single project and inspects the stored model.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{dataset, inspect, predict, train};
use output::{print_error, LogFormat, OutputFormat};
use std::path::PathBuf;
use std::process::ExitCode;
use success_lib::{ModelStore, SuccessError, SuccessService};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Exit status used when no trained model is available
const EXIT_NOT_TRAINED: u8 = 2;

/// Incubator project success predictor
#[derive(Parser)]
#[command(name = "successctl")]
#[command(author, version, about = "CLI for the incubator project success predictor", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Model artifact location (overrides the config file)
    #[arg(long, global = true, env = "SUCCESS_MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Log line format on stderr
    #[arg(long, global = true, default_value = "text")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train the model from a labeled CSV and replace the stored artifact
    Train {
        /// CSV with description, outcome and optional progress, created_at columns
        csv: PathBuf,
    },

    /// Predict the success tier of one project
    Predict {
        /// Free-text project description
        #[arg(long, short, conflicts_with = "input")]
        description: Option<String>,

        /// Progress percentage (clamped to 0-100)
        #[arg(long, short, allow_hyphen_values = true, conflicts_with = "input")]
        progress: Option<i64>,

        /// Creation date, e.g. 2024-05-01 or an RFC 3339 timestamp
        #[arg(long, conflicts_with = "input")]
        created_at: Option<String>,

        /// JSON file holding a project record
        #[arg(long, short)]
        input: Option<PathBuf>,
    },

    /// Show metadata of the stored model
    Inspect,

    /// Write the built-in sample training set as CSV
    GenerateDataset {
        /// Output file path (stdout if omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn init_tracing(format: LogFormat) {
    let json = matches!(format, LogFormat::Json);
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut app_config = config::AppConfig::load(cli.config.as_deref())?;
    if let Some(path) = cli.model_path {
        app_config.model_path = path;
    }
    debug!(model_path = %app_config.model_path.display(), "Configuration loaded");

    let store = ModelStore::new(&app_config.model_path);

    match cli.command {
        Commands::Train { csv } => {
            let service = SuccessService::new(store, app_config.trainer);
            train::train(&service, &csv, cli.format).await?;
        }
        Commands::Predict {
            description,
            progress,
            created_at,
            input,
        } => {
            let service = SuccessService::new(store, app_config.trainer);
            let args = predict::RecordArgs {
                description,
                progress,
                created_at,
                input,
            };
            predict::predict(&service, args, cli.format)?;
        }
        Commands::Inspect => inspect::inspect(&store, cli.format)?,
        Commands::GenerateDataset { output } => dataset::generate(output.as_deref())?,
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(err) = e.downcast_ref::<SuccessError>() {
                if err.is_not_trained() {
                    print_error("No trained model available; train the model first (successctl train <csv>)");
                    return ExitCode::from(EXIT_NOT_TRAINED);
                }
            }
            print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
