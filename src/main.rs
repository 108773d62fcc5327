mod config;
mod generator;
mod ml;
mod types;
mod web;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::{ServeConfig, TrainConfig};
use generator::SyntheticGenerator;
use ml::dataset::{extract_labels, load_records};
use ml::ensemble::ForestParams;
use ml::persistence::{save_outcome, save_report};
use ml::{ModelArtifacts, Trainer, TrainingConfig};
use types::Record;
use web::{start_prediction_server, AppState};

#[derive(Parser)]
#[command(name = "fraud-scoring")]
#[command(version = "0.1.0")]
#[command(about = "Train a random-forest fraud model and serve predictions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the model from labeled CSV or JSON data
    Train {
        /// Input data file (default: INPUT_FILE or fraud.csv)
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Model output path (default: MODEL_OUT or rf_model.json)
        #[arg(long)]
        model_out: Option<PathBuf>,
        /// Scaler output path (default: SCALER_OUT or scaler.json)
        #[arg(long)]
        scaler_out: Option<PathBuf>,
        /// Encoder mapping output path (default: ENC_OUT or encoders.json)
        #[arg(long)]
        enc_out: Option<PathBuf>,
        /// Training report output path (default: REPORT_OUT or training_report.json)
        #[arg(long)]
        report_out: Option<PathBuf>,
        /// Number of trees
        #[arg(long, default_value = "200")]
        trees: usize,
        /// Maximum tree depth
        #[arg(long, default_value = "12")]
        max_depth: usize,
        /// Random seed for the split and the forest
        #[arg(long, default_value = "42")]
        seed: u64,
    },
    /// Serve POST /predict using artifacts from MODEL_IN, SCALER_IN and ENC_IN
    Serve {
        /// Bind host (default: HOST or 0.0.0.0)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (default: PORT or 5001)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Score a single JSON record file with the serving artifacts
    Score {
        /// Path to a JSON object
        record: PathBuf,
    },
    /// Write a synthetic labeled dataset
    Generate {
        /// Number of rows
        #[arg(short, long, default_value = "1000")]
        rows: usize,
        /// Share of rows with the injected fraud pattern
        #[arg(long, default_value = "0.1")]
        fraud_rate: f64,
        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Output CSV file path
        #[arg(short, long, default_value = "fraud.csv")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Fraud Scoring v0.1.0");

    match cli.command {
        Commands::Train {
            input,
            model_out,
            scaler_out,
            enc_out,
            report_out,
            trees,
            max_depth,
            seed,
        } => {
            let mut config = TrainConfig::from_env().context("Failed to read training configuration")?;
            if let Some(input) = input {
                config.input_file = input;
            }
            if let Some(path) = model_out {
                config.model_out = path;
            }
            if let Some(path) = scaler_out {
                config.scaler_out = path;
            }
            if let Some(path) = enc_out {
                config.enc_out = path;
            }
            if let Some(path) = report_out {
                config.report_out = path;
            }
            let forest = ForestParams::default().n_trees(trees).max_depth(max_depth).seed(seed);
            run_training(&config, forest, seed)?;
        }
        Commands::Serve { host, port } => {
            let mut config = ServeConfig::from_env().context("Failed to read server configuration")?;
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            run_server(config).await?;
        }
        Commands::Score { record } => {
            score_record(&record)?;
        }
        Commands::Generate {
            rows,
            fraud_rate,
            seed,
            output,
        } => {
            generate_dataset(rows, fraud_rate, seed, &output)?;
        }
    }

    Ok(())
}

fn run_training(config: &TrainConfig, forest: ForestParams, seed: u64) -> Result<()> {
    config
        .validate()
        .map_err(|errors| anyhow!("Invalid training configuration: {}", errors.join("; ")))?;

    info!("Loading training data from {}", config.input_file.display());
    let records = load_records(&config.input_file)
        .with_context(|| format!("Failed to load {}", config.input_file.display()))?;
    let data = extract_labels(records).context("Failed to read labels")?;
    info!(
        "{} labeled rows ({} fraud, {} dropped)",
        data.len(),
        data.positives(),
        data.dropped
    );

    let training = TrainingConfig {
        test_fraction: config.test_fraction,
        split_seed: seed,
        forest,
    };
    let outcome = Trainer::new(training).train(&data).context("Training failed")?;

    save_outcome(&config.artifact_paths(), &outcome).context("Failed to save model artifacts")?;
    save_report(&config.report_out, &outcome.report).context("Failed to save training report")?;

    outcome.report.print_summary();
    Ok(())
}

async fn run_server(config: ServeConfig) -> Result<()> {
    config
        .validate()
        .map_err(|errors| anyhow!("Invalid server configuration: {}", errors.join("; ")))?;

    let artifacts = ModelArtifacts::load(&config.artifact_paths())
        .context("Failed to load model artifacts")?;
    info!("Serving predictions from {}", artifacts.model_version());

    start_prediction_server(AppState::new(artifacts), &config.bind_addr()).await
}

fn score_record(path: &Path) -> Result<()> {
    let config = ServeConfig::from_env().context("Failed to read server configuration")?;
    let artifacts = ModelArtifacts::load(&config.artifact_paths())
        .context("Failed to load model artifacts")?;

    let body = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let record = Record::from_body(&body);
    let prediction = artifacts.predict(&record)?;

    println!("{}", serde_json::to_string_pretty(&prediction)?);
    Ok(())
}

fn generate_dataset(rows: usize, fraud_rate: f64, seed: u64, output: &Path) -> Result<()> {
    let records = SyntheticGenerator::new(fraud_rate, seed).generate(rows);
    generator::write_csv(output, &records)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let fraud = records
        .iter()
        .filter(|r| r.get(types::LABEL_COLUMN).and_then(|v| v.as_u64()) == Some(1))
        .count();
    info!("Wrote {} rows ({} fraud) to {}", rows, fraud, output.display());
    Ok(())
}
