//! FxFlow stage runner
//!
//! Runs one pipeline stage for one invocation event and prints the response.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{error, info};

use fxflow_common::FxFlowError;
use fxflow_pipeline::clients::{
    EnvSecretStore, FsObjectStore, HttpRateApi, LocalQueryEngine, LogMetricsSink, MetricsSink,
    ObjectStore, TextfileMetricsSink,
};
use fxflow_pipeline::config::{env_source, StorageConfig};
use fxflow_pipeline::logging::{self, LogFormat};
use fxflow_pipeline::{
    AnomalyConfig, AnomalyStage, IngestConfig, IngestStage, RunEvent, StageResponse,
    TransformConfig, TransformStage,
};

const DEFAULT_STORAGE_ROOT: &str = "./data";

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Stage {
    Ingest,
    Transform,
    Anomaly,
}

/// FxFlow daily FX pipeline
#[derive(Parser, Debug)]
#[command(name = "fxflow")]
#[command(about = "Run one stage of the daily FX pipeline")]
struct Args {
    /// Stage to run
    #[arg(value_enum)]
    stage: Stage,

    /// Run timestamp; the stage works on the UTC day before it
    #[arg(long, conflicts_with = "event", required_unless_present = "event")]
    run_date: Option<String>,

    /// Full invocation event as JSON, e.g. '{"run_date": "2024-03-02T06:00:00Z"}'
    #[arg(long)]
    event: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let format = env_source("LOG_FORMAT")
        .and_then(|v| v.parse::<LogFormat>().ok())
        .unwrap_or_default();
    logging::init(format);

    info!(stage = ?args.stage, "Starting FxFlow stage");

    match run(args).await {
        Ok(response) => match serde_json::to_string_pretty(&response) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "Cannot serialize response");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!(error = %format!("{e:#}"), "Stage failed");
            match e.downcast_ref::<FxFlowError>() {
                Some(FxFlowError::Configuration(_)) => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

async fn run(args: Args) -> anyhow::Result<StageResponse> {
    let event = match (args.run_date, args.event) {
        (Some(run_date), _) => RunEvent::new(run_date),
        (None, Some(raw)) => {
            serde_json::from_str(&raw).context("--event is not a valid run event")?
        }
        (None, None) => anyhow::bail!("either --run-date or --event is required"),
    };
    info!(run_date = %event.run_date, "Received event");

    let root = env_source("STORAGE_ROOT").unwrap_or_else(|| DEFAULT_STORAGE_ROOT.to_string());
    let store: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(PathBuf::from(root)));

    let response = match args.stage {
        Stage::Ingest => {
            let config = IngestConfig::from_env()?;
            let api = Arc::new(HttpRateApi::new(&config.api)?);
            IngestStage::new(config, Arc::new(EnvSecretStore::new()), api, store)
                .run(&event)
                .await?
        }
        Stage::Transform => {
            let config = TransformConfig::from_env()?;
            TransformStage::new(config, store).run(&event).await?
        }
        Stage::Anomaly => {
            let config = AnomalyConfig::from_env()?;
            let storage = StorageConfig::from_env()?;
            let engine = Arc::new(LocalQueryEngine::new(store, storage.bucket));
            let metrics: Arc<dyn MetricsSink> = match &config.metrics.textfile {
                Some(path) => Arc::new(TextfileMetricsSink::new(path.clone())),
                None => Arc::new(LogMetricsSink),
            };
            AnomalyStage::new(config, engine, metrics).run(&event).await?
        }
    };

    Ok(response)
}
