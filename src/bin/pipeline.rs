/// Пакетные задачи: артефакты, обучение, прогноз по выгрузке

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use flat_price::artifacts::{self, CALIBRATION_CONTEXT};
use flat_price::dataset::{read_listings, write_predictions};
use flat_price::pipeline::{self, PreparedCorpus};
use flat_price::{AppSettings, ArtifactSnapshot, CalibrationContext, FsArtifactStore};

#[derive(Parser)]
#[command(name = "flat-price-pipeline", about = "Batch jobs for the flat price model")]
struct Cli {
    /// Каталог артефактов
    #[arg(long, env = "FLAT_PRICE_ARTIFACTS")]
    artifacts: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Построить частоты комбинаций, порог площади, медиану расстояния и калибровочный контекст
    BuildArtifacts {
        #[arg(long)]
        data: PathBuf,
    },
    /// Обучить ансамбль
    Train {
        #[arg(long)]
        data: PathBuf,
    },
    /// Прогноз с калибровкой для выгрузки
    Predict {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = AppSettings::from_env();
    let config = settings.pipeline_config().context("Failed to load pipeline config")?;
    let store = FsArtifactStore::new(cli.artifacts.unwrap_or(settings.artifacts_dir));

    match cli.command {
        Command::BuildArtifacts { data } => {
            let raw = read_listings(&data).with_context(|| format!("Failed to read {}", data.display()))?;
            let corpus = PreparedCorpus::prepare(&raw, &config);
            pipeline::build_artifacts(&corpus, &config, &store).context("Artifact construction failed")?;
            tracing::info!("Artifacts published to {}", store.root().display());
        }
        Command::Train { data } => {
            let raw = read_listings(&data).with_context(|| format!("Failed to read {}", data.display()))?;
            let corpus = PreparedCorpus::prepare(&raw, &config);
            pipeline::train(&corpus, &config, &store).context("Training failed")?;
        }
        Command::Predict { data, output } => {
            let raw = read_listings(&data).with_context(|| format!("Failed to read {}", data.display()))?;
            let corpus = PreparedCorpus::prepare(&raw, &config);

            tracing::info!("Loading trained models...");
            let snapshot = ArtifactSnapshot::load(&store)?;
            let calibration: CalibrationContext = artifacts::load_json(&store, CALIBRATION_CONTEXT)?;
            let ensemble = pipeline::load_ensemble(&store)?;

            let predictions = pipeline::predict_batch(&corpus, &config, &snapshot, &calibration, &ensemble)?;
            write_predictions(&output, &predictions)?;
        }
    }

    Ok(())
}
