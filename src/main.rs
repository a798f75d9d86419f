// voxcheck CLI
// Offline training and one-shot classification entrypoints

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use voxcheck::classifier::ForestConfig;
use voxcheck::service::{train_model, PipelineConfig, PredictionService, SharedEngine};
use voxcheck::state;
use voxcheck::{AudioSource, MfccConfig};

#[derive(Parser)]
#[command(name = "voxcheck", about = "Deepfake voice screening", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train a model from a labeled corpus (root/real/*.wav, root/fake/*.wav)
    Train {
        /// Dataset root directory
        dataset_root: PathBuf,

        /// Where to write the model artifact (defaults to the app data dir)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Number of trees in the ensemble
        #[arg(long, default_value_t = 50)]
        trees: usize,

        /// Number of MFCC coefficients (the feature vector length K)
        #[arg(long, default_value_t = 10)]
        coefficients: usize,
    },

    /// Classify a WAV file as REAL or FAKE
    Classify {
        /// Audio file to classify
        input: PathBuf,

        /// Model artifact to load (defaults to the app data dir)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Record the prediction under this user key
        #[arg(long)]
        user: Option<String>,

        /// History database path (defaults to the app data dir)
        #[arg(long)]
        history: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Train {
            dataset_root,
            model,
            trees,
            coefficients,
        } => run_train(dataset_root, model, trees, coefficients),
        Command::Classify {
            input,
            model,
            user,
            history,
        } => run_classify(input, model, user, history),
    }
}

fn run_train(
    dataset_root: PathBuf,
    model: Option<PathBuf>,
    trees: usize,
    coefficients: usize,
) -> anyhow::Result<()> {
    let config = PipelineConfig {
        mfcc: MfccConfig {
            coefficient_count: coefficients,
            ..MfccConfig::default()
        },
        trainer: voxcheck::classifier::TrainerConfig {
            forest: ForestConfig {
                n_trees: trees,
                ..ForestConfig::default()
            },
            ..voxcheck::classifier::TrainerConfig::default()
        },
        ..PipelineConfig::default()
    };

    let (artifact, report) =
        train_model(&dataset_root, &config).context("training failed")?;

    let model_path = match model {
        Some(path) => path,
        None => state::default_model_path().context("no writable data directory")?,
    };
    artifact.save(&model_path).context("saving model artifact")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("model written to {}", model_path.display());
    Ok(())
}

fn run_classify(
    input: PathBuf,
    model: Option<PathBuf>,
    user: Option<String>,
    history: Option<PathBuf>,
) -> anyhow::Result<()> {
    let model_path = match model {
        Some(path) => path,
        None => state::default_model_path().context("no writable data directory")?,
    };

    let engine = SharedEngine::load(&model_path)
        .with_context(|| format!("loading model from {}", model_path.display()))?;

    // Serve with the K the artifact was trained on
    let k = engine
        .current()
        .context("no model installed")?
        .coefficient_count();
    let config = PipelineConfig {
        mfcc: MfccConfig {
            coefficient_count: k,
            ..MfccConfig::default()
        },
        ..PipelineConfig::default()
    };

    let service = PredictionService::new(engine, &config);
    let source = AudioSource::from_path(&input);
    let result = service.classify(&source).context("classification failed")?;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if let Some(user_key) = user {
        let db = match history {
            Some(path) => state::init_db_at(&path)?,
            None => state::init_db()?,
        };
        let bytes = std::fs::read(&input)?;
        let sha256 = state::calculate_sha256(&bytes);
        let record = state::store_prediction(&db, &user_key, &source.name(), &sha256, &result)?;
        log::info!("stored prediction {} for user {}", record.id, user_key);
    }

    Ok(())
}
