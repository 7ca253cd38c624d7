use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hijab_core::labeler::BatchRange;
use hijab_core::{extractor, labeler, materializer, OnnxGenderClassifier, ScrfdDetector};
use tracing_subscriber::EnvFilter;

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "hijab", about = "Build the labeled face dataset for hijab classification")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect and align every face in the source images
    Extract,
    /// Predict gender for one batch of aligned faces
    Label {
        /// Batch number; selects faces [batch * size, batch * size + size)
        batch: usize,
    },
    /// Copy curated images and their first face into the labeled-set folders
    Materialize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Commands::Extract => {
            let model = config.scrfd_model_path();
            let mut detector = ScrfdDetector::load(&model)
                .with_context(|| format!("loading detector {}", model.display()))?;
            extractor::extract_faces(&config.layout(), &mut detector, config.face_size)?;
        }
        Commands::Label { batch } => {
            let range = BatchRange::for_batch(batch, config.batch_size)?;
            let model = config.gender_model_path();
            let mut classifier = OnnxGenderClassifier::load(&model)
                .with_context(|| format!("loading gender model {}", model.display()))?;
            let out = labeler::label_batch(&config.layout(), range, &mut classifier, &config.output_dir)?;
            println!("{}", out.display());
        }
        Commands::Materialize => {
            materializer::materialize(&config.layout(), &config.labels_path)?;
        }
    }

    Ok(())
}
