//! Persea mite detector CLI
//!
//! 撮影またはギャラリーの画像を Healthy / Plague に分類します。

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use mite_detector_lib::commands::{self, OutputFormat};
use mite_detector_lib::logging::{init_logging, LogConfig};
use mite_detector_lib::model::AppConfig;

/// Classify leaf photos as Healthy or Plague with an on-device model
#[derive(Parser, Debug)]
#[command(name = "mite_detector")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Model bundle, overrides the configured path
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Print results as JSON
    #[arg(long, default_value = "false")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Take a picture with the configured camera command and classify it
    Camera,

    /// Classify an image selected from the gallery (path or file:// URI)
    Gallery {
        handle: String,
    },

    /// Classify every png/jpg/jpeg file in a directory
    Batch {
        dir: PathBuf,

        /// Write results as CSV
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Interactive console session
    Interactive,

    /// Create a randomly initialised model bundle
    InitModel {
        output: PathBuf,

        /// Width of the first convolution block
        #[arg(long, default_value = "16")]
        base_filters: usize,
    },

    /// Show configuration and model information
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else if cli.json || matches!(cli.command, Commands::Interactive) {
        LogConfig::quiet()
    } else {
        LogConfig::default()
    };
    init_logging(&log_config)?;

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load_or_default_from(&config_path);
    if let Some(model) = &cli.model {
        config.set_model_path(model.to_string_lossy().into_owned());
    }

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let output = match &cli.command {
        Commands::Camera => commands::run_camera(&config, format).await?,
        Commands::Gallery { handle } => commands::run_gallery(&config, handle, format)?,
        Commands::Batch { dir, report } => {
            commands::run_batch(&config, dir, report.as_deref(), format)?
        }
        Commands::Interactive => {
            commands::run_interactive(&config, format).await?;
            return Ok(());
        }
        Commands::InitModel { output, base_filters } => {
            commands::run_init_model(output, *base_filters)?
        }
        Commands::Info => commands::run_info(&config)?,
    };

    println!("{}", output);
    Ok(())
}
