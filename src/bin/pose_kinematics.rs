//! pose-kinematics CLI
//!
//! Runs the analysis steps named on the command line (or in the settings
//! document) against one settings file.
//!
//! ```text
//! pose-kinematics --config configs/config.yaml --steps compute_scalars build_histograms
//! pose-kinematics --use-ablation --steps replace_syllables build_histograms
//! ```

use anyhow::Context;
use clap::Parser;
use pose_kinematics::config::{PathOverrides, Settings, DEFAULT_ABLATION_TAG};
use pose_kinematics::pipeline::{Pipeline, StepOutcome};
use pose_kinematics::Error;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "configs/config.yaml";

/// Kinematic feature extraction and histogram analysis of pose trajectories
#[derive(Parser, Debug)]
#[command(name = "pose-kinematics", version, about)]
struct Cli {
    /// Settings document (YAML); defaults apply when the default file is absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override paths.pose_dir
    #[arg(long)]
    pose_dir: Option<PathBuf>,

    /// Override paths.group_index_csv
    #[arg(long)]
    index_csv: Option<PathBuf>,

    /// Override paths.results_dir
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Override paths.histogram_dir
    #[arg(long)]
    histogram_dir: Option<PathBuf>,

    /// Override paths.figures_dir
    #[arg(long)]
    figures_dir: Option<PathBuf>,

    /// Steps to run, in order (default: analysis.steps)
    #[arg(long, num_args = 0..)]
    steps: Vec<String>,

    /// Read histogram inputs from the ablation output and tag the output folder
    #[arg(long)]
    use_ablation: bool,

    /// Histogram folder suffix with --use-ablation
    #[arg(long, default_value = DEFAULT_ABLATION_TAG)]
    ablation_tag: String,
}

fn load_settings(explicit: Option<&Path>) -> anyhow::Result<(Settings, PathBuf)> {
    let path = explicit.map_or_else(|| PathBuf::from(DEFAULT_CONFIG), Path::to_path_buf);
    match Settings::load(&path) {
        Ok(settings) => Ok((settings, path)),
        Err(Error::MissingInput(_)) if explicit.is_none() => {
            warn!(path = %path.display(), "Settings file not found, using defaults");
            Ok((Settings::default(), path))
        }
        Err(e) => Err(e).with_context(|| format!("Failed to load {}", path.display())),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let (mut settings, config_path) = load_settings(cli.config.as_deref())?;

    settings.apply_overrides(&PathOverrides {
        pose_dir: cli.pose_dir,
        group_index_csv: cli.index_csv,
        results_dir: cli.results_dir,
        histogram_dir: cli.histogram_dir,
        figures_dir: cli.figures_dir,
    });
    let steps = if cli.steps.is_empty() {
        settings.analysis.steps.clone()
    } else {
        cli.steps
    };
    info!(config = %config_path.display(), ?steps, "Starting run");

    if cli.use_ablation {
        settings.apply_ablation(&cli.ablation_tag);
        info!(
            scalars_csv = %settings.paths.scalars_csv().display(),
            histogram_dir = %settings.paths.histogram_dir().display(),
            "Ablation inputs selected"
        );
    }

    let root = std::env::current_dir().context("Cannot determine working directory")?;
    settings
        .resolve_paths(&root)
        .context("Failed to prepare output directories")?;

    let reports = Pipeline::new(settings).run(&steps)?;
    for report in &reports {
        match &report.outcome {
            StepOutcome::Completed { outputs } => {
                info!(step = %report.step, files = outputs.len(), "Completed");
            }
            StepOutcome::Skipped { reason } => {
                info!(step = %report.step, %reason, "Skipped");
            }
        }
    }
    Ok(())
}
