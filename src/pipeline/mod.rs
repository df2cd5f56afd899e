//! Batch analysis driver
//!
//! Runs named steps in order against one [`Settings`]. A step whose input is
//! absent is skipped with a warning and the run continues; a schema problem
//! (for example a landmark column missing from a pose file) aborts the run.

mod ablation;
mod histograms;
mod preprocess;
mod recommend;
mod scalars;

pub use ablation::{ablation_output_path, resample_excluded, SYLLABLE_COLUMN};
pub use preprocess::drop_incomplete_rows;

use crate::config::Settings;
use crate::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

/// A runnable analysis step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Drop incomplete rows from raw tables
    Preprocess,
    /// Pose files → scalar summary table
    ComputeScalars,
    /// Scalar table → bin-count recommendations
    OptimizeBins,
    /// Scalar table + group index → histograms and summaries
    BuildHistograms,
    /// Resample rows of excluded syllables
    ReplaceSyllables,
}

impl Step {
    /// Every step, in natural run order
    pub const ALL: [Self; 5] = [
        Self::Preprocess,
        Self::ComputeScalars,
        Self::OptimizeBins,
        Self::BuildHistograms,
        Self::ReplaceSyllables,
    ];

    /// Step name as written in settings and on the command line
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Preprocess => "preprocess",
            Self::ComputeScalars => "compute_scalars",
            Self::OptimizeBins => "optimize_bins",
            Self::BuildHistograms => "build_histograms",
            Self::ReplaceSyllables => "replace_syllables",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Step {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|step| step.name() == s.trim())
            .ok_or_else(|| Error::InvalidInput(format!("Unknown step: {s}")))
    }
}

/// What a step did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step ran and wrote these files
    Completed {
        /// Files written, in write order
        outputs: Vec<PathBuf>,
    },
    /// The step did not run
    Skipped {
        /// Human-readable cause
        reason: String,
    },
}

impl StepOutcome {
    pub(crate) fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    /// True for [`StepOutcome::Completed`]
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Files written (empty when skipped)
    #[must_use]
    pub fn outputs(&self) -> &[PathBuf] {
        match self {
            Self::Completed { outputs } => outputs,
            Self::Skipped { .. } => &[],
        }
    }
}

/// Outcome of one requested step name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// Requested name
    pub step: String,
    /// Result
    pub outcome: StepOutcome,
}

/// Executes steps against resolved settings
#[derive(Debug, Clone)]
pub struct Pipeline {
    settings: Settings,
}

impl Pipeline {
    /// Create a pipeline; paths in `settings` should already be resolved
    #[must_use]
    pub const fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Settings in use
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run steps by name, in order
    ///
    /// Unknown names are reported as skipped.
    ///
    /// # Errors
    /// Returns the first error that is not a missing input
    pub fn run<S: AsRef<str>>(&self, steps: &[S]) -> Result<Vec<StepReport>> {
        let mut reports = Vec::with_capacity(steps.len());
        for name in steps {
            let name = name.as_ref();
            let outcome = match name.parse::<Step>() {
                Ok(step) => self.run_step(step)?,
                Err(_) => {
                    warn!(step = name, "No such step, skipping");
                    StepOutcome::skipped(format!("unknown step '{name}'"))
                }
            };
            reports.push(StepReport {
                step: name.to_string(),
                outcome,
            });
        }
        info!(steps = reports.len(), "Pipeline complete");
        Ok(reports)
    }

    /// Run a single step
    ///
    /// # Errors
    /// Returns the step's error unless it is [`Error::MissingInput`], which
    /// becomes [`StepOutcome::Skipped`]
    pub fn run_step(&self, step: Step) -> Result<StepOutcome> {
        info!(%step, "Running step");
        let result = match step {
            Step::Preprocess => preprocess::run(&self.settings),
            Step::ComputeScalars => scalars::run(&self.settings),
            Step::OptimizeBins => recommend::run(&self.settings),
            Step::BuildHistograms => histograms::run(&self.settings),
            Step::ReplaceSyllables => ablation::run(&self.settings),
        };
        match result {
            Ok(StepOutcome::Skipped { reason }) => {
                warn!(%step, %reason, "Step skipped");
                Ok(StepOutcome::Skipped { reason })
            }
            Ok(outcome) => {
                for path in outcome.outputs() {
                    info!(%step, path = %path.display(), "Wrote");
                }
                Ok(outcome)
            }
            Err(Error::MissingInput(path)) => {
                warn!(%step, path = %path.display(), "Input not found, step skipped");
                Ok(StepOutcome::skipped(format!(
                    "input not found: {}",
                    path.display()
                )))
            }
            Err(e) => Err(e),
        }
    }
}

/// Log parameters as one JSON object
pub(crate) fn log_parameters<T: serde::Serialize>(step: Step, params: &T) {
    match serde_json::to_string(params) {
        Ok(json) => info!(%step, parameters = %json, "Effective parameters"),
        Err(e) => warn!(%step, error = %e, "Could not serialize parameters"),
    }
}
