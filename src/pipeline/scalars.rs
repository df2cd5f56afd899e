//! Pose files → scalar summary table

use super::{log_parameters, Step, StepOutcome};
use crate::config::Settings;
use crate::features::compute_scalar_summary;
use crate::storage::{self, pose};
use crate::Result;
use tracing::info;

pub(super) fn run(settings: &Settings) -> Result<StepOutcome> {
    let pose_dir = &settings.paths.pose_dir;
    let params = settings.feature_params();
    let options = settings.pose_read_options()?;
    info!(pose_dir = %pose_dir.display(), "Loading pose trajectories");
    log_parameters(Step::ComputeScalars, &params);

    let recordings = pose::load_pose_folder(pose_dir, &options)?;
    if recordings.is_empty() {
        return Ok(StepOutcome::skipped(format!(
            "no CSV files in {}",
            pose_dir.display()
        )));
    }

    let mut tables = Vec::with_capacity(recordings.len());
    for recording in &recordings {
        let scalars = compute_scalar_summary(&recording.frame, &params)?;
        info!(subject = %recording.name, frames = scalars.num_rows(), "Computed scalars");
        tables.push(scalars.with_subject(&recording.name)?);
    }
    let table = storage::concat_tables(&tables)?;

    let out = settings.paths.scalar_summaries();
    storage::write_table(&out, &table)?;
    Ok(StepOutcome::Completed { outputs: vec![out] })
}
