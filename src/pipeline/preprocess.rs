//! Raw table cleaning

use super::{log_parameters, Step, StepOutcome};
use crate::config::Settings;
use crate::storage::{self, pose, CsvReadOptions};
use crate::Result;
use arrow::array::{Array, BooleanArray, Float64Array, RecordBatch};
use arrow::compute;
use serde_json::json;
use tracing::{debug, info};

pub(super) fn run(settings: &Settings) -> Result<StepOutcome> {
    let paths = &settings.paths;
    log_parameters(
        Step::Preprocess,
        &json!({
            "raw": paths.raw.display().to_string(),
            "processed": paths.processed.display().to_string(),
        }),
    );
    let files = pose::list_csvs(&paths.raw)?;
    if files.is_empty() {
        return Ok(StepOutcome::skipped(format!(
            "no CSV files in {}",
            paths.raw.display()
        )));
    }

    let mut outputs = Vec::with_capacity(files.len());
    for file in files {
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let table = storage::read_table(&file, &CsvReadOptions::default())?;
        let cleaned = drop_incomplete_rows(&table)?;
        info!(
            file = %file.display(),
            rows = table.num_rows(),
            kept = cleaned.num_rows(),
            "Cleaned table"
        );
        let out = paths.processed.join(format!("{stem}_processed.csv"));
        storage::write_table(&out, &cleaned)?;
        outputs.push(out);
    }
    Ok(StepOutcome::Completed { outputs })
}

/// Keep only rows where every cell is present (non-null, and not NaN for
/// float columns)
///
/// # Errors
/// Returns error if the filter kernel fails
pub fn drop_incomplete_rows(batch: &RecordBatch) -> Result<RecordBatch> {
    let mut keep = vec![true; batch.num_rows()];
    for column in batch.columns() {
        let floats = column.as_any().downcast_ref::<Float64Array>();
        for (row, flag) in keep.iter_mut().enumerate() {
            let missing =
                column.is_null(row) || floats.is_some_and(|f| f.value(row).is_nan());
            if missing {
                *flag = false;
            }
        }
    }
    let dropped = keep.iter().filter(|k| !**k).count();
    debug!(dropped, "Rows with missing cells");
    Ok(compute::filter_record_batch(
        batch,
        &BooleanArray::from(keep),
    )?)
}
