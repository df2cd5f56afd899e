//! Syllable ablation by within-subject resampling
//!
//! Rows labeled with an excluded syllable are removed and replaced by an equal
//! number of rows drawn with replacement from the same subject's remaining
//! rows, so per-subject row counts are preserved.

use super::{log_parameters, Step, StepOutcome};
use crate::config::Settings;
use crate::features::{float_values, NAME_COLUMN};
use crate::storage::{self, CsvReadOptions};
use crate::{Error, Result};
use arrow::array::{RecordBatch, UInt64Array};
use arrow::compute;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Syllable label column
pub const SYLLABLE_COLUMN: &str = "syllable";

const REPLACE_TAG: &str = "_replace_syll";

pub(super) fn run(settings: &Settings) -> Result<StepOutcome> {
    let ablation = &settings.parameters.ablation;
    let (Some(input), Some(output)) = (&ablation.input_csv, &ablation.output_csv) else {
        return Ok(StepOutcome::skipped(
            "set parameters.ablation.input_csv and output_csv",
        ));
    };
    let out = ablation_output_path(input, output, &ablation.exclude_syllables);
    log_parameters(Step::ReplaceSyllables, ablation);
    info!(input = %input.display(), output = %out.display(), "Syllable ablation");

    let options = CsvReadOptions::with_text_columns(&[NAME_COLUMN]);
    let table = storage::read_table(input, &options)?;
    if table.column_by_name(SYLLABLE_COLUMN).is_none() {
        return Ok(StepOutcome::skipped(format!(
            "no '{SYLLABLE_COLUMN}' column in {}",
            input.display()
        )));
    }

    let resampled = resample_excluded(&table, &ablation.exclude_syllables, ablation.random_seed)?;
    storage::write_table(&out, &resampled)?;
    info!(rows = resampled.num_rows(), "Ablation table written");
    Ok(StepOutcome::Completed { outputs: vec![out] })
}

/// File the ablation table is written to
///
/// An `output` ending in `.csv` names the file (its stem is reused); anything
/// else is a directory and the stem comes from `input`. A trailing
/// `_replace_syll` is removed from the stem before `_replace_syll_[ids]` is
/// appended, ids ascending.
#[must_use]
pub fn ablation_output_path(input: &Path, output: &Path, excluded: &[i64]) -> PathBuf {
    let is_file = output
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    let (dir, stem_source) = if is_file {
        (output.parent().unwrap_or(Path::new("")), output)
    } else {
        (output, input)
    };
    let stem = stem_source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = strip_replace_tag(&stem);

    let mut ids = excluded.to_vec();
    ids.sort_unstable();
    let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
    dir.join(format!("{base}{REPLACE_TAG}_[{}].csv", ids.join(",")))
}

fn strip_replace_tag(stem: &str) -> &str {
    if stem.ends_with(REPLACE_TAG) || stem.ends_with("_replace_syll_") {
        stem.rfind(REPLACE_TAG).map_or(stem, |i| &stem[..i])
    } else {
        stem
    }
}

/// Replace excluded-syllable rows per subject
///
/// Subjects are emitted in name order. For each, the kept rows come first in
/// their original order, followed by `n_excluded` rows sampled uniformly with
/// replacement from the kept rows. A subject with no kept rows, or nothing to
/// exclude, is passed through unchanged. Each subject's sampler is seeded with
/// `seed`.
///
/// # Errors
/// Returns [`Error::MissingColumn`] if `name` or `syllable` is absent
pub fn resample_excluded(batch: &RecordBatch, excluded: &[i64], seed: u64) -> Result<RecordBatch> {
    let names = storage::string_values(batch, NAME_COLUMN)?;
    let syllables = batch
        .column_by_name(SYLLABLE_COLUMN)
        .ok_or_else(|| Error::missing_column(SYLLABLE_COLUMN))?;
    let syllables = float_values(syllables)?;
    #[allow(clippy::cast_precision_loss)]
    let is_excluded = |v: f64| excluded.iter().any(|&id| v == id as f64);

    let mut subjects: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (row, name) in names.iter().enumerate() {
        subjects.entry(name.as_str()).or_default().push(row);
    }

    let mut order: Vec<u64> = Vec::with_capacity(batch.num_rows());
    for (name, rows) in subjects {
        let (dropped, kept): (Vec<usize>, Vec<usize>) =
            rows.iter().copied().partition(|&r| is_excluded(syllables[r]));
        info!(
            subject = name,
            replaced = dropped.len(),
            "Replacing excluded rows with resampled kept rows"
        );
        if kept.is_empty() || dropped.is_empty() {
            order.extend(rows.iter().map(|&r| r as u64));
            continue;
        }
        let mut rng = StdRng::seed_from_u64(seed);
        order.extend(kept.iter().map(|&r| r as u64));
        order.extend((0..dropped.len()).map(|_| kept[rng.gen_range(0..kept.len())] as u64));
    }

    Ok(compute::take_record_batch(
        batch,
        &UInt64Array::from(order),
    )?)
}
