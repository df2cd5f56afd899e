//! Scalar table → bin-count recommendations

use super::{log_parameters, Step, StepOutcome};
use crate::config::Settings;
use crate::features::NAME_COLUMN;
use crate::histogram::{recommend_bins, recommendations_batch, GROUP_COLUMN};
use crate::storage::{self, CsvReadOptions};
use crate::Result;
use serde_json::json;
use tracing::debug;

pub(super) fn run(settings: &Settings) -> Result<StepOutcome> {
    let scalars_csv = settings.paths.scalar_summaries();
    log_parameters(
        Step::OptimizeBins,
        &json!({
            "scalars_csv": scalars_csv.display().to_string(),
            "variables": settings.parameters.variables,
        }),
    );
    let options = CsvReadOptions::with_text_columns(&[NAME_COLUMN, GROUP_COLUMN]);
    let scalars = storage::read_table(&scalars_csv, &options)?;

    let recs = recommend_bins(&scalars, settings.variables())?;
    for rec in &recs {
        debug!(
            variable = %rec.variable,
            sturges = rec.sturges,
            freedman_diaconis = rec.freedman_diaconis,
            scott = rec.scott,
            "Recommended bins"
        );
    }

    let out = settings.paths.bin_recommendations();
    storage::write_table(&out, &recommendations_batch(&recs)?)?;
    Ok(StepOutcome::Completed { outputs: vec![out] })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_writes_recommendation_report() {
        let root = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.paths.results_dir = root.path().to_path_buf();
        fs::write(
            root.path().join("scalar_summaries.csv"),
            "length,height,name\n1,0.5,a\n2,0.5,a\n3,0.5,a\n4,0.5,a\n",
        )
        .unwrap();

        let outcome = run(&settings).unwrap();
        let out = root.path().join("configs/histogram_bin_recommendations.csv");
        assert_eq!(outcome.outputs(), [out.clone()]);

        let text = fs::read_to_string(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("variable,sturges,freedman_diaconis,scott"));
        // constant height: zero spread defaults to 10 bins
        assert_eq!(lines.nth(1), Some("height,3.0,10.0,10.0"));
    }
}
