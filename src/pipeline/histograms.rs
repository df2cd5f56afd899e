//! Scalar table + group index → histogram tables

use super::{log_parameters, Step, StepOutcome};
use crate::config::Settings;
use crate::features::NAME_COLUMN;
use crate::histogram::{GroupIndex, HistogramAggregator, GROUP_COLUMN};
use crate::storage::{self, CsvReadOptions};
use crate::Result;
use serde_json::json;
use tracing::info;

pub(super) fn run(settings: &Settings) -> Result<StepOutcome> {
    let paths = &settings.paths;
    let scalars_csv = paths.scalars_csv();
    let histogram_dir = paths.histogram_dir();
    let config = settings.histogram_config();
    log_parameters(
        Step::BuildHistograms,
        &json!({
            "scalars_csv": scalars_csv.display().to_string(),
            "index_csv": paths.group_index_csv.display().to_string(),
            "histogram_dir": histogram_dir.display().to_string(),
            "variables": settings.parameters.variables,
            "bin_method": config.method,
            "manual_widths": config.manual_widths,
            "variable_bins": config.overrides,
        }),
    );

    let options = CsvReadOptions::with_text_columns(&[NAME_COLUMN, GROUP_COLUMN]);
    let scalars = storage::read_table(&scalars_csv, &options)?;
    let index = GroupIndex::load(&paths.group_index_csv)?;
    info!(indexed = index.len(), rows = scalars.num_rows(), "Inputs loaded");

    let report = HistogramAggregator::new(config).build(&scalars, &index, settings.variables())?;

    let mut outputs = Vec::with_capacity(report.variables.len() + 2);
    for histogram in &report.variables {
        let out = histogram_dir.join(format!("{}_histogram_data.csv", histogram.variable));
        storage::write_table(&out, &histogram.to_record_batch()?)?;
        outputs.push(out);
    }
    if report.num_rows() > 0 {
        let out = histogram_dir.join("group_mean_histogram.csv");
        storage::write_table(&out, &report.group_means_batch()?)?;
        outputs.push(out);
    } else {
        info!("No histogram rows produced");
    }
    if !report.summaries.is_empty() {
        let out = histogram_dir.join("group_mouse_averages_all.csv");
        storage::write_table(&out, &report.summaries_batch()?)?;
        outputs.push(out);
    }
    Ok(StepOutcome::Completed { outputs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn settings_in(root: &std::path::Path) -> Settings {
        let mut settings = Settings::default();
        settings.paths.results_dir = root.join("results");
        settings.paths.group_index_csv = root.join("index.csv");
        settings
    }

    #[test]
    fn test_writes_all_tables() {
        let root = tempfile::tempdir().unwrap();
        let settings = settings_in(root.path());
        fs::create_dir_all(root.path().join("results")).unwrap();
        fs::write(
            root.path().join("results/scalar_summaries.csv"),
            "length,name,group\n1,a,stale\n2,a,stale\n3,b,stale\n4,ghost,stale\n",
        )
        .unwrap();
        fs::write(root.path().join("index.csv"), "name,group\na,G1\nb,G2\n").unwrap();

        let outcome = run(&settings).unwrap();
        let dir = root.path().join("results/scalar_histograms");
        let expected: Vec<PathBuf> = vec![
            dir.join("length_histogram_data.csv"),
            dir.join("group_mean_histogram.csv"),
            dir.join("group_mouse_averages_all.csv"),
        ];
        assert_eq!(outcome.outputs(), expected.as_slice());

        let data = fs::read_to_string(&expected[0]).unwrap();
        assert!(data.starts_with("variable,group,mouse,bin_center,normalized_frequency\n"));
        assert!(!data.contains("ghost"));
        assert!(!data.contains("stale"));
    }

    #[test]
    fn test_missing_index_is_missing_input() {
        let root = tempfile::tempdir().unwrap();
        let settings = settings_in(root.path());
        fs::create_dir_all(root.path().join("results")).unwrap();
        fs::write(
            root.path().join("results/scalar_summaries.csv"),
            "length,name\n1,a\n",
        )
        .unwrap();
        let err = run(&settings).unwrap_err();
        assert!(matches!(err, crate::Error::MissingInput(_)));
    }

    #[test]
    fn test_no_joined_subjects_writes_only_empty_variable_tables() {
        let root = tempfile::tempdir().unwrap();
        let settings = settings_in(root.path());
        fs::create_dir_all(root.path().join("results")).unwrap();
        fs::write(
            root.path().join("results/scalar_summaries.csv"),
            "length,name\n1,a\n",
        )
        .unwrap();
        fs::write(root.path().join("index.csv"), "name,group\nz,G\n").unwrap();

        let outcome = run(&settings).unwrap();
        assert_eq!(outcome.outputs().len(), 1);
    }
}
