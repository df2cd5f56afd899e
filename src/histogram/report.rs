//! Histogram output records and their table forms

use crate::Result;
use arrow::array::{ArrayRef, Float64Array, RecordBatch, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use std::sync::Arc;

/// One bin of one subject's normalized histogram
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramRow {
    /// Variable name
    pub variable: String,
    /// Group label
    pub group: String,
    /// Subject name
    pub subject: String,
    /// Bin midpoint
    pub bin_center: f64,
    /// Count in this bin over the subject's binned total
    pub normalized_frequency: f64,
}

/// All subjects' histograms for one variable over a shared support
#[derive(Debug, Clone, PartialEq)]
pub struct VariableHistogram {
    /// Variable name
    pub variable: String,
    /// Bin edges shared by every subject
    pub edges: Vec<f64>,
    /// One row per (subject, bin), subjects sorted by name
    pub rows: Vec<HistogramRow>,
}

/// Group-level mean of normalized frequencies at one bin
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMeanRow {
    /// Variable name
    pub variable: String,
    /// Group label
    pub group: String,
    /// Bin midpoint
    pub bin_center: f64,
    /// Unweighted mean across the group's subjects
    pub normalized_frequency: f64,
}

/// Descriptive statistics of one subject's finite values for one variable
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectVariableSummary {
    /// Variable name
    pub variable: String,
    /// Group label
    pub group: String,
    /// Subject name
    pub name: String,
    /// Mean
    pub mean: f64,
    /// Sample standard deviation (ddof = 1), 0 for a single value
    pub std: f64,
    /// Number of finite values
    pub n: u64,
}

/// Everything one aggregation run produces
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistogramReport {
    /// Per-variable histograms, in requested variable order
    pub variables: Vec<VariableHistogram>,
    /// Group means ordered by (variable, group, bin center)
    pub group_means: Vec<GroupMeanRow>,
    /// Per-subject summaries, variable-major then subject order
    pub summaries: Vec<SubjectVariableSummary>,
}

fn utf8(name: &str) -> Field {
    Field::new(name, DataType::Utf8, false)
}

fn float(name: &str) -> Field {
    Field::new(name, DataType::Float64, true)
}

fn strings<'a>(values: impl Iterator<Item = &'a str>) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(values))
}

fn floats(values: impl Iterator<Item = f64>) -> ArrayRef {
    Arc::new(Float64Array::from_iter_values(values))
}

impl VariableHistogram {
    /// Bin midpoints
    #[must_use]
    pub fn centers(&self) -> Vec<f64> {
        crate::binning::bin_centers(&self.edges)
    }

    /// Table with columns `variable, group, mouse, bin_center, normalized_frequency`
    ///
    /// # Errors
    /// Returns error if the batch cannot be assembled
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let schema = Schema::new(vec![
            utf8("variable"),
            utf8("group"),
            utf8("mouse"),
            float("bin_center"),
            float("normalized_frequency"),
        ]);
        let rows = &self.rows;
        Ok(RecordBatch::try_new(
            Arc::new(schema),
            vec![
                strings(rows.iter().map(|r| r.variable.as_str())),
                strings(rows.iter().map(|r| r.group.as_str())),
                strings(rows.iter().map(|r| r.subject.as_str())),
                floats(rows.iter().map(|r| r.bin_center)),
                floats(rows.iter().map(|r| r.normalized_frequency)),
            ],
        )?)
    }
}

impl HistogramReport {
    /// Total histogram rows across variables
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.variables.iter().map(|v| v.rows.len()).sum()
    }

    /// Histogram for `variable`, if it was built
    #[must_use]
    pub fn variable(&self, variable: &str) -> Option<&VariableHistogram> {
        self.variables.iter().find(|v| v.variable == variable)
    }

    /// Table with columns `variable, group, bin_center, normalized_frequency`
    ///
    /// # Errors
    /// Returns error if the batch cannot be assembled
    pub fn group_means_batch(&self) -> Result<RecordBatch> {
        let schema = Schema::new(vec![
            utf8("variable"),
            utf8("group"),
            float("bin_center"),
            float("normalized_frequency"),
        ]);
        let rows = &self.group_means;
        Ok(RecordBatch::try_new(
            Arc::new(schema),
            vec![
                strings(rows.iter().map(|r| r.variable.as_str())),
                strings(rows.iter().map(|r| r.group.as_str())),
                floats(rows.iter().map(|r| r.bin_center)),
                floats(rows.iter().map(|r| r.normalized_frequency)),
            ],
        )?)
    }

    /// Table with columns `variable, group, name, mean, std, n`
    ///
    /// # Errors
    /// Returns error if the batch cannot be assembled
    pub fn summaries_batch(&self) -> Result<RecordBatch> {
        let schema = Schema::new(vec![
            utf8("variable"),
            utf8("group"),
            utf8("name"),
            float("mean"),
            float("std"),
            Field::new("n", DataType::UInt64, false),
        ]);
        let rows = &self.summaries;
        Ok(RecordBatch::try_new(
            Arc::new(schema),
            vec![
                strings(rows.iter().map(|r| r.variable.as_str())),
                strings(rows.iter().map(|r| r.group.as_str())),
                strings(rows.iter().map(|r| r.name.as_str())),
                floats(rows.iter().map(|r| r.mean)),
                floats(rows.iter().map(|r| r.std)),
                Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.n))),
            ],
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_histogram_table_columns() {
        let hist = VariableHistogram {
            variable: "height".to_string(),
            edges: vec![0.0, 1.0, 2.0],
            rows: vec![
                HistogramRow {
                    variable: "height".to_string(),
                    group: "A".to_string(),
                    subject: "m1".to_string(),
                    bin_center: 0.5,
                    normalized_frequency: 0.25,
                },
                HistogramRow {
                    variable: "height".to_string(),
                    group: "A".to_string(),
                    subject: "m1".to_string(),
                    bin_center: 1.5,
                    normalized_frequency: 0.75,
                },
            ],
        };
        assert_eq!(hist.centers(), vec![0.5, 1.5]);
        let batch = hist.to_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 2);
        let names: Vec<_> = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(
            names,
            vec!["variable", "group", "mouse", "bin_center", "normalized_frequency"]
        );
    }

    #[test]
    fn test_empty_report_tables() {
        let report = HistogramReport::default();
        assert_eq!(report.num_rows(), 0);
        assert_eq!(report.group_means_batch().unwrap().num_rows(), 0);
        assert_eq!(report.summaries_batch().unwrap().num_columns(), 6);
    }
}
