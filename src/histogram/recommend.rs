//! Cohort-level bin-count recommendations

use super::GROUP_COLUMN;
use crate::binning::BinRecommendation;
use crate::features::{float_values, NAME_COLUMN};
use crate::storage;
use crate::{Error, Result};
use arrow::array::{Float64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Mean per-subject bin counts for one variable, rounded to 2 decimals
/// (ties to even)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableRecommendation {
    /// Variable name
    pub variable: String,
    /// Mean Sturges count
    pub sturges: f64,
    /// Mean Freedman-Diaconis count
    pub freedman_diaconis: f64,
    /// Mean Scott count
    pub scott: f64,
}

/// Recommend bin counts per variable from a multi-subject scalar table
///
/// Each subject (grouped by `name`) gets the three count-only heuristics; the
/// cohort recommendation is their unweighted mean. `variables` of `None` or
/// empty selects every column except `name` and `group`.
///
/// # Errors
/// Returns [`Error::MissingColumn`] if `name` or a requested variable is absent
pub fn recommend_bins(
    scalars: &RecordBatch,
    variables: Option<&[String]>,
) -> Result<Vec<VariableRecommendation>> {
    let names = storage::string_values(scalars, NAME_COLUMN)?;
    let mut subjects: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (row, name) in names.iter().enumerate() {
        subjects.entry(name.as_str()).or_default().push(row);
    }

    let variables: Vec<String> = match variables {
        Some(vars) if !vars.is_empty() => vars.to_vec(),
        _ => scalars
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .filter(|n| n != NAME_COLUMN && n != GROUP_COLUMN)
            .collect(),
    };

    let mut out = Vec::with_capacity(variables.len());
    for variable in variables {
        let column = scalars
            .column_by_name(&variable)
            .ok_or_else(|| Error::missing_column(variable.as_str()))?;
        let values = float_values(column)?;
        let per_subject: Vec<BinRecommendation> = subjects
            .values()
            .map(|rows| {
                let sample: Vec<f64> = rows.iter().map(|&r| values[r]).collect();
                BinRecommendation::for_sample(&sample)
            })
            .collect();
        if per_subject.is_empty() {
            continue;
        }
        out.push(VariableRecommendation {
            variable,
            sturges: mean_count(per_subject.iter().map(|r| r.sturges)),
            freedman_diaconis: mean_count(per_subject.iter().map(|r| r.freedman_diaconis)),
            scott: mean_count(per_subject.iter().map(|r| r.scott)),
        });
    }
    Ok(out)
}

#[allow(clippy::cast_precision_loss)]
fn mean_count(counts: impl ExactSizeIterator<Item = usize>) -> f64 {
    let n = counts.len().max(1) as f64;
    let mean = counts.map(|c| c as f64).sum::<f64>() / n;
    (mean * 100.0).round_ties_even() / 100.0
}

/// Table with columns `variable, sturges, freedman_diaconis, scott`
///
/// # Errors
/// Returns error if the batch cannot be assembled
pub fn recommendations_batch(recs: &[VariableRecommendation]) -> Result<RecordBatch> {
    let schema = Schema::new(vec![
        Field::new("variable", DataType::Utf8, false),
        Field::new("sturges", DataType::Float64, false),
        Field::new("freedman_diaconis", DataType::Float64, false),
        Field::new("scott", DataType::Float64, false),
    ]);
    Ok(RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(StringArray::from_iter_values(
                recs.iter().map(|r| r.variable.as_str()),
            )),
            Arc::new(Float64Array::from_iter_values(recs.iter().map(|r| r.sturges))),
            Arc::new(Float64Array::from_iter_values(
                recs.iter().map(|r| r.freedman_diaconis),
            )),
            Arc::new(Float64Array::from_iter_values(recs.iter().map(|r| r.scott))),
        ],
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(&str, f64, &str)]) -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("length", DataType::Float64, true),
            Field::new(NAME_COLUMN, DataType::Utf8, false),
            Field::new(GROUP_COLUMN, DataType::Utf8, false),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.1))),
                Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.0))),
                Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.2))),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_average_over_subjects() {
        // a: 4 values -> sturges 3; b: 1 value -> sturges 1
        let batch = table(&[
            ("a", 1.0, "G"),
            ("a", 2.0, "G"),
            ("a", 3.0, "G"),
            ("a", 4.0, "G"),
            ("b", 5.0, "G"),
        ]);
        let recs = recommend_bins(&batch, None).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].variable, "length");
        assert_eq!(recs[0].sturges, 2.0);
        // b has fewer than two values: scott/fd give 1
        let a = BinRecommendation::for_sample(&[1.0, 2.0, 3.0, 4.0]);
        #[allow(clippy::cast_precision_loss)]
        let expected = ((a.scott as f64 + 1.0) / 2.0 * 100.0).round_ties_even() / 100.0;
        assert_eq!(recs[0].scott, expected);
    }

    #[test]
    fn test_rounding_to_two_decimals() {
        assert_eq!(mean_count([1usize, 1, 2].into_iter()), 1.33);
        assert_eq!(mean_count([2usize, 3].into_iter()), 2.5);
    }

    #[test]
    fn test_rounding_halves_to_even() {
        // 9 / 8 = 1.125 -> 1.12, 11 / 8 = 1.375 -> 1.38
        assert_eq!(mean_count([1usize, 1, 1, 1, 1, 1, 1, 2].into_iter()), 1.12);
        assert_eq!(mean_count([1usize, 1, 1, 1, 1, 2, 2, 2].into_iter()), 1.38);
    }

    #[test]
    fn test_cohort_mean_on_a_half_rounds_to_even() {
        // seven single-value subjects (sturges 1) and one two-value subject (sturges 2)
        let mut rows: Vec<(String, f64)> = (0..7).map(|i| (format!("s{i}"), 1.0)).collect();
        rows.push(("s7".to_string(), 1.0));
        rows.push(("s7".to_string(), 2.0));
        let rows: Vec<(&str, f64, &str)> = rows.iter().map(|(n, v)| (n.as_str(), *v, "G")).collect();
        let recs = recommend_bins(&table(&rows), None).unwrap();
        assert_eq!(recs[0].sturges, 1.12);
    }

    #[test]
    fn test_missing_variable() {
        let batch = table(&[("a", 1.0, "G")]);
        let err = recommend_bins(&batch, Some(&["height".to_string()])).unwrap_err();
        assert!(matches!(err, Error::MissingColumn { .. }));
    }

    #[test]
    fn test_batch_columns() {
        let recs = vec![VariableRecommendation {
            variable: "length".to_string(),
            sturges: 7.0,
            freedman_diaconis: 12.5,
            scott: 9.0,
        }];
        let batch = recommendations_batch(&recs).unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.schema().field(2).name(), "freedman_diaconis");
    }
}
