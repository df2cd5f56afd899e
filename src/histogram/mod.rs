//! Per-group normalized histograms of scalar features
//!
//! Pipeline for one run:
//! 1. Inner-join the scalar table to the [`GroupIndex`] on subject name
//! 2. Per variable, fix bin edges once from the pooled sample of all joined
//!    subjects (override, or [`crate::binning::select_edges`])
//! 3. Per subject, count values into those edges and divide by
//!    `max(total, 1)`
//! 4. Average normalized frequencies per (variable, group, bin center), each
//!    subject weighted equally
//! 5. Summarize each subject's finite values (mean, sample std, n)
//!
//! Variables are independent units of work. With the `rayon` feature they are
//! computed in parallel; output order does not depend on scheduling.

mod group;
mod recommend;
mod report;

pub use group::{GroupIndex, GROUP_COLUMN};
pub use recommend::{recommend_bins, recommendations_batch, VariableRecommendation};
pub use report::{
    GroupMeanRow, HistogramReport, HistogramRow, SubjectVariableSummary, VariableHistogram,
};

use crate::binning::{self, stats, BinMethod};
use crate::features::{float_values, NAME_COLUMN};
use crate::storage;
use crate::{Error, Result};
use arrow::array::RecordBatch;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Explicit per-variable binning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BinOverride {
    /// Equal-width bins over the pooled 1st-99th percentile range
    Count(usize),
    /// Edges used verbatim (caller guarantees they increase)
    Edges(Vec<f64>),
}

/// Physical kind of a variable, selecting its manual bin width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableUnit {
    /// Lengths, distances, speeds
    #[default]
    Distance,
    /// Radians
    Angle,
}

/// Variable name → unit; unlisted variables are distance-like
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitClassification(BTreeMap<String, VariableUnit>);

impl Default for UnitClassification {
    fn default() -> Self {
        Self(
            [
                ("angle_to_origin".to_string(), VariableUnit::Angle),
                ("torso_angle".to_string(), VariableUnit::Angle),
            ]
            .into_iter()
            .collect(),
        )
    }
}

impl UnitClassification {
    /// Classification with no entries (everything distance-like)
    #[must_use]
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Unit of `variable`
    #[must_use]
    pub fn unit_of(&self, variable: &str) -> VariableUnit {
        self.0.get(variable).copied().unwrap_or_default()
    }

    /// Add or replace entries
    pub fn extend(&mut self, entries: impl IntoIterator<Item = (String, VariableUnit)>) {
        self.0.extend(entries);
    }
}

/// Manual bin widths by unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManualWidths {
    /// Width for distance-like variables
    pub distance: f64,
    /// Width for angle-like variables (radians)
    pub angle: f64,
}

impl Default for ManualWidths {
    fn default() -> Self {
        Self {
            distance: 1.0,
            angle: 0.5236,
        }
    }
}

impl ManualWidths {
    /// Width for a variable of the given unit
    #[must_use]
    pub const fn for_unit(&self, unit: VariableUnit) -> f64 {
        match unit {
            VariableUnit::Distance => self.distance,
            VariableUnit::Angle => self.angle,
        }
    }
}

/// Binning configuration shared by every variable in a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistogramConfig {
    /// Bin-count rule for variables without an override
    pub method: BinMethod,
    /// Manual widths (used by [`BinMethod::Manual`])
    pub manual_widths: ManualWidths,
    /// Per-variable overrides
    pub overrides: BTreeMap<String, BinOverride>,
    /// Per-variable unit classification
    pub units: UnitClassification,
}

/// Builds normalized histograms and summaries from a scalar table
#[derive(Debug, Clone, Default)]
pub struct HistogramAggregator {
    config: HistogramConfig,
}

/// Joined view of the scalar table: subject → (group, row indices)
struct Cohort {
    subjects: BTreeMap<String, (String, Vec<usize>)>,
    rows: Vec<usize>,
}

impl HistogramAggregator {
    /// Create an aggregator with the given configuration
    #[must_use]
    pub const fn new(config: HistogramConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &HistogramConfig {
        &self.config
    }

    /// Bin edges for `variable` given its pooled sample
    ///
    /// A positive count override or an override with at least two edges takes
    /// precedence; otherwise the configured method runs with the manual width
    /// of the variable's unit.
    #[must_use]
    pub fn edges_for(&self, variable: &str, pooled: &[f64]) -> Vec<f64> {
        match self.config.overrides.get(variable) {
            Some(BinOverride::Count(count)) if *count > 0 => {
                binning::equal_width_edges(pooled, *count)
            }
            Some(BinOverride::Edges(edges)) if edges.len() >= 2 => edges.clone(),
            _ => {
                let unit = self.config.units.unit_of(variable);
                let width = self.config.manual_widths.for_unit(unit);
                binning::select_edges(pooled, &self.config.method, Some(width))
            }
        }
    }

    /// Build histograms, group means and summaries
    ///
    /// # Arguments
    /// * `scalars` - Scalar table with a `name` column, many subjects concatenated
    /// * `index` - Subject → group mapping (inner join)
    /// * `variables` - Columns to bin; `None` or empty means every column
    ///   except `name`/`group`
    ///
    /// # Errors
    /// Returns [`Error::MissingColumn`] if `name` or a requested variable is absent
    pub fn build(
        &self,
        scalars: &RecordBatch,
        index: &GroupIndex,
        variables: Option<&[String]>,
    ) -> Result<HistogramReport> {
        let scalars = storage::drop_column(scalars, GROUP_COLUMN)?;
        let cohort = Self::join(&scalars, index)?;

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
        info!(
            subjects = cohort.subjects.len(),
            variables = ?variables,
            method = %self.config.method,
            "Building histograms"
        );

        #[cfg(feature = "rayon")]
        let parts: Vec<(VariableHistogram, Vec<SubjectVariableSummary>)> = variables
            .par_iter()
            .map(|v| self.build_variable(&scalars, &cohort, v))
            .collect::<Result<_>>()?;
        #[cfg(not(feature = "rayon"))]
        let parts: Vec<(VariableHistogram, Vec<SubjectVariableSummary>)> = variables
            .iter()
            .map(|v| self.build_variable(&scalars, &cohort, v))
            .collect::<Result<_>>()?;

        let (histograms, summaries): (Vec<_>, Vec<_>) = parts.into_iter().unzip();
        let group_means = group_means(&histograms);
        Ok(HistogramReport {
            variables: histograms,
            group_means,
            summaries: summaries.into_iter().flatten().collect(),
        })
    }

    fn join(scalars: &RecordBatch, index: &GroupIndex) -> Result<Cohort> {
        let names = storage::string_values(scalars, NAME_COLUMN)?;
        let mut subjects: BTreeMap<String, (String, Vec<usize>)> = BTreeMap::new();
        let mut unindexed = BTreeSet::new();
        let mut rows = Vec::new();
        for (row, name) in names.iter().enumerate() {
            match index.group_of(name) {
                Some(group) => {
                    subjects
                        .entry(name.clone())
                        .or_insert_with(|| (group.to_string(), Vec::new()))
                        .1
                        .push(row);
                    rows.push(row);
                }
                None => {
                    unindexed.insert(name.as_str());
                }
            }
        }
        if !unindexed.is_empty() {
            info!(
                count = unindexed.len(),
                subjects = ?unindexed,
                "Subjects absent from the group index are excluded"
            );
        }
        Ok(Cohort { subjects, rows })
    }

    fn build_variable(
        &self,
        scalars: &RecordBatch,
        cohort: &Cohort,
        variable: &str,
    ) -> Result<(VariableHistogram, Vec<SubjectVariableSummary>)> {
        let column = scalars
            .column_by_name(variable)
            .ok_or_else(|| Error::missing_column(variable))?;
        let values = float_values(column)?;
        let pooled: Vec<f64> = cohort.rows.iter().map(|&r| values[r]).collect();

        let edges = self.edges_for(variable, &pooled);
        let centers = binning::bin_centers(&edges);
        debug!(variable, bins = centers.len(), "Bin edges selected");

        let mut rows = Vec::with_capacity(cohort.subjects.len() * centers.len());
        let mut summaries = Vec::new();
        for (subject, (group, subject_rows)) in &cohort.subjects {
            let sample: Vec<f64> = subject_rows.iter().map(|&r| values[r]).collect();
            let frequencies = normalize(&histogram_counts(&sample, &edges));
            rows.extend(centers.iter().zip(frequencies).map(|(center, freq)| {
                HistogramRow {
                    variable: variable.to_string(),
                    group: group.clone(),
                    subject: subject.clone(),
                    bin_center: *center,
                    normalized_frequency: freq,
                }
            }));
            if let Some(summary) = summarize(variable, group, subject, &sample) {
                summaries.push(summary);
            }
        }

        Ok((
            VariableHistogram {
                variable: variable.to_string(),
                edges,
                rows,
            },
            summaries,
        ))
    }
}

/// Count values into bins defined by `edges`
///
/// Bins are half-open `[e_i, e_{i+1})` except the last, which is closed.
/// Values outside `[first, last]` and NaN are dropped, never clipped into
/// the boundary bins.
#[must_use]
pub fn histogram_counts(values: &[f64], edges: &[f64]) -> Vec<u64> {
    let bins = edges.len().saturating_sub(1);
    let mut counts = vec![0u64; bins];
    if bins == 0 {
        return counts;
    }
    let (first, last) = (edges[0], edges[bins]);
    for &v in values {
        if !(v >= first && v <= last) {
            continue;
        }
        let bin = if v == last {
            bins - 1
        } else {
            edges.partition_point(|e| *e <= v).saturating_sub(1)
        };
        counts[bin.min(bins - 1)] += 1;
    }
    counts
}

/// Divide counts by `max(total, 1)`; an empty histogram stays all zero
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn normalize(counts: &[u64]) -> Vec<f64> {
    let total = counts.iter().sum::<u64>().max(1) as f64;
    counts.iter().map(|&c| c as f64 / total).collect()
}

/// Mean, sample std and count of the finite values, `None` if there are none
fn summarize(
    variable: &str,
    group: &str,
    subject: &str,
    sample: &[f64],
) -> Option<SubjectVariableSummary> {
    let finite = stats::finite_values(sample);
    if finite.is_empty() {
        return None;
    }
    let std = if finite.len() > 1 {
        stats::std_dev(&finite, 1)
    } else {
        0.0
    };
    Some(SubjectVariableSummary {
        variable: variable.to_string(),
        group: group.to_string(),
        name: subject.to_string(),
        mean: stats::mean(&finite),
        std,
        n: finite.len() as u64,
    })
}

/// Unweighted mean per (variable, group, bin center), sorted by that key
#[allow(clippy::cast_precision_loss)]
fn group_means(histograms: &[VariableHistogram]) -> Vec<GroupMeanRow> {
    let mut acc: BTreeMap<(&str, &str, CenterKey), (f64, usize)> = BTreeMap::new();
    for row in histograms.iter().flat_map(|h| &h.rows) {
        let entry = acc
            .entry((&row.variable, &row.group, CenterKey(row.bin_center)))
            .or_insert((0.0, 0));
        entry.0 += row.normalized_frequency;
        entry.1 += 1;
    }
    acc.into_iter()
        .map(|((variable, group, center), (sum, n))| GroupMeanRow {
            variable: variable.to_string(),
            group: group.to_string(),
            bin_center: center.0,
            normalized_frequency: sum / n as f64,
        })
        .collect()
}

/// Bin center ordered by `total_cmp`, with -0.0 folded into 0.0
#[derive(Debug, Clone, Copy)]
struct CenterKey(f64);

impl CenterKey {
    fn canonical(self) -> f64 {
        if self.0 == 0.0 {
            0.0
        } else {
            self.0
        }
    }
}

impl PartialEq for CenterKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for CenterKey {}

impl PartialOrd for CenterKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CenterKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.canonical().total_cmp(&other.canonical())
    }
}
