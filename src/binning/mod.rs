//! Adaptive bin-edge selection
//!
//! Three competing bin-count heuristics (Sturges, Scott, Freedman-Diaconis) plus
//! a fixed-width rule. Every method bins over the same outlier-robust support,
//! the 1st to 99th percentile of the finite sample; the methods only disagree on
//! how many equal-width bins to lay over it.
//!
//! Nothing in this module fails. Degenerate input degrades to a default:
//! - no finite values: edges `[0.0, 1.0]`
//! - zero spread (Scott) or zero IQR (Freedman-Diaconis): 10 bins
//! - manual method without a positive width, or an unknown method: 10 bins
//! - a heuristic count that is non-finite or above [`MAX_BIN_COUNT`]: 10 bins
//!
//! The count-only functions ([`sturges_bins`], [`scott_bins`],
//! [`freedman_diaconis_bins`]) feed the bin-recommendation report and measure
//! the full min/max range instead of the trimmed support.

pub mod stats;

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

pub use stats::{bin_centers, finite_values, linspace, percentile, sorted_finite};

/// Bin count used whenever a heuristic has nothing to work with
pub const DEFAULT_BIN_COUNT: usize = 10;

/// Edges returned for a sample with no finite values (one unit bin)
pub const DEGENERATE_EDGES: [f64; 2] = [0.0, 1.0];

/// Lower percentile of the binning support
pub const LOWER_PERCENTILE: f64 = 1.0;

/// Upper percentile of the binning support
pub const UPPER_PERCENTILE: f64 = 99.0;

/// Largest bin count a heuristic may produce; explicit counts are capped here
pub const MAX_BIN_COUNT: usize = 1 << 20;

/// Floor on the heuristic bin width
const MIN_BIN_WIDTH: f64 = 1e-6;

/// Bin-count rule
///
/// Parsed case-insensitively from its name; names that match no rule are
/// kept as [`BinMethod::Unrecognized`] and bin with [`DEFAULT_BIN_COUNT`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BinMethod {
    /// `ceil(log2(n)) + 1`
    Sturges,
    /// Width `3.5 * sigma * n^(-1/3)`
    Scott,
    /// Width `2 * IQR * n^(-1/3)`
    FreedmanDiaconis,
    /// Caller-supplied fixed width
    Manual,
    /// Any other name
    Unrecognized(String),
}

impl Default for BinMethod {
    fn default() -> Self {
        Self::FreedmanDiaconis
    }
}

impl FromStr for BinMethod {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Ok(match name.as_str() {
            "sturges" => Self::Sturges,
            "scott" => Self::Scott,
            "freedman_diaconis" => Self::FreedmanDiaconis,
            "manual" => Self::Manual,
            _ => Self::Unrecognized(name),
        })
    }
}

impl From<String> for BinMethod {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(method) => method,
            Err(never) => match never {},
        }
    }
}

impl From<BinMethod> for String {
    fn from(method: BinMethod) -> Self {
        method.to_string()
    }
}

impl fmt::Display for BinMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sturges => f.write_str("sturges"),
            Self::Scott => f.write_str("scott"),
            Self::FreedmanDiaconis => f.write_str("freedman_diaconis"),
            Self::Manual => f.write_str("manual"),
            Self::Unrecognized(name) => f.write_str(name),
        }
    }
}

/// Select histogram edges for `sample`
///
/// # Arguments
/// * `sample` - Raw values; non-finite entries are ignored
/// * `method` - Bin-count rule
/// * `manual_width` - Bin width, consulted only by [`BinMethod::Manual`]
///
/// # Returns
/// `count + 1` edges, linearly spaced from the 1st to the 99th percentile of
/// the finite values, or [`DEGENERATE_EDGES`] when there are none.
///
/// # Example
/// ```rust
/// use pose_kinematics::binning::{select_edges, BinMethod};
///
/// let sample: Vec<f64> = (0..100).map(f64::from).collect();
/// let edges = select_edges(&sample, &BinMethod::Sturges, None);
/// assert_eq!(edges.len(), 9); // ceil(log2(100)) + 1 = 8 bins
/// assert!((edges[0] - 0.99).abs() < 1e-9);
/// ```
#[must_use]
pub fn select_edges(sample: &[f64], method: &BinMethod, manual_width: Option<f64>) -> Vec<f64> {
    let data = sorted_finite(sample);
    if data.is_empty() {
        return DEGENERATE_EDGES.to_vec();
    }
    let (lo, hi) = trimmed_support(&data);
    let count = heuristic_count(&data, method, manual_width, hi - lo);
    linspace(lo, hi, count.max(1).saturating_add(1))
}

/// `count` equal-width bins over the trimmed support of `sample`
///
/// Used for per-variable count overrides; shares the degenerate-input rule of
/// [`select_edges`]. Counts above [`MAX_BIN_COUNT`] are capped.
#[must_use]
pub fn equal_width_edges(sample: &[f64], count: usize) -> Vec<f64> {
    let data = sorted_finite(sample);
    if data.is_empty() {
        return DEGENERATE_EDGES.to_vec();
    }
    let (lo, hi) = trimmed_support(&data);
    linspace(lo, hi, count.min(MAX_BIN_COUNT) + 1)
}

/// 1st and 99th percentile of an ascending, non-empty sample
fn trimmed_support(sorted: &[f64]) -> (f64, f64) {
    (
        percentile(sorted, LOWER_PERCENTILE),
        percentile(sorted, UPPER_PERCENTILE),
    )
}

#[allow(clippy::cast_precision_loss)]
fn heuristic_count(sorted: &[f64], method: &BinMethod, manual_width: Option<f64>, span: f64) -> usize {
    let n = sorted.len() as f64;
    match method {
        BinMethod::Sturges => sturges_count(sorted.len()),
        BinMethod::Scott => {
            let sigma = spread(sorted);
            if sigma == 0.0 {
                DEFAULT_BIN_COUNT
            } else {
                let h = 3.5 * sigma * n.powf(-1.0 / 3.0);
                ceil_count(span / h.max(MIN_BIN_WIDTH))
            }
        }
        BinMethod::FreedmanDiaconis => {
            let iqr = interquartile_range(sorted);
            if iqr == 0.0 {
                DEFAULT_BIN_COUNT
            } else {
                let h = 2.0 * iqr * n.powf(-1.0 / 3.0);
                ceil_count(span / h.max(MIN_BIN_WIDTH))
            }
        }
        BinMethod::Manual => match manual_width {
            Some(width) if width > 0.0 => ceil_count(span / width),
            _ => DEFAULT_BIN_COUNT,
        },
        BinMethod::Unrecognized(_) => DEFAULT_BIN_COUNT,
    }
}

/// Population standard deviation; exactly zero for a constant sample
fn spread(sorted: &[f64]) -> f64 {
    match (sorted.first(), sorted.last()) {
        (Some(first), Some(last)) if first < last => stats::std_dev(sorted, 0),
        _ => 0.0,
    }
}

fn interquartile_range(sorted: &[f64]) -> f64 {
    percentile(sorted, 75.0) - percentile(sorted, 25.0)
}

#[allow(clippy::cast_precision_loss)]
fn sturges_count(n: usize) -> usize {
    let n = n.max(1) as f64;
    ceil_count(n.log2()) + 1
}

/// Ceiling as a bin count; anything below one (or NaN) becomes zero
///
/// An infinite ceiling or one above [`MAX_BIN_COUNT`] becomes
/// [`DEFAULT_BIN_COUNT`].
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn ceil_count(x: f64) -> usize {
    let c = x.ceil();
    if c > MAX_BIN_COUNT as f64 {
        DEFAULT_BIN_COUNT
    } else if c >= 1.0 {
        c as usize
    } else {
        0
    }
}

/// Sturges bin-count recommendation: `ceil(log2(n)) + 1` over finite values
///
/// ```rust
/// use pose_kinematics::binning::sturges_bins;
///
/// assert_eq!(sturges_bins(&[1.0]), 1);
/// assert_eq!(sturges_bins(&[1.0, f64::NAN, 2.0, 3.0, 4.0]), 3);
/// ```
#[must_use]
pub fn sturges_bins(sample: &[f64]) -> usize {
    let n = sample.iter().filter(|v| v.is_finite()).count();
    sturges_count(n).max(1)
}

/// Scott bin-count recommendation over the full min/max range
///
/// One bin below two finite values, ten when the sample has no spread.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn scott_bins(sample: &[f64]) -> usize {
    let data = sorted_finite(sample);
    if data.len() < 2 {
        return 1;
    }
    let sigma = spread(&data);
    if sigma == 0.0 {
        return DEFAULT_BIN_COUNT;
    }
    let h = 3.5 * sigma * (data.len() as f64).powf(-1.0 / 3.0);
    if h <= 0.0 {
        return DEFAULT_BIN_COUNT;
    }
    ceil_count(full_span(&data) / h).max(1)
}

/// Freedman-Diaconis bin-count recommendation over the full min/max range
///
/// One bin below two finite values, ten when the IQR is zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn freedman_diaconis_bins(sample: &[f64]) -> usize {
    let data = sorted_finite(sample);
    if data.len() < 2 {
        return 1;
    }
    let iqr = interquartile_range(&data);
    if iqr == 0.0 {
        return DEFAULT_BIN_COUNT;
    }
    let h = 2.0 * iqr * (data.len() as f64).powf(-1.0 / 3.0);
    if h <= 0.0 {
        return DEFAULT_BIN_COUNT;
    }
    ceil_count(full_span(&data) / h).max(1)
}

fn full_span(sorted: &[f64]) -> f64 {
    match (sorted.first(), sorted.last()) {
        (Some(first), Some(last)) => last - first,
        _ => 0.0,
    }
}

/// Bin counts recommended by each heuristic for one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinRecommendation {
    /// [`sturges_bins`]
    pub sturges: usize,
    /// [`freedman_diaconis_bins`]
    pub freedman_diaconis: usize,
    /// [`scott_bins`]
    pub scott: usize,
}

impl BinRecommendation {
    /// Evaluate all three heuristics on `sample`
    #[must_use]
    pub fn for_sample(sample: &[f64]) -> Self {
        Self {
            sturges: sturges_bins(sample),
            freedman_diaconis: freedman_diaconis_bins(sample),
            scott: scott_bins(sample),
        }
    }
}
