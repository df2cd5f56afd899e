//! Settings document
//!
//! One YAML file drives a run. Every section and field is optional; missing
//! values take the defaults below, so an empty document is a valid
//! configuration.
//!
//! ```yaml
//! paths:
//!   pose_dir: data/pose_traj
//!   group_index_csv: data/SIT/SIratio.csv
//!   results_dir: results
//! analysis:
//!   steps: [compute_scalars, optimize_bins, build_histograms]
//! parameters:
//!   fps: 30
//!   smoothing_window: 5
//!   bin_method: freedman_diaconis
//!   variable_bins:
//!     length: 20                  # count over the 1st-99th percentile range
//!     height: [-1.0, 0.0, 1.0]    # explicit edges
//! ```
//!
//! Relative paths are resolved against a root directory (the working
//! directory for the CLI) by [`Settings::resolve_paths`].

use crate::binning::BinMethod;
use crate::features::{FeatureParams, LandmarkPair, ANUS, HEAD, TORSO};
use crate::histogram::{BinOverride, HistogramConfig, ManualWidths, UnitClassification, VariableUnit};
use crate::storage::pose::PoseReadOptions;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default ablation tag; any other tag names the histogram directory suffix
pub const DEFAULT_ABLATION_TAG: &str = "ablation";

/// Complete run configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Input and output locations
    pub paths: PathsConfig,
    /// Step selection
    pub analysis: AnalysisConfig,
    /// Algorithm parameters
    pub parameters: Parameters,
}

/// Input and output locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Raw tables cleaned by the preprocess step
    pub raw: PathBuf,
    /// Destination of cleaned tables
    pub processed: PathBuf,
    /// One pose CSV per subject
    pub pose_dir: PathBuf,
    /// Subject → group table (`name`, `group` columns)
    pub group_index_csv: PathBuf,
    /// Root of every analysis output
    pub results_dir: PathBuf,
    /// Figure output (created, not written)
    pub figures_dir: PathBuf,
    /// Table output (created, not written)
    pub tables_dir: Option<PathBuf>,
    /// Histogram output; defaults to `<results_dir>/scalar_histograms`
    pub histogram_dir: Option<PathBuf>,
    /// Scalar table read by the histogram step; defaults to
    /// `<results_dir>/scalar_summaries.csv`
    pub scalars_csv: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw: PathBuf::from("data/raw"),
            processed: PathBuf::from("data/processed"),
            pose_dir: PathBuf::from("data/pose_traj"),
            group_index_csv: PathBuf::from("data/SIT/SIratio.csv"),
            results_dir: PathBuf::from("results"),
            figures_dir: PathBuf::from("results/figures"),
            tables_dir: None,
            histogram_dir: None,
            scalars_csv: None,
        }
    }
}

impl PathsConfig {
    /// Scalar table written by the scalar step
    #[must_use]
    pub fn scalar_summaries(&self) -> PathBuf {
        self.results_dir.join("scalar_summaries.csv")
    }

    /// Scalar table consumed by the histogram step
    #[must_use]
    pub fn scalars_csv(&self) -> PathBuf {
        self.scalars_csv
            .clone()
            .unwrap_or_else(|| self.scalar_summaries())
    }

    /// Histogram output directory
    #[must_use]
    pub fn histogram_dir(&self) -> PathBuf {
        self.histogram_dir
            .clone()
            .unwrap_or_else(|| self.results_dir.join("scalar_histograms"))
    }

    /// Bin-recommendation report
    #[must_use]
    pub fn bin_recommendations(&self) -> PathBuf {
        self.results_dir
            .join("configs")
            .join("histogram_bin_recommendations.csv")
    }
}

/// Step selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Step names run in order when the CLI names none
    pub steps: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            steps: vec!["preprocess".into(), "analyze".into(), "plot".into()],
        }
    }
}

/// Algorithm parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Frame rate of the pose recordings
    pub fps: f64,
    /// Centered moving-average window; null, 0 or 1 disables smoothing
    pub smoothing_window: Option<usize>,
    /// Arena origin in the xy plane
    pub origin: [f64; 2],
    /// Landmarks averaged into the body centre
    pub centerpoint: LandmarkPair,
    /// Body-length landmark pair
    pub length_criteria: LandmarkPair,
    /// Height landmark pair
    pub height_criteria: LandmarkPair,
    /// Velocity landmark pair
    pub velocity_criteria: LandmarkPair,
    /// Positional column labels for headerless pose files
    pub labels: Option<Vec<String>>,
    /// File with one label per non-blank line (used when `labels` is unset)
    pub labels_file: Option<PathBuf>,
    /// Landmarks dropped from every pose file
    pub exclude_keypoints: Vec<String>,
    /// Coordinate suffixes of excluded landmarks
    pub coord_suffixes: Vec<String>,
    /// Whether pose files carry a header row
    pub pose_has_header: bool,
    /// Variables to bin; empty means every scalar column
    pub variables: Vec<String>,
    /// Bin-count rule
    pub bin_method: BinMethod,
    /// Manual bin width for distance-like variables
    pub manual_bin_width_distance_like: f64,
    /// Manual bin width for angle-like variables (radians)
    pub manual_bin_width_angle_like: f64,
    /// Per-variable bin count or explicit edges
    pub variable_bins: BTreeMap<String, BinOverride>,
    /// Unit classification entries added to the built-in one
    pub variable_units: BTreeMap<String, VariableUnit>,
    /// Run-wide seed
    pub random_seed: u64,
    /// Syllable ablation
    pub ablation: AblationConfig,
}

impl Default for Parameters {
    fn default() -> Self {
        let features = FeatureParams::default();
        let widths = ManualWidths::default();
        Self {
            fps: features.fps,
            smoothing_window: features.smoothing_window,
            origin: features.origin,
            centerpoint: LandmarkPair::new(HEAD, TORSO),
            length_criteria: LandmarkPair::new(HEAD, ANUS),
            height_criteria: LandmarkPair::new(HEAD, ANUS),
            velocity_criteria: LandmarkPair::new(HEAD, TORSO),
            labels: None,
            labels_file: None,
            exclude_keypoints: Vec::new(),
            coord_suffixes: vec!["_x".into(), "_y".into(), "_z".into()],
            pose_has_header: false,
            variables: Vec::new(),
            bin_method: BinMethod::default(),
            manual_bin_width_distance_like: widths.distance,
            manual_bin_width_angle_like: widths.angle,
            variable_bins: BTreeMap::new(),
            variable_units: BTreeMap::new(),
            random_seed: 42,
            ablation: AblationConfig::default(),
        }
    }
}

/// Syllable ablation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AblationConfig {
    /// Per-frame table with `name` and `syllable` columns
    pub input_csv: Option<PathBuf>,
    /// Output file (`.csv`) or directory
    pub output_csv: Option<PathBuf>,
    /// Syllable ids whose rows are resampled away
    pub exclude_syllables: Vec<i64>,
    /// Resampling seed
    pub random_seed: u64,
}

impl Default for AblationConfig {
    fn default() -> Self {
        Self {
            input_csv: None,
            output_csv: None,
            exclude_syllables: Vec::new(),
            random_seed: 42,
        }
    }
}

impl AblationConfig {
    /// Excluded ids ascending, formatted `[a,b]`
    #[must_use]
    pub fn excluded_label(&self) -> String {
        let mut ids = self.exclude_syllables.clone();
        ids.sort_unstable();
        let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
        format!("[{}]", ids.join(","))
    }
}

/// Command-line path overrides, applied before resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathOverrides {
    /// Replaces `paths.pose_dir`
    pub pose_dir: Option<PathBuf>,
    /// Replaces `paths.group_index_csv`
    pub group_index_csv: Option<PathBuf>,
    /// Replaces `paths.results_dir`
    pub results_dir: Option<PathBuf>,
    /// Replaces `paths.histogram_dir`
    pub histogram_dir: Option<PathBuf>,
    /// Replaces `paths.figures_dir`
    pub figures_dir: Option<PathBuf>,
}

impl Settings {
    /// Load a settings document
    ///
    /// # Errors
    /// Returns [`Error::MissingInput`] if the file does not exist, or
    /// [`Error::Yaml`] if it is not a valid settings document
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::MissingInput(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a settings document; blank input yields the defaults
    ///
    /// # Errors
    /// Returns [`Error::Yaml`] on malformed YAML or mistyped fields
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Replace paths named on the command line
    pub fn apply_overrides(&mut self, overrides: &PathOverrides) {
        let paths = &mut self.paths;
        if let Some(p) = &overrides.pose_dir {
            paths.pose_dir.clone_from(p);
        }
        if let Some(p) = &overrides.group_index_csv {
            paths.group_index_csv.clone_from(p);
        }
        if let Some(p) = &overrides.results_dir {
            paths.results_dir.clone_from(p);
        }
        if let Some(p) = &overrides.histogram_dir {
            paths.histogram_dir = Some(p.clone());
        }
        if let Some(p) = &overrides.figures_dir {
            paths.figures_dir.clone_from(p);
        }
    }

    /// Point the histogram step at the ablation output
    ///
    /// `scalars_csv` becomes the file the ablation step writes for
    /// `ablation.output_csv` (when set) and the histogram directory gains a
    /// suffix: `_<tag>` for a custom tag, otherwise `_replace_syll_[ids]`, or
    /// `_ablation` with no excluded ids.
    pub fn apply_ablation(&mut self, tag: &str) {
        let ablation = &self.parameters.ablation;
        if let Some(out) = &ablation.output_csv {
            let input = ablation.input_csv.as_deref().unwrap_or_else(|| Path::new(""));
            self.paths.scalars_csv = Some(crate::pipeline::ablation_output_path(
                input,
                out,
                &ablation.exclude_syllables,
            ));
        }
        let suffix = if !tag.is_empty() && tag != DEFAULT_ABLATION_TAG {
            tag.to_string()
        } else if ablation.exclude_syllables.is_empty() {
            DEFAULT_ABLATION_TAG.to_string()
        } else {
            format!("replace_syll_{}", ablation.excluded_label())
        };
        let base = self.paths.histogram_dir();
        let name = base
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.paths.histogram_dir = Some(base.with_file_name(format!("{name}_{suffix}")));
    }

    /// Make every relative path absolute against `root` and create the
    /// output directory layout
    ///
    /// Directory-like paths (no extension) are created; for file-like paths
    /// the parent is created.
    ///
    /// # Errors
    /// Returns error if a directory cannot be created
    pub fn resolve_paths(&mut self, root: &Path) -> Result<()> {
        let anchor = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = root.join(&*p);
            }
        };
        let paths = &mut self.paths;
        for p in [
            &mut paths.raw,
            &mut paths.processed,
            &mut paths.pose_dir,
            &mut paths.group_index_csv,
            &mut paths.results_dir,
            &mut paths.figures_dir,
        ] {
            anchor(p);
        }
        let params = &mut self.parameters;
        for p in [
            paths.tables_dir.as_mut(),
            paths.histogram_dir.as_mut(),
            paths.scalars_csv.as_mut(),
            params.labels_file.as_mut(),
            params.ablation.input_csv.as_mut(),
            params.ablation.output_csv.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            anchor(p);
        }

        let mut layout = vec![
            paths.results_dir.clone(),
            paths.figures_dir.clone(),
            paths.histogram_dir(),
            paths.pose_dir.clone(),
            paths.group_index_csv.clone(),
            paths.scalars_csv(),
        ];
        layout.extend(paths.tables_dir.clone());
        for p in layout {
            let dir = if p.extension().is_none() {
                p.as_path()
            } else {
                match p.parent() {
                    Some(parent) => parent,
                    None => continue,
                }
            };
            debug!(dir = %dir.display(), "Ensuring directory");
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Feature-extraction parameters
    #[must_use]
    pub fn feature_params(&self) -> FeatureParams {
        let p = &self.parameters;
        FeatureParams {
            fps: p.fps,
            origin: p.origin,
            smoothing_window: p.smoothing_window.filter(|w| *w > 0),
            centerpoint: p.centerpoint.clone(),
            length_criteria: p.length_criteria.clone(),
            height_criteria: p.height_criteria.clone(),
            velocity_criteria: p.velocity_criteria.clone(),
        }
    }

    /// Histogram binning configuration
    #[must_use]
    pub fn histogram_config(&self) -> HistogramConfig {
        let p = &self.parameters;
        let mut units = UnitClassification::default();
        units.extend(p.variable_units.clone());
        HistogramConfig {
            method: p.bin_method.clone(),
            manual_widths: ManualWidths {
                distance: p.manual_bin_width_distance_like,
                angle: p.manual_bin_width_angle_like,
            },
            overrides: p.variable_bins.clone(),
            units,
        }
    }

    /// Explicit variable list, `None` when every column is binned
    #[must_use]
    pub fn variables(&self) -> Option<&[String]> {
        let vars = &self.parameters.variables;
        (!vars.is_empty()).then_some(vars.as_slice())
    }

    /// Pose-file interpretation
    ///
    /// Inline `labels` win over `labels_file`; a labels file that does not
    /// exist is ignored with a warning.
    ///
    /// # Errors
    /// Returns error if the labels file exists but cannot be read
    pub fn pose_read_options(&self) -> Result<PoseReadOptions> {
        let p = &self.parameters;
        let labels = match (&p.labels, &p.labels_file) {
            (Some(labels), _) => Some(labels.clone()),
            (None, Some(file)) if file.is_file() => Some(read_labels(file)?),
            (None, Some(file)) => {
                warn!(path = %file.display(), "Labels file not found, using file headers");
                None
            }
            (None, None) => None,
        };
        Ok(PoseReadOptions {
            labels,
            exclude_keypoints: p.exclude_keypoints.clone(),
            coord_suffixes: p.coord_suffixes.clone(),
            has_header: Some(p.pose_has_header),
        })
    }
}

fn read_labels(path: &Path) -> Result<Vec<String>> {
    Ok(fs::read_to_string(path)?
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}
