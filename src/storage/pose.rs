//! Per-subject pose trajectory files
//!
//! A pose directory holds one CSV per subject; the file stem is the subject
//! name. Files may be headerless, in which case positional columns are
//! relabeled from a caller-supplied list of `<landmark>_<axis>` names.

use super::csv::{read_csv_from, CsvReadOptions};
use crate::features::KeypointFrame;
use crate::{Error, Result};
use arrow::array::RecordBatch;
use arrow::datatypes::{Field, Schema};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// How to interpret pose CSV files
#[derive(Debug, Clone)]
pub struct PoseReadOptions {
    /// Names for the leading columns; surplus columns are dropped
    pub labels: Option<Vec<String>>,
    /// Landmarks whose coordinate columns are removed after labeling
    pub exclude_keypoints: Vec<String>,
    /// Coordinate suffixes used to find excluded columns
    pub coord_suffixes: Vec<String>,
    /// Header handling; `None` means "header unless labels are given"
    pub has_header: Option<bool>,
}

impl Default for PoseReadOptions {
    fn default() -> Self {
        Self {
            labels: None,
            exclude_keypoints: Vec::new(),
            coord_suffixes: vec!["_x".into(), "_y".into(), "_z".into()],
            has_header: None,
        }
    }
}

impl PoseReadOptions {
    fn header(&self) -> bool {
        self.has_header.unwrap_or(self.labels.is_none())
    }
}

/// One subject's trajectory
#[derive(Debug, Clone)]
pub struct PoseRecording {
    /// Subject name (file stem)
    pub name: String,
    /// Keypoint coordinates
    pub frame: KeypointFrame,
}

/// Sorted `*.csv` files directly inside `dir`
///
/// # Errors
/// Returns [`Error::MissingInput`] if `dir` is not a directory
pub fn list_csvs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::MissingInput(dir.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "csv");
        if is_csv && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read one pose file, applying labels and keypoint exclusion
///
/// # Errors
/// Returns error if the file cannot be read or parsed
pub fn read_pose_table(path: &Path, options: &PoseReadOptions) -> Result<KeypointFrame> {
    let csv_options = CsvReadOptions {
        has_header: options.header(),
        text_columns: Vec::new(),
    };
    let batch = read_csv_from(File::open(path)?, &csv_options)?;
    let batch = apply_labels(batch, options.labels.as_deref())?;
    let batch = exclude_keypoints(&batch, &options.exclude_keypoints, &options.coord_suffixes)?;
    Ok(KeypointFrame::new(batch))
}

/// Read every pose file in `dir`, in file-name order
///
/// # Errors
/// Returns [`Error::MissingInput`] if `dir` does not exist, or the first read
/// error encountered
pub fn load_pose_folder(dir: &Path, options: &PoseReadOptions) -> Result<Vec<PoseRecording>> {
    list_csvs(dir)?
        .into_iter()
        .map(|path| {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            debug!(subject = %name, path = %path.display(), "Reading pose file");
            Ok(PoseRecording {
                name,
                frame: read_pose_table(&path, options)?,
            })
        })
        .collect()
}

/// Rename the leading columns; more labels than columns leaves the table as is
fn apply_labels(batch: RecordBatch, labels: Option<&[String]>) -> Result<RecordBatch> {
    let Some(labels) = labels else {
        return Ok(batch);
    };
    if labels.len() > batch.num_columns() {
        return Ok(batch);
    }
    let schema = batch.schema();
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .zip(labels)
        .map(|(field, label)| field.as_ref().clone().with_name(label.clone()))
        .collect();
    let columns = batch.columns()[..labels.len()].to_vec();
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

fn exclude_keypoints(
    batch: &RecordBatch,
    exclude: &[String],
    suffixes: &[String],
) -> Result<RecordBatch> {
    if exclude.is_empty() {
        return Ok(batch.clone());
    }
    let dropped: Vec<String> = exclude
        .iter()
        .flat_map(|base| suffixes.iter().map(move |suffix| format!("{base}{suffix}")))
        .collect();
    let schema = batch.schema();
    let keep: Vec<usize> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| !dropped.contains(f.name()))
        .map(|(i, _)| i)
        .collect();
    Ok(batch.project(&keep)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Axis;
    use std::fs;

    fn labels(names: &[&str]) -> Option<Vec<String>> {
        Some(names.iter().map(ToString::to_string).collect())
    }

    #[test]
    fn test_list_csvs_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.csv"), "x\n1\n").unwrap();
        fs::write(dir.path().join("a.csv"), "x\n1\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignore").unwrap();
        fs::create_dir(dir.path().join("sub.csv")).unwrap();

        let files = list_csvs(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.csv", "b.csv"]);
    }

    #[test]
    fn test_list_csvs_missing_dir() {
        let err = list_csvs(Path::new("/nonexistent/pose")).unwrap_err();
        assert!(matches!(err, Error::MissingInput(_)));
    }

    #[test]
    fn test_labels_applied_to_headerless_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m1.csv");
        fs::write(&path, "1,2,3,9\n4,5,6,9\n").unwrap();

        let options = PoseReadOptions {
            labels: labels(&["head_x", "head_y", "head_z"]),
            ..PoseReadOptions::default()
        };
        let frame = read_pose_table(&path, &options).unwrap();
        assert_eq!(frame.column_names(), vec!["head_x", "head_y", "head_z"]);
        assert_eq!(frame.coordinates("head", Axis::Z).unwrap(), vec![3.0, 6.0]);
    }

    #[test]
    fn test_too_many_labels_keeps_original_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m1.csv");
        fs::write(&path, "1,2\n").unwrap();

        let options = PoseReadOptions {
            labels: labels(&["a", "b", "c"]),
            ..PoseReadOptions::default()
        };
        let frame = read_pose_table(&path, &options).unwrap();
        assert_eq!(frame.column_names(), vec!["0", "1"]);
    }

    #[test]
    fn test_exclude_keypoints() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m1.csv");
        fs::write(&path, "head_x,head_y,tail_x,tail_y\n1,2,3,4\n").unwrap();

        let options = PoseReadOptions {
            exclude_keypoints: vec!["tail".to_string()],
            ..PoseReadOptions::default()
        };
        let frame = read_pose_table(&path, &options).unwrap();
        assert_eq!(frame.column_names(), vec!["head_x", "head_y"]);
    }

    #[test]
    fn test_explicit_header_with_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m1.csv");
        fs::write(&path, "c0,c1\n1,2\n").unwrap();

        let options = PoseReadOptions {
            labels: labels(&["head_x", "head_y"]),
            has_header: Some(true),
            ..PoseReadOptions::default()
        };
        let frame = read_pose_table(&path, &options).unwrap();
        assert_eq!(frame.num_rows(), 1);
        assert_eq!(frame.coordinates("head", Axis::Y).unwrap(), vec![2.0]);
    }

    #[test]
    fn test_load_pose_folder_names_from_stems() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("mouse_02.csv"), "head_x\n1\n").unwrap();
        fs::write(dir.path().join("mouse_01.csv"), "head_x\n1\n2\n").unwrap();

        let recordings = load_pose_folder(dir.path(), &PoseReadOptions::default()).unwrap();
        assert_eq!(recordings.len(), 2);
        assert_eq!(recordings[0].name, "mouse_01");
        assert_eq!(recordings[0].frame.num_rows(), 2);
        assert_eq!(recordings[1].name, "mouse_02");
    }
}
