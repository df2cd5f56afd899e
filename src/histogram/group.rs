//! Subject → group membership

use crate::features::NAME_COLUMN;
use crate::storage::{self, CsvReadOptions};
use crate::{Error, Result};
use arrow::array::RecordBatch;
use std::collections::BTreeMap;
use std::path::Path;

/// Group label column
pub const GROUP_COLUMN: &str = "group";

/// Mapping from subject name to group label
///
/// Subjects missing from the index are excluded from aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupIndex {
    groups: BTreeMap<String, String>,
}

impl GroupIndex {
    /// Build from `(subject, group)` pairs; later duplicates win
    pub fn from_pairs<I, S, G>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, G)>,
        S: Into<String>,
        G: Into<String>,
    {
        Self {
            groups: pairs
                .into_iter()
                .map(|(s, g)| (s.into(), g.into()))
                .collect(),
        }
    }

    /// Build from a table with `name` and `group` columns
    ///
    /// # Errors
    /// Returns [`Error::MissingColumn`] if either column is absent
    pub fn from_table(batch: &RecordBatch) -> Result<Self> {
        let names = storage::string_values(batch, NAME_COLUMN)?;
        let groups = storage::string_values(batch, GROUP_COLUMN)?;
        Ok(Self::from_pairs(names.into_iter().zip(groups)))
    }

    /// Load a group-index CSV (or Parquet) file
    ///
    /// # Errors
    /// Returns [`Error::MissingInput`] if the file does not exist, or
    /// [`Error::MissingColumn`] if it lacks `name`/`group`
    pub fn load(path: &Path) -> Result<Self> {
        let options = CsvReadOptions::with_text_columns(&[NAME_COLUMN, GROUP_COLUMN]);
        let batch = storage::read_table(path, &options)?;
        Self::from_table(&batch).map_err(|e| match e {
            Error::MissingColumn { column } => Error::MissingColumn {
                column: format!("{column} (in {})", path.display()),
            },
            other => other,
        })
    }

    /// Group label of `subject`
    #[must_use]
    pub fn group_of(&self, subject: &str) -> Option<&str> {
        self.groups.get(subject).map(String::as_str)
    }

    /// Number of indexed subjects
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// True when no subject is indexed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_from_pairs_lookup() {
        let index = GroupIndex::from_pairs([("m1", "ctrl"), ("m2", "stress")]);
        assert_eq!(index.group_of("m2"), Some("stress"));
        assert_eq!(index.group_of("m3"), None);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_load_keeps_numeric_names_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.csv");
        fs::write(&path, "name,group,SIratio\n001,A,0.4\n002,B,1.2\n").unwrap();
        let index = GroupIndex::load(&path).unwrap();
        assert_eq!(index.group_of("001"), Some("A"));
    }

    #[test]
    fn test_load_requires_group_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.csv");
        fs::write(&path, "name,cohort\nm1,A\n").unwrap();
        let err = GroupIndex::load(&path).unwrap_err();
        assert!(err.to_string().contains("group"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = GroupIndex::load(Path::new("/nonexistent/index.csv")).unwrap_err();
        assert!(matches!(err, Error::MissingInput(_)));
    }
}
