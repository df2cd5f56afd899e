//! Table persistence (CSV/Parquet ⇄ Arrow)
//!
//! Every table the pipeline produces is materialized in memory as one Arrow
//! [`RecordBatch`] and written whole at the end of its computation:
//! - Format is chosen by extension (`.parquet`, anything else is CSV)
//! - Writes go to a hidden sibling file that is renamed over the target after
//!   a successful flush, so a crashed stage never leaves a truncated table

pub mod csv;
pub mod pose;

use crate::{Error, Result};
use arrow::array::{Array, RecordBatch, StringArray};
use arrow::compute;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

pub use self::csv::CsvReadOptions;

/// On-disk table format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Comma-separated values with a header row
    Csv,
    /// Apache Parquet
    Parquet,
}

impl TableFormat {
    /// Format implied by the file extension of `path`
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => Self::Parquet,
            _ => Self::Csv,
        }
    }
}

/// Load a table from disk
///
/// # Errors
/// Returns [`Error::MissingInput`] if the file does not exist, or a storage
/// error if it cannot be parsed
pub fn read_table(path: &Path, options: &CsvReadOptions) -> Result<RecordBatch> {
    if !path.is_file() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }
    match TableFormat::from_path(path) {
        TableFormat::Csv => {
            let file = File::open(path)?;
            self::csv::read_csv_from(file, options)
        }
        TableFormat::Parquet => read_parquet(path),
    }
}

fn read_parquet(path: &Path) -> Result<RecordBatch> {
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    let file = File::open(path)
        .map_err(|e| Error::StorageError(format!("Failed to open Parquet file: {e}")))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| Error::StorageError(format!("Failed to parse Parquet file: {e}")))?;
    let schema = builder.schema().clone();
    let reader = builder
        .build()
        .map_err(|e| Error::StorageError(format!("Failed to create Parquet reader: {e}")))?;

    let mut batches = Vec::new();
    for batch in reader {
        batches.push(
            batch.map_err(|e| Error::StorageError(format!("Failed to read record batch: {e}")))?,
        );
    }
    Ok(compute::concat_batches(&schema, &batches)?)
}

/// Write a table to disk, replacing any existing file
///
/// Parent directories are created as needed.
///
/// # Errors
/// Returns error if the table cannot be serialized or the file written
pub fn write_table(path: &Path, batch: &RecordBatch) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let staging = staging_path(path);
    let written = write_staged(&staging, TableFormat::from_path(path), batch);
    if let Err(e) = written {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }
    fs::rename(&staging, path)?;
    Ok(())
}

fn write_staged(staging: &Path, format: TableFormat, batch: &RecordBatch) -> Result<()> {
    let file = File::create(staging)?;
    match format {
        TableFormat::Csv => {
            let mut out = BufWriter::new(file);
            self::csv::write_csv_to(&mut out, batch)?;
            out.into_inner()
                .map_err(|e| Error::Io(e.into_error()))?
                .sync_all()?;
        }
        TableFormat::Parquet => {
            let mut writer = parquet::arrow::ArrowWriter::try_new(file, batch.schema(), None)?;
            writer.write(batch)?;
            writer.close()?;
        }
    }
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "table".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.partial"))
}

/// Concatenate same-schema batches into one
///
/// # Errors
/// Returns error if `batches` is empty or the schemas differ
pub fn concat_tables(batches: &[RecordBatch]) -> Result<RecordBatch> {
    let first = batches
        .first()
        .ok_or_else(|| Error::InvalidInput("No tables to concatenate".to_string()))?;
    let schema = first.schema();
    for batch in &batches[1..] {
        if batch.schema() != schema {
            return Err(Error::StorageError(format!(
                "Schema mismatch: expected {:?}, got {:?}",
                schema,
                batch.schema()
            )));
        }
    }
    Ok(compute::concat_batches(&schema, batches)?)
}

/// Values of a text column; nulls become empty strings
///
/// Non-text columns are cast to text first.
///
/// # Errors
/// Returns [`Error::MissingColumn`] if the column does not exist
pub fn string_values(batch: &RecordBatch, column: &str) -> Result<Vec<String>> {
    let array = batch
        .column_by_name(column)
        .ok_or_else(|| Error::missing_column(column))?;
    let casted = compute::cast(array, &arrow::datatypes::DataType::Utf8)?;
    let strings = casted
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| Error::Other("Failed to downcast to StringArray".to_string()))?;
    Ok((0..strings.len())
        .map(|i| {
            if strings.is_null(i) {
                String::new()
            } else {
                strings.value(i).to_string()
            }
        })
        .collect())
}

/// Drop the named column if present
///
/// # Errors
/// Returns error if the projection fails
pub fn drop_column(batch: &RecordBatch, column: &str) -> Result<RecordBatch> {
    let schema = batch.schema();
    let keep: Vec<usize> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| f.name() != column)
        .map(|(i, _)| i)
        .collect();
    Ok(batch.project(&keep)?)
}
