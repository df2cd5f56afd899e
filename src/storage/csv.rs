//! CSV ⇄ Arrow conversion
//!
//! Column types are inferred per column: `Float64` when every non-empty cell
//! parses as a float, `Utf8` otherwise (or when the caller pins the column as
//! text). Empty cells are nulls, and null/NaN floats are written back as empty
//! cells, so missing values survive a write/read cycle.

use crate::{Error, Result};
use arrow::array::{
    Array, ArrayRef, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    RecordBatch, StringArray, UInt32Array, UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use std::io::{Read, Write};
use std::sync::Arc;

/// CSV parsing options
#[derive(Debug, Clone)]
pub struct CsvReadOptions {
    /// First record holds column names; otherwise columns are named "0", "1", ...
    pub has_header: bool,
    /// Columns always read as text, even when every cell looks numeric
    pub text_columns: Vec<String>,
}

impl Default for CsvReadOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            text_columns: Vec::new(),
        }
    }
}

impl CsvReadOptions {
    /// Options for a headered table with the given text columns
    #[must_use]
    pub fn with_text_columns(columns: &[&str]) -> Self {
        Self {
            has_header: true,
            text_columns: columns.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Parse CSV from a reader into a single record batch
///
/// Short records are padded with nulls.
///
/// # Errors
/// Returns error on malformed CSV or a record with more fields than columns
pub fn read_csv_from<R: Read>(reader: R, options: &CsvReadOptions) -> Result<RecordBatch> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(options.has_header)
        .flexible(true)
        .from_reader(reader);

    let mut names: Vec<String> = if options.has_header {
        csv_reader.headers()?.iter().map(ToString::to_string).collect()
    } else {
        Vec::new()
    };

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); names.len()];
    let mut num_rows = 0usize;
    for record in csv_reader.records() {
        let record = record?;
        if !options.has_header && names.is_empty() {
            names = (0..record.len()).map(|i| i.to_string()).collect();
            cells = vec![Vec::new(); names.len()];
        }
        if record.len() > names.len() {
            return Err(Error::StorageError(format!(
                "Expected {} fields, saw {} on data row {}",
                names.len(),
                record.len(),
                num_rows + 1
            )));
        }
        for (i, column) in cells.iter_mut().enumerate() {
            let cell = record.get(i).map(str::trim).filter(|c| !c.is_empty());
            column.push(cell.map(ToString::to_string));
        }
        num_rows += 1;
    }

    let mut fields = Vec::with_capacity(names.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(names.len());
    for (name, column) in names.into_iter().zip(cells) {
        let pinned = options.text_columns.iter().any(|c| *c == name);
        let floats = if pinned { None } else { parse_floats(&column) };
        match floats {
            Some(values) => {
                fields.push(Field::new(name, DataType::Float64, true));
                arrays.push(Arc::new(Float64Array::from(values)));
            }
            None => {
                fields.push(Field::new(name, DataType::Utf8, true));
                arrays.push(Arc::new(StringArray::from(column)));
            }
        }
    }

    let schema = Arc::new(Schema::new(fields));
    if arrays.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }
    Ok(RecordBatch::try_new(schema, arrays)?)
}

/// `Some` when every present cell parses as `f64`
fn parse_floats(column: &[Option<String>]) -> Option<Vec<Option<f64>>> {
    column
        .iter()
        .map(|cell| match cell {
            None => Some(None),
            Some(text) => text.parse::<f64>().ok().map(Some),
        })
        .collect()
}

/// Serialize a record batch as CSV with a header row
///
/// # Errors
/// Returns error for unsupported column types or on write failure
pub fn write_csv_to<W: Write>(writer: W, batch: &RecordBatch) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let schema = batch.schema();
    csv_writer.write_record(schema.fields().iter().map(|f| f.name().as_str()))?;

    let columns: Vec<Vec<String>> = batch
        .columns()
        .iter()
        .map(format_column)
        .collect::<Result<_>>()?;
    for row in 0..batch.num_rows() {
        csv_writer.write_record(columns.iter().map(|c| c[row].as_str()))?;
    }
    csv_writer.flush()?;
    Ok(())
}

macro_rules! format_primitive {
    ($array:expr, $ty:ty) => {{
        let typed = $array
            .as_any()
            .downcast_ref::<$ty>()
            .ok_or_else(|| Error::Other(format!("Failed to downcast to {}", stringify!($ty))))?;
        typed
            .iter()
            .map(|v| v.map(|v| v.to_string()).unwrap_or_default())
            .collect()
    }};
}

fn format_column(array: &ArrayRef) -> Result<Vec<String>> {
    Ok(match array.data_type() {
        DataType::Float64 => {
            let typed = array
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| Error::Other("Failed to downcast to Float64Array".to_string()))?;
            typed.iter().map(format_float).collect()
        }
        DataType::Float32 => {
            let typed = array
                .as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(|| Error::Other("Failed to downcast to Float32Array".to_string()))?;
            typed.iter().map(|v| format_float(v.map(f64::from))).collect()
        }
        DataType::Int32 => format_primitive!(array, Int32Array),
        DataType::Int64 => format_primitive!(array, Int64Array),
        DataType::UInt32 => format_primitive!(array, UInt32Array),
        DataType::UInt64 => format_primitive!(array, UInt64Array),
        DataType::Boolean => format_primitive!(array, BooleanArray),
        DataType::Utf8 => format_primitive!(array, StringArray),
        dt => {
            return Err(Error::StorageError(format!(
                "CSV output not supported for data type: {dt:?}"
            )))
        }
    })
}

fn format_float(value: Option<f64>) -> String {
    match value {
        Some(v) if !v.is_nan() => format!("{v:?}"),
        _ => String::new(),
    }
}
