//! Keypoint and scalar-feature tables
//!
//! Both wrap an Arrow [`RecordBatch`]. Coordinates are exposed as plain
//! `Vec<f64>` with nulls mapped to NaN so the feature math can stay
//! element-wise and let NaN propagate.

use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, Float64Array, RecordBatch, StringArray};
use arrow::compute;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use std::fmt;
use std::sync::Arc;

/// Subject identity column attached to persisted scalar tables
pub const NAME_COLUMN: &str = "name";

/// Coordinate axis of a landmark
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Horizontal
    X,
    /// Horizontal, orthogonal to X
    Y,
    /// Vertical
    Z,
}

impl Axis {
    /// Column-name suffix for this axis
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::X => "_x",
            Self::Y => "_y",
            Self::Z => "_z",
        }
    }

    /// Column name of `landmark` on this axis, e.g. `head_x`
    #[must_use]
    pub fn column(self, landmark: &str) -> String {
        format!("{landmark}{}", self.suffix())
    }
}

/// Time-ordered landmark coordinates, one row per frame
///
/// Columns are named `<landmark>_x`, `<landmark>_y`, `<landmark>_z`. Any
/// numeric or text column type is accepted; values are read as `f64`, with
/// nulls and unparseable text becoming NaN.
#[derive(Debug, Clone)]
pub struct KeypointFrame {
    batch: RecordBatch,
}

impl KeypointFrame {
    /// Wrap an existing record batch
    #[must_use]
    pub const fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }

    /// Build a frame from named `f64` columns of equal length
    ///
    /// # Errors
    /// Returns error if column lengths differ
    pub fn from_columns<S: Into<String>>(columns: Vec<(S, Vec<f64>)>) -> Result<Self> {
        let (fields, arrays): (Vec<Field>, Vec<ArrayRef>) = columns
            .into_iter()
            .map(|(name, values)| {
                (
                    Field::new(name.into(), DataType::Float64, true),
                    Arc::new(Float64Array::from(values)) as ArrayRef,
                )
            })
            .unzip();
        let batch = RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)?;
        Ok(Self { batch })
    }

    /// Number of frames
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Underlying record batch
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Column names in table order
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Values of one named column as `f64`
    ///
    /// # Errors
    /// Returns [`Error::MissingColumn`] if the column does not exist
    pub fn values(&self, column: &str) -> Result<Vec<f64>> {
        let array = self
            .batch
            .column_by_name(column)
            .ok_or_else(|| Error::missing_column(column))?;
        float_values(array)
    }

    /// Coordinates of `landmark` along `axis`
    ///
    /// # Errors
    /// Returns [`Error::MissingColumn`] if `<landmark>_<axis>` does not exist
    pub fn coordinates(&self, landmark: &str, axis: Axis) -> Result<Vec<f64>> {
        self.values(&axis.column(landmark))
    }

    /// Apply `f` to every column, producing an all-`Float64` frame
    ///
    /// # Errors
    /// Returns error if a column cannot be read as `f64`
    pub fn map_columns<F>(&self, f: F) -> Result<Self>
    where
        F: Fn(&[f64]) -> Vec<f64>,
    {
        let schema = self.batch.schema();
        let mut columns = Vec::with_capacity(self.batch.num_columns());
        for (field, array) in schema.fields().iter().zip(self.batch.columns()) {
            let values = float_values(array)?;
            columns.push((field.name().clone(), f(&values)));
        }
        Self::from_columns(columns)
    }
}

/// Read any array as `f64`, nulls as NaN
///
/// # Errors
/// Returns error if the array type cannot be cast to `Float64`
pub fn float_values(array: &ArrayRef) -> Result<Vec<f64>> {
    let casted;
    let array = if array.data_type() == &DataType::Float64 {
        array
    } else {
        casted = compute::cast(array, &DataType::Float64)?;
        &casted
    };
    let floats = array
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| Error::Other("Failed to downcast to Float64Array".to_string()))?;
    Ok(floats.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

/// Derived kinematic signals, aligned 1:1 with the source frames
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarFeatureFrame {
    /// Distance of the body centre from the arena origin (xy plane)
    pub distance_from_origin: Vec<f64>,
    /// Planar speed of the velocity landmarks
    pub velocity_xy: Vec<f64>,
    /// Absolute vertical speed of the velocity landmarks
    pub velocity_z: Vec<f64>,
    /// Planar body length
    pub length: Vec<f64>,
    /// Signed height difference
    pub height: Vec<f64>,
    /// Unsigned head-torso-anus angle (radians)
    pub torso_angle: Vec<f64>,
    /// Unsigned angle between heading and the origin direction (radians)
    pub angle_to_origin: Vec<f64>,
}

impl ScalarFeatureFrame {
    /// Output column names, in table order
    pub const COLUMNS: [&'static str; 7] = [
        "distance_from_origin",
        "velocity_xy",
        "velocity_z",
        "length",
        "height",
        "torso_angle",
        "angle_to_origin",
    ];

    /// Number of rows
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.distance_from_origin.len()
    }

    /// Columns paired with their names, in [`Self::COLUMNS`] order
    #[must_use]
    pub fn columns(&self) -> [(&'static str, &[f64]); 7] {
        [
            (Self::COLUMNS[0], self.distance_from_origin.as_slice()),
            (Self::COLUMNS[1], self.velocity_xy.as_slice()),
            (Self::COLUMNS[2], self.velocity_z.as_slice()),
            (Self::COLUMNS[3], self.length.as_slice()),
            (Self::COLUMNS[4], self.height.as_slice()),
            (Self::COLUMNS[5], self.torso_angle.as_slice()),
            (Self::COLUMNS[6], self.angle_to_origin.as_slice()),
        ]
    }

    /// Schema of a scalar table, optionally with the trailing `name` column
    #[must_use]
    pub fn schema(with_name: bool) -> SchemaRef {
        let mut fields: Vec<Field> = Self::COLUMNS
            .iter()
            .map(|c| Field::new(*c, DataType::Float64, true))
            .collect();
        if with_name {
            fields.push(Field::new(NAME_COLUMN, DataType::Utf8, false));
        }
        Arc::new(Schema::new(fields))
    }

    /// Convert to a record batch of the seven feature columns
    ///
    /// # Errors
    /// Returns error if column lengths differ
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let arrays = self.feature_arrays();
        Ok(RecordBatch::try_new(Self::schema(false), arrays)?)
    }

    /// Convert to a record batch tagged with the subject `name`
    ///
    /// # Errors
    /// Returns error if column lengths differ
    pub fn with_subject(&self, name: &str) -> Result<RecordBatch> {
        let mut arrays = self.feature_arrays();
        arrays.push(Arc::new(StringArray::from_iter_values(
            std::iter::repeat(name).take(self.num_rows()),
        )));
        Ok(RecordBatch::try_new(Self::schema(true), arrays)?)
    }

    fn feature_arrays(&self) -> Vec<ArrayRef> {
        self.columns()
            .iter()
            .map(|(_, values)| Arc::new(Float64Array::from(values.to_vec())) as ArrayRef)
            .collect()
    }
}

impl fmt::Display for ScalarFeatureFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScalarFeatureFrame({} rows)", self.num_rows())
    }
}
