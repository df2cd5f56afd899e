//! Kinematic feature extraction
//!
//! Derives seven scalar signals per frame from landmark coordinates:
//!
//! | column                 | derivation                                          |
//! |------------------------|-----------------------------------------------------|
//! | `distance_from_origin` | xy distance of the centerpoint from the origin      |
//! | `velocity_xy`          | planar speed of the velocity-pair midpoint          |
//! | `velocity_z`           | absolute vertical speed of the velocity-pair midpoint |
//! | `length`               | xy distance between the length pair                 |
//! | `height`               | signed z difference of the height pair              |
//! | `torso_angle`          | unsigned angle head-torso-anus                      |
//! | `angle_to_origin`      | unsigned angle between torso→head and torso→origin  |
//!
//! All derivations are element-wise over the time axis. NaN inputs propagate;
//! nothing is zero-filled. Angles come from `atan2(cross, dot)` which stays
//! well conditioned near 0 and π and returns 0 for a zero-length vector.

mod frame;

pub use frame::{float_values, Axis, KeypointFrame, ScalarFeatureFrame, NAME_COLUMN};

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Landmarks used unconditionally by the angle features
pub const HEAD: &str = "head";
/// Torso landmark (angle vertex)
pub const TORSO: &str = "torso";
/// Tail-base landmark
pub const ANUS: &str = "anus";

/// Ordered pair of landmark names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandmarkPair(pub String, pub String);

impl LandmarkPair {
    /// Pair from two landmark names
    #[must_use]
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self(first.into(), second.into())
    }
}

/// Parameters of [`compute_scalar_summary`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureParams {
    /// Frame rate (samples per second)
    pub fps: f64,
    /// Arena origin in the xy plane
    pub origin: [f64; 2],
    /// Centered moving-average window; `None` or `<= 1` disables smoothing
    pub smoothing_window: Option<usize>,
    /// Landmarks averaged into the body centre
    pub centerpoint: LandmarkPair,
    /// Landmarks whose planar distance is the body length
    pub length_criteria: LandmarkPair,
    /// `z(first) - z(second)` is the height
    pub height_criteria: LandmarkPair,
    /// Landmarks averaged before differencing into velocities
    pub velocity_criteria: LandmarkPair,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            fps: 30.0,
            origin: [0.0, 0.0],
            smoothing_window: Some(5),
            centerpoint: LandmarkPair::new(HEAD, TORSO),
            length_criteria: LandmarkPair::new(HEAD, ANUS),
            height_criteria: LandmarkPair::new(HEAD, ANUS),
            velocity_criteria: LandmarkPair::new(HEAD, TORSO),
        }
    }
}

/// Compute the scalar feature table for one subject
///
/// # Arguments
/// * `frame` - Keypoint coordinates, one row per frame
/// * `params` - Frame rate, origin, smoothing and landmark choices
///
/// # Returns
/// One row per input frame. Row 0 of both velocities is NaN.
///
/// # Errors
/// Returns [`Error::MissingColumn`] if a referenced landmark coordinate (or
/// `head`/`torso`/`anus` x/y) is absent, and [`Error::InvalidInput`] for a
/// non-positive frame rate.
///
/// # Example
/// ```rust
/// use pose_kinematics::features::{compute_scalar_summary, FeatureParams, KeypointFrame};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut columns = Vec::new();
/// for (name, x, y) in [("head", 0.0, 1.0), ("torso", 0.0, 0.0), ("anus", 1.0, 0.0)] {
///     columns.push((format!("{name}_x"), vec![x]));
///     columns.push((format!("{name}_y"), vec![y]));
///     columns.push((format!("{name}_z"), vec![0.0]));
/// }
/// let frame = KeypointFrame::from_columns(columns)?;
/// let params = FeatureParams { smoothing_window: None, ..FeatureParams::default() };
///
/// let scalars = compute_scalar_summary(&frame, &params)?;
/// assert!((scalars.torso_angle[0] - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
/// assert!(scalars.velocity_xy[0].is_nan());
/// # Ok(())
/// # }
/// ```
pub fn compute_scalar_summary(
    frame: &KeypointFrame,
    params: &FeatureParams,
) -> Result<ScalarFeatureFrame> {
    if !(params.fps > 0.0) {
        return Err(Error::InvalidInput(format!(
            "fps must be positive, got {}",
            params.fps
        )));
    }

    let smoothed;
    let work = match params.smoothing_window {
        Some(window) if window > 1 => {
            smoothed = frame.map_columns(|values| rolling_mean_centered(values, window))?;
            &smoothed
        }
        _ => frame,
    };
    let [ox, oy] = params.origin;
    let dt = 1.0 / params.fps;

    let center = midpoint(work, &params.centerpoint)?;
    let distance_from_origin = center
        .x
        .iter()
        .zip(&center.y)
        .map(|(x, y)| ((x - ox).powi(2) + (y - oy).powi(2)).sqrt())
        .collect();

    let velocity = midpoint(work, &params.velocity_criteria)?;
    let dx = diff(&velocity.x);
    let dy = diff(&velocity.y);
    let velocity_xy = dx
        .iter()
        .zip(&dy)
        .map(|(dx, dy)| (dx * dx + dy * dy).sqrt() / dt)
        .collect();
    let velocity_z = diff(&velocity.z).iter().map(|dz| (dz / dt).abs()).collect();

    let LandmarkPair(front, back) = &params.length_criteria;
    let length = zip4(
        &work.coordinates(front, Axis::X)?,
        &work.coordinates(back, Axis::X)?,
        &work.coordinates(front, Axis::Y)?,
        &work.coordinates(back, Axis::Y)?,
        |x1, x2, y1, y2| ((x1 - x2).powi(2) + (y1 - y2).powi(2)).sqrt(),
    );

    let LandmarkPair(upper, lower) = &params.height_criteria;
    let height = work
        .coordinates(upper, Axis::Z)?
        .iter()
        .zip(&work.coordinates(lower, Axis::Z)?)
        .map(|(a, b)| a - b)
        .collect();

    let head_x = work.coordinates(HEAD, Axis::X)?;
    let head_y = work.coordinates(HEAD, Axis::Y)?;
    let torso_x = work.coordinates(TORSO, Axis::X)?;
    let torso_y = work.coordinates(TORSO, Axis::Y)?;
    let anus_x = work.coordinates(ANUS, Axis::X)?;
    let anus_y = work.coordinates(ANUS, Axis::Y)?;

    let heading_x: Vec<f64> = subtract(&head_x, &torso_x);
    let heading_y: Vec<f64> = subtract(&head_y, &torso_y);

    let torso_angle = zip4(
        &heading_x,
        &heading_y,
        &subtract(&anus_x, &torso_x),
        &subtract(&anus_y, &torso_y),
        unsigned_angle,
    );

    let to_origin_x: Vec<f64> = torso_x.iter().map(|t| ox - t).collect();
    let to_origin_y: Vec<f64> = torso_y.iter().map(|t| oy - t).collect();
    let angle_to_origin = zip4(
        &heading_x,
        &heading_y,
        &to_origin_x,
        &to_origin_y,
        unsigned_angle,
    );

    Ok(ScalarFeatureFrame {
        distance_from_origin,
        velocity_xy,
        velocity_z,
        length,
        height,
        torso_angle,
        angle_to_origin,
    })
}

/// Unsigned angle between 2D vectors `a` and `b`, in `[0, π]`
///
/// `atan2(0, 0)` is 0, so a zero-length vector yields angle 0.
#[must_use]
pub fn unsigned_angle(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let dot = ax * bx + ay * by;
    let cross = ax * by - ay * bx;
    cross.atan2(dot).abs()
}

/// Centered moving average with a shrinking window at the edges
///
/// The window covers `window - 1 - (window - 1) / 2` samples before and
/// `(window - 1) / 2` after each position. NaN samples are skipped; a window
/// holding only NaN yields NaN.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rolling_mean_centered(values: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 {
        return values.to_vec();
    }
    let after = (window - 1) / 2;
    let before = window - 1 - after;
    let n = values.len();
    (0..n)
        .map(|i| {
            let start = i.saturating_sub(before);
            let end = (i + after + 1).min(n);
            let (sum, count) = values[start..end]
                .iter()
                .filter(|v| !v.is_nan())
                .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        })
        .collect()
}

/// First difference; element 0 is NaN
#[must_use]
pub fn diff(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    if !values.is_empty() {
        out.push(f64::NAN);
        out.extend(values.windows(2).map(|w| w[1] - w[0]));
    }
    out
}

struct Point3 {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

fn midpoint(frame: &KeypointFrame, pair: &LandmarkPair) -> Result<Point3> {
    let LandmarkPair(a, b) = pair;
    let average = |axis: Axis| -> Result<Vec<f64>> {
        let first = frame.coordinates(a, axis)?;
        let second = frame.coordinates(b, axis)?;
        Ok(first.iter().zip(&second).map(|(p, q)| (p + q) / 2.0).collect())
    };
    Ok(Point3 {
        x: average(Axis::X)?,
        y: average(Axis::Y)?,
        z: average(Axis::Z)?,
    })
}

fn subtract(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(p, q)| p - q).collect()
}

fn zip4<F>(a: &[f64], b: &[f64], c: &[f64], d: &[f64], f: F) -> Vec<f64>
where
    F: Fn(f64, f64, f64, f64) -> f64,
{
    a.iter()
        .zip(b)
        .zip(c)
        .zip(d)
        .map(|(((a, b), c), d)| f(*a, *b, *c, *d))
        .collect()
}
