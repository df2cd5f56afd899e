//! Descriptive statistics over `f64` samples
//!
//! Percentiles use linear interpolation between closest ranks, and `linspace`
//! pins the final point to `stop`, so edge arrays start and end exactly at the
//! requested range.

/// Keep only finite values (drops NaN and ±inf)
#[must_use]
pub fn finite_values(sample: &[f64]) -> Vec<f64> {
    sample.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Finite values, sorted ascending
#[must_use]
pub fn sorted_finite(sample: &[f64]) -> Vec<f64> {
    let mut data = finite_values(sample);
    data.sort_by(f64::total_cmp);
    data
}

/// Percentile `q` (0..=100) of an ascending, non-empty slice
///
/// Returns NaN for an empty slice.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    let rank = (q / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    lerp(sorted[lo], sorted[hi], rank - lo as f64)
}

/// Interpolate from `a` towards `b`, anchoring on the nearer endpoint
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    let diff = b - a;
    if t >= 0.5 {
        b - diff * (1.0 - t)
    } else {
        a + diff * t
    }
}

/// `num` evenly spaced points over `[start, stop]`, endpoints included
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            let mut points: Vec<f64> = (0..num).map(|i| start + step * i as f64).collect();
            points[num - 1] = stop;
            points
        }
    }
}

/// Arithmetic mean (NaN for an empty slice)
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Standard deviation with `ddof` delta degrees of freedom
///
/// Returns NaN when `data.len() <= ddof`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn std_dev(data: &[f64], ddof: usize) -> f64 {
    if data.len() <= ddof {
        return f64::NAN;
    }
    let m = mean(data);
    let ss: f64 = data.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (data.len() - ddof) as f64).sqrt()
}

/// Midpoints of consecutive edges
#[must_use]
pub fn bin_centers(edges: &[f64]) -> Vec<f64> {
    edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_percentile_interpolates_linearly() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(percentile(&data, 0.0), 1.0);
        assert_relative_eq!(percentile(&data, 50.0), 2.5);
        assert_relative_eq!(percentile(&data, 100.0), 4.0);
        assert_relative_eq!(percentile(&data, 25.0), 1.75);
    }

    #[test]
    fn test_percentile_single_value() {
        assert_relative_eq!(percentile(&[7.0], 1.0), 7.0);
        assert_relative_eq!(percentile(&[7.0], 99.0), 7.0);
    }

    #[test]
    fn test_percentile_empty_is_nan() {
        assert!(percentile(&[], 50.0).is_nan());
    }

    #[test]
    fn test_linspace_pins_endpoints() {
        let points = linspace(0.1, 0.7, 4);
        assert_eq!(points.len(), 4);
        assert_eq!(points[0], 0.1);
        assert_eq!(points[3], 0.7);
        assert_relative_eq!(points[1], 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_linspace_degenerate_range() {
        let points = linspace(5.0, 5.0, 3);
        assert_eq!(points, vec![5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_std_dev_ddof() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(std_dev(&data, 0), 2.0);
        assert_relative_eq!(std_dev(&data, 1), (32.0_f64 / 7.0).sqrt());
        assert!(std_dev(&[1.0], 1).is_nan());
    }

    #[test]
    fn test_sorted_finite_drops_non_finite() {
        let data = sorted_finite(&[3.0, f64::NAN, 1.0, f64::INFINITY, 2.0]);
        assert_eq!(data, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_bin_centers() {
        assert_eq!(bin_centers(&[0.0, 1.0, 3.0]), vec![0.5, 2.0]);
        assert!(bin_centers(&[1.0]).is_empty());
    }
}
