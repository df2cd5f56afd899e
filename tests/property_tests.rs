//! Property-based tests for pose-kinematics
//!
//! - Bin-edge invariants over arbitrary samples and methods
//! - Histogram normalization over arbitrary cohorts
//! - Feature-extraction invariants over arbitrary trajectories
//! - Run with ProptestConfig::with_cases(100)

use arrow::array::{Float64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use pose_kinematics::binning::{
    freedman_diaconis_bins, percentile, scott_bins, select_edges, sorted_finite, sturges_bins,
    BinMethod, DEGENERATE_EDGES,
};
use pose_kinematics::features::{compute_scalar_summary, FeatureParams, KeypointFrame};
use pose_kinematics::histogram::{histogram_counts, GroupIndex, HistogramAggregator};
use proptest::prelude::*;
use std::f64::consts::PI;
use std::sync::Arc;

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

fn arb_method() -> impl Strategy<Value = BinMethod> {
    prop_oneof![
        Just(BinMethod::Sturges),
        Just(BinMethod::Scott),
        Just(BinMethod::FreedmanDiaconis),
        Just(BinMethod::Manual),
        Just(BinMethod::Unrecognized("auto".to_string())),
    ]
}

/// Samples with some non-finite noise mixed in
fn arb_sample() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(
        prop_oneof![
            8 => -1000.0f64..1000.0,
            1 => Just(f64::NAN),
            1 => Just(f64::INFINITY),
        ],
        1..200,
    )
}

/// Keypoint frame with head/torso/anus coordinates
fn arb_frame(max_rows: usize) -> impl Strategy<Value = KeypointFrame> {
    (1..=max_rows).prop_flat_map(|rows| {
        prop::collection::vec(prop::collection::vec(-50.0f64..50.0, rows), 9).prop_map(
            |columns| {
                let names = [
                    "head_x", "head_y", "head_z", "torso_x", "torso_y", "torso_z", "anus_x",
                    "anus_y", "anus_z",
                ];
                KeypointFrame::from_columns(names.into_iter().zip(columns).collect()).unwrap()
            },
        )
    })
}

fn cohort_table(values: &[(u8, f64)]) -> RecordBatch {
    let schema = Schema::new(vec![
        Field::new("v", DataType::Float64, true),
        Field::new("name", DataType::Utf8, false),
    ]);
    RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(Float64Array::from_iter_values(values.iter().map(|v| v.1))),
            Arc::new(StringArray::from_iter_values(
                values.iter().map(|v| format!("s{}", v.0)),
            )),
        ],
    )
    .unwrap()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: edges span the 1st-99th percentile exactly and never decrease
    #[test]
    fn prop_edges_span_trimmed_range(sample in arb_sample(), method in arb_method()) {
        let edges = select_edges(&sample, &method, Some(25.0));
        let finite = sorted_finite(&sample);
        if finite.is_empty() {
            prop_assert_eq!(edges, DEGENERATE_EDGES.to_vec());
        } else {
            prop_assert!(edges.len() >= 2);
            prop_assert_eq!(edges[0], percentile(&finite, 1.0));
            prop_assert_eq!(*edges.last().unwrap(), percentile(&finite, 99.0));
            prop_assert!(edges.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    /// Property: zero-variance samples give 10 bins for Scott and FD
    #[test]
    fn prop_constant_sample_ten_bins(value in -100.0f64..100.0, n in 2usize..100) {
        let sample = vec![value; n];
        for method in [BinMethod::Scott, BinMethod::FreedmanDiaconis] {
            prop_assert_eq!(select_edges(&sample, &method, None).len(), 11);
        }
        prop_assert_eq!(scott_bins(&sample), 10);
        prop_assert_eq!(freedman_diaconis_bins(&sample), 10);
    }

    /// Property: count-only recommendations are at least one bin
    #[test]
    fn prop_recommendations_positive(sample in arb_sample()) {
        prop_assert!(sturges_bins(&sample) >= 1);
        prop_assert!(scott_bins(&sample) >= 1);
        prop_assert!(freedman_diaconis_bins(&sample) >= 1);
    }

    /// Property: counting never invents observations
    #[test]
    fn prop_counts_bounded_by_in_range(sample in arb_sample(), method in arb_method()) {
        let edges = select_edges(&sample, &method, Some(10.0));
        let counts = histogram_counts(&sample, &edges);
        let (lo, hi) = (edges[0], edges[edges.len() - 1]);
        let in_range = sample.iter().filter(|v| **v >= lo && **v <= hi).count();
        prop_assert_eq!(counts.len(), edges.len() - 1);
        prop_assert_eq!(counts.iter().sum::<u64>() as usize, in_range);
    }

    /// Property: per-subject frequencies sum to 1, or all 0 without finite data
    #[test]
    fn prop_subject_frequencies_normalized(
        rows in prop::collection::vec((0u8..5, prop_oneof![9 => -10.0f64..10.0, 1 => Just(f64::NAN)]), 1..120),
        method in arb_method(),
    ) {
        let table = cohort_table(&rows);
        let index = GroupIndex::from_pairs((0u8..5).map(|i| (format!("s{i}"), format!("g{}", i % 2))));
        let aggregator = HistogramAggregator::new(pose_kinematics::histogram::HistogramConfig {
            method,
            ..Default::default()
        });
        let report = aggregator.build(&table, &index, None).unwrap();
        let hist = report.variable("v").unwrap();
        let bins = hist.edges.len() - 1;
        let mut subjects: Vec<&str> = hist.rows.iter().map(|r| r.subject.as_str()).collect();
        subjects.dedup();
        for subject in subjects {
            let freqs: Vec<f64> = hist
                .rows
                .iter()
                .filter(|r| r.subject == subject)
                .map(|r| r.normalized_frequency)
                .collect();
            prop_assert_eq!(freqs.len(), bins);
            let total: f64 = freqs.iter().sum();
            prop_assert!((total - 1.0).abs() < 1e-9 || freqs.iter().all(|f| *f == 0.0));
        }
    }

    /// Property: angles stay in [0, π] and the first velocity row is NaN
    #[test]
    fn prop_feature_invariants(frame in arb_frame(30), smoothing in prop::option::of(1usize..7)) {
        let params = FeatureParams {
            smoothing_window: smoothing,
            ..FeatureParams::default()
        };
        let scalars = compute_scalar_summary(&frame, &params).unwrap();
        prop_assert_eq!(scalars.num_rows(), frame.num_rows());
        prop_assert!(scalars.velocity_xy[0].is_nan());
        prop_assert!(scalars.velocity_z[0].is_nan());
        for angle in scalars.torso_angle.iter().chain(&scalars.angle_to_origin) {
            prop_assert!((0.0..=PI).contains(angle), "angle {} out of range", angle);
        }
        for v in scalars.velocity_xy.iter().chain(&scalars.velocity_z).skip(1) {
            prop_assert!(v.is_nan() || *v >= 0.0);
        }
    }
}
