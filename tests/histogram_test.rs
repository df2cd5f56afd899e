//! Histogram aggregation over a small two-group cohort

use arrow::array::{Float64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use pose_kinematics::binning::BinMethod;
use pose_kinematics::histogram::{
    BinOverride, GroupIndex, HistogramAggregator, HistogramConfig, VariableUnit,
};
use std::sync::Arc;

/// Subject A holds 5.0 throughout; subject B alternates 0.0 and 10.0
fn two_subject_table() -> RecordBatch {
    let mut names = Vec::new();
    let mut values = Vec::new();
    for i in 0..10 {
        names.push("A");
        values.push(5.0);
        names.push("B");
        values.push(if i % 2 == 0 { 0.0 } else { 10.0 });
    }
    let schema = Schema::new(vec![
        Field::new("speed", DataType::Float64, true),
        Field::new("name", DataType::Utf8, false),
    ]);
    RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(Float64Array::from(values)),
            Arc::new(StringArray::from(names)),
        ],
    )
    .unwrap()
}

fn nonzero(report: &pose_kinematics::histogram::HistogramReport, group: &str) -> Vec<f64> {
    report
        .group_means
        .iter()
        .filter(|r| r.group == group && r.normalized_frequency > 0.0)
        .map(|r| r.normalized_frequency)
        .collect()
}

#[test]
fn test_constant_and_alternating_subjects() {
    let index = GroupIndex::from_pairs([("A", "GA"), ("B", "GB")]);
    let report = HistogramAggregator::default()
        .build(&two_subject_table(), &index, None)
        .unwrap();

    let a = nonzero(&report, "GA");
    assert_eq!(a, vec![1.0]);

    let b = nonzero(&report, "GB");
    assert_eq!(b, vec![0.5, 0.5]);

    let hist = report.variable("speed").unwrap();
    assert_eq!(hist.edges.first(), Some(&0.0));
    assert_eq!(hist.edges.last(), Some(&10.0));
}

#[test]
fn test_every_method_gives_same_split() {
    let index = GroupIndex::from_pairs([("A", "GA"), ("B", "GB")]);
    for method in [
        BinMethod::Sturges,
        BinMethod::Scott,
        BinMethod::FreedmanDiaconis,
        BinMethod::Manual,
        BinMethod::Unrecognized("auto".to_string()),
    ] {
        let config = HistogramConfig {
            method: method.clone(),
            ..HistogramConfig::default()
        };
        let report = HistogramAggregator::new(config)
            .build(&two_subject_table(), &index, None)
            .unwrap();
        assert_eq!(nonzero(&report, "GA"), vec![1.0], "{method}");
        assert_eq!(nonzero(&report, "GB"), vec![0.5, 0.5], "{method}");
    }
}

#[test]
fn test_count_override_and_unit() {
    let index = GroupIndex::from_pairs([("A", "GA"), ("B", "GB")]);
    let mut config = HistogramConfig {
        method: BinMethod::Manual,
        ..HistogramConfig::default()
    };
    config.units.extend([("speed".to_string(), VariableUnit::Angle)]);
    let aggregator = HistogramAggregator::new(config.clone());
    // angle width 0.5236 over a span of 10
    assert_eq!(
        aggregator
            .build(&two_subject_table(), &index, None)
            .unwrap()
            .variables[0]
            .edges
            .len(),
        21
    );

    config
        .overrides
        .insert("speed".to_string(), BinOverride::Count(2));
    let report = HistogramAggregator::new(config)
        .build(&two_subject_table(), &index, None)
        .unwrap();
    assert_eq!(report.variables[0].edges, vec![0.0, 5.0, 10.0]);
    // 5.0 sits on the inner edge and falls in the upper bin
    let a: Vec<f64> = report.variables[0]
        .rows
        .iter()
        .filter(|r| r.subject == "A")
        .map(|r| r.normalized_frequency)
        .collect();
    assert_eq!(a, vec![0.0, 1.0]);
}
