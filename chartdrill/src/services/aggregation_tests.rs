use super::*;
use proptest::prelude::*;

fn point(label: &str, value: f64) -> SeriesPoint {
    SeriesPoint::new(label, value)
}

#[test]
fn test_aggregate_monthly_reference_example() {
    let points = vec![
        point("2023-02-01", 5.0),
        point("2023-01-15", 3.0),
        point("2023-01-02", 2.0),
    ];
    let series = aggregate_monthly(&points);

    assert_eq!(series.labels(), vec!["Jan 2023", "Feb 2023"]);
    assert_eq!(series.totals(), vec![5.0, 5.0]);
}

#[test]
fn test_aggregate_orders_by_calendar_not_string() {
    // lexical order would put "Jan 2023" before "Mar 2022"
    let points = vec![
        point("Jan 2023", 1.0),
        point("Mar 2022", 2.0),
        point("Feb 2022", 3.0),
    ];
    let series = aggregate_monthly(&points);
    assert_eq!(series.labels(), vec!["Feb 2022", "Mar 2022", "Jan 2023"]);
}

#[test]
fn test_aggregate_counts_missing_as_zero() {
    let points = vec![
        SeriesPoint::missing("2023-04-01"),
        point("2023-05-03", 2.0),
        SeriesPoint::missing("2023-05-04"),
    ];
    let series = aggregate_monthly(&points);
    assert_eq!(series.len(), 2);
    assert_eq!(series.totals(), vec![0.0, 2.0]);
}

#[test]
fn test_aggregate_skips_non_dates() {
    let points = vec![point("North", 4.0), point("2023-01-01", 1.0)];
    let series = aggregate_monthly(&points);
    assert_eq!(series.labels(), vec!["Jan 2023"]);
}

#[test]
fn test_aggregate_empty() {
    assert!(aggregate_monthly(&[]).is_empty());
}

#[test]
fn test_sort_daily() {
    let points = vec![
        point("2023-02-10", 1.0),
        point("2023-02-01", 2.0),
        point("2023-02-05", 3.0),
    ];
    let sorted = sort_daily_chronologically(&points);
    let labels: Vec<_> = sorted.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, vec!["2023-02-01", "2023-02-05", "2023-02-10"]);
    assert_eq!(sorted[0].value, Some(2.0));
}

#[test]
fn test_sort_daily_is_stable_and_keeps_unparsed_last() {
    let points = vec![
        point("later", 9.0),
        point("2023-02-02", 1.0),
        point("2023-02-01", 2.0),
        point("2023-02-01", 3.0),
        point("sooner", 8.0),
    ];
    let sorted = sort_daily_chronologically(&points);
    let values: Vec<_> = sorted.iter().map(|p| p.value_or_zero()).collect();
    assert_eq!(values, vec![2.0, 3.0, 1.0, 9.0, 8.0]);
}

#[test]
fn test_rank_percentile_reference_values() {
    assert_eq!(rank_percentile(&[1.0, 2.0, 3.0, 4.0], 50.0), Some(2.5));
    assert_eq!(rank_percentile(&[4.0, 1.0, 3.0, 2.0], 0.0), Some(1.0));
    assert_eq!(rank_percentile(&[4.0, 1.0, 3.0, 2.0], 100.0), Some(4.0));
}

#[test]
fn test_rank_percentile_single_and_empty() {
    for p in [0.0, 25.0, 50.0, 99.9, 100.0] {
        assert_eq!(rank_percentile(&[5.0], p), Some(5.0));
    }
    assert_eq!(rank_percentile(&[], 50.0), None);
}

#[test]
fn test_iqr_reference_value() {
    let values: Vec<f64> = (1..=8).map(f64::from).collect();
    assert_eq!(interquartile_range(&values), Some(3.5));
}

#[test]
fn test_summarize() {
    let stats = summarize(&[7.0, 1.0, 3.0, 5.0]);
    assert_eq!(stats.min, 1.0);
    assert_eq!(stats.max, 7.0);
    assert_eq!(stats.median, 4.0);
    assert_eq!(stats.q1, 2.5);
    assert_eq!(stats.q3, 5.5);
    assert_eq!(summarize(&[]), SummaryStats::default());
}

fn dated_points() -> impl Strategy<Value = Vec<SeriesPoint>> {
    prop::collection::vec(
        (2018i32..2026, 1u32..=12, 1u32..=28, 0i32..1000),
        0..40,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .map(|(y, m, d, v)| {
                SeriesPoint::new(format!("{:04}-{:02}-{:02}", y, m, d), f64::from(v))
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_aggregation_is_order_independent(points in dated_points()) {
        let mut reversed = points.clone();
        reversed.reverse();
        prop_assert_eq!(aggregate_monthly(&points), aggregate_monthly(&reversed));
    }

    #[test]
    fn prop_buckets_ascend_and_preserve_total(points in dated_points()) {
        let series = aggregate_monthly(&points);
        for pair in series.buckets.windows(2) {
            prop_assert!(pair[0].month < pair[1].month);
        }
        let input_total: f64 = points.iter().map(|p| p.value_or_zero()).sum();
        prop_assert_eq!(series.totals().iter().sum::<f64>(), input_total);
    }

    #[test]
    fn prop_percentile_within_bounds(
        values in prop::collection::vec(-1e6f64..1e6, 1..50),
        p in 0.0f64..=100.0
    ) {
        let result = rank_percentile(&values, p).unwrap();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(result >= min && result <= max);
    }
}
