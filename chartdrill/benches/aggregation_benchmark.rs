use std::hint::black_box;

use chartdrill::api::{AnalysisResult, ChartData, ChartType, Granularity, SeriesPoint, Statistic};
use chartdrill::services::aggregation::{
    aggregate_monthly, rank_percentile, sort_daily_chronologically,
};
use chartdrill::services::chart_builder::{build, BuildContext};
use chrono::{Duration, NaiveDate};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn daily_points(n: usize) -> Vec<SeriesPoint> {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    (0..n)
        .rev()
        .map(|i| {
            let day = start + Duration::days(i as i64);
            SeriesPoint::new(day.format("%Y-%m-%d").to_string(), (i % 97) as f64)
        })
        .collect()
}

fn bench_aggregate_monthly(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation");

    for n in [31usize, 365, 3650] {
        let points = daily_points(n);
        group.bench_with_input(BenchmarkId::new("aggregate_monthly", n), &points, |b, input| {
            b.iter(|| aggregate_monthly(black_box(input)));
        });
        group.bench_with_input(BenchmarkId::new("sort_daily", n), &points, |b, input| {
            b.iter(|| sort_daily_chronologically(black_box(input)));
        });
    }

    group.finish();
}

fn bench_percentiles(c: &mut Criterion) {
    let mut group = c.benchmark_group("percentiles");

    let values: Vec<f64> = (0..10_000).map(|i| ((i * 7919) % 10_007) as f64).collect();
    group.bench_function("p75_10k", |b| {
        b.iter(|| rank_percentile(black_box(&values), black_box(75.0)));
    });

    group.finish();
}

fn bench_build_monthly_chart(c: &mut Criterion) {
    let mut group = c.benchmark_group("chart_builder");

    let points = daily_points(365);
    let result = AnalysisResult {
        statistic: Statistic::Scalar { value: Some(1.0) },
        chart_data: ChartData::from_points(points, Some("Sales".to_string())),
        status: None,
    };
    let ctx = BuildContext {
        chart_type: ChartType::Pie,
        granularity: Granularity::Monthly,
        drill_target: None,
        reference_column: Some("Date"),
        data_label: None,
    };
    group.bench_function("pie_365_days", |b| {
        b.iter(|| build(black_box(&result), black_box(&ctx)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_aggregate_monthly,
    bench_percentiles,
    bench_build_monthly_chart
);
criterion_main!(benches);
