//! Benchmarks for chart analysis and form validation
//!
//! Run with: cargo bench

use cardiolens::analysis::{split_by_outcome, TrendLine};
use cardiolens::dashboard::export_csv;
use cardiolens::model::{BloodPressurePoint, Dataset, Draft};
use cardiolens::validation::{AdvancedSchema, Schema, SimplifiedSchema};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::json;

fn create_scatter(count: usize) -> Vec<BloodPressurePoint> {
    (0..count)
        .map(|i| {
            let ap_hi = 90.0 + (i % 90) as f64;
            BloodPressurePoint {
                ap_hi,
                ap_lo: ap_hi * 0.6 + (i % 7) as f64,
                cardio: (i % 2) as u8,
            }
        })
        .collect()
}

fn create_dataset(count: usize) -> Dataset {
    let data = (0..count)
        .map(|i| {
            json!({
                "id": i, "age": 40 + i % 25, "gender": 1 + i % 2, "height": 170,
                "weight": 72.5, "ap_hi": 120, "ap_lo": 80, "cholesterol": 1 + i % 3,
                "gluc": 1, "smoke": 0, "alco": 0, "active": 1, "cardio": i % 2
            })
            .as_object()
            .cloned()
            .unwrap_or_default()
        })
        .collect();
    Dataset {
        data,
        total_records: count as u64,
    }
}

fn bench_trend(c: &mut Criterion) {
    let mut group = c.benchmark_group("trend");

    for size in [100, 1000, 10000] {
        let points = create_scatter(size);
        let xy: Vec<(f64, f64)> = points.iter().map(|p| (p.ap_hi, p.ap_lo)).collect();

        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("fit_{}", size), |b| {
            b.iter(|| TrendLine::fit(black_box(&xy)))
        });

        group.bench_function(format!("split_{}", size), |b| {
            b.iter(|| split_by_outcome(black_box(&points)))
        });
    }

    group.finish();
}

fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("validation");

    let valid = Draft::filled(50.0, 120.0, 80.0, 1.0, 1.0);
    let invalid = Draft::filled(130.0, 120.0, 150.0, 4.0, 2.0);

    group.bench_function("simplified_valid", |b| {
        b.iter(|| SimplifiedSchema.validate(black_box(&valid)))
    });

    group.bench_function("simplified_invalid", |b| {
        b.iter(|| SimplifiedSchema.validate(black_box(&invalid)))
    });

    group.bench_function("advanced_valid", |b| {
        b.iter(|| AdvancedSchema.validate(black_box(&valid)))
    });

    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let mut group = c.benchmark_group("export");

    let dataset = create_dataset(5000);
    group.throughput(Throughput::Elements(5000));

    group.bench_function("csv_5000", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(512 * 1024);
            export_csv(black_box(&dataset), &mut out).unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_trend, bench_validation, bench_export);
criterion_main!(benches);
