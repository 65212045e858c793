use chrono::{Datelike, Duration, NaiveDate};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use currently::models::activity::merge_records;
use currently::models::{ActivityRecord, ActivityStore};
use std::hint::black_box;

/// `count` records, one per day, newest first. Ids are derived from the
/// date so overlapping ranges share records.
fn history(newest: NaiveDate, count: u64) -> Vec<ActivityRecord> {
    (0..count)
        .map(|i| {
            let date = newest - Duration::days(i as i64);
            let raw = serde_json::json!({
                "id": date.num_days_from_ce(),
                "name": format!("Activity {}", i),
                "type": if i % 3 == 0 { "Ride" } else { "Run" },
                "date": date.format("%Y-%m-%d").to_string(),
                "startTime": "07:30",
                "distance": 8046.72,
                "movingDuration": 2400,
                "elapsedDuration": 2520,
                "averageHeartrate": 148.0,
            });
            serde_json::from_value(raw).expect("valid record")
        })
        .collect()
}

fn benchmark_merge(c: &mut Criterion) {
    let june_30 = NaiveDate::from_ymd_opt(2025, 6, 30).expect("valid date");
    let july_2 = NaiveDate::from_ymd_opt(2025, 7, 2).expect("valid date");

    // Roughly a decade of daily workouts
    let existing = history(june_30, 3_650);
    // Incremental page: two new records plus overlap from the day-before margin,
    // oldest first as upstream returns them
    let mut incremental = history(july_2, 5);
    incremental.reverse();
    // Full refetch: everything already stored
    let full = existing.clone();

    let mut group = c.benchmark_group("activity_merge");

    group.bench_function("incremental_batch", |b| {
        b.iter_batched(
            || (existing.clone(), incremental.clone()),
            |(existing, batch)| merge_records(black_box(existing), black_box(batch)),
            BatchSize::LargeInput,
        )
    });

    group.bench_function("full_overlap", |b| {
        b.iter_batched(
            || (existing.clone(), full.clone()),
            |(existing, batch)| merge_records(black_box(existing), black_box(batch)),
            BatchSize::LargeInput,
        )
    });

    group.bench_function("serialize_store", |b| {
        let store = ActivityStore {
            records: existing.clone(),
            last_synced_at: None,
        };
        b.iter(|| serde_json::to_vec(black_box(&store)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_merge);
criterion_main!(benches);
