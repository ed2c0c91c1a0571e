use chrono::{Duration, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use occurrence_engine::filter::{FilterOptions, PrioritySort};
use occurrence_engine::materialize::{materialize, query_range};
use occurrence_engine::model::{Priority, Task, TaskType};
use occurrence_engine::temporal::WeekStartDay;
use occurrence_engine::views::month;

fn household_tasks(n: usize) -> Vec<Task> {
    let base = Utc.with_ymd_and_hms(2024, 2, 20, 6, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let mut task = Task::new(format!("t{i}"), format!("Task {i}"), TaskType::Chore);
            task.due_at = Some(base + Duration::minutes((i as i64 * 97) % (60 * 24 * 50)));
            task.priority = Priority::new((i % 3) as i64 + 1).ok();
            task.context.push(if i % 2 == 0 { "school" } else { "home" }.to_string());
            task.child_ids.insert(format!("c{}", i % 4));
            task
        })
        .collect()
}

fn bench_month_view(c: &mut Criterion) {
    let tz = chrono_tz::Europe::Oslo;
    let tasks = household_tasks(500);
    let window = month(2024, 3, tz, WeekStartDay::Monday).unwrap();
    let options = FilterOptions {
        priority_sort: PrioritySort::HighFirst,
        ..FilterOptions::default().with_tags("school")
    };

    c.bench_function("materialize_month_500", |b| {
        b.iter(|| materialize(black_box(&tasks), black_box(&window), tz))
    });

    c.bench_function("query_range_month_500_filtered", |b| {
        b.iter(|| query_range(black_box(&tasks), black_box(&window), tz, &options))
    });
}

criterion_group!(benches, bench_month_view);
criterion_main!(benches);
