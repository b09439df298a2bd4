use chrono::{Duration, NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use findlife::domain::session::group_slots;
use findlife::domain::slot::BookingSlot;
use rand::seq::SliceRandom;
use rand::thread_rng;
use uuid::Uuid;

/// A synthetic expert day: `clients` clients, each booking `chain_len`
/// back-to-back half-hour slots, shuffled the way a fetch never returns.
fn synthetic_day(clients: usize, chain_len: usize) -> Vec<BookingSlot> {
    let expert = Uuid::new_v4();
    let date = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
    let day_start = Utc.with_ymd_and_hms(2024, 3, 14, 8, 0, 0).unwrap();

    let mut slots = Vec::with_capacity(clients * chain_len);
    for c in 0..clients {
        let client = Uuid::new_v4();
        let chain_start = day_start + Duration::minutes((c * chain_len * 30) as i64);
        for k in 0..chain_len {
            slots.push(BookingSlot::new(
                expert,
                client,
                date,
                chain_start + Duration::minutes((k * 30) as i64),
                30,
            ));
        }
    }
    slots.shuffle(&mut thread_rng());
    slots
}

fn bench_grouping(c: &mut Criterion) {
    let mut group = c.benchmark_group("group_slots");

    for &(clients, chain_len) in &[(10, 1), (20, 4), (100, 4), (250, 8)] {
        let slots = synthetic_day(clients, chain_len);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", clients, chain_len)),
            &slots,
            |b, slots| {
                b.iter(|| group_slots(black_box(slots.clone())));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_grouping);
criterion_main!(benches);
