use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use seat_core::{
    AcImportance, LocationPreference, PositionPreference, Preferences, Recommender, Seat,
    find_nearby, reference_venue,
};

fn venue(copies: usize) -> Vec<Seat> {
    let base = reference_venue();
    let mut seats = Vec::with_capacity(base.len() * copies);
    for copy in 0..copies {
        for seat in &base {
            let mut seat = seat.clone();
            seat.id += (copy * base.len()) as i64;
            seats.push(seat);
        }
    }
    seats
}

fn bench_rank(c: &mut Criterion) {
    let recommender = Recommender::default();
    let prefs = Preferences::default()
        .with_budget_max(Some(450.0))
        .with_ac(AcImportance::Preferred)
        .with_view_importance(8)
        .with_famous_people(true)
        .with_position(Some(PositionPreference::Center))
        .with_location(Some(LocationPreference::Front));

    let mut group = c.benchmark_group("recommend");
    for copies in [1, 10, 100] {
        let seats = venue(copies);
        group.bench_with_input(BenchmarkId::from_parameter(seats.len()), &seats, |b, seats| {
            b.iter(|| recommender.recommend(black_box(seats), black_box(&prefs), Some(10)));
        });
    }
    group.finish();
}

fn bench_nearby(c: &mut Criterion) {
    let seats = venue(1);
    let reference = seats[44].clone();
    c.bench_function("find_nearby", |b| {
        b.iter(|| find_nearby(black_box(&reference), black_box(&seats), 3, 10));
    });
}

criterion_group!(benches, bench_rank, bench_nearby);
criterion_main!(benches);
