use bracket_engine::bracket::layout::plan_bracket;
use bracket_engine::tournament::{Participant, ParticipantStatus};
use chrono::Utc;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

fn participants(n: usize) -> Vec<Participant> {
    (0..n)
        .map(|i| Participant {
            id: i as i64 + 1,
            tournament_id: 1,
            user_id: None,
            name: format!("player{}", i),
            seed: None,
            status: ParticipantStatus::Approved,
            created_at: Utc::now(),
        })
        .collect()
}

/// Benchmark bracket layout for growing fields
fn bench_plan_bracket(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_bracket");

    for n in [8usize, 100, 1000, 10_000] {
        let field = participants(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &field, |b, field| {
            b.iter(|| {
                let mut list = field.clone();
                plan_bracket(std::hint::black_box(&mut list))
            });
        });
    }

    group.finish();
}

/// Benchmark layout with every participant already seeded in reverse
fn bench_plan_seeded(c: &mut Criterion) {
    let mut field = participants(1000);
    for (i, p) in field.iter_mut().enumerate() {
        p.seed = Some(1000 - i as i32);
    }

    c.bench_function("plan_bracket_seeded_1000", |b| {
        b.iter(|| {
            let mut list = field.clone();
            plan_bracket(std::hint::black_box(&mut list))
        });
    });
}

criterion_group!(layout, bench_plan_bracket, bench_plan_seeded);
criterion_main!(layout);
