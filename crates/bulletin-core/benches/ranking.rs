use criterion::{black_box, criterion_group, criterion_main, Criterion};

use bulletin_core::config::Rounding;
use bulletin_core::mention::MentionScale;
use bulletin_core::ranking::assign_ranks;

fn averages(n: usize) -> Vec<(String, Option<f64>)> {
    (0..n)
        .map(|i| {
            let average = if i % 17 == 0 {
                None
            } else {
                Some(((i * 37) % 201) as f64 / 10.0)
            };
            (format!("student-{i:04}"), average)
        })
        .collect()
}

fn bench_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("assign_ranks");
    let rounding = Rounding::default();

    for n in [40usize, 400, 4000] {
        let input = averages(n);
        group.bench_function(format!("n={n}"), |b| {
            b.iter(|| {
                assign_ranks(
                    black_box(input.iter().map(|(id, avg)| (id.as_str(), *avg))),
                    &rounding,
                )
            })
        });
    }

    group.finish();
}

fn bench_mentions(c: &mut Criterion) {
    let scale = MentionScale::standard();
    c.bench_function("classify_0_to_20", |b| {
        b.iter(|| {
            for tenth in 0..=200 {
                black_box(scale.classify(black_box(tenth as f64 / 10.0)));
            }
        })
    });
}

criterion_group!(benches, bench_ranking, bench_mentions);
criterion_main!(benches);
