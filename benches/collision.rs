use criterion::{black_box, criterion_group, criterion_main, Criterion};

use carto_place::basics::RectD;
use carto_place::label_collision_detector::LabelCollisionDetector;
use carto_place::tolerance_iterator::ToleranceIterator;

/// Boxes on a jittered grid, overlapping their neighbours.
fn boxes(n: usize) -> Vec<RectD> {
    (0..n)
        .map(|i| {
            let x = (i % 100) as f64 * 10.0 + (i * 7 % 5) as f64;
            let y = (i / 100) as f64 * 8.0 + (i * 3 % 4) as f64;
            RectD::new(x, y, x + 24.0, y + 10.0)
        })
        .collect()
}

fn bench_insert_and_query(c: &mut Criterion) {
    let extent = RectD::new(0.0, 0.0, 1024.0, 1024.0);
    let candidates = boxes(10_000);

    c.bench_function("detector_try_insert_10k", |b| {
        b.iter(|| {
            let mut det = LabelCollisionDetector::new(extent);
            let mut placed = 0usize;
            for r in &candidates {
                if det.has_placement(r) {
                    det.insert(*r, None);
                    placed += 1;
                }
            }
            black_box(placed)
        })
    });

    let mut filled = LabelCollisionDetector::new(extent);
    for (i, r) in candidates.iter().enumerate().step_by(3) {
        filled.insert(*r, Some(if i % 2 == 0 { "even" } else { "odd" }));
    }
    c.bench_function("detector_repeat_query", |b| {
        b.iter(|| {
            candidates
                .iter()
                .filter(|r| filled.has_placement_repeat(r, 2.0, "even", 50.0))
                .count()
        })
    });
}

fn bench_tolerance_iterator(c: &mut Criterion) {
    c.bench_function("tolerance_iterator_full", |b| {
        b.iter(|| ToleranceIterator::new(black_box(40.0), black_box(3.0)).sum::<f64>())
    });
}

criterion_group!(benches, bench_insert_and_query, bench_tolerance_iterator);
criterion_main!(benches);
