use canonical::chunks;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn bench_chunks(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunks");

    for size in [1_000, 10_000, 100_000].iter() {
        let text = "word ".repeat(*size / 5);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_function(format!("chars_{size}"), |b| {
            b.iter(|| chunks(black_box(&text), black_box(1000), black_box(200)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_chunks);
criterion_main!(benches);
