use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use trng_characterization::{AcquisitionConfig, Collector, SimulatedTrng, TrngMode};

fn bench_collect(c: &mut Criterion) {
    let mut group = c.benchmark_group("collect");

    for buffer_size in [1u32 << 10, 1 << 14, 1 << 18] {
        let config = AcquisitionConfig::new(TrngMode::Fast, 0, 1, buffer_size).unwrap();
        let mut collector = Collector::new(SimulatedTrng::new(0));

        group.throughput(Throughput::Bytes(buffer_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(buffer_size),
            &config,
            |b, config| {
                b.iter(|| {
                    let mut bytes = 0usize;
                    let collection = collector
                        .run(config, &mut |chunk: &[u8]| bytes += black_box(chunk).len())
                        .unwrap();
                    black_box((collection, bytes))
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_collect);
criterion_main!(benches);
