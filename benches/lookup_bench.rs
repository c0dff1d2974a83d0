use cloudiplookup::{snapshot, AddressKey, IndexBuilder, LookupEngine, RangeIndex, RangeRecord};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;
use std::net::Ipv4Addr;

const PROVIDERS: [&str; 4] = ["AWS", "Azure", "Google Cloud Platform", "Oracle Cloud"];

/// `count` IPv4 /24s spread over the address space, plus a few IPv6 /48s
fn generate_index(count: usize, rng: &mut StdRng) -> RangeIndex {
    let mut builder = IndexBuilder::new();
    for i in 0..count {
        let start = rng.random::<u32>() & 0xFFFF_FF00;
        let provider = PROVIDERS[i % PROVIDERS.len()];
        builder
            .add(RangeRecord::new(
                AddressKey::v4(start),
                24,
                provider,
                format!("svc-{}", i % 50),
                format!("region-{}", i % 30),
            ))
            .unwrap();
    }
    for i in 0..count / 10 {
        let start = (0x2600_u128 << 112) | ((i as u128) << 80);
        builder
            .add(RangeRecord::new(AddressKey::v6(start), 48, "AWS", "EC2", "us-west-2"))
            .unwrap();
    }
    builder.build().unwrap()
}

fn generate_queries(count: usize, rng: &mut StdRng) -> Vec<String> {
    (0..count)
        .map(|_| Ipv4Addr::from(rng.random::<u32>()).to_string())
        .collect()
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    group.sample_size(10);

    for count in [10_000usize, 100_000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut rng = StdRng::seed_from_u64(42);
                black_box(generate_index(count, &mut rng))
            });
        });
    }
    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let index = generate_index(100_000, &mut rng);
    let queries = generate_queries(1000, &mut rng);

    let mut group = c.benchmark_group("lookup");
    group.throughput(Throughput::Elements(queries.len() as u64));

    group.bench_function("random_ipv4", |b| {
        b.iter(|| {
            for q in &queries {
                black_box(index.lookup(black_box(q)).unwrap());
            }
        });
    });

    group.bench_function("ipv6_hit", |b| {
        b.iter(|| black_box(index.lookup(black_box("2600:0:1::1")).unwrap()));
    });

    group.bench_function("invalid", |b| {
        b.iter(|| black_box(index.lookup(black_box("not-an-address")).unwrap()));
    });
    group.finish();
}

fn bench_lookup_many(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let engine = LookupEngine::new(generate_index(100_000, &mut rng)).unwrap();

    let mut group = c.benchmark_group("lookup_many");
    for batch in [100usize, 10_000] {
        let queries = generate_queries(batch, &mut rng);
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch), &queries, |b, queries| {
            b.iter(|| black_box(engine.lookup_many(queries).unwrap()));
        });
    }
    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let index = generate_index(100_000, &mut rng);
    let bytes = snapshot::save(&index).unwrap();

    let mut group = c.benchmark_group("snapshot");
    group.sample_size(20);
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("save", |b| b.iter(|| black_box(snapshot::save(&index).unwrap())));
    group.bench_function("load", |b| {
        b.iter(|| black_box(snapshot::load(black_box(&bytes)).unwrap()))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_build,
    bench_lookup,
    bench_lookup_many,
    bench_snapshot
);
criterion_main!(benches);
