//! Encode/decode throughput per format and tier

use codec::{codec_for, Fidelity, WireFormat};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use types::{PayloadGenerator, PayloadTier};

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    let mut generator = PayloadGenerator::seeded(42);

    for tier in PayloadTier::ALL {
        let record = generator.generate("sensor_001", tier);
        for format in WireFormat::ALL {
            let codec = codec_for(format, Fidelity::Full);
            let size = codec.encode(&record).map(|b| b.len()).unwrap_or(0);
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(
                BenchmarkId::new(format.as_str(), tier),
                &record,
                |b, record| {
                    b.iter(|| black_box(codec.encode(black_box(record))));
                },
            );
        }
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    let mut generator = PayloadGenerator::seeded(42);

    for tier in PayloadTier::ALL {
        let record = generator.generate("sensor_001", tier);
        for format in WireFormat::ALL {
            let codec = codec_for(format, Fidelity::Full);
            let Ok(bytes) = codec.encode(&record) else {
                continue;
            };
            group.throughput(Throughput::Bytes(bytes.len() as u64));
            group.bench_with_input(
                BenchmarkId::new(format.as_str(), tier),
                &bytes,
                |b, bytes| {
                    b.iter(|| black_box(codec.decode(black_box(bytes))));
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
