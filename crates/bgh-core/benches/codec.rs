//! Codec benchmarks

use bgh_core::codec::MIN_STATUS_LEN;
use bgh_core::{decode_status, encode_mode, encode_temperature, DeviceIdentity};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn decode_benchmark(c: &mut Criterion) {
    let mut frame = vec![0u8; MIN_STATUS_LEN];
    frame[1..7].copy_from_slice(&[0xac, 0xcf, 0x23, 0xaa, 0x31, 0x90]);
    frame[18] = 1;
    frame[19] = 2;
    frame[21..23].copy_from_slice(&2500u16.to_le_bytes());
    frame[23..25].copy_from_slice(&2300u16.to_le_bytes());

    c.bench_function("decode_status", |b| {
        b.iter(|| black_box(decode_status(black_box(&frame)).unwrap()))
    });
}

fn encode_benchmark(c: &mut Criterion) {
    let identity = DeviceIdentity::new([0xac, 0xcf, 0x23, 0xaa, 0x31, 0x90]);

    c.bench_function("encode_mode", |b| {
        b.iter(|| black_box(encode_mode(&identity, black_box(1), black_box(2))))
    });

    c.bench_function("encode_temperature", |b| {
        b.iter(|| black_box(encode_temperature(&identity, 1, 2, black_box(23.5))))
    });
}

criterion_group!(benches, decode_benchmark, encode_benchmark);
criterion_main!(benches);
