//! benches/kdf.rs
//! Passphrase stretch benchmark. One derivation is 250k SHA-512 rounds, so
//! sample counts are kept low.

use criterion::{criterion_group, criterion_main, Criterion};
use msgback_rs::derive_keys;
use std::hint::black_box;
use std::time::Duration;

fn kdf_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("KDF");
    group.measurement_time(Duration::from_secs(20));
    group.sample_size(10);

    let salt = [0x42u8; 32];

    group.bench_function("derive_keys_250k", |b| {
        b.iter(|| {
            let keys = derive_keys(black_box("benchmark-password"), black_box(Some(&salt[..])));
            black_box(keys);
        });
    });

    group.finish();
}

criterion_group!(benches, kdf_benches);
criterion_main!(benches);
