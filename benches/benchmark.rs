// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Benchmarks: the cipher across key widths and plaintext-space exponents,
//! and end-to-end ORAM accesses over the plaintext wrapper.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use num_bigint::{BigUint, RandBigInt};
use onion_oram::crypto::{decrypt, encrypt};
use onion_oram::{generate_keypair, Client, PlainServerWrapper};
use rand::{rngs::StdRng, Rng, SeedableRng};

const KEY_WIDTHS_TO_BENCHMARK: [u64; 2] = [256, 512];
const SPACE_EXPONENTS_TO_BENCHMARK: [u32; 3] = [1, 2, 4];

fn benchmark_keygen(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let mut group = c.benchmark_group("keygen");
    for bits in KEY_WIDTHS_TO_BENCHMARK {
        group.bench_with_input(BenchmarkId::from_parameter(bits), &bits, |b, &bits| {
            b.iter(|| generate_keypair(bits, 1, &mut rng).unwrap())
        });
    }
    group.finish();
}

fn benchmark_cipher(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let mut encrypt_group = c.benchmark_group("encrypt");
    for bits in KEY_WIDTHS_TO_BENCHMARK {
        for s in SPACE_EXPONENTS_TO_BENCHMARK {
            let (public, _) = generate_keypair(bits, s, &mut rng).unwrap();
            let m = rng.gen_biguint_below(&public.n_pow(s));
            encrypt_group.bench_function(BenchmarkId::new(format!("{bits}b"), s), |b| {
                b.iter(|| encrypt(&public, s, &m, &mut rng))
            });
        }
    }
    encrypt_group.finish();

    let mut decrypt_group = c.benchmark_group("decrypt");
    for bits in KEY_WIDTHS_TO_BENCHMARK {
        for s in SPACE_EXPONENTS_TO_BENCHMARK {
            let (public, private) = generate_keypair(bits, s, &mut rng).unwrap();
            let m = rng.gen_biguint_below(&public.n_pow(s));
            let ciphertext = encrypt(&public, s, &m, &mut rng);
            decrypt_group.bench_function(BenchmarkId::new(format!("{bits}b"), s), |b| {
                b.iter(|| decrypt(&public, &private, s, &ciphertext).unwrap())
            });
        }
    }
    decrypt_group.finish();
}

fn benchmark_oram_access(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let total_blocks = 512u64;

    let wrapper = PlainServerWrapper::new(5, 80, 10).unwrap();
    let mut client = Client::new(wrapper, total_blocks, Some(80)).unwrap();
    let chunks: Vec<BigUint> = (0..10u64).map(BigUint::from).collect();
    for address in 0..total_blocks {
        client.write(address, &chunks, &mut rng).unwrap();
    }

    let mut group = c.benchmark_group("oram");
    group.bench_function("access/plain", |b| {
        b.iter(|| {
            let address = rng.gen_range(0..total_blocks);
            black_box(client.read(address, &mut rng).unwrap())
        })
    });
    group.finish();

    let server = client.wrapper().server();
    println!(
        "physical accesses -- {} reads, {} writes",
        server.get_read_count(),
        server.get_write_count()
    );
}

criterion_group!(
    benches,
    benchmark_keygen,
    benchmark_cipher,
    benchmark_oram_access
);
criterion_main!(benches);
