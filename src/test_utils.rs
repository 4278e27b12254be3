// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Common test utilities: logger setup, chunk helpers, and client
//! correctness workloads shared by every wrapper implementation.

use crate::wrapper::ServerWrapper;
use crate::Client;
use num_bigint::BigUint;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

pub(crate) fn init_logger() {
    let _ = TermLogger::init(
        LevelFilter::Warn,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
}

pub(crate) fn chunk_values(values: &[u64]) -> Vec<BigUint> {
    values.iter().map(|&v| BigUint::from(v)).collect()
}

fn shuffled_chunks(count: usize, rng: &mut StdRng) -> Vec<BigUint> {
    let mut data: Vec<u64> = (0..count as u64).collect();
    data.shuffle(rng);
    chunk_values(&data)
}

/// Writes two blocks with eviction disabled and checks that interleaved
/// reads keep returning what was last written.
pub(crate) fn run_basic_workload<W: ServerWrapper>(
    wrapper: W,
    total_blocks: u64,
    rng: &mut StdRng,
) {
    let chunks_per_block = wrapper.chunks_per_block();
    let mut client = Client::new(wrapper, total_blocks, None).unwrap();

    let descending: Vec<BigUint> = (0..chunks_per_block as u64).rev().map(BigUint::from).collect();
    client.write(1, &descending, rng).unwrap();
    assert_eq!(client.read(1, rng).unwrap(), descending);

    let mut other = vec![189u64, 224];
    other.extend(1..=chunks_per_block.saturating_sub(2) as u64);
    let other = chunk_values(&other);
    client.write(13, &other, rng).unwrap();
    assert_eq!(client.read(13, rng).unwrap(), other);
    assert_eq!(client.read(1, rng).unwrap(), descending);
}

/// Writes every logical block, then runs random read/rewrite rounds against
/// a mirror array, with eviction live the whole time.
pub(crate) fn run_stress_workload<W: ServerWrapper>(
    wrapper: W,
    total_blocks: u64,
    eviction_period: usize,
    iterations: usize,
    audit: bool,
    rng: &mut StdRng,
) {
    let chunks_per_block = wrapper.chunks_per_block();
    let mut client = Client::new(wrapper, total_blocks, Some(eviction_period)).unwrap();

    let mut mirror: Vec<Vec<BigUint>> = Vec::with_capacity(total_blocks as usize);
    for address in 0..total_blocks {
        let data = shuffled_chunks(chunks_per_block, rng);
        client.write(address, &data, rng).unwrap();
        assert_eq!(client.read(address, rng).unwrap(), data, "{address}");
        mirror.push(data);
    }
    if audit {
        client.audit().unwrap();
    }

    for _ in 0..iterations {
        let address = rng.gen_range(0..total_blocks);
        assert_eq!(
            client.read(address, rng).unwrap(),
            mirror[address as usize],
            "{address}"
        );
        let data = shuffled_chunks(chunks_per_block, rng);
        client.write(address, &data, rng).unwrap();
        mirror[address as usize] = data;
        if audit {
            client.audit().unwrap();
        }
    }
}

/// Stamps out the shared client correctness tests for a wrapper type.
/// `$make_wrapper` is a `fn(TreeHeight, usize, usize, &mut StdRng) -> W`.
macro_rules! create_client_correctness_tests {
    ($name:ident, $make_wrapper:path, $levels:expr, $blocks_per_bucket:expr,
     $chunks_per_block:expr, $total_blocks:expr, $eviction_period:expr,
     $iterations:expr, $audit:expr) => {
        paste::paste! {
            #[test]
            fn [<basic_workload_ $name>]() {
                $crate::test_utils::init_logger();
                let mut rng =
                    <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(0);
                let wrapper =
                    $make_wrapper($levels, $blocks_per_bucket, $chunks_per_block, &mut rng);
                $crate::test_utils::run_basic_workload(wrapper, $total_blocks, &mut rng);
            }

            #[test]
            fn [<stress_workload_ $name>]() {
                $crate::test_utils::init_logger();
                let mut rng =
                    <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(0);
                let wrapper =
                    $make_wrapper($levels, $blocks_per_bucket, $chunks_per_block, &mut rng);
                $crate::test_utils::run_stress_workload(
                    wrapper,
                    $total_blocks,
                    $eviction_period,
                    $iterations,
                    $audit,
                    &mut rng,
                );
            }
        }
    };
}

pub(crate) use create_client_correctness_tests;
