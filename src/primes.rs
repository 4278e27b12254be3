// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Probable-prime generation for keypair construction.

use crate::CryptoError;
use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};

/// Enough Miller-Rabin rounds for a false-positive probability below 2^-80.
const MILLER_RABIN_ROUNDS: usize = 40;

const SMALL_PRIMES: [u32; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// Returns a probable prime of exactly `bits` bits.
///
/// Candidates are drawn with the top and bottom bits forced to 1 and tested
/// with [`is_prime`] until one passes.
pub fn generate_prime<R: RngCore + CryptoRng>(
    bits: u64,
    rng: &mut R,
) -> Result<BigUint, CryptoError> {
    if bits < 2 {
        return Err(CryptoError::PrimeBits { bits });
    }
    loop {
        let mut candidate = rng.gen_biguint(bits);
        candidate.set_bit(bits - 1, true);
        candidate.set_bit(0, true);
        if is_prime(&candidate, rng) {
            return Ok(candidate);
        }
    }
}

/// Miller-Rabin probable-primality test with a small-prime pre-filter.
pub fn is_prime<R: RngCore + CryptoRng>(n: &BigUint, rng: &mut R) -> bool {
    if *n < BigUint::from(2u32) {
        return false;
    }
    for small in SMALL_PRIMES {
        let small = BigUint::from(small);
        if *n == small {
            return true;
        }
        if (n % &small).is_zero() {
            return false;
        }
    }

    // Write n - 1 = 2^t * u with u odd.
    let one = BigUint::one();
    let n_minus_one = n - &one;
    let t = n_minus_one.trailing_zeros().unwrap_or(0);
    let u = &n_minus_one >> t;

    'witness: for _ in 0..MILLER_RABIN_ROUNDS {
        let a = rng.gen_biguint_range(&BigUint::from(2u32), &n_minus_one);
        let mut x = a.modpow(&u, n);
        if x.is_one() || x == n_minus_one {
            continue;
        }
        for _ in 0..t.saturating_sub(1) {
            x = (&x * &x) % n;
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}
