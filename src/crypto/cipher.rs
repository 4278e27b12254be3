// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Encryption and decryption at a single layer.

use crate::crypto::keys::{PrivateKey, PublicKey};
use crate::CryptoError;
use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};

/// Encrypts `m ∈ ℤ_{n^s}` at layer `s`, producing a ciphertext in
/// `ℤ*_{n^{s+1}}`: `c = (n+1)^m * r^{n^s} mod n^{s+1}`.
pub fn encrypt<R: RngCore + CryptoRng>(
    public: &PublicKey,
    s: u32,
    m: &BigUint,
    rng: &mut R,
) -> BigUint {
    let modulus = public.n_pow(s + 1);
    let g = public.modulus() + 1u32;

    // For key sizes anyone would actually use, a random draw is a unit with
    // overwhelming probability. The resample loop keeps the tiny moduli the
    // tests run on from producing garbage.
    let mut r = rng.gen_biguint(public.bits()) % &modulus;
    while !r.gcd(&modulus).is_one() {
        r = rng.gen_biguint(public.bits()) % &modulus;
    }

    let g_pow_m = g.modpow(m, &modulus);
    let r_pow_ns = r.modpow(&public.n_pow(s), &modulus);
    (g_pow_m * r_pow_ns) % modulus
}

/// Decrypts a layer-`s` ciphertext back into `ℤ_{n^s}`.
///
/// Computes `c^{d(s)} mod n^{s+1}` and then recovers the plaintext by the
/// standard iterative lifting across `j = 1..=s`, subtracting the binomial
/// terms with the key's precomputed inverse factorials.
pub fn decrypt(
    public: &PublicKey,
    private: &PrivateKey,
    s: u32,
    c: &BigUint,
) -> Result<BigUint, CryptoError> {
    let n = public.modulus();
    // In a correct decryption u = 1 (mod n), so u is never zero; the zero
    // branch keeps a corrupted ciphertext from wrapping into a panic.
    let l = |u: BigUint| {
        if u.is_zero() {
            BigUint::zero()
        } else {
            (u - 1u32) / n
        }
    };

    let c_pow_d = c.modpow(&private.d(s)?, &public.n_pow(s + 1));

    let mut m = BigUint::zero();
    for j in 1..=s {
        let n_pow_j = public.n_pow(j);
        let mut new_m = l(&c_pow_d % public.n_pow(j + 1));
        let mut old_m = m.clone();
        for k in 2..=j {
            m = (m + &n_pow_j - 1u32) % &n_pow_j;
            old_m = (old_m * &m) % &n_pow_j;
            let term = (&old_m * public.n_pow(k - 1)) % &n_pow_j;
            let term = (term * public.inv_factorial(k, j)?) % &n_pow_j;
            new_m = (new_m + &n_pow_j - term) % &n_pow_j;
        }
        m = new_m;
    }
    Ok(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::generate_keypair;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn round_trip_at_single_layer() {
        let mut rng = StdRng::seed_from_u64(0);
        let (public, private) = generate_keypair(128, 1, &mut rng).unwrap();
        for _ in 0..10 {
            let m = rng.gen_biguint_below(public.modulus());
            let c = encrypt(&public, 1, &m, &mut rng);
            assert_eq!(decrypt(&public, &private, 1, &c).unwrap(), m);
        }
    }

    #[test]
    fn round_trip_at_deep_layer() {
        let mut rng = StdRng::seed_from_u64(0);
        let (public, private) = generate_keypair(128, 8, &mut rng).unwrap();
        for _ in 0..10 {
            let m = BigUint::from(rng.gen_range(0u64..100_000));
            let c = encrypt(&public, 8, &m, &mut rng);
            assert_eq!(decrypt(&public, &private, 8, &c).unwrap(), m);
        }
    }

    #[test]
    fn round_trip_over_full_plaintext_space() {
        let mut rng = StdRng::seed_from_u64(0);
        let (public, private) = generate_keypair(128, 3, &mut rng).unwrap();
        for s in 1..=3u32 {
            for _ in 0..5 {
                let m = rng.gen_biguint_below(&public.n_pow(s));
                let c = encrypt(&public, s, &m, &mut rng);
                assert_eq!(decrypt(&public, &private, s, &c).unwrap(), m, "s = {s}");
            }
        }
    }

    #[test]
    fn ciphertext_product_decrypts_to_plaintext_sum() {
        let mut rng = StdRng::seed_from_u64(0);
        let (public, private) = generate_keypair(128, 8, &mut rng).unwrap();
        let c1 = encrypt(&public, 8, &BigUint::from(12_851u32), &mut rng);
        let c2 = encrypt(&public, 8, &BigUint::from(21_585u32), &mut rng);
        let product = (c1 * c2) % public.n_pow(9);
        assert_eq!(
            decrypt(&public, &private, 8, &product).unwrap(),
            BigUint::from(34_436u32)
        );
    }

    #[test]
    fn sums_wrap_around_the_plaintext_space() {
        let mut rng = StdRng::seed_from_u64(0);
        let (public, private) = generate_keypair(64, 1, &mut rng).unwrap();
        let n = public.modulus().clone();
        let c1 = encrypt(&public, 1, &(&n - 1u32), &mut rng);
        let c2 = encrypt(&public, 1, &BigUint::from(5u32), &mut rng);
        let product = (c1 * c2) % public.n_pow(2);
        assert_eq!(
            decrypt(&public, &private, 1, &product).unwrap(),
            BigUint::from(4u32)
        );
    }
}
