// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Key material for the layered cryptosystem.
//!
//! Both halves carry memoizing caches for quantities that are expensive to
//! recompute (`n^i`, inverse factorials, decryption exponents). The caches
//! are append-only, live behind interior mutability so the keys themselves
//! stay immutable, and are excluded from equality.

use crate::arith::{crt, modinv};
use crate::primes::generate_prime;
use crate::CryptoError;
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use std::cell::RefCell;
use std::collections::HashMap;

/// The public half of a keypair: the modulus `n = p * q` together with the
/// base plaintext-space exponent the owning store encrypts at.
#[derive(Debug)]
pub struct PublicKey {
    n: BigUint,
    base_space: u32,
    bits: u64,
    n_pows: RefCell<Vec<BigUint>>,
    inv_factorials: RefCell<HashMap<(u32, u32), BigUint>>,
}

impl PublicKey {
    pub(crate) fn new(n: BigUint, base_space: u32) -> Self {
        let bits = n.bits();
        let n_pows = RefCell::new(vec![BigUint::one(), n.clone()]);
        Self {
            n,
            base_space,
            bits,
            n_pows,
            inv_factorials: RefCell::new(HashMap::new()),
        }
    }

    /// The modulus `n`.
    pub fn modulus(&self) -> &BigUint {
        &self.n
    }

    /// The base plaintext-space exponent this key was generated for.
    pub fn base_space(&self) -> u32 {
        self.base_space
    }

    /// The bit length of `n`, used to size random draws.
    pub fn bits(&self) -> u64 {
        self.bits
    }

    /// Returns `n^i`, memoized.
    pub fn n_pow(&self, i: u32) -> BigUint {
        let mut cache = self.n_pows.borrow_mut();
        while cache.len() <= i as usize {
            let next = &cache[cache.len() - 1] * &self.n;
            cache.push(next);
        }
        cache[i as usize].clone()
    }

    /// Returns `(i!)^{-1} mod n^j`, memoized.
    ///
    /// The inverse exists because `i` stays far below either prime factor.
    pub fn inv_factorial(&self, i: u32, j: u32) -> Result<BigUint, CryptoError> {
        if let Some(hit) = self.inv_factorials.borrow().get(&(i, j)) {
            return Ok(hit.clone());
        }
        let mut factorial = BigUint::one();
        for k in 2..=i {
            factorial *= k;
        }
        let inverse = modinv(&factorial, &self.n_pow(j))?;
        self.inv_factorials
            .borrow_mut()
            .insert((i, j), inverse.clone());
        Ok(inverse)
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.n == other.n && self.base_space == other.base_space
    }
}

impl Eq for PublicKey {}

/// The private half of a keypair: the factors of `n` plus a cache of
/// decryption exponents per layer.
#[derive(Debug)]
pub struct PrivateKey {
    n: BigUint,
    p: BigUint,
    q: BigUint,
    d_cache: RefCell<HashMap<u32, BigUint>>,
}

impl PrivateKey {
    pub(crate) fn new(n: BigUint, p: BigUint, q: BigUint) -> Self {
        Self {
            n,
            p,
            q,
            d_cache: RefCell::new(HashMap::new()),
        }
    }

    /// The decryption exponent for layer `s`: the unique `d` with
    /// `d ≡ 1 (mod n^s)` and `d ≡ 0 (mod λ)`, `λ = lcm(p-1, q-1)`.
    pub fn d(&self, s: u32) -> Result<BigUint, CryptoError> {
        if let Some(hit) = self.d_cache.borrow().get(&s) {
            return Ok(hit.clone());
        }
        let lambda = (&self.p - 1u32).lcm(&(&self.q - 1u32));
        let n_pow_s = self.n.pow(s);
        let d = crt(&[n_pow_s, lambda], &[BigUint::one(), BigUint::zero()])?;
        self.d_cache.borrow_mut().insert(s, d.clone());
        Ok(d)
    }
}

/// Generates a keypair whose modulus is the product of two primes of
/// `bits / 2` bits each.
///
/// `base_space` is the plaintext-space exponent the caller intends to
/// encrypt raw data at; it is recorded on the public key but places no
/// restriction on which layers the key can serve.
pub fn generate_keypair<R: RngCore + CryptoRng>(
    bits: u64,
    base_space: u32,
    rng: &mut R,
) -> Result<(PublicKey, PrivateKey), CryptoError> {
    let p = generate_prime(bits / 2, rng)?;
    let mut q = generate_prime(bits / 2, rng)?;
    // Identical factors make n^s and lambda share a divisor, which breaks
    // the CRT underlying decryption. Only reachable with toy widths.
    while q == p {
        q = generate_prime(bits / 2, rng)?;
    }
    let n = &p * &q;
    Ok((PublicKey::new(n.clone(), base_space), PrivateKey::new(n, p, q)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_integer::Integer;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn n_pow_cache_grows_on_demand() {
        let key = PublicKey::new(BigUint::from(10u32), 1);
        assert_eq!(key.n_pow(0), BigUint::from(1u32));
        assert_eq!(key.n_pow(3), BigUint::from(1000u32));
        assert_eq!(key.n_pow(1), BigUint::from(10u32));
    }

    #[test]
    fn inv_factorial_matches_direct_computation() {
        let key = PublicKey::new(BigUint::from(15u32), 1);
        // 2! = 2, inverse 113: 2 * 113 = 226 = 1 (mod 225)
        let inverse = key.inv_factorial(2, 2).unwrap();
        assert_eq!(inverse, BigUint::from(113u32));
    }

    #[test]
    fn equality_ignores_cache_state() {
        let a = PublicKey::new(BigUint::from(21u32), 1);
        let b = PublicKey::new(BigUint::from(21u32), 1);
        a.n_pow(5);
        assert_eq!(a, b);
    }

    #[test]
    fn decryption_exponent_satisfies_both_congruences() {
        let mut rng = StdRng::seed_from_u64(0);
        let (public, private) = generate_keypair(64, 1, &mut rng).unwrap();
        for s in 1..=3u32 {
            let d = private.d(s).unwrap();
            let n_pow_s = public.n_pow(s);
            let lambda = (&private.p - 1u32).lcm(&(&private.q - 1u32));
            assert_eq!(&d % &n_pow_s, BigUint::from(1u32));
            assert_eq!(&d % &lambda, BigUint::from(0u32));
        }
    }

    #[test]
    fn keypair_factors_multiply_to_modulus() {
        let mut rng = StdRng::seed_from_u64(0);
        let (public, private) = generate_keypair(64, 2, &mut rng).unwrap();
        assert_eq!(&private.p * &private.q, *public.modulus());
        assert_ne!(private.p, private.q);
        assert_eq!(public.base_space(), 2);
    }
}
