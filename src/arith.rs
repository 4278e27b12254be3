// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Number-theoretic helpers on top of `num-bigint`.
//!
//! gcd/lcm come from [`num_integer::Integer`] and modular exponentiation from
//! [`BigUint::modpow`]; this module adds the two pieces the library does not
//! give us directly: a modular inverse that reports non-units as errors, and
//! a Chinese-remainder solver over pairwise-coprime moduli.

use crate::CryptoError;
use num_bigint::{BigInt, BigUint};
use num_traits::{One, Zero};

/// Computes `a^{-1} mod m` by the extended Euclidean algorithm.
///
/// Returns [`CryptoError::NotInvertible`] when `gcd(a, m) != 1`.
pub fn modinv(a: &BigUint, m: &BigUint) -> Result<BigUint, CryptoError> {
    let modulus = BigInt::from(m.clone());
    let mut old_r = BigInt::from(a.clone());
    let mut r = modulus.clone();
    let mut old_s = BigInt::one();
    let mut s = BigInt::zero();

    while !r.is_zero() {
        let quotient = &old_r / &r;
        let next_r = &old_r - &quotient * &r;
        old_r = std::mem::replace(&mut r, next_r);
        let next_s = &old_s - &quotient * &s;
        old_s = std::mem::replace(&mut s, next_s);
    }

    if !old_r.is_one() {
        return Err(CryptoError::NotInvertible {
            value: a % m,
            modulus: m.clone(),
        });
    }

    let inverse = ((old_s % &modulus) + &modulus) % &modulus;
    Ok(inverse.magnitude().clone())
}

/// Solves `x ≡ remainders[i] (mod moduli[i])` for pairwise-coprime moduli,
/// returning the unique solution in `[0, ∏ moduli)`.
pub fn crt(moduli: &[BigUint], remainders: &[BigUint]) -> Result<BigUint, CryptoError> {
    if moduli.is_empty() || moduli.len() != remainders.len() {
        return Err(CryptoError::CrtShape);
    }

    let product: BigUint = moduli.iter().product();
    let mut solution = BigUint::zero();
    for (modulus, remainder) in moduli.iter().zip(remainders) {
        let cofactor = &product / modulus;
        solution += remainder * modinv(&cofactor, modulus)? * &cofactor;
    }
    Ok(solution % product)
}
