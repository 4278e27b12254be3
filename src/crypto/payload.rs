// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Ciphertexts annotated with the space they decode into and the space they
//! currently reside in.

use crate::crypto::cipher::{decrypt, encrypt};
use crate::crypto::keys::{PrivateKey, PublicKey};
use crate::CryptoError;
use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};

/// A value under zero or more onion layers.
///
/// `plaintext_space` is the exponent `s` such that the fully decrypted value
/// lives in `ℤ_{n^s}`; `current_space` grows by one with every layer added.
/// When the two are equal the payload holds a raw plaintext.
#[derive(Clone, Debug)]
pub struct Payload<'k> {
    pub(crate) value: BigUint,
    pub(crate) public_key: &'k PublicKey,
    pub(crate) plaintext_space: u32,
    pub(crate) current_space: u32,
}

impl<'k> Payload<'k> {
    /// Wraps `value` with the given space annotations.
    pub fn new(
        value: BigUint,
        public_key: &'k PublicKey,
        plaintext_space: u32,
        current_space: u32,
    ) -> Self {
        Self {
            value,
            public_key,
            plaintext_space,
            current_space,
        }
    }

    /// The raw payload value (a ciphertext unless no layers remain).
    pub fn value(&self) -> &BigUint {
        &self.value
    }

    /// Consumes the payload, returning its raw value.
    pub fn into_value(self) -> BigUint {
        self.value
    }

    /// The space the fully decrypted value lives in.
    pub fn plaintext_space(&self) -> u32 {
        self.plaintext_space
    }

    /// The space the value currently resides in.
    pub fn current_space(&self) -> u32 {
        self.current_space
    }

    /// The number of onion layers still wrapped around the plaintext.
    pub fn onion_layers(&self) -> u32 {
        self.current_space.saturating_sub(self.plaintext_space)
    }

    /// Adds one onion layer.
    pub fn lift_once<R: RngCore + CryptoRng>(self, rng: &mut R) -> Payload<'k> {
        let value = encrypt(self.public_key, self.current_space, &self.value, rng);
        Payload {
            value,
            public_key: self.public_key,
            plaintext_space: self.plaintext_space,
            current_space: self.current_space + 1,
        }
    }

    /// Adds `k` onion layers.
    pub fn lift_by<R: RngCore + CryptoRng>(self, k: u32, rng: &mut R) -> Payload<'k> {
        let mut lifted = self;
        for _ in 0..k {
            lifted = lifted.lift_once(rng);
        }
        lifted
    }

    /// Removes one onion layer. Fails if no layer remains.
    pub fn drop_once(self, private: &PrivateKey) -> Result<Payload<'k>, CryptoError> {
        if self.current_space <= self.plaintext_space {
            return Err(CryptoError::SpaceMismatch {
                context: "no onion layer left to remove",
            });
        }
        let value = decrypt(
            self.public_key,
            private,
            self.current_space - 1,
            &self.value,
        )?;
        Ok(Payload {
            value,
            public_key: self.public_key,
            plaintext_space: self.plaintext_space,
            current_space: self.current_space - 1,
        })
    }

    /// Removes `k` onion layers.
    pub fn drop_by(self, k: u32, private: &PrivateKey) -> Result<Payload<'k>, CryptoError> {
        let mut dropped = self;
        for _ in 0..k {
            dropped = dropped.drop_once(private)?;
        }
        Ok(dropped)
    }

    /// Removes every remaining layer and returns the plaintext.
    pub fn get_plaintext(self, private: &PrivateKey) -> Result<BigUint, CryptoError> {
        let layers = self.onion_layers();
        Ok(self.drop_by(layers, private)?.value)
    }
}
