// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The layered additively homomorphic cryptosystem.
//!
//! A generalized Paillier scheme: encryption at layer `s` maps `ℤ_{n^s}`
//! into `ℤ*_{n^{s+1}}`, and because a ciphertext is itself an integer it can
//! be encrypted again at the next layer up. [`payload::Payload`] tracks how
//! many layers a value currently carries; [`homomorphic`] operates on
//! ciphertexts without removing any.

pub mod cipher;
pub mod homomorphic;
pub mod keys;
pub mod payload;

pub use cipher::{decrypt, encrypt};
pub use keys::{generate_keypair, PrivateKey, PublicKey};
pub use payload::Payload;
