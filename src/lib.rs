// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! An implementation of Oblivious RAM over a layered additively homomorphic
//! cryptosystem.
//!
//! The server side is a complete binary tree of fixed-size buckets holding
//! ciphertext blocks. A client access never tells the server which block it
//! touches: the requested block is extracted with a homomorphic select over
//! an entire root-to-leaf path, re-inserted at the root, and periodically
//! pushed back down the tree along a reverse-bit-order eviction schedule.
//!
//! The cryptosystem is a generalized Paillier scheme with a configurable
//! plaintext-space exponent, so a ciphertext can itself be encrypted again:
//! blocks deeper in the tree simply carry more "onion" layers.

#![warn(clippy::cargo, clippy::doc_markdown, missing_docs, rustdoc::all)]

pub mod arith;
pub mod client;
pub mod crypto;
mod error;
pub mod primes;
pub mod server;
pub mod tree;
pub mod utils;
pub mod wrapper;

#[cfg(test)]
pub(crate) mod test_utils;

pub use client::{Client, Operation};
pub use crypto::keys::{generate_keypair, PrivateKey, PublicKey};
pub use error::{CryptoError, OramError};
pub use wrapper::encrypted::EncServerWrapper;
pub use wrapper::plain::PlainServerWrapper;
pub use wrapper::{Block, ServerWrapper};

/// The numeric type used for logical block addresses.
pub type Address = u64;

/// A leaf-relative index in `[0, 2^levels)`.
pub type Leaf = u64;

/// The index of a bucket within the linearized tree (root = 0).
pub type BucketIndex = usize;

/// The number of tree levels below the root.
pub type TreeHeight = u32;
