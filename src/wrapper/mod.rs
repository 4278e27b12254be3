// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Storage wrappers presenting a plaintext block interface over the bucket
//! tree.
//!
//! The client speaks plaintext to whichever wrapper it is given. The
//! [`plain::PlainServerWrapper`] stores blocks as-is and exists as the
//! reference the protocol can be tested against; the
//! [`encrypted::EncServerWrapper`] stores only ciphertexts and answers path
//! reads with a homomorphic select, so the store never learns which slot
//! was touched.

pub mod encrypted;
pub mod plain;

use crate::{Address, BucketIndex, Leaf, OramError, TreeHeight};
use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};

/// A plaintext view of one live block.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    /// The logical block id.
    pub address: Address,
    /// The leaf this block is committed to evict toward.
    pub leaf_target: Leaf,
    /// The block's chunk values.
    pub chunks: Vec<BigUint>,
}

/// The storage interface the ORAM client drives.
///
/// Every method that stores fresh state takes an rng because the encrypted
/// implementation re-randomizes on each write; implementations move blocks
/// by deep copy only.
pub trait ServerWrapper {
    /// The number of tree levels below the root.
    fn levels(&self) -> TreeHeight;

    /// The number of block slots per bucket.
    fn blocks_per_bucket(&self) -> usize;

    /// The number of chunks per block.
    fn chunks_per_block(&self) -> usize;

    /// Returns the bucket ids on the path to `leaf` (root first) and the
    /// decrypted address of every slot along it (`None` for dummies).
    #[allow(clippy::type_complexity)]
    fn get_addresses(
        &mut self,
        leaf: Leaf,
    ) -> Result<(Vec<BucketIndex>, Vec<Vec<Option<Address>>>), OramError>;

    /// Overwrites the address cell of every listed position, re-encrypting
    /// live addresses and storing dummies as absent.
    fn set_addresses<R: RngCore + CryptoRng>(
        &mut self,
        bucket_ids: &[BucketIndex],
        addresses: &[Vec<Option<Address>>],
        rng: &mut R,
    ) -> Result<(), OramError>;

    /// Extracts the chunks of the single block marked by `select_vector`, a
    /// 0/1 matrix over the listed buckets with exactly one 1 at a live slot.
    fn select_block<R: RngCore + CryptoRng>(
        &mut self,
        bucket_ids: &[BucketIndex],
        select_vector: &[Vec<u8>],
        rng: &mut R,
    ) -> Result<Vec<BigUint>, OramError>;

    /// Whether a slot holds no live block.
    fn is_dummy(&self, bucket: BucketIndex, slot: usize) -> Result<bool, OramError>;

    /// Deep-copies a live block out of the store, decrypted.
    fn get_block(&mut self, bucket: BucketIndex, slot: usize) -> Result<Block, OramError>;

    /// Returns a live slot's decrypted `(address, leaf_target)`.
    fn get_metadata(
        &mut self,
        bucket: BucketIndex,
        slot: usize,
    ) -> Result<(Address, Leaf), OramError>;

    /// Writes a block into a slot, encrypting as the slot's depth demands.
    fn set_block<R: RngCore + CryptoRng>(
        &mut self,
        bucket: BucketIndex,
        slot: usize,
        block: &Block,
        rng: &mut R,
    ) -> Result<(), OramError>;

    /// Turns a slot back into a dummy, dropping its chunks.
    fn invalidate(&mut self, bucket: BucketIndex, slot: usize) -> Result<(), OramError>;
}
