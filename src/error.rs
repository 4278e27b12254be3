// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Error types for the cryptosystem and the ORAM protocol.

use crate::{Address, BucketIndex};
use num_bigint::BigUint;
use thiserror::Error;

/// Errors arising from the layered cryptosystem.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Two payloads passed to a homomorphic operation belong to different
    /// public keys.
    #[error("payloads belong to different public keys")]
    KeyMismatch,

    /// The space annotations of a payload do not satisfy an operation's
    /// preconditions.
    #[error("payload space mismatch: {context}")]
    SpaceMismatch {
        /// Which precondition was violated.
        context: &'static str,
    },

    /// A modular inverse was requested for a non-unit.
    #[error("{value} is not invertible modulo {modulus}")]
    NotInvertible {
        /// The non-invertible residue.
        value: BigUint,
        /// The modulus it was to be inverted under.
        modulus: BigUint,
    },

    /// The CRT inputs are not one remainder per modulus.
    #[error("CRT requires one remainder per modulus")]
    CrtShape,

    /// A homomorphic select was attempted over no payloads.
    #[error("homomorphic select requires at least one payload")]
    EmptySelection,

    /// The payload and selector lists passed to a select differ in length.
    #[error("homomorphic select requires one selector per payload")]
    SelectionShape,

    /// A select-vector entry was neither 0 nor 1.
    #[error("selector entries must be 0 or 1")]
    NonBinarySelector,

    /// The requested prime width is unusable.
    #[error("cannot generate a prime of {bits} bits")]
    PrimeBits {
        /// The requested width.
        bits: u64,
    },
}

/// Errors arising from the ORAM protocol. All of them are fatal to the
/// current operation; the core never retries.
#[derive(Debug, Error)]
pub enum OramError {
    /// The same non-dummy address was found in more than one block slot.
    #[error("block {address} is stored more than once")]
    DuplicateBlock {
        /// The duplicated address.
        address: Address,
    },

    /// A read was issued for a block that has never been written.
    #[error("block {address} has not been written before")]
    UninitializedBlock {
        /// The unwritten address.
        address: Address,
    },

    /// An eviction step could not place a block because the target child
    /// bucket has no dummy slot left.
    #[error("not enough room to evict into bucket {bucket}")]
    EvictionOverflow {
        /// The saturated child bucket.
        bucket: BucketIndex,
    },

    /// The position map says the block is on a path, but no slot on that
    /// path carries its address.
    #[error("block {address} is not present on its mapped path")]
    BlockNotOnPath {
        /// The missing address.
        address: Address,
    },

    /// A select vector did not mark exactly one live block.
    #[error("select vector must mark exactly one live block")]
    MalformedSelectVector,

    /// A logical address outside the configured block range.
    #[error("address {address} is outside the ORAM's {capacity} blocks")]
    AddressOutOfRange {
        /// The offending address.
        address: Address,
        /// The configured number of logical blocks.
        capacity: u64,
    },

    /// A bucket index outside the tree.
    #[error("bucket {bucket} does not exist in the tree")]
    BucketOutOfRange {
        /// The offending bucket index.
        bucket: BucketIndex,
    },

    /// A block slot index outside a bucket.
    #[error("slot {slot} does not exist in bucket {bucket}")]
    SlotOutOfRange {
        /// The bucket that was indexed.
        bucket: BucketIndex,
        /// The offending slot index.
        slot: usize,
    },

    /// A block read was issued against a dummy slot.
    #[error("slot {slot} of bucket {bucket} holds no block")]
    EmptySlot {
        /// The bucket that was indexed.
        bucket: BucketIndex,
        /// The dummy slot.
        slot: usize,
    },

    /// Stored metadata failed a consistency check (e.g. a decrypted leaf
    /// target that maps into neither child subtree).
    #[error("bucket {bucket} carries corrupted metadata")]
    MetadataCorrupted {
        /// The bucket holding the bad metadata.
        bucket: BucketIndex,
    },

    /// A structural parameter was rejected at construction or call time.
    #[error("invalid parameters: {context}")]
    InvalidParameters {
        /// What was wrong.
        context: &'static str,
    },

    /// A cryptosystem failure underneath a storage operation.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// An index did not fit the platform's native integer width.
    #[error(transparent)]
    IntegerConversion(#[from] std::num::TryFromIntError),
}
