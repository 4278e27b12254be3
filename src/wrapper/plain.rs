// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A wrapper that stores blocks in the clear.
//!
//! Functionally equivalent to the encrypted wrapper but with no privacy at
//! all: the protocol above it can be exercised and audited cheaply, which
//! is what the tests do.

use crate::server::{Server, StoredBlock};
use crate::wrapper::{Block, ServerWrapper};
use crate::{Address, BucketIndex, Leaf, OramError, TreeHeight};
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use rand::{CryptoRng, RngCore};

/// A pass-through wrapper storing plaintext blocks.
#[derive(Debug)]
pub struct PlainServerWrapper {
    server: Server,
}

impl PlainServerWrapper {
    /// Builds an all-dummy plaintext store.
    pub fn new(
        levels: TreeHeight,
        blocks_per_bucket: usize,
        chunks_per_block: usize,
    ) -> Result<Self, OramError> {
        Ok(Self {
            server: Server::new(levels, blocks_per_bucket, chunks_per_block)?,
        })
    }

    /// The underlying store, exposed for instrumentation.
    pub fn server(&self) -> &Server {
        &self.server
    }

    fn cell_to_value(cell: &Option<BigUint>, bucket: BucketIndex) -> Result<u64, OramError> {
        cell.as_ref()
            .and_then(BigUint::to_u64)
            .ok_or(OramError::MetadataCorrupted { bucket })
    }
}

impl ServerWrapper for PlainServerWrapper {
    fn levels(&self) -> TreeHeight {
        self.server.levels()
    }

    fn blocks_per_bucket(&self) -> usize {
        self.server.blocks_per_bucket()
    }

    fn chunks_per_block(&self) -> usize {
        self.server.chunks_per_block()
    }

    fn get_addresses(
        &mut self,
        leaf: Leaf,
    ) -> Result<(Vec<BucketIndex>, Vec<Vec<Option<Address>>>), OramError> {
        let (bucket_ids, cells) = self.server.get_addresses(leaf)?;
        let mut addresses = Vec::with_capacity(cells.len());
        for (row, &bucket) in cells.iter().zip(&bucket_ids) {
            let mut out = Vec::with_capacity(row.len());
            for cell in row {
                out.push(match cell {
                    None => None,
                    Some(value) => Some(
                        value
                            .to_u64()
                            .ok_or(OramError::MetadataCorrupted { bucket })?,
                    ),
                });
            }
            addresses.push(out);
        }
        Ok((bucket_ids, addresses))
    }

    fn set_addresses<R: RngCore + CryptoRng>(
        &mut self,
        bucket_ids: &[BucketIndex],
        addresses: &[Vec<Option<Address>>],
        _rng: &mut R,
    ) -> Result<(), OramError> {
        let cells: Vec<Vec<Option<BigUint>>> = addresses
            .iter()
            .map(|row| row.iter().map(|a| a.map(BigUint::from)).collect())
            .collect();
        self.server.set_addresses(bucket_ids, &cells)
    }

    fn select_block<R: RngCore + CryptoRng>(
        &mut self,
        bucket_ids: &[BucketIndex],
        select_vector: &[Vec<u8>],
        _rng: &mut R,
    ) -> Result<Vec<BigUint>, OramError> {
        if select_vector.len() != bucket_ids.len()
            || select_vector
                .iter()
                .any(|row| row.len() != self.blocks_per_bucket())
        {
            return Err(OramError::InvalidParameters {
                context: "select vector does not match the bucket list",
            });
        }

        let mut selected: Option<(BucketIndex, usize)> = None;
        let mut ones = 0usize;
        for (&bucket, row) in bucket_ids.iter().zip(select_vector) {
            for (slot, &bit) in row.iter().enumerate() {
                if bit > 1 {
                    return Err(OramError::Crypto(crate::CryptoError::NonBinarySelector));
                }
                if bit == 1 {
                    ones += 1;
                    selected = Some((bucket, slot));
                }
            }
        }
        if ones != 1 {
            return Err(OramError::MalformedSelectVector);
        }

        let (bucket, slot) = selected.unwrap_or((0, 0));
        let stored = self.server.peek(bucket, slot)?;
        if stored.is_dummy() {
            return Err(OramError::EmptySlot { bucket, slot });
        }
        let chunks = stored.chunks.clone();
        self.server.record_read(bucket);
        Ok(chunks)
    }

    fn is_dummy(&self, bucket: BucketIndex, slot: usize) -> Result<bool, OramError> {
        Ok(self.server.peek(bucket, slot)?.is_dummy())
    }

    fn get_block(&mut self, bucket: BucketIndex, slot: usize) -> Result<Block, OramError> {
        let stored = self.server.get_block(bucket, slot)?;
        if stored.is_dummy() {
            return Err(OramError::EmptySlot { bucket, slot });
        }
        Ok(Block {
            address: Self::cell_to_value(&stored.address, bucket)?,
            leaf_target: Self::cell_to_value(&stored.leaf_target, bucket)?,
            chunks: stored.chunks,
        })
    }

    fn get_metadata(
        &mut self,
        bucket: BucketIndex,
        slot: usize,
    ) -> Result<(Address, Leaf), OramError> {
        let stored = self.server.peek(bucket, slot)?;
        if stored.is_dummy() {
            return Err(OramError::EmptySlot { bucket, slot });
        }
        let address = Self::cell_to_value(&stored.address, bucket)?;
        let leaf_target = Self::cell_to_value(&stored.leaf_target, bucket)?;
        self.server.record_read(bucket);
        Ok((address, leaf_target))
    }

    fn set_block<R: RngCore + CryptoRng>(
        &mut self,
        bucket: BucketIndex,
        slot: usize,
        block: &Block,
        _rng: &mut R,
    ) -> Result<(), OramError> {
        self.server.set_block(
            bucket,
            slot,
            StoredBlock {
                address: Some(BigUint::from(block.address)),
                leaf_target: Some(BigUint::from(block.leaf_target)),
                chunks: block.chunks.clone(),
            },
        )
    }

    fn invalidate(&mut self, bucket: BucketIndex, slot: usize) -> Result<(), OramError> {
        self.server.invalidate(bucket, slot)
    }
}
