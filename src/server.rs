// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The untrusted bucket store: a complete binary tree of fixed-size buckets
//! holding opaque cells.
//!
//! The server never interprets its cells; depending on the wrapper that owns
//! it they hold raw values or ciphertexts. Blocks cross this boundary only
//! by deep copy, so no aliasing survives between client and store.

use crate::{tree, BucketIndex, Leaf, OramError, TreeHeight};
use num_bigint::BigUint;

/// One block slot as the server stores it. A slot with no address cell is a
/// dummy; block positions are stable and dummies are retained, never
/// compacted away.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StoredBlock {
    /// The address cell, or `None` for a dummy slot.
    pub address: Option<BigUint>,
    /// The eviction-target cell. May hold a stale value on dummy slots.
    pub leaf_target: Option<BigUint>,
    /// The chunk cells.
    pub chunks: Vec<BigUint>,
}

impl StoredBlock {
    /// An empty slot.
    pub fn dummy() -> Self {
        Self::default()
    }

    /// Whether this slot holds no live block.
    pub fn is_dummy(&self) -> bool {
        self.address.is_none()
    }
}

/// A fixed-length run of block slots.
#[derive(Clone, Debug)]
pub struct Bucket {
    /// The slots, always exactly `blocks_per_bucket` of them.
    pub blocks: Vec<StoredBlock>,
}

/// The linearized bucket tree, with per-bucket access counters.
#[derive(Debug)]
pub struct Server {
    levels: TreeHeight,
    blocks_per_bucket: usize,
    chunks_per_block: usize,
    buckets: Vec<Bucket>,
    reads: Vec<u64>,
    writes: Vec<u64>,
}

impl Server {
    /// Builds an all-dummy tree with `levels` levels below the root.
    pub fn new(
        levels: TreeHeight,
        blocks_per_bucket: usize,
        chunks_per_block: usize,
    ) -> Result<Self, OramError> {
        if levels > tree::MAX_TREE_LEVELS {
            return Err(OramError::InvalidParameters {
                context: "tree has too many levels",
            });
        }
        if blocks_per_bucket == 0 {
            return Err(OramError::InvalidParameters {
                context: "buckets must hold at least one block",
            });
        }
        let total = tree::total_buckets(levels);
        let buckets = (0..total)
            .map(|_| Bucket {
                blocks: vec![StoredBlock::dummy(); blocks_per_bucket],
            })
            .collect();
        Ok(Self {
            levels,
            blocks_per_bucket,
            chunks_per_block,
            buckets,
            reads: vec![0; total],
            writes: vec![0; total],
        })
    }

    /// The number of tree levels below the root.
    pub fn levels(&self) -> TreeHeight {
        self.levels
    }

    /// The number of block slots per bucket.
    pub fn blocks_per_bucket(&self) -> usize {
        self.blocks_per_bucket
    }

    /// The number of chunks per block.
    pub fn chunks_per_block(&self) -> usize {
        self.chunks_per_block
    }

    /// Returns the bucket ids on the path to `leaf` (root first) together
    /// with a copy of every address cell along it.
    #[allow(clippy::type_complexity)]
    pub fn get_addresses(
        &mut self,
        leaf: Leaf,
    ) -> Result<(Vec<BucketIndex>, Vec<Vec<Option<BigUint>>>), OramError> {
        if leaf >= 1u64 << self.levels {
            return Err(OramError::InvalidParameters {
                context: "leaf index outside the tree",
            });
        }
        let bucket_ids = tree::path_to_leaf(leaf, self.levels);
        let mut addresses = Vec::with_capacity(bucket_ids.len());
        for &bucket in &bucket_ids {
            self.record_read(bucket);
            addresses.push(
                self.buckets[bucket]
                    .blocks
                    .iter()
                    .map(|block| block.address.clone())
                    .collect(),
            );
        }
        Ok((bucket_ids, addresses))
    }

    /// Overwrites the address cell of every listed position. Rows must be
    /// exactly `blocks_per_bucket` wide.
    pub fn set_addresses(
        &mut self,
        bucket_ids: &[BucketIndex],
        addresses: &[Vec<Option<BigUint>>],
    ) -> Result<(), OramError> {
        if bucket_ids.len() != addresses.len()
            || addresses.iter().any(|row| row.len() != self.blocks_per_bucket)
        {
            return Err(OramError::InvalidParameters {
                context: "address matrix does not match the bucket list",
            });
        }
        for (&bucket, row) in bucket_ids.iter().zip(addresses) {
            self.check_bucket(bucket)?;
            self.record_write(bucket);
            for (slot, cell) in row.iter().enumerate() {
                self.buckets[bucket].blocks[slot].address = cell.clone();
            }
        }
        Ok(())
    }

    /// Borrows a slot without copying it or counting an access. Used by the
    /// wrappers for metadata probes; block movement goes through
    /// [`Server::get_block`] / [`Server::set_block`].
    pub fn peek(&self, bucket: BucketIndex, slot: usize) -> Result<&StoredBlock, OramError> {
        self.check_slot(bucket, slot)?;
        Ok(&self.buckets[bucket].blocks[slot])
    }

    /// Deep-copies a slot out of the store.
    pub fn get_block(&mut self, bucket: BucketIndex, slot: usize) -> Result<StoredBlock, OramError> {
        self.check_slot(bucket, slot)?;
        self.record_read(bucket);
        Ok(self.buckets[bucket].blocks[slot].clone())
    }

    /// Deep-copies a block into a slot.
    pub fn set_block(
        &mut self,
        bucket: BucketIndex,
        slot: usize,
        block: StoredBlock,
    ) -> Result<(), OramError> {
        self.check_slot(bucket, slot)?;
        if !block.is_dummy() && block.chunks.len() != self.chunks_per_block {
            return Err(OramError::InvalidParameters {
                context: "block carries the wrong number of chunks",
            });
        }
        self.record_write(bucket);
        self.buckets[bucket].blocks[slot] = block;
        Ok(())
    }

    /// Turns a slot back into a dummy, dropping its chunks.
    pub fn invalidate(&mut self, bucket: BucketIndex, slot: usize) -> Result<(), OramError> {
        self.check_slot(bucket, slot)?;
        self.record_write(bucket);
        let block = &mut self.buckets[bucket].blocks[slot];
        block.address = None;
        block.chunks.clear();
        Ok(())
    }

    /// The total number of bucket reads served.
    pub fn get_read_count(&self) -> u64 {
        self.reads.iter().sum()
    }

    /// The total number of bucket writes served.
    pub fn get_write_count(&self) -> u64 {
        self.writes.iter().sum()
    }

    pub(crate) fn record_read(&mut self, bucket: BucketIndex) {
        log::debug!("bucket read -- {bucket}");
        self.reads[bucket] += 1;
    }

    fn record_write(&mut self, bucket: BucketIndex) {
        log::debug!("bucket write -- {bucket}");
        self.writes[bucket] += 1;
    }

    fn check_bucket(&self, bucket: BucketIndex) -> Result<(), OramError> {
        if bucket >= self.buckets.len() {
            return Err(OramError::BucketOutOfRange { bucket });
        }
        Ok(())
    }

    fn check_slot(&self, bucket: BucketIndex, slot: usize) -> Result<(), OramError> {
        self.check_bucket(bucket)?;
        if slot >= self.blocks_per_bucket {
            return Err(OramError::SlotOutOfRange { bucket, slot });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(address: u64, leaf: u64, chunks: &[u64]) -> StoredBlock {
        StoredBlock {
            address: Some(BigUint::from(address)),
            leaf_target: Some(BigUint::from(leaf)),
            chunks: chunks.iter().map(|&c| BigUint::from(c)).collect(),
        }
    }

    #[test]
    fn new_tree_is_all_dummies() {
        let server = Server::new(3, 4, 2).unwrap();
        for bucket in 0..tree::total_buckets(3) {
            for slot in 0..4 {
                assert!(server.peek(bucket, slot).unwrap().is_dummy());
            }
        }
    }

    #[test]
    fn path_addresses_run_root_to_leaf() {
        let mut server = Server::new(2, 2, 1).unwrap();
        server.set_block(0, 0, stored(7, 0, &[1])).unwrap();
        server.set_block(4, 1, stored(9, 1, &[2])).unwrap();

        let (bucket_ids, addresses) = server.get_addresses(1).unwrap();
        assert_eq!(bucket_ids, vec![0, 1, 4]);
        assert_eq!(addresses[0][0], Some(BigUint::from(7u32)));
        assert_eq!(addresses[0][1], None);
        assert_eq!(addresses[2][1], Some(BigUint::from(9u32)));
    }

    #[test]
    fn set_addresses_only_touches_address_cells() {
        let mut server = Server::new(2, 2, 1).unwrap();
        server.set_block(0, 0, stored(7, 3, &[42])).unwrap();

        server
            .set_addresses(&[0], &[vec![None, Some(BigUint::from(5u32))]])
            .unwrap();

        let freed = server.peek(0, 0).unwrap();
        assert!(freed.is_dummy());
        assert_eq!(freed.leaf_target, Some(BigUint::from(3u32)));
        assert_eq!(freed.chunks, vec![BigUint::from(42u32)]);
        assert_eq!(
            server.peek(0, 1).unwrap().address,
            Some(BigUint::from(5u32))
        );
    }

    #[test]
    fn blocks_move_by_deep_copy() {
        let mut server = Server::new(1, 1, 1).unwrap();
        let original = stored(1, 0, &[10]);
        server.set_block(0, 0, original.clone()).unwrap();
        let mut copy = server.get_block(0, 0).unwrap();
        copy.chunks[0] = BigUint::from(99u32);
        assert_eq!(server.peek(0, 0).unwrap().chunks[0], BigUint::from(10u32));
    }

    #[test]
    fn invalidate_clears_address_and_chunks() {
        let mut server = Server::new(1, 1, 1).unwrap();
        server.set_block(1, 0, stored(1, 0, &[10])).unwrap();
        server.invalidate(1, 0).unwrap();
        let slot = server.peek(1, 0).unwrap();
        assert!(slot.is_dummy());
        assert!(slot.chunks.is_empty());
    }

    #[test]
    fn access_counters_accumulate() {
        let mut server = Server::new(1, 1, 1).unwrap();
        server.set_block(0, 0, stored(1, 0, &[10])).unwrap();
        server.get_block(0, 0).unwrap();
        server.get_addresses(0).unwrap();
        assert_eq!(server.get_write_count(), 1);
        assert_eq!(server.get_read_count(), 3);
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let mut server = Server::new(1, 2, 1).unwrap();
        assert!(matches!(
            server.get_block(3, 0),
            Err(OramError::BucketOutOfRange { bucket: 3 })
        ));
        assert!(matches!(
            server.get_block(0, 2),
            Err(OramError::SlotOutOfRange { bucket: 0, slot: 2 })
        ));
        assert!(matches!(
            server.set_block(0, 0, stored(1, 0, &[1, 2])),
            Err(OramError::InvalidParameters { .. })
        ));
    }
}
