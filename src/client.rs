// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The ORAM client.
//!
//! The client owns the position map and drives a [`ServerWrapper`]. An
//! access selects the target block obliviously off its mapped path,
//! invalidates the old copy, and re-inserts the (possibly updated) block at
//! the root under a freshly drawn leaf. Every `eviction_period` accesses the
//! tree is compacted by pushing one root-to-leaf path's blocks toward their
//! target leaves, with paths chosen in reverse-bit order so the load spreads
//! evenly.

use crate::utils::bitreverse;
use crate::wrapper::{Block, ServerWrapper};
use crate::{tree, Address, BucketIndex, Leaf, OramError};
use num_bigint::BigUint;
use num_traits::Zero;
use rand::{CryptoRng, Rng, RngCore};
use std::collections::HashSet;

/// What an access should do once the target block is in hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Return the block's chunks.
    Read,
    /// Replace the block's chunks.
    Write,
}

/// An ORAM client over any [`ServerWrapper`].
#[derive(Debug)]
pub struct Client<W: ServerWrapper> {
    wrapper: W,
    total_blocks: u64,
    total_leaves: u64,
    eviction_period: Option<usize>,
    eviction_counter: usize,
    next_evicted_path: u64,
    position_map: Vec<Option<Leaf>>,
}

impl<W: ServerWrapper> Client<W> {
    /// Builds a client addressing `total_blocks` logical blocks.
    ///
    /// `eviction_period` of `None` disables eviction entirely (useful for
    /// short-lived reference runs). When enabled, the root bucket must be
    /// able to absorb a full period of root insertions, so the wrapper's
    /// bucket size must be at least the period.
    pub fn new(
        wrapper: W,
        total_blocks: u64,
        eviction_period: Option<usize>,
    ) -> Result<Self, OramError> {
        if total_blocks == 0 {
            return Err(OramError::InvalidParameters {
                context: "ORAM needs at least one logical block",
            });
        }
        if let Some(period) = eviction_period {
            if period == 0 {
                return Err(OramError::InvalidParameters {
                    context: "eviction period must be positive",
                });
            }
            if wrapper.blocks_per_bucket() < period {
                return Err(OramError::InvalidParameters {
                    context: "root bucket cannot absorb a full eviction period",
                });
            }
        }
        let total_leaves = 1u64 << wrapper.levels();
        Ok(Self {
            wrapper,
            total_blocks,
            total_leaves,
            eviction_period,
            eviction_counter: 0,
            next_evicted_path: 0,
            position_map: vec![None; usize::try_from(total_blocks)?],
        })
    }

    /// The wrapper this client drives, exposed for instrumentation.
    pub fn wrapper(&self) -> &W {
        &self.wrapper
    }

    /// The number of logical blocks.
    pub fn total_blocks(&self) -> u64 {
        self.total_blocks
    }

    /// Reads a block's chunks.
    pub fn read<R: RngCore + CryptoRng>(
        &mut self,
        address: Address,
        rng: &mut R,
    ) -> Result<Vec<BigUint>, OramError> {
        self.access(address, Operation::Read, None, rng)
    }

    /// Writes a block's chunks, initializing the block on first touch.
    pub fn write<R: RngCore + CryptoRng>(
        &mut self,
        address: Address,
        chunks: &[BigUint],
        rng: &mut R,
    ) -> Result<(), OramError> {
        self.access(address, Operation::Write, Some(chunks), rng)?;
        Ok(())
    }

    /// Performs one ORAM access, returning the chunks the block held before
    /// any replacement took effect.
    pub fn access<R: RngCore + CryptoRng>(
        &mut self,
        address: Address,
        operation: Operation,
        new_chunks: Option<&[BigUint]>,
        rng: &mut R,
    ) -> Result<Vec<BigUint>, OramError> {
        if address >= self.total_blocks {
            return Err(OramError::AddressOutOfRange {
                address,
                capacity: self.total_blocks,
            });
        }
        match (operation, new_chunks) {
            (Operation::Write, Some(chunks)) if chunks.len() != self.wrapper.chunks_per_block() => {
                return Err(OramError::InvalidParameters {
                    context: "replacement carries the wrong number of chunks",
                })
            }
            (Operation::Write, None) => {
                return Err(OramError::InvalidParameters {
                    context: "write access needs replacement chunks",
                })
            }
            (Operation::Read, Some(_)) => {
                return Err(OramError::InvalidParameters {
                    context: "read access must not carry replacement chunks",
                })
            }
            _ => {}
        }
        log::debug!("access -- {operation:?} block {address}");

        if self.position_map[address as usize].is_none() && operation == Operation::Write {
            self.initialize_block(address, rng)?;
        }
        let Some(old_leaf) = self.position_map[address as usize] else {
            return Err(OramError::UninitializedBlock { address });
        };

        let new_leaf: Leaf = rng.gen_range(0..self.total_leaves);
        self.position_map[address as usize] = Some(new_leaf);

        let (bucket_ids, mut addresses) = self.wrapper.get_addresses(old_leaf)?;

        // One pass over the path: detect duplicates, mark the target in the
        // select vector, and free its old slot in the address layout.
        let mut select_vector = vec![vec![0u8; self.wrapper.blocks_per_bucket()]; bucket_ids.len()];
        let mut seen = HashSet::new();
        let mut matches = 0usize;
        for (row_index, row) in addresses.iter_mut().enumerate() {
            for (slot, cell) in row.iter_mut().enumerate() {
                let Some(found) = *cell else { continue };
                if !seen.insert(found) {
                    return Err(OramError::DuplicateBlock { address: found });
                }
                if found == address {
                    select_vector[row_index][slot] = 1;
                    *cell = None;
                    matches += 1;
                }
            }
        }
        if matches != 1 {
            return Err(OramError::BlockNotOnPath { address });
        }

        let previous_chunks = self.wrapper.select_block(&bucket_ids, &select_vector, rng)?;
        let stored_chunks = match (operation, new_chunks) {
            (Operation::Write, Some(chunks)) => chunks.to_vec(),
            _ => previous_chunks.clone(),
        };

        // The address layout with the target freed invalidates the old copy.
        self.wrapper.set_addresses(&bucket_ids, &addresses, rng)?;

        self.wrapper.set_block(
            0,
            self.eviction_counter,
            &Block {
                address,
                leaf_target: new_leaf,
                chunks: stored_chunks,
            },
            rng,
        )?;

        self.eviction_counter += 1;
        if Some(self.eviction_counter) == self.eviction_period {
            self.eviction_counter = 0;
            let leaf = bitreverse(self.next_evicted_path, self.wrapper.levels());
            self.evict_along_path(leaf, rng)?;
            self.next_evicted_path = (self.next_evicted_path + 1) % self.total_blocks;
        }

        Ok(previous_chunks)
    }

    /// Walks the whole tree and checks it against the position map: every
    /// live block must sit on the path to its mapped leaf, no address may
    /// occur twice, and every mapped address must be present. A debugging
    /// aid for tests; on the encrypted wrapper it decrypts every slot.
    pub fn audit(&mut self) -> Result<(), OramError> {
        let mut seen = HashSet::new();
        for bucket in 0..tree::total_buckets(self.wrapper.levels()) {
            for slot in 0..self.wrapper.blocks_per_bucket() {
                if self.wrapper.is_dummy(bucket, slot)? {
                    continue;
                }
                let (address, leaf_target) = self.wrapper.get_metadata(bucket, slot)?;
                if !seen.insert(address) {
                    return Err(OramError::DuplicateBlock { address });
                }
                match self.position_map.get(address as usize) {
                    Some(Some(mapped)) if *mapped == leaf_target => {}
                    _ => return Err(OramError::MetadataCorrupted { bucket }),
                }
                let leaf_bucket = tree::leaf_bucket(leaf_target, self.wrapper.levels());
                if !tree::is_ancestor(bucket, leaf_bucket) {
                    return Err(OramError::BlockNotOnPath { address });
                }
            }
        }
        for (address, entry) in self.position_map.iter().enumerate() {
            if entry.is_some() && !seen.contains(&(address as Address)) {
                return Err(OramError::BlockNotOnPath {
                    address: address as Address,
                });
            }
        }
        Ok(())
    }

    /// First write to an empty logical block: claim a random dummy slot
    /// anywhere below the root, commit the block to a random leaf below that
    /// slot's bucket, and record the mapping.
    fn initialize_block<R: RngCore + CryptoRng>(
        &mut self,
        address: Address,
        rng: &mut R,
    ) -> Result<(), OramError> {
        let total_buckets = self.total_leaves * 2 - 1;
        loop {
            let bucket = rng.gen_range(1..total_buckets) as BucketIndex;
            let slot = rng.gen_range(0..self.wrapper.blocks_per_bucket());
            if !self.wrapper.is_dummy(bucket, slot)? {
                continue;
            }

            // Random walk down to a leaf, so the tree invariant holds from
            // the moment the block exists.
            let mut at = bucket;
            while tree::children(at).1 < total_buckets as BucketIndex {
                let (left, right) = tree::children(at);
                at = if rng.gen::<bool>() { right } else { left };
            }
            let leaf = (at - tree::first_leaf(self.wrapper.levels())) as Leaf;
            debug_assert!(tree::is_ancestor(bucket, at));

            let chunks = vec![BigUint::zero(); self.wrapper.chunks_per_block()];
            self.wrapper.set_block(
                bucket,
                slot,
                &Block {
                    address,
                    leaf_target: leaf,
                    chunks,
                },
                rng,
            )?;
            self.position_map[address as usize] = Some(leaf);
            return Ok(());
        }
    }

    /// One parent-to-children eviction step: every live block in `source`
    /// moves into whichever child subtree contains its target leaf.
    fn push<R: RngCore + CryptoRng>(
        &mut self,
        source: BucketIndex,
        rng: &mut R,
    ) -> Result<(), OramError> {
        let children = tree::children(source);
        let children = [children.0, children.1];
        let mut next_slot = [0usize, 0usize];

        for slot in 0..self.wrapper.blocks_per_bucket() {
            if self.wrapper.is_dummy(source, slot)? {
                continue;
            }
            let (address, leaf_target) = self.wrapper.get_metadata(source, slot)?;
            let target_bucket = tree::leaf_bucket(leaf_target, self.wrapper.levels());

            // Exactly one child subtree contains the target leaf; anything
            // else means the stored metadata is garbage.
            let in_left = tree::is_ancestor(children[0], target_bucket);
            let in_right = tree::is_ancestor(children[1], target_bucket);
            if in_left == in_right {
                return Err(OramError::MetadataCorrupted { bucket: source });
            }
            let side = usize::from(in_right);
            let child = children[side];

            while next_slot[side] < self.wrapper.blocks_per_bucket()
                && !self.wrapper.is_dummy(child, next_slot[side])?
            {
                next_slot[side] += 1;
            }
            if next_slot[side] == self.wrapper.blocks_per_bucket() {
                return Err(OramError::EvictionOverflow { bucket: child });
            }

            let bucket_ids = [source, child];
            let mut select_vector = vec![vec![0u8; self.wrapper.blocks_per_bucket()]; 2];
            select_vector[0][slot] = 1;
            let chunks = self.wrapper.select_block(&bucket_ids, &select_vector, rng)?;

            self.wrapper.set_block(
                child,
                next_slot[side],
                &Block {
                    address,
                    leaf_target,
                    chunks,
                },
                rng,
            )?;
            next_slot[side] += 1;
            self.wrapper.invalidate(source, slot)?;
        }
        Ok(())
    }

    /// Pushes every non-leaf bucket on the path to `leaf`, root first.
    fn evict_along_path<R: RngCore + CryptoRng>(
        &mut self,
        leaf: Leaf,
        rng: &mut R,
    ) -> Result<(), OramError> {
        log::debug!("evicting along leaf {leaf}");
        let path = tree::path_to_leaf(leaf, self.wrapper.levels());
        for &source in &path[..path.len() - 1] {
            self.push(source, rng)?;
        }
        Ok(())
    }
}
