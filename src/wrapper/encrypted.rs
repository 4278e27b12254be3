// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The encrypted store.
//!
//! Every cell the server holds is a ciphertext. Metadata (addresses and
//! leaf targets) carries a single onion layer over plaintext space 1; a
//! block's chunks live at plaintext space `root_plain_space` and gain one
//! layer per tree level, so a bucket `d` edges below the root stores chunks
//! under `d + 1` layers. Path reads go through a homomorphic select, which
//! means the store hands back the requested block without ever learning
//! which slot it came from.

use crate::crypto::keys::{PrivateKey, PublicKey};
use crate::crypto::{homomorphic, Payload};
use crate::server::{Server, StoredBlock};
use crate::wrapper::{Block, ServerWrapper};
use crate::{tree, Address, BucketIndex, CryptoError, Leaf, OramError, TreeHeight};
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use rand::{CryptoRng, RngCore};

/// A wrapper that stores only ciphertexts.
#[derive(Debug)]
pub struct EncServerWrapper {
    server: Server,
    root_plain_space: u32,
    public: PublicKey,
    private: PrivateKey,
}

impl EncServerWrapper {
    /// Builds an all-dummy encrypted store whose chunks decode into
    /// `ℤ_{n^{root_plain_space}}`.
    pub fn new(
        levels: TreeHeight,
        blocks_per_bucket: usize,
        chunks_per_block: usize,
        root_plain_space: u32,
        public: PublicKey,
        private: PrivateKey,
    ) -> Result<Self, OramError> {
        if root_plain_space == 0 {
            return Err(OramError::InvalidParameters {
                context: "chunks need a nonzero plaintext space",
            });
        }
        Ok(Self {
            server: Server::new(levels, blocks_per_bucket, chunks_per_block)?,
            root_plain_space,
            public,
            private,
        })
    }

    /// The underlying store, exposed for instrumentation.
    pub fn server(&self) -> &Server {
        &self.server
    }

    /// The public key the store encrypts under.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// How many onion layers a bucket's chunks carry.
    fn onion_layers(bucket: BucketIndex) -> u32 {
        tree::depth(bucket) + 1
    }

    fn encrypt_metadata<R: RngCore + CryptoRng>(&self, value: u64, rng: &mut R) -> BigUint {
        Payload::new(BigUint::from(value), &self.public, 1, 1)
            .lift_once(rng)
            .into_value()
    }

    fn decrypt_metadata(&self, cell: &BigUint, bucket: BucketIndex) -> Result<u64, OramError> {
        Payload::new(cell.clone(), &self.public, 1, 2)
            .get_plaintext(&self.private)?
            .to_u64()
            .ok_or(OramError::MetadataCorrupted { bucket })
    }
}

impl ServerWrapper for EncServerWrapper {
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
                    Some(ciphertext) => Some(self.decrypt_metadata(ciphertext, bucket)?),
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
        rng: &mut R,
    ) -> Result<(), OramError> {
        let cells: Vec<Vec<Option<BigUint>>> = addresses
            .iter()
            .map(|row| {
                row.iter()
                    .map(|address| address.map(|a| self.encrypt_metadata(a, rng)))
                    .collect()
            })
            .collect();
        self.server.set_addresses(bucket_ids, &cells)
    }

    fn select_block<R: RngCore + CryptoRng>(
        &mut self,
        bucket_ids: &[BucketIndex],
        select_vector: &[Vec<u8>],
        rng: &mut R,
    ) -> Result<Vec<BigUint>, OramError> {
        if bucket_ids.is_empty()
            || select_vector.len() != bucket_ids.len()
            || select_vector
                .iter()
                .any(|row| row.len() != self.blocks_per_bucket())
        {
            return Err(OramError::InvalidParameters {
                context: "select vector does not match the bucket list",
            });
        }

        let deepest = bucket_ids
            .iter()
            .map(|&bucket| Self::onion_layers(bucket))
            .max()
            .unwrap_or(0);
        let max_onion_layers = self.root_plain_space + deepest;

        // Dummy slots are skipped outright; their select-vector entries must
        // be 0 so the one-hot property survives the skip.
        let mut selectors = Vec::new();
        for (&bucket, row) in bucket_ids.iter().zip(select_vector) {
            for (slot, &bit) in row.iter().enumerate() {
                if bit > 1 {
                    return Err(OramError::Crypto(CryptoError::NonBinarySelector));
                }
                if self.server.peek(bucket, slot)?.is_dummy() {
                    if bit == 1 {
                        return Err(OramError::MalformedSelectVector);
                    }
                    continue;
                }
                let selector =
                    Payload::new(BigUint::from(bit), &self.public, max_onion_layers, max_onion_layers)
                        .lift_once(rng);
                selectors.push(selector);
            }
        }

        let mut selected_chunks = Vec::with_capacity(self.chunks_per_block());
        for chunk_index in 0..self.chunks_per_block() {
            let mut payloads = Vec::with_capacity(selectors.len());
            for &bucket in bucket_ids {
                let layers = Self::onion_layers(bucket);
                for slot in 0..self.blocks_per_bucket() {
                    let stored = self.server.peek(bucket, slot)?;
                    if stored.is_dummy() {
                        continue;
                    }
                    let cell = stored
                        .chunks
                        .get(chunk_index)
                        .cloned()
                        .ok_or(OramError::MetadataCorrupted { bucket })?;
                    payloads.push(Payload::new(
                        cell,
                        &self.public,
                        self.root_plain_space,
                        self.root_plain_space + layers,
                    ));
                }
            }
            let merged = homomorphic::select(payloads, &selectors, rng)?;
            selected_chunks.push(merged.get_plaintext(&self.private)?);
        }
        for &bucket in bucket_ids {
            self.server.record_read(bucket);
        }
        Ok(selected_chunks)
    }

    fn is_dummy(&self, bucket: BucketIndex, slot: usize) -> Result<bool, OramError> {
        Ok(self.server.peek(bucket, slot)?.is_dummy())
    }

    fn get_block(&mut self, bucket: BucketIndex, slot: usize) -> Result<Block, OramError> {
        let stored = self.server.get_block(bucket, slot)?;
        if stored.is_dummy() {
            return Err(OramError::EmptySlot { bucket, slot });
        }
        let address_cell = stored
            .address
            .as_ref()
            .ok_or(OramError::EmptySlot { bucket, slot })?;
        let leaf_cell = stored
            .leaf_target
            .as_ref()
            .ok_or(OramError::MetadataCorrupted { bucket })?;
        let address = self.decrypt_metadata(address_cell, bucket)?;
        let leaf_target = self.decrypt_metadata(leaf_cell, bucket)?;

        let layers = Self::onion_layers(bucket);
        let mut chunks = Vec::with_capacity(stored.chunks.len());
        for cell in &stored.chunks {
            let plaintext = Payload::new(
                cell.clone(),
                &self.public,
                self.root_plain_space,
                self.root_plain_space + layers,
            )
            .get_plaintext(&self.private)?;
            chunks.push(plaintext);
        }
        Ok(Block {
            address,
            leaf_target,
            chunks,
        })
    }

    fn get_metadata(
        &mut self,
        bucket: BucketIndex,
        slot: usize,
    ) -> Result<(Address, Leaf), OramError> {
        let (address_cell, leaf_cell) = {
            let stored = self.server.peek(bucket, slot)?;
            if stored.is_dummy() {
                return Err(OramError::EmptySlot { bucket, slot });
            }
            let address = stored
                .address
                .clone()
                .ok_or(OramError::EmptySlot { bucket, slot })?;
            let leaf = stored
                .leaf_target
                .clone()
                .ok_or(OramError::MetadataCorrupted { bucket })?;
            (address, leaf)
        };
        self.server.record_read(bucket);
        let address = self.decrypt_metadata(&address_cell, bucket)?;
        let leaf_target = self.decrypt_metadata(&leaf_cell, bucket)?;
        Ok((address, leaf_target))
    }

    fn set_block<R: RngCore + CryptoRng>(
        &mut self,
        bucket: BucketIndex,
        slot: usize,
        block: &Block,
        rng: &mut R,
    ) -> Result<(), OramError> {
        let layers = Self::onion_layers(bucket);
        let chunks = block
            .chunks
            .iter()
            .map(|chunk| {
                Payload::new(
                    chunk.clone(),
                    &self.public,
                    self.root_plain_space,
                    self.root_plain_space,
                )
                .lift_by(layers, rng)
                .into_value()
            })
            .collect();
        self.server.set_block(
            bucket,
            slot,
            StoredBlock {
                address: Some(self.encrypt_metadata(block.address, rng)),
                leaf_target: Some(self.encrypt_metadata(block.leaf_target, rng)),
                chunks,
            },
        )
    }

    fn invalidate(&mut self, bucket: BucketIndex, slot: usize) -> Result<(), OramError> {
        self.server.invalidate(bucket, slot)
    }
}
