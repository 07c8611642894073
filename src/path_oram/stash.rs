// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The client-resident Path ORAM stash.

use super::{
    bucket::{Bucket, BucketLayout},
    eviction::evict_path,
    path_oram_block::PathOramBlock,
    tree_index::CompleteBinaryTreeIndex,
    TreeIndex,
};
use crate::{database::Database, encryption::SlotCipher, Address, OramError, StashSize};
use rand::{CryptoRng, RngCore};
use std::collections::HashMap;

/// Decrypted blocks held by the client, keyed by address.
///
/// Holds the blocks of the path being accessed, plus any earlier blocks that could not be evicted.
#[derive(Debug, Default)]
pub(crate) struct Stash {
    blocks: HashMap<Address, PathOramBlock>,
}

impl Stash {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of real blocks in the stash.
    pub fn occupancy(&self) -> StashSize {
        self.blocks.len() as StashSize
    }

    pub fn get(&self, address: Address) -> Option<&PathOramBlock> {
        self.blocks.get(&address)
    }

    /// Inserts `block`, replacing any stale copy with the same address.
    pub fn insert(&mut self, block: PathOramBlock) {
        self.blocks.insert(block.address, block);
    }

    pub fn remove(&mut self, address: Address) -> Option<PathOramBlock> {
        self.blocks.remove(&address)
    }

    /// Moves the block at `address` to `new_position`. Returns false if there is no such block.
    pub fn set_position(&mut self, address: Address, new_position: TreeIndex) -> bool {
        match self.blocks.get_mut(&address) {
            Some(block) => {
                block.position = new_position;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathOramBlock> {
        self.blocks.values()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// Reads every bucket on the path to the leaf `position` into the stash.
    ///
    /// The whole path is fetched and authenticated before any block is merged,
    /// so on error the stash is left exactly as it was.
    /// A block found off the path to its own leaf is reported as an `EncryptionError`.
    pub fn read_from_path<C: SlotCipher, T: Database<Bucket>>(
        &mut self,
        physical_memory: &mut T,
        cipher: &C,
        layout: &BucketLayout,
        position: TreeIndex,
    ) -> Result<(), OramError> {
        let height = position.depth();

        let mut fetched = Vec::new();
        for depth in 0..=height {
            let node = position.node_on_path(depth, height);
            let bucket = physical_memory.read_db(node.storage_address())?;
            for block in bucket.open(node, layout, cipher)? {
                // A real block always lies on the path to its own leaf.
                if !block.position.is_leaf(height)
                    || block.position.node_on_path(depth, height) != node
                {
                    return Err(OramError::EncryptionError);
                }
                fetched.push(block);
            }
        }

        for block in fetched {
            self.insert(block);
        }
        Ok(())
    }

    /// Evicts blocks from the stash to the path to the leaf `position`, padding with fresh dummies.
    ///
    /// All buckets are sealed before the first write is issued.
    /// If a write fails, the path may be partially written and the tree must be considered inconsistent.
    pub fn write_to_path<C: SlotCipher, T: Database<Bucket>, R: RngCore + CryptoRng>(
        &mut self,
        physical_memory: &mut T,
        cipher: &C,
        layout: &BucketLayout,
        position: TreeIndex,
        rng: &mut R,
    ) -> Result<(), OramError> {
        let height = position.depth();
        let assignments = evict_path(self, position, layout.bucket_size);

        let mut sealed = Vec::with_capacity(assignments.len());
        for depth in (0..=height).rev() {
            let node = position.node_on_path(depth, height);
            let blocks = &assignments[usize::try_from(depth)?];
            sealed.push((node, Bucket::seal(blocks, node, layout, cipher, rng)?));
        }

        for (node, bucket) in sealed {
            physical_memory.write_db(node.storage_address(), bucket)?;
        }
        Ok(())
    }
}
