// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! An encrypted Path ORAM which is generic over its backing store and slot cipher.

use super::{
    bucket::{Bucket, BucketLayout},
    parameters::PathOramParameters,
    path_oram_block::PathOramBlock,
    position_map::PositionMap,
    stash::Stash,
    tree_index::{leaf_count, node_count, CompleteBinaryTreeIndex},
    TreeHeight, TreeIndex,
};
use crate::{
    database::{Database, SimpleDatabase},
    encryption::{SlotCipher, XChaCha20Poly1305Cipher},
    Address, BlockSize, BucketSize, Oram, OramError, Operation, StashSize,
};
use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeLess;

#[cfg(test)]
use super::bucket::associated_data;

/// A Path ORAM over an untrusted `Database` of encrypted buckets.
///
/// ## Security
///
/// Every access reads and then writes exactly the H buckets on one root-to-leaf path,
/// where H is the number of levels of the tree. The path is that of the accessed block's
/// previous leaf, which was chosen uniformly at random and never revealed before;
/// the block is then moved to a fresh uniformly random leaf. Every slot written,
/// real or dummy, is freshly encrypted, so bucket contents never repeat and occupancy is hidden.
///
/// The stash and position map live only in this handle.
/// If the stash outgrows `stash_overflow_size`, the access fails with `StashOverflowError`.
/// With Z = 4 and the default overflow size this happens with negligible probability.
///
/// ## Failures
///
/// Failures while reading or decrypting a path leave the handle unchanged.
/// Failures while writing a path back, and stash overflows, leave the handle poisoned:
/// every later access fails with `InconsistentStateError`, and the caller must
/// [`teardown`](PathOram::teardown) and reinitialize.
#[derive(Debug)]
pub struct PathOram<DB: Database<Bucket>, C: SlotCipher> {
    // The fields below are not meant to be exposed to clients. They are visible to the crate for testing purposes.
    /// The underlying untrusted memory that the ORAM is obliviously accessing on behalf of its client.
    pub(crate) physical_memory: DB,
    /// The Path ORAM stash.
    pub(crate) stash: Stash,
    /// The Path ORAM position map.
    pub(crate) position_map: PositionMap,
    cipher: C,
    /// The height of the Path ORAM tree data structure.
    pub(crate) height: TreeHeight,
    layout: BucketLayout,
    block_capacity: Address,
    stash_overflow_size: StashSize,
    poisoned: bool,
}

/// A snapshot of the shape and state of a [`PathOram`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OramStats {
    /// The number of levels of the tree, which is the number of buckets on every path.
    pub height: u64,
    /// The number of leaves of the tree.
    pub num_leaves: u64,
    /// The number of slots per bucket.
    pub bucket_capacity: BucketSize,
    /// The number of blocks currently in the stash.
    pub stash_size: StashSize,
    /// The number of buckets in the tree.
    pub total_buckets: u64,
}

/// An `Oram` suitable for most use cases: default parameters, in-memory storage, and XChaCha20-Poly1305.
pub type DefaultOram = PathOram<SimpleDatabase<Bucket>, XChaCha20Poly1305Cipher>;

impl DefaultOram {
    /// Returns a new in-memory ORAM with `block_capacity` empty addresses,
    /// default parameters, and a fresh random key.
    pub fn new<R: RngCore + CryptoRng>(
        block_capacity: Address,
        rng: &mut R,
    ) -> Result<Self, OramError> {
        Self::new_in_memory(PathOramParameters::new(block_capacity), rng)
    }

    /// Returns a new in-memory ORAM with the given parameters and a fresh random key.
    pub fn new_in_memory<R: RngCore + CryptoRng>(
        parameters: PathOramParameters,
        rng: &mut R,
    ) -> Result<Self, OramError> {
        parameters.validate()?;
        let number_of_buckets = node_count(parameters.tree_height()?);
        let physical_memory = SimpleDatabase::new(number_of_buckets)?;
        let cipher = XChaCha20Poly1305Cipher::random(rng);
        Self::new_with_parameters(parameters, physical_memory, cipher, rng)
    }
}

impl<DB: Database<Bucket>, C: SlotCipher> PathOram<DB, C> {
    /// Returns a new `PathOram` with `parameters.block_capacity` empty addresses,
    /// storing its tree in the first buckets of `physical_memory`.
    ///
    /// Every bucket of the tree is overwritten with freshly encrypted dummies.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidConfigurationError`, before touching `physical_memory`, in the following cases.
    ///
    /// - The parameters are invalid (see [`PathOramParameters::validate`]).
    /// - `physical_memory` has fewer than `2 * block_capacity.next_power_of_two() - 1` buckets.
    pub fn new_with_parameters<R: RngCore + CryptoRng>(
        parameters: PathOramParameters,
        mut physical_memory: DB,
        cipher: C,
        rng: &mut R,
    ) -> Result<Self, OramError> {
        log::info!(
            "PathOram::new(capacity = {}, Z = {}, B = {})",
            parameters.block_capacity,
            parameters.bucket_size,
            parameters.block_size,
        );

        parameters.validate()?;
        let height = parameters.tree_height()?;

        let number_of_buckets = node_count(height);
        if physical_memory.capacity()? < number_of_buckets {
            return Err(OramError::InvalidConfigurationError(
                "backing store is too small for the tree",
            ));
        }

        let layout = BucketLayout {
            bucket_size: parameters.bucket_size,
            block_size: parameters.block_size,
        };

        for node in 1..=number_of_buckets {
            let bucket = Bucket::seal(&[], node, &layout, &cipher, rng)?;
            physical_memory.write_db(node.storage_address(), bucket)?;
        }

        Ok(Self {
            physical_memory,
            stash: Stash::new(),
            position_map: PositionMap::new(parameters.block_capacity)?,
            cipher,
            height,
            layout,
            block_capacity: parameters.block_capacity,
            stash_overflow_size: parameters.stash_overflow_size,
            poisoned: false,
        })
    }

    /// Returns the shape of the tree and the current stash size.
    pub fn stats(&self) -> OramStats {
        OramStats {
            height: u64::from(self.height) + 1,
            num_leaves: leaf_count(self.height),
            bucket_capacity: self.layout.bucket_size,
            stash_size: self.stash.occupancy(),
            total_buckets: node_count(self.height),
        }
    }

    /// The maximum payload length in bytes.
    pub fn block_size(&self) -> BlockSize {
        self.layout.block_size
    }

    /// The untrusted store holding the tree.
    pub fn backing_store(&self) -> &DB {
        &self.physical_memory
    }

    /// Whether an earlier failure has left this ORAM unusable.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Destroys the ORAM, wiping the client state, and returns the backing store.
    pub fn teardown(mut self) -> DB {
        log::info!(
            "PathOram::teardown(stash_size = {}, poisoned = {})",
            self.stash.occupancy(),
            self.poisoned
        );
        self.stash.clear();
        self.physical_memory
    }

    fn poison(&mut self, error: &OramError) {
        log::error!("PathOram poisoned: {}", error);
        self.poisoned = true;
    }

    #[cfg(test)]
    pub(crate) fn position_of(&self, address: Address) -> Option<TreeIndex> {
        self.position_map.get(address).unwrap()
    }

    /// Returns the node and slot index holding the block at `address`, if it is in the tree.
    #[cfg(test)]
    pub(crate) fn locate_block(&mut self, address: Address) -> Option<(TreeIndex, usize)> {
        for node in 1..=node_count(self.height) {
            let bucket = self.physical_memory.read_db(node.storage_address()).unwrap();
            for (slot_index, slot) in bucket.slots.iter().enumerate() {
                let ad = associated_data(node, slot_index).unwrap();
                let plaintext = self.cipher.decrypt(slot, &ad).unwrap();
                let block = PathOramBlock::decode(&plaintext, self.layout.block_size).unwrap();
                if block.map(|block| block.address) == Some(address) {
                    return Some((node, slot_index));
                }
            }
        }
        None
    }

    /// Decrypts the whole tree, checks that every block in it lies on the path to its assigned leaf
    /// and that tree and stash together hold exactly the live blocks, and returns the number of blocks in the tree.
    #[cfg(test)]
    pub(crate) fn check_tree_invariants(&mut self) -> u64 {
        let mut tree_occupancy = 0;
        for node in 1..=node_count(self.height) {
            let bucket = self.physical_memory.read_db(node.storage_address()).unwrap();
            for block in bucket.open(node, &self.layout, &self.cipher).unwrap() {
                let position = self.position_map.get(block.address).unwrap();
                assert_eq!(position, Some(block.position), "{block:?}");
                assert_eq!(block.position.node_on_path(node.depth(), self.height), node);
                assert!(self.stash.get(block.address).is_none());
                tree_occupancy += 1;
            }
        }
        for block in self.stash.iter() {
            assert_eq!(
                self.position_map.get(block.address).unwrap(),
                Some(block.position)
            );
        }
        assert_eq!(
            tree_occupancy + self.stash.occupancy(),
            self.position_map.assigned_count()
        );
        tree_occupancy
    }
}

impl<DB: Database<Bucket>, C: SlotCipher> Oram for PathOram<DB, C> {
    fn access<R: RngCore + CryptoRng>(
        &mut self,
        operation: Operation,
        address: Address,
        rng: &mut R,
    ) -> Result<Option<Vec<u8>>, OramError> {
        if self.poisoned {
            return Err(OramError::InconsistentStateError);
        }

        // This operation is not constant-time, but only leaks whether the ORAM index is well-formed or not.
        if !bool::from(address.ct_lt(&self.block_capacity)) {
            return Err(OramError::AddressOutOfBoundsError);
        }

        if let Operation::Write(value) = &operation {
            if value.len() > self.layout.block_size {
                return Err(OramError::PayloadTooLargeError {
                    length: value.len(),
                    block_size: self.layout.block_size,
                });
            }
        }

        // An address with no block is still accessed along a uniformly random path.
        let position = match self.position_map.get(address)? {
            Some(position) => position,
            None => TreeIndex::random_leaf(self.height, rng),
        };
        let new_position = TreeIndex::random_leaf(self.height, rng);
        debug_assert!(position.is_leaf(self.height));

        self.stash
            .read_from_path(&mut self.physical_memory, &self.cipher, &self.layout, position)?;

        let result = self.stash.get(address).map(|block| block.value.clone());

        match operation {
            Operation::Read => {
                if self.stash.set_position(address, new_position) {
                    self.position_map.set(address, new_position)?;
                }
            }
            Operation::Write(value) => {
                self.stash
                    .insert(PathOramBlock::new(address, new_position, value));
                self.position_map.set(address, new_position)?;
            }
            Operation::Delete => {
                self.stash.remove(address);
                self.position_map.clear(address)?;
            }
        }

        // Evict blocks from the stash into the path that was just read.
        if let Err(error) = self.stash.write_to_path(
            &mut self.physical_memory,
            &self.cipher,
            &self.layout,
            position,
            rng,
        ) {
            self.poison(&error);
            return Err(error);
        }

        let occupancy = self.stash.occupancy();
        log::debug!("PathOram::access -- stash size {}", occupancy);
        if occupancy > self.stash_overflow_size {
            let error = OramError::StashOverflowError {
                occupancy,
                bound: self.stash_overflow_size,
            };
            log::warn!("{}", error);
            self.poison(&error);
            return Err(error);
        }

        Ok(result)
    }

    fn block_capacity(&self) -> Result<Address, OramError> {
        Ok(self.block_capacity)
    }
}
