// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Configuration of a Path ORAM instance.

use super::{
    TreeHeight, DEFAULT_BLOCKS_PER_BUCKET, DEFAULT_BLOCK_SIZE, DEFAULT_STASH_OVERFLOW_SIZE,
    MAXIMUM_TREE_HEIGHT,
};
use crate::{Address, BlockSize, BucketSize, OramError, StashSize};

/// The parameters of a [`PathOram`](super::PathOram).
///
/// - `block_capacity`: the number of addresses. Addresses run from 0 to `block_capacity - 1`.
///     The tree has `block_capacity.next_power_of_two()` leaves.
/// - `bucket_size`: the parameter Z, the number of slots per bucket. Must be at least 1.
///     Along with the overflow size, this value affects the probability of stash overflow
///     and should be set with care.
/// - `block_size`: the maximum payload length in bytes. Every slot is padded to this length.
/// - `stash_overflow_size`: the number of blocks the stash may hold after an access.
///     Exceeding it fails the access and the instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathOramParameters {
    /// The number of addresses.
    pub block_capacity: Address,
    /// The number of slots per bucket.
    pub bucket_size: BucketSize,
    /// The maximum payload length in bytes.
    pub block_size: BlockSize,
    /// The maximum stash occupancy between accesses.
    pub stash_overflow_size: StashSize,
}

impl PathOramParameters {
    /// Default parameters for an ORAM of `block_capacity` addresses.
    pub fn new(block_capacity: Address) -> Self {
        Self {
            block_capacity,
            bucket_size: DEFAULT_BLOCKS_PER_BUCKET,
            block_size: DEFAULT_BLOCK_SIZE,
            stash_overflow_size: DEFAULT_STASH_OVERFLOW_SIZE,
        }
    }

    /// Sets the number of slots per bucket.
    pub fn with_bucket_size(mut self, bucket_size: BucketSize) -> Self {
        self.bucket_size = bucket_size;
        self
    }

    /// Sets the maximum payload length in bytes.
    pub fn with_block_size(mut self, block_size: BlockSize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Sets the maximum stash occupancy between accesses.
    pub fn with_stash_overflow_size(mut self, stash_overflow_size: StashSize) -> Self {
        self.stash_overflow_size = stash_overflow_size;
        self
    }

    /// Checks the parameters, returning an `InvalidConfigurationError` describing the first problem found.
    pub fn validate(&self) -> Result<(), OramError> {
        if self.block_capacity == 0 {
            return Err(OramError::InvalidConfigurationError(
                "block capacity must be positive",
            ));
        }

        if self.bucket_size < 1 {
            return Err(OramError::InvalidConfigurationError(
                "bucket size must be at least 1",
            ));
        }

        if self.block_size == 0 {
            return Err(OramError::InvalidConfigurationError(
                "block size must be positive",
            ));
        }

        if u32::try_from(self.block_size).is_err() {
            return Err(OramError::InvalidConfigurationError(
                "block size must fit in 32 bits",
            ));
        }

        self.tree_height()?;
        Ok(())
    }

    /// The depth of the leaf level of the tree these parameters describe.
    pub(crate) fn tree_height(&self) -> Result<TreeHeight, OramError> {
        let number_of_leaves = self.block_capacity.checked_next_power_of_two().ok_or(
            OramError::InvalidConfigurationError("block capacity is too large"),
        )?;
        let height = number_of_leaves.ilog2();
        if height > MAXIMUM_TREE_HEIGHT {
            return Err(OramError::InvalidConfigurationError(
                "block capacity is too large",
            ));
        }
        Ok(height)
    }
}
