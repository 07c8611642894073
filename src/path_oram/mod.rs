// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! An encrypted Path ORAM.

use crate::{BlockSize, BucketSize, StashSize};

/// The 1-based heap index of a node of the bucket tree. The root is 1; the children of `n` are `2n` and `2n + 1`.
pub type TreeIndex = u64;
/// The depth of the leaf level of the bucket tree. A tree of height `h` has `h + 1` levels.
pub type TreeHeight = u32;

/// The parameter "Z" from the Path ORAM literature that sets the number of blocks per bucket; typical values are 3 or 4.
/// Here we adopt the more conservative setting of 4.
pub const DEFAULT_BLOCKS_PER_BUCKET: BucketSize = 4;

/// The default maximum payload size of a block, in bytes.
pub const DEFAULT_BLOCK_SIZE: BlockSize = 4096;

/// The default number of blocks the stash may hold between accesses before the access fails.
///
/// With Z = 4, experiments from the [original Path ORAM paper](https://eprint.iacr.org/2013/280.pdf)
/// indicate that the probability of overflow is independent of the number N of blocks stored.
/// The authors conservatively estimate that 89 blocks suffices for 2^{-80} overflow probability.
pub const DEFAULT_STASH_OVERFLOW_SIZE: StashSize = 89;

const MAXIMUM_TREE_HEIGHT: TreeHeight = 62;

pub mod bucket;
pub(crate) mod eviction;
pub mod generic_path_oram;
pub mod parameters;
pub(crate) mod path_oram_block;
pub(crate) mod position_map;
pub(crate) mod stash;
pub(crate) mod tree_index;

pub use bucket::Bucket;
pub use generic_path_oram::{DefaultOram, OramStats, PathOram};
pub use parameters::PathOramParameters;
