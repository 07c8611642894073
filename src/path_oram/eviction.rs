// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Greedy Path ORAM eviction.

use super::{
    path_oram_block::PathOramBlock, stash::Stash, tree_index::CompleteBinaryTreeIndex, TreeIndex,
};
use crate::{Address, BucketSize};

/// Removes from `stash` the blocks to be written to the path to the leaf `position`.
///
/// Returns, for each depth from the root (0) to the leaf, the at most `bucket_size` blocks
/// assigned to that bucket. A block may be placed in a bucket only if the bucket lies on
/// the path to the block's own leaf. Buckets are filled from the leaf up; among the eligible
/// blocks, those that could have been placed deepest go first, and ties go to the lowest address.
/// Blocks that fit nowhere remain in the stash.
pub(crate) fn evict_path(
    stash: &mut Stash,
    position: TreeIndex,
    bucket_size: BucketSize,
) -> Vec<Vec<PathOramBlock>> {
    let levels = position.depth() as usize + 1;

    // candidates[d] holds the blocks whose deepest legal bucket on this path is at depth d,
    // sorted so that `pop` yields the lowest address.
    let mut candidates: Vec<Vec<Address>> = vec![Vec::new(); levels];
    for block in stash.iter() {
        let deepest = block.position.common_ancestor_depth(position) as usize;
        candidates[deepest].push(block.address);
    }
    for level in &mut candidates {
        level.sort_unstable_by(|a, b| b.cmp(a));
    }

    let mut assignments: Vec<Vec<PathOramBlock>> = (0..levels).map(|_| Vec::new()).collect();
    for depth in (0..levels).rev() {
        let bucket = &mut assignments[depth];
        for source in candidates[depth..].iter_mut().rev() {
            while bucket.len() < bucket_size {
                let Some(address) = source.pop() else {
                    break;
                };
                if let Some(block) = stash.remove(address) {
                    bucket.push(block);
                }
            }
        }
    }

    assignments
}
