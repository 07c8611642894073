// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Arithmetic on a complete binary tree stored as a flat, level-order array.

use super::{TreeHeight, TreeIndex};
use crate::Address;
use rand::{CryptoRng, Rng, RngCore};

pub(crate) trait CompleteBinaryTreeIndex
where
    Self: Sized,
{
    fn node_on_path(&self, depth: TreeHeight, height: TreeHeight) -> Self;
    fn random_leaf<R: RngCore + CryptoRng>(tree_height: TreeHeight, rng: &mut R) -> Self;
    fn depth(&self) -> TreeHeight;
    fn is_leaf(&self, height: TreeHeight) -> bool;
    fn common_ancestor_depth(&self, other: Self) -> TreeHeight;
    fn storage_address(&self) -> Address;
}

impl CompleteBinaryTreeIndex for TreeIndex {
    // A TreeIndex can have any nonzero value.
    fn node_on_path(&self, depth: TreeHeight, height: TreeHeight) -> Self {
        // We only call this method when the receiver is a leaf.
        debug_assert!(self.is_leaf(height));
        debug_assert!(depth <= height);

        let shift = height - depth;
        self >> shift
    }

    fn random_leaf<R: RngCore + CryptoRng>(tree_height: TreeHeight, rng: &mut R) -> Self {
        let first_leaf = 1u64 << tree_height;
        rng.gen_range(first_leaf..(2 * first_leaf))
    }

    fn depth(&self) -> TreeHeight {
        // We maintain the invariant that all TreeIndex values are nonzero.
        debug_assert_ne!(*self, 0);

        TreeIndex::BITS - self.leading_zeros() - 1
    }

    fn is_leaf(&self, height: TreeHeight) -> bool {
        *self != 0 && self.depth() == height
    }

    // Both receiver and `other` must be leaves of the same tree.
    fn common_ancestor_depth(&self, other: Self) -> TreeHeight {
        debug_assert_eq!(self.depth(), other.depth());

        let differing_bits = TreeIndex::BITS - (self ^ other).leading_zeros();
        self.depth() - differing_bits
    }

    fn storage_address(&self) -> Address {
        debug_assert_ne!(*self, 0);
        self - 1
    }
}

/// The number of leaves of a tree of height `height`.
pub(crate) fn leaf_count(height: TreeHeight) -> u64 {
    1u64 << height
}

/// The number of buckets in a tree of height `height`.
pub(crate) fn node_count(height: TreeHeight) -> u64 {
    2 * leaf_count(height) - 1
}
