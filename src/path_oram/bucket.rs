// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A Path ORAM bucket as it is stored in untrusted memory.

use super::{path_oram_block::PathOramBlock, TreeIndex};
use crate::{encryption::SlotCipher, BlockSize, BucketSize, OramError};
use rand::{CryptoRng, RngCore};

/// A Path ORAM bucket: exactly Z encrypted slots of identical length, real or dummy.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Bucket {
    /// The ciphertext of each slot.
    pub slots: Vec<Vec<u8>>,
}

impl std::fmt::Debug for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bucket({} slots)", self.slots.len())
    }
}

/// The shape every bucket of one ORAM shares.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BucketLayout {
    pub bucket_size: BucketSize,
    pub block_size: BlockSize,
}

// Binds a slot ciphertext to the position it was written to.
pub(crate) fn associated_data(node: TreeIndex, slot_index: usize) -> Result<[u8; 16], OramError> {
    let mut result = [0u8; 16];
    result[..8].copy_from_slice(&node.to_le_bytes());
    result[8..].copy_from_slice(&u64::try_from(slot_index)?.to_le_bytes());
    Ok(result)
}

impl Bucket {
    /// Encrypts `blocks` into the bucket at `node`, filling the remaining slots with fresh dummies.
    pub(crate) fn seal<C: SlotCipher, R: RngCore + CryptoRng>(
        blocks: &[PathOramBlock],
        node: TreeIndex,
        layout: &BucketLayout,
        cipher: &C,
        rng: &mut R,
    ) -> Result<Self, OramError> {
        assert!(blocks.len() <= layout.bucket_size);

        let mut slots = Vec::with_capacity(layout.bucket_size);
        for slot_index in 0..layout.bucket_size {
            let plaintext = match blocks.get(slot_index) {
                Some(block) => block.encode(layout.block_size)?,
                None => PathOramBlock::encode_dummy(layout.block_size),
            };
            let ad = associated_data(node, slot_index)?;
            slots.push(cipher.encrypt(&plaintext, &ad, rng)?);
        }

        Ok(Self { slots })
    }

    /// Decrypts the bucket read from `node`, returning its real blocks.
    ///
    /// Fails with `EncryptionError` if any slot fails authentication,
    /// or if the bucket does not have exactly the expected shape.
    pub(crate) fn open<C: SlotCipher>(
        &self,
        node: TreeIndex,
        layout: &BucketLayout,
        cipher: &C,
    ) -> Result<Vec<PathOramBlock>, OramError> {
        if self.slots.len() != layout.bucket_size {
            return Err(OramError::EncryptionError);
        }

        let ciphertext_len = cipher.ciphertext_len(PathOramBlock::encoded_len(layout.block_size));
        let mut result = Vec::new();
        for (slot_index, slot) in self.slots.iter().enumerate() {
            if slot.len() != ciphertext_len {
                return Err(OramError::EncryptionError);
            }
            let ad = associated_data(node, slot_index)?;
            let plaintext = cipher.decrypt(slot, &ad)?;
            if let Some(block) = PathOramBlock::decode(&plaintext, layout.block_size)? {
                result.push(block);
            }
        }

        Ok(result)
    }
}
