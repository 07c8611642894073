// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A Path ORAM block and its fixed-length slot encoding.

use super::TreeIndex;
use crate::{Address, BlockSize, OramError};
use subtle::{Choice, ConstantTimeEq};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

const DUMMY_SLOT: u8 = 0;
const REAL_SLOT: u8 = 1;

const KIND_OFFSET: usize = 0;
const ADDRESS_OFFSET: usize = 1;
const POSITION_OFFSET: usize = ADDRESS_OFFSET + 8;
const LENGTH_OFFSET: usize = POSITION_OFFSET + 8;
/// The number of plaintext bytes preceding the payload in every slot.
pub(crate) const SLOT_HEADER_SIZE: usize = LENGTH_OFFSET + 4;

/// A Path ORAM block combines a payload with two metadata fields; its ORAM `address` and its `position` in the tree.
///
/// Blocks only ever exist in plaintext on the client, and are wiped when dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub(crate) struct PathOramBlock {
    pub value: Vec<u8>,
    pub address: Address,
    pub position: TreeIndex,
}

impl PathOramBlock {
    pub fn new(address: Address, position: TreeIndex, value: Vec<u8>) -> Self {
        Self {
            value,
            address,
            position,
        }
    }

    /// The length of an encoded slot holding at most `block_size` payload bytes.
    pub fn encoded_len(block_size: BlockSize) -> usize {
        SLOT_HEADER_SIZE + block_size
    }

    /// Encodes `self` as a slot plaintext, padding the payload to `block_size` bytes.
    pub fn encode(&self, block_size: BlockSize) -> Result<Zeroizing<Vec<u8>>, OramError> {
        if self.value.len() > block_size {
            return Err(OramError::PayloadTooLargeError {
                length: self.value.len(),
                block_size,
            });
        }
        let length = u32::try_from(self.value.len())?;

        let mut result = Zeroizing::new(vec![0u8; Self::encoded_len(block_size)]);
        result[KIND_OFFSET] = REAL_SLOT;
        result[ADDRESS_OFFSET..POSITION_OFFSET].copy_from_slice(&self.address.to_le_bytes());
        result[POSITION_OFFSET..LENGTH_OFFSET].copy_from_slice(&self.position.to_le_bytes());
        result[LENGTH_OFFSET..SLOT_HEADER_SIZE].copy_from_slice(&length.to_le_bytes());
        result[SLOT_HEADER_SIZE..SLOT_HEADER_SIZE + self.value.len()].copy_from_slice(&self.value);
        Ok(result)
    }

    /// Encodes a dummy slot. Dummies are all zeros; only their fresh encryption distinguishes them.
    pub fn encode_dummy(block_size: BlockSize) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(vec![DUMMY_SLOT; Self::encoded_len(block_size)])
    }

    /// Decodes a slot plaintext. Returns `None` for a dummy slot.
    ///
    /// Any malformed plaintext is reported as an `EncryptionError`, as it can only arise from
    /// a slot that was not produced by this ORAM.
    pub fn decode(plaintext: &[u8], block_size: BlockSize) -> Result<Option<Self>, OramError> {
        if plaintext.len() != Self::encoded_len(block_size) {
            return Err(OramError::EncryptionError);
        }

        let kind = plaintext[KIND_OFFSET];
        let is_dummy: Choice = kind.ct_eq(&DUMMY_SLOT);
        let is_real: Choice = kind.ct_eq(&REAL_SLOT);
        if bool::from(is_dummy) {
            return Ok(None);
        }
        if !bool::from(is_real) {
            return Err(OramError::EncryptionError);
        }

        let address = Address::from_le_bytes(read_array(plaintext, ADDRESS_OFFSET)?);
        let position = TreeIndex::from_le_bytes(read_array(plaintext, POSITION_OFFSET)?);
        let length = usize::try_from(u32::from_le_bytes(read_array(plaintext, LENGTH_OFFSET)?))?;
        if length > block_size {
            return Err(OramError::EncryptionError);
        }

        let value = plaintext[SLOT_HEADER_SIZE..SLOT_HEADER_SIZE + length].to_vec();
        Ok(Some(Self::new(address, position, value)))
    }
}

fn read_array<const N: usize>(bytes: &[u8], offset: usize) -> Result<[u8; N], OramError> {
    bytes
        .get(offset..offset + N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or(OramError::EncryptionError)
}

impl std::fmt::Debug for PathOramBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathOramBlock")
            .field("address", &self.address)
            .field("position", &self.position)
            .field("length", &self.value.len())
            .finish()
    }
}
