// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A client-resident Path ORAM position map.

use super::TreeIndex;
use crate::{Address, OramError};
use zeroize::Zeroize;

/// Maps each address to the leaf its block is routed through, or to nothing if no block lives there.
///
/// The position map never leaves the client.
#[derive(Debug)]
pub(crate) struct PositionMap {
    positions: Vec<Option<TreeIndex>>,
    assigned: u64,
}

impl PositionMap {
    pub fn new(number_of_addresses: Address) -> Result<Self, OramError> {
        Ok(Self {
            positions: vec![None; number_of_addresses.try_into()?],
            assigned: 0,
        })
    }

    fn entry(&mut self, address: Address) -> Result<&mut Option<TreeIndex>, OramError> {
        let index: usize = address.try_into()?;
        self.positions
            .get_mut(index)
            .ok_or(OramError::AddressOutOfBoundsError)
    }

    /// Returns the leaf assigned to `address`, or `None` if it is unassigned.
    pub fn get(&self, address: Address) -> Result<Option<TreeIndex>, OramError> {
        let index: usize = address.try_into()?;
        self.positions
            .get(index)
            .copied()
            .ok_or(OramError::AddressOutOfBoundsError)
    }

    pub fn set(&mut self, address: Address, position: TreeIndex) -> Result<(), OramError> {
        let entry = self.entry(address)?;
        let was_assigned = entry.is_some();
        *entry = Some(position);
        if !was_assigned {
            self.assigned += 1;
        }
        Ok(())
    }

    /// Marks `address` unassigned.
    pub fn clear(&mut self, address: Address) -> Result<(), OramError> {
        let entry = self.entry(address)?;
        if entry.take().is_some() {
            self.assigned -= 1;
        }
        Ok(())
    }

    /// The number of addresses with an assigned leaf, which is the number of live blocks.
    pub fn assigned_count(&self) -> u64 {
        self.assigned
    }
}

impl Drop for PositionMap {
    fn drop(&mut self) {
        for position in self.positions.iter_mut().flatten() {
            position.zeroize();
        }
    }
}
