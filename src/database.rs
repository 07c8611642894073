// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Untrusted storage abstractions for Oblivious RAM.

use crate::{Address, OramError};

/// A simple Memory trait to model the untrusted store the client is interacting with.
///
/// Implementations may be local or remote. The ORAM only ever moves whole values,
/// and always the same number of them per access.
pub trait Database<V> {
    /// Returns the number of values stored by `self`.
    fn capacity(&self) -> Result<Address, OramError>;
    /// Reads the value stored at `index`.
    fn read_db(&mut self, index: Address) -> Result<V, OramError>;
    /// Writes the value stored at `index`.
    fn write_db(&mut self, index: Address, value: V) -> Result<(), OramError>;
}

/// A simple Database that stores its data as a Vec.
#[derive(Debug)]
pub struct SimpleDatabase<V>(Vec<V>);

impl<V: Clone + Default> SimpleDatabase<V> {
    /// Returns a new `SimpleDatabase` filled with `number_of_addresses` default values.
    pub fn new(number_of_addresses: Address) -> Result<Self, OramError> {
        Ok(Self(vec![V::default(); number_of_addresses.try_into()?]))
    }

    fn slot_mut(&mut self, index: Address) -> Result<&mut V, OramError> {
        let capacity = self.0.len();
        let index: usize = index.try_into()?;
        self.0.get_mut(index).ok_or_else(|| {
            OramError::backing_store(format!(
                "index {index} is out of range for a store of {capacity} values"
            ))
        })
    }

    #[cfg(test)]
    pub(crate) fn values_mut(&mut self) -> &mut [V] {
        &mut self.0
    }
}

impl<V: Clone + Default> Database<V> for SimpleDatabase<V> {
    fn capacity(&self) -> Result<Address, OramError> {
        Ok(self.0.len().try_into()?)
    }

    fn read_db(&mut self, index: Address) -> Result<V, OramError> {
        Ok(self.slot_mut(index)?.clone())
    }

    fn write_db(&mut self, index: Address, value: V) -> Result<(), OramError> {
        *self.slot_mut(index)? = value;
        Ok(())
    }
}

/// A Database that counts reads and writes.
#[derive(Debug)]
pub struct CountAccessesDatabase<V> {
    data: SimpleDatabase<V>,
    /// `reads[i]` tracks the total number of reads made to index `i`.
    pub reads: Vec<u64>,
    /// `writes[i]` tracks the total number of writes made to index `i`.
    pub writes: Vec<u64>,
}

impl<V: Clone + Default> CountAccessesDatabase<V> {
    /// Returns a new `CountAccessesDatabase` filled with `number_of_addresses` default values.
    pub fn new(number_of_addresses: Address) -> Result<Self, OramError> {
        Ok(Self {
            data: SimpleDatabase::new(number_of_addresses)?,
            reads: vec![0u64; number_of_addresses.try_into()?],
            writes: vec![0u64; number_of_addresses.try_into()?],
        })
    }

    /// Returns the total number of reads to the database.
    pub fn get_read_count(&self) -> u64 {
        self.reads.iter().sum()
    }

    /// Returns the total number of writes to the database.
    pub fn get_write_count(&self) -> u64 {
        self.writes.iter().sum()
    }

    /// Zeroes all read and write counters.
    pub fn reset_counts(&mut self) {
        self.reads.iter_mut().for_each(|count| *count = 0);
        self.writes.iter_mut().for_each(|count| *count = 0);
    }

    #[cfg(test)]
    pub(crate) fn values_mut(&mut self) -> &mut [V] {
        self.data.values_mut()
    }
}

impl<V: Clone + Default> Database<V> for CountAccessesDatabase<V> {
    fn capacity(&self) -> Result<Address, OramError> {
        self.data.capacity()
    }

    fn read_db(&mut self, index: Address) -> Result<V, OramError> {
        log::debug!("Physical read -- {}", index);

        let value = self.data.read_db(index)?;
        self.reads[usize::try_from(index)?] += 1;
        Ok(value)
    }

    fn write_db(&mut self, index: Address, value: V) -> Result<(), OramError> {
        log::debug!("Physical write -- {}", index);

        self.data.write_db(index, value)?;
        self.writes[usize::try_from(index)?] += 1;
        Ok(())
    }
}
