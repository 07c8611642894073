// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! An encrypted Path ORAM block store.
//!
//! A client stores fixed-size blocks on an untrusted [`database::Database`] of buckets.
//! Every logical read, write or delete touches exactly one root-to-leaf path of the bucket tree,
//! re-encrypts every slot on that path under a fresh nonce,
//! and moves the accessed block to a fresh uniformly random leaf,
//! so the sequence of physical accesses is independent of which block was requested.
//!
//! ```no_run
//! use oram_store::{path_oram::DefaultOram, Oram, OramError};
//! use rand::rngs::OsRng;
//!
//! fn main() -> Result<(), OramError> {
//!     let mut rng = OsRng;
//!     let mut oram = DefaultOram::new(64, &mut rng)?;
//!     oram.write(5, b"hello".to_vec(), &mut rng)?;
//!     assert_eq!(oram.read(5, &mut rng)?, Some(b"hello".to_vec()));
//!     assert_eq!(oram.read(6, &mut rng)?, None);
//!     Ok(())
//! }
//! ```

#![warn(clippy::cargo, clippy::doc_markdown, missing_docs, rustdoc::all)]

use rand::{CryptoRng, RngCore};
use std::num::TryFromIntError;
use thiserror::Error;

pub mod database;
pub mod encryption;
pub mod path_oram;
#[cfg(test)]
mod test_utils;

/// The numeric type used to specify the identifier of a block (an ORAM address).
pub type Address = u64;

/// The numeric type used to specify the maximum payload size of a block, in bytes.
pub type BlockSize = usize;

/// The numeric type used to specify the number of slots in a Path ORAM bucket.
pub type BucketSize = usize;

/// The numeric type used to specify the size of the Path ORAM stash in blocks.
pub type StashSize = u64;

/// A logical operation on a single ORAM block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Returns the current payload, leaving it unchanged.
    Read,
    /// Replaces the payload, creating the block if it does not exist.
    Write(Vec<u8>),
    /// Removes the block. Later reads return `None` until it is written again.
    Delete,
}

/// Represents an oblivious RAM (ORAM) mapping `Address`es to variable-length payloads
/// of at most a fixed number of bytes.
pub trait Oram
where
    Self: Sized,
{
    /// Returns the number of addresses the ORAM can store.
    fn block_capacity(&self) -> Result<Address, OramError>;

    /// Performs `operation` on the block at `address` as a single oblivious access
    /// and returns the payload stored there before the access, or `None` if there was none.
    fn access<R: RngCore + CryptoRng>(
        &mut self,
        operation: Operation,
        address: Address,
        rng: &mut R,
    ) -> Result<Option<Vec<u8>>, OramError>;

    /// Obliviously reads the payload stored at `address`. Returns `None` if it was never written or was deleted.
    fn read<R: RngCore + CryptoRng>(
        &mut self,
        address: Address,
        rng: &mut R,
    ) -> Result<Option<Vec<u8>>, OramError> {
        self.access(Operation::Read, address, rng)
    }

    /// Obliviously writes `payload` to `address`.
    fn write<R: RngCore + CryptoRng>(
        &mut self,
        address: Address,
        payload: Vec<u8>,
        rng: &mut R,
    ) -> Result<(), OramError> {
        self.access(Operation::Write(payload), address, rng)?;
        Ok(())
    }

    /// Obliviously deletes the block at `address`.
    fn delete<R: RngCore + CryptoRng>(
        &mut self,
        address: Address,
        rng: &mut R,
    ) -> Result<(), OramError> {
        self.access(Operation::Delete, address, rng)?;
        Ok(())
    }
}

/// A list of error types which are produced during ORAM protocol execution.
#[derive(Error, Debug)]
pub enum OramError {
    /// Errors arising from conversions between integer types.
    #[error("Arithmetic error encountered.")]
    IntegerConversionError(#[from] TryFromIntError),
    /// Errors arising from attempting to make an ORAM access to an invalid address.
    #[error("Attempted to access an out-of-bounds ORAM address.")]
    AddressOutOfBoundsError,
    /// Errors arising from invalid parameters or configuration.
    #[error("Invalid configuration: {0}.")]
    InvalidConfigurationError(&'static str),
    /// A payload longer than the configured block size was written.
    #[error("Payload of {length} bytes exceeds the block size of {block_size} bytes.")]
    PayloadTooLargeError {
        /// The length of the rejected payload.
        length: usize,
        /// The configured block size.
        block_size: BlockSize,
    },
    /// The stash held more blocks than its configured bound after eviction.
    #[error("Stash occupancy {occupancy} exceeded the overflow bound {bound}.")]
    StashOverflowError {
        /// The number of blocks left in the stash.
        occupancy: StashSize,
        /// The configured bound.
        bound: StashSize,
    },
    /// The backing store failed to read or write a bucket.
    #[error("Backing store I/O failed.")]
    BackingStoreError(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// A slot failed authentication or was malformed, indicating tampering or corruption.
    #[error("A bucket slot failed authentication.")]
    EncryptionError,
    /// A previous access failed during write-back; the instance must be torn down and reinitialized.
    #[error("The ORAM is in a possibly inconsistent state and must be reinitialized.")]
    InconsistentStateError,
}

impl OramError {
    /// Wraps a backing store failure.
    pub fn backing_store<E: Into<Box<dyn std::error::Error + Send + Sync>>>(error: E) -> Self {
        OramError::BackingStoreError(error.into())
    }
}
