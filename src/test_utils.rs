// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! This module contains common test utilities for the ORAM and its backing stores.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, Once};
use std::thread::{self, ThreadId};
static INIT: Once = Once::new();
use crate::database::{CountAccessesDatabase, Database, SimpleDatabase};
use crate::encryption::XChaCha20Poly1305Cipher;
use crate::path_oram::{tree_index::node_count, Bucket, PathOram, PathOramParameters};
use crate::{Address, BucketSize, Oram, OramError};
use rand::{rngs::StdRng, CryptoRng, Rng, RngCore, SeedableRng};
use simplelog::{Config, WriteLogger};

/// The block size used by the correctness workloads.
pub(crate) const TEST_BLOCK_SIZE: usize = 16;

// For use in manual testing and inspection.
pub(crate) fn init_logger() {
    INIT.call_once(|| {
        WriteLogger::init(log::LevelFilter::Info, Config::default(), std::io::stdout()).unwrap()
    })
}

/// A `PathOram` over an access-counting in-memory store.
pub(crate) type TestOram = PathOram<CountAccessesDatabase<Bucket>, XChaCha20Poly1305Cipher>;

pub(crate) trait Testable: Oram + Debug {
    fn new_for_testing<R: RngCore + CryptoRng>(parameters: PathOramParameters, rng: &mut R)
        -> Self;

    fn test_hook(&mut self) {}
}

impl Testable for TestOram {
    fn new_for_testing<R: RngCore + CryptoRng>(
        parameters: PathOramParameters,
        rng: &mut R,
    ) -> Self {
        let number_of_buckets = node_count(parameters.tree_height().unwrap());
        let database = CountAccessesDatabase::new(number_of_buckets).unwrap();
        let cipher = XChaCha20Poly1305Cipher::random(rng);
        let mut oram = PathOram::new_with_parameters(parameters, database, cipher, rng).unwrap();

        // Avoid counting reads and writes occurring during initialization
        oram.physical_memory.reset_counts();
        oram
    }

    fn test_hook(&mut self) {
        self.check_tree_invariants();
    }
}

fn random_payload<R: Rng>(rng: &mut R) -> Vec<u8> {
    let length = rng.gen_range(0..=TEST_BLOCK_SIZE);
    (0..length).map(|_| rng.gen()).collect()
}

fn test_parameters(bucket_size: BucketSize, capacity: Address) -> PathOramParameters {
    PathOramParameters::new(capacity)
        .with_bucket_size(bucket_size)
        .with_block_size(TEST_BLOCK_SIZE)
}

// Applies one random read, write or delete to both `oram` and `mirror`, checking the returned value.
fn random_operation<T: Oram, R: RngCore + CryptoRng>(
    oram: &mut T,
    mirror: &mut HashMap<Address, Vec<u8>>,
    address: Address,
    rng: &mut R,
) {
    let expected = mirror.get(&address).cloned();
    let choice = rng.gen_range(0..10);
    if choice < 5 {
        assert_eq!(oram.read(address, rng).unwrap(), expected, "{address}");
    } else if choice < 9 {
        let payload = random_payload(rng);
        oram.write(address, payload.clone(), rng).unwrap();
        mirror.insert(address, payload);
    } else {
        oram.delete(address, rng).unwrap();
        mirror.remove(&address);
    }
}

fn check_all_addresses<T: Oram, R: RngCore + CryptoRng>(
    oram: &mut T,
    mirror: &HashMap<Address, Vec<u8>>,
    capacity: Address,
    rng: &mut R,
) {
    for address in 0..capacity {
        assert_eq!(
            oram.read(address, rng).unwrap(),
            mirror.get(&address).cloned(),
            "{address}"
        );
    }
}

/// Tests the correctness of an ORAM type T on a workload of random reads, writes and deletes.
pub(crate) fn test_correctness_random_workload<T: Testable>(
    bucket_size: BucketSize,
    capacity: Address,
    num_operations: u32,
) {
    init_logger();
    let mut rng = StdRng::seed_from_u64(0);

    let mut oram = T::new_for_testing(test_parameters(bucket_size, capacity), &mut rng);
    let mut mirror = HashMap::new();

    for _ in 0..num_operations {
        let random_address = rng.gen_range(0..capacity);
        random_operation(&mut oram, &mut mirror, random_address, &mut rng);
    }

    check_all_addresses(&mut oram, &mirror, capacity, &mut rng);
    oram.test_hook();
}

/// Tests the correctness of an ORAM type T on repeated passes of sequential accesses 0, 1, ..., `capacity - 1`.
pub(crate) fn test_correctness_linear_workload<T: Testable>(
    bucket_size: BucketSize,
    capacity: Address,
    num_operations: u32,
) {
    init_logger();
    let mut rng = StdRng::seed_from_u64(0);

    let mut oram = T::new_for_testing(test_parameters(bucket_size, capacity), &mut rng);
    let mut mirror = HashMap::new();

    let num_passes = u64::from(num_operations) / capacity;

    for _ in 0..num_passes {
        for address in 0..capacity {
            random_operation(&mut oram, &mut mirror, address, &mut rng);
        }
    }

    check_all_addresses(&mut oram, &mirror, capacity, &mut rng);
    oram.test_hook();
}

macro_rules! create_correctness_test {
    ($function_name:ident, $oram_type: ident, $bucket_size: expr, $block_capacity:expr, $iterations_to_test: expr) => {
        paste::paste! {
            #[test]
            fn [<$function_name _ $oram_type:snake _ $bucket_size _ $block_capacity _ $iterations_to_test>]() {
                $function_name::<$oram_type>($bucket_size, $block_capacity, $iterations_to_test);
            }
        }
    };
}

macro_rules! create_correctness_tests_for_workload_and_oram_type {
    ($function_name: ident, $oram_type: ident) => {
        create_correctness_test!($function_name, $oram_type, 1, 1, 10);
        create_correctness_test!($function_name, $oram_type, 4, 8, 100);
        create_correctness_test!($function_name, $oram_type, 2, 16, 200);
        // Capacity not a power of two: the tree has 64 leaves.
        create_correctness_test!($function_name, $oram_type, 4, 33, 300);
        create_correctness_test!($function_name, $oram_type, 3, 64, 500);
        create_correctness_test!($function_name, $oram_type, 5, 100, 1000);
    };
}

macro_rules! create_correctness_tests_for_oram_type {
    ($oram_type: ident) => {
        create_correctness_tests_for_workload_and_oram_type!(
            test_correctness_linear_workload,
            $oram_type
        );
        create_correctness_tests_for_workload_and_oram_type!(
            test_correctness_random_workload,
            $oram_type
        );
    };
}

pub(crate) use create_correctness_test;
pub(crate) use create_correctness_tests_for_oram_type;
pub(crate) use create_correctness_tests_for_workload_and_oram_type;

macro_rules! monitor_boilerplate {
    ($monitor: ident) => {
        impl Testable for $monitor {
            fn new_for_testing<R: RngCore + CryptoRng>(
                parameters: PathOramParameters,
                rng: &mut R,
            ) -> Self {
                Self {
                    oram: TestOram::new_for_testing(parameters, rng),
                }
            }

            fn test_hook(&mut self) {
                self.oram.test_hook();
            }
        }
    };
}

/// Checks after every access that the stash holds at most ten blocks per tree level.
#[derive(Debug)]
pub(crate) struct StashSizeMonitor {
    oram: TestOram,
}

monitor_boilerplate!(StashSizeMonitor);

impl Oram for StashSizeMonitor {
    fn block_capacity(&self) -> Result<Address, OramError> {
        self.oram.block_capacity()
    }

    fn access<R: RngCore + CryptoRng>(
        &mut self,
        operation: crate::Operation,
        address: Address,
        rng: &mut R,
    ) -> Result<Option<Vec<u8>>, OramError> {
        let result = self.oram.access(operation, address, rng);
        let stats = self.oram.stats();
        assert!(stats.stash_size <= 10 * stats.height);
        result
    }
}

/// Checks after every access that tree and stash together hold exactly the live blocks.
#[derive(Debug)]
pub(crate) struct ConstantOccupancyMonitor {
    oram: TestOram,
}

monitor_boilerplate!(ConstantOccupancyMonitor);

impl Oram for ConstantOccupancyMonitor {
    fn block_capacity(&self) -> Result<Address, OramError> {
        self.oram.block_capacity()
    }

    fn access<R: RngCore + CryptoRng>(
        &mut self,
        operation: crate::Operation,
        address: Address,
        rng: &mut R,
    ) -> Result<Option<Vec<u8>>, OramError> {
        let result = self.oram.access(operation, address, rng);
        let tree_occupancy = self.oram.check_tree_invariants();
        assert_eq!(
            tree_occupancy + self.oram.stash.occupancy(),
            self.oram.position_map.assigned_count()
        );
        result
    }
}

/// Checks that every access reads, then writes, exactly one bucket per tree level.
#[derive(Debug)]
pub(crate) struct PhysicalAccessCountMonitor {
    oram: TestOram,
}

monitor_boilerplate!(PhysicalAccessCountMonitor);

impl Oram for PhysicalAccessCountMonitor {
    fn block_capacity(&self) -> Result<Address, OramError> {
        self.oram.block_capacity()
    }

    fn access<R: RngCore + CryptoRng>(
        &mut self,
        operation: crate::Operation,
        address: Address,
        rng: &mut R,
    ) -> Result<Option<Vec<u8>>, OramError> {
        let pre_read_count = self.oram.physical_memory.get_read_count();
        let pre_write_count = self.oram.physical_memory.get_write_count();

        let result = self.oram.access(operation, address, rng);

        let reads = self.oram.physical_memory.get_read_count() - pre_read_count;
        let writes = self.oram.physical_memory.get_write_count() - pre_write_count;

        let levels = self.oram.stats().height;
        assert_eq!(reads, levels);
        assert_eq!(writes, levels);

        result
    }
}

/// An in-memory store whose reads or writes can be made to fail after a given number of successes.
#[derive(Debug)]
pub(crate) struct FailingDatabase<V> {
    data: SimpleDatabase<V>,
    reads_left: Option<u64>,
    writes_left: Option<u64>,
}

impl<V: Clone + Default> FailingDatabase<V> {
    pub fn new(number_of_addresses: Address) -> Result<Self, OramError> {
        Ok(Self {
            data: SimpleDatabase::new(number_of_addresses)?,
            reads_left: None,
            writes_left: None,
        })
    }

    pub fn fail_reads_after(&mut self, successes: u64) {
        self.reads_left = Some(successes);
    }

    pub fn fail_writes_after(&mut self, successes: u64) {
        self.writes_left = Some(successes);
    }

    pub fn heal(&mut self) {
        self.reads_left = None;
        self.writes_left = None;
    }
}

fn consume(budget: &mut Option<u64>) -> Result<(), OramError> {
    match budget {
        Some(0) => Err(OramError::backing_store("injected failure")),
        Some(remaining) => {
            *remaining -= 1;
            Ok(())
        }
        None => Ok(()),
    }
}

impl<V: Clone + Default> Database<V> for FailingDatabase<V> {
    fn capacity(&self) -> Result<Address, OramError> {
        self.data.capacity()
    }

    fn read_db(&mut self, index: Address) -> Result<V, OramError> {
        consume(&mut self.reads_left)?;
        self.data.read_db(index)
    }

    fn write_db(&mut self, index: Address, value: V) -> Result<(), OramError> {
        consume(&mut self.writes_left)?;
        self.data.write_db(index, value)
    }
}

/// One physical access observed by a `RecordingDatabase`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PhysicalAccess {
    pub thread: ThreadId,
    pub index: Address,
    pub is_write: bool,
}

/// An in-memory store that appends every access to a shared journal.
#[derive(Debug)]
pub(crate) struct RecordingDatabase<V> {
    data: SimpleDatabase<V>,
    journal: Arc<Mutex<Vec<PhysicalAccess>>>,
}

impl<V: Clone + Default> RecordingDatabase<V> {
    pub fn new(
        number_of_addresses: Address,
        journal: Arc<Mutex<Vec<PhysicalAccess>>>,
    ) -> Result<Self, OramError> {
        Ok(Self {
            data: SimpleDatabase::new(number_of_addresses)?,
            journal,
        })
    }

    fn record(&self, index: Address, is_write: bool) -> Result<(), OramError> {
        let mut journal = self
            .journal
            .lock()
            .map_err(|_| OramError::backing_store("journal lock poisoned"))?;
        journal.push(PhysicalAccess {
            thread: thread::current().id(),
            index,
            is_write,
        });
        Ok(())
    }
}

impl<V: Clone + Default> Database<V> for RecordingDatabase<V> {
    fn capacity(&self) -> Result<Address, OramError> {
        self.data.capacity()
    }

    fn read_db(&mut self, index: Address) -> Result<V, OramError> {
        self.record(index, false)?;
        self.data.read_db(index)
    }

    fn write_db(&mut self, index: Address, value: V) -> Result<(), OramError> {
        self.record(index, true)?;
        self.data.write_db(index, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failing_database_fails_on_schedule() {
        let mut database = FailingDatabase::<u64>::new(4).unwrap();
        database.fail_writes_after(1);
        database.write_db(0, 1).unwrap();
        assert!(matches!(
            database.write_db(1, 2),
            Err(OramError::BackingStoreError(_))
        ));
        assert_eq!(database.read_db(0).unwrap(), 1);

        database.heal();
        database.write_db(1, 2).unwrap();
        assert_eq!(database.read_db(1).unwrap(), 2);
    }

    #[test]
    fn recording_database_journals_accesses() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut database = RecordingDatabase::<u64>::new(4, Arc::clone(&journal)).unwrap();
        database.write_db(2, 5).unwrap();
        database.read_db(2).unwrap();

        let journal = journal.lock().unwrap();
        let thread = thread::current().id();
        assert_eq!(
            *journal,
            vec![
                PhysicalAccess {
                    thread,
                    index: 2,
                    is_write: true
                },
                PhysicalAccess {
                    thread,
                    index: 2,
                    is_write: false
                },
            ]
        );
    }
}
