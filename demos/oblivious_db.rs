// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! An example of using ORAM to obliviously serve an indexed database
//! from an untrusted store whose accesses are being watched.

extern crate oram_store;

use oram_store::database::{CountAccessesDatabase, Database};
use oram_store::encryption::XChaCha20Poly1305Cipher;
use oram_store::path_oram::{Bucket, PathOram, PathOramParameters};
use oram_store::{Address, BlockSize, Oram};
use rand::{rngs::OsRng, Rng};
use simplelog::{Config, WriteLogger};

const BLOCK_SIZE: BlockSize = 1024;
const DB_SIZE: Address = 64;

// A stand-in for the indexed database you want to obliviously serve.
fn record(index: Address) -> Vec<u8> {
    format!("record #{index}").into_bytes()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    WriteLogger::init(log::LevelFilter::Info, Config::default(), std::io::stdout())?;
    let mut rng = OsRng;

    let parameters = PathOramParameters::new(DB_SIZE).with_block_size(BLOCK_SIZE);
    let number_of_buckets = 2 * DB_SIZE.next_power_of_two() - 1;
    let store = CountAccessesDatabase::<Bucket>::new(number_of_buckets)?;
    let cipher = XChaCha20Poly1305Cipher::random(&mut rng);
    let mut oram = PathOram::new_with_parameters(parameters, store, cipher, &mut rng)?;

    // Load the database into the ORAM.
    for index in 0..DB_SIZE {
        oram.write(index, record(index), &mut rng)?;
    }

    // Now the ORAM can be used to obliviously serve the records.
    let num_operations = 100;
    for _ in 0..num_operations {
        let random_index = rng.gen_range(0..DB_SIZE);
        let value = oram.read(random_index, &mut rng)?;
        assert_eq!(value, Some(record(random_index)));
    }

    let stats = oram.stats();
    println!(
        "Served {} reads from a tree of {} buckets with {} levels; {} blocks in the stash.",
        num_operations, stats.total_buckets, stats.height, stats.stash_size
    );

    // The store saw exactly one path read and written per access, whatever was requested.
    let store = oram.teardown();
    let accesses = num_operations + DB_SIZE;
    println!(
        "The store served {} bucket reads and {} bucket writes for {} accesses.",
        store.get_read_count(),
        store.get_write_count(),
        accesses
    );
    println!("Store capacity: {} buckets.", store.capacity()?);

    Ok(())
}
