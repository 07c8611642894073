// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A very simple demonstration of the use of ORAM.

extern crate oram_store;

use oram_store::path_oram::DefaultOram;
use oram_store::{Oram, OramError};
use rand::rngs::OsRng;

fn main() -> Result<(), OramError> {
    let mut rng = OsRng;
    let mut oram = DefaultOram::new(64, &mut rng)?;
    oram.write(0, b"hello".to_vec(), &mut rng)?;
    println!("{:?}", oram.read(0, &mut rng)?);
    oram.delete(0, &mut rng)?;
    println!("{:?}", oram.read(0, &mut rng)?);
    Ok(())
}
