// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A simple interactive demonstration of ORAM.

use oram_store::path_oram::{DefaultOram, PathOramParameters};
use oram_store::Oram;
use rand::rngs::OsRng;
use rustyline::history::FileHistory;
use rustyline::Editor;

fn parse_number(
    prompt: &str,
    rl: &mut Editor<(), FileHistory>,
) -> Result<u64, Box<dyn std::error::Error>> {
    Ok(loop {
        println!("{}", prompt);
        println!();
        let readline: String = rl.readline("> ")?;
        let number_parse = readline.trim().parse::<u64>();
        match number_parse {
            Ok(number) => break number,
            Err(_) => {
                println!("Expected a number. Try again.");
                continue;
            }
        }
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = OsRng;

    let mut rl = Editor::<(), _>::new()?;

    let capacity = parse_number("How many strings would you like to store?", &mut rl)?;

    let parameters = PathOramParameters::new(capacity).with_block_size(256);
    let mut oram = DefaultOram::new_in_memory(parameters, &mut rng)?;

    loop {
        let action = loop {
            println!("Enter an option (R, W, D or S):");
            println!("R) Read");
            println!("W) Write");
            println!("D) Delete");
            println!("S) Stats");
            let action: String = rl.readline("> ")?;
            let action = action.trim().to_uppercase();
            if !["R", "W", "D", "S"].contains(&action.as_str()) {
                println!("Try again.");
                continue;
            }
            break action;
        };

        if action == "S" {
            println!("{:?}", oram.stats());
            continue;
        }

        let address = parse_number("What address?", &mut rl)?;

        let outcome = match action.as_str() {
            "R" => oram.read(address, &mut rng).map(|value| match value {
                Some(bytes) => println!(
                    "Value at {} is {:?}.",
                    address,
                    String::from_utf8_lossy(&bytes)
                ),
                None => println!("Nothing is stored at {}.", address),
            }),
            "W" => {
                let value = rl.readline("Value to write? > ")?;
                oram.write(address, value.clone().into_bytes(), &mut rng)
                    .map(|()| println!("Wrote {:?} to address {}.", value, address))
            }
            _ => oram
                .delete(address, &mut rng)
                .map(|()| println!("Deleted address {}.", address)),
        };

        // Invalid requests leave the ORAM usable; anything else is fatal.
        if let Err(error) = outcome {
            println!("{}", error);
            if oram.is_poisoned() {
                return Err(error.into());
            }
        }
    }
}
