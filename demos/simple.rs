// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A very simple demonstration of an oblivious write and read.

use num_bigint::BigUint;
use onion_oram::{generate_keypair, Client, EncServerWrapper, OramError};
use rand::rngs::OsRng;

fn main() -> Result<(), OramError> {
    let mut rng = OsRng;
    let (public, private) = generate_keypair(128, 1, &mut rng)?;
    let wrapper = EncServerWrapper::new(3, 20, 4, 1, public, private)?;
    let mut client = Client::new(wrapper, 32, Some(20))?;

    let chunks: Vec<BigUint> = [9u32, 100, 255, 7].iter().map(|&v| BigUint::from(v)).collect();
    client.write(0, &chunks, &mut rng)?;
    println!("{:?}", client.read(0, &mut rng)?);
    Ok(())
}
