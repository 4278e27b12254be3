// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Operations on ciphertexts that never remove a layer.

use crate::crypto::payload::Payload;
use crate::CryptoError;
use num_bigint::{BigUint, RandBigInt};
use rand::{CryptoRng, RngCore};

/// Adds two ciphertexts: the result decrypts to the sum of the plaintexts
/// mod `n^{plaintext_space}`.
///
/// Both operands must share a public key and both space annotations.
pub fn add<'k>(x: Payload<'k>, y: Payload<'k>) -> Result<Payload<'k>, CryptoError> {
    if x.public_key != y.public_key {
        return Err(CryptoError::KeyMismatch);
    }
    if x.plaintext_space != y.plaintext_space {
        return Err(CryptoError::SpaceMismatch {
            context: "addends decode into different plaintext spaces",
        });
    }
    if x.current_space != y.current_space {
        return Err(CryptoError::SpaceMismatch {
            context: "addends reside in different spaces",
        });
    }
    let modulus = x.public_key.n_pow(x.current_space);
    Ok(Payload::new(
        (x.value * y.value) % modulus,
        x.public_key,
        x.plaintext_space,
        x.current_space,
    ))
}

/// Multiplies `hidden`'s ciphertext into `selector`'s plaintext: when the
/// selector encrypts a bit `b`, the result decrypts to `b * plaintext(hidden)`.
///
/// The selector must carry exactly one onion layer, and its plaintext must
/// live in the space `hidden` currently resides in. The result is
/// re-randomized so it carries no trace of the selector's ciphertext, and
/// sits one layer above `hidden`.
pub fn scalar_multiply<'k, R: RngCore + CryptoRng>(
    hidden: Payload<'k>,
    selector: &Payload<'k>,
    rng: &mut R,
) -> Result<Payload<'k>, CryptoError> {
    if hidden.public_key != selector.public_key {
        return Err(CryptoError::KeyMismatch);
    }
    if selector.current_space != selector.plaintext_space + 1 {
        return Err(CryptoError::SpaceMismatch {
            context: "selector must carry exactly one onion layer",
        });
    }
    if hidden.current_space != selector.plaintext_space {
        return Err(CryptoError::SpaceMismatch {
            context: "selector plaintext must live in the hidden value's current space",
        });
    }

    let public = hidden.public_key;
    let modulus_plain = public.n_pow(selector.current_space - 1);
    let modulus_cipher = public.n_pow(selector.current_space);

    let raised = selector.value.modpow(&hidden.value, &modulus_cipher);
    let r = rng.gen_biguint(public.bits()) % &modulus_cipher;
    let blinding = r.modpow(&modulus_plain, &modulus_cipher);
    let value = (raised * blinding) % &modulus_cipher;

    Ok(Payload::new(
        value,
        public,
        hidden.plaintext_space,
        hidden.current_space + 1,
    ))
}

/// Homomorphically selects one payload out of many.
///
/// All payloads must decode into the same plaintext space; each is lifted to
/// the deepest onion count present, multiplied into its selector, and the
/// products are folded with [`add`]. When the selectors' plaintexts are a
/// one-hot bit vector, the result decrypts to the chosen payload's plaintext.
pub fn select<'k, R: RngCore + CryptoRng>(
    payloads: Vec<Payload<'k>>,
    selectors: &[Payload<'k>],
    rng: &mut R,
) -> Result<Payload<'k>, CryptoError> {
    let Some(first) = payloads.first() else {
        return Err(CryptoError::EmptySelection);
    };
    if payloads.len() != selectors.len() {
        return Err(CryptoError::SelectionShape);
    }
    let plaintext_space = first.plaintext_space();
    if payloads
        .iter()
        .any(|p| p.plaintext_space() != plaintext_space)
    {
        return Err(CryptoError::SpaceMismatch {
            context: "select requires a common plaintext space",
        });
    }
    if selectors
        .iter()
        .any(|s| s.current_space() != s.plaintext_space() + 1)
    {
        return Err(CryptoError::SpaceMismatch {
            context: "selector must carry exactly one onion layer",
        });
    }

    let max_onion_layers = payloads
        .iter()
        .map(Payload::onion_layers)
        .max()
        .unwrap_or(0);

    let mut merged: Option<Payload<'k>> = None;
    for (payload, selector) in payloads.into_iter().zip(selectors) {
        let delta = max_onion_layers - payload.onion_layers();
        let lifted = payload.lift_by(delta, rng);
        let product = scalar_multiply(lifted, selector, rng)?;
        merged = Some(match merged {
            None => product,
            Some(sum) => add(sum, product)?,
        });
    }
    merged.ok_or(CryptoError::EmptySelection)
}
