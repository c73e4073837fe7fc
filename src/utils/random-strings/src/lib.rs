// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

const HEX_SYMBOLS: &[u8] = b"0123456789abcdef";
const LOWERCASE_SYMBOLS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowedSymbols {
    /// `[a-zA-Z0-9]`
    Alphanumeric,
    /// `[a-z0-9]`
    Lowercase,
    /// `[0-9a-f]`
    Hex,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub fn get_random_string(prefix: Option<&str>, length: usize, symbols: AllowedSymbols) -> String {
    let mut rng = rand::thread_rng();

    let mut result = String::with_capacity(prefix.map_or(0, str::len) + length);
    if let Some(prefix) = prefix {
        result.push_str(prefix);
    }

    match symbols {
        AllowedSymbols::Alphanumeric => {
            result.extend((0..length).map(|_| char::from(rng.sample(Alphanumeric))));
        }
        AllowedSymbols::Lowercase => {
            result.extend(
                (0..length).filter_map(|_| LOWERCASE_SYMBOLS.choose(&mut rng).map(|c| char::from(*c))),
            );
        }
        AllowedSymbols::Hex => {
            result.extend(
                (0..length).filter_map(|_| HEX_SYMBOLS.choose(&mut rng).map(|c| char::from(*c))),
            );
        }
    }

    result
}

/// Lowercase alphanumeric name, suitable for file names and object keys
pub fn get_random_name(prefix: Option<&str>, length: usize) -> String {
    get_random_string(prefix, length, AllowedSymbols::Lowercase)
}

pub fn get_random_hex(length: usize) -> String {
    get_random_string(None, length, AllowedSymbols::Hex)
}
