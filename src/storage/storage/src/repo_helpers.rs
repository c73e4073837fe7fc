// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use random_strings::get_random_name;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub const STAGING_PREFIX: &str = ".pending-";

pub fn get_staging_name() -> String {
    get_random_name(Some(STAGING_PREFIX), 16)
}

pub fn is_staging_name(name: &str) -> bool {
    name.starts_with(STAGING_PREFIX)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Joins key segments with `/`, skipping empty ones
pub fn join_key<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    let mut key = String::new();
    for segment in segments {
        let segment = segment.trim_matches('/');
        if segment.is_empty() {
            continue;
        }
        if !key.is_empty() {
            key.push('/');
        }
        key.push_str(segment);
    }
    key
}
