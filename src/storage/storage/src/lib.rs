// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

mod cache_storage;
mod errors;
mod repo_helpers;
mod storage_provider;

#[cfg(any(feature = "testing", test))]
pub mod testing;

pub use cache_storage::*;
pub use errors::*;
pub use repo_helpers::*;
pub use storage_provider::*;
