// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

mod dataset_meta;
mod info;
mod tensor_meta;

pub use dataset_meta::*;
pub use info::*;
pub use tensor_meta::*;

/// Format version stamped into every persisted metadata object
pub const FORMAT_VERSION: &str = env!("CARGO_PKG_VERSION");
