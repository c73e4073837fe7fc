// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

mod config;
mod dataset;
mod errors;
mod index;
pub mod keys;
mod lock;
mod meta;
pub mod namespace;
mod persistence;
mod reporting;
mod storage_factory;
mod tensor;
mod version_control;

pub use config::*;
pub use dataset::*;
pub use errors::*;
pub use index::*;
pub use lock::*;
pub use meta::*;
pub use reporting::*;
pub use storage_factory::*;
pub use tensor::*;
pub use version_control::*;

pub use tensorvault_storage as storage;
