// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

mod commit_log;
mod commit_node;
mod version_control;
mod version_state;

pub use commit_log::*;
pub use commit_node::*;
pub use version_control::*;
pub use version_state::*;
