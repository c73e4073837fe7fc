// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::FORMAT_VERSION;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Names of all tensors and groups of a dataset at one commit.
///
/// Names are full slash-separated paths from the dataset root. The two sets
/// are disjoint and every ancestor of a tensor is a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMeta {
    /// Tensors in creation order
    pub tensors: Vec<String>,
    pub groups: BTreeSet<String>,
    pub version: String,
}

impl Default for DatasetMeta {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetMeta {
    pub fn new() -> Self {
        Self {
            tensors: Vec::new(),
            groups: BTreeSet::new(),
            version: FORMAT_VERSION.to_string(),
        }
    }

    pub fn has_tensor(&self, name: &str) -> bool {
        self.tensors.iter().any(|t| t == name)
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.groups.contains(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.has_tensor(name) || self.has_group(name)
    }
}
