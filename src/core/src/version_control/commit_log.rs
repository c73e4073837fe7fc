// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::BTreeMap;

use super::CommitNode;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Committed ancestors of a node, newest first
pub struct CommitLog {
    nodes: BTreeMap<String, CommitNode>,
    next: Option<String>,
}

impl CommitLog {
    pub(crate) fn new(nodes: BTreeMap<String, CommitNode>, start: &str) -> Self {
        Self {
            nodes,
            next: Some(start.to_string()),
        }
    }
}

impl Iterator for CommitLog {
    type Item = CommitNode;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let commit_id = self.next.take()?;
            let node = self.nodes.remove(&commit_id)?;
            self.next.clone_from(&node.parent);

            if node.is_committed() {
                return Some(node);
            }
        }
    }
}
