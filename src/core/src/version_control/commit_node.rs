// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Identifier of the root node every dataset starts from
pub const FIRST_COMMIT_ID: &str = "firstdbf9474d461a19e9333c2fd19b46115348f";

pub const DEFAULT_BRANCH: &str = "main";

pub const AUTO_BRANCH_PREFIX: &str = "auto_";

const COMMIT_ID_LEN: usize = 40;

pub fn generate_commit_id() -> String {
    random_strings::get_random_hex(COMMIT_ID_LEN)
}

pub fn generate_auto_branch_name() -> String {
    format!("{AUTO_BRANCH_PREFIX}{}", random_strings::get_random_hex(8))
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Node of the commit graph.
///
/// A node without `commit_time` is the uncommitted working head of its
/// branch. Once committed the node is immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitNode {
    pub commit_id: String,
    pub branch: String,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub commit_time: Option<DateTime<Utc>>,
    pub message: Option<String>,
    #[serde(default)]
    pub has_changes: bool,
}

impl CommitNode {
    pub fn new(branch: impl Into<String>, commit_id: impl Into<String>) -> Self {
        Self {
            commit_id: commit_id.into(),
            branch: branch.into(),
            parent: None,
            children: Vec::new(),
            commit_time: None,
            message: None,
            has_changes: false,
        }
    }

    pub fn is_committed(&self) -> bool {
        self.commit_time.is_some()
    }

    pub fn is_head_node(&self) -> bool {
        !self.is_committed()
    }
}

impl std::fmt::Display for CommitNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Commit : {} ({})", self.commit_id, self.branch)?;
        if let Some(commit_time) = &self.commit_time {
            writeln!(f, "Time   : {}", commit_time.format("%Y-%m-%d %H:%M:%S"))?;
        }
        if let Some(message) = &self.message {
            writeln!(f, "Message: {message}")?;
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Commit graph persisted as `version_control_info.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub commit_node_map: BTreeMap<String, CommitNode>,
    /// Branch name to the id of its head node
    pub branch_commit_map: BTreeMap<String, String>,
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionInfo {
    /// Graph of a fresh dataset: a single uncommitted root on the default
    /// branch
    pub fn new() -> Self {
        let root = CommitNode::new(DEFAULT_BRANCH, FIRST_COMMIT_ID);
        Self {
            commit_node_map: [(FIRST_COMMIT_ID.to_string(), root)].into(),
            branch_commit_map: [(DEFAULT_BRANCH.to_string(), FIRST_COMMIT_ID.to_string())].into(),
        }
    }

    pub fn node(&self, commit_id: &str) -> Option<&CommitNode> {
        self.commit_node_map.get(commit_id)
    }

    pub fn branch_head(&self, branch: &str) -> Option<&str> {
        self.branch_commit_map.get(branch).map(String::as_str)
    }

    /// Adds a new uncommitted node as a child of `parent` and makes it the
    /// head of `branch`
    pub(crate) fn add_child(&mut self, parent: &str, branch: &str) -> String {
        let commit_id = generate_commit_id();

        let mut node = CommitNode::new(branch, commit_id.clone());
        node.parent = Some(parent.to_string());

        if let Some(parent) = self.commit_node_map.get_mut(parent) {
            parent.children.push(commit_id.clone());
        }

        self.commit_node_map.insert(commit_id.clone(), node);
        self.branch_commit_map
            .insert(branch.to_string(), commit_id.clone());

        commit_id
    }
}
