// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Resolution of slash-separated tensor and group paths.
//!
//! Everything here is a pure function of a path and a [`DatasetMeta`].

use crate::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

pub const SEPARATOR: char = '/';

/// Names that would shadow operations of a dataset
pub const RESERVED_NAMES: &[&str] = &[
    "append",
    "begin_batch",
    "branch",
    "checkout",
    "clear_cache",
    "commit",
    "commit_id",
    "create_group",
    "create_tensor",
    "create_tensor_like",
    "delete",
    "end_batch",
    "extend",
    "flush",
    "get",
    "group_index",
    "groups",
    "index",
    "info",
    "iter",
    "len",
    "log",
    "lookup",
    "meta",
    "num_samples",
    "parent",
    "path",
    "read_only",
    "root",
    "select",
    "size_approx",
    "storage",
    "tensors",
    "update_info",
];

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Strips leading and trailing separators and collapses repeated ones
pub fn normalize(name: &str) -> String {
    name.split(SEPARATOR)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn join(group: &str, name: &str) -> String {
    match (group.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (_, true) => group.to_string(),
        _ => format!("{group}{SEPARATOR}{name}"),
    }
}

/// Path of the enclosing group, empty for top-level entries
pub fn parent(path: &str) -> &str {
    path.rsplit_once(SEPARATOR).map_or("", |(head, _)| head)
}

/// Proper prefixes of a path, outermost first
pub fn ancestors(path: &str) -> Vec<&str> {
    path.match_indices(SEPARATOR)
        .map(|(i, _)| &path[..i])
        .collect()
}

/// Path of `full` relative to `group`, `None` if it lies outside of it
pub fn relative_to<'a>(group: &str, full: &'a str) -> Option<&'a str> {
    if group.is_empty() {
        return Some(full);
    }
    full.strip_prefix(group)?.strip_prefix(SEPARATOR)
}

pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !is_reserved(name)
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Tensor(String),
    Group(String),
    NotFound,
}

/// Resolves `name` within the group `group_index` to a full path
pub fn resolve(meta: &DatasetMeta, group_index: &str, name: &str) -> Resolved {
    let full = join(group_index, &normalize(name));

    if meta.has_tensor(&full) {
        return Resolved::Tensor(full);
    }
    if meta.has_group(&full) {
        return Resolved::Group(full);
    }

    if let Some((head, tail)) = name.trim_matches(SEPARATOR).rsplit_once(SEPARATOR) {
        if let Resolved::Group(group) = resolve(meta, group_index, head) {
            return resolve(meta, &group, tail);
        }
    }

    Resolved::NotFound
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Validates creation of a tensor at `full` named `name` relative to its
/// group. Returns ancestor groups that do not exist yet.
pub fn check_new_tensor(
    meta: &DatasetMeta,
    name: &str,
    full: &str,
) -> Result<Vec<String>, CreateTensorError> {
    if meta.has_tensor(full) {
        return Err(TensorAlreadyExistsError {
            name: full.to_string(),
        }
        .into());
    }
    if meta.has_group(full) {
        return Err(TensorGroupAlreadyExistsError {
            name: full.to_string(),
        }
        .into());
    }
    if !is_valid_name(name) {
        return Err(InvalidTensorNameError {
            name: name.to_string(),
        }
        .into());
    }

    missing_ancestors(meta, full)
        .map_err(|name| CreateTensorError::from(TensorAlreadyExistsError { name }))
}

/// Validates creation of a group at `full` named `name` relative to its
/// group. Returns the groups to add, the new group included.
pub fn check_new_group(
    meta: &DatasetMeta,
    name: &str,
    full: &str,
) -> Result<Vec<String>, CreateGroupError> {
    if meta.has_tensor(full) {
        return Err(TensorAlreadyExistsError {
            name: full.to_string(),
        }
        .into());
    }
    if meta.has_group(full) {
        return Err(TensorGroupAlreadyExistsError {
            name: full.to_string(),
        }
        .into());
    }
    if !is_valid_name(name) {
        return Err(InvalidTensorGroupNameError {
            name: name.to_string(),
        }
        .into());
    }

    let mut groups =
        missing_ancestors(meta, full).map_err(|name| TensorAlreadyExistsError { name })?;
    groups.push(full.to_string());
    Ok(groups)
}

/// Ancestors of `full` that are not groups yet, or the first ancestor that
/// is occupied by a tensor
fn missing_ancestors(meta: &DatasetMeta, full: &str) -> Result<Vec<String>, String> {
    let mut missing = Vec::new();
    for ancestor in ancestors(full) {
        if meta.has_tensor(ancestor) {
            return Err(ancestor.to_string());
        }
        if !meta.has_group(ancestor) {
            missing.push(ancestor.to_string());
        }
    }
    Ok(missing)
}
