// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use tensorvault::namespace::*;
use tensorvault::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn meta(tensors: &[&str], groups: &[&str]) -> DatasetMeta {
    let mut meta = DatasetMeta::new();
    meta.tensors = tensors.iter().map(ToString::to_string).collect();
    meta.groups = groups.iter().map(ToString::to_string).collect();
    meta
}

#[test]
fn test_normalize() {
    assert_eq!(normalize("/a//b/"), "a/b");
    assert_eq!(normalize("a"), "a");
    assert_eq!(normalize("///"), "");
}

#[test]
fn test_path_helpers() {
    assert_eq!(join("", "a"), "a");
    assert_eq!(join("g", "a/b"), "g/a/b");
    assert_eq!(join("g", ""), "g");

    assert_eq!(parent("a/b/c"), "a/b");
    assert_eq!(parent("a"), "");

    assert_eq!(ancestors("a/b/c"), vec!["a", "a/b"]);
    assert!(ancestors("a").is_empty());

    assert_eq!(relative_to("", "a/b"), Some("a/b"));
    assert_eq!(relative_to("a", "a/b"), Some("b"));
    assert_eq!(relative_to("a", "ab/c"), None);
}

#[test]
fn test_reserved_names_are_invalid() {
    assert!(!is_valid_name("commit"));
    assert!(!is_valid_name("tensors"));
    assert!(!is_valid_name(""));
    assert!(is_valid_name("images"));
}

#[test]
fn test_resolve() {
    let meta = meta(&["images", "g/labels"], &["g"]);

    assert_eq!(resolve(&meta, "", "images"), Resolved::Tensor("images".into()));
    assert_eq!(resolve(&meta, "", "/images/"), Resolved::Tensor("images".into()));
    assert_eq!(resolve(&meta, "", "g"), Resolved::Group("g".into()));
    assert_eq!(resolve(&meta, "", "g//labels"), Resolved::Tensor("g/labels".into()));
    assert_eq!(resolve(&meta, "g", "labels"), Resolved::Tensor("g/labels".into()));
    assert_eq!(resolve(&meta, "g", "images"), Resolved::NotFound);
    assert_eq!(resolve(&meta, "", "missing/labels"), Resolved::NotFound);
}

#[test]
fn test_check_new_tensor_order() {
    let meta = meta(&["images"], &["g"]);

    assert_matches!(
        check_new_tensor(&meta, "images", "images"),
        Err(CreateTensorError::AlreadyExists(e)) if e.name == "images"
    );
    assert_matches!(
        check_new_tensor(&meta, "g", "g"),
        Err(CreateTensorError::GroupAlreadyExists(_))
    );
    assert_matches!(
        check_new_tensor(&meta, "info", "info"),
        Err(CreateTensorError::InvalidName(_))
    );
    assert_matches!(
        check_new_tensor(&meta, "images/x", "images/x"),
        Err(CreateTensorError::AlreadyExists(e)) if e.name == "images"
    );
    assert_eq!(
        check_new_tensor(&meta, "g/h/x", "g/h/x").unwrap(),
        vec!["g/h".to_string()]
    );
}

#[test]
fn test_check_new_group() {
    let meta = meta(&["images"], &["g"]);

    assert_matches!(
        check_new_group(&meta, "images", "images"),
        Err(CreateGroupError::TensorAlreadyExists(_))
    );
    assert_matches!(
        check_new_group(&meta, "g", "g"),
        Err(CreateGroupError::GroupAlreadyExists(_))
    );
    assert_matches!(
        check_new_group(&meta, "", ""),
        Err(CreateGroupError::InvalidName(_))
    );
    assert_matches!(
        check_new_group(&meta, "images/meta", "images/meta"),
        Err(CreateGroupError::TensorAlreadyExists(e)) if e.name == "images"
    );
    assert_eq!(
        check_new_group(&meta, "a/b", "a/b").unwrap(),
        vec!["a".to_string(), "a/b".to_string()]
    );
}
