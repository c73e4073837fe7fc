// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::time::Duration;

use pretty_assertions::assert_eq;
use tensorvault::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[test]
fn test_defaults() {
    let config = DatasetConfig::default();

    assert_eq!(config.memory_cache_size, 256 * 1024 * 1024);
    assert_eq!(config.max_chunk_size, 32 * 1024 * 1024);
    assert_eq!(config.delete_safety_size, 1024 * 1024 * 1024);
    assert!(config.lock.enabled);
    assert_eq!(config.lock.update_interval(), Duration::from_secs(120));
    assert_eq!(config.lock.validity(), Duration::from_secs(300));
}

#[test]
fn test_partial_yaml_keeps_defaults() {
    let config = DatasetConfig::from_yaml_str(
        r#"
        maxChunkSize: 1024
        lock:
          updateInterval: 10s
        "#,
    )
    .unwrap();

    assert_eq!(config.max_chunk_size, 1024);
    assert_eq!(config.memory_cache_size, 256 * 1024 * 1024);
    assert_eq!(config.lock.update_interval(), Duration::from_secs(10));
    assert_eq!(config.lock.validity(), Duration::from_secs(300));
}

#[test]
fn test_unknown_fields_are_rejected() {
    assert!(DatasetConfig::from_yaml_str("maxChunkSiz: 1").is_err());
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "lock:\n  enabled: false\n").unwrap();

    let config = DatasetConfig::load(&path).unwrap();
    assert!(!config.lock.enabled);

    assert!(DatasetConfig::load(&dir.path().join("missing.yaml")).is_err());
}
