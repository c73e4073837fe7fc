// Copyright Kamu Data, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Layout of dataset objects within a storage provider

use tensorvault_storage::join_key;

pub const VERSION_CONTROL_INFO_KEY: &str = "version_control_info.json";
pub const DATASET_LOCK_KEY: &str = "dataset_lock.lock";

pub const VERSIONS_DIR: &str = "versions";
pub const DATASET_META_FILE: &str = "dataset_meta.json";
pub const DATASET_INFO_FILE: &str = "dataset_info.json";
pub const TENSOR_META_FILE: &str = "tensor_meta.json";
pub const TENSOR_INFO_FILE: &str = "tensor_info.json";
pub const CHUNKS_DIR: &str = "chunks";

pub fn dataset_meta_key(commit_id: &str) -> String {
    join_key([VERSIONS_DIR, commit_id, DATASET_META_FILE])
}

pub fn dataset_info_key(commit_id: &str) -> String {
    join_key([VERSIONS_DIR, commit_id, DATASET_INFO_FILE])
}

pub fn tensor_meta_key(commit_id: &str, tensor: &str) -> String {
    join_key([VERSIONS_DIR, commit_id, tensor, TENSOR_META_FILE])
}

pub fn tensor_info_key(commit_id: &str, tensor: &str) -> String {
    join_key([VERSIONS_DIR, commit_id, tensor, TENSOR_INFO_FILE])
}

/// Chunks are immutable once their commit is finalized and therefore are
/// shared between all versions
pub fn chunk_key(tensor: &str, chunk_id: &str) -> String {
    join_key([tensor, CHUNKS_DIR, chunk_id])
}
