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
use tensorvault::*;

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn selected(index: &Index, len: usize) -> Vec<usize> {
    index.positions(0, len).unwrap().iter().collect()
}

#[test]
fn test_new_index_is_trivial() {
    let index = Index::new();
    assert!(index.is_trivial());
    assert!(!index.is_scalar());
    assert_eq!(index.length(7).unwrap(), 7);
    assert_eq!(selected(&index, 3), vec![0, 1, 2]);
}

#[test]
fn test_full_slice_keeps_index_trivial() {
    let index = Index::new().compose(..).unwrap();
    assert!(index.is_trivial());
    assert_eq!(index, Index::new());
}

#[test]
fn test_slice_then_int() {
    let index = Index::new().compose(2..8).unwrap().compose(1).unwrap();

    assert!(index.is_scalar());
    assert_eq!(selected(&index, 10), vec![3]);
    assert_eq!(
        index.positions(0, 10).unwrap(),
        Index::new().compose(3).unwrap().positions(0, 10).unwrap()
    );
}

#[test]
fn test_composition_equals_positions_of_composition() {
    let len = 20;
    let selectors: Vec<Selector> = vec![
        (1..15).into(),
        SliceSpec::new(None, None, Some(2)).into(),
        SliceSpec::new(None, None, Some(-1)).into(),
        vec![0, 2, -1].into(),
    ];

    for a in &selectors {
        for b in &selectors {
            let composed = Index::new().compose(a.clone()).unwrap();
            let outer = selected(&composed, len);

            let Ok(composed) = composed.compose(b.clone()) else {
                continue;
            };
            let Ok(actual) = composed.positions(0, len) else {
                continue;
            };

            let inner: Vec<usize> = Index::new()
                .compose(b.clone())
                .unwrap()
                .positions(0, outer.len())
                .unwrap()
                .iter()
                .collect();
            let expected: Vec<usize> = inner.into_iter().map(|i| outer[i]).collect();

            assert_eq!(actual.iter().collect::<Vec<_>>(), expected, "{a:?} then {b:?}");
        }
    }
}

#[test]
fn test_negative_step() {
    let index = Index::new()
        .compose(SliceSpec::new(None, None, Some(-2)))
        .unwrap();
    assert_eq!(selected(&index, 6), vec![5, 3, 1]);

    let index = Index::new()
        .compose(2..8)
        .unwrap()
        .compose(SliceSpec::new(None, None, Some(-1)))
        .unwrap();
    assert_eq!(selected(&index, 10), vec![7, 6, 5, 4, 3, 2]);
}

#[test]
fn test_negative_int_counts_from_end() {
    let index = Index::new().compose(-1).unwrap();
    assert_eq!(selected(&index, 5), vec![4]);
}

#[test]
fn test_slice_bounds_are_clamped() {
    let index = Index::new().compose(3..100).unwrap();
    assert_eq!(index.length(5).unwrap(), 2);

    let index = Index::new().compose(7..).unwrap();
    assert_eq!(index.length(5).unwrap(), 0);
}

#[test]
fn test_out_of_bounds() {
    let index = Index::new().compose(5).unwrap();
    assert_matches!(
        index.validate(5),
        Err(IndexError::OutOfBounds { index: 5, len: 5 })
    );
    assert_matches!(index.validate(6), Ok(()));

    let index = Index::new().compose(vec![0, 9]).unwrap();
    assert_matches!(index.length(3), Err(IndexError::OutOfBounds { .. }));
}

#[test]
fn test_zero_step() {
    assert_matches!(
        Index::new().compose(SliceSpec::new(None, None, Some(0))),
        Err(IndexError::ZeroStep)
    );
}

#[test]
fn test_int_is_not_subscriptable() {
    let index = Index::new().compose(1).unwrap();
    assert_matches!(
        index.compose(0),
        Err(IndexError::NotSubscriptable { axis: 0 })
    );
}

#[test]
fn test_tuple_selects_second_axis() {
    let index = Index::new().compose((1..3, 0..2)).unwrap();

    assert!(!index.is_trivial());
    assert!(!index.is_sample_axis_only());
    assert_eq!(index.num_axes(), 2);
    assert_eq!(
        index.positions(1, 4).unwrap().iter().collect::<Vec<_>>(),
        vec![0, 1]
    );
}

#[test]
fn test_display() {
    let index = Index::new().compose(2..8).unwrap().compose(1).unwrap();
    assert_eq!(index.to_string(), "Index([2:8][1])");
    assert_eq!(Index::new().to_string(), "Index([:])");
}

#[test]
fn test_serde() {
    let index = Index::new()
        .compose(2..8)
        .unwrap()
        .compose(vec![0, -1])
        .unwrap();
    let json = serde_json::to_string(&index).unwrap();
    let restored: Index = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, index);
}

#[test]
fn test_deserialize_rejects_malformed_index() {
    assert!(serde_json::from_str::<Index>(r#"{"axes":[]}"#).is_err());
    assert!(serde_json::from_str::<Index>(r#"{"axes":[[{"int":1},{"int":0}]]}"#).is_err());

    let index: Index = serde_json::from_str(r#"{"axes":[[]]}"#).unwrap();
    assert!(index.is_trivial());
    assert!(!index.is_scalar());
}

#[test]
fn test_restore_rejects_empty_index() {
    let json = r#"{
        "path": "/tmp/ds",
        "readOnly": false,
        "index": {"axes": []},
        "groupIndex": "",
        "versionState": {
            "commitId": "firstdbf9474d461a19e9333c2fd19b46115348f",
            "branch": "main",
            "commitNodeMap": {},
            "branchCommitMap": {}
        }
    }"#;
    assert!(DatasetState::from_json(json).is_err());
}
