// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

mod common;

use std::collections::BTreeMap;

use googletest::assert_that;
use googletest::prelude::eq;
use googletest::prelude::le;
use streamsketch::ams::AmsSketch;
use streamsketch::ams::FastAmsSketch;
use streamsketch::error::ErrorKind;

use crate::common::zipf_stream;

fn histogram(ids: &[u64]) -> BTreeMap<u64, i64> {
    let mut counts = BTreeMap::new();
    for &id in ids {
        *counts.entry(id).or_insert(0) += 1;
    }
    counts
}

#[test]
fn test_f2_norm_tracks_exact_moment() {
    let ids = zipf_stream(17, 20_000, 1000, 1.0);
    let exact: f64 = histogram(&ids).values().map(|&c| (c * c) as f64).sum();

    let mut sketch = AmsSketch::builder()
        .dimensions(256, 7)
        .seed(3)
        .build()
        .unwrap();
    for &id in &ids {
        sketch.insert(id, 1);
    }
    let error = (sketch.f2_norm() - exact).abs() / exact;
    assert_that!(error, le(0.3));
}

#[test]
fn test_fast_ams_point_frequency() {
    let ids = zipf_stream(23, 20_000, 1000, 1.2);
    let counts = histogram(&ids);
    let mut sketch = FastAmsSketch::builder()
        .num_counters(1024)
        .num_hashes(5)
        .seed(9)
        .build()
        .unwrap();
    for &id in &ids {
        sketch.insert(id, 1);
    }
    for id in 0..10u64 {
        let truth = counts.get(&id).copied().unwrap_or(0);
        let estimate = sketch.frequency(id);
        assert_that!((estimate - truth).abs(), le(1000));
    }
}

#[test]
fn test_erase_inverts_insert() {
    let ids = zipf_stream(4, 2000, 100, 0.9);
    let mut ams = AmsSketch::builder().seed(1).build().unwrap();
    let mut fast = FastAmsSketch::builder().seed(1).build().unwrap();
    let empty_ams = ams.clone();
    let empty_fast = fast.clone();
    for &id in &ids {
        ams.insert(id, 3);
        fast.insert(id, 3);
    }
    for &id in &ids {
        ams.erase(id, 3);
        fast.erase(id, 3);
    }
    assert_eq!(ams, empty_ams);
    assert_eq!(fast, empty_fast);
    assert_that!(ams.f2_norm(), eq(0.0));
    assert_that!(fast.frequency(7u64), eq(0));
}

#[test]
fn test_merge_equals_sketch_of_union() {
    let left = zipf_stream(5, 3000, 500, 1.0);
    let right = zipf_stream(6, 3000, 500, 1.0);

    let build = || AmsSketch::builder().dimensions(32, 3).seed(77).build().unwrap();
    let (mut a, mut b, mut both) = (build(), build(), build());
    for &id in &left {
        a.insert(id, 1);
        both.insert(id, 1);
    }
    for &id in &right {
        b.insert(id, 1);
        both.insert(id, 1);
    }
    assert_eq!(a.merged(&b).unwrap().serialize(), both.serialize());

    let build = || FastAmsSketch::builder().num_counters(64).num_hashes(3).seed(77).build().unwrap();
    let (mut a, mut b, mut both) = (build(), build(), build());
    for &id in &left {
        a.insert(id, 1);
        both.insert(id, 1);
    }
    for &id in &right {
        b.insert(id, 1);
        both.insert(id, 1);
    }
    a.merge(&b).unwrap();
    assert_eq!(a.serialize(), both.serialize());
}

#[test]
fn test_merge_requires_same_seed() {
    let mut a = AmsSketch::builder().seed(1).build().unwrap();
    let b = AmsSketch::builder().seed(2).build().unwrap();
    let err = a.merge(&b).unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::InvalidArgument));

    let mut a = FastAmsSketch::builder().seed(1).build().unwrap();
    let b = FastAmsSketch::builder().seed(1).num_counters(16).build().unwrap();
    let err = a.merge(&b).unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::InvalidArgument));
}

#[test]
fn test_accuracy_config_sizes_the_sketch() {
    let sketch = AmsSketch::builder()
        .accuracy(0.1, 0.01)
        .seed(2)
        .build()
        .unwrap();
    assert!(sketch.group_size() > 1);
    assert!(sketch.num_groups() > 1);

    let err = AmsSketch::builder().accuracy(0.0, 0.5).build().unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::ConfigInvalid));
}
