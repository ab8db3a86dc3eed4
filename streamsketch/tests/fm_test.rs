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

use std::collections::BTreeSet;

use googletest::assert_that;
use googletest::prelude::contains_substring;
use googletest::prelude::eq;
use googletest::prelude::lt;
use streamsketch::error::ErrorKind;
use streamsketch::fm::FmSketch;
use streamsketch::hash::HashType;

use crate::common::zipf_stream;

fn relative_error(estimate: u64, truth: usize) -> f64 {
    (estimate as f64 - truth as f64).abs() / truth as f64
}

#[test]
fn test_merge_subsumes_both_inputs() {
    for hash_type in [HashType::Universal, HashType::Sha1] {
        let mut a = FmSketch::new(16, 32, hash_type).unwrap();
        let mut b = FmSketch::new(16, 32, hash_type).unwrap();
        for id in zipf_stream(1, 2000, 500, 0.8) {
            a.insert(id);
        }
        for id in zipf_stream(2, 2000, 5000, 1.1) {
            b.insert(id);
        }

        let merged = a.merged(&b).unwrap();
        assert!(a.is_subsumed_by(&merged).unwrap());
        assert!(b.is_subsumed_by(&merged).unwrap());
        assert!(merged.count() >= a.count().max(b.count()));
        assert_eq!(FmSketch::merge_pair(&a, &b).unwrap(), merged);
        assert!(a.is_subsumed_by(&a).unwrap());
    }
}

#[test]
fn test_accuracy_improves_with_more_bitmaps() {
    let trials = 8u64;
    let mut small_error = 0.0;
    let mut large_error = 0.0;
    for trial in 0..trials {
        let base = trial * 1_000_000;
        let mut small = FmSketch::new(4, 32, HashType::Universal).unwrap();
        let mut large = FmSketch::new(256, 32, HashType::Universal).unwrap();
        let distinct: BTreeSet<u64> = zipf_stream(trial, 40_000, 20_000, 0.5)
            .into_iter()
            .map(|id| base + id)
            .collect();
        for &id in &distinct {
            small.insert(id);
            large.insert(id);
        }
        small_error += relative_error(small.count(), distinct.len());
        large_error += relative_error(large.count(), distinct.len());
    }
    let small_error = small_error / trials as f64;
    let large_error = large_error / trials as f64;

    assert_that!(large_error, lt(small_error));
    assert_that!(large_error, lt(0.2));
}

#[test]
fn test_duplicates_do_not_change_the_sketch() {
    let mut once = FmSketch::builder().build().unwrap();
    let mut twice = once.clone();
    for id in 0..500u64 {
        once.insert(id);
        twice.insert(id);
        twice.insert(id);
    }
    assert_eq!(twice, once);
}

#[test]
fn test_erase_is_unsupported() {
    let mut sketch = FmSketch::builder().build().unwrap();
    sketch.insert("x");
    let err = sketch.erase("x", 1).unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::Unsupported));
    assert_that!(err.message(), contains_substring("do not support deletions"));
}

#[test]
fn test_merge_rejects_other_dimensions() {
    let mut a = FmSketch::new(16, 32, HashType::Universal).unwrap();
    let b = FmSketch::new(16, 32, HashType::Sha1).unwrap();
    let c = FmSketch::new(8, 32, HashType::Universal).unwrap();
    for other in [&b, &c] {
        let err = a.merge(other).unwrap_err();
        assert_that!(err.kind(), eq(ErrorKind::InvalidArgument));
        assert_that!(err.message(), contains_substring("compatible"));
    }
}
