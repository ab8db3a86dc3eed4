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

use googletest::assert_that;
use googletest::prelude::contains_substring;
use googletest::prelude::eq;
use googletest::prelude::ge;
use googletest::prelude::le;
use streamsketch::error::ErrorKind;
use streamsketch::quantiles::QuantileDigest;
use streamsketch::quantiles::QuantileDigestFm;

use crate::common::uniform_stream;

fn values(seed: u64, len: usize, domain: i64) -> Vec<i64> {
    uniform_stream(seed, len, domain)
        .into_iter()
        .map(|v| v as i64)
        .collect()
}

/// Largest gap between the reported rank and the number of values not
/// above the reported quantile.
fn max_rank_error(digest: &QuantileDigest, data: &[i64]) -> u64 {
    let mut sorted = data.to_vec();
    sorted.sort_unstable();
    (1..10)
        .map(|i| {
            let estimate = digest.quantile(i as f64 / 10.0).unwrap();
            let truth = sorted.partition_point(|v| *v <= estimate.value()) as u64;
            estimate.rank().abs_diff(truth)
        })
        .max()
        .unwrap_or(0)
}

#[test]
fn test_rank_error_is_bounded() {
    let k = 100;
    let data: Vec<i64> = (0..10_000).map(|i| (i * 7919) % 1001).collect();
    let digest = QuantileDigest::from_values(k, 0, 1000, &data).unwrap();

    assert_that!(digest.input_length(), eq(10_000));
    assert_that!(digest.height(), eq(11));
    assert_that!(max_rank_error(&digest, &data), le(2 * 10_000 / k));
    assert_that!(digest.num_nodes(), le(3 * k as usize * digest.height()));
}

#[test]
fn test_quantiles_are_monotone() {
    let data = values(5, 5000, 1001);
    let digest = QuantileDigest::from_values(50, 0, 1000, &data).unwrap();
    let mut previous = i64::MIN;
    for i in 0..=20 {
        let estimate = digest.quantile(i as f64 / 20.0).unwrap();
        assert_that!(estimate.value(), ge(previous));
        previous = estimate.value();
    }
}

#[test]
fn test_merged_digest_keeps_the_bound() {
    let k = 100;
    let left = values(1, 10_000, 1001);
    let right = values(2, 10_000, 1001);
    let a = QuantileDigest::from_values(k, 0, 1000, &left).unwrap();
    let b = QuantileDigest::from_values(k, 0, 1000, &right).unwrap();

    let merged = a.merged(&b);
    let union: Vec<i64> = left.iter().chain(&right).copied().collect();
    assert_that!(merged.input_length(), eq(20_000));
    // random counts leave a few light ranges folded high up the tree
    assert_that!(max_rank_error(&merged, &union), le(5 * 20_000 / k));
}

#[test]
fn test_histogram_and_values_agree() {
    let data = values(9, 3000, 64);
    let mut histogram = std::collections::BTreeMap::new();
    for &v in &data {
        *histogram.entry(v).or_insert(0u64) += 1;
    }
    let from_values = QuantileDigest::from_values(16, 0, 63, &data).unwrap();
    let from_histogram = QuantileDigest::from_histogram(16, 0, 63, &histogram).unwrap();
    assert_eq!(from_values, from_histogram);
}

#[test]
fn test_out_of_domain_value_is_rejected() {
    let err = QuantileDigest::from_values(10, 0, 1000, &[10, 1001]).unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::InvalidArgument));
    assert_that!(err.message(), contains_substring("outside the digest domain"));
}

#[test]
fn test_fm_composite_merges_sites() {
    let east = QuantileDigest::from_values(20, 0, 255, &values(3, 2000, 256)).unwrap();
    let west = QuantileDigest::from_values(20, 0, 255, &values(4, 2000, 256)).unwrap();
    let east = QuantileDigestFm::from_digest("east", &east, 24, 16).unwrap();
    let west = QuantileDigestFm::from_digest("west", &west, 24, 16).unwrap();

    let merged = east.merged(&west).unwrap();
    assert_that!(merged.input_length(), ge(east.input_length().max(west.input_length())));
    assert_that!(merged.height(), eq(east.height()));

    let low = merged.quantile(0.1).unwrap();
    let high = merged.quantile(0.9).unwrap();
    assert_that!(low.value(), le(high.value()));
    assert_that!(high.value(), le(255));
}
