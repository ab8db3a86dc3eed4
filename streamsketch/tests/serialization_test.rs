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
use streamsketch::ams::AmsSketch;
use streamsketch::ams::FastAmsSketch;
use streamsketch::bloom::BloomFilter;
use streamsketch::bloom::MultiBloomFilter;
use streamsketch::common::XorShift64;
use streamsketch::error::ErrorKind;
use streamsketch::fm::FmSketch;
use streamsketch::hash::HashType;
use streamsketch::lossy::LossyCounting;
use streamsketch::quantiles::QuantileDigest;
use streamsketch::quantiles::QuantileDigestFm;
use streamsketch::sampling::CountingSample;

use crate::common::assert_round_trip;
use crate::common::zipf_stream;

#[test]
fn test_fm_round_trip() {
    for hash_type in [HashType::Universal, HashType::Sha1] {
        let mut a = FmSketch::new(32, 24, hash_type).unwrap();
        let mut b = a.clone();
        for id in zipf_stream(1, 3000, 2000, 0.9) {
            a.insert(id);
        }
        b.insert_weighted("bulk", 5000);

        let merged = a.merged(&b).unwrap();
        for sketch in [&a, &b, &merged] {
            let decoded =
                assert_round_trip(&sketch.serialize(), FmSketch::deserialize, FmSketch::serialize);
            assert_eq!(&decoded, sketch);
            assert_that!(sketch.serialize().len(), eq(sketch.serialized_size()));
        }

        let mut cleared = merged.clone();
        cleared.clear();
        assert_round_trip(&cleared.serialize(), FmSketch::deserialize, FmSketch::serialize);
    }
}

#[test]
fn test_ams_round_trip() {
    let mut ams = AmsSketch::builder().dimensions(16, 3).seed(4).build().unwrap();
    let mut fast = FastAmsSketch::builder().num_counters(64).num_hashes(3).seed(4).build().unwrap();
    for id in zipf_stream(2, 1000, 300, 1.0) {
        ams.insert(id, 2);
        fast.insert(id, -1);
    }
    let ams = ams.merged(&ams.clone()).unwrap();
    let fast = fast.merged(&fast.clone()).unwrap();

    assert_round_trip(&ams.serialize(), AmsSketch::deserialize, AmsSketch::serialize);
    assert_round_trip(&fast.serialize(), FastAmsSketch::deserialize, FastAmsSketch::serialize);

    let mut ams = ams;
    ams.clear();
    let decoded = assert_round_trip(&ams.serialize(), AmsSketch::deserialize, AmsSketch::serialize);
    assert_that!(decoded.f2_norm(), eq(0.0));
}

#[test]
fn test_bloom_round_trip() {
    for hash_type in [HashType::Universal, HashType::Sha1] {
        let mut bloom = BloomFilter::builder()
            .num_bits(300)
            .num_hashes(4)
            .hash_type(hash_type)
            .seed(8)
            .build()
            .unwrap();
        let mut multi = MultiBloomFilter::builder()
            .num_bits(100)
            .num_hashes(4)
            .hash_type(hash_type)
            .seed(8)
            .build()
            .unwrap();
        for id in 0..50u64 {
            bloom.insert(id * 3);
            multi.insert(id * 3);
        }
        let decoded =
            assert_round_trip(&bloom.serialize(), BloomFilter::deserialize, BloomFilter::serialize);
        assert!(decoded.contains(42u64));
        let decoded = assert_round_trip(
            &multi.serialize(),
            MultiBloomFilter::deserialize,
            MultiBloomFilter::serialize,
        );
        assert!(decoded.contains(42u64));

        bloom.clear();
        assert_round_trip(&bloom.serialize(), BloomFilter::deserialize, BloomFilter::serialize);
    }
}

#[test]
fn test_lossy_and_sample_round_trip() {
    let mut lossy = LossyCounting::new(0.02).unwrap();
    let mut sample = CountingSample::new(32, XorShift64::seeded(6)).unwrap();
    let mut words = LossyCounting::new(0.1).unwrap();
    for id in zipf_stream(3, 4000, 500, 1.1) {
        lossy.insert(id);
        sample.insert(id);
        words.insert(format!("w{}", id % 20));
    }

    assert_round_trip(&lossy.serialize(), LossyCounting::<u64>::deserialize, LossyCounting::serialize);
    assert_round_trip(&words.serialize(), LossyCounting::<String>::deserialize, LossyCounting::serialize);
    let decoded = assert_round_trip(
        &sample.serialize(),
        |bytes| CountingSample::<u64>::deserialize(bytes, XorShift64::seeded(6)),
        CountingSample::serialize,
    );
    assert_eq!(decoded.sample(), sample.sample());
    assert_that!(decoded.sampling_factor(), eq(sample.sampling_factor()));

    sample.clear();
    assert_round_trip(
        &sample.serialize(),
        |bytes| CountingSample::<u64>::deserialize(bytes, XorShift64::seeded(6)),
        CountingSample::serialize,
    );
}

#[test]
fn test_quantile_digest_round_trip() {
    let data: Vec<i64> = zipf_stream(4, 5000, 1000, 0.6).into_iter().map(|v| v as i64).collect();
    let (left, right) = data.split_at(2500);
    let a = QuantileDigest::from_values(40, 0, 999, left).unwrap();
    let b = QuantileDigest::from_values(40, 0, 999, right).unwrap();
    let merged = a.merged(&b);
    for digest in [&a, &merged] {
        let decoded = assert_round_trip(
            &digest.serialize(),
            QuantileDigest::deserialize,
            QuantileDigest::serialize,
        );
        assert_eq!(&decoded, digest);
    }

    let fm = QuantileDigestFm::from_digest("site", &merged, 20, 8).unwrap();
    let fm = fm.merged(&QuantileDigestFm::from_digest("other", &a, 20, 8).unwrap()).unwrap();
    let decoded = assert_round_trip(
        &fm.serialize(),
        QuantileDigestFm::deserialize,
        QuantileDigestFm::serialize,
    );
    assert_eq!(decoded, fm);
}

#[test]
fn test_clones_are_independent() {
    let mut fm = FmSketch::builder().build().unwrap();
    let fm_copy = fm.clone();
    fm.insert(1u64);
    assert_ne!(fm, fm_copy);

    let mut bloom = BloomFilter::builder().seed(1).build().unwrap();
    let bloom_copy = bloom.clone();
    bloom.insert(1u64);
    assert_that!(bloom_copy.num_bits_set(), eq(0));

    let mut lossy = LossyCounting::new(0.1).unwrap();
    lossy.insert(1u64);
    let lossy_copy = lossy.clone();
    lossy.insert(1u64);
    assert_that!(lossy_copy.max_frequency(&1u64), eq(1));

    let mut sample = CountingSample::new(4, XorShift64::seeded(1)).unwrap();
    let sample_copy = sample.clone();
    sample.insert(1u64);
    assert!(sample_copy.is_empty());
}

#[test]
fn test_wrong_family_is_rejected() {
    let fm = FmSketch::builder().build().unwrap().serialize();
    let bloom = BloomFilter::builder().seed(1).build().unwrap().serialize();

    let err = BloomFilter::deserialize(&fm).unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::MalformedDeserializeData));
    assert_that!(err.message(), contains_substring("invalid family id"));

    let err = MultiBloomFilter::deserialize(&bloom).unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::MalformedDeserializeData));
    let err = AmsSketch::deserialize(&bloom).unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::MalformedDeserializeData));
    let err = LossyCounting::<u64>::deserialize(&fm).unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::MalformedDeserializeData));
    let err = QuantileDigest::deserialize(&[]).unwrap_err();
    assert_that!(err.kind(), eq(ErrorKind::MalformedDeserializeData));
}

#[test]
fn test_truncated_bytes_are_rejected() {
    let mut ams = AmsSketch::builder().seed(3).build().unwrap();
    ams.insert(1u64, 1);
    let bytes = ams.serialize();
    for len in [1, 10, bytes.len() - 1] {
        let err = AmsSketch::deserialize(&bytes[..len]).unwrap_err();
        assert_that!(err.kind(), eq(ErrorKind::MalformedDeserializeData));
    }
}
