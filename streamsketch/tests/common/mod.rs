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

#![allow(dead_code)]

use streamsketch::common::RandomSource;
use streamsketch::common::XorShift64;
use streamsketch::common::Zipf;
use streamsketch::error::Error;

/// Draws `len` Zipf-distributed ids from `[0, domain)`.
pub fn zipf_stream(seed: u64, len: usize, domain: i64, skew: f64) -> Vec<u64> {
    let mut zipf = Zipf::new(0, domain, skew, XorShift64::seeded(seed));
    (0..len).map(|_| zipf.next_long() as u64).collect()
}

/// Draws `len` uniform ids from `[0, domain)`.
pub fn uniform_stream(seed: u64, len: usize, domain: i64) -> Vec<u64> {
    let mut rng = XorShift64::seeded(seed);
    (0..len)
        .map(|_| rng.next_uniform_long(0, domain) as u64)
        .collect()
}

/// Decodes `bytes` and checks that re-encoding reproduces them exactly.
pub fn assert_round_trip<T>(
    bytes: &[u8],
    decode: impl Fn(&[u8]) -> Result<T, Error>,
    encode: impl Fn(&T) -> Vec<u8>,
) -> T {
    let decoded = decode(bytes).unwrap();
    assert_eq!(encode(&decoded), bytes);
    decoded
}
