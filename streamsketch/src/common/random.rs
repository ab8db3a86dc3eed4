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

//! Shared random utilities for sketches.

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

const GOLDEN_GAMMA: u64 = 0x9e3779b97f4a7c15;

/// Random number source for sketches.
pub trait RandomSource {
    /// Returns the next random 64-bit value.
    fn next_u64(&mut self) -> u64;

    /// Returns a random boolean value.
    fn next_bool(&mut self) -> bool {
        (self.next_u64() & 1) != 0
    }

    /// Returns a double uniformly distributed in `[0, 1)`.
    fn next_uniform_double(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Returns an integer uniformly distributed in `[low, high)`.
    ///
    /// # Panics
    ///
    /// Panics if `low >= high`.
    fn next_uniform_long(&mut self, low: i64, high: i64) -> i64 {
        assert!(low < high, "empty range [{low}, {high})");
        let span = high.wrapping_sub(low) as u64;
        let offset = ((self.next_u64() as u128 * span as u128) >> 64) as u64;
        low.wrapping_add(offset as i64)
    }
}

/// Xorshift-based random generator for sketch operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Creates a new generator using the provided seed.
    ///
    /// The seed goes through a SplitMix64 finalizer first, so consecutive
    /// seeds (for example item ids) produce unrelated sequences.
    pub fn seeded(seed: u64) -> Self {
        let state = splitmix64(seed);
        let state = if state == 0 { GOLDEN_GAMMA } else { state };
        Self { state }
    }
}

impl Default for XorShift64 {
    /// Seeds from wall-clock time and the process id; the resulting sequence
    /// is not reproducible.
    fn default() -> Self {
        Self::seeded(time_seed())
    }
}

impl RandomSource for XorShift64 {
    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_u64(&mut self) -> u64 {
        (**self).next_u64()
    }
}

/// A seed derived from the clock, for sketches built without an explicit one.
pub(crate) fn time_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    nanos as u64 ^ (std::process::id() as u64)
}

fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}
