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

use super::RandomSource;

/// Zipf-distributed integer generator over `[low, high)`.
///
/// Rank `r` (1-based) is drawn with probability proportional to `1 / r^skew`
/// and mapped to the value `low + r - 1`, so smaller values are the heavy
/// hitters. A skew of `0.0` yields the uniform distribution.
#[derive(Debug, Clone)]
pub struct Zipf<R> {
    low: i64,
    cdf: Vec<f64>,
    rng: R,
}

impl<R: RandomSource> Zipf<R> {
    /// Creates a generator.
    ///
    /// # Panics
    ///
    /// Panics if `low >= high` or `skew` is negative or not finite.
    pub fn new(low: i64, high: i64, skew: f64, rng: R) -> Self {
        assert!(low < high, "empty range [{low}, {high})");
        assert!(
            skew.is_finite() && skew >= 0.0,
            "skew must be a non-negative number, got {skew}"
        );

        let n = (high - low) as usize;
        let mut cdf = Vec::with_capacity(n);
        let mut sum = 0.0;
        for rank in 1..=n {
            sum += 1.0 / (rank as f64).powf(skew);
            cdf.push(sum);
        }
        for p in &mut cdf {
            *p /= sum;
        }

        Zipf { low, cdf, rng }
    }

    /// Draws the next value.
    pub fn next_long(&mut self) -> i64 {
        let u = self.rng.next_uniform_double();
        let idx = self.cdf.partition_point(|p| *p <= u);
        self.low + idx.min(self.cdf.len() - 1) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::XorShift64;

    #[test]
    fn test_values_stay_in_range() {
        let mut zipf = Zipf::new(10, 20, 1.2, XorShift64::seeded(3));
        for _ in 0..5_000 {
            let v = zipf.next_long();
            assert!((10..20).contains(&v));
        }
    }

    #[test]
    fn test_skew_favours_small_values() {
        let mut zipf = Zipf::new(0, 100, 1.5, XorShift64::seeded(5));
        let mut counts = vec![0u32; 100];
        for _ in 0..20_000 {
            counts[zipf.next_long() as usize] += 1;
        }
        assert!(counts[0] > counts[1]);
        assert!(counts[1] > counts[50]);
    }
}
