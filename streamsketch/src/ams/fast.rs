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

use std::fmt;

use super::serialization::COUNTER_BYTES;
use super::serialization::HEADER_BYTES;
use super::serialization::MAX_COUNTERS;
use super::serialization::SIGN_HASH_INDEPENDENCE;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::codec::assert::ensure_consumed;
use crate::codec::assert::ensure_family;
use crate::codec::assert::ensure_len;
use crate::codec::assert::make_error;
use crate::codec::family::Family;
use crate::common::XorShift64;
use crate::common::stats::median_i64;
use crate::common::time_seed;
use crate::error::Error;
use crate::hash::ItemId;
use crate::hash::UniversalHash;

const DEFAULT_NUM_COUNTERS: usize = 1024;
const DEFAULT_NUM_HASHES: usize = 5;

/// A Fast-AMS sketch: one row of counters per hash pair, each update
/// touching a single counter per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastAmsSketch {
    seed: u64,
    num_counters: usize,
    bucket_hashes: Vec<UniversalHash>,
    sign_hashes: Vec<UniversalHash>,
    counters: Vec<i64>,
}

impl FastAmsSketch {
    /// Returns a builder with 5 rows of 1024 counters and a time-based seed.
    pub fn builder() -> FastAmsSketchBuilder {
        FastAmsSketchBuilder::default()
    }

    fn with_dimensions(num_counters: usize, num_hashes: usize, seed: u64) -> Self {
        let mut rng = XorShift64::seeded(seed);
        let mut bucket_hashes = Vec::with_capacity(num_hashes);
        let mut sign_hashes = Vec::with_capacity(num_hashes);
        for _ in 0..num_hashes {
            bucket_hashes.push(UniversalHash::new(&mut rng));
            sign_hashes.push(UniversalHash::with_independence(
                &mut rng,
                SIGN_HASH_INDEPENDENCE,
            ));
        }
        FastAmsSketch {
            seed,
            num_counters,
            bucket_hashes,
            sign_hashes,
            counters: vec![0; num_counters * num_hashes],
        }
    }

    /// Adds `value` occurrences of `id`; negative values subtract.
    ///
    /// Counters wrap on overflow, so updates stay linear and an
    /// [`erase`](Self::erase) of the same value always restores them.
    pub fn insert<'a>(&mut self, id: impl Into<ItemId<'a>>, value: i64) {
        self.update(id.into().key(), value, true);
    }

    /// Removes `value` occurrences of `id`.
    pub fn erase<'a>(&mut self, id: impl Into<ItemId<'a>>, value: i64) {
        self.update(id.into().key(), value, false);
    }

    fn update(&mut self, key: u64, value: i64, adding: bool) {
        for row in 0..self.bucket_hashes.len() {
            let (cell, positive) = self.locate(row, key);
            let counter = &mut self.counters[cell];
            *counter = if positive == adding {
                counter.wrapping_add(value)
            } else {
                counter.wrapping_sub(value)
            };
        }
    }

    /// Zeroes every counter. The seed and hash functions are kept.
    pub fn clear(&mut self) {
        self.counters.fill(0);
    }

    /// Estimates the frequency of `id` as the median over rows of its signed
    /// counter.
    pub fn frequency<'a>(&self, id: impl Into<ItemId<'a>>) -> i64 {
        let key = id.into().key();
        let mut estimates: Vec<i64> = (0..self.bucket_hashes.len())
            .map(|row| {
                let (cell, positive) = self.locate(row, key);
                if positive {
                    self.counters[cell]
                } else {
                    self.counters[cell].wrapping_neg()
                }
            })
            .collect();
        median_i64(&mut estimates)
    }

    /// Adds the counters of `other` to this sketch.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
    /// unless both sketches have the same dimensions and seed.
    pub fn merge(&mut self, other: &FastAmsSketch) -> Result<(), Error> {
        if self.num_counters != other.num_counters
            || self.num_hashes() != other.num_hashes()
            || self.seed != other.seed
        {
            return Err(Error::incompatible("Fast-AMS"));
        }
        for (mine, theirs) in self.counters.iter_mut().zip(&other.counters) {
            *mine = mine.wrapping_add(*theirs);
        }
        Ok(())
    }

    /// Returns the sum of this sketch and `other`.
    ///
    /// # Errors
    ///
    /// See [`merge`](Self::merge).
    pub fn merged(&self, other: &FastAmsSketch) -> Result<FastAmsSketch, Error> {
        let mut result = self.clone();
        result.merge(other)?;
        Ok(result)
    }

    /// Returns the number of counters per row.
    pub fn num_counters(&self) -> usize {
        self.num_counters
    }

    /// Returns the number of rows, one per hash pair.
    pub fn num_hashes(&self) -> usize {
        self.bucket_hashes.len()
    }

    /// Returns the seed the hash functions were drawn from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the exact length of [`serialize`](Self::serialize).
    pub fn serialized_size(&self) -> usize {
        HEADER_BYTES + self.counters.len() * COUNTER_BYTES
    }

    /// Serializes the sketch to bytes. Hash functions are not written; the
    /// decoder draws them again from the seed.
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = SketchBytes::with_capacity(self.serialized_size());
        bytes.write_u8(Family::FAST_AMS.id);
        bytes.write_u64(self.num_hashes() as u64);
        bytes.write_u64(self.num_counters as u64);
        bytes.write_u64(self.seed);
        for counter in &self.counters {
            bytes.write_i64(*counter);
        }
        bytes.into_bytes()
    }

    /// Deserializes a sketch from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is truncated or malformed.
    pub fn deserialize(bytes: &[u8]) -> Result<FastAmsSketch, Error> {
        let mut cursor = SketchSlice::new(bytes);
        ensure_family(&mut cursor, &Family::FAST_AMS)?;
        let num_hashes = cursor.read_u64().map_err(make_error("num_hashes"))?;
        let num_counters = cursor.read_u64().map_err(make_error("num_counters"))?;
        let seed = cursor.read_u64().map_err(make_error("seed"))?;
        if num_hashes == 0 || num_counters == 0 {
            return Err(Error::deserial("Fast-AMS dimensions must be positive")
                .with_context("num_hashes", num_hashes)
                .with_context("num_counters", num_counters));
        }
        let len = num_hashes
            .checked_mul(num_counters)
            .ok_or_else(|| Error::deserial("Fast-AMS dimensions overflow"))?;
        ensure_len(&cursor, len, COUNTER_BYTES, "counters")?;

        let mut sketch =
            FastAmsSketch::with_dimensions(num_counters as usize, num_hashes as usize, seed);
        for counter in &mut sketch.counters {
            *counter = cursor.read_i64().map_err(make_error("counters"))?;
        }
        ensure_consumed(&cursor, &Family::FAST_AMS)?;
        Ok(sketch)
    }

    fn locate(&self, row: usize, key: u64) -> (usize, bool) {
        let bucket = (self.bucket_hashes[row].hash(key) % self.num_counters as u64) as usize;
        let positive = self.sign_hashes[row].hash(key) & 1 == 1;
        (row * self.num_counters + bucket, positive)
    }
}

/// Dumps the dimensions, every bucket hash, every sign hash and the counters.
///
/// Unlike [`FastAmsSketch::serialize`] the dump spells out the hash functions.
impl fmt::Display for FastAmsSketch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.num_hashes(), self.num_counters)?;
        for hash in self.bucket_hashes.iter().chain(&self.sign_hashes) {
            write!(f, " {hash}")?;
        }
        for counter in &self.counters {
            write!(f, " {counter}")?;
        }
        Ok(())
    }
}

/// Builder for [`FastAmsSketch`].
#[derive(Debug, Clone)]
pub struct FastAmsSketchBuilder {
    num_counters: usize,
    num_hashes: usize,
    seed: Option<u64>,
}

impl Default for FastAmsSketchBuilder {
    fn default() -> Self {
        FastAmsSketchBuilder {
            num_counters: DEFAULT_NUM_COUNTERS,
            num_hashes: DEFAULT_NUM_HASHES,
            seed: None,
        }
    }
}

impl FastAmsSketchBuilder {
    /// Sets the number of counters per row.
    pub fn num_counters(mut self, num_counters: usize) -> Self {
        self.num_counters = num_counters;
        self
    }

    /// Sets the number of rows.
    pub fn num_hashes(mut self, num_hashes: usize) -> Self {
        self.num_hashes = num_hashes;
        self
    }

    /// Sets the seed of the hash functions. Without a seed the sketch is
    /// seeded from the clock and is not reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builds the sketch.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid) if a
    /// dimension is zero or the counters would not fit in memory.
    pub fn build(self) -> Result<FastAmsSketch, Error> {
        if self.num_counters == 0 || self.num_hashes == 0 {
            return Err(Error::config_invalid(format!(
                "Fast-AMS dimensions must be positive, got {} x {}",
                self.num_hashes, self.num_counters
            )));
        }
        match self.num_counters.checked_mul(self.num_hashes) {
            Some(len) if len <= MAX_COUNTERS => {}
            _ => {
                return Err(Error::config_invalid(format!(
                    "Fast-AMS sketches hold at most {MAX_COUNTERS} counters"
                )));
            }
        }
        let seed = self.seed.unwrap_or_else(time_seed);
        Ok(FastAmsSketch::with_dimensions(
            self.num_counters,
            self.num_hashes,
            seed,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn sketch(seed: u64) -> FastAmsSketch {
        FastAmsSketch::builder()
            .num_counters(256)
            .num_hashes(5)
            .seed(seed)
            .build()
            .unwrap()
    }

    #[test]
    fn test_update_touches_one_counter_per_row() {
        let mut s = sketch(1);
        s.insert(10u64, 3);
        let touched = s.counters.iter().filter(|c| **c != 0).count();
        assert_eq!(touched, 5);
        assert!(s.counters.iter().all(|c| c.abs() == 3 || *c == 0));
        assert_eq!(s.frequency(10u64), 3);
    }

    #[test]
    fn test_heavy_item_dominates() {
        let mut s = sketch(2);
        s.insert(7u64, 1_000);
        for id in 100..300u64 {
            s.insert(id, 1);
        }
        let estimate = s.frequency(7u64);
        assert!((990..=1_010).contains(&estimate), "estimate = {estimate}");
    }

    #[test]
    fn test_erase_restores_empty() {
        let mut s = sketch(3);
        s.insert("x", 4);
        s.erase("x", 4);
        assert_eq!(s, sketch(3));
    }

    #[test]
    fn test_merge_adds_counters() {
        let mut a = sketch(4);
        let mut b = sketch(4);
        a.insert(1u64, 2);
        b.insert(1u64, 5);
        a.merge(&b).unwrap();
        assert_eq!(a.frequency(1u64), 7);

        let other = sketch(5);
        assert_eq!(a.merge(&other).unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let err = FastAmsSketch::builder().num_counters(0).seed(1).build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        let err = FastAmsSketch::builder().num_hashes(0).seed(1).build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_counters_wrap_at_extremes() {
        let mut s = sketch(7);
        s.erase(7u64, i64::MIN);
        assert_eq!(s.frequency(7u64), i64::MIN);
        s.insert(7u64, i64::MIN);
        assert_eq!(s, sketch(7));

        s.insert(7u64, i64::MAX);
        s.insert(7u64, 1);
        assert_eq!(s.frequency(7u64), i64::MIN);
        s.erase(7u64, 1);
        s.erase(7u64, i64::MAX);
        assert_eq!(s, sketch(7));

        let mut a = sketch(8);
        let mut b = sketch(8);
        a.insert(3u64, i64::MAX);
        b.insert(3u64, 1);
        a.merge(&b).unwrap();
        assert_eq!(a.frequency(3u64), i64::MIN);
    }

    #[test]
    fn test_oversized_dimensions_rejected() {
        let err = FastAmsSketch::builder()
            .num_counters(usize::MAX)
            .num_hashes(1)
            .seed(1)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        let err = FastAmsSketch::builder()
            .num_counters(1 << 40)
            .num_hashes(1 << 30)
            .seed(1)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_display_spells_out_hashes() {
        let s = FastAmsSketch::builder()
            .num_counters(2)
            .num_hashes(1)
            .seed(6)
            .build()
            .unwrap();
        let shown = s.to_string();
        assert!(shown.starts_with("1 2 2 "));
        assert!(shown.contains(&format!(" {} ", s.sign_hashes[0])));
        assert!(shown.ends_with(" 0 0"));
    }
}
