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
use crate::common::stats::median_f64;
use crate::common::time_seed;
use crate::error::Error;
use crate::hash::ItemId;
use crate::hash::UniversalHash;

const DEFAULT_GROUP_SIZE: usize = 64;
const DEFAULT_NUM_GROUPS: usize = 5;

/// An AMS sketch estimating the second frequency moment (F2) and point
/// frequencies of a stream with signed updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmsSketch {
    seed: u64,
    group_size: usize,
    num_groups: usize,
    hashes: Vec<UniversalHash>,
    counters: Vec<i64>,
}

impl AmsSketch {
    /// Returns a builder with 5 groups of 64 counters and a time-based seed.
    pub fn builder() -> AmsSketchBuilder {
        AmsSketchBuilder::default()
    }

    fn with_dimensions(group_size: usize, num_groups: usize, seed: u64) -> Self {
        let len = group_size * num_groups;
        let mut rng = XorShift64::seeded(seed);
        let hashes = (0..len)
            .map(|_| UniversalHash::with_independence(&mut rng, SIGN_HASH_INDEPENDENCE))
            .collect();
        AmsSketch {
            seed,
            group_size,
            num_groups,
            hashes,
            counters: vec![0; len],
        }
    }

    /// Adds `value` occurrences of `id`; negative values subtract.
    ///
    /// Counters wrap on overflow.
    pub fn insert<'a>(&mut self, id: impl Into<ItemId<'a>>, value: i64) {
        self.update(id.into().key(), value, true);
    }

    /// Removes `value` occurrences of `id`, the exact inverse of
    /// [`insert`](Self::insert).
    pub fn erase<'a>(&mut self, id: impl Into<ItemId<'a>>, value: i64) {
        self.update(id.into().key(), value, false);
    }

    fn update(&mut self, key: u64, value: i64, adding: bool) {
        for (counter, hash) in self.counters.iter_mut().zip(&self.hashes) {
            let positive = hash.hash(key) & 1 == 1;
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

    /// Estimates the second frequency moment: the median over groups of the
    /// mean squared counter.
    pub fn f2_norm(&self) -> f64 {
        let mut estimates: Vec<f64> = self
            .counters
            .chunks(self.group_size)
            .map(|group| {
                let sum: f64 = group.iter().map(|c| (*c as f64).powi(2)).sum();
                sum / self.group_size as f64
            })
            .collect();
        median_f64(&mut estimates)
    }

    /// Estimates the frequency of `id`.
    ///
    /// The counters are projected onto the unit vector of `id`: the squared
    /// distance between the normalized sketch and that unit vector gives the
    /// cosine, and the frequency is `cosine × sqrt(F2)`.
    pub fn frequency<'a>(&self, id: impl Into<ItemId<'a>>) -> i64 {
        let norm = self.f2_norm().sqrt();
        if norm == 0.0 {
            return 0;
        }

        let key = id.into().key();
        let mut distances: Vec<f64> = self
            .counters
            .chunks(self.group_size)
            .zip(self.hashes.chunks(self.group_size))
            .map(|(group, hashes)| {
                let sum: f64 = group
                    .iter()
                    .zip(hashes)
                    .map(|(c, h)| {
                        let unit = if h.hash(key) & 1 == 1 { 1.0 } else { -1.0 };
                        (*c as f64 / norm - unit).powi(2)
                    })
                    .sum();
                sum / self.group_size as f64
            })
            .collect();
        let distance = median_f64(&mut distances);
        ((1.0 - distance / 2.0) * norm) as i64
    }

    /// Adds the counters of `other` to this sketch.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
    /// unless both sketches have the same dimensions and seed.
    pub fn merge(&mut self, other: &AmsSketch) -> Result<(), Error> {
        if self.group_size != other.group_size
            || self.num_groups != other.num_groups
            || self.seed != other.seed
        {
            return Err(Error::incompatible("AMS"));
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
    pub fn merged(&self, other: &AmsSketch) -> Result<AmsSketch, Error> {
        let mut result = self.clone();
        result.merge(other)?;
        Ok(result)
    }

    /// Returns the number of counters averaged per group.
    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// Returns the number of groups the median is taken over.
    pub fn num_groups(&self) -> usize {
        self.num_groups
    }

    /// Returns the seed the hash functions were drawn from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the exact length of [`serialize`](Self::serialize).
    pub fn serialized_size(&self) -> usize {
        HEADER_BYTES + self.counters.len() * COUNTER_BYTES
    }

    /// Serializes the sketch to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = SketchBytes::with_capacity(self.serialized_size());
        bytes.write_u8(Family::AMS.id);
        bytes.write_u64(self.group_size as u64);
        bytes.write_u64(self.num_groups as u64);
        bytes.write_u64(self.seed);
        for counter in &self.counters {
            bytes.write_i64(*counter);
        }
        bytes.into_bytes()
    }

    /// Deserializes a sketch from bytes, drawing the hash functions again
    /// from the stored seed.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is truncated or malformed.
    pub fn deserialize(bytes: &[u8]) -> Result<AmsSketch, Error> {
        let mut cursor = SketchSlice::new(bytes);
        ensure_family(&mut cursor, &Family::AMS)?;
        let group_size = cursor.read_u64().map_err(make_error("group_size"))?;
        let num_groups = cursor.read_u64().map_err(make_error("num_groups"))?;
        let seed = cursor.read_u64().map_err(make_error("seed"))?;
        if group_size == 0 || num_groups == 0 {
            return Err(Error::deserial("AMS dimensions must be positive")
                .with_context("group_size", group_size)
                .with_context("num_groups", num_groups));
        }
        let len = group_size
            .checked_mul(num_groups)
            .ok_or_else(|| Error::deserial("AMS dimensions overflow"))?;
        ensure_len(&cursor, len, COUNTER_BYTES, "counters")?;

        let mut sketch = AmsSketch::with_dimensions(group_size as usize, num_groups as usize, seed);
        for counter in &mut sketch.counters {
            *counter = cursor.read_i64().map_err(make_error("counters"))?;
        }
        ensure_consumed(&cursor, &Family::AMS)?;
        Ok(sketch)
    }
}

impl fmt::Display for AmsSketch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.group_size, self.num_groups, self.seed)?;
        for hash in &self.hashes {
            write!(f, " {hash}")?;
        }
        for counter in &self.counters {
            write!(f, " {counter}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Dimensions {
    Explicit { group_size: usize, num_groups: usize },
    Accuracy { epsilon: f64, delta: f64 },
}

/// Builder for [`AmsSketch`].
#[derive(Debug, Clone)]
pub struct AmsSketchBuilder {
    dimensions: Dimensions,
    seed: Option<u64>,
}

impl Default for AmsSketchBuilder {
    fn default() -> Self {
        AmsSketchBuilder {
            dimensions: Dimensions::Explicit {
                group_size: DEFAULT_GROUP_SIZE,
                num_groups: DEFAULT_NUM_GROUPS,
            },
            seed: None,
        }
    }
}

impl AmsSketchBuilder {
    /// Sizes the sketch explicitly: `num_groups` groups of `group_size`
    /// counters each.
    pub fn dimensions(mut self, group_size: usize, num_groups: usize) -> Self {
        self.dimensions = Dimensions::Explicit {
            group_size,
            num_groups,
        };
        self
    }

    /// Sizes the sketch for relative error `epsilon` with failure probability
    /// `delta`: `ceil(16 / epsilon²)` counters per group and
    /// `ceil(2 log2(1 / delta))` groups.
    pub fn accuracy(mut self, epsilon: f64, delta: f64) -> Self {
        self.dimensions = Dimensions::Accuracy { epsilon, delta };
        self
    }

    /// Sets the seed of the hash functions.
    ///
    /// Sketches must share a seed to be merged. Without a seed the sketch is
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
    /// dimension is zero, `epsilon` is not positive, `delta` is not in
    /// `(0, 1)`, or the counters would not fit in memory.
    pub fn build(self) -> Result<AmsSketch, Error> {
        let (group_size, num_groups) = match self.dimensions {
            Dimensions::Explicit {
                group_size,
                num_groups,
            } => (group_size, num_groups),
            Dimensions::Accuracy { epsilon, delta } => {
                if !(epsilon > 0.0 && epsilon.is_finite()) {
                    return Err(Error::config_invalid(format!(
                        "epsilon must be a positive number, got {epsilon}"
                    )));
                }
                if !(delta > 0.0 && delta < 1.0) {
                    return Err(Error::config_invalid(format!(
                        "delta must be in (0, 1), got {delta}"
                    )));
                }
                let group_size = (16.0 / (epsilon * epsilon)).ceil() as usize;
                let num_groups = (2.0 * (1.0 / delta).log2()).ceil() as usize;
                (group_size, num_groups)
            }
        };

        if group_size == 0 || num_groups == 0 {
            return Err(Error::config_invalid(format!(
                "AMS dimensions must be positive, got {group_size} x {num_groups}"
            )));
        }
        match group_size.checked_mul(num_groups) {
            Some(len) if len <= MAX_COUNTERS => {}
            _ => {
                return Err(Error::config_invalid(format!(
                    "AMS sketches hold at most {MAX_COUNTERS} counters"
                )));
            }
        }
        let seed = self.seed.unwrap_or_else(time_seed);
        Ok(AmsSketch::with_dimensions(group_size, num_groups, seed))
    }
}
