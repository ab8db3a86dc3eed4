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

use std::collections::BTreeMap;
use std::fmt;

use super::node::DigestNode;
use super::node::NodeKey;
use super::node::QuantileEstimate;
use super::node::tree_fits;
use super::node::tree_height;
use super::serialization::HEADER_BYTES;
use super::serialization::LEVEL_BYTES;
use super::serialization::NODE_BYTES;
use super::tree;
use super::tree::Level;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::codec::assert::ensure_consumed;
use crate::codec::assert::ensure_family;
use crate::codec::assert::ensure_len;
use crate::codec::assert::make_error;
use crate::codec::family::Family;
use crate::error::Error;

/// A Quantile Digest over the integer domain `[min, max]`.
///
/// See the [module level documentation](super) for more.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantileDigest {
    pub(super) min: i64,
    pub(super) max: i64,
    pub(super) k: u64,
    input_length: u64,
    pub(super) levels: Vec<Level<u64>>,
}

impl QuantileDigest {
    /// Builds a digest of `values` with compression factor `k`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid) for
    /// a zero `k` or an empty or unrepresentable domain, and
    /// [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument) if a
    /// value lies outside `[min, max]`.
    pub fn from_values(k: u64, min: i64, max: i64, values: &[i64]) -> Result<Self, Error> {
        let mut histogram = BTreeMap::new();
        for &v in values {
            *histogram.entry(v).or_insert(0u64) += 1;
        }
        Self::from_histogram(k, min, max, &histogram)
    }

    /// Builds a digest from `(value, occurrences)` pairs.
    ///
    /// # Errors
    ///
    /// Same as [`from_values`](Self::from_values).
    pub fn from_histogram(
        k: u64,
        min: i64,
        max: i64,
        histogram: &BTreeMap<i64, u64>,
    ) -> Result<Self, Error> {
        let height = validate_domain(k, min, max)?;
        let mut work: Vec<Level<u64>> = vec![BTreeMap::new(); height];
        let mut input_length = 0u64;
        for (&value, &count) in histogram {
            if value < min || value > max {
                return Err(Error::invalid_argument("value is outside the digest domain")
                    .with_context("value", value)
                    .with_context("min", min)
                    .with_context("max", max));
            }
            input_length = input_length.saturating_add(count);
            work[0].insert(NodeKey::leaf(value), count);
        }

        let mut digest = QuantileDigest {
            min,
            max,
            k,
            input_length,
            levels: Vec::new(),
        };
        let Ok(levels) = tree::compress(work, min, digest.threshold());
        digest.levels = levels;
        Ok(digest)
    }

    /// Estimates the `q`-quantile. Returns `None` for an empty digest.
    ///
    /// # Panics
    ///
    /// Panics if `q` is not in `[0, 1]`.
    pub fn quantile(&self, q: f64) -> Option<QuantileEstimate> {
        tree::quantile(&self.levels, self.input_length, q)
    }

    /// Returns the number of values summarized.
    pub fn input_length(&self) -> u64 {
        self.input_length
    }

    /// Folds `other` into this digest and recompresses.
    ///
    /// # Panics
    ///
    /// Panics if the digests cover different domains.
    pub fn merge(&mut self, other: &QuantileDigest) {
        assert_eq!(
            self.levels.len(),
            other.levels.len(),
            "digests of different heights cannot be merged"
        );
        assert_eq!(self.min, other.min, "digests with different minimums cannot be merged");

        let Ok(union) = tree::union(&self.levels, &other.levels);
        self.input_length += other.input_length;
        let Ok(levels) = tree::compress(union, self.min, self.threshold());
        self.levels = levels;
    }

    /// Returns a new digest summarizing both inputs.
    ///
    /// # Panics
    ///
    /// Panics if the digests cover different domains.
    pub fn merged(&self, other: &QuantileDigest) -> QuantileDigest {
        let mut merged = self.clone();
        merged.merge(other);
        merged
    }

    /// Returns the number of tree levels.
    pub fn height(&self) -> usize {
        self.levels.len()
    }

    /// Returns the number of stored nodes.
    pub fn num_nodes(&self) -> usize {
        self.levels.iter().map(BTreeMap::len).sum()
    }

    /// Returns the compression factor.
    pub fn k(&self) -> u64 {
        self.k
    }

    /// Returns the lower end of the domain.
    pub fn min(&self) -> i64 {
        self.min
    }

    /// Returns the upper end of the domain.
    pub fn max(&self) -> i64 {
        self.max
    }

    /// Iterates over the levels from the leaves up, each yielding its nodes
    /// in post-order.
    pub fn levels(&self) -> impl Iterator<Item = impl Iterator<Item = DigestNode> + '_> + '_ {
        self.levels.iter().map(|level| {
            level.iter().map(|(key, &count)| DigestNode {
                low: key.low,
                high: key.high,
                count,
            })
        })
    }

    /// Returns the exact length of [`serialize`](Self::serialize).
    pub fn serialized_size(&self) -> usize {
        HEADER_BYTES + self.levels.len() * LEVEL_BYTES + self.num_nodes() * NODE_BYTES
    }

    /// Serializes the digest to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = SketchBytes::with_capacity(self.serialized_size());
        bytes.write_u8(Family::QUANTILE_DIGEST.id);
        bytes.write_i64(self.min);
        bytes.write_i64(self.max);
        bytes.write_u64(self.k);
        bytes.write_u64(self.input_length);
        bytes.write_u64(self.levels.len() as u64);
        for level in &self.levels {
            bytes.write_u64(level.len() as u64);
            for (key, &count) in level {
                bytes.write_i64(key.low);
                bytes.write_i64(key.high);
                bytes.write_u64(count);
            }
        }
        bytes.into_bytes()
    }

    /// Deserializes a digest from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is truncated or the nodes do not form a
    /// digest over the encoded domain.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let mut cursor = SketchSlice::new(bytes);
        ensure_family(&mut cursor, &Family::QUANTILE_DIGEST)?;
        let min = cursor.read_i64().map_err(make_error("min"))?;
        let max = cursor.read_i64().map_err(make_error("max"))?;
        let k = cursor.read_u64().map_err(make_error("k"))?;
        let input_length = cursor.read_u64().map_err(make_error("input_length"))?;
        let height = cursor.read_u64().map_err(make_error("height"))?;

        let expected = validate_domain(k, min, max)
            .map_err(|err| Error::deserial("invalid Quantile Digest domain").set_source(err))?;
        if height != expected as u64 {
            return Err(Error::deserial("height does not match the domain")
                .with_context("expected", expected)
                .with_context("actual", height));
        }

        let mut levels: Vec<Level<u64>> = Vec::with_capacity(expected);
        let mut total = 0u64;
        for h in 0..expected {
            let width = cursor.read_u64().map_err(make_error("level_width"))?;
            let width = ensure_len(&cursor, width, NODE_BYTES, "nodes")?;
            let mut level = BTreeMap::new();
            for _ in 0..width {
                let low = cursor.read_i64().map_err(make_error("low"))?;
                let high = cursor.read_i64().map_err(make_error("high"))?;
                let count = cursor.read_u64().map_err(make_error("count"))?;
                let key = NodeKey { low, high };
                if !key.is_valid_at(h, min, max) || count == 0 {
                    return Err(Error::deserial("malformed Quantile Digest node")
                        .with_context("level", h)
                        .with_context("low", low)
                        .with_context("high", high)
                        .with_context("count", count));
                }
                if level.insert(key, count).is_some() {
                    return Err(Error::deserial("duplicate Quantile Digest node"));
                }
                total = total.saturating_add(count);
            }
            levels.push(level);
        }
        if total != input_length {
            return Err(Error::deserial("node counts do not add up to the input length")
                .with_context("input_length", input_length)
                .with_context("nodes", total));
        }
        ensure_consumed(&cursor, &Family::QUANTILE_DIGEST)?;

        Ok(QuantileDigest {
            min,
            max,
            k,
            input_length,
            levels,
        })
    }

    fn threshold(&self) -> u64 {
        self.input_length / self.k
    }
}

impl fmt::Display for QuantileDigest {
    /// One line per level: `h: <low, high, count> ...`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (h, level) in self.levels.iter().enumerate() {
            write!(f, "{h}:")?;
            for (key, count) in level {
                write!(f, " <{}, {}, {}>", key.low, key.high, count)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Checks the digest configuration and returns the tree height.
pub(super) fn validate_domain(k: u64, min: i64, max: i64) -> Result<usize, Error> {
    if k == 0 {
        return Err(Error::config_invalid("compression factor k must be positive"));
    }
    if min > max {
        return Err(Error::config_invalid("domain minimum exceeds its maximum")
            .with_context("min", min)
            .with_context("max", max));
    }
    let height = tree_height(min, max);
    if !tree_fits(min, height) {
        return Err(Error::config_invalid("domain is too wide")
            .with_context("min", min)
            .with_context("max", max));
    }
    Ok(height)
}
