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

use super::digest::QuantileDigest;
use super::digest::validate_domain;
use super::node;
use super::node::NodeKey;
use super::node::QuantileEstimate;
use super::serialization::FM_HEADER_BYTES;
use super::serialization::FM_NODE_MIN_BYTES;
use super::serialization::LEVEL_BYTES;
use super::serialization::TOTAL_FM_BITMAPS;
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
use crate::fm::FmSketch;
use crate::hash::HashType;
use crate::hash::ItemId;

/// A Quantile Digest whose nodes hold SHA-1 FM sketches instead of counts.
///
/// Built from a plain [`QuantileDigest`] at one site; digests from different
/// sites merge by set union, so inputs reported by several sites are
/// counted once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantileDigestFm {
    min: i64,
    max: i64,
    k: u64,
    fm_bits: usize,
    fm_bitmaps: usize,
    total: FmSketch,
    levels: Vec<Level<FmSketch>>,
}

impl QuantileDigestFm {
    /// Converts `digest`, built at site `site_id`, into FM form.
    ///
    /// The total input length goes into an FM sketch of 30 bitmaps; every
    /// node gets an FM sketch of `fm_bitmaps` bitmaps holding its count
    /// under the key `"<post-order rank>-<site id>"`. All sketches have
    /// `fm_bits` bits per bitmap.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid) if
    /// the FM dimensions are out of range for SHA-1 sketches.
    pub fn from_digest<'a>(
        site_id: impl Into<ItemId<'a>>,
        digest: &QuantileDigest,
        fm_bits: usize,
        fm_bitmaps: usize,
    ) -> Result<Self, Error> {
        let site = site_id.into();
        let mut total = FmSketch::new(TOTAL_FM_BITMAPS, fm_bits, HashType::Sha1)?;
        if digest.input_length() > 0 {
            total.insert_weighted(site, digest.input_length());
        }

        let site_text = site.text();
        let mut levels = Vec::with_capacity(digest.height());
        for level in &digest.levels {
            let mut nodes = BTreeMap::new();
            for (key, &count) in level {
                let rank = Self::node_rank(
                    domain_offset(digest.min, key.low) + 1,
                    domain_offset(digest.min, key.high) + 1,
                );
                let mut salted = format!("{rank}-").into_bytes();
                salted.extend_from_slice(&site_text);
                let mut sketch = FmSketch::new(fm_bitmaps, fm_bits, HashType::Sha1)?;
                sketch.insert_weighted(salted.as_slice(), count);
                nodes.insert(*key, sketch);
            }
            levels.push(nodes);
        }

        Ok(QuantileDigestFm {
            min: digest.min,
            max: digest.max,
            k: digest.k,
            fm_bits,
            fm_bitmaps,
            total,
            levels,
        })
    }

    /// Post-order rank of the node `[low, high]` in the complete binary tree
    /// over `[1, 2^height]`; both bounds count from one.
    pub fn node_rank(low: u64, high: u64) -> u64 {
        node::node_rank(low, high)
    }

    /// Estimates the `q`-quantile against the estimated total input length.
    /// Returns `None` for a digest without nodes.
    ///
    /// # Panics
    ///
    /// Panics if `q` is not in `[0, 1]`.
    pub fn quantile(&self, q: f64) -> Option<QuantileEstimate> {
        self.quantile_with_total(self.total.count(), q)
    }

    /// Estimates the `q`-quantile against a caller-supplied total, such as
    /// an exact count kept elsewhere.
    ///
    /// # Panics
    ///
    /// Panics if `q` is not in `[0, 1]`.
    pub fn quantile_with_total(&self, total: u64, q: f64) -> Option<QuantileEstimate> {
        tree::quantile(&self.levels, total, q)
    }

    /// Estimates the number of distinct inputs summarized.
    pub fn input_length(&self) -> u64 {
        self.total.count()
    }

    /// Folds `other` into this digest by FM union and recompresses.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
    /// if the FM dimensions differ. The digest is unchanged on error.
    ///
    /// # Panics
    ///
    /// Panics if the digests cover different domains.
    pub fn merge(&mut self, other: &QuantileDigestFm) -> Result<(), Error> {
        assert_eq!(
            self.levels.len(),
            other.levels.len(),
            "digests of different heights cannot be merged"
        );
        assert_eq!(self.min, other.min, "digests with different minimums cannot be merged");
        if self.fm_bits != other.fm_bits || self.fm_bitmaps != other.fm_bitmaps {
            return Err(Error::incompatible("Quantile Digest FM")
                .with_context("fm_bits", format!("{} vs {}", self.fm_bits, other.fm_bits))
                .with_context(
                    "fm_bitmaps",
                    format!("{} vs {}", self.fm_bitmaps, other.fm_bitmaps),
                ));
        }

        let total = self.total.merged(&other.total)?;
        let union = tree::union(&self.levels, &other.levels)?;
        let threshold = total.count() / self.k;
        self.levels = tree::compress(union, self.min, threshold)?;
        self.total = total;
        Ok(())
    }

    /// Returns a new digest summarizing both inputs.
    ///
    /// # Errors
    ///
    /// Same as [`merge`](Self::merge).
    pub fn merged(&self, other: &QuantileDigestFm) -> Result<QuantileDigestFm, Error> {
        let mut merged = self.clone();
        merged.merge(other)?;
        Ok(merged)
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

    /// Returns the number of bits per FM bitmap.
    pub fn fm_bits(&self) -> usize {
        self.fm_bits
    }

    /// Returns the number of bitmaps of every node's FM sketch.
    pub fn fm_bitmaps(&self) -> usize {
        self.fm_bitmaps
    }

    /// Returns the exact length of [`serialize`](Self::serialize).
    pub fn serialized_size(&self) -> usize {
        let nodes: usize = self
            .levels
            .iter()
            .flat_map(|level| level.values())
            .map(|sketch| FM_NODE_MIN_BYTES + sketch.serialized_size())
            .sum();
        FM_HEADER_BYTES
            + 8
            + self.total.serialized_size()
            + self.levels.len() * LEVEL_BYTES
            + nodes
    }

    /// Serializes the digest to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = SketchBytes::with_capacity(self.serialized_size());
        bytes.write_u8(Family::QUANTILE_DIGEST_FM.id);
        bytes.write_i64(self.min);
        bytes.write_i64(self.max);
        bytes.write_u64(self.k);
        bytes.write_u64(self.levels.len() as u64);
        bytes.write_u64(self.fm_bits as u64);
        bytes.write_u64(self.fm_bitmaps as u64);
        bytes.write_len_prefixed(&self.total.serialize());
        for level in &self.levels {
            bytes.write_u64(level.len() as u64);
            for (key, sketch) in level {
                bytes.write_i64(key.low);
                bytes.write_i64(key.high);
                bytes.write_len_prefixed(&sketch.serialize());
            }
        }
        bytes.into_bytes()
    }

    /// Deserializes a digest from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is truncated, a nested FM sketch is
    /// malformed or has other dimensions than the header declares, or a node
    /// does not fit the encoded domain.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let mut cursor = SketchSlice::new(bytes);
        ensure_family(&mut cursor, &Family::QUANTILE_DIGEST_FM)?;
        let min = cursor.read_i64().map_err(make_error("min"))?;
        let max = cursor.read_i64().map_err(make_error("max"))?;
        let k = cursor.read_u64().map_err(make_error("k"))?;
        let height = cursor.read_u64().map_err(make_error("height"))?;
        let fm_bits = cursor.read_u64().map_err(make_error("fm_bits"))?;
        let fm_bitmaps = cursor.read_u64().map_err(make_error("fm_bitmaps"))?;

        let expected = validate_domain(k, min, max)
            .map_err(|err| Error::deserial("invalid Quantile Digest domain").set_source(err))?;
        if height != expected as u64 {
            return Err(Error::deserial("height does not match the domain")
                .with_context("expected", expected)
                .with_context("actual", height));
        }
        let fm_bits = usize::try_from(fm_bits)
            .map_err(|_| Error::deserial(format!("fm_bits {fm_bits} is too large")))?;
        let fm_bitmaps = usize::try_from(fm_bitmaps)
            .map_err(|_| Error::deserial(format!("fm_bitmaps {fm_bitmaps} is too large")))?;

        let total = read_sketch(&mut cursor, "total")?;
        check_dimensions(&total, TOTAL_FM_BITMAPS, fm_bits)?;

        let mut levels: Vec<Level<FmSketch>> = Vec::with_capacity(expected);
        for h in 0..expected {
            let width = cursor.read_u64().map_err(make_error("level_width"))?;
            let width = ensure_len(&cursor, width, FM_NODE_MIN_BYTES, "nodes")?;
            let mut level = BTreeMap::new();
            for _ in 0..width {
                let low = cursor.read_i64().map_err(make_error("low"))?;
                let high = cursor.read_i64().map_err(make_error("high"))?;
                let key = NodeKey { low, high };
                if !key.is_valid_at(h, min, max) {
                    return Err(Error::deserial("malformed Quantile Digest node")
                        .with_context("level", h)
                        .with_context("low", low)
                        .with_context("high", high));
                }
                let sketch = read_sketch(&mut cursor, "node")?;
                check_dimensions(&sketch, fm_bitmaps, fm_bits)?;
                if level.insert(key, sketch).is_some() {
                    return Err(Error::deserial("duplicate Quantile Digest node"));
                }
            }
            levels.push(level);
        }
        ensure_consumed(&cursor, &Family::QUANTILE_DIGEST_FM)?;

        Ok(QuantileDigestFm {
            min,
            max,
            k,
            fm_bits,
            fm_bitmaps,
            total,
            levels,
        })
    }
}

fn domain_offset(min: i64, value: i64) -> u64 {
    value.abs_diff(min)
}

fn read_sketch(cursor: &mut SketchSlice<'_>, tag: &'static str) -> Result<FmSketch, Error> {
    let bytes = cursor.read_len_prefixed().map_err(make_error(tag))?;
    FmSketch::deserialize(&bytes).map_err(|err| {
        Error::deserial("malformed nested FM sketch")
            .with_context("sketch", tag)
            .set_source(err)
    })
}

fn check_dimensions(sketch: &FmSketch, bitmaps: usize, bits: usize) -> Result<(), Error> {
    if sketch.hash_type() != HashType::Sha1
        || sketch.num_bitmaps() != bitmaps
        || sketch.bitmap_length() != bits
    {
        return Err(Error::deserial("nested FM sketch has unexpected dimensions")
            .with_context("bitmaps", sketch.num_bitmaps())
            .with_context("bits", sketch.bitmap_length()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn digest(values: &[i64]) -> QuantileDigest {
        QuantileDigest::from_values(10, 0, 63, values).unwrap()
    }

    #[test]
    fn test_from_digest_keeps_the_tree_shape() {
        let values: Vec<i64> = (0..200).map(|i| i % 64).collect();
        let plain = digest(&values);
        let fm = QuantileDigestFm::from_digest("site-a", &plain, 32, 16).unwrap();
        assert_eq!(fm.height(), plain.height());
        assert_eq!(fm.num_nodes(), plain.num_nodes());
        assert_eq!(fm.k(), 10);
        assert_eq!((fm.min(), fm.max()), (0, 63));
        assert_eq!((fm.fm_bits(), fm.fm_bitmaps()), (32, 16));
    }

    #[test]
    fn test_invalid_fm_dimensions() {
        let err = QuantileDigestFm::from_digest("s", &digest(&[1]), 200, 16).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_node_rank_is_exposed() {
        assert_eq!(QuantileDigestFm::node_rank(5, 8), 14);
    }

    #[test]
    fn test_quantile_with_explicit_total() {
        let values: Vec<i64> = (0..64).collect();
        let plain = QuantileDigest::from_values(1000, 0, 63, &values).unwrap();
        let fm = QuantileDigestFm::from_digest(7u64, &plain, 32, 32).unwrap();
        assert_eq!(fm.quantile_with_total(64, 0.0).unwrap().value(), 0);
        // a target beyond every accumulated rank stops at the last node
        assert_eq!(fm.quantile_with_total(u64::MAX, 1.0).unwrap().value(), 63);
        assert!(fm.quantile(0.5).is_some());
    }

    #[test]
    fn test_merge_with_itself_is_idempotent_on_nodes() {
        let values: Vec<i64> = (0..64).collect();
        let plain = QuantileDigest::from_values(1000, 0, 63, &values).unwrap();
        let fm = QuantileDigestFm::from_digest("site", &plain, 32, 32).unwrap();
        let merged = fm.merged(&fm).unwrap();
        // threshold stays at zero, so the union keeps every node
        assert_eq!(merged.num_nodes(), fm.num_nodes());
        assert_eq!(merged.input_length(), fm.input_length());
    }

    #[test]
    fn test_merge_dimension_mismatch() {
        let plain = digest(&[1, 2, 3]);
        let mut a = QuantileDigestFm::from_digest("a", &plain, 32, 16).unwrap();
        let b = QuantileDigestFm::from_digest("b", &plain, 32, 8).unwrap();
        let before = a.clone();
        let err = a.merge(&b).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(a, before);
    }

    #[test]
    fn test_serialization_round_trip() {
        let values: Vec<i64> = (0..300).map(|i| (i * 7) % 64).collect();
        let fm = QuantileDigestFm::from_digest("east", &digest(&values), 24, 8).unwrap();
        let bytes = fm.serialize();
        assert_eq!(bytes.len(), fm.serialized_size());
        assert_eq!(QuantileDigestFm::deserialize(&bytes).unwrap(), fm);
    }

    #[test]
    fn test_deserialize_rejects_plain_digest() {
        let bytes = digest(&[1]).serialize();
        let err = QuantileDigestFm::deserialize(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
    }
}
