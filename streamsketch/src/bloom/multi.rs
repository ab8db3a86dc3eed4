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

use super::builder::MultiBloomFilterBuilder;
use super::filter::FilterCore;
use crate::error::Error;
use crate::hash::HashType;
use crate::hash::ItemId;

/// A Bloom filter with a private bit vector per hash function.
///
/// Use [`MultiBloomFilter::builder`] to construct instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiBloomFilter {
    core: FilterCore,
}

impl MultiBloomFilter {
    /// Returns a builder.
    ///
    /// # Examples
    ///
    /// ```
    /// # use streamsketch::bloom::MultiBloomFilter;
    /// # use streamsketch::hash::HashType;
    /// let filter = MultiBloomFilter::builder()
    ///     .num_bits(4096)
    ///     .num_hashes(4)
    ///     .hash_type(HashType::Sha1)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(filter.num_bits(), 4096);
    /// ```
    pub fn builder() -> MultiBloomFilterBuilder {
        MultiBloomFilterBuilder::default()
    }

    pub(super) fn from_core(core: FilterCore) -> Self {
        MultiBloomFilter { core }
    }

    /// Inserts an item.
    pub fn insert<'a>(&mut self, id: impl Into<ItemId<'a>>) {
        self.core.insert(id.into());
    }

    /// Tests whether an item is possibly in the set.
    ///
    /// Returns `false` only if the item was definitely never inserted.
    pub fn contains<'a>(&self, id: impl Into<ItemId<'a>>) -> bool {
        self.core.contains(id.into())
    }

    /// Bloom filters cannot forget items; this always fails.
    ///
    /// # Errors
    ///
    /// Always returns [`Unsupported`](crate::error::ErrorKind::Unsupported).
    pub fn erase<'a>(&mut self, _id: impl Into<ItemId<'a>>) -> Result<(), Error> {
        self.core.erase()
    }

    /// Clears every bit, keeping the configuration and hash functions.
    pub fn clear(&mut self) {
        self.core.clear();
    }

    /// Merges `other` into this filter with a bitwise OR.
    ///
    /// Only the hash type, vector length and number of hashes are compared;
    /// merging filters whose hash functions differ gives meaningless results.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
    /// if the filters differ in hash type, vector length or number of hashes.
    pub fn merge(&mut self, other: &MultiBloomFilter) -> Result<(), Error> {
        self.core.merge(&other.core)
    }

    /// Returns the union of this filter and `other`.
    ///
    /// # Errors
    ///
    /// See [`merge`](Self::merge).
    pub fn merged(&self, other: &MultiBloomFilter) -> Result<MultiBloomFilter, Error> {
        let mut result = self.clone();
        result.merge(other)?;
        Ok(result)
    }

    /// Intersects this filter with `other` with a bitwise AND.
    ///
    /// # Errors
    ///
    /// See [`merge`](Self::merge).
    pub fn intersect(&mut self, other: &MultiBloomFilter) -> Result<(), Error> {
        self.core.intersect(&other.core)
    }

    /// Returns the intersection of this filter and `other`.
    ///
    /// # Errors
    ///
    /// See [`merge`](Self::merge).
    pub fn intersection(&self, other: &MultiBloomFilter) -> Result<MultiBloomFilter, Error> {
        let mut result = self.clone();
        result.intersect(other)?;
        Ok(result)
    }

    /// Returns the length of each per-hash bit vector.
    pub fn num_bits(&self) -> usize {
        self.core.num_bits()
    }

    /// Returns the number of hash functions.
    pub fn num_hashes(&self) -> usize {
        self.core.num_hashes()
    }

    /// Returns the number of bits set.
    pub fn num_bits_set(&self) -> usize {
        self.core.num_bits_set()
    }

    /// Returns the hash type.
    pub fn hash_type(&self) -> HashType {
        self.core.hash_type()
    }

    /// Returns the exact length of [`serialize`](Self::serialize).
    pub fn serialized_size(&self) -> usize {
        self.core.serialized_size()
    }

    /// Serializes the filter to bytes, hash functions included.
    pub fn serialize(&self) -> Vec<u8> {
        self.core.serialize()
    }

    /// Deserializes a filter from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is truncated, belongs to another sketch
    /// family or describes an invalid configuration.
    pub fn deserialize(bytes: &[u8]) -> Result<MultiBloomFilter, Error> {
        FilterCore::deserialize(bytes, true).map(MultiBloomFilter::from_core)
    }
}

impl fmt::Display for MultiBloomFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.core, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_first_insert_sets_one_bit_per_hash() {
        for hash_type in [HashType::Universal, HashType::Sha1] {
            let mut filter = MultiBloomFilter::builder()
                .num_bits(64)
                .num_hashes(5)
                .hash_type(hash_type)
                .seed(2)
                .build()
                .unwrap();
            filter.insert("first");
            assert_eq!(filter.num_bits_set(), 5);
            assert!(filter.contains("first"));
        }
    }

    #[test]
    fn test_intersection_keeps_common_items() {
        let builder = MultiBloomFilter::builder().num_bits(2048).num_hashes(4).seed(8);
        let mut a = builder.clone().build().unwrap();
        let mut b = builder.build().unwrap();
        a.insert(1u64);
        a.insert(2u64);
        b.insert(2u64);
        b.insert(3u64);
        let both = a.intersection(&b).unwrap();
        assert!(both.contains(2u64));
        assert!(both.num_bits_set() <= a.num_bits_set().min(b.num_bits_set()));
    }

    #[test]
    fn test_rejects_plain_bloom_encoding() {
        let plain = crate::bloom::BloomFilter::builder().seed(1).build().unwrap();
        let err = MultiBloomFilter::deserialize(&plain.serialize()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
    }

    #[test]
    fn test_explicit_hash_functions_need_universal_hashing() {
        use crate::common::XorShift64;
        use crate::hash::UniversalHash;

        let mut rng = XorShift64::seeded(6);
        let hashes: Vec<_> = (0..3).map(|_| UniversalHash::new(&mut rng)).collect();
        let err = MultiBloomFilter::builder()
            .hash_functions(hashes.clone())
            .hash_type(HashType::Sha1)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);

        let filter = MultiBloomFilter::builder()
            .num_bits(128)
            .hash_functions(hashes)
            .build()
            .unwrap();
        assert_eq!(filter.num_hashes(), 3);
        assert_eq!(filter.hash_type(), HashType::Universal);
    }

    #[test]
    fn test_mismatched_shapes() {
        let mut a = MultiBloomFilter::builder().num_hashes(3).seed(1).build().unwrap();
        let b = MultiBloomFilter::builder().num_hashes(4).seed(1).build().unwrap();
        assert_eq!(a.merge(&b).unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(a.intersect(&b).unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(a.erase(1u64).unwrap_err().kind(), ErrorKind::Unsupported);
    }
}
