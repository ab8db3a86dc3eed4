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

use super::builder::BloomFilterBuilder;
use super::filter::FilterCore;
use crate::error::Error;
use crate::hash::HashType;
use crate::hash::ItemId;

/// A Bloom filter over one shared bit vector.
///
/// Use [`BloomFilter::builder`] to construct instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    core: FilterCore,
}

impl BloomFilter {
    /// Returns a builder.
    ///
    /// # Examples
    ///
    /// ```
    /// # use streamsketch::bloom::BloomFilter;
    /// # use streamsketch::hash::HashType;
    /// let filter = BloomFilter::builder()
    ///     .num_bits(4096)
    ///     .num_hashes(4)
    ///     .hash_type(HashType::Sha1)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(filter.num_bits(), 4096);
    /// ```
    pub fn builder() -> BloomFilterBuilder {
        BloomFilterBuilder::default()
    }

    pub(super) fn from_core(core: FilterCore) -> Self {
        BloomFilter { core }
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
    pub fn merge(&mut self, other: &BloomFilter) -> Result<(), Error> {
        self.core.merge(&other.core)
    }

    /// Returns the union of this filter and `other`.
    ///
    /// # Errors
    ///
    /// See [`merge`](Self::merge).
    pub fn merged(&self, other: &BloomFilter) -> Result<BloomFilter, Error> {
        let mut result = self.clone();
        result.merge(other)?;
        Ok(result)
    }

    /// Intersects this filter with `other` with a bitwise AND.
    ///
    /// # Errors
    ///
    /// See [`merge`](Self::merge).
    pub fn intersect(&mut self, other: &BloomFilter) -> Result<(), Error> {
        self.core.intersect(&other.core)
    }

    /// Returns the intersection of this filter and `other`.
    ///
    /// # Errors
    ///
    /// See [`merge`](Self::merge).
    pub fn intersection(&self, other: &BloomFilter) -> Result<BloomFilter, Error> {
        let mut result = self.clone();
        result.intersect(other)?;
        Ok(result)
    }

    /// Returns the length of the bit vector.
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
    pub fn deserialize(bytes: &[u8]) -> Result<BloomFilter, Error> {
        FilterCore::deserialize(bytes, false).map(BloomFilter::from_core)
    }
}

impl fmt::Display for BloomFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.core, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_small_scenario() {
        let mut filter = BloomFilter::builder()
            .num_bits(1024)
            .num_hashes(3)
            .seed(1)
            .build()
            .unwrap();
        for id in [5u64, 17, 42] {
            filter.insert(id);
        }
        assert!(filter.contains(5u64));
        assert!(filter.contains(17u64));
        assert!(filter.contains(42u64));
        let _ = filter.contains(6u64);
        assert!(filter.num_bits_set() <= 9);
        assert!(filter.num_bits_set() >= 1);
    }

    #[test]
    fn test_erase_is_unsupported() {
        let mut filter = BloomFilter::builder().seed(1).build().unwrap();
        let err = filter.erase(1u64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn test_sha1_limits() {
        for builder in [
            BloomFilter::builder().num_bits(1 << 16).hash_type(HashType::Sha1),
            BloomFilter::builder().num_hashes(11).hash_type(HashType::Sha1),
            BloomFilter::builder().num_bits(0),
            BloomFilter::builder().num_hashes(0),
        ] {
            assert_eq!(builder.build().unwrap_err().kind(), ErrorKind::ConfigInvalid);
        }
    }

    #[test]
    fn test_explicit_hash_functions() {
        use crate::common::XorShift64;
        use crate::hash::UniversalHash;

        let mut rng = XorShift64::seeded(3);
        let hashes: Vec<_> = (0..4).map(|_| UniversalHash::new(&mut rng)).collect();
        let mut a = BloomFilter::builder()
            .num_bits(512)
            .hash_functions(hashes.clone())
            .build()
            .unwrap();
        let mut b = BloomFilter::builder()
            .num_bits(512)
            .hash_functions(hashes)
            .build()
            .unwrap();
        assert_eq!(a.num_hashes(), 4);
        a.insert(1u64);
        b.insert(2u64);
        let union = a.merged(&b).unwrap();
        assert!(union.contains(1u64) && union.contains(2u64));
    }

    #[test]
    fn test_explicit_hash_functions_need_universal_hashing() {
        use crate::common::XorShift64;
        use crate::hash::UniversalHash;

        let mut rng = XorShift64::seeded(4);
        let hashes: Vec<_> = (0..2).map(|_| UniversalHash::new(&mut rng)).collect();
        let err = BloomFilter::builder()
            .num_bits(256)
            .hash_type(HashType::Sha1)
            .hash_functions(hashes)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_display() {
        let filter = BloomFilter::builder()
            .num_bits(4)
            .num_hashes(1)
            .hash_type(HashType::Sha1)
            .build()
            .unwrap();
        assert_eq!(filter.to_string(), "1 1 4 0000");
    }
}
