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

use super::filter::FilterCore;
use super::multi::MultiBloomFilter;
use super::sketch::BloomFilter;
use crate::error::Error;
use crate::hash::HashType;
use crate::hash::UniversalHash;

const DEFAULT_NUM_BITS: usize = 1024;
const DEFAULT_NUM_HASHES: usize = 3;

#[derive(Debug, Clone)]
pub(super) struct FilterConfig {
    pub(super) num_bits: usize,
    pub(super) num_hashes: usize,
    pub(super) hash_type: HashType,
    pub(super) seed: Option<u64>,
    pub(super) hashes: Option<Vec<UniversalHash>>,
}

impl FilterConfig {
    fn with_size(num_bits: usize, num_hashes: usize) -> Self {
        FilterConfig {
            num_bits,
            num_hashes,
            hash_type: HashType::Universal,
            seed: None,
            hashes: None,
        }
    }
}

/// Builder for [`BloomFilter`].
///
/// Defaults to 1024 bits, 3 hashes, universal hashing and a time-based seed.
#[derive(Debug, Clone)]
pub struct BloomFilterBuilder {
    config: FilterConfig,
}

impl Default for BloomFilterBuilder {
    fn default() -> Self {
        Self::with_size(DEFAULT_NUM_BITS, DEFAULT_NUM_HASHES)
    }
}

impl BloomFilterBuilder {
    /// Creates a builder for a vector of `num_bits` bits and `num_hashes`
    /// hash functions.
    pub fn with_size(num_bits: usize, num_hashes: usize) -> Self {
        BloomFilterBuilder {
            config: FilterConfig::with_size(num_bits, num_hashes),
        }
    }

    /// Sets the length of the bit vector.
    pub fn num_bits(mut self, num_bits: usize) -> Self {
        self.config.num_bits = num_bits;
        self
    }

    /// Sets the number of hash functions.
    pub fn num_hashes(mut self, num_hashes: usize) -> Self {
        self.config.num_hashes = num_hashes;
        self
    }

    /// Sets the hash type.
    pub fn hash_type(mut self, hash_type: HashType) -> Self {
        self.config.hash_type = hash_type;
        self
    }

    /// Sets the seed universal hash functions are drawn from. Without a seed
    /// the filter is seeded from the clock and is not reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Uses the given universal hash functions instead of drawing new ones.
    ///
    /// This overrides the number of hashes and cannot be combined with
    /// SHA-1 hashing. Filters that must be merged can share their functions
    /// this way.
    pub fn hash_functions(mut self, hashes: Vec<UniversalHash>) -> Self {
        self.config.hashes = Some(hashes);
        self
    }

    /// Builds the filter.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid) if the
    /// vector is empty, there are no hash functions, a SHA-1 filter has
    /// 2^16 bits or more than 10 hashes, or explicit hash functions are
    /// combined with SHA-1 hashing.
    pub fn build(self) -> Result<BloomFilter, Error> {
        FilterCore::new(self.config, false).map(BloomFilter::from_core)
    }
}

/// Builder for [`MultiBloomFilter`].
///
/// Defaults to 1024 bits per hash, 3 hashes, universal hashing and a
/// time-based seed.
#[derive(Debug, Clone)]
pub struct MultiBloomFilterBuilder {
    config: FilterConfig,
}

impl Default for MultiBloomFilterBuilder {
    fn default() -> Self {
        Self::with_size(DEFAULT_NUM_BITS, DEFAULT_NUM_HASHES)
    }
}

impl MultiBloomFilterBuilder {
    /// Creates a builder for `num_hashes` vectors of `num_bits` bits each.
    pub fn with_size(num_bits: usize, num_hashes: usize) -> Self {
        MultiBloomFilterBuilder {
            config: FilterConfig::with_size(num_bits, num_hashes),
        }
    }

    /// Sets the length of each per-hash vector.
    pub fn num_bits(mut self, num_bits: usize) -> Self {
        self.config.num_bits = num_bits;
        self
    }

    /// Sets the number of hash functions, and thus of vectors.
    pub fn num_hashes(mut self, num_hashes: usize) -> Self {
        self.config.num_hashes = num_hashes;
        self
    }

    /// Sets the hash type.
    pub fn hash_type(mut self, hash_type: HashType) -> Self {
        self.config.hash_type = hash_type;
        self
    }

    /// Sets the seed universal hash functions are drawn from.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Uses the given universal hash functions instead of drawing new ones.
    pub fn hash_functions(mut self, hashes: Vec<UniversalHash>) -> Self {
        self.config.hashes = Some(hashes);
        self
    }

    /// Builds the filter.
    ///
    /// # Errors
    ///
    /// Same conditions as [`BloomFilterBuilder::build`].
    pub fn build(self) -> Result<MultiBloomFilter, Error> {
        FilterCore::new(self.config, true).map(MultiBloomFilter::from_core)
    }
}
