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

use super::builder::FilterConfig;
use super::serialization::HEADER_BYTES;
use super::serialization::MAX_SHA1_BITS;
use super::serialization::MAX_SHA1_HASHES;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::codec::assert::ensure_consumed;
use crate::codec::assert::ensure_family;
use crate::codec::assert::ensure_len;
use crate::codec::assert::make_error;
use crate::codec::family::Family;
use crate::common::XorShift64;
use crate::common::time_seed;
use crate::error::Error;
use crate::hash::HashType;
use crate::hash::ItemId;
use crate::hash::UniversalHash;

/// Bit vector shared by both filter variants.
///
/// With `partitioned` set, hash `i` addresses bits `[i * num_bits, (i + 1) * num_bits)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct FilterCore {
    hash_type: HashType,
    partitioned: bool,
    num_bits: usize,
    num_hashes: usize,
    hashes: Vec<UniversalHash>,
    bits: Vec<bool>,
}

impl FilterCore {
    pub(super) fn new(config: FilterConfig, partitioned: bool) -> Result<Self, Error> {
        let FilterConfig {
            num_bits,
            num_hashes,
            hash_type,
            seed,
            hashes,
        } = config;

        let (hash_type, num_hashes, hashes) = match hashes {
            Some(_) if hash_type == HashType::Sha1 => {
                return Err(Error::config_invalid(
                    "explicit hash functions require universal hashing",
                ));
            }
            Some(hashes) => (HashType::Universal, hashes.len(), hashes),
            None => {
                let hashes = match hash_type {
                    HashType::Universal => {
                        let mut rng = XorShift64::seeded(seed.unwrap_or_else(time_seed));
                        (0..num_hashes).map(|_| UniversalHash::new(&mut rng)).collect()
                    }
                    HashType::Sha1 => Vec::new(),
                };
                (hash_type, num_hashes, hashes)
            }
        };
        validate(hash_type, num_bits, num_hashes)?;

        let len = num_bits
            .checked_mul(if partitioned { num_hashes } else { 1 })
            .ok_or_else(|| Error::config_invalid("filter size overflows"))?;
        Ok(FilterCore {
            hash_type,
            partitioned,
            num_bits,
            num_hashes,
            hashes,
            bits: vec![false; len],
        })
    }

    pub(super) fn family(&self) -> &'static Family {
        if self.partitioned {
            &Family::MULTI_BLOOM
        } else {
            &Family::BLOOM
        }
    }

    pub(super) fn insert(&mut self, id: ItemId<'_>) {
        for slot in self.slots(id) {
            self.bits[slot] = true;
        }
    }

    pub(super) fn contains(&self, id: ItemId<'_>) -> bool {
        self.slots(id).into_iter().all(|slot| self.bits[slot])
    }

    pub(super) fn erase(&self) -> Result<(), Error> {
        Err(Error::deletions_unsupported(self.family().name))
    }

    pub(super) fn clear(&mut self) {
        self.bits.fill(false);
    }

    pub(super) fn merge(&mut self, other: &FilterCore) -> Result<(), Error> {
        self.check_compatible(other)?;
        for (bit, other_bit) in self.bits.iter_mut().zip(&other.bits) {
            *bit |= *other_bit;
        }
        Ok(())
    }

    pub(super) fn intersect(&mut self, other: &FilterCore) -> Result<(), Error> {
        self.check_compatible(other)?;
        for (bit, other_bit) in self.bits.iter_mut().zip(&other.bits) {
            *bit &= *other_bit;
        }
        Ok(())
    }

    pub(super) fn num_bits(&self) -> usize {
        self.num_bits
    }

    pub(super) fn num_hashes(&self) -> usize {
        self.num_hashes
    }

    pub(super) fn num_bits_set(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    pub(super) fn hash_type(&self) -> HashType {
        self.hash_type
    }

    pub(super) fn serialized_size(&self) -> usize {
        HEADER_BYTES
            + self
                .hashes
                .iter()
                .map(UniversalHash::serialized_size)
                .sum::<usize>()
            + self.bits.len()
    }

    pub(super) fn serialize(&self) -> Vec<u8> {
        let mut bytes = SketchBytes::with_capacity(self.serialized_size());
        bytes.write_u8(self.family().id);
        bytes.write_u8(self.hash_type as u8);
        bytes.write_u64(self.num_hashes as u64);
        bytes.write_u64(self.num_bits as u64);
        for hash in &self.hashes {
            hash.serialize_into(&mut bytes);
        }
        for bit in &self.bits {
            bytes.write_u8(*bit as u8);
        }
        bytes.into_bytes()
    }

    pub(super) fn deserialize(bytes: &[u8], partitioned: bool) -> Result<Self, Error> {
        let family = if partitioned {
            &Family::MULTI_BLOOM
        } else {
            &Family::BLOOM
        };
        let mut cursor = SketchSlice::new(bytes);
        ensure_family(&mut cursor, family)?;
        let tag = cursor.read_u8().map_err(make_error("hash_type"))?;
        let hash_type = HashType::try_from(tag)?;
        let num_hashes = cursor.read_u64().map_err(make_error("num_hashes"))?;
        let num_bits = cursor.read_u64().map_err(make_error("num_bits"))?;
        let num_hashes = usize::try_from(num_hashes)
            .map_err(|_| Error::deserial(format!("number of hashes {num_hashes} is too large")))?;
        let num_bits = ensure_len(&cursor, num_bits, 1, "num_bits")?;
        validate(hash_type, num_bits, num_hashes)
            .map_err(|err| Error::deserial("invalid filter configuration").set_source(err))?;

        let hashes = match hash_type {
            HashType::Universal => (0..num_hashes)
                .map(|_| UniversalHash::deserialize_from(&mut cursor))
                .collect::<Result<Vec<_>, _>>()?,
            HashType::Sha1 => Vec::new(),
        };

        let len = if partitioned {
            num_bits
                .checked_mul(num_hashes)
                .ok_or_else(|| Error::deserial("filter size overflows"))?
        } else {
            num_bits
        };
        ensure_len(&cursor, len as u64, 1, "bits")?;
        let mut bits = Vec::with_capacity(len);
        for _ in 0..len {
            match cursor.read_u8().map_err(make_error("bits"))? {
                0 => bits.push(false),
                1 => bits.push(true),
                other => {
                    return Err(Error::deserial(format!("invalid bit value {other}")));
                }
            }
        }
        ensure_consumed(&cursor, family)?;

        Ok(FilterCore {
            hash_type,
            partitioned,
            num_bits,
            num_hashes,
            hashes,
            bits,
        })
    }

    fn check_compatible(&self, other: &FilterCore) -> Result<(), Error> {
        // Hash function identity is not compared, only the shape.
        if self.hash_type != other.hash_type
            || self.num_bits != other.num_bits
            || self.num_hashes != other.num_hashes
        {
            return Err(Error::incompatible(self.family().name)
                .with_context("num_bits", format!("{} vs {}", self.num_bits, other.num_bits))
                .with_context(
                    "num_hashes",
                    format!("{} vs {}", self.num_hashes, other.num_hashes),
                ));
        }
        Ok(())
    }

    fn slots(&self, id: ItemId<'_>) -> Vec<usize> {
        let positions: Vec<usize> = match self.hash_type {
            HashType::Universal => {
                let key = id.key();
                self.hashes
                    .iter()
                    .map(|h| (h.hash(key) % self.num_bits as u64) as usize)
                    .collect()
            }
            HashType::Sha1 => {
                let digest = id.sha1();
                digest
                    .chunks_exact(2)
                    .take(self.num_hashes)
                    .map(|w| u16::from_ne_bytes([w[0], w[1]]) as usize % self.num_bits)
                    .collect()
            }
        };
        if !self.partitioned {
            return positions;
        }
        positions
            .into_iter()
            .enumerate()
            .map(|(i, h)| i * self.num_bits + h)
            .collect()
    }
}

impl fmt::Display for FilterCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} ", self.hash_type, self.num_hashes, self.num_bits)?;
        for hash in &self.hashes {
            write!(f, "{hash} ")?;
        }
        for bit in &self.bits {
            f.write_str(if *bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

fn validate(hash_type: HashType, num_bits: usize, num_hashes: usize) -> Result<(), Error> {
    if num_hashes == 0 {
        return Err(Error::config_invalid(
            "number of hashes must be larger than zero",
        ));
    }
    if num_bits == 0 {
        return Err(Error::config_invalid("vector size must be larger than zero"));
    }
    if hash_type == HashType::Sha1 {
        if num_bits >= MAX_SHA1_BITS {
            return Err(Error::config_invalid(format!(
                "SHA-1 filters need a vector size in [1, {}], got {num_bits}",
                MAX_SHA1_BITS - 1
            )));
        }
        if num_hashes > MAX_SHA1_HASHES {
            return Err(Error::config_invalid(format!(
                "SHA-1 filters need a number of hashes in [1, {MAX_SHA1_HASHES}], got {num_hashes}"
            )));
        }
    }
    Ok(())
}
