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

use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::codec::assert::make_error;
use crate::common::RandomSource;
use crate::error::Error;

/// The Mersenne prime 2^61 - 1.
const PRIME: u64 = (1 << 61) - 1;

/// Largest supported independence degree.
const MAX_INDEPENDENCE: u64 = 64;

/// A k-wise independent hash function from a Carter-Wegman family.
///
/// The function is a random polynomial of degree `k - 1` over GF(2^61 - 1).
/// Two-wise independence is enough for bucket selection; four-wise
/// independence is what the AMS sign projections need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniversalHash {
    coefficients: Vec<u64>,
}

impl UniversalHash {
    /// Draws a pairwise independent function.
    pub fn new<R: RandomSource + ?Sized>(rng: &mut R) -> Self {
        Self::with_independence(rng, 2)
    }

    /// Draws a `k`-wise independent function.
    ///
    /// # Panics
    ///
    /// Panics if `k` is zero or larger than 64.
    pub fn with_independence<R: RandomSource + ?Sized>(rng: &mut R, k: usize) -> Self {
        assert!(
            k >= 1 && k as u64 <= MAX_INDEPENDENCE,
            "independence must be in [1, {MAX_INDEPENDENCE}], got {k}"
        );
        let coefficients = (0..k).map(|_| rng.next_u64() % PRIME).collect();
        UniversalHash { coefficients }
    }

    /// The independence degree `k`.
    pub fn independence(&self) -> usize {
        self.coefficients.len()
    }

    /// Hashes `key` to a value in `[0, 2^61 - 1)`.
    pub fn hash(&self, key: u64) -> u64 {
        let x = reduce(key as u128);
        self.coefficients
            .iter()
            .fold(0u64, |acc, &c| add_mod(mul_mod(acc, x), c))
    }

    pub(crate) fn serialized_size(&self) -> usize {
        8 + 8 * self.coefficients.len()
    }

    pub(crate) fn serialize_into(&self, bytes: &mut SketchBytes) {
        bytes.write_u64(self.coefficients.len() as u64);
        for &c in &self.coefficients {
            bytes.write_u64(c);
        }
    }

    pub(crate) fn deserialize_from(cursor: &mut SketchSlice<'_>) -> Result<Self, Error> {
        let k = cursor.read_u64().map_err(make_error("hash_independence"))?;
        if k == 0 || k > MAX_INDEPENDENCE {
            return Err(Error::deserial(format!(
                "hash independence must be in [1, {MAX_INDEPENDENCE}], got {k}"
            )));
        }
        let mut coefficients = Vec::with_capacity(k as usize);
        for _ in 0..k {
            let c = cursor.read_u64().map_err(make_error("hash_coefficient"))?;
            if c >= PRIME {
                return Err(Error::deserial("hash coefficient exceeds the field size"));
            }
            coefficients.push(c);
        }
        Ok(UniversalHash { coefficients })
    }
}

impl fmt::Display for UniversalHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.coefficients.len())?;
        for c in &self.coefficients {
            write!(f, " {c}")?;
        }
        Ok(())
    }
}

fn reduce(x: u128) -> u64 {
    let r = ((x as u64) & PRIME) + ((x >> 61) as u64 & PRIME) + (x >> 122) as u64;
    let r = (r & PRIME) + (r >> 61);
    if r >= PRIME { r - PRIME } else { r }
}

fn mul_mod(a: u64, b: u64) -> u64 {
    reduce(a as u128 * b as u128)
}

fn add_mod(a: u64, b: u64) -> u64 {
    let r = a + b;
    if r >= PRIME { r - PRIME } else { r }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::XorShift64;

    #[test]
    fn test_same_seed_same_function() {
        let a = UniversalHash::with_independence(&mut XorShift64::seeded(1), 4);
        let b = UniversalHash::with_independence(&mut XorShift64::seeded(1), 4);
        assert_eq!(a, b);
        for key in [0u64, 1, 17, u64::MAX] {
            assert_eq!(a.hash(key), b.hash(key));
            assert!(a.hash(key) < PRIME);
        }
    }

    #[test]
    fn test_reduce_matches_modulo() {
        for x in [0u128, 1, PRIME as u128, PRIME as u128 * 2, u128::MAX, 1 << 100] {
            assert_eq!(reduce(x) as u128, x % PRIME as u128);
        }
    }

    #[test]
    fn test_round_trip() {
        let h = UniversalHash::with_independence(&mut XorShift64::seeded(9), 4);
        let mut bytes = SketchBytes::with_capacity(h.serialized_size());
        h.serialize_into(&mut bytes);
        let bytes = bytes.into_bytes();
        assert_eq!(bytes.len(), h.serialized_size());
        let decoded = UniversalHash::deserialize_from(&mut SketchSlice::new(&bytes)).unwrap();
        assert_eq!(decoded, h);
    }

    #[test]
    fn test_sign_bit_is_balanced() {
        let h = UniversalHash::with_independence(&mut XorShift64::seeded(3), 4);
        let ones = (0..10_000u64).filter(|k| h.hash(*k) & 1 == 1).count();
        assert!((4_000..6_000).contains(&ones), "ones = {ones}");
    }
}
