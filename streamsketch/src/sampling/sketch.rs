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

use std::borrow::Borrow;
use std::collections::BTreeMap;

use super::serialization::HEADER_BYTES;
use super::serialization::TALLY_BYTES;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::codec::assert::ensure_consumed;
use crate::codec::assert::ensure_family;
use crate::codec::assert::ensure_len;
use crate::codec::assert::make_error;
use crate::codec::family::Family;
use crate::common::RandomSource;
use crate::common::SketchKey;
use crate::common::XorShift64;
use crate::error::Error;

/// Threshold inflation per resampling round (Gibbons and Matias).
const TAU_GROWTH: f64 = 1.1;

/// Slope of the empirical correction added to sampled tallies.
const CORRECTION_SLOPE: f64 = 0.418;

/// State of a sampled key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tally {
    /// Seen once since admission.
    Bare,
    /// Seen `n >= 2` times since admission.
    Tallied(u64),
}

impl Tally {
    fn count(self) -> u64 {
        match self {
            Tally::Bare => 1,
            Tally::Tallied(n) => n,
        }
    }

    fn from_count(count: u64) -> Self {
        if count == 1 {
            Tally::Bare
        } else {
            Tally::Tallied(count)
        }
    }
}

/// A Counting Sample over keys of type `K`, drawing randomness from `R`.
#[derive(Debug, Clone, PartialEq)]
pub struct CountingSample<K, R = XorShift64> {
    input_length: i64,
    capacity: usize,
    tau: f64,
    reservoir: BTreeMap<K, Tally>,
    rng: R,
}

impl<K: SketchKey, R: RandomSource> CountingSample<K, R> {
    /// Creates an empty sample holding at most `capacity` keys.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid) if
    /// `capacity` is zero.
    pub fn new(capacity: usize, rng: R) -> Result<Self, Error> {
        if capacity == 0 {
            return Err(Error::config_invalid("reservoir capacity must be positive"));
        }
        Ok(CountingSample {
            input_length: 0,
            capacity,
            tau: 1.0,
            reservoir: BTreeMap::new(),
            rng,
        })
    }

    /// Records one occurrence of `key`.
    pub fn insert(&mut self, key: K) {
        self.input_length += 1;
        if let Some(tally) = self.reservoir.get_mut(&key) {
            *tally = Tally::Tallied(tally.count() + 1);
            return;
        }
        if self.rng.next_uniform_double() >= 1.0 / self.tau {
            return;
        }
        if self.reservoir.len() >= self.capacity {
            self.resample();
        }
        self.reservoir.insert(key, Tally::Bare);
    }

    /// Removes one occurrence of `key`.
    ///
    /// A key seen once leaves the sample; a tally of two becomes a key seen
    /// once. Keys outside the sample only shorten the input length.
    pub fn erase<Q>(&mut self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.input_length -= 1;
        match self.reservoir.get(key).copied() {
            Some(Tally::Bare) => {
                self.reservoir.remove(key);
            }
            Some(Tally::Tallied(n)) => {
                if let Some(tally) = self.reservoir.get_mut(key) {
                    *tally = Tally::from_count(n - 1);
                }
            }
            None => {}
        }
    }

    /// Empties the sample and resets the threshold and input length.
    pub fn clear(&mut self) {
        self.input_length = 0;
        self.tau = 1.0;
        self.reservoir.clear();
    }

    /// Returns the number of insertions minus the number of erasures.
    pub fn input_length(&self) -> i64 {
        self.input_length
    }

    /// Returns the admission probability `1 / tau` of a new key.
    pub fn sampling_factor(&self) -> f64 {
        1.0 / self.tau
    }

    /// Returns the maximum number of sampled keys.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of sampled keys.
    pub fn len(&self) -> usize {
        self.reservoir.len()
    }

    /// Returns whether no key is sampled.
    pub fn is_empty(&self) -> bool {
        self.reservoir.is_empty()
    }

    /// Estimates the frequency of `key`: its tally plus the correction
    /// `max(0, floor(0.418 tau - 1))`, or zero if the key is not sampled.
    pub fn frequency<Q>(&self, key: &Q) -> u64
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.reservoir
            .get(key)
            .map_or(0, |tally| tally.count() + self.correction())
    }

    /// Returns the sampled keys whose estimated frequency is at least
    /// `theta`, with their estimates, in key order.
    pub fn frequent(&self, theta: u64) -> Vec<(K, u64)> {
        let correction = self.correction();
        self.reservoir
            .iter()
            .map(|(key, tally)| (key, tally.count() + correction))
            .filter(|(_, estimate)| *estimate >= theta)
            .map(|(key, estimate)| (key.clone(), estimate))
            .collect()
    }

    /// Returns the number of sampled keys seen more than once.
    pub fn total_key_tallies(&self) -> usize {
        self.reservoir
            .values()
            .filter(|t| matches!(t, Tally::Tallied(_)))
            .count()
    }

    /// Returns every sampled key with its raw tally, in key order.
    pub fn sample(&self) -> Vec<(K, u64)> {
        self.reservoir
            .iter()
            .map(|(key, tally)| (key.clone(), tally.count()))
            .collect()
    }

    /// Returns the exact length of [`serialize`](Self::serialize).
    pub fn serialized_size(&self) -> usize {
        let mut keys = Vec::new();
        for key in self.reservoir.keys() {
            key.encode_key(&mut keys);
        }
        HEADER_BYTES + keys.len() + self.reservoir.len() * TALLY_BYTES
    }

    /// Serializes the sample to bytes. The random source is not included.
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = SketchBytes::with_capacity(self.serialized_size());
        bytes.write_u8(Family::COUNTING_SAMPLE.id);
        bytes.write_i64(self.input_length);
        bytes.write_u64(self.capacity as u64);
        bytes.write_f64(self.tau);
        bytes.write_u64(self.reservoir.len() as u64);
        let mut encoded = Vec::new();
        for (key, tally) in &self.reservoir {
            encoded.clear();
            key.encode_key(&mut encoded);
            bytes.write(&encoded);
            bytes.write_u64(tally.count());
        }
        bytes.into_bytes()
    }

    /// Deserializes a sample from bytes, drawing future randomness from `rng`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is truncated or malformed.
    pub fn deserialize(bytes: &[u8], rng: R) -> Result<Self, Error> {
        let mut cursor = SketchSlice::new(bytes);
        ensure_family(&mut cursor, &Family::COUNTING_SAMPLE)?;
        let input_length = cursor.read_i64().map_err(make_error("input_length"))?;
        let capacity = cursor.read_u64().map_err(make_error("capacity"))?;
        let tau = cursor.read_f64().map_err(make_error("tau"))?;
        let len = cursor.read_u64().map_err(make_error("num_entries"))?;

        if !(tau >= 1.0 && tau.is_finite()) {
            return Err(Error::deserial(format!("threshold must be at least 1, got {tau}")));
        }
        if len > capacity {
            return Err(Error::deserial("reservoir holds more keys than its capacity")
                .with_context("capacity", capacity)
                .with_context("entries", len));
        }
        let capacity = usize::try_from(capacity)
            .map_err(|_| Error::deserial(format!("capacity {capacity} is too large")))?;
        let mut sample = CountingSample::new(capacity, rng)
            .map_err(|err| Error::deserial("invalid Counting Sample capacity").set_source(err))?;
        sample.input_length = input_length;
        sample.tau = tau;

        let len = ensure_len(&cursor, len, TALLY_BYTES, "entries")?;
        for _ in 0..len {
            let key = cursor.decode_with(K::decode_key)?;
            let count = cursor.read_u64().map_err(make_error("tally"))?;
            if count == 0 {
                return Err(Error::deserial("sampled keys have a tally of at least 1"));
            }
            if sample.reservoir.insert(key, Tally::from_count(count)).is_some() {
                return Err(Error::deserial("duplicate Counting Sample key"));
            }
        }
        ensure_consumed(&cursor, &Family::COUNTING_SAMPLE)?;
        Ok(sample)
    }

    fn correction(&self) -> u64 {
        (CORRECTION_SLOPE * self.tau - 1.0).floor().max(0.0) as u64
    }

    /// Raises `tau` until at least one key leaves the reservoir.
    ///
    /// Each round replays the admission test under `tau' = 1.1 tau`: the
    /// first counted occurrence survives with probability `tau / tau'`, every
    /// later one with probability `1 / tau'`.
    fn resample(&mut self) {
        let tau_before = self.tau;
        let size_before = self.reservoir.len();
        let mut rounds = 0;
        let mut removed = false;

        while !removed {
            rounds += 1;
            let tau_prime = TAU_GROWTH * self.tau;
            let keep_first = self.tau / tau_prime;
            let keep_next = 1.0 / tau_prime;
            let rng = &mut self.rng;

            self.reservoir.retain(|_, tally| match *tally {
                Tally::Tallied(mut n) => {
                    if rng.next_uniform_double() >= keep_first {
                        n -= 1;
                    }
                    while n >= 1 && rng.next_uniform_double() >= keep_next {
                        n -= 1;
                    }
                    match n {
                        0 => {
                            removed = true;
                            false
                        }
                        n => {
                            *tally = Tally::from_count(n);
                            true
                        }
                    }
                }
                Tally::Bare => {
                    if rng.next_uniform_double() >= keep_first {
                        removed = true;
                        false
                    } else {
                        true
                    }
                }
            });
            self.tau = tau_prime;
        }

        tracing::debug!(
            rounds,
            tau_before,
            tau_after = self.tau,
            size_before,
            size_after = self.reservoir.len(),
            "counting sample resampled"
        );
    }
}
