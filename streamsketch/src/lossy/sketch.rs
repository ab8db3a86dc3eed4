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

use super::serialization::ENTRY_COUNTERS_BYTES;
use super::serialization::HEADER_BYTES;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::codec::assert::ensure_consumed;
use crate::codec::assert::ensure_family;
use crate::codec::assert::ensure_len;
use crate::codec::assert::make_error;
use crate::codec::family::Family;
use crate::common::SketchKey;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Entry {
    count: u64,
    delta: u64,
}

/// A frequent item reported by [`LossyCounting::frequent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LossyRow<K> {
    item: K,
    count: u64,
    delta: u64,
}

impl<K> LossyRow<K> {
    /// Returns the item.
    pub fn item(&self) -> &K {
        &self.item
    }

    /// Returns the occurrences counted since the item was tracked; a lower
    /// bound of its frequency.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns the bound on occurrences missed before the item was tracked.
    pub fn delta(&self) -> u64 {
        self.delta
    }

    /// Returns `count + delta`, an upper bound of the frequency.
    pub fn upper_bound(&self) -> u64 {
        self.count + self.delta
    }
}

/// A Lossy Counting sketch over keys of type `K`.
#[derive(Debug, Clone, PartialEq)]
pub struct LossyCounting<K> {
    epsilon: f64,
    width: u64,
    input_length: u64,
    bucket: u64,
    entries: BTreeMap<K, Entry>,
}

impl<K: SketchKey> LossyCounting<K> {
    /// Creates an empty sketch with error bound `epsilon`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid)
    /// unless `epsilon` is in `(0, 1]`.
    pub fn new(epsilon: f64) -> Result<Self, Error> {
        let width = bucket_width(epsilon).ok_or_else(|| {
            Error::config_invalid(format!("epsilon must be in (0, 1], got {epsilon}"))
        })?;
        Ok(LossyCounting {
            epsilon,
            width,
            input_length: 0,
            bucket: 1,
            entries: BTreeMap::new(),
        })
    }

    /// Inserts one occurrence of `item`.
    pub fn insert(&mut self, item: K) {
        self.insert_weighted(item, 1);
    }

    /// Inserts `weight` occurrences of `item`. A weight of zero counts as one.
    ///
    /// The result is the same as inserting the item `weight` times, but the
    /// work is proportional to the number of bucket boundaries crossed.
    pub fn insert_weighted(&mut self, item: K, weight: u64) {
        let mut remaining = weight.max(1);
        while remaining > 0 {
            // The boundary check uses the stream position before this run.
            if self.input_length > 0 && self.input_length % self.width == 0 {
                self.sweep();
            }
            let run = remaining.min(self.width - self.input_length % self.width);
            self.input_length += run;
            remaining -= run;

            match self.entries.get_mut(&item) {
                Some(entry) => entry.count += run,
                None => {
                    let entry = Entry {
                        count: run,
                        delta: self.bucket - 1,
                    };
                    self.entries.insert(item.clone(), entry);
                }
            }
        }
    }

    /// Lossy Counting cannot forget items; this always fails.
    ///
    /// # Errors
    ///
    /// Always returns [`Unsupported`](crate::error::ErrorKind::Unsupported).
    pub fn erase(&mut self, _item: &K) -> Result<(), Error> {
        Err(Error::deletions_unsupported("Lossy Counting"))
    }

    /// Forgets every entry and restarts the stream.
    pub fn clear(&mut self) {
        self.input_length = 0;
        self.bucket = 1;
        self.entries.clear();
    }

    /// Returns the number of tracked entries.
    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    /// Returns an upper bound of the frequency of `item`.
    ///
    /// Untracked items may have occurred up to `current_bucket - 1` times.
    pub fn max_frequency<Q>(&self, item: &Q) -> u64
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.entries
            .get(item)
            .map_or(self.bucket - 1, |e| e.count + e.delta)
    }

    /// Returns a lower bound of the frequency of `item`, zero if untracked.
    pub fn min_frequency<Q>(&self, item: &Q) -> u64
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.entries.get(item).map_or(0, |e| e.count)
    }

    /// Returns the entries whose upper bound is at least `theta`, in key
    /// order.
    pub fn frequent(&self, theta: u64) -> Vec<LossyRow<K>> {
        self.entries
            .iter()
            .filter(|(_, e)| e.count + e.delta >= theta)
            .map(|(item, e)| LossyRow {
                item: item.clone(),
                count: e.count,
                delta: e.delta,
            })
            .collect()
    }

    /// Returns the number of occurrences inserted.
    pub fn input_length(&self) -> u64 {
        self.input_length
    }

    /// Returns the error bound.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Returns the number of items per bucket, `ceil(1 / epsilon)`.
    pub fn bucket_width(&self) -> u64 {
        self.width
    }

    /// Returns the id of the current bucket, starting at 1.
    pub fn current_bucket(&self) -> u64 {
        self.bucket
    }

    /// Returns the exact length of [`serialize`](Self::serialize).
    pub fn serialized_size(&self) -> usize {
        let mut keys = Vec::new();
        for key in self.entries.keys() {
            key.encode_key(&mut keys);
        }
        HEADER_BYTES + keys.len() + self.entries.len() * ENTRY_COUNTERS_BYTES
    }

    /// Serializes the sketch to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = SketchBytes::with_capacity(self.serialized_size());
        bytes.write_u8(Family::LOSSY_COUNTING.id);
        bytes.write_f64(self.epsilon);
        bytes.write_u64(self.input_length);
        bytes.write_u64(self.bucket);
        bytes.write_u64(self.entries.len() as u64);
        let mut key = Vec::new();
        for (item, entry) in &self.entries {
            key.clear();
            item.encode_key(&mut key);
            bytes.write(&key);
            bytes.write_u64(entry.count);
            bytes.write_u64(entry.delta);
        }
        bytes.into_bytes()
    }

    /// Deserializes a sketch from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is truncated or malformed.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        let mut cursor = SketchSlice::new(bytes);
        ensure_family(&mut cursor, &Family::LOSSY_COUNTING)?;
        let epsilon = cursor.read_f64().map_err(make_error("epsilon"))?;
        let input_length = cursor.read_u64().map_err(make_error("input_length"))?;
        let bucket = cursor.read_u64().map_err(make_error("bucket"))?;
        let len = cursor.read_u64().map_err(make_error("num_entries"))?;

        let mut sketch = LossyCounting::new(epsilon)
            .map_err(|err| Error::deserial("invalid Lossy Counting epsilon").set_source(err))?;
        if bucket == 0 {
            return Err(Error::deserial("bucket ids start at 1"));
        }
        sketch.input_length = input_length;
        sketch.bucket = bucket;

        let len = ensure_len(&cursor, len, ENTRY_COUNTERS_BYTES, "entries")?;
        for _ in 0..len {
            let item = cursor.decode_with(K::decode_key)?;
            let count = cursor.read_u64().map_err(make_error("count"))?;
            let delta = cursor.read_u64().map_err(make_error("delta"))?;
            if sketch.entries.insert(item, Entry { count, delta }).is_some() {
                return Err(Error::deserial("duplicate Lossy Counting entry"));
            }
        }
        ensure_consumed(&cursor, &Family::LOSSY_COUNTING)?;
        Ok(sketch)
    }

    fn sweep(&mut self) {
        let before = self.entries.len();
        let bucket = self.bucket;
        self.entries.retain(|_, e| e.count + e.delta > bucket);
        self.bucket += 1;
        tracing::debug!(
            evicted = before - self.entries.len(),
            retained = self.entries.len(),
            bucket = self.bucket,
            "lossy counting bucket sweep"
        );
    }
}

fn bucket_width(epsilon: f64) -> Option<u64> {
    if epsilon > 0.0 && epsilon <= 1.0 {
        Some((1.0 / epsilon).ceil() as u64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_invalid_epsilon() {
        for epsilon in [0.0, -0.5, 1.5, f64::NAN] {
            let err = LossyCounting::<u64>::new(epsilon).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        }
        assert_eq!(LossyCounting::<u64>::new(1.0).unwrap().bucket_width(), 1);
        assert_eq!(LossyCounting::<u64>::new(0.3).unwrap().bucket_width(), 4);
    }

    #[test]
    fn test_sweep_happens_before_increment() {
        let mut sketch = LossyCounting::new(0.5).unwrap();
        sketch.insert("a".to_string());
        sketch.insert("b".to_string());
        assert_eq!(sketch.num_entries(), 2);
        assert_eq!(sketch.current_bucket(), 1);

        sketch.insert("c".to_string());
        assert_eq!(sketch.num_entries(), 1);
        assert_eq!(sketch.current_bucket(), 2);
        assert_eq!(sketch.min_frequency("c"), 1);
        assert_eq!(sketch.max_frequency("c"), 2);
        assert_eq!(sketch.min_frequency("a"), 0);
        assert_eq!(sketch.max_frequency("a"), 1);
    }

    #[test]
    fn test_weighted_matches_repeated_inserts() {
        let stream = [(1u64, 7u64), (2, 1), (1, 13), (3, 25), (2, 4), (4, 0), (1, 9)];
        let mut weighted = LossyCounting::new(0.1).unwrap();
        let mut repeated = LossyCounting::new(0.1).unwrap();
        for (item, weight) in stream {
            weighted.insert_weighted(item, weight);
            for _ in 0..weight.max(1) {
                repeated.insert(item);
            }
        }
        assert_eq!(weighted, repeated);
        assert_eq!(weighted.input_length(), 60);
    }

    #[test]
    fn test_erase_is_unsupported() {
        let mut sketch = LossyCounting::new(0.1).unwrap();
        sketch.insert(1u64);
        assert_eq!(sketch.erase(&1u64).unwrap_err().kind(), ErrorKind::Unsupported);
        assert_eq!(sketch.min_frequency(&1u64), 1);
    }

    #[test]
    fn test_frequent_rows_in_key_order() {
        let mut sketch = LossyCounting::new(0.01).unwrap();
        sketch.insert_weighted(30u64, 40);
        sketch.insert_weighted(10u64, 60);
        sketch.insert_weighted(20u64, 5);
        let rows = sketch.frequent(10);
        let items: Vec<u64> = rows.iter().map(|r| *r.item()).collect();
        assert_eq!(items, vec![10, 30]);
        assert_eq!(rows[0].count(), 60);
        assert_eq!(rows[0].upper_bound(), rows[0].count() + rows[0].delta());
    }

    #[test]
    fn test_clear_restarts_stream() {
        let mut sketch = LossyCounting::new(0.5).unwrap();
        for i in 0..10u64 {
            sketch.insert(i);
        }
        sketch.clear();
        assert_eq!(sketch, LossyCounting::new(0.5).unwrap());
    }
}
