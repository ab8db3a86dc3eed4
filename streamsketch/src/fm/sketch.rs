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

use super::serialization::HEADER_BYTES;
use super::serialization::MAX_BITMAPS;
use super::serialization::MAX_SHA1_LENGTH;
use super::serialization::MAX_UNIVERSAL_LENGTH;
use crate::codec::SketchBytes;
use crate::codec::SketchSlice;
use crate::codec::assert::ensure_consumed;
use crate::codec::assert::ensure_family;
use crate::codec::assert::make_error;
use crate::codec::family::Family;
use crate::common::RandomSource;
use crate::common::XorShift64;
use crate::error::Error;
use crate::hash::HashType;
use crate::hash::ItemId;
use crate::hash::SHA1_HASH_LENGTH;
use crate::hash::sha1_digest;

/// Flajolet's bias correction constant; `1 / PHI` is roughly 1.29.
const PHI: f64 = 0.77351;

const DEFAULT_NUM_BITMAPS: usize = 64;
const DEFAULT_BITMAP_LENGTH: usize = 32;

/// A Flajolet-Martin sketch estimating the number of distinct items.
///
/// Use [`FmSketch::builder`] or [`FmSketch::new`] to construct instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FmSketch {
    hash_type: HashType,
    bitmaps: Vec<Vec<bool>>,
}

impl FmSketch {
    /// Returns a builder with 64 bitmaps of 32 bits in universal mode.
    pub fn builder() -> FmSketchBuilder {
        FmSketchBuilder::default()
    }

    /// Creates an empty sketch.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigInvalid`](crate::error::ErrorKind::ConfigInvalid) if
    /// `num_bitmaps` is not in `[1, 256]`, or `bitmap_length` is not in
    /// `[1, 256]` (universal) or `[1, 152]` (SHA-1).
    pub fn new(
        num_bitmaps: usize,
        bitmap_length: usize,
        hash_type: HashType,
    ) -> Result<Self, Error> {
        if !(1..=MAX_BITMAPS).contains(&num_bitmaps) {
            return Err(Error::config_invalid(format!(
                "number of bitmaps must be in [1, {MAX_BITMAPS}], got {num_bitmaps}"
            )));
        }
        let max_length = match hash_type {
            HashType::Universal => MAX_UNIVERSAL_LENGTH,
            HashType::Sha1 => MAX_SHA1_LENGTH,
        };
        if !(1..=max_length).contains(&bitmap_length) {
            return Err(Error::config_invalid(format!(
                "bitmap length must be in [1, {max_length}], got {bitmap_length}"
            ))
            .with_context("hash_type", hash_type));
        }

        Ok(FmSketch {
            hash_type,
            bitmaps: vec![vec![false; bitmap_length]; num_bitmaps],
        })
    }

    /// Inserts one occurrence of `id`.
    pub fn insert<'a>(&mut self, id: impl Into<ItemId<'a>>) {
        self.insert_weighted(id, 1);
    }

    /// Inserts `weight` occurrences of `id`. A weight of zero counts as one.
    ///
    /// In universal mode large weights are applied in bulk: the leading bits
    /// that would be set with near certainty are filled directly, and only
    /// a binomially sampled remainder goes through single insertions.
    pub fn insert_weighted<'a>(&mut self, id: impl Into<ItemId<'a>>, weight: u64) {
        let id = id.into();
        let weight = weight.max(1);
        match self.hash_type {
            HashType::Universal => self.insert_universal(id.key(), weight),
            HashType::Sha1 => self.insert_sha1(&id.text(), weight),
        }
    }

    /// FM sketches cannot forget items; this always fails.
    ///
    /// # Errors
    ///
    /// Always returns [`Unsupported`](crate::error::ErrorKind::Unsupported).
    pub fn erase<'a>(&mut self, _id: impl Into<ItemId<'a>>, _weight: u64) -> Result<(), Error> {
        Err(Error::deletions_unsupported("FM"))
    }

    /// Resets every bitmap to zero, keeping the configuration.
    pub fn clear(&mut self) {
        for bitmap in &mut self.bitmaps {
            bitmap.fill(false);
        }
    }

    /// Estimates the number of distinct items inserted.
    ///
    /// The estimate of an empty sketch is not zero but `ceil(bitmaps / PHI)`,
    /// the bias floor of the estimator.
    pub fn count(&self) -> u64 {
        let rows = self.bitmaps.len() as f64;
        let total: usize = self.bitmaps.iter().map(|b| first_zero(b)).sum();
        ((rows / PHI) * 2f64.powf(total as f64 / rows)).ceil() as u64
    }

    /// Merges `other` into this sketch with a bitwise OR.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument)
    /// if the sketches differ in hash type, bitmap count or bitmap length.
    pub fn merge(&mut self, other: &FmSketch) -> Result<(), Error> {
        self.check_compatible(other)?;
        for (mine, theirs) in self.bitmaps.iter_mut().zip(&other.bitmaps) {
            for (bit, other_bit) in mine.iter_mut().zip(theirs) {
                *bit |= *other_bit;
            }
        }
        Ok(())
    }

    /// Returns the union of this sketch and `other`.
    ///
    /// # Errors
    ///
    /// See [`merge`](Self::merge).
    pub fn merged(&self, other: &FmSketch) -> Result<FmSketch, Error> {
        let mut result = self.clone();
        result.merge(other)?;
        Ok(result)
    }

    /// Returns the union of two sketches.
    ///
    /// # Errors
    ///
    /// See [`merge`](Self::merge).
    pub fn merge_pair(first: &FmSketch, second: &FmSketch) -> Result<FmSketch, Error> {
        first.merged(second)
    }

    /// Returns whether every bit set here is also set in `other`.
    ///
    /// # Errors
    ///
    /// See [`merge`](Self::merge).
    pub fn is_subsumed_by(&self, other: &FmSketch) -> Result<bool, Error> {
        self.check_compatible(other)?;
        let subsumed = self
            .bitmaps
            .iter()
            .zip(&other.bitmaps)
            .all(|(mine, theirs)| mine.iter().zip(theirs).all(|(a, b)| !*a || *b));
        Ok(subsumed)
    }

    /// Returns the hash type.
    pub fn hash_type(&self) -> HashType {
        self.hash_type
    }

    /// Returns the number of bitmaps.
    pub fn num_bitmaps(&self) -> usize {
        self.bitmaps.len()
    }

    /// Returns the length of each bitmap in bits.
    pub fn bitmap_length(&self) -> usize {
        self.bitmaps[0].len()
    }

    /// Returns the size of the bit matrix in bytes without prefix packing.
    pub fn uncompressed_size(&self) -> usize {
        (self.num_bitmaps() * self.bitmap_length()).div_ceil(8)
    }

    /// Returns the exact length of [`serialize`](Self::serialize).
    pub fn serialized_size(&self) -> usize {
        let prefix = self.common_prefix();
        HEADER_BYTES
            + self
                .bitmaps
                .iter()
                .map(|b| 1 + significant_bytes(&b[prefix..]))
                .sum::<usize>()
    }

    /// Serializes the sketch to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let prefix = self.common_prefix();
        let mut bytes = SketchBytes::with_capacity(self.serialized_size());
        bytes.write_u8(Family::FM.id);
        bytes.write_u8(self.hash_type as u8);
        bytes.write_u8((self.num_bitmaps() - 1) as u8);
        bytes.write_u8((self.bitmap_length() - 1) as u8);
        bytes.write_u8(prefix as u8);
        for bitmap in &self.bitmaps {
            let packed = pack_bits(&bitmap[prefix..]);
            bytes.write_u8(packed.len() as u8);
            bytes.write(&packed);
        }
        bytes.into_bytes()
    }

    /// Deserializes a sketch from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is truncated, belongs to another sketch
    /// family or describes an invalid configuration.
    pub fn deserialize(bytes: &[u8]) -> Result<FmSketch, Error> {
        let mut cursor = SketchSlice::new(bytes);
        ensure_family(&mut cursor, &Family::FM)?;
        let tag = cursor.read_u8().map_err(make_error("hash_type"))?;
        let hash_type = HashType::try_from(tag)?;
        let num_bitmaps = cursor.read_u8().map_err(make_error("num_bitmaps"))? as usize + 1;
        let bitmap_length = cursor.read_u8().map_err(make_error("bitmap_length"))? as usize + 1;
        let prefix = cursor.read_u8().map_err(make_error("prefix"))? as usize;

        let mut sketch = FmSketch::new(num_bitmaps, bitmap_length, hash_type)
            .map_err(|err| Error::deserial("invalid FM configuration").set_source(err))?;
        if prefix > bitmap_length {
            return Err(Error::deserial(format!(
                "prefix {prefix} exceeds bitmap length {bitmap_length}"
            )));
        }

        let max_bytes = (bitmap_length - prefix).div_ceil(8);
        for bitmap in &mut sketch.bitmaps {
            bitmap[..prefix].fill(true);
            let len = cursor.read_u8().map_err(make_error("bitmap_bytes"))? as usize;
            if len > max_bytes {
                return Err(Error::deserial(format!(
                    "bitmap holds {len} bytes, at most {max_bytes} expected"
                )));
            }
            let mut packed = vec![0u8; len];
            cursor
                .read_exact(&mut packed)
                .map_err(make_error("bitmap"))?;
            for (i, bit) in bitmap[prefix..].iter_mut().enumerate() {
                *bit = packed.get(i / 8).is_some_and(|b| b & (1 << (i % 8)) != 0);
            }
        }
        ensure_consumed(&cursor, &Family::FM)?;
        Ok(sketch)
    }

    fn check_compatible(&self, other: &FmSketch) -> Result<(), Error> {
        if self.hash_type != other.hash_type
            || self.num_bitmaps() != other.num_bitmaps()
            || self.bitmap_length() != other.bitmap_length()
        {
            return Err(Error::incompatible("FM"));
        }
        Ok(())
    }

    /// Length of the all-ones run shared by every bitmap, capped to fit a byte.
    fn common_prefix(&self) -> usize {
        self.bitmaps
            .iter()
            .map(|b| first_zero(b))
            .min()
            .unwrap_or(0)
            .min(u8::MAX as usize)
    }

    fn insert_universal(&mut self, key: u64, weight: u64) {
        let rows = self.bitmaps.len() as u64;
        let width = self.bitmap_length();
        let mut rng = XorShift64::seeded(key);

        let mut weight = weight;
        while weight % rows != 0 {
            let row = rng.next_uniform_long(0, rows as i64) as usize;
            let offset = pick_offset(&mut rng, width);
            self.bitmaps[row][offset] = true;
            weight -= 1;
        }

        let bulk = weight / rows;
        if bulk == 0 {
            return;
        }

        let fill = fill_length(bulk).min(width);
        if fill == 0 {
            for _ in 0..bulk {
                let row = rng.next_uniform_long(0, rows as i64) as usize;
                let offset = pick_offset(&mut rng, width);
                self.bitmaps[row][offset] = true;
            }
            return;
        }

        for bitmap in &mut self.bitmaps {
            bitmap[..fill].fill(true);
        }
        if fill == width {
            return;
        }
        let remaining = pick_binomial(bulk, 0.5f64.powi(fill as i32), &mut rng);
        for _ in 0..remaining {
            for bitmap in &mut self.bitmaps {
                let offset = pick_offset(&mut rng, width);
                bitmap[offset] = true;
            }
        }
    }

    fn insert_sha1(&mut self, text: &[u8], weight: u64) {
        let rows = self.bitmaps.len();
        let width = self.bitmap_length();
        let mut salted = Vec::with_capacity(text.len() + 21);
        for i in 0..weight {
            salted.clear();
            salted.extend_from_slice(i.to_string().as_bytes());
            salted.push(b'-');
            salted.extend_from_slice(text);

            let digest = sha1_digest(&salted);
            let row = digest[0] as usize % rows;
            let offset = sha1_offset(&digest).min(width - 1);
            self.bitmaps[row][offset] = true;
        }
    }
}

impl fmt::Display for FmSketch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.hash_type,
            self.num_bitmaps(),
            self.bitmap_length()
        )?;
        for bitmap in &self.bitmaps {
            f.write_str(" ")?;
            for bit in bitmap {
                f.write_str(if *bit { "1" } else { "0" })?;
            }
        }
        Ok(())
    }
}

/// Builder for [`FmSketch`].
#[derive(Debug, Clone)]
pub struct FmSketchBuilder {
    num_bitmaps: usize,
    bitmap_length: usize,
    hash_type: HashType,
}

impl Default for FmSketchBuilder {
    fn default() -> Self {
        FmSketchBuilder {
            num_bitmaps: DEFAULT_NUM_BITMAPS,
            bitmap_length: DEFAULT_BITMAP_LENGTH,
            hash_type: HashType::Universal,
        }
    }
}

impl FmSketchBuilder {
    /// Sets the number of bitmaps. More bitmaps lower the variance.
    pub fn num_bitmaps(mut self, num_bitmaps: usize) -> Self {
        self.num_bitmaps = num_bitmaps;
        self
    }

    /// Sets the length of each bitmap in bits.
    pub fn bitmap_length(mut self, bitmap_length: usize) -> Self {
        self.bitmap_length = bitmap_length;
        self
    }

    /// Sets the hash type.
    pub fn hash_type(mut self, hash_type: HashType) -> Self {
        self.hash_type = hash_type;
        self
    }

    /// Builds the sketch.
    ///
    /// # Errors
    ///
    /// See [`FmSketch::new`].
    pub fn build(self) -> Result<FmSketch, Error> {
        FmSketch::new(self.num_bitmaps, self.bitmap_length, self.hash_type)
    }
}

fn first_zero(bitmap: &[bool]) -> usize {
    bitmap.iter().position(|b| !*b).unwrap_or(bitmap.len())
}

fn significant_bytes(bits: &[bool]) -> usize {
    bits.iter()
        .rposition(|b| *b)
        .map_or(0, |last| (last + 1).div_ceil(8))
}

fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut packed = vec![0u8; significant_bytes(bits)];
    for (i, bit) in bits.iter().enumerate().take(packed.len() * 8) {
        if *bit {
            packed[i / 8] |= 1 << (i % 8);
        }
    }
    packed
}

/// Draws a geometric offset: the number of trailing zeros of a random word.
///
/// Each word combines the high halves of two draws.
fn pick_offset<R: RandomSource>(rng: &mut R, width: usize) -> usize {
    let mut offset = 0;
    loop {
        let low = rng.next_u64() >> 32;
        let high = rng.next_u64() & 0xFFFF_FFFF_0000_0000;
        let x = low | high;
        if x != 0 {
            offset += x.trailing_zeros() as usize;
            break;
        }
        offset += 64;
        if offset >= width {
            break;
        }
    }
    offset.min(width - 1)
}

/// Number of leading bits that `value` insertions into every bitmap set with
/// near certainty.
fn fill_length(value: u64) -> usize {
    if value <= 10 {
        return 0;
    }
    let value = value as f64;
    let log_value = value.ln();
    (value / (log_value * log_value)).log2().floor() as usize
}

/// Samples Binomial(n, p) by inversion.
fn pick_binomial<R: RandomSource>(n: u64, p: f64, rng: &mut R) -> u64 {
    let q = 1.0 - p;
    let mut r = q.powf(n as f64);
    if r < f64::MIN_POSITIVE {
        // q^n underflows; fall back to the normal approximation.
        let mean = n as f64 * p;
        let sd = (mean * q).sqrt();
        let u1 = 1.0 - rng.next_uniform_double();
        let u2 = rng.next_uniform_double();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        return (mean + sd * z).round().clamp(0.0, n as f64) as u64;
    }

    let s = p / q;
    let a = (n + 1) as f64 * s;
    let mut u = rng.next_uniform_double();
    let mut x = 0u64;
    while u > r && x < n {
        u -= r;
        x += 1;
        r *= a / x as f64 - s;
    }
    x
}

/// Offset of the first set bit after the bitmap selector byte.
fn sha1_offset(digest: &[u8; SHA1_HASH_LENGTH]) -> usize {
    digest[1..]
        .iter()
        .enumerate()
        .find(|(_, byte)| **byte != 0)
        .map_or(MAX_SHA1_LENGTH, |(i, byte)| i * 8 + byte.trailing_zeros() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_config_limits() {
        assert!(FmSketch::new(1, 1, HashType::Universal).is_ok());
        assert!(FmSketch::new(256, 256, HashType::Universal).is_ok());
        assert!(FmSketch::new(256, 152, HashType::Sha1).is_ok());

        for (bitmaps, length, hash_type) in [
            (0, 32, HashType::Universal),
            (257, 32, HashType::Universal),
            (8, 0, HashType::Universal),
            (8, 257, HashType::Universal),
            (8, 153, HashType::Sha1),
        ] {
            let err = FmSketch::new(bitmaps, length, hash_type).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        }
    }

    #[test]
    fn test_erase_is_unsupported() {
        let mut sketch = FmSketch::builder().build().unwrap();
        sketch.insert(1u64);
        let before = sketch.clone();
        let err = sketch.erase(1u64, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert_eq!(sketch, before);
    }

    #[test]
    fn test_fill_length() {
        assert_eq!(fill_length(1), 0);
        assert_eq!(fill_length(10), 0);
        assert_eq!(fill_length(11), 0);
        assert_eq!(fill_length(1_000), 4);
    }

    #[test]
    fn test_pick_offset_is_geometric() {
        let mut rng = XorShift64::seeded(5);
        let n = 20_000;
        let zeros = (0..n).filter(|_| pick_offset(&mut rng, 32) == 0).count();
        let ones = (0..n).filter(|_| pick_offset(&mut rng, 32) == 1).count();
        assert!((9_000..11_000).contains(&zeros), "zeros = {zeros}");
        assert!((4_000..6_000).contains(&ones), "ones = {ones}");
        assert!((0..1_000).all(|_| pick_offset(&mut rng, 3) < 3));
    }

    #[test]
    fn test_pick_binomial_mean() {
        let mut rng = XorShift64::seeded(17);
        let trials = 2_000;
        let sum: u64 = (0..trials).map(|_| pick_binomial(100, 0.25, &mut rng)).sum();
        let mean = sum as f64 / trials as f64;
        assert!((mean - 25.0).abs() < 1.0, "mean = {mean}");
        assert!(pick_binomial(u64::MAX, 0.5, &mut rng) > 0);
    }

    #[test]
    fn test_sha1_offset_scans_past_zero_bytes() {
        let mut digest = [0u8; SHA1_HASH_LENGTH];
        assert_eq!(sha1_offset(&digest), MAX_SHA1_LENGTH);
        digest[0] = 0xff;
        digest[3] = 0b0000_0100;
        assert_eq!(sha1_offset(&digest), 2 * 8 + 2);
    }

    #[test]
    fn test_duplicates_do_not_change_universal_sketch() {
        let mut once = FmSketch::builder().build().unwrap();
        once.insert(99u64);
        let mut twice = once.clone();
        twice.insert(99u64);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_sha1_integer_and_text_ids_agree() {
        let mut a = FmSketch::new(16, 32, HashType::Sha1).unwrap();
        let mut b = a.clone();
        a.insert_weighted(42u64, 3);
        b.insert_weighted("42", 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_bulk_insert_fills_prefix() {
        let mut sketch = FmSketch::new(64, 32, HashType::Universal).unwrap();
        sketch.insert_weighted(7u64, 64 * 1_000);
        assert!(sketch.bitmaps.iter().all(|b| first_zero(b) >= 4));
        assert!(sketch.common_prefix() >= 4);
    }

    #[test]
    fn test_bulk_insert_saturates_short_bitmaps() {
        let mut sketch = FmSketch::new(4, 2, HashType::Universal).unwrap();
        sketch.insert_weighted(1u64, 4 * 1_000_000);
        assert!(sketch.bitmaps.iter().all(|b| b.iter().all(|bit| *bit)));
    }

    #[test]
    fn test_merge_rejects_mismatched_shapes() {
        let mut a = FmSketch::new(8, 32, HashType::Universal).unwrap();
        let b = FmSketch::new(8, 16, HashType::Universal).unwrap();
        let c = FmSketch::new(8, 32, HashType::Sha1).unwrap();
        assert_eq!(a.merge(&b).unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(a.merge(&c).unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert!(a.is_subsumed_by(&b).is_err());
    }

    #[test]
    fn test_pack_bits_drops_trailing_zeros() {
        let mut bits = vec![false; 20];
        bits[0] = true;
        bits[9] = true;
        assert_eq!(pack_bits(&bits), vec![0b0000_0001, 0b0000_0010]);
        assert!(pack_bits(&[false; 8]).is_empty());
    }

    #[test]
    fn test_empty_encoding_is_header_plus_lengths() {
        let sketch = FmSketch::new(10, 32, HashType::Universal).unwrap();
        let bytes = sketch.serialize();
        assert_eq!(bytes.len(), HEADER_BYTES + 10);
        assert_eq!(bytes.len(), sketch.serialized_size());
        assert_eq!(&bytes[..HEADER_BYTES], &[Family::FM.id, 0, 9, 31, 0]);
    }

    #[test]
    fn test_display() {
        let mut sketch = FmSketch::new(2, 4, HashType::Universal).unwrap();
        sketch.bitmaps[1][0] = true;
        assert_eq!(sketch.to_string(), "0 2 4 0000 1000");
    }
}
