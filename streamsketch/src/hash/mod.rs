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

//! Hash primitives consumed by the sketches.
//!
//! Two hashing modes are supported, selected per sketch by [`HashType`]:
//!
//! - [`HashType::Universal`]: items are reduced to a 64-bit integer key and fed
//!   to independently seeded [`UniversalHash`] functions (or, for FM sketches,
//!   to a pseudo-random generator seeded by the key).
//! - [`HashType::Sha1`]: items are hashed by content with SHA-1 and the digest
//!   bytes are sliced directly.

use std::borrow::Cow;
use std::fmt;

use sha1::Digest;
use sha1::Sha1;

use crate::error::Error;

mod universal;

pub use self::universal::UniversalHash;

/// Length in bytes of a SHA-1 digest.
pub const SHA1_HASH_LENGTH: usize = 20;

/// Seed used to fold byte-string identifiers into 64-bit keys.
pub(crate) const DEFAULT_UPDATE_SEED: u32 = 9001;

/// Hash family used by a sketch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HashType {
    /// Universal (Carter-Wegman) hashing over integer keys.
    Universal = 0,
    /// SHA-1 content hashing.
    Sha1 = 1,
}

impl TryFrom<u8> for HashType {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self, Error> {
        match tag {
            0 => Ok(HashType::Universal),
            1 => Ok(HashType::Sha1),
            _ => Err(Error::unsupported(format!("hash type {tag} is not supported"))),
        }
    }
}

impl fmt::Display for HashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

/// Identifier of a stream item: a raw integer or an opaque byte string.
///
/// In universal mode integers are used as keys directly and byte strings are
/// folded to 64 bits with MurmurHash3, so `Int(5)` and `Bytes(b"5")` are
/// different items. In SHA-1 mode integers are hashed by their decimal text,
/// so the two spellings denote the same item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemId<'a> {
    /// An integer identifier.
    Int(u64),
    /// A byte-string identifier.
    Bytes(&'a [u8]),
}

impl ItemId<'_> {
    /// The 64-bit key used by universal hashing.
    pub fn key(&self) -> u64 {
        match *self {
            ItemId::Int(v) => v,
            ItemId::Bytes(b) => fold_bytes(b),
        }
    }

    /// The bytes hashed in SHA-1 mode.
    pub fn text(&self) -> Cow<'_, [u8]> {
        match *self {
            ItemId::Int(v) => Cow::Owned(v.to_string().into_bytes()),
            ItemId::Bytes(b) => Cow::Borrowed(b),
        }
    }

    /// SHA-1 digest of [`text`](Self::text).
    pub fn sha1(&self) -> [u8; SHA1_HASH_LENGTH] {
        sha1_digest(&self.text())
    }
}

impl From<u64> for ItemId<'_> {
    fn from(v: u64) -> Self {
        ItemId::Int(v)
    }
}

impl<'a> From<&'a str> for ItemId<'a> {
    fn from(s: &'a str) -> Self {
        ItemId::Bytes(s.as_bytes())
    }
}

impl<'a> From<&'a String> for ItemId<'a> {
    fn from(s: &'a String) -> Self {
        ItemId::Bytes(s.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for ItemId<'a> {
    fn from(b: &'a [u8]) -> Self {
        ItemId::Bytes(b)
    }
}

/// Computes the SHA-1 digest of `bytes`.
pub fn sha1_digest(bytes: &[u8]) -> [u8; SHA1_HASH_LENGTH] {
    let digest = Sha1::digest(bytes);
    let mut out = [0u8; SHA1_HASH_LENGTH];
    out.copy_from_slice(&digest);
    out
}

/// Folds a byte string into a 64-bit key.
pub(crate) fn fold_bytes(bytes: &[u8]) -> u64 {
    let (h1, _) = mur3::murmurhash3_x64_128(bytes, DEFAULT_UPDATE_SEED);
    h1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_type_tags() {
        assert_eq!(HashType::try_from(0).unwrap(), HashType::Universal);
        assert_eq!(HashType::try_from(1).unwrap(), HashType::Sha1);
        let err = HashType::try_from(9).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Unsupported);
    }

    #[test]
    fn test_sha1_known_vector() {
        let digest = sha1_digest(b"abc");
        assert_eq!(
            digest[..4],
            [0xa9, 0x99, 0x3e, 0x36],
            "SHA-1(\"abc\") starts with a9993e36"
        );
    }

    #[test]
    fn test_item_id_spellings() {
        assert_eq!(ItemId::from(42u64).text().as_ref(), b"42");
        assert_eq!(ItemId::from(42u64).sha1(), ItemId::from("42").sha1());
        assert_ne!(ItemId::from(42u64).key(), ItemId::from("42").key());
        assert_eq!(ItemId::from("abc").key(), ItemId::from("abc").key());
    }
}
