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

use crate::error::Error;

/// Keys stored by the keyed sketches ([Lossy Counting](crate::lossy) and
/// [Counting Sample](crate::sampling)).
///
/// Keys are kept in key order, so they must be [`Ord`]. The binary form is
/// host-native, like the rest of the sketch encodings.
pub trait SketchKey: Ord + Clone {
    /// Appends the binary form of this key to `out`.
    fn encode_key(&self, out: &mut Vec<u8>);

    /// Decodes one key from the front of `bytes`, returning the key and the
    /// number of bytes consumed.
    fn decode_key(bytes: &[u8]) -> Result<(Self, usize), Error>;
}

impl SketchKey for u64 {
    fn encode_key(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_ne_bytes());
    }

    fn decode_key(bytes: &[u8]) -> Result<(Self, usize), Error> {
        let raw = bytes
            .first_chunk::<8>()
            .ok_or_else(|| Error::insufficient_data("key"))?;
        Ok((u64::from_ne_bytes(*raw), 8))
    }
}

impl SketchKey for String {
    fn encode_key(&self, out: &mut Vec<u8>) {
        (self.len() as u64).encode_key(out);
        out.extend_from_slice(self.as_bytes());
    }

    fn decode_key(bytes: &[u8]) -> Result<(Self, usize), Error> {
        let (len, offset) = u64::decode_key(bytes)?;
        let end = usize::try_from(len)
            .ok()
            .and_then(|len| offset.checked_add(len))
            .filter(|end| *end <= bytes.len())
            .ok_or_else(|| Error::insufficient_data("key"))?;
        let key = std::str::from_utf8(&bytes[offset..end])
            .map_err(|err| Error::deserial("key is not valid UTF-8").set_source(err))?;
        Ok((key.to_owned(), end))
    }
}
