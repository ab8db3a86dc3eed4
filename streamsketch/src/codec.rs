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

//! Byte-level encoder and decoder shared by every sketch family.
//!
//! All multi-byte fields use the host's native byte order. The encodings are
//! meant for same-host persistence and in-process transfer, not as a portable
//! wire format.

pub(crate) mod assert;
pub(crate) mod family;

use std::io;
use std::io::Cursor;
use std::io::Read;

use byteorder::ByteOrder;
use byteorder::NativeEndian;
use byteorder::ReadBytesExt;

pub(crate) struct SketchBytes {
    bytes: Vec<u8>,
}

impl SketchBytes {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn write(&mut self, buf: &[u8]) {
        self.bytes.extend_from_slice(buf);
    }

    pub fn write_u8(&mut self, n: u8) {
        self.bytes.push(n);
    }

    pub fn write_u64(&mut self, n: u64) {
        let mut buf = [0u8; 8];
        NativeEndian::write_u64(&mut buf, n);
        self.write(&buf);
    }

    pub fn write_i64(&mut self, n: i64) {
        let mut buf = [0u8; 8];
        NativeEndian::write_i64(&mut buf, n);
        self.write(&buf);
    }

    pub fn write_f64(&mut self, n: f64) {
        let mut buf = [0u8; 8];
        NativeEndian::write_f64(&mut buf, n);
        self.write(&buf);
    }

    /// Writes a length-prefixed byte string.
    pub fn write_len_prefixed(&mut self, buf: &[u8]) {
        self.write_u64(buf.len() as u64);
        self.write(buf);
    }
}

pub(crate) struct SketchSlice<'a> {
    slice: Cursor<&'a [u8]>,
}

impl<'a> SketchSlice<'a> {
    pub fn new(slice: &'a [u8]) -> SketchSlice<'a> {
        SketchSlice {
            slice: Cursor::new(slice),
        }
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.slice.read_exact(buf)
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        self.slice.read_u8()
    }

    pub fn read_u64(&mut self) -> io::Result<u64> {
        self.slice.read_u64::<NativeEndian>()
    }

    pub fn read_i64(&mut self) -> io::Result<i64> {
        self.slice.read_i64::<NativeEndian>()
    }

    pub fn read_f64(&mut self) -> io::Result<f64> {
        self.slice.read_f64::<NativeEndian>()
    }

    /// Reads a byte string written by [`SketchBytes::write_len_prefixed`].
    pub fn read_len_prefixed(&mut self) -> io::Result<Vec<u8>> {
        let len = self.read_u64()?;
        if len > self.remaining() as u64 {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
        }
        let mut buf = vec![0u8; len as usize];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Decodes a value from the unread bytes with `decode`, which returns the
    /// value and how many bytes it consumed.
    pub fn decode_with<T, E>(
        &mut self,
        decode: impl FnOnce(&[u8]) -> Result<(T, usize), E>,
    ) -> Result<T, E> {
        let start = self.position();
        let (value, consumed) = decode(&self.slice.get_ref()[start..])?;
        self.slice.set_position((start + consumed) as u64);
        Ok(value)
    }

    /// Number of bytes not consumed yet.
    pub fn remaining(&self) -> usize {
        let len = self.slice.get_ref().len();
        len.saturating_sub(self.slice.position() as usize)
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.slice.position() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_fields_read_back() {
        let mut bytes = SketchBytes::with_capacity(32);
        bytes.write_u8(7);
        bytes.write_u64(u64::MAX - 1);
        bytes.write_i64(-42);
        bytes.write_f64(0.25);
        bytes.write_len_prefixed(b"abc");
        let bytes = bytes.into_bytes();
        assert_eq!(bytes.len(), 1 + 8 + 8 + 8 + 8 + 3);

        let mut slice = SketchSlice::new(&bytes);
        assert_eq!(slice.read_u8().unwrap(), 7);
        assert_eq!(slice.read_u64().unwrap(), u64::MAX - 1);
        assert_eq!(slice.read_i64().unwrap(), -42);
        assert_eq!(slice.read_f64().unwrap(), 0.25);
        assert_eq!(slice.read_len_prefixed().unwrap(), b"abc".to_vec());
        assert_eq!(slice.remaining(), 0);
        assert!(slice.read_u8().is_err());
    }

    #[test]
    fn test_len_prefix_longer_than_buffer() {
        let mut bytes = SketchBytes::with_capacity(16);
        bytes.write_u64(1000);
        bytes.write(b"short");
        let bytes = bytes.into_bytes();
        let mut slice = SketchSlice::new(&bytes);
        assert!(slice.read_len_prefixed().is_err());
    }
}
