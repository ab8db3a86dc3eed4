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

use crate::codec::SketchSlice;
use crate::codec::family::Family;
use crate::error::Error;

/// Returns a mapper from an I/O failure to a truncation error naming `tag`.
pub(crate) fn make_error(tag: &'static str) -> impl FnOnce(std::io::Error) -> Error {
    move |_| Error::insufficient_data(tag)
}

/// Reads the leading family byte and checks it against `family`.
pub(crate) fn ensure_family(cursor: &mut SketchSlice<'_>, family: &Family) -> Result<(), Error> {
    let family_id = cursor.read_u8().map_err(make_error("family_id"))?;
    family.validate_id(family_id)
}

/// Fails if bytes are left over after a complete decode.
pub(crate) fn ensure_consumed(cursor: &SketchSlice<'_>, family: &Family) -> Result<(), Error> {
    match cursor.remaining() {
        0 => Ok(()),
        n => Err(Error::deserial(format!(
            "{n} trailing bytes after {} payload",
            family.name
        ))),
    }
}

/// Converts a decoded 64-bit length into `usize`, bounding it by the bytes
/// that could possibly back it.
pub(crate) fn ensure_len(
    cursor: &SketchSlice<'_>,
    len: u64,
    min_item_bytes: usize,
    tag: &'static str,
) -> Result<usize, Error> {
    let needed = (len as u128) * (min_item_bytes as u128);
    if needed > cursor.remaining() as u128 {
        return Err(Error::insufficient_data(tag).with_context("declared", len));
    }
    Ok(len as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_ensure_family_rejects_other_family() {
        let bytes = [Family::AMS.id];
        let mut cursor = SketchSlice::new(&bytes);
        let err = ensure_family(&mut cursor, &Family::FM).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDeserializeData);
    }

    #[test]
    fn test_ensure_len_bounds_by_remaining() {
        let bytes = [0u8; 16];
        let cursor = SketchSlice::new(&bytes);
        assert_eq!(ensure_len(&cursor, 2, 8, "entries").unwrap(), 2);
        assert!(ensure_len(&cursor, 3, 8, "entries").is_err());
        assert!(ensure_len(&cursor, u64::MAX, 8, "entries").is_err());
    }
}
