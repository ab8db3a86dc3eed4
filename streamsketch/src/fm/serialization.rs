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

//! Binary layout constants for FM sketches.
//!
//! ```text
//! family      u8
//! hash type   u8
//! bitmaps - 1 u8
//! length - 1  u8
//! prefix      u8   shortest all-ones run shared by every bitmap
//! per bitmap:
//!   n         u8   significant bytes after the prefix
//!   bits      n    bits packed LSB first, trailing zero bytes dropped
//! ```

/// Size of the fixed header, family byte included.
pub const HEADER_BYTES: usize = 5;

/// Largest number of bitmaps.
pub const MAX_BITMAPS: usize = 256;

/// Largest bitmap length in universal hashing mode.
pub const MAX_UNIVERSAL_LENGTH: usize = 256;

/// Largest bitmap length in SHA-1 mode: every digest byte but the one that
/// selects the bitmap.
pub const MAX_SHA1_LENGTH: usize = (crate::hash::SHA1_HASH_LENGTH - 1) * 8;
