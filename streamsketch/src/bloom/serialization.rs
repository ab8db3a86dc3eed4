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

//! Binary layout constants for Bloom filters.
//!
//! ```text
//! family      u8
//! hash type   u8
//! num_hashes  u64
//! num_bits    u64
//! hashes      universal mode only: num_hashes × (k u64, k × coefficient u64)
//! bits        one byte (0 or 1) per bit; num_bits × num_hashes for Multi-Bloom
//! ```

/// Size of the fixed header, family byte included.
pub const HEADER_BYTES: usize = 2 + 2 * 8;

/// Exclusive upper bound on the vector length in SHA-1 mode.
pub const MAX_SHA1_BITS: usize = 1 << 16;

/// Largest number of hashes in SHA-1 mode: one per 16-bit digest window.
pub const MAX_SHA1_HASHES: usize = crate::hash::SHA1_HASH_LENGTH / 2;
