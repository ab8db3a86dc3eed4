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

//! Bloom filters for approximate set membership.
//!
//! [`BloomFilter`] sets `num_hashes` positions of one shared bit vector per
//! item. [`MultiBloomFilter`] gives every hash function a private vector of
//! `num_bits` bits, so positions chosen by different hashes never collide.
//!
//! Inserted items are always reported as present; other items may be
//! reported as present with a probability that grows as the vector fills.
//! Filters never forget: [`BloomFilter::erase`] always fails.
//!
//! Two hashing modes are available, see [`HashType`](crate::hash::HashType).
//! In SHA-1 mode the positions are 16-bit windows of one digest, which limits
//! filters to fewer than 2^16 bits and at most 10 hashes.
//!
//! # Usage
//!
//! ```rust
//! # use streamsketch::bloom::BloomFilter;
//! let mut filter = BloomFilter::builder()
//!     .num_bits(1024)
//!     .num_hashes(3)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//! filter.insert(5u64);
//! filter.insert("apple");
//! assert!(filter.contains(5u64));
//! assert!(filter.contains("apple"));
//! assert!(filter.num_bits_set() <= 6);
//! ```

mod builder;
mod filter;
mod multi;
mod serialization;
mod sketch;

pub use self::builder::BloomFilterBuilder;
pub use self::builder::MultiBloomFilterBuilder;
pub use self::multi::MultiBloomFilter;
pub use self::sketch::BloomFilter;
