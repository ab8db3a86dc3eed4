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

//! Flajolet-Martin distinct counting sketch.
//!
//! The sketch keeps a matrix of bitmaps. Every inserted item sets one bit at
//! a geometrically distributed offset in one bitmap; the position of the
//! first unset bit, averaged over all bitmaps, estimates the logarithm of the
//! number of distinct items.
//!
//! Sketches only grow: there is no deletion, and merging is a bitwise OR.
//!
//! # Usage
//!
//! ```rust
//! # use streamsketch::fm::FmSketch;
//! # use streamsketch::hash::HashType;
//! let mut sketch = FmSketch::builder()
//!     .num_bitmaps(64)
//!     .bitmap_length(32)
//!     .hash_type(HashType::Universal)
//!     .build()
//!     .unwrap();
//! for id in 0..10_000u64 {
//!     sketch.insert(id);
//! }
//! let estimate = sketch.count();
//! assert!(estimate > 5_000 && estimate < 20_000);
//! ```
//!
//! # Serialization
//!
//! ```rust
//! # use streamsketch::fm::FmSketch;
//! let mut sketch = FmSketch::builder().build().unwrap();
//! sketch.insert("apple");
//!
//! let bytes = sketch.serialize();
//! let decoded = FmSketch::deserialize(&bytes).unwrap();
//! assert_eq!(decoded, sketch);
//! ```

mod serialization;
mod sketch;

pub use self::sketch::FmSketch;
pub use self::sketch::FmSketchBuilder;
