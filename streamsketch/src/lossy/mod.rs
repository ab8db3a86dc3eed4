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

//! Lossy Counting heavy hitters (Manku and Motwani).
//!
//! The stream is cut into buckets of `ceil(1 / epsilon)` items. Each tracked
//! item carries a count and a `delta` bounding how many of its occurrences
//! may have been missed before it was tracked. At every bucket boundary the
//! entries whose `count + delta` does not exceed the current bucket id are
//! evicted, which keeps the table at `O(log(epsilon N) / epsilon)` entries
//! while the true frequency of every item stays within
//! `[count, count + delta]`, and `delta <= epsilon N`.
//!
//! Deletions are not supported: an adversarial mix of inserts and deletes
//! produces false dismissals.
//!
//! # Usage
//!
//! ```rust
//! # use streamsketch::lossy::LossyCounting;
//! let mut sketch = LossyCounting::new(0.01).unwrap();
//! for i in 0..1_000u64 {
//!     sketch.insert(i % 10);
//! }
//! assert_eq!(sketch.min_frequency(&3u64), 100);
//! let frequent = sketch.frequent(50);
//! assert_eq!(frequent.len(), 10);
//! ```

mod serialization;
mod sketch;

pub use self::sketch::LossyCounting;
pub use self::sketch::LossyRow;
