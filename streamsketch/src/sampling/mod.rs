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

//! Counting Samples (Gibbons and Matias).
//!
//! A bounded reservoir of keys. A new key enters with probability `1 / tau`;
//! once inside, every further occurrence is tallied exactly. When the
//! reservoir is full, `tau` is inflated by 10% per round and the entries are
//! thinned as if they had been sampled with the higher threshold from the
//! start, until at least one key leaves.
//!
//! Frequencies of sampled keys are reported as the exact tally plus a
//! correction for the occurrences missed before the key was admitted.
//!
//! The sketch owns its random source, which is not part of the binary
//! encoding: pass one to [`CountingSample::deserialize`].
//!
//! # Usage
//!
//! ```rust
//! # use streamsketch::common::XorShift64;
//! # use streamsketch::sampling::CountingSample;
//! let mut sample = CountingSample::new(100, XorShift64::seeded(1)).unwrap();
//! for i in 0..10_000u64 {
//!     sample.insert(i % 500);
//! }
//! assert!(sample.len() <= 100);
//! assert!(sample.sampling_factor() < 1.0);
//! ```

mod serialization;
mod sketch;

pub use self::sketch::CountingSample;
