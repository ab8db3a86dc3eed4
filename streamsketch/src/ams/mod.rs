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

//! AMS sketches for frequency moments and point frequencies.
//!
//! [`AmsSketch`] keeps `num_groups × group_size` signed counters, each paired
//! with its own four-wise independent sign hash. The second frequency moment
//! is estimated as the median over groups of the mean squared counter.
//!
//! [`FastAmsSketch`] keeps one row of counters per hash pair: a bucket hash
//! picks the counter and a sign hash picks the sign, so an update touches one
//! counter per row.
//!
//! Both sketches are linear, so erasing is the exact inverse of inserting and
//! sketches built with the same seed and dimensions can be added together.
//!
//! # Usage
//!
//! ```rust
//! # use streamsketch::ams::AmsSketch;
//! let mut sketch = AmsSketch::builder()
//!     .dimensions(64, 5)
//!     .seed(7)
//!     .build()
//!     .unwrap();
//! sketch.insert(3u64, 10);
//! assert_eq!(sketch.frequency(3u64), 10);
//! assert_eq!(sketch.f2_norm(), 100.0);
//! ```

mod fast;
mod serialization;
mod sketch;

pub use self::fast::FastAmsSketch;
pub use self::fast::FastAmsSketchBuilder;
pub use self::sketch::AmsSketch;
pub use self::sketch::AmsSketchBuilder;
