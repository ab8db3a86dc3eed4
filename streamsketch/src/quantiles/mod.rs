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

//! Quantile Digests (Shrivastava et al.).
//!
//! A digest summarizes integer values from a bounded domain `[min, max]` as
//! a forest of dyadic ranges: the leaves are single values and every level
//! up doubles the range width. Compression with factor `k` folds ranges
//! whose counts, together with their parent and sibling, stay below
//! `floor(N / k)`. This keeps `O(k log(max - min))` nodes while the rank
//! error of any quantile stays within a small multiple of `N / k`.
//!
//! [`QuantileDigestFm`] replaces node counts with FM sketches so that
//! digests built at different sites over overlapping inputs merge without
//! double counting.
//!
//! Digests are built in one pass from values or a histogram and change
//! afterwards only by merging.
//!
//! # Usage
//!
//! ```rust
//! # use streamsketch::quantiles::QuantileDigest;
//! let values: Vec<i64> = (0..10_000).map(|i| i % 1001).collect();
//! let digest = QuantileDigest::from_values(100, 0, 1000, &values).unwrap();
//! let median = digest.quantile(0.5).unwrap();
//! assert!((median.value() - 500).abs() <= 200);
//! ```

mod digest;
mod digest_fm;
mod node;
mod serialization;
mod tree;

pub use self::digest::QuantileDigest;
pub use self::digest_fm::QuantileDigestFm;
pub use self::node::DigestNode;
pub use self::node::QuantileEstimate;
