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

//! # StreamSketch
//!
//! Probabilistic summaries of data streams that are too large to store
//! exactly. Every sketch supports incremental insertion, a compact binary
//! encoding, merging of independently built instances and estimation queries.
//!
//! Included sketch families:
//!
//! - [`fm`]: Flajolet-Martin distinct counting.
//! - [`ams`]: AMS and Fast-AMS second moment and point frequency estimators.
//! - [`bloom`]: Bloom and Multi-Bloom membership filters.
//! - [`lossy`]: Lossy Counting heavy hitters.
//! - [`sampling`]: Counting Sample reservoir.
//! - [`quantiles`]: Quantile Digest and its FM-composite variant.
//!
//! Sketches are plain values. They are `Clone` (deep copies) and have no
//! interior mutability; concurrent use requires external synchronization.
//!
//! The binary encodings are host-native (byte order and integer width) and
//! are meant for same-host persistence, not as a wire format.

#![warn(missing_docs)]

pub mod ams;
pub mod bloom;
pub mod common;
pub mod error;
pub mod fm;
pub mod hash;
pub mod lossy;
pub mod quantiles;
pub mod sampling;

mod codec;
