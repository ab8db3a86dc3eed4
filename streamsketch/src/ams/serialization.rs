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

//! Binary layout constants for AMS sketches.
//!
//! Both variants store three `u64` dimensions after the family byte and then
//! every counter as a native `i64`. Hash functions are not stored; they are
//! drawn again from the seed.
//!
//! ```text
//! AMS:      family u8 | group_size u64 | num_groups u64 | seed u64 | counters
//! Fast-AMS: family u8 | num_hashes u64 | num_counters u64 | seed u64 | counters
//! ```

/// Size of the fixed header, family byte included.
pub const HEADER_BYTES: usize = 1 + 3 * 8;

/// Size of one serialized counter.
pub const COUNTER_BYTES: usize = 8;

/// Independence of the sign hashes.
pub const SIGN_HASH_INDEPENDENCE: usize = 4;

/// Upper bound on the number of counters a sketch may allocate.
pub const MAX_COUNTERS: usize = isize::MAX as usize / size_of::<crate::hash::UniversalHash>();
