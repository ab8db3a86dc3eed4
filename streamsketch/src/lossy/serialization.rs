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

//! Binary layout constants for Lossy Counting.
//!
//! ```text
//! family        u8
//! epsilon       f64
//! input length  u64
//! bucket        u64
//! entries       u64
//! per entry:    key | count u64 | delta u64
//! ```

/// Size of the fixed header, family byte included.
pub const HEADER_BYTES: usize = 1 + 4 * 8;

/// Size of the count and delta following every key.
pub const ENTRY_COUNTERS_BYTES: usize = 2 * 8;
