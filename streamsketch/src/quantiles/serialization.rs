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

//! Binary layout constants for Quantile Digests.
//!
//! Plain digest:
//!
//! ```text
//! family        u8
//! min           i64
//! max           i64
//! k             u64
//! input length  u64
//! height        u64
//! per level     width u64, then width × (low i64, high i64, count u64)
//! ```
//!
//! FM-composite digest:
//!
//! ```text
//! family        u8
//! min           i64
//! max           i64
//! k             u64
//! height        u64
//! fm bits       u64
//! fm bitmaps    u64
//! total         length-prefixed FM sketch
//! per level     width u64, then width × (low i64, high i64, length-prefixed FM sketch)
//! ```

/// Size of the plain digest header, family byte included.
pub const HEADER_BYTES: usize = 1 + 5 * 8;

/// Size of the FM-composite digest header, family byte included.
pub const FM_HEADER_BYTES: usize = 1 + 6 * 8;

/// Size of a level's width field.
pub const LEVEL_BYTES: usize = 8;

/// Size of a plain node.
pub const NODE_BYTES: usize = 3 * 8;

/// Smallest possible FM-composite node: bounds and an empty length prefix.
pub const FM_NODE_MIN_BYTES: usize = 3 * 8;

/// Number of bitmaps of the FM sketch counting the total input length.
pub const TOTAL_FM_BITMAPS: usize = 30;
