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

//! Dyadic node addressing shared by both digest flavors.

use std::cmp::Ordering;

/// The value range `[low, high]` covered by a digest node.
///
/// Keys order in post-order of the complete binary tree over the domain:
/// ascending by upper bound, then descending by lower bound, so that a
/// parent follows its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct NodeKey {
    pub(super) low: i64,
    pub(super) high: i64,
}

impl Ord for NodeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.high
            .cmp(&other.high)
            .then_with(|| other.low.cmp(&self.low))
    }
}

impl PartialOrd for NodeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl NodeKey {
    pub(super) fn leaf(value: i64) -> Self {
        NodeKey {
            low: value,
            high: value,
        }
    }

    fn span(&self) -> i128 {
        self.high as i128 - self.low as i128 + 1
    }

    /// Whether this node is the left child of its parent. Alignment is
    /// relative to the domain minimum `min`.
    fn is_left_child(&self, min: i64) -> bool {
        (self.low as i128 - min as i128) % (2 * self.span()) == 0
    }

    /// Returns the parent range and the sibling range, or `None` when either
    /// of them does not fit in `i64`.
    pub(super) fn family(&self, min: i64) -> Option<(NodeKey, NodeKey)> {
        let span = self.span();
        let (low, high) = (self.low as i128, self.high as i128);
        let (parent, sibling) = if self.is_left_child(min) {
            ((low, high + span), (high + 1, high + span))
        } else {
            ((low - span, high), (low - span, low - 1))
        };
        let key = |(low, high): (i128, i128)| {
            Some(NodeKey {
                low: i64::try_from(low).ok()?,
                high: i64::try_from(high).ok()?,
            })
        };
        Some((key(parent)?, key(sibling)?))
    }

    /// Whether the node is a dyadic range of `2^level` values aligned
    /// relative to `min` and inside `[min, max]`'s tree.
    pub(super) fn is_valid_at(&self, level: usize, min: i64, max: i64) -> bool {
        let span = 1i128 << level;
        self.low <= self.high
            && self.low >= min
            && self.low <= max
            && self.span() == span
            && (self.low as i128 - min as i128) % span == 0
    }
}

/// A node of a Quantile Digest: a value range and the number of inputs
/// attributed to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DigestNode {
    pub(super) low: i64,
    pub(super) high: i64,
    pub(super) count: u64,
}

impl DigestNode {
    /// Returns the lowest value of the range.
    pub fn low(&self) -> i64 {
        self.low
    }

    /// Returns the highest value of the range.
    pub fn high(&self) -> i64 {
        self.high
    }

    /// Returns the number of inputs attributed to the range.
    pub fn count(&self) -> u64 {
        self.count
    }
}

/// Result of a quantile query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantileEstimate {
    pub(super) value: i64,
    pub(super) rank: u64,
}

impl QuantileEstimate {
    /// Returns the estimated quantile: the upper bound of the node at which
    /// the running rank reached the target.
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Returns the accumulated rank at [`value`](Self::value). It may exceed
    /// the true rank by up to the compression threshold.
    pub fn rank(&self) -> u64 {
        self.rank
    }
}

/// Number of levels of a digest over `[min, max]`:
/// `ceil(log2(max - min + 1) + 1)`.
pub(super) fn tree_height(min: i64, max: i64) -> usize {
    let width = max.abs_diff(min) as u128 + 1;
    // exact ceil(log2(width)) + 1
    let ceil_log2 = if width.is_power_of_two() {
        width.ilog2()
    } else {
        width.ilog2() + 1
    };
    ceil_log2 as usize + 1
}

/// Whether the full tree of `height` levels rooted at `min` ends inside
/// the `i64` range.
pub(super) fn tree_fits(min: i64, height: usize) -> bool {
    height <= 64 && min as i128 + (1i128 << (height - 1)) - 1 <= i64::MAX as i128
}

/// Post-order rank of the node `[low, high]`, with both bounds counted from
/// one. Used to salt per-node distinct-count keys.
pub(super) fn node_rank(low: u64, high: u64) -> u64 {
    let mut rank = 0u64;
    let mut i = low.saturating_sub(1);
    while i > 1 {
        let n = 1u64 << i.ilog2();
        rank = rank.wrapping_add(2 * n - 1);
        i -= n;
    }
    rank = rank.wrapping_add(i);
    if low != high {
        let span = high.wrapping_sub(low).wrapping_add(1);
        let bits = span.checked_ilog2().unwrap_or(0);
        rank = rank.wrapping_add((1u64 << (bits + 1).min(63)).wrapping_sub(1));
    }
    rank
}
