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

//! Compression, merging and rank walks over a forest of dyadic nodes,
//! generic over what a node carries.

use std::collections::BTreeMap;
use std::convert::Infallible;

use super::node::NodeKey;
use super::node::QuantileEstimate;
use crate::error::Error;
use crate::fm::FmSketch;

pub(super) type Level<W> = BTreeMap<NodeKey, W>;

/// What a digest node carries: an exact count or a distinct-count sketch.
pub(super) trait NodeWeight: Clone {
    type Error;

    /// Folds `other` into `self`.
    fn absorb(&mut self, other: &Self) -> Result<(), Self::Error>;

    /// The number of inputs this weight stands for.
    fn weight(&self) -> u64;

    /// Whether the node holds nothing and can be dropped.
    fn is_empty(&self) -> bool;
}

impl NodeWeight for u64 {
    type Error = Infallible;

    fn absorb(&mut self, other: &Self) -> Result<(), Infallible> {
        *self += *other;
        Ok(())
    }

    fn weight(&self) -> u64 {
        *self
    }

    fn is_empty(&self) -> bool {
        *self == 0
    }
}

impl NodeWeight for FmSketch {
    type Error = Error;

    fn absorb(&mut self, other: &Self) -> Result<(), Error> {
        self.merge(other)
    }

    fn weight(&self) -> u64 {
        self.count()
    }

    fn is_empty(&self) -> bool {
        false
    }
}

/// Rebuilds the forest `work` so that no node, summed with its parent and
/// sibling, stays below `threshold`.
///
/// Levels are visited bottom-up and each level in post-order. A node whose
/// family sum is below the threshold is folded, with its sibling, into the
/// parent; on the top level it is kept with the folded sum. Every other node
/// is kept unchanged.
pub(super) fn compress<W: NodeWeight>(
    mut work: Vec<Level<W>>,
    min: i64,
    threshold: u64,
) -> Result<Vec<Level<W>>, W::Error> {
    let height = work.len();
    let before: usize = work.iter().map(BTreeMap::len).sum();
    let mut out: Vec<Level<W>> = (0..height).map(|_| BTreeMap::new()).collect();

    for h in 0..height {
        let top = h + 1 == height;
        let keys: Vec<NodeKey> = work[h].keys().copied().collect();
        for key in keys {
            let Some(node) = work[h].get(&key).cloned() else {
                continue;
            };
            if node.is_empty() {
                continue;
            }

            // The root has no family inside the tree.
            let Some((parent_key, sibling_key)) = key.family(min).filter(|_| !top) else {
                out[h].insert(key, node);
                continue;
            };
            let mut sum = node.clone();
            if let Some(parent) = work[h + 1].get(&parent_key) {
                sum.absorb(parent)?;
            }
            if let Some(sibling) = work[h].get(&sibling_key) {
                sum.absorb(sibling)?;
            }

            if sum.weight() < threshold {
                work[h].remove(&sibling_key);
                work[h + 1].insert(parent_key, sum);
            } else {
                out[h].insert(key, node);
            }
        }
    }

    tracing::debug!(
        threshold,
        height,
        nodes_before = before,
        nodes_after = out.iter().map(BTreeMap::len).sum::<usize>(),
        "quantile digest compressed"
    );
    Ok(out)
}

/// Unions two forests level by level, folding nodes with equal ranges.
pub(super) fn union<W: NodeWeight>(
    ours: &[Level<W>],
    theirs: &[Level<W>],
) -> Result<Vec<Level<W>>, W::Error> {
    let mut merged = ours.to_vec();
    for (level, other) in merged.iter_mut().zip(theirs) {
        for (key, weight) in other {
            match level.get_mut(key) {
                Some(existing) => existing.absorb(weight)?,
                None => {
                    level.insert(*key, weight.clone());
                }
            }
        }
    }
    Ok(merged)
}

/// Walks all nodes in post-order, accumulating weights until the running
/// rank reaches `floor(total * q)`.
pub(super) fn quantile<W: NodeWeight>(
    levels: &[Level<W>],
    total: u64,
    q: f64,
) -> Option<QuantileEstimate> {
    assert!(
        (0.0..=1.0).contains(&q),
        "quantile must be in [0, 1], got {q}"
    );
    let target = (total as f64 * q).floor() as u64;

    let mut nodes: Vec<(NodeKey, u64)> = levels
        .iter()
        .flat_map(|level| level.iter().map(|(key, w)| (*key, w.weight())))
        .collect();
    nodes.sort_unstable_by_key(|(key, _)| *key);

    let mut estimate = None;
    let mut rank = 0u64;
    for (key, weight) in nodes {
        rank = rank.saturating_add(weight);
        estimate = Some(QuantileEstimate {
            value: key.high,
            rank,
        });
        if rank >= target {
            break;
        }
    }
    estimate
}
