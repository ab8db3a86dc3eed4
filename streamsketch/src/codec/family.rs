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

use crate::error::Error;

/// Defines the families of sketches that own a binary encoding.
///
/// Every encoding starts with the family id byte so that a buffer produced by
/// one sketch type is rejected by the decoder of another.
pub struct Family {
    /// The byte ID for this family.
    pub id: u8,
    /// The name for this family.
    pub name: &'static str,
}

impl Family {
    /// Flajolet-Martin distinct counting sketch.
    pub const FM: Family = Family { id: 1, name: "FM" };

    /// AMS second-moment sketch.
    pub const AMS: Family = Family { id: 2, name: "AMS" };

    /// Fast-AMS sketch with bucketed rows.
    pub const FAST_AMS: Family = Family {
        id: 3,
        name: "FastAMS",
    };

    /// Bloom filter over a single shared bit vector.
    pub const BLOOM: Family = Family {
        id: 4,
        name: "BloomFilter",
    };

    /// Bloom filter with one private bit vector per hash.
    pub const MULTI_BLOOM: Family = Family {
        id: 5,
        name: "MultiBloomFilter",
    };

    /// Lossy Counting heavy hitters.
    pub const LOSSY_COUNTING: Family = Family {
        id: 6,
        name: "LossyCounting",
    };

    /// Counting Sample reservoir.
    pub const COUNTING_SAMPLE: Family = Family {
        id: 7,
        name: "CountingSample",
    };

    /// Quantile Digest.
    pub const QUANTILE_DIGEST: Family = Family {
        id: 8,
        name: "QuantileDigest",
    };

    /// Quantile Digest with FM sketches as node counters.
    pub const QUANTILE_DIGEST_FM: Family = Family {
        id: 9,
        name: "QuantileDigestFM",
    };
}

impl Family {
    pub fn validate_id(&self, family_id: u8) -> Result<(), Error> {
        if family_id != self.id {
            Err(Error::invalid_family(self.id, family_id, self.name))
        } else {
            Ok(())
        }
    }
}
