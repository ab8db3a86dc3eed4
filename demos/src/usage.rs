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

//! A short walkthrough of every sketch in the library.

use streamsketch::ams::AmsSketch;
use streamsketch::ams::FastAmsSketch;
use streamsketch::bloom::BloomFilter;
use streamsketch::bloom::MultiBloomFilter;
use streamsketch::common::XorShift64;
use streamsketch::error::Error;
use streamsketch::fm::FmSketch;
use streamsketch::hash::HashType;
use streamsketch::lossy::LossyCounting;
use streamsketch::quantiles::QuantileDigest;
use streamsketch::quantiles::QuantileDigestFm;
use streamsketch::sampling::CountingSample;

fn main() -> Result<(), Error> {
    fm()?;
    ams()?;
    bloom()?;
    lossy()?;
    counting_sample()?;
    quantiles()?;
    Ok(())
}

fn fm() -> Result<(), Error> {
    println!("== Flajolet-Martin ==");
    let mut sketch = FmSketch::builder().num_bitmaps(64).bitmap_length(32).build()?;
    for i in 0..10_000u64 {
        sketch.insert(i);
    }
    println!("Distinct values inserted: 10000");
    println!("Estimated distinct values: {}", sketch.count());

    for i in 0..10_000u64 {
        sketch.insert(i);
    }
    println!("Estimate after duplicates: {}", sketch.count());

    let mut other = FmSketch::builder().num_bitmaps(64).bitmap_length(32).build()?;
    for i in 5_000..15_000u64 {
        other.insert(i);
    }
    let union = sketch.merged(&other)?;
    println!("Estimate of the union (15000 distinct): {}", union.count());

    let bytes = union.serialize();
    println!("Serialized size: {} bytes (uncompressed {})", bytes.len(), union.uncompressed_size());
    let restored = FmSketch::deserialize(&bytes)?;
    println!("Estimate after deserialization: {}", restored.count());

    let mut words = FmSketch::builder().hash_type(HashType::Sha1).build()?;
    for word in ["apple", "banana", "cherry", "apple"] {
        words.insert(word);
    }
    println!("SHA-1 sketch of 3 distinct words: {}\n", words.count());
    Ok(())
}

fn ams() -> Result<(), Error> {
    println!("== AMS ==");
    let mut sketch = AmsSketch::builder().dimensions(256, 5).seed(1).build()?;
    let mut fast = FastAmsSketch::builder().num_counters(1024).num_hashes(5).seed(1).build()?;
    for i in 0..1_000u64 {
        let weight = if i < 10 { 100 } else { 1 };
        sketch.insert(i, weight);
        fast.insert(i, weight);
    }
    println!("Exact F2: {}", 10 * 100 * 100 + 990);
    println!("Estimated F2: {:.0}", sketch.f2_norm());
    println!("Fast-AMS frequency of item 3 (exact 100): {}", fast.frequency(3u64));

    sketch.erase(3u64, 100);
    println!("Estimated F2 after erasing item 3: {:.0}\n", sketch.f2_norm());
    Ok(())
}

fn bloom() -> Result<(), Error> {
    println!("== Bloom filters ==");
    let mut filter = BloomFilter::builder().num_bits(1024).num_hashes(3).seed(7).build()?;
    for id in [5u64, 17, 42] {
        filter.insert(id);
    }
    println!("contains(5): {}", filter.contains(5u64));
    println!("contains(6): {}", filter.contains(6u64));
    println!("bits set: {}", filter.num_bits_set());

    let mut multi = MultiBloomFilter::builder()
        .num_bits(512)
        .num_hashes(4)
        .hash_type(HashType::Sha1)
        .build()?;
    multi.insert("alice");
    multi.insert("bob");
    println!("multi-bloom contains(\"alice\"): {}", multi.contains("alice"));
    println!("multi-bloom contains(\"carol\"): {}", multi.contains("carol"));
    if let Err(err) = multi.erase("alice") {
        println!("erase: {err}\n");
    }
    Ok(())
}

fn lossy() -> Result<(), Error> {
    println!("== Lossy Counting ==");
    let mut sketch = LossyCounting::new(0.01)?;
    for i in 0..10_000u64 {
        // every fifth item is 7
        sketch.insert(if i % 5 == 0 { 7 } else { i });
    }
    for row in sketch.frequent(1_000) {
        println!(
            "item {} seen between {} and {} times",
            row.item(),
            row.count(),
            row.upper_bound()
        );
    }
    println!("entries kept: {}", sketch.num_entries());

    let bytes = sketch.serialize();
    let restored = LossyCounting::<u64>::deserialize(&bytes)?;
    println!("restored input length: {}\n", restored.input_length());
    Ok(())
}

fn counting_sample() -> Result<(), Error> {
    println!("== Counting Sample ==");
    let mut sample = CountingSample::new(50, XorShift64::seeded(3))?;
    for i in 0..20_000u64 {
        sample.insert(if i % 4 == 0 { 1 } else { i % 3_000 });
    }
    println!("sampling factor: {:.4}", sample.sampling_factor());
    println!("estimated frequency of 1 (exact 5000): {}", sample.frequency(&1u64));
    println!("keys in reservoir: {} of {}", sample.len(), sample.capacity());

    let bytes = sample.serialize();
    let restored = CountingSample::<u64>::deserialize(&bytes, XorShift64::seeded(4))?;
    println!("restored input length: {}\n", restored.input_length());
    Ok(())
}

fn quantiles() -> Result<(), Error> {
    println!("== Quantile Digest ==");
    let values: Vec<i64> = (0..10_000).map(|i| (i * 31) % 1001).collect();
    let digest = QuantileDigest::from_values(100, 0, 1000, &values)?;
    for q in [0.1, 0.5, 0.9] {
        if let Some(estimate) = digest.quantile(q) {
            println!("q={q}: value {} at rank {}", estimate.value(), estimate.rank());
        }
    }
    println!("nodes kept: {} of height {}", digest.num_nodes(), digest.height());

    let other = QuantileDigest::from_values(100, 0, 1000, &values[..5_000])?;
    let merged = digest.merged(&other);
    println!("merged input length: {}", merged.input_length());

    let east = QuantileDigestFm::from_digest("east", &digest, 32, 16)?;
    let west = QuantileDigestFm::from_digest("west", &other, 32, 16)?;
    let union = east.merged(&west)?;
    if let Some(median) = union.quantile(0.5) {
        println!("FM-composite median: {}", median.value());
    }
    println!("FM-composite serialized size: {} bytes", union.serialized_size());
    Ok(())
}
