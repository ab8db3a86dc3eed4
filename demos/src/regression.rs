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

//! Accuracy regression for every sketch.
//!
//! Each loop draws a Zipf stream, feeds it to the chosen sketch and to an
//! exact reference, and reports the relative error. Every sketch is also
//! round-tripped through its binary encoding and cloned; both must reproduce
//! the original bytes.
//!
//! ```text
//! cargo run --bin regression -- fm --stream-length 100000 --domain-size 10000 --skew 1.0 --loops 10
//! ```

use std::collections::BTreeMap;
use std::process::ExitCode;

use clap::Parser;
use clap::ValueEnum;
use streamsketch::ams::AmsSketch;
use streamsketch::ams::FastAmsSketch;
use streamsketch::bloom::BloomFilter;
use streamsketch::bloom::MultiBloomFilter;
use streamsketch::common::XorShift64;
use streamsketch::common::Zipf;
use streamsketch::error::Error;
use streamsketch::fm::FmSketch;
use streamsketch::hash::HashType;
use streamsketch::lossy::LossyCounting;
use streamsketch::quantiles::QuantileDigest;
use streamsketch::quantiles::QuantileDigestFm;
use streamsketch::quantiles::QuantileEstimate;
use streamsketch::sampling::CountingSample;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Number of most frequent items checked by point-frequency sketches.
const TOP_ITEMS: usize = 10;

/// Number of absent ids probed for Bloom false positives.
const BLOOM_PROBES: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SketchKind {
    Fm,
    Ams,
    FastAms,
    Bloom,
    MultiBloom,
    Lossy,
    CountingSample,
    Quantile,
    QuantileFm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HashArg {
    Universal,
    Sha1,
}

impl From<HashArg> for HashType {
    fn from(arg: HashArg) -> Self {
        match arg {
            HashArg::Universal => HashType::Universal,
            HashArg::Sha1 => HashType::Sha1,
        }
    }
}

#[derive(Debug, Parser)]
#[command(about = "Measures sketch accuracy against exact answers over Zipf streams")]
struct Args {
    /// Sketch to exercise.
    #[arg(value_enum)]
    sketch: SketchKind,
    /// Items per stream.
    #[arg(long, default_value_t = 100_000)]
    stream_length: usize,
    /// Ids are drawn from `[0, domain-size)`.
    #[arg(long, default_value_t = 10_000)]
    domain_size: i64,
    /// Zipf skew; zero is uniform.
    #[arg(long, default_value_t = 1.0)]
    skew: f64,
    /// Number of independent streams.
    #[arg(long, default_value_t = 10)]
    loops: u64,
    /// Seed of the first loop; loop `i` uses `seed + i`.
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Hash family for FM and Bloom sketches.
    #[arg(long, value_enum, default_value_t = HashArg::Universal)]
    hash_type: HashArg,
    /// FM bitmaps.
    #[arg(long, default_value_t = 64)]
    bitmaps: usize,
    /// FM bits per bitmap.
    #[arg(long, default_value_t = 32)]
    bitmap_length: usize,
    /// AMS counters per group.
    #[arg(long, default_value_t = 64)]
    group_size: usize,
    /// AMS groups.
    #[arg(long, default_value_t = 5)]
    groups: usize,
    /// Fast-AMS counters per row.
    #[arg(long, default_value_t = 1024)]
    counters: usize,
    /// Fast-AMS rows or Bloom hash functions.
    #[arg(long, default_value_t = 5)]
    hashes: usize,
    /// Bloom vector length (per partition for Multi-Bloom).
    #[arg(long, default_value_t = 32_768)]
    bits: usize,
    /// Lossy Counting error bound.
    #[arg(long, default_value_t = 0.001)]
    epsilon: f64,
    /// Counting Sample reservoir size.
    #[arg(long, default_value_t = 1000)]
    capacity: usize,
    /// Quantile Digest compression factor.
    #[arg(long, default_value_t = 100)]
    k: u64,
}

/// Outcome of one loop.
struct Trial {
    error: f64,
    bytes: usize,
    consistent: bool,
}

fn main() -> Result<ExitCode, Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "regression=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    if args.domain_size < 1 || args.loops == 0 {
        eprintln!("domain size and loops must be positive");
        return Ok(ExitCode::FAILURE);
    }

    let mut errors = Vec::with_capacity(args.loops as usize);
    let mut inconsistent = 0;
    let mut bytes = 0;
    for i in 0..args.loops {
        let seed = args.seed.wrapping_add(i);
        let stream = zipf_stream(&args, seed);
        let trial = run(&args, seed, &stream)?;
        tracing::info!(
            loop_index = i,
            seed,
            error = trial.error,
            bytes = trial.bytes,
            consistent = trial.consistent,
            "loop finished"
        );
        if !trial.consistent {
            inconsistent += 1;
        }
        bytes = trial.bytes;
        errors.push(trial.error);
    }

    let avg = errors.iter().sum::<f64>() / errors.len() as f64;
    let min = errors.iter().copied().fold(f64::INFINITY, f64::min);
    let max = errors.iter().copied().fold(0.0, f64::max);
    println!("sketch:         {:?}", args.sketch);
    println!("loops:          {}", args.loops);
    println!("average error:  {:.4}", avg);
    println!("min error:      {:.4}", min);
    println!("max error:      {:.4}", max);
    println!("encoded size:   {} bytes", bytes);
    println!("inconsistent:   {}", inconsistent);

    Ok(if inconsistent == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn zipf_stream(args: &Args, seed: u64) -> Vec<u64> {
    let mut zipf = Zipf::new(0, args.domain_size, args.skew, XorShift64::seeded(seed));
    (0..args.stream_length)
        .map(|_| zipf.next_long() as u64)
        .collect()
}

fn run(args: &Args, seed: u64, stream: &[u64]) -> Result<Trial, Error> {
    let histogram = histogram(stream);
    match args.sketch {
        SketchKind::Fm => {
            let mut sketch = FmSketch::new(args.bitmaps, args.bitmap_length, args.hash_type.into())?;
            for &id in stream {
                sketch.insert(id);
            }
            let (bytes, consistent) =
                round_trip(&sketch, FmSketch::serialize, FmSketch::deserialize)?;
            Ok(Trial {
                error: relative(sketch.count() as f64, histogram.len() as f64),
                bytes,
                consistent,
            })
        }
        SketchKind::Ams => {
            let mut sketch = AmsSketch::builder()
                .dimensions(args.group_size, args.groups)
                .seed(seed)
                .build()?;
            for &id in stream {
                sketch.insert(id, 1);
            }
            let exact: f64 = histogram.values().map(|&c| (c as f64).powi(2)).sum();
            let (bytes, consistent) =
                round_trip(&sketch, AmsSketch::serialize, AmsSketch::deserialize)?;
            Ok(Trial {
                error: relative(sketch.f2_norm(), exact),
                bytes,
                consistent,
            })
        }
        SketchKind::FastAms => {
            let mut sketch = FastAmsSketch::builder()
                .num_counters(args.counters)
                .num_hashes(args.hashes)
                .seed(seed)
                .build()?;
            for &id in stream {
                sketch.insert(id, 1);
            }
            let error = mean_top_error(&histogram, |id| sketch.frequency(id).max(0) as f64);
            let (bytes, consistent) =
                round_trip(&sketch, FastAmsSketch::serialize, FastAmsSketch::deserialize)?;
            Ok(Trial {
                error,
                bytes,
                consistent,
            })
        }
        SketchKind::Bloom => {
            let mut filter = BloomFilter::builder()
                .num_bits(args.bits)
                .num_hashes(args.hashes)
                .hash_type(args.hash_type.into())
                .seed(seed)
                .build()?;
            for &id in stream {
                filter.insert(id);
            }
            let lost = histogram.keys().filter(|&&id| !filter.contains(id)).count();
            let error = false_positive_rate(args, |id| filter.contains(id));
            let (bytes, consistent) =
                round_trip(&filter, BloomFilter::serialize, BloomFilter::deserialize)?;
            Ok(Trial {
                error,
                bytes,
                consistent: consistent && lost == 0,
            })
        }
        SketchKind::MultiBloom => {
            let mut filter = MultiBloomFilter::builder()
                .num_bits(args.bits)
                .num_hashes(args.hashes)
                .hash_type(args.hash_type.into())
                .seed(seed)
                .build()?;
            for &id in stream {
                filter.insert(id);
            }
            let lost = histogram.keys().filter(|&&id| !filter.contains(id)).count();
            let error = false_positive_rate(args, |id| filter.contains(id));
            let (bytes, consistent) =
                round_trip(&filter, MultiBloomFilter::serialize, MultiBloomFilter::deserialize)?;
            Ok(Trial {
                error,
                bytes,
                consistent: consistent && lost == 0,
            })
        }
        SketchKind::Lossy => {
            let mut sketch = LossyCounting::new(args.epsilon)?;
            for &id in stream {
                sketch.insert(id);
            }
            let bounded = histogram.iter().all(|(id, &truth)| {
                sketch.min_frequency(id) <= truth && truth <= sketch.max_frequency(id)
            });
            let error = mean_top_error(&histogram, |id| sketch.max_frequency(&id) as f64);
            let (bytes, consistent) =
                round_trip(&sketch, LossyCounting::serialize, LossyCounting::deserialize)?;
            Ok(Trial {
                error,
                bytes,
                consistent: consistent && bounded,
            })
        }
        SketchKind::CountingSample => {
            let mut sample = CountingSample::new(args.capacity, XorShift64::seeded(seed))?;
            let mut bounded = true;
            for &id in stream {
                sample.insert(id);
                bounded &= sample.len() <= args.capacity;
            }
            let error = mean_top_error(&histogram, |id| sample.frequency(&id) as f64);
            let (bytes, consistent) = round_trip(&sample, CountingSample::serialize, |bytes| {
                CountingSample::deserialize(bytes, XorShift64::seeded(seed))
            })?;
            Ok(Trial {
                error,
                bytes,
                consistent: consistent && bounded,
            })
        }
        SketchKind::Quantile | SketchKind::QuantileFm => {
            let values: Vec<i64> = stream.iter().map(|&id| id as i64).collect();
            let digest = QuantileDigest::from_values(args.k, 0, args.domain_size - 1, &values)?;
            if args.sketch == SketchKind::Quantile {
                let error = max_rank_error(&values, |q| digest.quantile(q));
                let (bytes, consistent) =
                    round_trip(&digest, QuantileDigest::serialize, QuantileDigest::deserialize)?;
                return Ok(Trial {
                    error,
                    bytes,
                    consistent,
                });
            }
            let digest = QuantileDigestFm::from_digest(seed, &digest, args.bitmap_length, args.bitmaps)?;
            let error = max_rank_error(&values, |q| digest.quantile(q));
            let (bytes, consistent) = round_trip(
                &digest,
                QuantileDigestFm::serialize,
                QuantileDigestFm::deserialize,
            )?;
            Ok(Trial {
                error,
                bytes,
                consistent,
            })
        }
    }
}

fn histogram(stream: &[u64]) -> BTreeMap<u64, u64> {
    let mut counts = BTreeMap::new();
    for &id in stream {
        *counts.entry(id).or_insert(0) += 1;
    }
    counts
}

fn relative(estimate: f64, truth: f64) -> f64 {
    if truth == 0.0 {
        estimate.abs()
    } else {
        (estimate - truth).abs() / truth
    }
}

/// Mean relative error of `estimate` over the most frequent items.
fn mean_top_error(histogram: &BTreeMap<u64, u64>, estimate: impl Fn(u64) -> f64) -> f64 {
    let mut top: Vec<(u64, u64)> = histogram.iter().map(|(&id, &c)| (id, c)).collect();
    top.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    top.truncate(TOP_ITEMS);
    let total: f64 = top
        .iter()
        .map(|&(id, truth)| relative(estimate(id), truth as f64))
        .sum();
    total / top.len().max(1) as f64
}

/// Fraction of ids outside the stream domain reported as present.
fn false_positive_rate(args: &Args, contains: impl Fn(u64) -> bool) -> f64 {
    let start = args.domain_size as u64;
    let hits = (start..start + BLOOM_PROBES).filter(|&id| contains(id)).count();
    hits as f64 / BLOOM_PROBES as f64
}

/// Largest gap, relative to the input length, between `floor(q N)` and the
/// exact rank of the reported quantile, over `q` in `{0.1, ..., 0.9}`.
fn max_rank_error(values: &[i64], quantile: impl Fn(f64) -> Option<QuantileEstimate>) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let n = sorted.len() as f64;
    (1..10)
        .filter_map(|i| {
            let q = i as f64 / 10.0;
            let estimate = quantile(q)?;
            let rank = sorted.partition_point(|v| *v <= estimate.value()) as f64;
            Some((rank - (q * n).floor()).abs() / n)
        })
        .fold(0.0, f64::max)
}

/// Encodes `sketch`, decodes it and checks that both the decoded sketch and
/// a clone encode to the same bytes.
fn round_trip<T: Clone>(
    sketch: &T,
    encode: impl Fn(&T) -> Vec<u8>,
    decode: impl Fn(&[u8]) -> Result<T, Error>,
) -> Result<(usize, bool), Error> {
    let bytes = encode(sketch);
    let decoded = decode(&bytes)?;
    let consistent = encode(&decoded) == bytes && encode(&sketch.clone()) == bytes;
    if !consistent {
        tracing::warn!(len = bytes.len(), "encoding did not round-trip");
    }
    Ok((bytes.len(), consistent))
}
