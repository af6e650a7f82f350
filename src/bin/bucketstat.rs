/*
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::{ensure, Result};
use clap::Parser;
use dsi_progress_logger::*;
use epserde::ser::Serialize;
use ptbucket::prelude::*;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::fs::File;
use std::io::{BufRead, BufReader};
use xxhash_rust::xxh3::xxh3_64_with_seed;

#[derive(Parser, Debug)]
#[command(about = "Assigns hashes to buckets and prints occupancy statistics", long_about = None)]
struct Args {
    /// The number of keys. If no key file is provided, use n random 64-bit
    /// hashes.
    n: usize,
    /// The number of buckets (default: n / 4, at least one).
    #[arg(short, long)]
    buckets: Option<u64>,
    /// The bucketer to use.
    #[arg(long, value_enum, default_value_t = BucketerKind::Skew)]
    bucketer: BucketerKind,
    /// A file containing UTF-8 keys, one per line. At most N keys will be
    /// read and hashed with XXH3.
    #[arg(short, long)]
    keys: Option<String>,
    /// A 64-bit seed for the pseudorandom number generator or for XXH3.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Store the bucketer with ε-serde in this file.
    #[arg(long)]
    store: Option<String>,
    /// Use this number of threads.
    #[arg(short, long)]
    threads: Option<usize>,
}

fn main() -> Result<()> {
    ptbucket::init_env_logger()?;

    let args = Args::parse();

    #[cfg(feature = "rayon")]
    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }
    #[cfg(not(feature = "rayon"))]
    if args.threads.is_some() {
        log::warn!("Ignoring the number of threads, as the rayon feature is disabled");
    }

    let mut pl = ProgressLogger::default();
    let hashes = read_hashes(&args, &mut pl)?;
    ensure!(!hashes.is_empty(), "No keys");
    let num_buckets = args.buckets.unwrap_or((hashes.len() as u64 / 4).max(1));
    ensure!(num_buckets > 0, "The number of buckets must be positive");

    match args.bucketer {
        BucketerKind::Uniform => {
            main_with_bucketer(UniformBucketer::new(num_buckets), &hashes, &args, &mut pl)
        }
        BucketerKind::Skew => {
            main_with_bucketer(SkewBucketer::new(num_buckets), &hashes, &args, &mut pl)
        }
    }
}

fn read_hashes(args: &Args, pl: &mut impl ProgressLog) -> Result<Vec<u64>> {
    let mut hashes = Vec::with_capacity(args.n);
    pl.item_name("key");
    pl.expected_updates(Some(args.n));

    if let Some(filename) = &args.keys {
        pl.start(format!("Reading and hashing keys from {}...", filename));
        for line in BufReader::new(File::open(filename)?).lines().take(args.n) {
            hashes.push(xxh3_64_with_seed(line?.as_bytes(), args.seed));
            pl.light_update();
        }
    } else {
        pl.start("Generating random hashes...");
        let mut rng = SmallRng::seed_from_u64(args.seed);
        for _ in 0..args.n {
            hashes.push(rng.random::<u64>());
            pl.light_update();
        }
    }

    pl.done();
    Ok(hashes)
}

fn main_with_bucketer<B: Bucketer + Serialize>(
    bucketer: B,
    hashes: &[u64],
    args: &Args,
    pl: &mut impl ProgressLog,
) -> Result<()> {
    let stats = BucketStats::new(&bucketer, hashes, pl);
    pl.info(format_args!(
        "Serialized size: {} bits ({:.4} bits/key)",
        bucketer.num_bits(),
        bucketer.num_bits() as f64 / hashes.len() as f64
    ));
    print!("{}", stats);

    if let Some(path) = &args.store {
        bucketer.store(path)?;
        pl.info(format_args!("Stored bucketer in {}", path));
    }
    Ok(())
}
