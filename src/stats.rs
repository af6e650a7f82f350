/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Bucket-occupancy statistics.
//!
//! [`BucketStats`] assigns a set of hashes to buckets and records how many
//! hashes end up in each bucket and in each tier. It is meant for tuning and
//! debugging bucketers; it is not used at query time.

use crate::traits::Bucketer;
use dsi_progress_logger::ProgressLog;
use std::fmt::Display;
use std::ops::Range;

#[cfg(feature = "rayon")]
use rayon::prelude::*;
#[cfg(feature = "rayon")]
use std::sync::atomic::{AtomicU64, Ordering};

/// Occupancy of buckets and tiers for a set of hashes.
#[derive(Debug, Clone)]
pub struct BucketStats {
    sizes: Box<[u64]>,
    tier_counts: Box<[u64]>,
    tier_buckets: Box<[Range<u64>]>,
    num_keys: u64,
}

impl BucketStats {
    /// Computes the statistics of `bucketer` on `hashes`.
    ///
    /// If the `rayon` feature is enabled, hashes are processed in parallel.
    pub fn new<B: Bucketer>(bucketer: &B, hashes: &[u64], pl: &mut impl ProgressLog) -> Self {
        let num_buckets = bucketer.num_buckets() as usize;
        pl.info(format_args!("{}", bucketer));

        let (sizes, tier_counts) = Self::count(bucketer, hashes, num_buckets, pl);

        Self {
            sizes,
            tier_counts,
            tier_buckets: (0..B::NUM_TIERS).map(|t| bucketer.tier_buckets(t)).collect(),
            num_keys: hashes.len() as u64,
        }
    }

    #[cfg(feature = "rayon")]
    fn count<B: Bucketer>(
        bucketer: &B,
        hashes: &[u64],
        num_buckets: usize,
        pl: &mut impl ProgressLog,
    ) -> (Box<[u64]>, Box<[u64]>) {
        let mut main_pl = pl.concurrent();
        main_pl
            .item_name("hash")
            .expected_updates(Some(hashes.len()))
            .start("Assigning hashes to buckets...");

        let sizes = (0..num_buckets)
            .map(|_| AtomicU64::new(0))
            .collect::<Vec<_>>();
        let tier_counts = hashes
            .par_iter()
            .fold_with(
                (vec![0_u64; B::NUM_TIERS], main_pl.clone()),
                |(mut tier_counts, mut pl), &hash| {
                    sizes[bucketer.bucket(hash) as usize].fetch_add(1, Ordering::Relaxed);
                    tier_counts[bucketer.tier(hash)] += 1;
                    pl.light_update();
                    (tier_counts, pl)
                },
            )
            .map(|(tier_counts, _)| tier_counts)
            .reduce(
                || vec![0_u64; B::NUM_TIERS],
                |mut a, b| {
                    a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
                    a
                },
            );
        let result = (
            sizes.into_iter().map(AtomicU64::into_inner).collect(),
            tier_counts.into_boxed_slice(),
        );
        main_pl.done_with_count(hashes.len());
        result
    }

    #[cfg(not(feature = "rayon"))]
    fn count<B: Bucketer>(
        bucketer: &B,
        hashes: &[u64],
        num_buckets: usize,
        pl: &mut impl ProgressLog,
    ) -> (Box<[u64]>, Box<[u64]>) {
        pl.item_name("hash");
        pl.expected_updates(Some(hashes.len()));
        pl.start("Assigning hashes to buckets...");

        let mut sizes = vec![0_u64; num_buckets];
        let mut tier_counts = vec![0_u64; B::NUM_TIERS];
        for &hash in hashes {
            sizes[bucketer.bucket(hash) as usize] += 1;
            tier_counts[bucketer.tier(hash)] += 1;
            pl.light_update();
        }

        pl.done_with_count(hashes.len());
        (sizes.into_boxed_slice(), tier_counts.into_boxed_slice())
    }

    pub fn num_keys(&self) -> u64 {
        self.num_keys
    }

    pub fn num_buckets(&self) -> usize {
        self.sizes.len()
    }

    /// Returns the number of hashes assigned to each bucket.
    pub fn sizes(&self) -> &[u64] {
        &self.sizes
    }

    pub fn max_bucket_size(&self) -> u64 {
        self.sizes.iter().copied().max().unwrap_or(0)
    }

    pub fn num_empty_buckets(&self) -> usize {
        self.sizes.iter().filter(|&&s| s == 0).count()
    }

    /// Returns a vector whose `s`-th entry is the number of buckets containing
    /// `s` hashes.
    pub fn histogram(&self) -> Vec<usize> {
        let mut histogram = vec![0; self.max_bucket_size() as usize + 1];
        for &s in self.sizes.iter() {
            histogram[s as usize] += 1;
        }
        histogram
    }

    pub fn num_tiers(&self) -> usize {
        self.tier_counts.len()
    }

    /// Returns the number of hashes in the given tier.
    ///
    /// Hashes are counted in the tier returned by
    /// [`Bucketer::tier`], even when the tier is empty and their buckets
    /// belong to the following tier.
    pub fn tier_count(&self, tier: usize) -> u64 {
        self.tier_counts[tier]
    }

    /// Returns the fraction of hashes in the given tier.
    pub fn tier_fraction(&self, tier: usize) -> f64 {
        self.tier_counts[tier] as f64 / self.num_keys.max(1) as f64
    }

    /// Returns the average number of hashes per bucket in the given tier, or
    /// zero if the tier is empty.
    pub fn tier_density(&self, tier: usize) -> f64 {
        let range = &self.tier_buckets[tier];
        let buckets = range.end - range.start;
        if buckets == 0 {
            0.
        } else {
            self.tier_counts[tier] as f64 / buckets as f64
        }
    }
}

impl Display for BucketStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Keys: {} Buckets: {} Empty buckets: {} Max bucket size: {}",
            self.num_keys,
            self.num_buckets(),
            self.num_empty_buckets(),
            self.max_bucket_size()
        )?;
        for tier in 0..self.num_tiers() {
            let range = &self.tier_buckets[tier];
            writeln!(
                f,
                "Tier {}: buckets [{}..{}) keys {} ({:.4}) density {:.4}",
                tier,
                range.start,
                range.end,
                self.tier_counts[tier],
                self.tier_fraction(tier),
                self.tier_density(tier)
            )?;
        }
        Ok(())
    }
}
