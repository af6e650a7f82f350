/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::traits::{Bucketer, BucketerError, Visitor};
use crate::utils::FastMod;
use anyhow::Result;
use epserde::prelude::*;
use log::debug;
use mem_dbg::*;
use std::fmt::Display;
use std::ops::Range;

/// Fraction of the hash space mapped to the first dense tier.
pub const A1: f32 = 0.6;
/// Fraction of the hash space mapped to the second dense tier.
pub const A2: f32 = 0.2;
/// Fraction of the buckets in the first dense tier.
pub const B1: f32 = 0.3;
/// Fraction of the buckets in the second dense tier.
pub const B2: f32 = 0.2;

/// Hashes smaller than this threshold belong to the first dense tier.
pub const T1: u64 = (A1 * u64::MAX as f32) as u64;
/// Hashes smaller than this threshold, but not than [`T1`], belong to the
/// second dense tier.
pub const T2: u64 = ((A1 + A2) * u64::MAX as f32) as u64;

/// A bucketer with three tiers of different density.
///
/// A fraction [`A1`] of the hash space is mapped to the first [`B1`] fraction
/// of the buckets, a fraction [`A2`] to the following [`B2`] fraction, and the
/// rest to the remaining buckets. With the default constants, the expected size
/// of a bucket is twice the average in the first tier, the average in the
/// second tier, and 40% of the average in the last tier: a skewed
/// distribution makes it easier to find pilots, as large buckets are
/// processed first, when most slots are free.
///
/// All computations involving the constants above are performed in single
/// precision, so that tier sizes and thresholds match those of PTHash.
///
/// When the number of buckets is smaller than five, one or both dense tiers
/// are empty. Hashes falling in an empty tier are then mapped to the first
/// bucket of the following tier, which is never empty.
///
/// The serialized state is the size of the three tiers followed by the three
/// magic constants for the fast modulo (72 bytes).
///
/// # References
///
/// Giulio Ermanno Pibiri and Roberto Trani, “[PTHash: Revisiting FCH Minimal
/// Perfect Hashing](https://arxiv.org/abs/2104.10402)”.
#[derive(Epserde, Debug, Default, Clone, Copy, PartialEq, Eq, Hash, MemDbg, MemSize)]
#[deep_copy]
pub struct SkewBucketer {
    dense1: FastMod,
    dense2: FastMod,
    sparse: FastMod,
}

impl SkewBucketer {
    /// Returns the sizes of the three tiers for the given number of buckets.
    pub fn tier_sizes(num_buckets: u64) -> [u64; 3] {
        let n = num_buckets as f32;
        let n1 = (B1 * n) as u64;
        let n2 = (B2 * n) as u64;
        [n1, n2, num_buckets - n1 - n2]
    }

    #[inline(always)]
    pub fn num_dense_buckets1(&self) -> u64 {
        self.dense1.divisor()
    }

    #[inline(always)]
    pub fn num_dense_buckets2(&self) -> u64 {
        self.dense2.divisor()
    }

    #[inline(always)]
    pub fn num_sparse_buckets(&self) -> u64 {
        self.sparse.divisor()
    }
}

impl Display for SkewBucketer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Skew bucketer with {} buckets (dense: {} + {}, sparse: {})",
            self.num_buckets(),
            self.num_dense_buckets1(),
            self.num_dense_buckets2(),
            self.num_sparse_buckets()
        )
    }
}

impl Bucketer for SkewBucketer {
    const NUM_TIERS: usize = 3;

    fn new(num_buckets: u64) -> Self {
        assert!(num_buckets > 0, "The number of buckets must be positive");
        let [n1, n2, n3] = Self::tier_sizes(num_buckets);
        debug!(
            "Setting up skew bucketer with {} buckets (dense: {} + {}, sparse: {})",
            num_buckets, n1, n2, n3
        );
        Self {
            dense1: FastMod::new_or_empty(n1),
            dense2: FastMod::new_or_empty(n2),
            sparse: FastMod::new(n3),
        }
    }

    #[inline(always)]
    fn bucket(&self, hash: u64) -> u64 {
        if hash < T1 {
            return self.dense1.reduce(hash);
        }
        if hash < T2 {
            return self.dense1.divisor() + self.dense2.reduce(hash);
        }
        self.dense1.divisor() + self.dense2.divisor() + self.sparse.reduce(hash)
    }

    #[inline(always)]
    fn num_buckets(&self) -> u64 {
        self.dense1.divisor() + self.dense2.divisor() + self.sparse.divisor()
    }

    /// Returns the tier of a hash.
    ///
    /// If the number of buckets is smaller than five, the tier of a hash
    /// might be empty, and then its bucket is the first bucket of the following
    /// tier: in this case, [`tier_buckets`](Bucketer::tier_buckets) applied to
    /// the tier does not contain the bucket.
    #[inline(always)]
    fn tier(&self, hash: u64) -> usize {
        (hash >= T1) as usize + (hash >= T2) as usize
    }

    /// Returns the range of buckets of a tier, which is empty for an empty
    /// dense tier (see [`tier`](Bucketer::tier)).
    fn tier_buckets(&self, tier: usize) -> Range<u64> {
        let n1 = self.dense1.divisor();
        let n2 = self.dense2.divisor();
        match tier {
            0 => 0..n1,
            1 => n1..n1 + n2,
            2 => n1 + n2..self.num_buckets(),
            _ => panic!("Tier {} does not exist", tier),
        }
    }

    fn visit(&mut self, visitor: &mut impl Visitor) -> Result<()> {
        let (n1, m1) = self.dense1.parts_mut();
        let (n2, m2) = self.dense2.parts_mut();
        let (n3, m3) = self.sparse.parts_mut();
        visitor.visit(n1)?;
        visitor.visit(n2)?;
        visitor.visit(n3)?;
        visitor.visit(m1)?;
        visitor.visit(m2)?;
        visitor.visit(m3)
    }

    fn check(&self) -> Result<(), BucketerError> {
        if self.sparse.is_empty() {
            return Err(BucketerError::NoBuckets);
        }
        for tier in [&self.dense1, &self.dense2, &self.sparse] {
            if !tier.is_consistent() {
                return Err(BucketerError::InconsistentMagic {
                    divisor: tier.divisor(),
                    magic: tier.magic(),
                });
            }
        }
        let sizes = [
            self.num_dense_buckets1(),
            self.num_dense_buckets2(),
            self.num_sparse_buckets(),
        ];
        let Some(num_buckets) = sizes[0]
            .checked_add(sizes[1])
            .and_then(|n| n.checked_add(sizes[2]))
        else {
            return Err(BucketerError::TooManyBuckets { sizes });
        };
        if sizes != Self::tier_sizes(num_buckets) {
            return Err(BucketerError::InconsistentTiers { sizes, num_buckets });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, Rng, SeedableRng};

    #[test]
    fn test_thresholds() {
        assert_eq!(T1, 11068046884030382080);
        assert_eq!(T2, 14757395478869966848);
    }

    #[test]
    fn test_tier_sizes() {
        assert_eq!(SkewBucketer::tier_sizes(1000), [300, 200, 500]);
        assert_eq!(SkewBucketer::tier_sizes(1), [0, 0, 1]);
        assert_eq!(SkewBucketer::tier_sizes(4), [1, 0, 3]);
        assert_eq!(SkewBucketer::tier_sizes(5), [1, 1, 3]);
        for n in (1..10_000).chain([u32::MAX as u64, 1 << 40, u64::MAX]) {
            let [n1, n2, n3] = SkewBucketer::tier_sizes(n);
            assert_eq!(n1 + n2 + n3, n);
            assert!(n3 > 0);
        }
    }

    #[test]
    fn test_tiers() {
        let bucketer = SkewBucketer::new(1000);
        assert_eq!(bucketer.tier(0), 0);
        assert_eq!(bucketer.tier(T1 - 1), 0);
        assert_eq!(bucketer.tier(T1), 1);
        assert_eq!(bucketer.tier(T2 - 1), 1);
        assert_eq!(bucketer.tier(T2), 2);
        assert_eq!(bucketer.tier(u64::MAX), 2);
        assert_eq!(bucketer.tier_buckets(0), 0..300);
        assert_eq!(bucketer.tier_buckets(1), 300..500);
        assert_eq!(bucketer.tier_buckets(2), 500..1000);

        let mut rng = SmallRng::seed_from_u64(0);
        for _ in 0..100_000 {
            let hash = rng.random::<u64>();
            let bucket = bucketer.bucket(hash);
            assert!(bucketer.tier_buckets(bucketer.tier(hash)).contains(&bucket));
        }

        // Both dense tiers are empty: their hashes go to the sparse tier
        let bucketer = SkewBucketer::new(3);
        assert_eq!(bucketer.tier_buckets(0), 0..0);
        assert_eq!(bucketer.tier_buckets(1), 0..0);
        assert_eq!(bucketer.tier_buckets(2), 0..3);
        assert_eq!(bucketer.tier(0), 0);
        assert!(!bucketer.tier_buckets(0).contains(&bucketer.bucket(0)));
        assert!(bucketer.tier_buckets(2).contains(&bucketer.bucket(0)));
        assert!(bucketer.tier_buckets(2).contains(&bucketer.bucket(T1)));

        // Only the second dense tier is empty
        let bucketer = SkewBucketer::new(4);
        assert_eq!(bucketer.tier_buckets(1), 1..1);
        assert_eq!(bucketer.tier(T1), 1);
        assert!(bucketer.tier_buckets(2).contains(&bucketer.bucket(T1)));
        assert!(bucketer.tier_buckets(0).contains(&bucketer.bucket(0)));
    }

    #[test]
    fn test_matches_reference() {
        let mut rng = SmallRng::seed_from_u64(1);
        for n in [5, 10, 1000, 123_456_789, 1 << 40] {
            let bucketer = SkewBucketer::new(n);
            let [n1, n2, n3] = SkewBucketer::tier_sizes(n);
            for _ in 0..10_000 {
                let hash = rng.random::<u64>();
                let expected = if hash < T1 {
                    hash % n1
                } else if hash < T2 {
                    n1 + hash % n2
                } else {
                    n1 + n2 + hash % n3
                };
                assert_eq!(bucketer.bucket(hash), expected);
            }
        }
    }

    #[test]
    fn test_small() {
        for n in 1..5 {
            let bucketer = SkewBucketer::new(n);
            assert_eq!(bucketer.num_buckets(), n);
            assert_eq!(bucketer.check(), Ok(()));
            for hash in [0, T1 - 1, T1, T2 - 1, T2, u64::MAX] {
                assert!(bucketer.bucket(hash) < n);
            }
        }
        // Both dense tiers are empty
        let bucketer = SkewBucketer::new(3);
        assert_eq!(bucketer.bucket(0), 0);
        assert_eq!(bucketer.bucket(T1), 0);
        assert_eq!(bucketer.bucket(u64::MAX), u64::MAX % 3);
        // Only the second dense tier is empty
        let bucketer = SkewBucketer::new(4);
        assert_eq!(bucketer.bucket(T1), 1);
        assert_eq!(bucketer.bucket(T2), 1 + T2 % 3);
    }

    #[test]
    fn test_num_bits() {
        assert_eq!(SkewBucketer::new(1000).num_bits(), 576);
    }

    #[test]
    fn test_layout() -> Result<()> {
        let bucketer = SkewBucketer::new(1000);
        let bytes = bucketer.save_to_bytes()?;
        assert_eq!(bytes.len(), 72);
        assert_eq!(&bytes[0..8], &300_u64.to_le_bytes());
        assert_eq!(&bytes[8..16], &200_u64.to_le_bytes());
        assert_eq!(&bytes[16..24], &500_u64.to_le_bytes());
        assert_eq!(&bytes[24..40], &crate::utils::compute_m(300).to_le_bytes());
        assert_eq!(&bytes[40..56], &crate::utils::compute_m(200).to_le_bytes());
        assert_eq!(&bytes[56..72], &crate::utils::compute_m(500).to_le_bytes());
        Ok(())
    }

    #[test]
    fn test_check() {
        assert_eq!(SkewBucketer::default().check(), Err(BucketerError::NoBuckets));
        let mut bucketer = SkewBucketer::new(1000);
        *bucketer.dense1.parts_mut().0 = 301;
        assert!(matches!(
            bucketer.check(),
            Err(BucketerError::InconsistentMagic { divisor: 301, .. })
        ));
        let mut bucketer = SkewBucketer::new(1000);
        bucketer.dense2 = FastMod::new(201);
        assert_eq!(
            bucketer.check(),
            Err(BucketerError::InconsistentTiers {
                sizes: [300, 201, 500],
                num_buckets: 1001
            })
        );
    }
}
