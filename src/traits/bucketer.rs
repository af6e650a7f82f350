/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::visit::{Loader, Saver, Sizer, Visitor};
use anyhow::Result;
use std::fmt::Display;
use std::io::{Read, Write};
use std::ops::Range;

/// Errors detected when loading a bucketer.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BucketerError {
    #[error("The bucketer has no buckets")]
    /// The number of buckets is zero.
    NoBuckets,
    #[error("Magic constant {magic:#x} does not match divisor {divisor}")]
    /// A magic constant was not computed from its divisor.
    InconsistentMagic { divisor: u64, magic: u128 },
    #[error("Tier sizes {sizes:?} are not the ones for {num_buckets} buckets")]
    /// The sizes of the tiers do not match those computed at initialization.
    InconsistentTiers { sizes: [u64; 3], num_buckets: u64 },
    #[error("Tier sizes {sizes:?} add up to more than 2^64 - 1 buckets")]
    /// The sum of the sizes of the tiers overflows.
    TooManyBuckets { sizes: [u64; 3] },
}

/// Assignment of 64-bit hashes to buckets.
///
/// A bucketer is set up for a given number of buckets, and then maps
/// (approximately uniform) 64-bit hashes to buckets. The mapping depends only
/// on the number of buckets, so it is reproducible between construction time
/// and query time.
///
/// Instances are small and [`Copy`]; after initialization they are immutable,
/// and [`bucket`](Bucketer::bucket) can be called concurrently from any number
/// of threads.
///
/// The persistent state is described by [`visit`](Bucketer::visit), which
/// lists the fields in a fixed order; [`save`](Bucketer::save),
/// [`load`](Bucketer::load) and [`num_bits`](Bucketer::num_bits) are all
/// derived from it.
///
/// The [`Default`] instance has no buckets and must be
/// [initialized](Bucketer::init) before use.
pub trait Bucketer: Default + Display + Copy + Send + Sync {
    /// The number of tiers in which the hash space is partitioned.
    const NUM_TIERS: usize;

    /// Creates a bucketer with the given number of buckets.
    ///
    /// # Panics
    ///
    /// If `num_buckets` is zero.
    fn new(num_buckets: u64) -> Self;

    /// Sets up this bucketer for the given number of buckets, discarding the
    /// previous state.
    ///
    /// # Panics
    ///
    /// If `num_buckets` is zero.
    fn init(&mut self, num_buckets: u64) {
        *self = Self::new(num_buckets);
    }

    /// Returns the bucket of a hash, in the range
    /// [0..[`num_buckets`](Bucketer::num_buckets)).
    fn bucket(&self, hash: u64) -> u64;

    fn num_buckets(&self) -> u64;

    /// Returns the tier of a hash, in the range
    /// [0..[`NUM_TIERS`](Bucketer::NUM_TIERS)).
    fn tier(&self, hash: u64) -> usize;

    /// Returns the range of buckets of a tier.
    ///
    /// # Panics
    ///
    /// If `tier` is not smaller than [`NUM_TIERS`](Bucketer::NUM_TIERS).
    fn tier_buckets(&self, tier: usize) -> Range<u64>;

    /// Applies a visitor to the persistent fields of this bucketer, in their
    /// serialization order.
    fn visit(&mut self, visitor: &mut impl Visitor) -> Result<()>;

    /// Checks that the state of this bucketer is the one that
    /// [`new`](Bucketer::new) would produce.
    fn check(&self) -> Result<(), BucketerError>;

    /// Returns the size in bits of the serialized state.
    fn num_bits(&self) -> usize {
        let mut sizer = Sizer::default();
        let mut copy = *self;
        copy.visit(&mut sizer)
            .expect("Counting the bytes of the fields cannot fail");
        sizer.bytes() * 8
    }

    /// Exchanges the state of this bucketer with that of another one.
    fn swap(&mut self, other: &mut Self) {
        core::mem::swap(self, other);
    }

    /// Writes the state of this bucketer to a backend, returning the number of
    /// bytes written.
    fn save(&self, backend: impl Write) -> Result<usize> {
        let mut saver = Saver::new(backend);
        let mut copy = *self;
        copy.visit(&mut saver)?;
        Ok(saver.written())
    }

    /// Reads a bucketer from a backend, checking its consistency.
    fn load(backend: impl Read) -> Result<Self> {
        let mut bucketer = Self::default();
        bucketer.visit(&mut Loader::new(backend))?;
        bucketer.check()?;
        Ok(bucketer)
    }

    /// Convenience method returning the state as a vector of bytes.
    fn save_to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.num_bits() / 8);
        self.save(&mut bytes)?;
        Ok(bytes)
    }

    /// Convenience method loading a bucketer from a slice of bytes.
    fn load_from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::load(bytes)
    }
}
