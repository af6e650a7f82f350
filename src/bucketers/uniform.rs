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

/// A bucketer mapping hashes uniformly to [0..*n*).
///
/// The serialized state is the number of buckets followed by the magic
/// constant for the fast modulo (24 bytes).
#[derive(Epserde, Debug, Default, Clone, Copy, PartialEq, Eq, Hash, MemDbg, MemSize)]
#[deep_copy]
pub struct UniformBucketer {
    num_buckets: FastMod,
}

impl Display for UniformBucketer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Uniform bucketer with {} buckets", self.num_buckets())
    }
}

impl Bucketer for UniformBucketer {
    const NUM_TIERS: usize = 1;

    fn new(num_buckets: u64) -> Self {
        assert!(num_buckets > 0, "The number of buckets must be positive");
        debug!("Setting up uniform bucketer with {} buckets", num_buckets);
        Self {
            num_buckets: FastMod::new(num_buckets),
        }
    }

    #[inline(always)]
    fn bucket(&self, hash: u64) -> u64 {
        self.num_buckets.reduce(hash)
    }

    #[inline(always)]
    fn num_buckets(&self) -> u64 {
        self.num_buckets.divisor()
    }

    #[inline(always)]
    fn tier(&self, _hash: u64) -> usize {
        0
    }

    fn tier_buckets(&self, tier: usize) -> Range<u64> {
        assert!(tier < Self::NUM_TIERS, "Tier {} does not exist", tier);
        0..self.num_buckets()
    }

    fn visit(&mut self, visitor: &mut impl Visitor) -> Result<()> {
        let (d, m) = self.num_buckets.parts_mut();
        visitor.visit(d)?;
        visitor.visit(m)
    }

    fn check(&self) -> Result<(), BucketerError> {
        if self.num_buckets.is_empty() {
            return Err(BucketerError::NoBuckets);
        }
        if !self.num_buckets.is_consistent() {
            return Err(BucketerError::InconsistentMagic {
                divisor: self.num_buckets.divisor(),
                magic: self.num_buckets.magic(),
            });
        }
        Ok(())
    }
}
