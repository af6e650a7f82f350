/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Division-free modular reduction.
//!
//! This module implements the 64-bit variant of the technique described in
//! Daniel Lemire, Owen Kaser, and Nathan Kurz, “[Faster Remainder by Direct
//! Computation: Applications to Compilers and Software
//! Libraries](https://arxiv.org/abs/1902.01961)”. Given a divisor *d*, we
//! precompute *M* = ⌈2¹²⁸ / *d*⌉ (modulo 2¹²⁸); then *x* mod *d* is the upper
//! 64 bits of the 192-bit product of (*M* · *x* mod 2¹²⁸) by *d*. The result
//! is exact for every 64-bit *x* and every nonzero 64-bit *d*.

use epserde::prelude::*;
use mem_dbg::*;

/// Returns the magic constant for `divisor`.
///
/// # Panics
///
/// If `divisor` is zero.
#[inline]
#[must_use]
pub fn compute_m(divisor: u64) -> u128 {
    assert!(divisor != 0, "The divisor of a fast modulo must be nonzero");
    (u128::MAX / divisor as u128).wrapping_add(1)
}

/// Returns the upper 64 bits of the 192-bit product of `lowbits` by `d`.
#[inline(always)]
#[must_use]
const fn mul128_u64(lowbits: u128, d: u64) -> u64 {
    let bottom_half = ((lowbits as u64 as u128) * d as u128) >> 64;
    let top_half = (lowbits >> 64) * d as u128;
    ((bottom_half + top_half) >> 64) as u64
}

/// Returns `dividend % divisor` using the magic constant `m` returned by
/// [`compute_m`]`(divisor)`.
///
/// The result is meaningless if `m` was not computed from `divisor`.
#[inline(always)]
#[must_use]
pub const fn fast_mod(dividend: u64, m: u128, divisor: u64) -> u64 {
    mul128_u64(m.wrapping_mul(dividend as u128), divisor)
}

/// A divisor together with its magic constant.
///
/// The two fields can only be set together, so the magic constant is never
/// stale.
///
/// The special value [`FastMod::EMPTY`] has divisor and magic constant equal to
/// zero: it reduces every dividend to zero, and it is used to represent empty
/// ranges. It is also the [`Default`].
#[derive(Epserde, Debug, Default, Clone, Copy, PartialEq, Eq, Hash, MemDbg, MemSize)]
#[deep_copy]
pub struct FastMod {
    d: u64,
    m: u128,
}

impl FastMod {
    /// The empty divisor.
    pub const EMPTY: Self = Self { d: 0, m: 0 };

    /// Creates a new fast modulo for the given divisor.
    ///
    /// # Panics
    ///
    /// If `divisor` is zero.
    pub fn new(divisor: u64) -> Self {
        Self {
            d: divisor,
            m: compute_m(divisor),
        }
    }

    /// Like [`new`](FastMod::new), but returns [`FastMod::EMPTY`] if `divisor`
    /// is zero.
    pub fn new_or_empty(divisor: u64) -> Self {
        if divisor == 0 {
            Self::EMPTY
        } else {
            Self::new(divisor)
        }
    }

    #[inline(always)]
    pub fn divisor(&self) -> u64 {
        self.d
    }

    #[inline(always)]
    pub fn magic(&self) -> u128 {
        self.m
    }

    /// Returns `x` modulo the divisor, or zero if this is
    /// [`FastMod::EMPTY`].
    #[inline(always)]
    pub fn reduce(&self, x: u64) -> u64 {
        fast_mod(x, self.m, self.d)
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.d == 0
    }

    /// Returns whether the magic constant matches the divisor.
    ///
    /// This is always true for instances built by this module, but it might
    /// not be for instances read from an untrusted source.
    pub fn is_consistent(&self) -> bool {
        if self.d == 0 {
            self.m == 0
        } else {
            self.m == compute_m(self.d)
        }
    }

    /// Returns mutable references to the divisor and the magic constant, in
    /// this order.
    ///
    /// This is only used by field visitation, which must be able to interleave
    /// the fields of several instances.
    pub(crate) fn parts_mut(&mut self) -> (&mut u64, &mut u128) {
        (&mut self.d, &mut self.m)
    }
}
