/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

/*!

Bucketers.

A [`Bucketer`](crate::traits::Bucketer) maps 64-bit hashes to buckets, which
are the unit of work of the pilot search in PTHash-like constructions of
minimal perfect hash functions. [`UniformBucketer`] yields buckets of the same
expected size, whereas [`SkewBucketer`] yields a few large buckets and many
small ones.

*/

mod skew;
mod uniform;

pub use skew::*;
pub use uniform::*;

/// The available bucketers, for runtime selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum BucketerKind {
    /// [`UniformBucketer`].
    Uniform,
    /// [`SkewBucketer`].
    #[default]
    Skew,
}

impl std::fmt::Display for BucketerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BucketerKind::Uniform => write!(f, "uniform"),
            BucketerKind::Skew => write!(f, "skew"),
        }
    }
}
