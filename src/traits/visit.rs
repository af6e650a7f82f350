/*
 * SPDX-FileCopyrightText: 2023 Tommaso Fontana
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Field visitation.
//!
//! A structure implementing field visitation lists its fields, in a fixed
//! order, in a single method accepting a [`Visitor`]. The same method is then
//! used to [save](Saver) the structure, to [load](Loader) it, and to
//! [measure](Sizer) its serialized size, so the three operations cannot
//! disagree on the layout.
//!
//! Fields are written in little-endian order with no padding.

use anyhow::Result;
use std::io::{Read, Write};

/// A field that can be visited.
pub trait Field: Copy {
    /// The number of bytes of the serialized field.
    const BYTES: usize;

    fn write_le(&self, backend: &mut impl Write) -> std::io::Result<()>;

    fn read_le(backend: &mut impl Read) -> std::io::Result<Self>;
}

macro_rules! impl_field {
    ($($ty:ty),*) => {$(
        impl Field for $ty {
            const BYTES: usize = core::mem::size_of::<$ty>();

            #[inline(always)]
            fn write_le(&self, backend: &mut impl Write) -> std::io::Result<()> {
                backend.write_all(&self.to_le_bytes())
            }

            #[inline(always)]
            fn read_le(backend: &mut impl Read) -> std::io::Result<Self> {
                let mut bytes = [0; core::mem::size_of::<$ty>()];
                backend.read_exact(&mut bytes)?;
                Ok(<$ty>::from_le_bytes(bytes))
            }
        }
    )*};
}

impl_field!(u64, u128);

/// An operation applied, in order, to each field of a structure.
pub trait Visitor {
    fn visit<F: Field>(&mut self, field: &mut F) -> Result<()>;
}

/// A [`Visitor`] writing fields to a backend.
#[derive(Debug)]
pub struct Saver<W: Write> {
    backend: W,
    written: usize,
}

impl<W: Write> Saver<W> {
    pub fn new(backend: W) -> Self {
        Self {
            backend,
            written: 0,
        }
    }

    /// Returns the number of bytes written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.backend
    }
}

impl<W: Write> Visitor for Saver<W> {
    #[inline]
    fn visit<F: Field>(&mut self, field: &mut F) -> Result<()> {
        field.write_le(&mut self.backend)?;
        self.written += F::BYTES;
        Ok(())
    }
}

/// A [`Visitor`] reading fields from a backend.
#[derive(Debug)]
pub struct Loader<R: Read> {
    backend: R,
    read: usize,
}

impl<R: Read> Loader<R> {
    pub fn new(backend: R) -> Self {
        Self { backend, read: 0 }
    }

    /// Returns the number of bytes read so far.
    pub fn read(&self) -> usize {
        self.read
    }

    pub fn into_inner(self) -> R {
        self.backend
    }
}

impl<R: Read> Visitor for Loader<R> {
    #[inline]
    fn visit<F: Field>(&mut self, field: &mut F) -> Result<()> {
        *field = F::read_le(&mut self.backend)?;
        self.read += F::BYTES;
        Ok(())
    }
}

/// A [`Visitor`] that just counts bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sizer {
    bytes: usize,
}

impl Sizer {
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl Visitor for Sizer {
    #[inline(always)]
    fn visit<F: Field>(&mut self, _field: &mut F) -> Result<()> {
        self.bytes += F::BYTES;
        Ok(())
    }
}
