// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2020-2023 Andre Richter <andre.o.richter@gmail.com>

//! Helpers shared by the BCM drivers.
//!
//! The kernel runs identity mapped, so MMIO start addresses are plain physical addresses.

use core::{fmt, marker::PhantomData, ops};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Typed view onto a register block at a fixed address.
pub struct MMIODerefWrapper<T> {
    base: usize,
    _block: PhantomData<fn() -> T>,
}

/// An index that is known to be at most `MAX_INCLUSIVE`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BoundedUsize<const MAX_INCLUSIVE: usize>(usize);

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl<T> MMIODerefWrapper<T> {
    /// # Safety
    ///
    /// - `base` must be the address of a live register block laid out like `T`.
    pub const unsafe fn new(base: usize) -> Self {
        Self {
            base,
            _block: PhantomData,
        }
    }
}

impl<T> ops::Deref for MMIODerefWrapper<T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*(self.base as *const T) }
    }
}

impl<const MAX_INCLUSIVE: usize> BoundedUsize<MAX_INCLUSIVE> {
    /// Largest accepted value.
    pub const MAX_INCLUSIVE: usize = MAX_INCLUSIVE;

    /// Wrap `number`. Out-of-range values are rejected at compile time in const contexts and
    /// panic otherwise.
    pub const fn new(number: usize) -> Self {
        assert!(number <= MAX_INCLUSIVE);

        Self(number)
    }

    /// The wrapped value.
    pub const fn get(self) -> usize {
        self.0
    }
}

impl<const MAX_INCLUSIVE: usize> fmt::Display for BoundedUsize<MAX_INCLUSIVE> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}
