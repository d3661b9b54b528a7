/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::marker::PhantomData;

use super::{ArrayOf, RawStorage};
use crate::array::{Alignment, AutoAlign, InlineArray};

/// Storage for a fully fixed `R x C` shape: a single inline buffer, nothing else.
///
/// `N` is the buffer capacity and must equal `R * C`. It is a separate const parameter
/// because `R * C` cannot be used as an array length on stable Rust; the enclosing
/// matrix type supplies it, and construction debug-asserts the equality.
///
/// `rows` and `cols` read no state, `resize` is a no-op, and the buffer address is
/// stable for the lifetime of the value.
#[derive(Debug)]
pub struct ArrayStorage<T, const R: usize, const C: usize, const N: usize, L = AutoAlign>
where
    T: Copy,
    L: Alignment,
{
    data: ArrayOf<L, T, N>,
}

impl<T, const R: usize, const C: usize, const N: usize, L> Default for ArrayStorage<T, R, C, N, L>
where
    T: Copy,
    L: Alignment,
{
    fn default() -> Self {
        debug_assert_eq!(N, R * C, "capacity parameter must equal rows * cols");
        Self {
            data: ArrayOf::<L, T, N>::new(),
        }
    }
}

// SAFETY: `data` holds `N == R * C` contiguous elements for the lifetime of the value,
// and `rows() * cols()` is exactly `R * C`.
unsafe impl<T, const R: usize, const C: usize, const N: usize, L> RawStorage<T>
    for ArrayStorage<T, R, C, N, L>
where
    T: Copy,
    L: Alignment,
{
    unsafe fn with_dims(len: usize, rows: usize, cols: usize) -> Self {
        debug_assert_eq!(rows, R);
        debug_assert_eq!(cols, C);
        debug_assert_eq!(len, R * C);
        Self::default()
    }

    unsafe fn with_dims_assume_aligned(len: usize, rows: usize, cols: usize) -> Self {
        debug_assert_eq!(rows, R);
        debug_assert_eq!(cols, C);
        debug_assert_eq!(len, R * C);
        debug_assert_eq!(N, R * C, "capacity parameter must equal rows * cols");
        Self {
            data: ArrayOf::<L, T, N>::new_assume_aligned(),
        }
    }

    #[inline]
    fn rows(&self) -> usize {
        R
    }

    #[inline]
    fn cols(&self) -> usize {
        C
    }

    #[inline]
    fn as_ptr(&self) -> *const T {
        self.data.as_ptr()
    }

    #[inline]
    fn as_mut_ptr(&mut self) -> *mut T {
        self.data.as_mut_ptr()
    }

    unsafe fn resize(&mut self, len: usize, rows: usize, cols: usize) {
        // The shape is a compile-time constant; there is nothing to update.
        debug_assert_eq!(rows, R);
        debug_assert_eq!(cols, C);
        debug_assert_eq!(len, R * C);
    }

    fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }
}

/// Storage for a shape that is empty at compile time (`R * C == 0`).
///
/// No buffer exists; the data pointer is always null and the dimensions are the const
/// parameters regardless of any `resize` call.
pub struct NullStorage<T, const R: usize, const C: usize> {
    marker: PhantomData<T>,
}

// `T` only occurs under `PhantomData`, so these impls must not place bounds on it the
// way the derives would.
impl<T, const R: usize, const C: usize> Default for NullStorage<T, R, C> {
    fn default() -> Self {
        Self {
            marker: PhantomData,
        }
    }
}

impl<T, const R: usize, const C: usize> Clone for NullStorage<T, R, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, const R: usize, const C: usize> Copy for NullStorage<T, R, C> {}

impl<T, const R: usize, const C: usize> std::fmt::Debug for NullStorage<T, R, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NullStorage")
            .field("rows", &R)
            .field("cols", &C)
            .finish()
    }
}

// SAFETY: `rows() * cols()` is zero, so a null pointer addresses the required zero
// elements.
unsafe impl<T, const R: usize, const C: usize> RawStorage<T> for NullStorage<T, R, C>
where
    T: Copy,
{
    unsafe fn with_dims(_len: usize, _rows: usize, _cols: usize) -> Self {
        debug_assert_eq!(R * C, 0, "null storage requires a zero-sized shape");
        Self::default()
    }

    unsafe fn with_dims_assume_aligned(len: usize, rows: usize, cols: usize) -> Self {
        // There is no buffer, so there is no assertion to skip.
        // SAFETY: Obligations are identical to `with_dims`.
        unsafe { Self::with_dims(len, rows, cols) }
    }

    #[inline]
    fn rows(&self) -> usize {
        R
    }

    #[inline]
    fn cols(&self) -> usize {
        C
    }

    #[inline]
    fn as_ptr(&self) -> *const T {
        std::ptr::null()
    }

    #[inline]
    fn as_mut_ptr(&mut self) -> *mut T {
        std::ptr::null_mut()
    }

    unsafe fn resize(&mut self, _len: usize, _rows: usize, _cols: usize) {}

    fn swap(&mut self, _other: &mut Self) {}
}

///////////
// Tests //
///////////
