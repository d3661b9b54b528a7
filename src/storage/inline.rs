/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Dynamic shapes backed by a fixed-capacity inline buffer.
//!
//! These variants exist for shapes whose dimensions are decided at run time but are
//! known to fit a compile-time bound `N`. They keep the no-allocation, stable-pointer
//! behavior of fully fixed storage while paying only for the dimension fields that are
//! actually dynamic.
//!
//! Staying within the capacity is a caller contract. It is debug-asserted here (see the
//! crate's design notes) but deliberately unchecked in release builds.

use super::{ArrayOf, RawStorage};
use crate::array::{Alignment, AutoAlign, InlineArray};

/// Inline storage with both dimensions dynamic, bounded by capacity `N`.
#[derive(Debug)]
pub struct InlineStorage<T, const N: usize, L = AutoAlign>
where
    T: Copy,
    L: Alignment,
{
    data: ArrayOf<L, T, N>,
    rows: usize,
    cols: usize,
}

/// Inline storage with dynamic rows and `C` compile-time columns.
#[derive(Debug)]
pub struct InlineRowsStorage<T, const N: usize, const C: usize, L = AutoAlign>
where
    T: Copy,
    L: Alignment,
{
    data: ArrayOf<L, T, N>,
    rows: usize,
}

/// Inline storage with `R` compile-time rows and dynamic columns.
#[derive(Debug)]
pub struct InlineColsStorage<T, const N: usize, const R: usize, L = AutoAlign>
where
    T: Copy,
    L: Alignment,
{
    data: ArrayOf<L, T, N>,
    cols: usize,
}

impl<T, const N: usize, L> Default for InlineStorage<T, N, L>
where
    T: Copy,
    L: Alignment,
{
    fn default() -> Self {
        Self {
            data: ArrayOf::<L, T, N>::new(),
            rows: 0,
            cols: 0,
        }
    }
}

impl<T, const N: usize, const C: usize, L> Default for InlineRowsStorage<T, N, C, L>
where
    T: Copy,
    L: Alignment,
{
    fn default() -> Self {
        Self {
            data: ArrayOf::<L, T, N>::new(),
            rows: 0,
        }
    }
}

impl<T, const N: usize, const R: usize, L> Default for InlineColsStorage<T, N, R, L>
where
    T: Copy,
    L: Alignment,
{
    fn default() -> Self {
        Self {
            data: ArrayOf::<L, T, N>::new(),
            cols: 0,
        }
    }
}

// SAFETY: `data` holds `N` contiguous elements for the lifetime of the value, and the
// constructor/resize obligations keep `rows * cols <= N`.
unsafe impl<T, const N: usize, L> RawStorage<T> for InlineStorage<T, N, L>
where
    T: Copy,
    L: Alignment,
{
    unsafe fn with_dims(len: usize, rows: usize, cols: usize) -> Self {
        debug_assert_eq!(len, rows * cols);
        debug_assert!(rows * cols <= N, "shape exceeds inline capacity");
        Self {
            data: ArrayOf::<L, T, N>::new(),
            rows,
            cols,
        }
    }

    unsafe fn with_dims_assume_aligned(len: usize, rows: usize, cols: usize) -> Self {
        debug_assert_eq!(len, rows * cols);
        debug_assert!(rows * cols <= N, "shape exceeds inline capacity");
        Self {
            data: ArrayOf::<L, T, N>::new_assume_aligned(),
            rows,
            cols,
        }
    }

    #[inline]
    fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    fn cols(&self) -> usize {
        self.cols
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
        // Only the dimension fields change; the buffer never moves.
        debug_assert_eq!(len, rows * cols);
        debug_assert!(rows * cols <= N, "shape exceeds inline capacity");
        self.rows = rows;
        self.cols = cols;
    }

    fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }
}

// SAFETY: As for `InlineStorage`; `cols()` is the constant `C`.
unsafe impl<T, const N: usize, const C: usize, L> RawStorage<T> for InlineRowsStorage<T, N, C, L>
where
    T: Copy,
    L: Alignment,
{
    unsafe fn with_dims(len: usize, rows: usize, cols: usize) -> Self {
        debug_assert_eq!(cols, C);
        debug_assert_eq!(len, rows * C);
        debug_assert!(rows * C <= N, "shape exceeds inline capacity");
        Self {
            data: ArrayOf::<L, T, N>::new(),
            rows,
        }
    }

    unsafe fn with_dims_assume_aligned(len: usize, rows: usize, cols: usize) -> Self {
        debug_assert_eq!(cols, C);
        debug_assert_eq!(len, rows * C);
        debug_assert!(rows * C <= N, "shape exceeds inline capacity");
        Self {
            data: ArrayOf::<L, T, N>::new_assume_aligned(),
            rows,
        }
    }

    #[inline]
    fn rows(&self) -> usize {
        self.rows
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
        debug_assert_eq!(cols, C);
        debug_assert_eq!(len, rows * C);
        debug_assert!(rows * C <= N, "shape exceeds inline capacity");
        self.rows = rows;
    }

    fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }
}

// SAFETY: As for `InlineStorage`; `rows()` is the constant `R`.
unsafe impl<T, const N: usize, const R: usize, L> RawStorage<T> for InlineColsStorage<T, N, R, L>
where
    T: Copy,
    L: Alignment,
{
    unsafe fn with_dims(len: usize, rows: usize, cols: usize) -> Self {
        debug_assert_eq!(rows, R);
        debug_assert_eq!(len, R * cols);
        debug_assert!(R * cols <= N, "shape exceeds inline capacity");
        Self {
            data: ArrayOf::<L, T, N>::new(),
            cols,
        }
    }

    unsafe fn with_dims_assume_aligned(len: usize, rows: usize, cols: usize) -> Self {
        debug_assert_eq!(rows, R);
        debug_assert_eq!(len, R * cols);
        debug_assert!(R * cols <= N, "shape exceeds inline capacity");
        Self {
            data: ArrayOf::<L, T, N>::new_assume_aligned(),
            cols,
        }
    }

    #[inline]
    fn rows(&self) -> usize {
        R
    }

    #[inline]
    fn cols(&self) -> usize {
        self.cols
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
        debug_assert_eq!(rows, R);
        debug_assert_eq!(len, R * cols);
        debug_assert!(R * cols <= N, "shape exceeds inline capacity");
        self.cols = cols;
    }

    fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }
}

///////////
// Tests //
///////////
