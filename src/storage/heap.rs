/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Dynamic shapes with no compile-time capacity bound, backed by an exclusively owned
//! heap buffer.
//!
//! The buffer is acquired from the allocation collaborator selected by the [`Alignment`]
//! marker (an over-aligning allocator under [`AutoAlign`](crate::array::AutoAlign), the
//! plain global allocator under [`crate::array::Unaligned`]) and released through the
//! same allocator instance with the layout for the exact element count being freed.
//!
//! `resize` reallocates only when the element count actually changes; a shape change at
//! the same count (say `2 x 3` to `3 x 2`) only rewrites the dimension fields. Old
//! contents are never carried over.

use std::{alloc::Layout, marker::PhantomData, ptr::NonNull};

use super::RawStorage;
use crate::alloc::{Allocator, AllocatorCore};
use crate::array::{Alignment, AutoAlign};

/// Acquire a buffer for exactly `len` elements, or null when `len` is zero.
///
/// Allocation failure is fatal: this layer performs no retry and no graceful
/// degradation. Whether to retry is the allocator's contract, and ours gave up.
fn allocate<T, A: AllocatorCore>(alloc: &A, len: usize) -> *mut T {
    if len == 0 {
        return std::ptr::null_mut();
    }
    let Ok(layout) = Layout::array::<T>(len) else {
        panic!("allocation of {len} elements overflows the address space");
    };
    match alloc.allocate(layout) {
        Ok(ptr) => ptr.cast::<T>().as_ptr(),
        Err(_) => std::alloc::handle_alloc_error(layout),
    }
}

/// Release a buffer previously obtained from [`allocate`] with the same `len`.
///
/// # Safety
///
/// `ptr` must be null or a pointer returned by [`allocate`] through `alloc` with this
/// exact `len`, not released before.
unsafe fn release<T, A: AllocatorCore>(alloc: &A, ptr: *mut T, len: usize) {
    let Some(ptr) = NonNull::new(ptr) else {
        return;
    };
    debug_assert!(len != 0, "a non-null buffer always holds at least one element");

    // Lint: This layout computation succeeded when the buffer was allocated with the
    // same `len`, so it cannot fail here.
    #[allow(clippy::expect_used)]
    let layout = Layout::array::<T>(len).expect("layout must match the original allocation");
    let slice = NonNull::slice_from_raw_parts(ptr.cast::<u8>(), layout.size());

    // SAFETY: The caller guarantees `ptr`/`len` identify a live allocation from `alloc`.
    unsafe { alloc.deallocate(slice, layout) };
}

/// Heap storage with both dimensions dynamic.
#[derive(Debug)]
pub struct HeapStorage<T, L: Alignment = AutoAlign, A: Allocator = <L as Alignment>::Alloc>
where
    T: Copy,
{
    ptr: *mut T,
    rows: usize,
    cols: usize,
    alloc: A,
    marker: PhantomData<L>,
}

/// Heap storage with dynamic rows and `C` compile-time columns.
#[derive(Debug)]
pub struct HeapRowsStorage<
    T,
    const C: usize,
    L: Alignment = AutoAlign,
    A: Allocator = <L as Alignment>::Alloc,
> where
    T: Copy,
{
    ptr: *mut T,
    rows: usize,
    alloc: A,
    marker: PhantomData<L>,
}

/// Heap storage with `R` compile-time rows and dynamic columns.
#[derive(Debug)]
pub struct HeapColsStorage<
    T,
    const R: usize,
    L: Alignment = AutoAlign,
    A: Allocator = <L as Alignment>::Alloc,
> where
    T: Copy,
{
    ptr: *mut T,
    cols: usize,
    alloc: A,
    marker: PhantomData<L>,
}

//////////////////
// Full dynamic //
//////////////////

impl<T, L, A> HeapStorage<T, L, A>
where
    T: Copy,
    L: Alignment,
    A: Allocator,
{
    /// Construct a storage in the provided allocator.
    ///
    /// The [`RawStorage::with_dims`] constructor uses the allocator selected by `L`;
    /// this entry point exists for callers that need to inject their own (an
    /// instrumented allocator in a test harness, an arena, ...).
    ///
    /// # Safety
    ///
    /// `len == rows * cols`.
    pub unsafe fn with_dims_in(len: usize, rows: usize, cols: usize, alloc: A) -> Self {
        debug_assert_eq!(len, rows * cols);
        Self {
            ptr: allocate(&alloc, len),
            rows,
            cols,
            alloc,
            marker: PhantomData,
        }
    }

    /// The allocator owning this storage's buffer.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }
}

impl<T, L, A> Default for HeapStorage<T, L, A>
where
    T: Copy,
    L: Alignment,
    A: Allocator + Default,
{
    fn default() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            rows: 0,
            cols: 0,
            alloc: A::default(),
            marker: PhantomData,
        }
    }
}

impl<T, L, A> Drop for HeapStorage<T, L, A>
where
    T: Copy,
    L: Alignment,
    A: Allocator,
{
    fn drop(&mut self) {
        // SAFETY: `ptr` (when non-null) came from `alloc` with a layout for exactly
        // `rows * cols` elements, and ownership is exclusive so this is the only
        // release.
        unsafe { release(&self.alloc, self.ptr, self.rows * self.cols) };
    }
}

// SAFETY: The storage exclusively owns its buffer, so sending it between threads moves
// the elements with it.
unsafe impl<T, L, A> Send for HeapStorage<T, L, A>
where
    T: Copy + Send,
    L: Alignment,
    A: Allocator + Send,
{
}

// SAFETY: Shared access only exposes `*const T` and the dimension fields.
unsafe impl<T, L, A> Sync for HeapStorage<T, L, A>
where
    T: Copy + Sync,
    L: Alignment,
    A: Allocator + Sync,
{
}

// SAFETY: `ptr` addresses exactly `rows * cols` elements whenever it is non-null, and
// is null exactly when that product is zero.
unsafe impl<T, L, A> RawStorage<T> for HeapStorage<T, L, A>
where
    T: Copy,
    L: Alignment,
    A: Allocator + Default,
{
    unsafe fn with_dims(len: usize, rows: usize, cols: usize) -> Self {
        // SAFETY: Obligations are forwarded to the caller.
        unsafe { Self::with_dims_in(len, rows, cols, A::default()) }
    }

    unsafe fn with_dims_assume_aligned(len: usize, rows: usize, cols: usize) -> Self {
        // There is no inline buffer, so there is no alignment assertion to skip.
        // SAFETY: Obligations are forwarded to the caller.
        unsafe { Self::with_dims(len, rows, cols) }
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
        self.ptr.cast_const()
    }

    #[inline]
    fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr
    }

    unsafe fn resize(&mut self, len: usize, rows: usize, cols: usize) {
        debug_assert_eq!(len, rows * cols);
        let current = self.rows * self.cols;
        if len != current {
            // SAFETY: `ptr` came from `alloc` sized for `current` elements.
            unsafe { release(&self.alloc, self.ptr, current) };
            // `allocate` can panic on layout overflow, and the unwind runs `Drop`.
            // The struct must describe an empty storage until the new buffer exists,
            // or that drop would release the old pointer a second time.
            self.ptr = std::ptr::null_mut();
            self.rows = 0;
            self.cols = 0;
            self.ptr = allocate(&self.alloc, len);
        }
        self.rows = rows;
        self.cols = cols;
    }

    fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }
}

//////////////////////////////
// Dynamic rows, fixed cols //
//////////////////////////////

impl<T, const C: usize, L, A> HeapRowsStorage<T, C, L, A>
where
    T: Copy,
    L: Alignment,
    A: Allocator,
{
    /// Construct a storage in the provided allocator. See
    /// [`HeapStorage::with_dims_in`].
    ///
    /// # Safety
    ///
    /// `len == rows * C`.
    pub unsafe fn with_dims_in(len: usize, rows: usize, cols: usize, alloc: A) -> Self {
        debug_assert_eq!(cols, C);
        debug_assert_eq!(len, rows * C);
        Self {
            ptr: allocate(&alloc, len),
            rows,
            alloc,
            marker: PhantomData,
        }
    }

    /// The allocator owning this storage's buffer.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }
}

impl<T, const C: usize, L, A> Default for HeapRowsStorage<T, C, L, A>
where
    T: Copy,
    L: Alignment,
    A: Allocator + Default,
{
    fn default() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            rows: 0,
            alloc: A::default(),
            marker: PhantomData,
        }
    }
}

impl<T, const C: usize, L, A> Drop for HeapRowsStorage<T, C, L, A>
where
    T: Copy,
    L: Alignment,
    A: Allocator,
{
    fn drop(&mut self) {
        // SAFETY: As for `HeapStorage`: the buffer holds `rows * C` elements.
        unsafe { release(&self.alloc, self.ptr, self.rows * C) };
    }
}

// SAFETY: As for `HeapStorage`.
unsafe impl<T, const C: usize, L, A> Send for HeapRowsStorage<T, C, L, A>
where
    T: Copy + Send,
    L: Alignment,
    A: Allocator + Send,
{
}

// SAFETY: As for `HeapStorage`.
unsafe impl<T, const C: usize, L, A> Sync for HeapRowsStorage<T, C, L, A>
where
    T: Copy + Sync,
    L: Alignment,
    A: Allocator + Sync,
{
}

// SAFETY: As for `HeapStorage`, with `cols()` the constant `C`.
unsafe impl<T, const C: usize, L, A> RawStorage<T> for HeapRowsStorage<T, C, L, A>
where
    T: Copy,
    L: Alignment,
    A: Allocator + Default,
{
    unsafe fn with_dims(len: usize, rows: usize, cols: usize) -> Self {
        // SAFETY: Obligations are forwarded to the caller.
        unsafe { Self::with_dims_in(len, rows, cols, A::default()) }
    }

    unsafe fn with_dims_assume_aligned(len: usize, rows: usize, cols: usize) -> Self {
        // SAFETY: Obligations are forwarded to the caller.
        unsafe { Self::with_dims(len, rows, cols) }
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
        self.ptr.cast_const()
    }

    #[inline]
    fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr
    }

    unsafe fn resize(&mut self, len: usize, rows: usize, cols: usize) {
        debug_assert_eq!(cols, C);
        debug_assert_eq!(len, rows * C);
        let current = self.rows * C;
        if len != current {
            // SAFETY: `ptr` came from `alloc` sized for `current` elements.
            unsafe { release(&self.alloc, self.ptr, current) };
            // As for `HeapStorage`: stay droppable across a panicking `allocate`.
            self.ptr = std::ptr::null_mut();
            self.rows = 0;
            self.ptr = allocate(&self.alloc, len);
        }
        self.rows = rows;
    }

    fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }
}

//////////////////////////////
// Fixed rows, dynamic cols //
//////////////////////////////

impl<T, const R: usize, L, A> HeapColsStorage<T, R, L, A>
where
    T: Copy,
    L: Alignment,
    A: Allocator,
{
    /// Construct a storage in the provided allocator. See
    /// [`HeapStorage::with_dims_in`].
    ///
    /// # Safety
    ///
    /// `len == R * cols`.
    pub unsafe fn with_dims_in(len: usize, rows: usize, cols: usize, alloc: A) -> Self {
        debug_assert_eq!(rows, R);
        debug_assert_eq!(len, R * cols);
        Self {
            ptr: allocate(&alloc, len),
            cols,
            alloc,
            marker: PhantomData,
        }
    }

    /// The allocator owning this storage's buffer.
    pub fn allocator(&self) -> &A {
        &self.alloc
    }
}

impl<T, const R: usize, L, A> Default for HeapColsStorage<T, R, L, A>
where
    T: Copy,
    L: Alignment,
    A: Allocator + Default,
{
    fn default() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            cols: 0,
            alloc: A::default(),
            marker: PhantomData,
        }
    }
}

impl<T, const R: usize, L, A> Drop for HeapColsStorage<T, R, L, A>
where
    T: Copy,
    L: Alignment,
    A: Allocator,
{
    fn drop(&mut self) {
        // SAFETY: As for `HeapStorage`: the buffer holds `R * cols` elements.
        unsafe { release(&self.alloc, self.ptr, R * self.cols) };
    }
}

// SAFETY: As for `HeapStorage`.
unsafe impl<T, const R: usize, L, A> Send for HeapColsStorage<T, R, L, A>
where
    T: Copy + Send,
    L: Alignment,
    A: Allocator + Send,
{
}

// SAFETY: As for `HeapStorage`.
unsafe impl<T, const R: usize, L, A> Sync for HeapColsStorage<T, R, L, A>
where
    T: Copy + Sync,
    L: Alignment,
    A: Allocator + Sync,
{
}

// SAFETY: As for `HeapStorage`, with `rows()` the constant `R`.
unsafe impl<T, const R: usize, L, A> RawStorage<T> for HeapColsStorage<T, R, L, A>
where
    T: Copy,
    L: Alignment,
    A: Allocator + Default,
{
    unsafe fn with_dims(len: usize, rows: usize, cols: usize) -> Self {
        // SAFETY: Obligations are forwarded to the caller.
        unsafe { Self::with_dims_in(len, rows, cols, A::default()) }
    }

    unsafe fn with_dims_assume_aligned(len: usize, rows: usize, cols: usize) -> Self {
        // SAFETY: Obligations are forwarded to the caller.
        unsafe { Self::with_dims(len, rows, cols) }
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
        self.ptr.cast_const()
    }

    #[inline]
    fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr
    }

    unsafe fn resize(&mut self, len: usize, rows: usize, cols: usize) {
        debug_assert_eq!(rows, R);
        debug_assert_eq!(len, R * cols);
        let current = R * self.cols;
        if len != current {
            // SAFETY: `ptr` came from `alloc` sized for `current` elements.
            unsafe { release(&self.alloc, self.ptr, current) };
            // As for `HeapStorage`: stay droppable across a panicking `allocate`.
            self.ptr = std::ptr::null_mut();
            self.cols = 0;
            self.ptr = allocate(&self.alloc, len);
        }
        self.cols = cols;
    }

    fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }
}

///////////
// Tests //
///////////
