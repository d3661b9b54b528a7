/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Dimension-specialized element storage for dense matrices.
//!
//! A matrix's row and column counts may each be fixed at compile time or chosen at run
//! time, and the right physical layout differs for every combination: a fully fixed
//! shape wants an inline array, a dynamic shape with a compile-time capacity bound wants
//! an inline array plus runtime dimension fields, and an unbounded dynamic shape wants
//! an exclusively owned heap buffer. This module provides one struct per combination,
//! all behind the single [`RawStorage`] contract, so the enclosing matrix type picks a
//! variant once — by type — and pays no runtime dispatch afterwards.
//!
//! | Variant | Rows | Cols | Backing |
//! |---|---|---|---|
//! | [`ArrayStorage`]      | const | const   | inline, capacity `N = R * C` |
//! | [`NullStorage`]       | const | const   | none (zero-sized shape) |
//! | [`InlineStorage`]     | runtime | runtime | inline, capacity `N` |
//! | [`InlineRowsStorage`] | runtime | const   | inline, capacity `N` |
//! | [`InlineColsStorage`] | const | runtime  | inline, capacity `N` |
//! | [`HeapStorage`]       | runtime | runtime | heap |
//! | [`HeapRowsStorage`]   | runtime | const   | heap |
//! | [`HeapColsStorage`]   | const | runtime  | heap |
//!
//! The alignment option (`L`: [`Alignment`]) threads through every variant that owns a
//! buffer, selecting the inline array representation and the default heap allocator.
//!
//! Storage objects own their buffers exclusively. There is no sharing and no aliasing
//! between instances; the only way state moves between two storages is [`RawStorage::swap`].

use crate::array::Alignment;

mod fixed;
mod heap;
mod inline;

pub use fixed::{ArrayStorage, NullStorage};
pub use heap::{HeapColsStorage, HeapRowsStorage, HeapStorage};
pub use inline::{InlineColsStorage, InlineRowsStorage, InlineStorage};

/// The uniform access contract implemented by every storage variant.
///
/// All element access of the enclosing matrix type flows through this trait: the current
/// shape, a raw pointer to the first element, shape updates, and whole-state exchange.
/// The storage layer never validates element access against the current shape — doing so
/// on every access would defeat its purpose — so the obligations below are contracts on
/// the caller, not runtime-detected faults.
///
/// # Safety
///
/// Implementations guarantee that, provided every `unsafe` method on this trait was
/// called with its documented obligations upheld, the pointer returned by
/// [`as_ptr`](Self::as_ptr) addresses at least `rows() * cols()` contiguous elements
/// (and is null exactly when that product is zero for heap-backed variants, or always
/// for [`NullStorage`]). Unsafe code in the matrix layer relies on this guarantee to
/// index elements without bounds checks.
pub unsafe trait RawStorage<T: Copy>: Sized {
    /// Construct a storage for `rows * cols` elements.
    ///
    /// Inline-buffer variants ignore `len` and always use their compile-time capacity;
    /// heap-backed variants allocate exactly `len` elements (a null buffer when `len`
    /// is zero). Allocation failure is fatal.
    ///
    /// # Safety
    ///
    /// * `len == rows * cols`.
    /// * For inline-buffer variants, `rows * cols` must not exceed the compile-time
    ///   capacity.
    /// * Dimensions fixed by the variant's const parameters must be passed unchanged.
    unsafe fn with_dims(len: usize, rows: usize, cols: usize) -> Self;

    /// Skip-check construction path: identical to [`with_dims`](Self::with_dims) except
    /// that the debug-build alignment assertion on the inline buffer is bypassed.
    ///
    /// For use where the enclosing object's own layout already guarantees the
    /// alignment, so the assertion could only fire spuriously.
    ///
    /// # Safety
    ///
    /// Same obligations as [`with_dims`](Self::with_dims).
    unsafe fn with_dims_assume_aligned(len: usize, rows: usize, cols: usize) -> Self;

    /// Current row count. A compile-time constant for fixed-row variants.
    fn rows(&self) -> usize;

    /// Current column count. A compile-time constant for fixed-column variants.
    fn cols(&self) -> usize;

    /// Address of the first element, or null for [`NullStorage`] and for empty
    /// heap-backed variants.
    fn as_ptr(&self) -> *const T;

    /// Mutable address of the first element; null in the same cases as
    /// [`as_ptr`](Self::as_ptr).
    fn as_mut_ptr(&mut self) -> *mut T;

    /// Update the logical shape.
    ///
    /// Inline-buffer variants only update their dynamic dimension fields; they never
    /// reallocate and the buffer address is unchanged. Heap-backed variants reallocate
    /// exactly when `len` differs from the current `rows() * cols()`, discarding the old
    /// contents; the buffer becomes null when `len` is zero. Contents are never
    /// preserved across a reallocation.
    ///
    /// # Safety
    ///
    /// Same obligations as [`with_dims`](Self::with_dims). Additionally, any pointer
    /// previously obtained from a heap-backed variant is invalidated when this
    /// reallocates.
    unsafe fn resize(&mut self, len: usize, rows: usize, cols: usize);

    /// Exchange the entire owned state (buffer or buffer contents, dynamic dimension
    /// fields, allocator) with `other`.
    ///
    /// This is a whole-value exchange and never leaves either side partially swapped.
    fn swap(&mut self, other: &mut Self);
}

/// Shorthand for the inline array type selected by an [`Alignment`] marker.
pub(crate) type ArrayOf<L, T, const N: usize> = <L as Alignment>::Array<T, N>;
