/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Dimension-specialized element storage for dense matrices.
//!
//! This crate is the storage core of a dense linear-algebra stack: it owns the element
//! buffer behind a matrix and nothing else. Row and column counts may each be fixed at
//! compile time or chosen at run time, and every combination gets its own physical
//! layout — an inline array for fully fixed shapes, an inline array plus dimension
//! fields for dynamic shapes with a compile-time capacity bound, and an exclusively
//! owned heap buffer for unbounded shapes. All variants expose the single
//! [`RawStorage`] contract (shape, raw element pointer, resize, swap), so the matrix
//! type above selects a variant once, by type, and pays no runtime dispatch afterwards.
//!
//! # What this crate does *not* do
//!
//! No arithmetic, no broadcasting or shape inference, no element validation, and no
//! bounds checking on access: the pointer handed out by [`RawStorage::as_ptr`] is raw,
//! and indexing past `rows() * cols()` is the caller's bug, not a runtime-detected
//! fault. Buffers are never shared between two storage objects, and heap buffers never
//! grow in place — a resize that changes the element count discards the old contents.
//!
//! # Alignment
//!
//! SIMD kernels want buffers aligned to a vector-register boundary
//! ([`VECTOR_ALIGNMENT`]). The [`AutoAlign`] marker (the default) guarantees that
//! alignment for inline buffers via the type's layout and for heap buffers via an
//! over-aligning allocator; [`Unaligned`] opts out. Construction of an aligned inline
//! buffer debug-asserts the guarantee, and a skip-check construction path
//! ([`RawStorage::with_dims_assume_aligned`]) exists for enclosing objects whose own
//! layout already carries it.
//!
//! # Example
//!
//! ```
//! use dense_storage::{HeapStorage, RawStorage};
//!
//! // A fully dynamic 2 x 3 storage.
//! // SAFETY: `6 == 2 * 3`.
//! let mut s = unsafe { HeapStorage::<f32>::with_dims(6, 2, 3) };
//! assert_eq!((s.rows(), s.cols()), (2, 3));
//! assert!(!s.as_ptr().is_null());
//!
//! // Reinterpreting the same six elements as 3 x 2 does not reallocate.
//! let ptr = s.as_ptr();
//! // SAFETY: `6 == 3 * 2`.
//! unsafe { s.resize(6, 3, 2) };
//! assert_eq!(s.as_ptr(), ptr);
//!
//! // Resizing to zero elements releases the buffer.
//! // SAFETY: `0 == 0 * 0`.
//! unsafe { s.resize(0, 0, 0) };
//! assert!(s.as_ptr().is_null());
//! ```
//!
//! # Concurrency
//!
//! None. Every operation is synchronous and the caller serializes access; a `data`
//! read concurrent with a `resize` write on the same storage is a data race.

pub mod alloc;
pub mod array;
pub mod num;
pub mod storage;

pub use array::{Alignment, AutoAlign, Unaligned, VECTOR_ALIGNMENT};
pub use storage::{
    ArrayStorage, HeapColsStorage, HeapRowsStorage, HeapStorage, InlineColsStorage,
    InlineRowsStorage, InlineStorage, NullStorage, RawStorage,
};
