/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Inline element buffers with an optional vector-register alignment guarantee.
//!
//! A storage variant with a compile-time capacity embeds one of two array types:
//!
//! * [`AlignedArray`]: the first byte of the buffer is aligned to [`VECTOR_ALIGNMENT`],
//!   so SIMD kernels can use aligned loads on the buffer without a runtime check.
//! * [`UnalignedArray`]: natural alignment only, for callers that opt out.
//!
//! The choice between the two is made by the enclosing storage type through the sealed
//! [`Alignment`] marker trait, keeping the selection a compile-time property with no
//! runtime dispatch.
//!
//! Both arrays hold uninitialized memory. The storage contract hands out raw pointers
//! and never reads elements itself, so initialization is entirely the caller's business.

use std::{fmt::Debug, mem::MaybeUninit};

use crate::alloc::{AlignedAllocator, Allocator, GlobalAllocator};

/// The byte boundary inline buffers are aligned to when alignment is requested.
///
/// This matches the width of a 128-bit vector register, the widest unit the surrounding
/// kernels assume they can load without crossing an alignment fault.
pub const VECTOR_ALIGNMENT: usize = 16;

/// Construction and raw access for an inline element buffer of compile-time capacity.
///
/// # Safety
///
/// Implementations must ensure that [`as_ptr`](Self::as_ptr) and
/// [`as_mut_ptr`](Self::as_mut_ptr) return the address of a contiguous block with room
/// for the type's full compile-time capacity, valid for reads and writes for as long as
/// the array itself is alive. Unsafe code in the storage layer relies on this to index
/// the buffer without further checks.
pub unsafe trait InlineArray<T>: Sized {
    /// Construct the array, asserting (in debug builds) that the buffer address honors
    /// the type's alignment requirement.
    ///
    /// A failed assertion indicates a toolchain or allocator that did not honor the
    /// requested alignment. That is a configuration error, not a runtime condition, and
    /// it is deliberately fatal.
    fn new() -> Self;

    /// Construct the array without the alignment assertion.
    ///
    /// Used by enclosing storage types on their own skip-check construction path, where
    /// the enclosing object's layout already carries the alignment guarantee and
    /// re-checking it would be redundant.
    fn new_assume_aligned() -> Self;

    /// Address of the first element.
    fn as_ptr(&self) -> *const T;

    /// Mutable address of the first element.
    fn as_mut_ptr(&mut self) -> *mut T;
}

/// An inline buffer of `N` elements whose first byte is aligned to [`VECTOR_ALIGNMENT`].
///
/// The contents start uninitialized; [`MaybeUninit`] keeps that sound without a
/// `Default` bound on `T`.
#[repr(C, align(16))]
pub struct AlignedArray<T, const N: usize> {
    data: MaybeUninit<[T; N]>,
}

/// An inline buffer of `N` elements at natural alignment.
#[repr(C)]
pub struct UnalignedArray<T, const N: usize> {
    data: MaybeUninit<[T; N]>,
}

// SAFETY: `data` is a `[T; N]` subobject, so its base address is valid for `N` elements
// for the lifetime of the array.
unsafe impl<T: Copy, const N: usize> InlineArray<T> for AlignedArray<T, N> {
    #[inline]
    fn new() -> Self {
        let array = Self {
            data: MaybeUninit::uninit(),
        };
        debug_assert_eq!(
            array.data.as_ptr() as usize % VECTOR_ALIGNMENT,
            0,
            "inline buffer is not aligned to the vector-register boundary; \
             the toolchain did not honor the requested alignment"
        );
        array
    }

    #[inline]
    fn new_assume_aligned() -> Self {
        Self {
            data: MaybeUninit::uninit(),
        }
    }

    #[inline]
    fn as_ptr(&self) -> *const T {
        self.data.as_ptr().cast::<T>()
    }

    #[inline]
    fn as_mut_ptr(&mut self) -> *mut T {
        self.data.as_mut_ptr().cast::<T>()
    }
}

// SAFETY: Same layout argument as `AlignedArray`; there is no alignment requirement to
// uphold beyond `T`'s own.
unsafe impl<T: Copy, const N: usize> InlineArray<T> for UnalignedArray<T, N> {
    #[inline]
    fn new() -> Self {
        // No requirement beyond `T`'s natural alignment, so there is nothing to assert.
        Self {
            data: MaybeUninit::uninit(),
        }
    }

    #[inline]
    fn new_assume_aligned() -> Self {
        Self::new()
    }

    #[inline]
    fn as_ptr(&self) -> *const T {
        self.data.as_ptr().cast::<T>()
    }

    #[inline]
    fn as_mut_ptr(&mut self) -> *mut T {
        self.data.as_mut_ptr().cast::<T>()
    }
}

impl<T, const N: usize> Debug for AlignedArray<T, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedArray")
            .field("capacity", &N)
            .field("ptr", &self.data.as_ptr())
            .finish()
    }
}

impl<T, const N: usize> Debug for UnalignedArray<T, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnalignedArray")
            .field("capacity", &N)
            .field("ptr", &self.data.as_ptr())
            .finish()
    }
}

////////////////////////
// Alignment Markers  //
////////////////////////

/// Compile-time selector for the alignment option of a storage variant.
///
/// The marker decides two things at once:
///
/// * which inline array representation a fixed-capacity variant embeds, and
/// * which allocator a heap-backed variant uses by default,
///
/// so a single type parameter threads the alignment policy through every variant. The
/// trait is sealed; the two implementations below are the closed set of options.
pub trait Alignment: sealed::Sealed + Copy + Debug + Default + 'static {
    /// The inline array representation for this alignment option.
    type Array<T: Copy, const N: usize>: InlineArray<T> + Debug;

    /// The default allocator heap-backed variants use under this alignment option.
    type Alloc: Allocator + Default + Debug;
}

/// Request the vector-register alignment guarantee (the default).
///
/// Note one divergence from a conditional-alignment scheme: the buffer is aligned even
/// when its byte size is not a multiple of [`VECTOR_ALIGNMENT`], at the cost of trailing
/// padding for such sizes. Callers that cannot afford the padding should select
/// [`Unaligned`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoAlign;

/// Opt out of the alignment guarantee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Unaligned;

impl Alignment for AutoAlign {
    type Array<T: Copy, const N: usize> = AlignedArray<T, N>;
    type Alloc = AlignedAllocator;
}

impl Alignment for Unaligned {
    type Array<T: Copy, const N: usize> = UnalignedArray<T, N>;
    type Alloc = GlobalAllocator;
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::AutoAlign {}
    impl Sealed for super::Unaligned {}
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;

    fn check_aligned<T: Copy, const N: usize>() {
        let a = AlignedArray::<T, N>::new();
        assert_eq!(a.as_ptr() as usize % VECTOR_ALIGNMENT, 0);

        let a = AlignedArray::<T, N>::new_assume_aligned();
        assert_eq!(a.as_ptr() as usize % VECTOR_ALIGNMENT, 0);
    }

    #[test]
    fn aligned_array_is_aligned() {
        check_aligned::<f32, 4>();
        check_aligned::<f32, 6>();
        check_aligned::<f64, 2>();
        check_aligned::<u8, 1>();
        check_aligned::<u8, 16>();
        check_aligned::<i16, 9>();
    }

    #[test]
    fn aligned_array_rounds_size_up() {
        assert_eq!(std::mem::size_of::<AlignedArray<f32, 4>>(), 16);
        assert_eq!(std::mem::size_of::<AlignedArray<f32, 6>>(), 32);
        assert_eq!(std::mem::size_of::<UnalignedArray<f32, 6>>(), 24);
    }

    #[test]
    fn unaligned_array_has_natural_alignment() {
        assert_eq!(
            std::mem::align_of::<UnalignedArray<f64, 3>>(),
            std::mem::align_of::<f64>()
        );
        assert_eq!(std::mem::align_of::<AlignedArray<u8, 3>>(), VECTOR_ALIGNMENT);
    }

    #[test]
    fn writes_round_trip() {
        let mut a = AlignedArray::<u32, 8>::new();
        for i in 0..8 {
            // SAFETY: `i` is within the array's capacity.
            unsafe { a.as_mut_ptr().add(i).write(i as u32 * 3) };
        }
        for i in 0..8 {
            // SAFETY: The element was initialized above.
            let v = unsafe { a.as_ptr().add(i).read() };
            assert_eq!(v, i as u32 * 3);
        }
    }
}
