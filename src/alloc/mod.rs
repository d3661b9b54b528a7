/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! The allocation collaborator used by heap-backed storage variants.
//!
//! Storage types in this crate never call `std::alloc` directly. Instead, they go through
//! the [`AllocatorCore`] trait so that the policy decisions (whether to over-align the
//! buffer, whether to instrument allocations in a test harness) stay outside the storage
//! types themselves.
//!
//! Allocation failure is reported as a [`Result`] here. Whether that failure is
//! recoverable is the caller's decision; the storage layer treats it as fatal.

use std::{alloc::Layout, ptr::NonNull};

use thiserror::Error;

mod aligned;
mod counting;

pub use aligned::AlignedAllocator;
pub use counting::CountingAllocator;

/// Indicate that an allocation error has occurred.
///
/// This type is limited in what it can contain because additional context
/// inevitably requires more memory allocation, which is what we're trying to avoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown allocation error")]
pub struct AllocatorError;

/// The allocate/deallocate pair heap-backed storage variants are built on.
///
/// # Safety
///
/// Implementations must ensure that a successful `allocate` returns a slice of at least
/// `layout.size()` bytes aligned to at least `layout.align()`; anything less **must**
/// surface as an error instead.
pub unsafe trait AllocatorCore {
    /// Allocate space for at least `layout.size()` bytes aligned to at least
    /// `layout.align()`. Returns an error if the requested size or alignment cannot be
    /// satisfied by this allocator.
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocatorError>;

    /// Deallocation companion to `allocate`.
    ///
    /// # Safety
    ///
    /// The caller must ensure that
    ///
    /// 1. `ptr` is "currently allocated" from the allocator.
    ///    See: <https://doc.rust-lang.org/std/alloc/trait.Allocator.html#currently-allocated-memory>
    /// 2. `ptr` has the same base pointer as the slice-pointer returned from [`Self::allocate`].
    /// 3. `layout` is the same layout that was passed to [`Self::allocate`] for this pointer.
    unsafe fn deallocate(&self, ptr: NonNull<[u8]>, layout: Layout);
}

/// A full allocator suitable for embedding in an owning storage type.
///
/// Users should implement [`AllocatorCore`] instead and use the blanket implementation for
/// the full cloneable allocator.
pub trait Allocator: AllocatorCore + Clone {}

impl<T> Allocator for T where T: AllocatorCore + Clone {}

/// A handle to Rust's global allocator. This type does not support allocations of size 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalAllocator;

// SAFETY: This is a simple wrapper around Rust's built-in allocation and deallocation
// methods.
//
// The returned slice from `allocate` always has the exact size and alignment as `layout`.
unsafe impl AllocatorCore for GlobalAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocatorError> {
        if layout.size() == 0 {
            return Err(AllocatorError);
        }

        // SAFETY: `layout` has a non-zero size.
        let ptr = unsafe { std::alloc::alloc(layout) };
        let ptr = std::ptr::slice_from_raw_parts_mut(ptr, layout.size());
        NonNull::new(ptr).ok_or(AllocatorError)
    }

    unsafe fn deallocate(&self, ptr: NonNull<[u8]>, layout: Layout) {
        // SAFETY: The caller has the responsibility to ensure that `ptr` and `layout`
        // came from a previous allocation.
        unsafe { std::alloc::dealloc(ptr.as_ptr().cast::<u8>(), layout) }
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;

    fn test_alloc<T>() {
        let alloc = GlobalAllocator;

        let layout = Layout::new::<T>();
        let ptr = alloc.allocate(layout).unwrap();

        assert_eq!(ptr.len(), layout.size());
        assert_eq!(ptr.len(), std::mem::size_of::<T>());
        assert_eq!((ptr.as_ptr().cast::<u8>() as usize) % layout.align(), 0);

        // SAFETY: `ptr` was obtained from this allocator with the specified `layout`.
        unsafe { alloc.deallocate(ptr, layout) };
    }

    #[test]
    fn test_global_allocator() {
        assert!(GlobalAllocator.allocate(Layout::new::<()>()).is_err());

        test_alloc::<u8>();
        test_alloc::<u16>();
        test_alloc::<u32>();
        test_alloc::<f32>();
        test_alloc::<f64>();
        test_alloc::<(u8, u64)>();
        test_alloc::<[f32; 7]>();
    }
}
