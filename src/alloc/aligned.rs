/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::ptr::NonNull;

use super::{AllocatorCore, AllocatorError, GlobalAllocator};
use crate::array::VECTOR_ALIGNMENT;
use crate::num::PowerOfTwo;

/// An [`AllocatorCore`] that allocates memory aligned to at least a specified alignment.
///
/// Heap-backed storage variants use this (through [`crate::array::AutoAlign`]) so that
/// dynamically sized buffers observe the same vector-register alignment guarantee as
/// inline buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedAllocator {
    /// This represents a power of 2.
    alignment: u8,
}

impl AlignedAllocator {
    /// Construct a new allocator that uses the given alignment.
    #[inline]
    pub const fn new(alignment: PowerOfTwo) -> Self {
        Self {
            // CAST: `trailing_zeros` returns at most 63 (because we've removed 0), so
            // the conversion is always lossless.
            alignment: alignment.raw().trailing_zeros() as u8,
        }
    }

    /// Construct an allocator aligning to the hardware vector-register boundary.
    #[inline]
    pub const fn vector() -> Self {
        match PowerOfTwo::new(VECTOR_ALIGNMENT) {
            Ok(alignment) => Self::new(alignment),
            // `VECTOR_ALIGNMENT` is a power of two.
            Err(_) => unreachable!(),
        }
    }

    #[inline]
    pub const fn alignment(&self) -> usize {
        1usize << (self.alignment as usize)
    }
}

impl Default for AlignedAllocator {
    fn default() -> Self {
        Self::vector()
    }
}

// SAFETY: We are making the alignment potentially stricter before forwarding to the
// `GlobalAllocator`.
unsafe impl AllocatorCore for AlignedAllocator {
    #[inline]
    fn allocate(&self, layout: std::alloc::Layout) -> Result<NonNull<[u8]>, AllocatorError> {
        // Bump up the alignment.
        let layout = layout
            .align_to(self.alignment())
            .map_err(|_| AllocatorError)?;
        GlobalAllocator.allocate(layout)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<[u8]>, layout: std::alloc::Layout) {
        // Lint: The given `layout` **should** be the same as that passed to `allocate`,
        // which must have succeeded for the pointer to be valid in the first place.
        #[allow(clippy::expect_used)]
        let layout = layout
            .align_to(self.alignment())
            .expect("invalid layout provided");
        GlobalAllocator.deallocate(ptr, layout)
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_default() {
        assert_eq!(AlignedAllocator::vector().alignment(), VECTOR_ALIGNMENT);
        assert_eq!(AlignedAllocator::default(), AlignedAllocator::vector());
    }

    #[test]
    fn bumps_alignment_of_small_layouts() {
        struct Guard<'a> {
            ptr: NonNull<[u8]>,
            layout: std::alloc::Layout,
            allocator: &'a AlignedAllocator,
        }

        impl Drop for Guard<'_> {
            fn drop(&mut self) {
                // SAFETY: The guard is constructed immediately after allocation with
                // the same allocator and layout.
                unsafe { self.allocator.deallocate(self.ptr, self.layout) }
            }
        }

        let alloc = AlignedAllocator::vector();

        // Element layouts smaller or weaker than the vector width still come back on
        // a vector boundary; that is the whole point of this allocator.
        for size in [1, 3, 4, 7, 24, 100] {
            let layout = std::alloc::Layout::from_size_align(size, 1).unwrap();
            let ptr = alloc.allocate(layout).unwrap();

            // Ensure we deallocate if an assertion fires.
            let _guard = Guard {
                ptr,
                layout,
                allocator: &alloc,
            };

            assert_eq!(ptr.len(), size);
            assert_eq!(
                (ptr.cast::<u8>().as_ptr() as usize) % VECTOR_ALIGNMENT,
                0,
                "ptr {:?} is not aligned to {}",
                ptr,
                VECTOR_ALIGNMENT
            );
        }
    }

    #[test]
    fn wider_alignments_are_honored() {
        let alloc = AlignedAllocator::new(PowerOfTwo::new(64).unwrap());
        assert_eq!(alloc.alignment(), 64);

        let layout = std::alloc::Layout::from_size_align(48, 8).unwrap();
        let ptr = alloc.allocate(layout).unwrap();
        assert_eq!((ptr.cast::<u8>().as_ptr() as usize) % 64, 0);

        // SAFETY: `ptr` was just allocated with `layout` from this allocator.
        unsafe { alloc.deallocate(ptr, layout) };
    }
}
