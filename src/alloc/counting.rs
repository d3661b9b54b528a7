/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::{
    alloc::Layout,
    ptr::NonNull,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use super::{AllocatorCore, AllocatorError, GlobalAllocator};

/// An [`AllocatorCore`] that forwards to the [`GlobalAllocator`] while counting
/// allocations and deallocations.
///
/// Clones share their counters, so a storage object can own one clone while a test
/// harness observes another. A matched pair of counts after the storage is dropped
/// demonstrates that every buffer was released exactly once.
#[derive(Debug, Clone, Default)]
pub struct CountingAllocator {
    counters: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    allocations: AtomicUsize,
    deallocations: AtomicUsize,
    allocated_bytes: AtomicUsize,
    freed_bytes: AtomicUsize,
}

impl CountingAllocator {
    /// Construct a new allocator with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of successful calls to `allocate` across all clones.
    pub fn allocations(&self) -> usize {
        self.counters.allocations.load(Ordering::Relaxed)
    }

    /// The number of calls to `deallocate` across all clones.
    pub fn deallocations(&self) -> usize {
        self.counters.deallocations.load(Ordering::Relaxed)
    }

    /// The number of buffers currently allocated and not yet freed.
    pub fn live(&self) -> usize {
        self.allocations() - self.deallocations()
    }

    /// Total bytes handed out by successful allocations.
    pub fn allocated_bytes(&self) -> usize {
        self.counters.allocated_bytes.load(Ordering::Relaxed)
    }

    /// Total bytes released through `deallocate`.
    pub fn freed_bytes(&self) -> usize {
        self.counters.freed_bytes.load(Ordering::Relaxed)
    }
}

// SAFETY: Allocation is delegated to the `GlobalAllocator`; the counters do not affect
// the returned memory.
unsafe impl AllocatorCore for CountingAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocatorError> {
        let ptr = GlobalAllocator.allocate(layout)?;
        self.counters.allocations.fetch_add(1, Ordering::Relaxed);
        self.counters
            .allocated_bytes
            .fetch_add(layout.size(), Ordering::Relaxed);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<[u8]>, layout: Layout) {
        self.counters.deallocations.fetch_add(1, Ordering::Relaxed);
        self.counters
            .freed_bytes
            .fetch_add(layout.size(), Ordering::Relaxed);
        // SAFETY: The caller's obligations are forwarded unchanged.
        unsafe { GlobalAllocator.deallocate(ptr, layout) }
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_matched_pairs() {
        let alloc = CountingAllocator::new();
        let observer = alloc.clone();

        let layout = Layout::array::<f32>(12).unwrap();
        let ptr = alloc.allocate(layout).unwrap();
        assert_eq!(observer.allocations(), 1);
        assert_eq!(observer.live(), 1);
        assert_eq!(observer.allocated_bytes(), layout.size());

        // SAFETY: `ptr` was just allocated with `layout` from a clone sharing the same
        // underlying global allocator.
        unsafe { alloc.deallocate(ptr, layout) };
        assert_eq!(observer.deallocations(), 1);
        assert_eq!(observer.live(), 0);
        assert_eq!(observer.freed_bytes(), layout.size());
    }

    #[test]
    fn zero_sized_layouts_are_rejected() {
        let alloc = CountingAllocator::new();
        assert!(alloc.allocate(Layout::new::<()>()).is_err());
        assert_eq!(alloc.allocations(), 0);
    }
}
