/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Cross-variant checks of the storage contract, with allocator accounting done through
//! an instrumented allocation collaborator.

use rand::{rngs::StdRng, Rng, SeedableRng};

use dense_storage::{
    alloc::CountingAllocator, ArrayStorage, HeapColsStorage, HeapRowsStorage, HeapStorage,
    InlineStorage, NullStorage, RawStorage, Unaligned, VECTOR_ALIGNMENT,
};

/// The canonical end-to-end scenario: construct 2 x 3, reshape to 3 x 2 at the same
/// element count, then shrink to empty.
#[test]
fn fully_dynamic_scenario() {
    // SAFETY: Every call keeps `len == rows * cols`.
    unsafe {
        let mut s = HeapStorage::<f64>::with_dims(6, 2, 3);
        assert_eq!(s.rows(), 2);
        assert_eq!(s.cols(), 3);
        assert!(!s.as_ptr().is_null());

        let ptr = s.as_ptr();
        s.resize(6, 3, 2);
        assert_eq!(s.as_ptr(), ptr, "same-count resize must not reallocate");
        assert_eq!(s.rows(), 3);
        assert_eq!(s.cols(), 2);

        s.resize(0, 0, 0);
        assert!(s.as_ptr().is_null());
    }
}

#[test]
fn heap_lifecycle_releases_every_buffer_once() {
    let alloc = CountingAllocator::new();

    // SAFETY: Every call keeps `len == rows * cols` (and the fixed dimension matches
    // the const parameter for the one-fixed variants).
    unsafe {
        let mut s = HeapStorage::<f32, Unaligned, _>::with_dims_in(6, 2, 3, alloc.clone());
        s.resize(6, 3, 2); // no traffic
        s.resize(12, 3, 4); // free + alloc
        s.resize(0, 0, 0); // free
        s.resize(8, 4, 2); // alloc
        drop(s); // free

        let mut r = HeapRowsStorage::<f32, 4, Unaligned, _>::with_dims_in(8, 2, 4, alloc.clone());
        r.resize(16, 4, 4); // free + alloc
        drop(r); // free

        let c = HeapColsStorage::<f32, 4, Unaligned, _>::with_dims_in(0, 4, 0, alloc.clone());
        drop(c); // null buffer: no traffic
    }

    assert_eq!(alloc.allocations(), alloc.deallocations());
    assert_eq!(alloc.allocated_bytes(), alloc.freed_bytes());
    assert_eq!(alloc.live(), 0);
    // Exactly the allocations annotated above.
    assert_eq!(alloc.allocations(), 5);
}

#[test]
fn heap_swap_keeps_accounting_balanced() {
    let alloc = CountingAllocator::new();

    // SAFETY: Every call keeps `len == rows * cols`.
    unsafe {
        let mut a = HeapStorage::<u64, Unaligned, _>::with_dims_in(4, 2, 2, alloc.clone());
        let mut b = HeapStorage::<u64, Unaligned, _>::with_dims_in(9, 3, 3, alloc.clone());
        a.swap(&mut b);
        // Each storage now frees the other's original buffer on drop.
        drop(a);
        drop(b);
    }

    assert_eq!(alloc.allocations(), 2);
    assert_eq!(alloc.deallocations(), 2);
    assert_eq!(alloc.allocated_bytes(), alloc.freed_bytes());
}

#[test]
fn one_fixed_dimension_heap_swap_is_an_involution() {
    let alloc = CountingAllocator::new();

    // SAFETY: Every call keeps `len == rows * C` (respectively `R * cols`).
    unsafe {
        let mut a = HeapRowsStorage::<u32, 3, Unaligned, _>::with_dims_in(6, 2, 3, alloc.clone());
        let mut b = HeapRowsStorage::<u32, 3, Unaligned, _>::with_dims_in(9, 3, 3, alloc.clone());
        let (pa, pb) = (a.as_ptr(), b.as_ptr());
        for i in 0..6 {
            a.as_mut_ptr().add(i).write(i as u32);
        }

        a.swap(&mut b);
        assert_eq!(a.as_ptr(), pb);
        assert_eq!(b.as_ptr(), pa);
        assert_eq!((a.rows(), b.rows()), (3, 2));
        for i in 0..6 {
            assert_eq!(b.as_ptr().add(i).read(), i as u32);
        }

        a.swap(&mut b);
        assert_eq!(a.as_ptr(), pa);
        assert_eq!((a.rows(), b.rows()), (2, 3));
        drop(a);
        drop(b);

        let mut c = HeapColsStorage::<u32, 2, Unaligned, _>::with_dims_in(4, 2, 2, alloc.clone());
        let mut d = HeapColsStorage::<u32, 2, Unaligned, _>::with_dims_in(8, 2, 4, alloc.clone());
        c.swap(&mut d);
        assert_eq!((c.cols(), d.cols()), (4, 2));
        c.swap(&mut d);
        assert_eq!((c.cols(), d.cols()), (2, 4));
        drop(c);
        drop(d);
    }

    // Swapped buffers change owners, not accounting: every buffer is still released
    // exactly once.
    assert_eq!(alloc.allocations(), 4);
    assert_eq!(alloc.deallocations(), 4);
    assert_eq!(alloc.allocated_bytes(), alloc.freed_bytes());
}

#[test]
fn one_fixed_dimension_heap_skip_check_construction() {
    // SAFETY: Every call keeps `len == rows * C` (respectively `R * cols`).
    unsafe {
        let r = HeapRowsStorage::<f32, 4>::with_dims_assume_aligned(8, 2, 4);
        assert_eq!((r.rows(), r.cols()), (2, 4));
        assert!(!r.as_ptr().is_null());

        let c = HeapColsStorage::<f32, 4>::with_dims_assume_aligned(8, 4, 2);
        assert_eq!((c.rows(), c.cols()), (4, 2));
        assert!(!c.as_ptr().is_null());
    }
}

#[test]
fn swap_is_an_involution_with_generated_contents() {
    let mut rng = StdRng::seed_from_u64(0x5ca1ab1e);
    let xs: Vec<f32> = (0..6).map(|_| rng.random()).collect();
    let ys: Vec<f32> = (0..4).map(|_| rng.random()).collect();

    // SAFETY: Both shapes fit the inline capacity of 8, writes stay within the
    // declared shapes, and reads only touch initialized elements.
    unsafe {
        let mut a = InlineStorage::<f32, 8>::with_dims(6, 2, 3);
        let mut b = InlineStorage::<f32, 8>::with_dims(4, 2, 2);
        for (i, &x) in xs.iter().enumerate() {
            a.as_mut_ptr().add(i).write(x);
        }
        for (i, &y) in ys.iter().enumerate() {
            b.as_mut_ptr().add(i).write(y);
        }

        a.swap(&mut b);
        a.swap(&mut b);

        assert_eq!((a.rows(), a.cols()), (2, 3));
        assert_eq!((b.rows(), b.cols()), (2, 2));
        for (i, &x) in xs.iter().enumerate() {
            assert_eq!(a.as_ptr().add(i).read(), x);
        }
        for (i, &y) in ys.iter().enumerate() {
            assert_eq!(b.as_ptr().add(i).read(), y);
        }
    }
}

#[test]
fn every_inline_variant_reports_exact_dims() {
    // SAFETY: All shapes are consistent with the const parameters and capacities.
    unsafe {
        let s = ArrayStorage::<f32, 4, 5, 20>::with_dims(20, 4, 5);
        assert_eq!((s.rows(), s.cols()), (4, 5));

        let s = InlineStorage::<f32, 20>::with_dims(20, 4, 5);
        assert_eq!((s.rows(), s.cols()), (4, 5));

        let s = NullStorage::<f32, 0, 5>::with_dims(0, 0, 5);
        assert_eq!((s.rows(), s.cols()), (0, 5));
        assert!(s.as_ptr().is_null());
    }
}

#[test]
fn aligned_pointers_across_the_inline_family() {
    fn aligned<T>(ptr: *const T) -> bool {
        ptr as usize % VECTOR_ALIGNMENT == 0
    }

    // SAFETY: All shapes are consistent with the const parameters and capacities.
    unsafe {
        let a = ArrayStorage::<f32, 2, 2, 4>::with_dims(4, 2, 2);
        assert!(aligned(a.as_ptr()));

        // Checked and skip-check construction give the same guarantee.
        let a = ArrayStorage::<f32, 2, 2, 4>::with_dims_assume_aligned(4, 2, 2);
        assert!(aligned(a.as_ptr()));

        let s = InlineStorage::<f64, 6>::with_dims(6, 2, 3);
        assert!(aligned(s.as_ptr()));

        let h = HeapStorage::<f32>::with_dims(7, 7, 1);
        assert!(aligned(h.as_ptr()));
    }
}
