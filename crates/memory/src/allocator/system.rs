//! System allocator implementation
//!
//! Provides an allocator that wraps the system's default memory allocator.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::NonNull;
use std::alloc::System;

use super::{AllocError, AllocResult, Allocator};

/// Wrapper for the system's default allocator
///
/// This allocator delegates all operations to [`std::alloc::System`] while
/// integrating with the crate's error type. Zero-sized layouts never reach
/// the system: they are served with a well-aligned dangling pointer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemAllocator;

impl SystemAllocator {
    /// Creates a new SystemAllocator
    ///
    /// This is a zero-cost operation as the SystemAllocator contains no state.
    #[inline]
    pub const fn new() -> Self {
        SystemAllocator
    }
}

unsafe impl Allocator for SystemAllocator {
    #[inline]
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        if layout.size() == 0 {
            // Dangling but aligned to the requested alignment
            let ptr = NonNull::<u8>::dangling().with_addr(
                core::num::NonZeroUsize::new(layout.align())
                    .ok_or_else(|| AllocError::invalid_layout("zero alignment"))?,
            );
            return Ok(NonNull::slice_from_raw_parts(ptr, 0));
        }

        // SAFETY: layout has non-zero size (checked above)
        let ptr = unsafe { System.alloc(layout) };

        match NonNull::new(ptr) {
            Some(non_null) => Ok(NonNull::slice_from_raw_parts(non_null, layout.size())),
            None => Err(AllocError::allocation_failed_with_layout(layout)),
        }
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() == 0 {
            return; // Nothing to deallocate for zero-sized allocations
        }

        // SAFETY: caller guarantees ptr came from allocate with this layout
        unsafe { System.dealloc(ptr.as_ptr(), layout) };
    }
}

#[cfg(test)]
mod tests {
    use core::alloc::Layout;

    use super::*;

    #[test]
    fn test_basic_allocation() {
        let allocator = SystemAllocator::new();
        let layout = Layout::new::<u64>();

        unsafe {
            let ptr = allocator.allocate(layout).unwrap();
            assert_eq!(ptr.len(), layout.size());
            assert_eq!(ptr.cast::<u8>().as_ptr() as usize % layout.align(), 0);

            ptr.cast::<u64>().as_ptr().write(42);
            assert_eq!(*ptr.cast::<u64>().as_ptr(), 42);

            allocator.deallocate(ptr.cast(), layout);
        }
    }

    #[test]
    fn test_zero_sized_allocation() {
        let allocator = SystemAllocator::new();
        let layout = Layout::from_size_align(0, 16).unwrap();

        unsafe {
            let ptr = allocator.allocate(layout).unwrap();
            assert_eq!(ptr.len(), 0);
            assert_eq!(ptr.cast::<u8>().as_ptr() as usize % 16, 0);
            // Should not crash
            allocator.deallocate(ptr.cast(), layout);
        }
    }

    #[test]
    fn test_huge_allocation_fails() {
        let allocator = SystemAllocator::new();
        let layout = Layout::from_size_align(isize::MAX as usize - 63, 64).unwrap();

        let result = unsafe { allocator.allocate(layout) };
        let err = result.unwrap_err();
        assert!(err.is_out_of_memory());
    }

    #[test]
    fn test_max_allocation_size() {
        let max_size = SystemAllocator::max_allocation_size();
        assert!(max_size > 0);
        assert!(max_size <= isize::MAX as usize);
    }

    #[test]
    fn test_thread_safety_markers() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<SystemAllocator>();
        assert_sync::<SystemAllocator>();
    }
}
