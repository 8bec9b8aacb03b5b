//! Tracked allocator implementation
//!
//! Provides an allocator that counts every request passing through another
//! raw allocator. Wrapping [`SystemAllocator`](super::SystemAllocator) in it
//! gives an instrumented system allocator: pool refills, bypasses and leaks
//! all become observable as counter changes.
//!
//! ## Invariants
//!
//! - Every successful allocation is counted once
//! - Every deallocation is counted once
//! - Failed allocations don't affect memory counters (only failure count)

use core::alloc::Layout;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};

use super::{AllocResult, Allocator};

/// Snapshot of the counters kept by a [`TrackedAllocator`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocatorStats {
    /// Total bytes currently allocated
    pub allocated_bytes: usize,
    /// Peak bytes allocated
    pub peak_allocated_bytes: usize,
    /// Total number of allocations
    pub allocation_count: usize,
    /// Total number of deallocations
    pub deallocation_count: usize,
    /// Number of failed allocations
    pub failed_allocations: usize,
}

/// A wrapper allocator that tracks memory usage statistics
///
/// Acts as a transparent wrapper around any other raw allocator. Counters
/// are atomics, so a shared `&TrackedAllocator<_>` (itself an [`Allocator`])
/// can back any number of element allocators.
///
/// # Examples
/// ```rust
/// use poolkit_memory::allocator::{ElementAllocator, PoolAllocator, SystemAllocator, TrackedAllocator};
///
/// let system = TrackedAllocator::new(SystemAllocator::new());
/// let pool = PoolAllocator::<u64, 4, _>::with_backing(&system);
///
/// let block = pool.allocate(1)?;
/// assert_eq!(system.allocation_count(), 4); // one refill of four blocks
/// unsafe { pool.deallocate(block, 1) };
/// assert_eq!(system.deallocation_count(), 0); // pooled, not released
/// # Ok::<(), poolkit_memory::MemoryError>(())
/// ```
#[derive(Debug, Default)]
pub struct TrackedAllocator<A> {
    /// The underlying allocator
    inner: A,
    allocated_bytes: AtomicUsize,
    peak_allocated_bytes: AtomicUsize,
    allocation_count: AtomicUsize,
    deallocation_count: AtomicUsize,
    failed_allocations: AtomicUsize,
}

impl<A> TrackedAllocator<A> {
    /// Creates a new TrackedAllocator wrapping the provided allocator
    pub fn new(allocator: A) -> Self {
        Self {
            inner: allocator,
            allocated_bytes: AtomicUsize::new(0),
            peak_allocated_bytes: AtomicUsize::new(0),
            allocation_count: AtomicUsize::new(0),
            deallocation_count: AtomicUsize::new(0),
            failed_allocations: AtomicUsize::new(0),
        }
    }

    /// Returns the total bytes currently allocated
    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes.load(Ordering::Relaxed)
    }

    /// Returns the total number of allocations performed
    pub fn allocation_count(&self) -> usize {
        self.allocation_count.load(Ordering::Relaxed)
    }

    /// Returns the total number of deallocations performed
    pub fn deallocation_count(&self) -> usize {
        self.deallocation_count.load(Ordering::Relaxed)
    }

    /// Returns the number of failed allocations
    pub fn failed_allocations(&self) -> usize {
        self.failed_allocations.load(Ordering::Relaxed)
    }

    /// Get the number of potentially leaked allocations
    pub fn potential_leaks(&self) -> usize {
        self.allocation_count().saturating_sub(self.deallocation_count())
    }

    /// Get detailed statistics snapshot
    pub fn stats(&self) -> AllocatorStats {
        AllocatorStats {
            allocated_bytes: self.allocated_bytes(),
            peak_allocated_bytes: self.peak_allocated_bytes.load(Ordering::Relaxed),
            allocation_count: self.allocation_count(),
            deallocation_count: self.deallocation_count(),
            failed_allocations: self.failed_allocations(),
        }
    }

    fn record_allocation(&self, size: usize) {
        self.allocation_count.fetch_add(1, Ordering::Relaxed);
        let current = self.allocated_bytes.fetch_add(size, Ordering::Relaxed) + size;
        self.peak_allocated_bytes.fetch_max(current, Ordering::Relaxed);
    }

    fn record_deallocation(&self, size: usize) {
        self.deallocation_count.fetch_add(1, Ordering::Relaxed);
        self.allocated_bytes.fetch_sub(size, Ordering::Relaxed);
    }
}

// SAFETY: every call forwards to the inner allocator with the same contract;
// recording statistics has no effect on the memory handed out.
unsafe impl<A: Allocator> Allocator for TrackedAllocator<A> {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        // SAFETY: forwarded under the caller's contract
        match unsafe { self.inner.allocate(layout) } {
            Ok(ptr) => {
                self.record_allocation(layout.size());
                Ok(ptr)
            }
            Err(err) => {
                self.failed_allocations.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: ptr was allocated by self.inner with this layout
        unsafe { self.inner.deallocate(ptr, layout) };
        self.record_deallocation(layout.size());
    }

    fn max_allocation_size() -> usize {
        A::max_allocation_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::SystemAllocator;

    #[test]
    fn test_counts_allocations_and_bytes() {
        let tracked = TrackedAllocator::new(SystemAllocator::new());
        let layout = Layout::from_size_align(64, 8).unwrap();

        unsafe {
            let a = tracked.allocate(layout).unwrap();
            let b = tracked.allocate(layout).unwrap();
            assert_eq!(tracked.allocation_count(), 2);
            assert_eq!(tracked.allocated_bytes(), 128);

            tracked.deallocate(a.cast(), layout);
            assert_eq!(tracked.allocated_bytes(), 64);
            assert_eq!(tracked.potential_leaks(), 1);

            tracked.deallocate(b.cast(), layout);
        }

        let stats = tracked.stats();
        assert_eq!(stats.allocation_count, 2);
        assert_eq!(stats.deallocation_count, 2);
        assert_eq!(stats.peak_allocated_bytes, 128);
        assert_eq!(stats.allocated_bytes, 0);
    }

    #[test]
    fn test_failed_allocation_is_counted_separately() {
        let tracked = TrackedAllocator::new(SystemAllocator::new());
        let layout = Layout::from_size_align(isize::MAX as usize - 63, 64).unwrap();

        assert!(unsafe { tracked.allocate(layout) }.is_err());
        assert_eq!(tracked.failed_allocations(), 1);
        assert_eq!(tracked.allocation_count(), 0);
        assert_eq!(tracked.allocated_bytes(), 0);
    }

    #[test]
    fn test_shared_reference_is_an_allocator() {
        let tracked = TrackedAllocator::new(SystemAllocator::new());
        let by_ref = &tracked;
        let layout = Layout::new::<u32>();

        unsafe {
            let ptr = by_ref.allocate(layout).unwrap();
            by_ref.deallocate(ptr.cast(), layout);
        }
        assert_eq!(tracked.allocation_count(), 1);
        assert_eq!(tracked.deallocation_count(), 1);
    }
}
