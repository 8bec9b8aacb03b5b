//! Allocator traits
//!
//! Two layers of allocation contract live here:
//! - [`Allocator`]: raw, layout-based allocation of untyped memory. This is
//!   the "system allocator" seam that typed allocators draw blocks from.
//! - [`ElementAllocator`]: the typed contract generic containers are written
//!   against. It allocates whole elements, constructs and destroys values in
//!   place, reports `max_size`, and can be rebound to another element type.
//!
//! # Safety
//!
//! Both traits are `unsafe` to implement:
//! - **Allocator**: returned pointers must be valid for `layout.size()` bytes,
//!   aligned to `layout.align()`, and not aliased by any other live block
//! - **ElementAllocator**: `allocate(n)` must return storage valid and aligned
//!   for `n` values of `Self::Value`, and `deallocate(ptr, n)` must accept
//!   exactly the pointers `allocate(n)` produced for the same `n`

use core::alloc::Layout;
use core::ptr::NonNull;

use super::{AllocError, AllocResult};

/// Largest element count whose total byte size fits in `usize`.
///
/// Zero-sized types never overflow, so their limit is `usize::MAX`.
#[inline]
#[must_use]
pub const fn max_elements<T>() -> usize {
    match size_of::<T>() {
        0 => usize::MAX,
        size => usize::MAX / size,
    }
}

/// Layout of `n` contiguous `T` no larger than `max_bytes`
///
/// Counts above [`max_elements`] fail with `SizeOverflow`; byte sizes above
/// `max_bytes` (the backing allocator's
/// [`max_allocation_size`](Allocator::max_allocation_size)) fail with
/// `ExceedsMaxSize`.
pub(crate) fn array_layout<T>(n: usize, max_bytes: usize) -> AllocResult<Layout> {
    if n > max_elements::<T>() {
        return Err(AllocError::size_overflow("element count * element size"));
    }
    let size = n * size_of::<T>();
    if size > max_bytes {
        return Err(AllocError::allocation_too_large(size, max_bytes));
    }
    Layout::array::<T>(n)
        .map_err(|_| AllocError::allocation_too_large(size, isize::MAX as usize))
}

/// Raw allocator trait
///
/// Provides untyped, layout-driven allocation. All methods are unsafe as they
/// deal with raw pointers and have specific safety requirements.
///
/// # Safety Requirements
///
/// Implementors must ensure that:
/// - Returned pointers are valid for reads and writes of `layout.size()` bytes
/// - Memory is properly aligned according to the layout
/// - Deallocation only occurs for previously allocated pointers
pub unsafe trait Allocator {
    /// Allocates memory with the given layout
    ///
    /// # Safety
    /// - Memory content is uninitialized and must be initialized before use
    ///
    /// # Errors
    /// - Returns [`MemoryError::AllocationFailed`](crate::MemoryError::AllocationFailed)
    ///   if the underlying allocator is exhausted
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>>;

    /// Deallocates memory at the given pointer with the specified layout
    ///
    /// # Safety
    /// - `ptr` must have been allocated by this allocator
    /// - `layout` must match the original allocation layout exactly
    /// - After this call, `ptr` becomes invalid and must not be used
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Returns maximum supported allocation size for this allocator
    fn max_allocation_size() -> usize {
        isize::MAX as usize
    }
}

/// Typed allocator contract consumed by generic containers
///
/// An element allocator is parameterized by the type it allocates
/// ([`Value`](Self::Value)) and can produce a same-configuration instance for
/// any other type through [`rebind`](Self::rebind). Containers that allocate
/// internal node types (rather than the user's element type) rebind the
/// allocator they were given.
///
/// Equality (`PartialEq`) means "freely substitutable": memory obtained from
/// one instance may be returned through any instance that compares equal.
///
/// # Examples
/// ```rust
/// use poolkit_memory::allocator::{ElementAllocator, PoolAllocator};
///
/// let alloc = PoolAllocator::<String, 4>::new();
/// let slot = alloc.allocate(1)?;
/// unsafe {
///     alloc.construct(slot, String::from("pooled"));
///     assert_eq!(slot.as_ref(), "pooled");
///     alloc.destroy(slot);
///     alloc.deallocate(slot, 1);
/// }
///
/// // Same block capacity, different element type
/// let bytes: PoolAllocator<u8, 4> = alloc.rebind();
/// assert!(alloc == bytes);
/// # Ok::<(), poolkit_memory::MemoryError>(())
/// ```
///
/// # Safety
/// Implementors must hand out storage valid and aligned for `n` values of
/// `Self::Value`, distinct from every other live allocation, and must accept
/// it back through `deallocate` with the same `n`.
pub unsafe trait ElementAllocator: Clone + PartialEq {
    /// Element type this allocator hands out storage for
    type Value;

    /// The same allocator configuration over a different element type
    type Rebind<U>: ElementAllocator<Value = U>;

    /// Allocates uninitialized storage for `n` contiguous values
    ///
    /// `n == 0` yields a dangling, well-aligned pointer.
    ///
    /// # Errors
    /// - `SizeOverflow` when `n` exceeds [`max_size`](Self::max_size)
    /// - `AllocationFailed` when the backing allocator is exhausted
    fn allocate(&self, n: usize) -> AllocResult<NonNull<Self::Value>>;

    /// Returns storage obtained from [`allocate`](Self::allocate)
    ///
    /// The memory is not scrubbed. Any value stored in it must already have
    /// been destroyed.
    ///
    /// # Safety
    /// - `ptr` must come from `allocate(n)` on this or an equal instance
    /// - `n` must be the count passed to that `allocate` call
    unsafe fn deallocate(&self, ptr: NonNull<Self::Value>, n: usize);

    /// Produces an allocator for `U` with the same configuration
    fn rebind<U>(&self) -> Self::Rebind<U>;

    /// Largest `n` for which `n * size_of::<Value>()` does not overflow
    fn max_size(&self) -> usize {
        max_elements::<Self::Value>()
    }

    /// Moves `value` into uninitialized storage at `ptr`
    ///
    /// # Safety
    /// `ptr` must be valid for writes and aligned for `U`. Any previous value
    /// at `ptr` is overwritten without being dropped.
    #[inline]
    unsafe fn construct<U>(&self, ptr: NonNull<U>, value: U) {
        // SAFETY: caller guarantees ptr is writable and aligned for U
        unsafe { ptr.as_ptr().write(value) }
    }

    /// Builds a value with `init` and places it at `ptr`
    ///
    /// Stands in for forwarding an arbitrary constructor argument list: the
    /// closure captures whatever arguments the constructor needs.
    ///
    /// # Safety
    /// Same requirements as [`construct`](Self::construct).
    #[inline]
    unsafe fn construct_with<U, F>(&self, ptr: NonNull<U>, init: F)
    where
        F: FnOnce() -> U,
    {
        // SAFETY: forwarded to construct under the same contract
        unsafe { self.construct(ptr, init()) }
    }

    /// Runs the destructor of the value at `ptr` without releasing memory
    ///
    /// # Safety
    /// `ptr` must point to an initialized `U` that is not used afterwards.
    #[inline]
    unsafe fn destroy<U>(&self, ptr: NonNull<U>) {
        // SAFETY: caller guarantees ptr holds a live U
        unsafe { core::ptr::drop_in_place(ptr.as_ptr()) }
    }
}

// ============================================================================
// Blanket implementations for references
// ============================================================================

/// Blanket implementation of Allocator for references
///
/// This allows a single counting or system allocator to back several element
/// allocators at once.
///
/// # Safety
///
/// Every call forwards to the underlying `T: Allocator`, so its contract is
/// preserved unchanged.
unsafe impl<T: Allocator + ?Sized> Allocator for &T {
    unsafe fn allocate(&self, layout: Layout) -> AllocResult<NonNull<[u8]>> {
        // SAFETY: same contract as T::allocate
        unsafe { (**self).allocate(layout) }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: same contract as T::deallocate
        unsafe { (**self).deallocate(ptr, layout) }
    }

    fn max_allocation_size() -> usize {
        T::max_allocation_size()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::allocator::HeapAllocator;

    struct DropCounter(Rc<Cell<usize>>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_max_elements() {
        assert_eq!(max_elements::<u8>(), usize::MAX);
        assert_eq!(max_elements::<u64>(), usize::MAX / 8);
        assert_eq!(max_elements::<()>(), usize::MAX);
        assert_eq!(max_elements::<[u8; 3]>(), usize::MAX / 3);
    }

    #[test]
    fn test_array_layout_limits() {
        assert_eq!(array_layout::<u32>(4, 16).unwrap(), Layout::new::<[u32; 4]>());
        assert_eq!(array_layout::<u32>(5, 16).unwrap_err().code(), "MEM:ALLOC:MAX");
        assert_eq!(
            array_layout::<u32>(usize::MAX, 16).unwrap_err().code(),
            "MEM:ALLOC:OVERFLOW"
        );
        assert_eq!(
            array_layout::<u8>(usize::MAX, usize::MAX).unwrap_err().code(),
            "MEM:ALLOC:MAX"
        );
    }

    #[test]
    fn test_construct_and_destroy_pair() {
        let drops = Rc::new(Cell::new(0));
        let alloc = HeapAllocator::<DropCounter>::new();

        let ptr = alloc.allocate(1).unwrap();
        unsafe {
            alloc.construct(ptr, DropCounter(Rc::clone(&drops)));
            assert_eq!(drops.get(), 0);
            alloc.destroy(ptr);
            assert_eq!(drops.get(), 1);
            alloc.deallocate(ptr, 1);
        }
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_construct_with_closure() {
        let alloc = HeapAllocator::<(u32, String)>::new();
        let ptr = alloc.allocate(1).unwrap();
        let (id, name) = (7, "seven");

        unsafe {
            alloc.construct_with(ptr, || (id, name.to_owned()));
            assert_eq!(ptr.as_ref(), &(7, "seven".to_owned()));
            alloc.destroy(ptr);
            alloc.deallocate(ptr, 1);
        }
    }

    #[test]
    fn test_construct_other_type_through_same_allocator() {
        // construct/destroy are generic over the target type, not tied to Value
        let alloc = HeapAllocator::<u64>::new();
        let raw = alloc.allocate(1).unwrap();
        let slot = raw.cast::<u32>();

        unsafe {
            alloc.construct(slot, 0xDEAD_BEEF_u32);
            assert_eq!(*slot.as_ptr(), 0xDEAD_BEEF);
            alloc.destroy(slot);
            alloc.deallocate(raw, 1);
        }
    }
}
