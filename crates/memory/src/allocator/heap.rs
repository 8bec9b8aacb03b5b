//! Default (non-pooling) element allocator

use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;

use super::traits::array_layout;
use super::{AllocResult, Allocator, ElementAllocator, SystemAllocator};

/// Element allocator that sends every request straight to a raw allocator
///
/// This is what containers use when no allocator is supplied. `allocate(n)`
/// asks the backing allocator for one contiguous array of `n` values and
/// `deallocate` hands it back; nothing is cached.
pub struct HeapAllocator<T, A = SystemAllocator> {
    backing: A,
    _marker: PhantomData<fn() -> T>,
}

impl<T> HeapAllocator<T> {
    /// Creates a heap allocator over the system allocator
    #[inline]
    pub const fn new() -> Self {
        Self::with_backing(SystemAllocator::new())
    }
}

impl<T, A> HeapAllocator<T, A> {
    /// Creates a heap allocator over the given raw allocator
    #[inline]
    pub const fn with_backing(backing: A) -> Self {
        Self {
            backing,
            _marker: PhantomData,
        }
    }

    /// The raw allocator requests are forwarded to
    pub fn backing(&self) -> &A {
        &self.backing
    }
}

impl<T, A: Default> Default for HeapAllocator<T, A> {
    fn default() -> Self {
        Self::with_backing(A::default())
    }
}

impl<T, A: Clone> Clone for HeapAllocator<T, A> {
    fn clone(&self) -> Self {
        Self::with_backing(self.backing.clone())
    }
}

impl<T, A: fmt::Debug> fmt::Debug for HeapAllocator<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapAllocator")
            .field("value", &core::any::type_name::<T>())
            .field("backing", &self.backing)
            .finish()
    }
}

/// Heap allocators never cache memory, so any two are interchangeable.
impl<T, U, A> PartialEq<HeapAllocator<U, A>> for HeapAllocator<T, A> {
    fn eq(&self, _other: &HeapAllocator<U, A>) -> bool {
        true
    }
}

impl<T, A> Eq for HeapAllocator<T, A> {}

// SAFETY: storage comes from a single backing allocation of
// `Layout::array::<T>(n)` and is returned with the same layout.
unsafe impl<T, A> ElementAllocator for HeapAllocator<T, A>
where
    A: Allocator + Clone,
{
    type Value = T;
    type Rebind<U> = HeapAllocator<U, A>;

    fn allocate(&self, n: usize) -> AllocResult<NonNull<T>> {
        if n == 0 {
            return Ok(NonNull::dangling());
        }

        let layout = array_layout::<T>(n, A::max_allocation_size())?;
        // SAFETY: layout is valid for n values of T
        let block = unsafe { self.backing.allocate(layout)? };
        Ok(block.cast())
    }

    unsafe fn deallocate(&self, ptr: NonNull<T>, n: usize) {
        if n == 0 {
            return;
        }

        // allocate(n) succeeded with this layout, so it is reconstructible
        if let Ok(layout) = array_layout::<T>(n, A::max_allocation_size()) {
            // SAFETY: ptr came from allocate(n), i.e. from backing with layout
            unsafe { self.backing.deallocate(ptr.cast(), layout) };
        }
    }

    fn rebind<U>(&self) -> HeapAllocator<U, A> {
        HeapAllocator::with_backing(self.backing.clone())
    }
}
