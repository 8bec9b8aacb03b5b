//! Fixed-block pooling allocator
//!
//! Single-element blocks are recycled through a LIFO free list instead of
//! going back to the backing allocator on every deallocation.
//!
//! ## Invariants
//!
//! - Every address in the free list points to a block of exactly
//!   `Layout::new::<T>()`, obtained from the backing allocator on its own
//! - Only single-element requests are pooled; anything larger is a direct
//!   backing allocation that never touches the free list
//! - The free list only grows in batches of `BLOCK_SIZE` ("refills")
//! - Free blocks are never returned to the backing allocator while the pool
//!   lives, and are leaked when it is dropped

use core::alloc::Layout;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::ptr::NonNull;

#[cfg(feature = "logging")]
use tracing::trace;

use super::traits::array_layout;
use super::{AllocError, AllocResult, Allocator, ElementAllocator, SystemAllocator};

/// Block capacity used when none is given
pub const DEFAULT_BLOCK_SIZE: usize = 10;

/// Pooling allocator for fixed-size blocks of `T`
///
/// `BLOCK_SIZE` is both the refill batch size and the block capacity of the
/// allocator. A single-element request pops a block off the free list,
/// refilling it with `BLOCK_SIZE` fresh blocks first if it is empty. Each
/// block is its own backing allocation, so each can be recycled on its own.
/// Requests for more than one element go straight to the backing allocator.
///
/// # Memory lifetime
///
/// Blocks handed back through `deallocate` are kept for reuse and are never
/// released to the backing allocator. Dropping the pool leaks every block on
/// its free list. Blocks still held by a container at that point must be
/// deallocated through an equal instance (or leak with it).
///
/// # Equality and cloning
///
/// Any two pools with the same `BLOCK_SIZE` and backing type compare equal
/// regardless of element type. A clone starts with an empty free list of its
/// own, so a block can only ever sit on one free list.
///
/// Pools with different block capacities are distinct types and cannot be
/// compared at all:
///
/// ```rust,compile_fail
/// use poolkit_memory::allocator::PoolAllocator;
///
/// let small: PoolAllocator<u8, 4> = PoolAllocator::new();
/// let large: PoolAllocator<u8, 5> = PoolAllocator::new();
/// let _ = small == large;
/// ```
///
/// # Thread Safety
///
/// Not thread-safe: the free list lives in a `RefCell`, so the pool is
/// `!Sync`. Use one pool per thread.
///
/// # Examples
/// ```rust
/// use poolkit_memory::allocator::{ElementAllocator, PoolAllocator};
///
/// let pool: PoolAllocator<u64, 4> = PoolAllocator::new();
/// let a = pool.allocate(1)?;
/// assert_eq!(pool.free_blocks(), 3);
///
/// unsafe { pool.deallocate(a, 1) };
/// let b = pool.allocate(1)?;
/// assert_eq!(a, b); // LIFO reuse
/// # unsafe { pool.deallocate(b, 1) };
/// # Ok::<(), poolkit_memory::MemoryError>(())
/// ```
pub struct PoolAllocator<T, const BLOCK_SIZE: usize = DEFAULT_BLOCK_SIZE, A = SystemAllocator> {
    /// Currently unused blocks, most recently freed last
    free_list: RefCell<Vec<NonNull<T>>>,

    /// Number of refills performed so far
    refills: Cell<usize>,

    /// Raw allocator blocks and oversized requests come from
    backing: A,
}

impl<T, const BLOCK_SIZE: usize> PoolAllocator<T, BLOCK_SIZE> {
    /// Creates an empty pool over the system allocator
    #[inline]
    pub const fn new() -> Self {
        Self::with_backing(SystemAllocator::new())
    }
}

impl<T, const BLOCK_SIZE: usize, A> PoolAllocator<T, BLOCK_SIZE, A> {
    /// Creates an empty pool drawing blocks from `backing`
    #[inline]
    pub const fn with_backing(backing: A) -> Self {
        Self {
            free_list: RefCell::new(Vec::new()),
            refills: Cell::new(0),
            backing,
        }
    }

    /// Block capacity (and refill batch size)
    #[inline]
    pub const fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    /// Number of blocks currently waiting on the free list
    pub fn free_blocks(&self) -> usize {
        self.free_list.borrow().len()
    }

    /// Number of times the free list has been refilled
    pub fn refill_count(&self) -> usize {
        self.refills.get()
    }

    /// The raw allocator blocks are drawn from
    pub fn backing(&self) -> &A {
        &self.backing
    }

    /// Whether a request for `n` elements is served from the free list
    #[inline]
    const fn is_pooled(n: usize) -> bool {
        n == 1 && BLOCK_SIZE >= 1
    }
}

impl<T, const BLOCK_SIZE: usize, A: Allocator> PoolAllocator<T, BLOCK_SIZE, A> {
    /// Refills the free list with `BLOCK_SIZE` individually allocated blocks
    ///
    /// Blocks obtained before a backing failure stay on the free list.
    fn expand(&self) -> AllocResult<()> {
        let layout = Layout::new::<T>();
        let mut free_list = self.free_list.borrow_mut();
        free_list.reserve(BLOCK_SIZE);

        for _ in 0..BLOCK_SIZE {
            // SAFETY: layout describes one T
            let block = unsafe { self.backing.allocate(layout)? };
            free_list.push(block.cast());
        }

        self.refills.set(self.refills.get() + 1);

        #[cfg(feature = "logging")]
        trace!(
            element = core::any::type_name::<T>(),
            block_size = BLOCK_SIZE,
            refills = self.refills.get(),
            "pool free list refilled"
        );

        Ok(())
    }
}

impl<T, const BLOCK_SIZE: usize, A: Default> Default for PoolAllocator<T, BLOCK_SIZE, A> {
    fn default() -> Self {
        Self::with_backing(A::default())
    }
}

/// A clone shares configuration, not blocks: its free list starts empty.
impl<T, const BLOCK_SIZE: usize, A: Clone> Clone for PoolAllocator<T, BLOCK_SIZE, A> {
    fn clone(&self) -> Self {
        Self::with_backing(self.backing.clone())
    }
}

impl<T, const BLOCK_SIZE: usize, A: fmt::Debug> fmt::Debug for PoolAllocator<T, BLOCK_SIZE, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolAllocator")
            .field("value", &core::any::type_name::<T>())
            .field("block_size", &BLOCK_SIZE)
            .field("free_blocks", &self.free_blocks())
            .field("refills", &self.refills.get())
            .field("backing", &self.backing)
            .finish()
    }
}

/// Pools of the same block capacity are interchangeable for any element type.
impl<T, U, const BLOCK_SIZE: usize, A> PartialEq<PoolAllocator<U, BLOCK_SIZE, A>>
    for PoolAllocator<T, BLOCK_SIZE, A>
{
    fn eq(&self, _other: &PoolAllocator<U, BLOCK_SIZE, A>) -> bool {
        true
    }
}

impl<T, const BLOCK_SIZE: usize, A> Eq for PoolAllocator<T, BLOCK_SIZE, A> {}

// SAFETY: free blocks are uninitialized memory owned exclusively by this
// pool; no value of T is ever stored by the pool itself. Moving the pool to
// another thread moves that ownership with it.
unsafe impl<T: Send, const BLOCK_SIZE: usize, A: Send> Send for PoolAllocator<T, BLOCK_SIZE, A> {}

impl<T, const BLOCK_SIZE: usize, A> Drop for PoolAllocator<T, BLOCK_SIZE, A> {
    fn drop(&mut self) {
        #[cfg(feature = "logging")]
        {
            let leaked = self.free_list.get_mut().len();
            if leaked > 0 {
                trace!(
                    element = core::any::type_name::<T>(),
                    leaked,
                    "pool dropped with free blocks still held"
                );
            }
        }
    }
}

// SAFETY: pooled blocks are single `Layout::new::<T>()` allocations handed
// out at most once until returned; oversized requests are plain backing
// allocations of `Layout::array::<T>(n)` returned with the same layout.
unsafe impl<T, const BLOCK_SIZE: usize, A> ElementAllocator for PoolAllocator<T, BLOCK_SIZE, A>
where
    A: Allocator + Clone,
{
    type Value = T;
    type Rebind<U> = PoolAllocator<U, BLOCK_SIZE, A>;

    fn allocate(&self, n: usize) -> AllocResult<NonNull<T>> {
        if n == 0 {
            return Ok(NonNull::dangling());
        }

        if !Self::is_pooled(n) {
            #[cfg(feature = "logging")]
            trace!(n, block_size = BLOCK_SIZE, "request bypasses pool");

            let layout = array_layout::<T>(n, A::max_allocation_size())?;
            // SAFETY: layout is valid for n values of T
            let block = unsafe { self.backing.allocate(layout)? };
            return Ok(block.cast());
        }

        if self.free_list.borrow().is_empty() {
            self.expand()?;
        }

        self.free_list
            .borrow_mut()
            .pop()
            .ok_or_else(|| AllocError::allocation_failed_with_layout(Layout::new::<T>()))
    }

    unsafe fn deallocate(&self, ptr: NonNull<T>, n: usize) {
        if n == 0 {
            return;
        }

        if Self::is_pooled(n) {
            self.free_list.borrow_mut().push(ptr);
            return;
        }

        if let Ok(layout) = array_layout::<T>(n, A::max_allocation_size()) {
            // SAFETY: ptr came from a bypassing allocate(n) with this layout
            unsafe { self.backing.deallocate(ptr.cast(), layout) };
        }
    }

    fn rebind<U>(&self) -> PoolAllocator<U, BLOCK_SIZE, A> {
        PoolAllocator::with_backing(self.backing.clone())
    }
}
