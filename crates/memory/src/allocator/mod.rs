//! Allocators for memory management
//!
//! Raw allocators hand out layout-sized memory; element allocators build the
//! typed, rebindable contract generic containers consume on top of them.

// Core allocator types
mod heap;
mod system;
mod tracked;
mod traits;

// Allocator implementations
pub mod pool;

// Re-exports for convenience
pub use heap::HeapAllocator;
pub use pool::{DEFAULT_BLOCK_SIZE, PoolAllocator};

pub use crate::error::{AllocError, AllocResult};
pub use system::SystemAllocator;
pub use tracked::{AllocatorStats, TrackedAllocator};
pub use traits::{Allocator, ElementAllocator, max_elements};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_accessible() {
        let pool = PoolAllocator::<u64>::new();
        assert_eq!(pool.block_size(), DEFAULT_BLOCK_SIZE);
        assert_eq!(HeapAllocator::<u64>::new(), HeapAllocator::<u64>::new());
    }
}
