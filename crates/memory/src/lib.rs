//! # poolkit-memory
//!
//! A fixed-block pooling allocator and the allocator-aware containers that
//! consume it.
//!
//! The crate is built in two layers:
//! - Raw allocators ([`allocator::Allocator`]) hand out untyped, layout-sized
//!   memory. [`allocator::SystemAllocator`] wraps the platform allocator and
//!   [`allocator::TrackedAllocator`] counts what passes through another one.
//! - Element allocators ([`allocator::ElementAllocator`]) are the contract
//!   generic containers are written against: typed `allocate(n)` /
//!   `deallocate(ptr, n)`, in-place construct/destroy, `max_size`, rebind to a
//!   different element type, and equality.
//!
//! [`allocator::PoolAllocator`] recycles single-element blocks through a free
//! list that grows in batches of `BLOCK_SIZE`; [`allocator::HeapAllocator`] is
//! the plain non-pooling default.
//!
//! ## Quick Start
//!
//! ```rust
//! use poolkit_memory::prelude::*;
//!
//! let mut values: BoxedVec<u32, PoolAllocator<u32, 10>> = BoxedVec::new();
//! for i in 0..10 {
//!     values.push_back(&i)?;
//! }
//! assert_eq!(values.to_string(), "0 1 2 3 4 5 6 7 8 9 ");
//!
//! let mut map: OrderedMap<u32, u64, PoolAllocator<(u32, u64), 10>> = OrderedMap::new();
//! map.insert(3, 6)?;
//! map.insert(1, 1)?;
//! assert_eq!(map.iter().map(|(k, _)| *k).collect::<Vec<_>>(), [1, 3]);
//! # Ok::<(), poolkit_memory::MemoryError>(())
//! ```
//!
//! ## Features
//!
//! - `logging` (default): emit `tracing` events for pool refills, bypasses and
//!   allocation failures

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(unsafe_code)]
#![warn(rust_2018_idioms)]
// Pointer casts between block and element types are checked per-site
#![allow(clippy::cast_ptr_alignment)]

// Error types
pub mod error;

// Core modules
pub mod allocator;
pub mod collections;

// Re-export core types for convenience
pub use crate::error::{AllocError, AllocResult, MemoryError, MemoryResult};

// Public API exports
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::error::{AllocError, AllocResult, MemoryError, MemoryResult};

    pub use crate::allocator::{
        Allocator, DEFAULT_BLOCK_SIZE, ElementAllocator, HeapAllocator, PoolAllocator,
        SystemAllocator, TrackedAllocator,
    };

    pub use crate::collections::{BoxedVec, OrderedMap};
}
