//! Allocator-aware containers
//!
//! Both containers are generic over an [`ElementAllocator`] and take every
//! piece of memory they use from it:
//! - [`BoxedVec`] boxes each element in its own single-element allocation
//! - [`OrderedMap`] rebinds its allocator to an internal node type
//!
//! [`ElementAllocator`]: crate::allocator::ElementAllocator

mod boxed_vec;
mod ordered_map;

pub use boxed_vec::{BoxedVec, Iter};
pub use ordered_map::{Iter as MapIter, OrderedMap};
