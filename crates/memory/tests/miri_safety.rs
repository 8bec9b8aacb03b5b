//! Miri safety tests for poolkit-memory allocators and containers
//!
//! These tests exercise every raw-pointer path under Miri.
//! Run with: cargo +nightly miri test -p poolkit-memory --test miri_safety
//!
//! Pools keep their free blocks until the process exits, so the pool cases
//! need `MIRIFLAGS=-Zmiri-ignore-leaks`. The heap-backed cases are leak-free.

#![cfg(miri)]

use std::cell::Cell;
use std::rc::Rc;

use poolkit_memory::prelude::*;

struct DropCounter(Rc<Cell<usize>>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

/// Insert at the root, to the left of it, then through the default path
#[test]
fn miri_map_insert_through_root_link() {
    let mut map: OrderedMap<u32, u64> = OrderedMap::new();
    assert_eq!(map.insert(1, 1).unwrap(), None);
    assert_eq!(map.insert(0, 0).unwrap(), None);
    *map.get_or_insert_default(5).unwrap() += 120;

    assert_eq!(map.get(&5), Some(&120));
    assert_eq!(map.insert(1, 2).unwrap(), Some(1));
    let entries: Vec<_> = map.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(entries, [(0, 0), (1, 2), (5, 120)]);
}

/// Every node is destroyed and released once on drop
#[test]
fn miri_map_drop_releases_nodes() {
    let drops = Rc::new(Cell::new(0));
    {
        let mut map: OrderedMap<i32, DropCounter> = OrderedMap::new();
        for key in [4, 2, 6, 1, 3, 5, 7] {
            map.insert(key, DropCounter(Rc::clone(&drops))).unwrap();
        }
        assert!(map.contains_key(&3));
        assert_eq!(map.iter().len(), 7);
    }
    assert_eq!(drops.get(), 7);
}

/// Pointer table reads and element drops
#[test]
fn miri_boxed_vec_push_and_drop() {
    let mut values: BoxedVec<String> = BoxedVec::new();
    for word in ["alpha", "beta", "gamma"] {
        values.push_back(&word.to_owned()).unwrap();
    }
    values.emplace_back(|| "delta".repeat(2)).unwrap();

    assert_eq!(values.get(3).map(String::as_str), Some("deltadelta"));
    assert_eq!(values.iter().rev().next().map(String::len), Some(10));
    assert_eq!(values.to_string(), "alpha beta gamma deltadelta ");
}

/// Pool reuse with writes through recycled blocks
#[test]
fn miri_pool_reuse() {
    let pool: PoolAllocator<[u8; 32], 4> = PoolAllocator::new();

    let first = pool.allocate(1).unwrap();
    // SAFETY: first is a live block of this pool until it is returned
    unsafe {
        first.as_ptr().write([0xFF; 32]);
        pool.deallocate(first, 1);
    }

    let second = pool.allocate(1).unwrap();
    assert_eq!(first, second);
    // SAFETY: second is the recycled block, written before it is read
    unsafe {
        second.as_ptr().write([0xAA; 32]);
        assert_eq!((*second.as_ptr())[31], 0xAA);
        pool.deallocate(second, 1);
    }

    let array = pool.allocate(3).unwrap();
    // SAFETY: array holds three elements from the backing allocator
    unsafe {
        array.as_ptr().add(2).write([1; 32]);
        pool.deallocate(array, 3);
    }
}

/// Containers over pools: map nodes through the rebound pool
#[test]
fn miri_pooled_containers() {
    let mut map: OrderedMap<u32, u64, PoolAllocator<(u32, u64), 3>> = OrderedMap::new();
    let mut values: BoxedVec<u32, PoolAllocator<u32, 3>> = BoxedVec::new();
    for key in [3, 1, 4, 0, 2] {
        map.insert(key, u64::from(key) * 10).unwrap();
        values.push_back(&key).unwrap();
    }

    assert_eq!(map.get(&4), Some(&40));
    assert_eq!(values.to_string(), "3 1 4 0 2 ");
}
