//! Ordered key-value map over an element allocator
//!
//! An unbalanced binary search tree. The allocator the map is given is typed
//! for `(K, V)` entries; nodes are allocated through its rebind to the
//! private node type.
//!
//! # Safety
//!
//! - Every non-empty link points to a node obtained from
//!   `node_alloc.allocate(1)` and holding an initialized `Node`
//! - Each node is reachable through exactly one link
//! - Nodes are destroyed and deallocated only on drop

use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ptr::NonNull;
use std::io::{self, Write};

#[cfg(feature = "logging")]
use tracing::debug;

use crate::allocator::{ElementAllocator, HeapAllocator};
use crate::error::AllocResult;

type Link<K, V> = Option<NonNull<Node<K, V>>>;

struct Node<K, V> {
    entry: (K, V),
    left: Link<K, V>,
    right: Link<K, V>,
}

/// Map with keys kept in ascending order
///
/// # Examples
/// ```rust
/// use poolkit_memory::allocator::PoolAllocator;
/// use poolkit_memory::collections::OrderedMap;
///
/// let mut scores: OrderedMap<&str, u32, PoolAllocator<(&str, u32), 4>> = OrderedMap::new();
/// scores.insert("carol", 7)?;
/// scores.insert("alice", 3)?;
/// *scores.get_or_insert_default("bob")? += 5;
///
/// assert_eq!(scores.insert("alice", 4)?, Some(3));
/// let keys: Vec<_> = scores.iter().map(|(name, _)| *name).collect();
/// assert_eq!(keys, ["alice", "bob", "carol"]);
/// # Ok::<(), poolkit_memory::MemoryError>(())
/// ```
pub struct OrderedMap<K, V, A = HeapAllocator<(K, V)>>
where
    A: ElementAllocator<Value = (K, V)>,
{
    root: Link<K, V>,
    len: usize,
    alloc: A,
    node_alloc: A::Rebind<Node<K, V>>,
    _owns: PhantomData<Node<K, V>>,
}

impl<K, V, A> OrderedMap<K, V, A>
where
    A: ElementAllocator<Value = (K, V)> + Default,
{
    /// Creates an empty map with a default-constructed allocator
    pub fn new() -> Self {
        Self::new_in(A::default())
    }
}

impl<K, V, A> OrderedMap<K, V, A>
where
    A: ElementAllocator<Value = (K, V)>,
{
    /// Creates an empty map over the given allocator
    pub fn new_in(alloc: A) -> Self {
        let node_alloc = alloc.rebind();
        Self {
            root: None,
            len: 0,
            alloc,
            node_alloc,
            _owns: PhantomData,
        }
    }

    /// Number of entries
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the map has no entries
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The allocator the map was created with
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Iterates over the entries in ascending key order
    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut iter = Iter {
            stack: Vec::new(),
            remaining: self.len,
            _marker: PhantomData,
        };
        iter.push_left_spine(self.root);
        iter
    }

    fn allocate_node(
        node_alloc: &A::Rebind<Node<K, V>>,
        entry: (K, V),
    ) -> AllocResult<NonNull<Node<K, V>>> {
        let node = node_alloc.allocate(1)?;
        // SAFETY: node is fresh storage for one Node
        unsafe {
            node_alloc.construct(
                node,
                Node {
                    entry,
                    left: None,
                    right: None,
                },
            );
        }
        Ok(node)
    }

    /// Writes one `key value` line per entry, ascending
    ///
    /// # Errors
    /// Any error returned by `out`.
    pub fn write_to<W: Write>(&self, mut out: W) -> io::Result<()>
    where
        K: fmt::Display,
        V: fmt::Display,
    {
        for (key, value) in self {
            writeln!(out, "{key} {value}")?;
        }
        Ok(())
    }
}

impl<K, V, A> OrderedMap<K, V, A>
where
    K: Ord,
    A: ElementAllocator<Value = (K, V)>,
{
    /// Inserts `value` under `key`
    ///
    /// An existing entry keeps its node and gets its value replaced; the old
    /// value is returned and nothing is allocated.
    ///
    /// # Errors
    /// Returns the allocator's error if a new node cannot be obtained.
    pub fn insert(&mut self, key: K, value: V) -> AllocResult<Option<V>> {
        let Self {
            root,
            len,
            node_alloc,
            ..
        } = self;

        match Self::locate(root, &key) {
            Ok(mut node) => {
                // SAFETY: located nodes are live and uniquely borrowed through self
                let entry = unsafe { &mut node.as_mut().entry };
                Ok(Some(mem::replace(&mut entry.1, value)))
            }
            Err(link) => {
                *link = Some(Self::allocate_node(node_alloc, (key, value))?);
                *len += 1;
                Ok(None)
            }
        }
    }

    /// Value under `key`, inserting `V::default()` first if it is absent
    ///
    /// # Errors
    /// Returns the allocator's error if a new node cannot be obtained.
    pub fn get_or_insert_default(&mut self, key: K) -> AllocResult<&mut V>
    where
        V: Default,
    {
        let Self {
            root,
            len,
            node_alloc,
            ..
        } = self;

        let mut node = match Self::locate(root, &key) {
            Ok(node) => node,
            Err(link) => {
                let node = Self::allocate_node(node_alloc, (key, V::default()))?;
                *link = Some(node);
                *len += 1;
                node
            }
        };
        // SAFETY: node is live and borrowed mutably for as long as self is
        Ok(unsafe { &mut node.as_mut().entry.1 })
    }

    /// Value under `key`
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut current = self.root;
        while let Some(node) = current {
            // SAFETY: linked nodes are live while self is borrowed
            let node = unsafe { node.as_ref() };
            current = match key.cmp(node.entry.0.borrow()) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(&node.entry.1),
            };
        }
        None
    }

    /// Whether an entry exists under `key`
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Finds the node holding `key`, or the empty link where it belongs
    fn locate<'a>(
        mut link: &'a mut Link<K, V>,
        key: &K,
    ) -> Result<NonNull<Node<K, V>>, &'a mut Link<K, V>> {
        while let Some(mut node) = *link {
            // SAFETY: linked nodes are live and exclusively reachable through link
            let current = unsafe { node.as_mut() };
            link = match key.cmp(&current.entry.0) {
                Ordering::Less => &mut current.left,
                Ordering::Greater => &mut current.right,
                Ordering::Equal => return Ok(node),
            };
        }
        Err(link)
    }
}

impl<K, V, A> Default for OrderedMap<K, V, A>
where
    A: ElementAllocator<Value = (K, V)> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, A> Drop for OrderedMap<K, V, A>
where
    A: ElementAllocator<Value = (K, V)>,
{
    fn drop(&mut self) {
        #[cfg(feature = "logging")]
        if self.len > 0 {
            debug!(entries = self.len, "releasing map nodes");
        }

        let mut pending: Vec<NonNull<Node<K, V>>> = self.root.take().into_iter().collect();
        while let Some(node) = pending.pop() {
            // SAFETY: each node is reachable once, so it is visited once; its
            // children are read before it is destroyed
            unsafe {
                let current = node.as_ref();
                pending.extend(current.left);
                pending.extend(current.right);
                self.node_alloc.destroy(node);
                self.node_alloc.deallocate(node, 1);
            }
        }
        self.len = 0;
    }
}

impl<K, V, A> fmt::Debug for OrderedMap<K, V, A>
where
    K: fmt::Debug,
    V: fmt::Debug,
    A: ElementAllocator<Value = (K, V)>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V, A> IntoIterator for &'a OrderedMap<K, V, A>
where
    A: ElementAllocator<Value = (K, V)>,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// In-order iterator over an [`OrderedMap`]
pub struct Iter<'a, K, V> {
    stack: Vec<NonNull<Node<K, V>>>,
    remaining: usize,
    _marker: PhantomData<&'a (K, V)>,
}

impl<K, V> Iter<'_, K, V> {
    fn push_left_spine(&mut self, mut link: Link<K, V>) {
        while let Some(node) = link {
            self.stack.push(node);
            // SAFETY: the map outlives the iterator and keeps its nodes live
            link = unsafe { node.as_ref().left };
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // SAFETY: the map is borrowed for 'a and its nodes do not move
        let node = unsafe { &*node.as_ptr() };
        self.push_left_spine(node.right);
        self.remaining -= 1;
        Some((&node.entry.0, &node.entry.1))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::allocator::{PoolAllocator, SystemAllocator, TrackedAllocator};

    struct DropCounter(Rc<Cell<usize>>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_iterates_in_ascending_order() {
        let mut map: OrderedMap<i32, char> = OrderedMap::new();
        for (key, value) in [(5, 'e'), (1, 'a'), (9, 'i'), (3, 'c'), (7, 'g')] {
            assert_eq!(map.insert(key, value).unwrap(), None);
        }

        let keys: Vec<_> = map.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, [1, 3, 5, 7, 9]);
        assert_eq!(map.len(), 5);
        assert_eq!(map.iter().len(), 5);
    }

    #[test]
    fn test_lookup() {
        let mut map: OrderedMap<String, u32> = OrderedMap::new();
        map.insert("b".to_owned(), 2).unwrap();
        map.insert("a".to_owned(), 1).unwrap();

        assert_eq!(map.get("a"), Some(&1));
        assert_eq!(map.get("c"), None);
        assert!(map.contains_key("b"));
        assert!(!map.contains_key("z"));
    }

    #[test]
    fn test_reinsert_replaces_without_allocating() {
        let system = TrackedAllocator::new(SystemAllocator::new());
        let mut map = OrderedMap::new_in(HeapAllocator::<(u32, u64), _>::with_backing(&system));

        map.insert(4, 10).unwrap();
        map.insert(2, 20).unwrap();
        assert_eq!(system.allocation_count(), 2);

        assert_eq!(map.insert(4, 11).unwrap(), Some(10));
        assert_eq!(system.allocation_count(), 2);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&4), Some(&11));
    }

    #[test]
    fn test_get_or_insert_default() {
        let mut map: OrderedMap<u8, Vec<u8>> = OrderedMap::new();
        map.get_or_insert_default(1).unwrap().push(10);
        map.get_or_insert_default(1).unwrap().push(11);
        map.get_or_insert_default(0).unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&1), Some(&vec![10, 11]));
        assert_eq!(map.get(&0), Some(&Vec::new()));
    }

    #[test]
    fn test_links_below_root_after_root_insert() {
        let mut map: OrderedMap<u32, u64> = OrderedMap::new();
        map.insert(1, 1).unwrap();
        map.insert(0, 0).unwrap();
        *map.get_or_insert_default(5).unwrap() += 5;
        map.insert(3, 3).unwrap();

        let entries: Vec<_> = map.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(entries, [(0, 0), (1, 1), (3, 3), (5, 5)]);
        assert_eq!(map.len(), 4);
        assert_eq!(map.insert(1, 2).unwrap(), Some(1));
    }

    #[test]
    fn test_drop_releases_every_node() {
        let system = TrackedAllocator::new(SystemAllocator::new());
        let drops = Rc::new(Cell::new(0));
        {
            let mut map =
                OrderedMap::new_in(HeapAllocator::<(u32, DropCounter), _>::with_backing(&system));
            for key in [8, 3, 10, 1, 6, 14, 4, 7, 13] {
                map.insert(key, DropCounter(Rc::clone(&drops))).unwrap();
            }
            // Replaced value is dropped by the caller
            drop(map.insert(6, DropCounter(Rc::clone(&drops))).unwrap());
            assert_eq!(drops.get(), 1);
        }
        assert_eq!(drops.get(), 10);
        assert_eq!(system.allocation_count(), 9);
        assert_eq!(system.potential_leaks(), 0);
    }

    #[test]
    fn test_nodes_come_from_rebound_pool() {
        let system = TrackedAllocator::new(SystemAllocator::new());
        let mut map = OrderedMap::new_in(PoolAllocator::<(u32, u64), 10, _>::with_backing(&system));

        for key in 0..11 {
            map.insert(key, u64::from(key)).unwrap();
        }
        // The entry-typed pool itself never refills; its node rebind does
        assert_eq!(map.allocator().refill_count(), 0);
        assert_eq!(system.allocation_count(), 20);
        assert_eq!(
            system.allocated_bytes(),
            20 * size_of::<Node<u32, u64>>()
        );
    }

    #[test]
    fn test_write_to() {
        let mut map: OrderedMap<u32, u64> = OrderedMap::new();
        map.insert(2, 2).unwrap();
        map.insert(0, 1).unwrap();
        map.insert(1, 1).unwrap();

        let mut out = Vec::new();
        map.write_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0 1\n1 1\n2 2\n");
        assert_eq!(format!("{map:?}"), "{0: 1, 1: 1, 2: 2}");
    }

    #[test]
    fn test_empty_map() {
        let map: OrderedMap<u32, u32> = OrderedMap::default();
        assert!(map.is_empty());
        assert_eq!(map.iter().next(), None);
    }
}
