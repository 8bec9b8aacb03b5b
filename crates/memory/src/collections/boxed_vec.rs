//! Sequence container that boxes every element through an element allocator
//!
//! # Safety
//!
//! - Every pointer in `elements` came from `alloc.allocate(1)` and holds an
//!   initialized `T`
//! - Each element is destroyed and deallocated exactly once, on drop

use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;
use std::io::{self, Write};

#[cfg(feature = "logging")]
use tracing::debug;

use crate::allocator::{ElementAllocator, HeapAllocator};
use crate::error::AllocResult;

/// Growable sequence whose elements each live in their own allocation
///
/// Pushing one element performs exactly one `allocate(1)` on the held
/// allocator, which makes the container a direct consumer of single-block
/// pooling. The pointer table itself is an ordinary `Vec`.
///
/// # Examples
/// ```rust
/// use poolkit_memory::collections::BoxedVec;
///
/// let mut names: BoxedVec<String> = BoxedVec::new();
/// names.push_back(&"a".to_owned())?;
/// names.emplace_back(|| "b".repeat(2))?;
///
/// assert_eq!(names.len(), 2);
/// assert_eq!(names.get(1).map(String::as_str), Some("bb"));
/// assert_eq!(names.to_string(), "a bb ");
/// # Ok::<(), poolkit_memory::MemoryError>(())
/// ```
pub struct BoxedVec<T, A = HeapAllocator<T>>
where
    A: ElementAllocator<Value = T>,
{
    elements: Vec<NonNull<T>>,
    alloc: A,
    _owns: PhantomData<T>,
}

impl<T, A> BoxedVec<T, A>
where
    A: ElementAllocator<Value = T> + Default,
{
    /// Creates an empty container with a default-constructed allocator
    pub fn new() -> Self {
        Self::new_in(A::default())
    }
}

impl<T, A> BoxedVec<T, A>
where
    A: ElementAllocator<Value = T>,
{
    /// Creates an empty container over the given allocator
    pub fn new_in(alloc: A) -> Self {
        Self {
            elements: Vec::new(),
            alloc,
            _owns: PhantomData,
        }
    }

    /// Appends a copy of `value`
    ///
    /// The copy is made before any memory is requested, so a panicking
    /// `clone` leaves the allocator untouched.
    ///
    /// # Errors
    /// Returns the allocator's error if the element block cannot be obtained.
    pub fn push_back(&mut self, value: &T) -> AllocResult<()>
    where
        T: Clone,
    {
        let value = value.clone();
        self.emplace_back(move || value)
    }

    /// Appends a value built in place by `init`
    ///
    /// `init` runs only after the element block has been obtained.
    ///
    /// # Errors
    /// Returns the allocator's error if the element block cannot be obtained.
    pub fn emplace_back<F>(&mut self, init: F) -> AllocResult<()>
    where
        F: FnOnce() -> T,
    {
        self.elements.reserve(1);
        let mut guard = SlotGuard {
            alloc: &self.alloc,
            slot: self.alloc.allocate(1)?,
            armed: true,
        };

        // SAFETY: slot is fresh storage for one T
        unsafe { guard.alloc.construct_with(guard.slot, init) };
        guard.armed = false;
        let slot = guard.slot;
        drop(guard);

        self.elements.push(slot);
        Ok(())
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the container holds no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element at `index`, in push order
    pub fn get(&self, index: usize) -> Option<&T> {
        // SAFETY: every stored pointer holds a live T owned by self
        self.elements.get(index).map(|ptr| unsafe { ptr.as_ref() })
    }

    /// Iterates over the elements in push order
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.elements.iter(),
            _marker: PhantomData,
        }
    }

    /// The allocator held by this container
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Writes every element followed by a space, then a newline
    ///
    /// # Errors
    /// Any error returned by `out`.
    pub fn write_to<W: Write>(&self, mut out: W) -> io::Result<()>
    where
        T: fmt::Display,
    {
        writeln!(out, "{self}")
    }

    /// Writes the contents to standard output, see [`write_to`](Self::write_to)
    ///
    /// # Errors
    /// Any error raised while writing to stdout.
    pub fn print(&self) -> io::Result<()>
    where
        T: fmt::Display,
    {
        self.write_to(io::stdout().lock())
    }
}

impl<T, A> Default for BoxedVec<T, A>
where
    A: ElementAllocator<Value = T> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A> Drop for BoxedVec<T, A>
where
    A: ElementAllocator<Value = T>,
{
    fn drop(&mut self) {
        #[cfg(feature = "logging")]
        if !self.elements.is_empty() {
            debug!(
                elements = self.elements.len(),
                element = core::any::type_name::<T>(),
                "releasing boxed elements"
            );
        }

        for slot in self.elements.drain(..) {
            // SAFETY: slot holds a live T from allocate(1); it is dropped
            // and released once, then forgotten
            unsafe {
                self.alloc.destroy(slot);
                self.alloc.deallocate(slot, 1);
            }
        }
    }
}

/// Returns an element block whose value was never constructed.
struct SlotGuard<'a, A: ElementAllocator> {
    alloc: &'a A,
    slot: NonNull<A::Value>,
    armed: bool,
}

impl<A: ElementAllocator> Drop for SlotGuard<'_, A> {
    fn drop(&mut self) {
        if self.armed {
            // SAFETY: slot came from allocate(1) and holds no value
            unsafe { self.alloc.deallocate(self.slot, 1) };
        }
    }
}

/// Renders each element followed by a single space.
impl<T, A> fmt::Display for BoxedVec<T, A>
where
    T: fmt::Display,
    A: ElementAllocator<Value = T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for value in self {
            write!(f, "{value} ")?;
        }
        Ok(())
    }
}

impl<T, A> fmt::Debug for BoxedVec<T, A>
where
    T: fmt::Debug,
    A: ElementAllocator<Value = T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, T, A> IntoIterator for &'a BoxedVec<T, A>
where
    A: ElementAllocator<Value = T>,
{
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Borrowing iterator over a [`BoxedVec`]
pub struct Iter<'a, T> {
    inner: core::slice::Iter<'a, NonNull<T>>,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        // SAFETY: the container outlives 'a and owns a live T behind each pointer
        self.inner.next().map(|ptr| unsafe { ptr.as_ref() })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        // SAFETY: as in next
        self.inner.next_back().map(|ptr| unsafe { ptr.as_ref() })
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
