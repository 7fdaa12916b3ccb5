//! Positions into a [`TwoThreeSet`] and the iterators built on them.
//!
//! A [`Cursor`] names a leaf, or the end position. It walks the tree through
//! parent links: to step forward it climbs until it is not the rightmost
//! child, moves to the next sibling and descends to that sibling's leftmost
//! leaf. Stepping back mirrors this. Cursors borrow the set, so no insert or
//! erase can run while one is alive.

use std::fmt;
use std::iter::FusedIterator;

use crate::node::NodeId;
use crate::set::TwoThreeSet;

/// A bidirectional position in a [`TwoThreeSet`].
///
/// The end cursor of a non-empty set still remembers the largest leaf, so
/// [`move_prev`](Self::move_prev) from end lands on the last value. Stepping
/// forward from end and backward from the first value leave the cursor where
/// it is.
pub struct Cursor<'a, T> {
    set: &'a TwoThreeSet<T>,
    leaf: Option<NodeId>,
    at_end: bool,
}

impl<'a, T> Cursor<'a, T> {
    pub(crate) fn new(set: &'a TwoThreeSet<T>, leaf: Option<NodeId>, at_end: bool) -> Self {
        Self { set, leaf, at_end }
    }

    /// Value under the cursor; `None` at end.
    #[inline]
    pub fn get(&self) -> Option<&'a T> {
        if self.at_end {
            return None;
        }
        self.leaf.map(|leaf| self.set.nodes.leaf_value(leaf))
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        self.at_end
    }

    pub fn move_next(&mut self) {
        if self.at_end {
            return;
        }
        let Some(leaf) = self.leaf else {
            return;
        };
        match self.set.nodes.successor(leaf) {
            Some(next) => self.leaf = Some(next),
            None => self.at_end = true,
        }
    }

    pub fn move_prev(&mut self) {
        let Some(leaf) = self.leaf else {
            return;
        };
        if self.at_end {
            self.at_end = false;
            return;
        }
        if let Some(prev) = self.set.nodes.predecessor(leaf) {
            self.leaf = Some(prev);
        }
    }

    /// The position after this one.
    #[must_use]
    pub fn next_position(mut self) -> Self {
        self.move_next();
        self
    }

    /// The position before this one.
    #[must_use]
    pub fn prev_position(mut self) -> Self {
        self.move_prev();
        self
    }
}

impl<T> Clone for Cursor<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Cursor<'_, T> {}

impl<T> PartialEq for Cursor<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.set, other.set) && self.leaf == other.leaf && self.at_end == other.at_end
    }
}

impl<T> Eq for Cursor<'_, T> {}

impl<T: fmt::Debug> fmt::Debug for Cursor<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.at_end {
            f.write_str("Cursor(end)")
        } else {
            f.debug_tuple("Cursor").field(&self.get()).finish()
        }
    }
}

/// Ascending iterator over `&T`, double-ended.
pub struct Iter<'a, T> {
    front: Cursor<'a, T>,
    back: Cursor<'a, T>,
    remaining: usize,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(front: Cursor<'a, T>, back: Cursor<'a, T>, remaining: usize) -> Self {
        Self {
            front,
            back,
            remaining,
        }
    }
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.front.get()?;
        self.front.move_next();
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        self.back.move_prev();
        self.remaining -= 1;
        self.back.get()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

/// Owning ascending iterator, from [`TwoThreeSet::into_iter`].
pub struct IntoIter<T> {
    inner: std::vec::IntoIter<T>,
}

impl<T> IntoIter<T> {
    pub(crate) fn new(values: Vec<T>) -> Self {
        Self {
            inner: values.into_iter(),
        }
    }
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> DoubleEndedIterator for IntoIter<T> {
    fn next_back(&mut self) -> Option<T> {
        self.inner.next_back()
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T> FusedIterator for IntoIter<T> {}
