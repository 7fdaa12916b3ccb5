use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;

use smallvec::SmallVec;
use tracing::trace;

use crate::cursor::{Cursor, IntoIter, Iter};
use crate::node::{Node, NodeArena, NodeId, NodeKind, NODE_INLINE};

/// An ordered set of unique values stored in a 2-3 tree.
///
/// Every value sits in its own leaf, all leaves are at the same depth, and
/// each internal node has 2 or 3 children. Internal nodes carry one routing
/// key per child naming that child's maximum value, which is what search
/// descends on.
///
/// `T: Ord` must be a total order. A comparison that is not (NaN-like values,
/// an `Ord` impl that changes while values are in the set) leaves the tree in
/// an unspecified but memory-safe state.
pub struct TwoThreeSet<T> {
    pub(crate) nodes: NodeArena<T>,
    pub(crate) root: Option<NodeId>,
    pub(crate) len: usize,
}

impl<T> TwoThreeSet<T> {
    pub fn new() -> Self {
        Self {
            nodes: NodeArena::new(),
            root: None,
            len: 0,
        }
    }

    /// Creates an empty set whose node arena can hold `values` elements
    /// without reallocating.
    pub fn with_capacity(values: usize) -> Self {
        // n leaves need at most n - 1 internal nodes.
        Self {
            nodes: NodeArena::with_capacity(values.saturating_mul(2)),
            root: None,
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of levels, counting the leaf level. Zero for an empty set.
    pub fn height(&self) -> usize {
        let Some(mut current) = self.root else {
            return 0;
        };
        let mut height = 1;
        while let Some(&first) = self.nodes[current]
            .as_internal()
            .and_then(|n| n.children.first())
        {
            current = first;
            height += 1;
        }
        height
    }

    /// Bytes reserved by the node arena.
    pub fn memory_usage(&self) -> usize {
        self.nodes.capacity_bytes()
    }

    pub fn shrink_to_fit(&mut self) {
        self.nodes.shrink_to_fit();
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.len = 0;
    }

    /// Cursor at the smallest value, or the end cursor when empty.
    pub fn begin(&self) -> Cursor<'_, T> {
        let leaf = self.root.map(|root| self.nodes.leftmost_leaf(root));
        Cursor::new(self, leaf, leaf.is_none())
    }

    /// Cursor one past the largest value.
    ///
    /// It remembers the largest leaf, so stepping back from it lands on the
    /// last value directly.
    pub fn end(&self) -> Cursor<'_, T> {
        let leaf = self.root.map(|root| self.nodes.rightmost_leaf(root));
        Cursor::new(self, leaf, true)
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.begin(), self.end(), self.len)
    }

    pub fn first(&self) -> Option<&T> {
        self.begin().get()
    }

    pub fn last(&self) -> Option<&T> {
        self.end().prev_position().get()
    }

    /// Leaf that holds the subtree maximum of `id`.
    #[inline]
    fn routing_key(&self, id: NodeId) -> NodeId {
        match self.nodes.max_leaf(id) {
            Some(leaf) => leaf,
            None => unreachable!("{id} has no children to route to"),
        }
    }

    /// Other child of `id`'s parent: the left neighbour for the middle
    /// child, otherwise the middle child.
    fn sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.nodes[id].parent?;
        let children = &self.nodes.internal(parent).children;
        if children.get(1) == Some(&id) {
            children.first().copied()
        } else {
            children.get(1).copied()
        }
    }
}

impl<T: Ord> TwoThreeSet<T> {
    // =========================================================================
    // Search
    // =========================================================================

    #[inline]
    fn key_at<Q>(&self, leaf: NodeId) -> &Q
    where
        T: Borrow<Q>,
        Q: ?Sized,
    {
        <T as Borrow<Q>>::borrow(self.nodes.leaf_value(leaf))
    }

    /// Descends to the leaf with the smallest value `>= x`, or to the largest
    /// leaf when every value is below `x`.
    fn search<Q>(&self, x: &Q) -> Option<NodeId>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut current = self.root?;
        while let Some(inner) = self.nodes[current].as_internal() {
            let idx = inner
                .keys
                .iter()
                .position(|&key| x <= self.key_at::<Q>(key))
                .unwrap_or(inner.len() - 1);
            current = inner.children[idx];
        }
        Some(current)
    }

    fn find_leaf<Q>(&self, x: &Q) -> Option<NodeId>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.search(x)
            .filter(|&leaf| self.key_at::<Q>(leaf).cmp(x) == Ordering::Equal)
    }

    pub fn contains<Q>(&self, x: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_leaf(x).is_some()
    }

    /// Returns the stored value equal to `x`.
    pub fn get<Q>(&self, x: &Q) -> Option<&T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find_leaf(x).map(|leaf| self.nodes.leaf_value(leaf))
    }

    /// Cursor at `x`, or the end cursor if `x` is absent.
    pub fn find<Q>(&self, x: &Q) -> Cursor<'_, T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.find_leaf(x) {
            Some(leaf) => Cursor::new(self, Some(leaf), false),
            None => self.end(),
        }
    }

    /// Cursor at the first value `>= x`, or the end cursor.
    pub fn lower_bound<Q>(&self, x: &Q) -> Cursor<'_, T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.search(x) {
            // Search falls back to the largest leaf when x exceeds everything.
            Some(leaf) if self.key_at::<Q>(leaf) >= x => {
                Cursor::new(self, Some(leaf), false)
            }
            _ => self.end(),
        }
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    /// Adds `value`. Returns `false` and leaves the set untouched if an equal
    /// value is already present.
    pub fn insert(&mut self, value: T) -> bool {
        let Some(candidate) = self.search(&value) else {
            let leaf = self.nodes.alloc(Node::leaf(value));
            self.root = Some(leaf);
            self.len = 1;
            return true;
        };
        if self.nodes.leaf_value(candidate).cmp(&value) == Ordering::Equal {
            return false;
        }

        let leaf = self.nodes.alloc(Node::leaf(value));
        self.len += 1;
        match self.nodes[candidate].parent {
            None => {
                let root = self.nodes.alloc(Node::internal(None));
                self.attach(root, candidate);
                self.attach(root, leaf);
                self.root = Some(root);
            }
            Some(parent) => {
                self.attach(parent, leaf);
                self.split(parent);
                self.update_keys(leaf);
            }
        }
        true
    }

    /// Links `child` under `parent` at its sorted position.
    ///
    /// The position is found against `parent`'s current routing keys, so
    /// those must be accurate for every other child.
    fn attach(&mut self, parent: NodeId, child: NodeId) {
        let key = self.routing_key(child);
        let value = self.nodes.leaf_value(key);
        let pos = {
            let inner = self.nodes.internal(parent);
            inner
                .keys
                .iter()
                .position(|&k| self.nodes.leaf_value(k) >= value)
                .unwrap_or(inner.len())
        };
        let inner = self.nodes.internal_mut(parent);
        inner.children.insert(pos, child);
        inner.keys.insert(pos, key);
        self.nodes[child].parent = Some(parent);
    }

    fn detach(&mut self, parent: NodeId, child: NodeId) {
        let inner = self.nodes.internal_mut(parent);
        if let Some(pos) = inner.position(child) {
            inner.children.remove(pos);
            inner.keys.remove(pos);
        }
        self.nodes[child].parent = None;
    }

    /// Splits `id` while it has four children, walking toward the root.
    fn split(&mut self, mut id: NodeId) {
        let mut lefts: SmallVec<[NodeId; 16]> = SmallVec::new();
        while self.nodes[id].arity() > 3 {
            let parent = self.nodes[id].parent;
            if let Some(parent) = parent {
                self.detach(parent, id);
            }
            let children = match self.nodes.free(id).map(|node| node.kind) {
                Some(NodeKind::Internal(inner)) => inner.children,
                _ => unreachable!("{id} overflowed without being an internal node"),
            };

            let left = self.nodes.alloc(Node::internal(None));
            let right = self.nodes.alloc(Node::internal(None));
            for &child in &children[..2] {
                self.attach(left, child);
            }
            for &child in &children[2..] {
                self.attach(right, child);
            }
            lefts.push(left);

            match parent {
                Some(parent) => {
                    self.attach(parent, left);
                    self.attach(parent, right);
                    id = parent;
                }
                None => {
                    let root = self.nodes.alloc(Node::internal(None));
                    self.attach(root, left);
                    self.attach(root, right);
                    self.root = Some(root);
                    trace!(len = self.len, height = self.height(), "split grew a new root");
                    break;
                }
            }
        }
        // Highest split first; the deepest repair runs last.
        for &left in lefts.iter().rev() {
            self.update_keys(left);
        }
    }

    // =========================================================================
    // Key repair
    // =========================================================================

    /// Recomputes routing keys from `id` (or its parent, for a leaf) up to
    /// the root.
    fn update_keys(&mut self, id: NodeId) {
        let mut current = if self.nodes[id].is_leaf() {
            self.nodes[id].parent
        } else {
            Some(id)
        };
        while let Some(node) = current {
            self.repair_node(node);
            current = self.nodes[node].parent;
        }
    }

    fn repair_node(&mut self, id: NodeId) {
        let mut pairs: SmallVec<[(NodeId, NodeId); NODE_INLINE]> = self
            .nodes
            .internal(id)
            .children
            .iter()
            .map(|&child| (self.routing_key(child), child))
            .collect();

        match pairs.len() {
            2 => self.compare_swap(&mut pairs, 0, 1),
            3 => {
                self.compare_swap(&mut pairs, 0, 1);
                self.compare_swap(&mut pairs, 0, 2);
                self.compare_swap(&mut pairs, 1, 2);
            }
            n => {
                for i in 0..n {
                    for j in i + 1..n {
                        self.compare_swap(&mut pairs, i, j);
                    }
                }
            }
        }

        let inner = self.nodes.internal_mut(id);
        inner.keys = pairs.iter().map(|&(key, _)| key).collect();
        inner.children = pairs.iter().map(|&(_, child)| child).collect();
    }

    #[inline]
    fn compare_swap(&self, pairs: &mut [(NodeId, NodeId)], i: usize, j: usize) {
        if self.nodes.leaf_value(pairs[j].0) < self.nodes.leaf_value(pairs[i].0) {
            pairs.swap(i, j);
        }
    }

    // =========================================================================
    // Erase
    // =========================================================================

    /// Removes the value equal to `x`. Returns `false` if it was absent.
    pub fn erase<Q>(&mut self, x: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let Some(leaf) = self.find_leaf(x) else {
            return false;
        };
        self.len -= 1;
        self.remove_leaf(leaf);
        true
    }

    /// Same as [`erase`](Self::erase).
    pub fn remove<Q>(&mut self, x: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.erase(x)
    }

    /// Removes and returns the stored value equal to `x`.
    pub fn take<Q>(&mut self, x: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let leaf = self.find_leaf(x)?;
        self.len -= 1;
        self.remove_leaf(leaf)
    }

    fn remove_leaf(&mut self, leaf: NodeId) -> Option<T> {
        if let Some(parent) = self.nodes[leaf].parent {
            self.detach(parent, leaf);
            self.rebalance(parent);
        } else {
            self.root = None;
        }
        // Ancestor keys may name this leaf until rebalancing has repaired
        // them, so its slot is released last.
        self.nodes.free(leaf).and_then(Node::into_value)
    }

    /// Restores the 2-3 shape after `node` lost a child.
    fn rebalance(&mut self, mut node: NodeId) {
        loop {
            if self.nodes[node].arity() >= 2 {
                self.update_keys(node);
                return;
            }

            let Some(uncle) = self.sibling(node) else {
                // A root with one child hands the tree to that child.
                let survivor = self.nodes.internal(node).children.first().copied();
                self.nodes.free(node);
                if let Some(survivor) = survivor {
                    self.nodes[survivor].parent = None;
                }
                self.root = survivor;
                trace!(len = self.len, "collapsed root onto its only child");
                return;
            };

            let Some(&brother) = self.nodes.internal(node).children.first() else {
                unreachable!("{node} lost its last child");
            };
            let grandparent = self.nodes[node].parent;

            self.detach(node, brother);
            self.attach(uncle, brother);
            if let Some(grandparent) = grandparent {
                self.detach(grandparent, node);
            }
            self.nodes.free(node);
            self.split(uncle);
            self.update_keys(brother);
            trace!(%node, %uncle, "merged underfull node into its sibling");

            match grandparent {
                Some(grandparent) => node = grandparent,
                None => return,
            }
        }
    }
}

impl<T> Default for TwoThreeSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloning rebuilds the tree by inserting every value in order; node
/// structure is never copied.
impl<T: Ord + Clone> Clone for TwoThreeSet<T> {
    fn clone(&self) -> Self {
        let mut set = Self::with_capacity(self.len);
        set.extend(self.iter().cloned());
        set
    }

    fn clone_from(&mut self, source: &Self) {
        self.clear();
        self.extend(source.iter().cloned());
    }
}

impl<T: fmt::Debug> fmt::Debug for TwoThreeSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for TwoThreeSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for TwoThreeSet<T> {}

impl<T: Ord> FromIterator<T> for TwoThreeSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<T: Ord, const N: usize> From<[T; N]> for TwoThreeSet<T> {
    fn from(values: [T; N]) -> Self {
        values.into_iter().collect()
    }
}

impl<T: Ord> Extend<T> for TwoThreeSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<'a, T: Ord + Copy + 'a> Extend<&'a T> for TwoThreeSet<T> {
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<'a, T> IntoIterator for &'a TwoThreeSet<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<T> IntoIterator for TwoThreeSet<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(mut self) -> IntoIter<T> {
        let mut order = Vec::with_capacity(self.len);
        let mut current = self.root.map(|root| self.nodes.leftmost_leaf(root));
        while let Some(leaf) = current {
            order.push(leaf);
            current = self.nodes.successor(leaf);
        }
        let values: Vec<T> = order
            .into_iter()
            .filter_map(|leaf| self.nodes.free(leaf).and_then(Node::into_value))
            .collect();
        IntoIter::new(values)
    }
}
