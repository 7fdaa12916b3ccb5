//! Node storage for the 2-3 tree.
//!
//! Nodes live in a [`NodeArena`] and refer to each other through [`NodeId`]
//! handles. A child handle in an internal node is the owning edge; the
//! `parent` handle is navigation only.

use std::fmt;
use std::ops::{Index, IndexMut};

use smallvec::SmallVec;

/// Inline capacity for child and routing-key arrays.
///
/// A stable node has 2 or 3 children; a split briefly sees 4.
pub(crate) const NODE_INLINE: usize = 4;

pub(crate) type Slots = SmallVec<[NodeId; NODE_INLINE]>;

/// Handle to a node slot in the arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Children of an internal node together with their routing keys.
///
/// `keys[i]` is the handle of the leaf holding the maximum value below
/// `children[i]`. Keeping leaf handles instead of copies of the value means
/// `T` does not need to be `Clone`.
#[derive(Default)]
pub(crate) struct Internal {
    pub(crate) children: Slots,
    pub(crate) keys: Slots,
}

impl Internal {
    #[inline]
    pub(crate) fn len(&self) -> usize {
        debug_assert_eq!(self.children.len(), self.keys.len());
        self.children.len()
    }

    #[inline]
    pub(crate) fn position(&self, child: NodeId) -> Option<usize> {
        self.children.iter().position(|&c| c == child)
    }

    /// Leaf holding the maximum value of the whole subtree.
    #[inline]
    pub(crate) fn max_leaf(&self) -> Option<NodeId> {
        self.keys.last().copied()
    }
}

pub(crate) enum NodeKind<T> {
    Leaf(T),
    Internal(Internal),
}

pub(crate) struct Node<T> {
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind<T>,
}

impl<T> Node<T> {
    pub(crate) fn leaf(value: T) -> Self {
        Self {
            parent: None,
            kind: NodeKind::Leaf(value),
        }
    }

    pub(crate) fn internal(parent: Option<NodeId>) -> Self {
        Self {
            parent,
            kind: NodeKind::Internal(Internal::default()),
        }
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    #[inline]
    pub(crate) fn as_internal(&self) -> Option<&Internal> {
        match &self.kind {
            NodeKind::Internal(inner) => Some(inner),
            NodeKind::Leaf(_) => None,
        }
    }

    #[inline]
    pub(crate) fn value(&self) -> Option<&T> {
        match &self.kind {
            NodeKind::Leaf(value) => Some(value),
            NodeKind::Internal(_) => None,
        }
    }

    pub(crate) fn into_value(self) -> Option<T> {
        match self.kind {
            NodeKind::Leaf(value) => Some(value),
            NodeKind::Internal(_) => None,
        }
    }

    /// Number of children (zero for a leaf).
    #[inline]
    pub(crate) fn arity(&self) -> usize {
        self.as_internal().map_or(0, Internal::len)
    }
}

/// Slot storage for nodes, with a free list for released slots.
pub(crate) struct NodeArena<T> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<NodeId>,
}

impl<T> NodeArena<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub(crate) fn with_capacity(nodes: usize) -> Self {
        Self {
            slots: Vec::with_capacity(nodes),
            free: Vec::new(),
        }
    }

    pub(crate) fn alloc(&mut self, node: Node<T>) -> NodeId {
        if let Some(id) = self.free.pop() {
            debug_assert!(self.slots[id.index()].is_none());
            self.slots[id.index()] = Some(node);
            return id;
        }
        debug_assert!(self.slots.len() < u32::MAX as usize);
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(Some(node));
        id
    }

    /// Releases a slot, returning the node that occupied it.
    pub(crate) fn free(&mut self, id: NodeId) -> Option<Node<T>> {
        let node = self.slots.get_mut(id.index())?.take()?;
        self.free.push(id);
        Some(node)
    }

    #[inline]
    pub(crate) fn get(&self, id: NodeId) -> Option<&Node<T>> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    /// Number of occupied slots.
    pub(crate) fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }

    pub(crate) fn capacity_bytes(&self) -> usize {
        self.slots.capacity() * std::mem::size_of::<Option<Node<T>>>()
            + self.free.capacity() * std::mem::size_of::<NodeId>()
    }

    /// Drops trailing free slots and releases spare capacity.
    pub(crate) fn shrink_to_fit(&mut self) {
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }
        let len = self.slots.len();
        self.free.retain(|id| id.index() < len);
        self.slots.shrink_to_fit();
        self.free.shrink_to_fit();
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Leaf holding the maximum value under `id`.
    #[inline]
    pub(crate) fn max_leaf(&self, id: NodeId) -> Option<NodeId> {
        match &self[id].kind {
            NodeKind::Leaf(_) => Some(id),
            NodeKind::Internal(inner) => inner.max_leaf(),
        }
    }

    /// Value stored at a leaf handle.
    ///
    /// Routing keys and cursors only ever hold leaf handles.
    #[inline]
    pub(crate) fn leaf_value(&self, id: NodeId) -> &T {
        match &self[id].kind {
            NodeKind::Leaf(value) => value,
            NodeKind::Internal(_) => unreachable!("{id} is not a leaf"),
        }
    }

    pub(crate) fn leftmost_leaf(&self, mut id: NodeId) -> NodeId {
        while let Some(&first) = self[id].as_internal().and_then(|n| n.children.first()) {
            id = first;
        }
        id
    }

    pub(crate) fn rightmost_leaf(&self, mut id: NodeId) -> NodeId {
        while let Some(&last) = self[id].as_internal().and_then(|n| n.children.last()) {
            id = last;
        }
        id
    }

    /// In-order next leaf, or `None` after the last one.
    pub(crate) fn successor(&self, mut id: NodeId) -> Option<NodeId> {
        loop {
            let parent = self[id].parent?;
            let siblings = &self.internal(parent).children;
            if let Some(pos) = siblings.iter().position(|&c| c == id) {
                if let Some(&next) = siblings.get(pos + 1) {
                    return Some(self.leftmost_leaf(next));
                }
            }
            id = parent;
        }
    }

    /// In-order previous leaf, or `None` before the first one.
    pub(crate) fn predecessor(&self, mut id: NodeId) -> Option<NodeId> {
        loop {
            let parent = self[id].parent?;
            let siblings = &self.internal(parent).children;
            if let Some(pos) = siblings.iter().position(|&c| c == id) {
                if pos > 0 {
                    return Some(self.rightmost_leaf(siblings[pos - 1]));
                }
            }
            id = parent;
        }
    }

    #[inline]
    pub(crate) fn internal(&self, id: NodeId) -> &Internal {
        match &self[id].kind {
            NodeKind::Internal(inner) => inner,
            NodeKind::Leaf(_) => unreachable!("{id} is not an internal node"),
        }
    }

    #[inline]
    pub(crate) fn internal_mut(&mut self, id: NodeId) -> &mut Internal {
        match &mut self[id].kind {
            NodeKind::Internal(inner) => inner,
            NodeKind::Leaf(_) => unreachable!("{id} is not an internal node"),
        }
    }
}

impl<T> Index<NodeId> for NodeArena<T> {
    type Output = Node<T>;

    #[inline]
    fn index(&self, id: NodeId) -> &Node<T> {
        match self.slots.get(id.index()) {
            Some(Some(node)) => node,
            _ => unreachable!("{id} refers to a released slot"),
        }
    }
}

impl<T> IndexMut<NodeId> for NodeArena<T> {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Node<T> {
        match self.slots.get_mut(id.index()) {
            Some(Some(node)) => node,
            _ => unreachable!("{id} refers to a released slot"),
        }
    }
}
