use thiserror::Error;

use crate::node::NodeId;
use crate::set::TwoThreeSet;

/// A broken structural invariant found by [`TwoThreeSet::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("root {0} has a parent link")]
    RootHasParent(NodeId),

    #[error("handle {0} does not refer to a live node")]
    DanglingHandle(NodeId),

    #[error("node {child} links to parent {found:?}, expected {expected}")]
    ParentMismatch {
        child: NodeId,
        expected: NodeId,
        found: Option<NodeId>,
    },

    #[error("internal node {node} has {children} children (must be 2 or 3)")]
    BadArity { node: NodeId, children: usize },

    #[error("leaf {leaf} is at depth {depth}, other leaves are at {expected}")]
    UnevenLeafDepth {
        leaf: NodeId,
        depth: usize,
        expected: usize,
    },

    #[error("routing key {index} of {node} does not name its child's maximum")]
    RoutingKeyMismatch { node: NodeId, index: usize },

    #[error("routing keys of {node} are not strictly ascending")]
    UnsortedKeys { node: NodeId },

    #[error("leaf {leaf} is not greater than the leaf before it")]
    OutOfOrder { leaf: NodeId },

    #[error("tree holds {counted} values but the set records {recorded}")]
    LengthMismatch { counted: usize, recorded: usize },

    #[error("arena holds {live} nodes but only {reachable} are reachable")]
    LeakedNodes { live: usize, reachable: usize },
}

pub type ValidateResult = Result<(), InvariantViolation>;

impl<T: Ord> TwoThreeSet<T> {
    /// Walks the whole tree and reports the first broken invariant.
    ///
    /// Runs in O(n). Meant for tests and debugging; every public operation
    /// already preserves these invariants.
    pub fn validate(&self) -> ValidateResult {
        let Some(root) = self.root else {
            if self.len != 0 {
                return Err(InvariantViolation::LengthMismatch {
                    counted: 0,
                    recorded: self.len,
                });
            }
            let live = self.nodes.live();
            if live != 0 {
                return Err(InvariantViolation::LeakedNodes { live, reachable: 0 });
            }
            return Ok(());
        };

        let root_node = self
            .nodes
            .get(root)
            .ok_or(InvariantViolation::DanglingHandle(root))?;
        if root_node.parent.is_some() {
            return Err(InvariantViolation::RootHasParent(root));
        }

        let mut leaf_depth: Option<usize> = None;
        let mut leaves = 0usize;
        let mut reachable = 0usize;
        let mut stack: Vec<(NodeId, usize)> = vec![(root, 0)];

        while let Some((id, depth)) = stack.pop() {
            let node = self
                .nodes
                .get(id)
                .ok_or(InvariantViolation::DanglingHandle(id))?;
            reachable += 1;

            let Some(inner) = node.as_internal() else {
                leaves += 1;
                match leaf_depth {
                    None => leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        return Err(InvariantViolation::UnevenLeafDepth {
                            leaf: id,
                            depth,
                            expected,
                        });
                    }
                    Some(_) => {}
                }
                continue;
            };

            let children = inner.len();
            if !(2..=3).contains(&children) {
                return Err(InvariantViolation::BadArity { node: id, children });
            }

            for (index, (&child, &key)) in inner.children.iter().zip(&inner.keys).enumerate() {
                let child_node = self
                    .nodes
                    .get(child)
                    .ok_or(InvariantViolation::DanglingHandle(child))?;
                if child_node.parent != Some(id) {
                    return Err(InvariantViolation::ParentMismatch {
                        child,
                        expected: id,
                        found: child_node.parent,
                    });
                }
                if self.nodes.get(key).and_then(|n| n.value()).is_none() {
                    return Err(InvariantViolation::DanglingHandle(key));
                }
                if self.subtree_max(child) != Some(key) {
                    return Err(InvariantViolation::RoutingKeyMismatch { node: id, index });
                }
                stack.push((child, depth + 1));
            }

            let ascending = inner
                .keys
                .windows(2)
                .all(|pair| self.nodes.leaf_value(pair[0]) < self.nodes.leaf_value(pair[1]));
            if !ascending {
                return Err(InvariantViolation::UnsortedKeys { node: id });
            }
        }

        if leaves != self.len {
            return Err(InvariantViolation::LengthMismatch {
                counted: leaves,
                recorded: self.len,
            });
        }
        let live = self.nodes.live();
        if live != reachable {
            return Err(InvariantViolation::LeakedNodes { live, reachable });
        }

        let mut previous = self.nodes.leftmost_leaf(root);
        while let Some(leaf) = self.nodes.successor(previous) {
            if self.nodes.leaf_value(leaf) <= self.nodes.leaf_value(previous) {
                return Err(InvariantViolation::OutOfOrder { leaf });
            }
            previous = leaf;
        }
        Ok(())
    }

    /// Rightmost leaf under `id`, found by descending rather than trusting
    /// stored keys.
    fn subtree_max(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            match self.nodes.get(current)?.as_internal() {
                None => return Some(current),
                Some(inner) => current = *inner.children.last()?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    #[test]
    fn test_empty_set_is_valid() {
        let s: TwoThreeSet<u32> = TwoThreeSet::new();
        assert_eq!(s.validate(), Ok(()));
    }

    #[test]
    fn test_detects_length_mismatch() {
        let mut s: TwoThreeSet<u32> = (0..10).collect();
        s.len = 11;
        assert_eq!(
            s.validate(),
            Err(InvariantViolation::LengthMismatch {
                counted: 10,
                recorded: 11
            })
        );
    }

    #[test]
    fn test_detects_root_parent_link() {
        let mut s: TwoThreeSet<u32> = (0..10).collect();
        let root = s.root.unwrap();
        let bogus = s.nodes.leftmost_leaf(root);
        s.nodes[root].parent = Some(bogus);
        assert_eq!(s.validate(), Err(InvariantViolation::RootHasParent(root)));
    }

    #[test]
    fn test_detects_swapped_children() {
        let mut s: TwoThreeSet<u32> = (0..3).collect();
        let root = s.root.unwrap();
        let inner = s.nodes.internal_mut(root);
        inner.children.swap(0, 1);
        assert!(matches!(
            s.validate(),
            Err(InvariantViolation::RoutingKeyMismatch { index: 0, .. })
        ));
    }

    #[test]
    fn test_detects_bad_arity() {
        let mut s: TwoThreeSet<u32> = (0..2).collect();
        let root = s.root.unwrap();
        let extra = s.nodes.alloc(Node::leaf(99));
        s.nodes[extra].parent = Some(root);
        let inner = s.nodes.internal_mut(root);
        for _ in 0..2 {
            inner.children.push(extra);
            inner.keys.push(extra);
        }
        assert_eq!(
            s.validate(),
            Err(InvariantViolation::BadArity {
                node: root,
                children: 4
            })
        );
    }

    #[test]
    fn test_detects_leaked_node() {
        let mut s: TwoThreeSet<u32> = (0..5).collect();
        s.nodes.alloc(Node::leaf(100));
        assert!(matches!(
            s.validate(),
            Err(InvariantViolation::LeakedNodes { .. })
        ));
    }

    #[test]
    fn test_error_messages() {
        let err = InvariantViolation::BadArity {
            node: NodeId::from_raw(4),
            children: 1,
        };
        assert_eq!(
            err.to_string(),
            "internal node #4 has 1 children (must be 2 or 3)"
        );
    }
}
