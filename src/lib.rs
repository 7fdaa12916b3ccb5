//! # two-three-set
//!
//! An ordered set backed by a 2-3 tree.
//!
//! Every value lives in its own leaf and all leaves sit at the same depth.
//! Internal nodes have 2 or 3 children and keep, per child, a routing key
//! naming the largest value below it. Inserts split overfull nodes on the way
//! up; erases merge an underfull node's last child into a neighbour and
//! re-split it if needed. Cursors walk the tree through parent links, so they
//! can step in both directions from any position.
//!
//! ## Example
//!
//! ```rust
//! use two_three_set::TwoThreeSet;
//!
//! let mut set: TwoThreeSet<i32> = [5, 3, 8, 1, 4].into_iter().collect();
//! assert!(set.insert(7));
//! assert!(!set.insert(7));
//! assert!(set.erase(&3));
//!
//! assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![1, 4, 5, 7, 8]);
//! assert_eq!(set.lower_bound(&6).get(), Some(&7));
//! assert!(set.find(&3) == set.end());
//!
//! let mut cursor = set.end();
//! cursor.move_prev();
//! assert_eq!(cursor.get(), Some(&8));
//! ```

#![deny(unsafe_code)]

mod cursor;
mod node;
mod set;
mod validate;

pub use cursor::{Cursor, IntoIter, Iter};
pub use node::NodeId;
pub use set::TwoThreeSet;
pub use validate::{InvariantViolation, ValidateResult};

#[cfg(test)]
mod proptests;
