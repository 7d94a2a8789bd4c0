use slab::Slab;

use crate::Node;

/// A type for storing nodes by key.
///
/// Branches refer to their children and children to their parent by key
/// into the same store, so the store is the single owner of every node.
pub type NodeStore<L, T> = Slab<Node<L, T>>;
