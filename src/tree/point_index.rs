use std::collections::hash_map;
use std::collections::HashMap;
use std::hash::Hash;

use crate::errors::RCFError;
use crate::types::{NodeKey, Result};

/// Mapping from a point's label to the key of the leaf holding it.
///
/// The reverse direction, from a leaf to its labels, is stored on the
/// [`Leaf`](crate::Leaf) itself. The index is owned by its tree and is
/// updated by every insertion and deletion.
#[derive(Clone, Debug)]
pub struct PointIndex<L> {
    leaves: HashMap<L, NodeKey>,
}

impl<L: Hash + Eq> PointIndex<L> {

    pub fn new() -> Self {
        PointIndex { leaves: HashMap::new() }
    }

    /// Returns the key of the leaf holding `label`.
    pub fn get(&self, label: &L) -> Result<NodeKey> {
        self.leaves.get(label).copied().ok_or(RCFError::UnknownLabel)
    }

    pub fn contains(&self, label: &L) -> bool {
        self.leaves.contains_key(label)
    }

    /// Register `label` as held by the leaf `leaf_key`.
    pub fn insert(&mut self, label: L, leaf_key: NodeKey) -> Result<()> {
        match self.leaves.entry(label) {
            hash_map::Entry::Occupied(_) => Err(RCFError::DuplicateLabel),
            hash_map::Entry::Vacant(entry) => {
                entry.insert(leaf_key);
                Ok(())
            }
        }
    }

    /// Remove `label`, returning the key of the leaf that held it.
    pub fn remove(&mut self, label: &L) -> Result<NodeKey> {
        self.leaves.remove(label).ok_or(RCFError::UnknownLabel)
    }

    /// Number of labels in the index.
    pub fn len(&self) -> usize { self.leaves.len() }

    pub fn is_empty(&self) -> bool { self.leaves.is_empty() }

    /// Iterate over the labels in arbitrary order.
    pub fn labels(&self) -> hash_map::Keys<'_, L, NodeKey> {
        self.leaves.keys()
    }
}

impl<L: Hash + Eq> Default for PointIndex<L> {
    fn default() -> Self { PointIndex::new() }
}
