use std::hash::Hash;

use tracing::trace;

use crate::errors::RCFError;
use crate::tree::{BoundingBox, Node, Tree};
use crate::types::{NodeKey, Result};
use crate::RCFFloat;

/// Description of the result of a deletion performed by a [`PointDeleter`].
///
/// * `DeletedPoint(point)` - the leaf holding the label was removed from the
///    tree; contains its coordinates
/// * `MassDecreased(point)` - other labels remain at the same coordinates so
///    only the leaf's mass was reduced; contains the coordinates
#[derive(Clone, Debug, PartialEq)]
pub enum DeleteResult<T> {
    DeletedPoint(Vec<T>),
    MassDecreased(Vec<T>),
}

/// A mechanism for deleting labeled points from trees.
pub struct PointDeleter<'a, L, T> {
    tree: &'a mut Tree<L, T>,
}

impl<'a, L, T> PointDeleter<'a, L, T>
where
    L: Hash + Eq + Clone,
    T: RCFFloat,
{
    pub fn new(tree: &'a mut Tree<L, T>) -> Self {
        PointDeleter { tree: tree }
    }

    /// Delete a label from the tree.
    ///
    /// Fails with `EmptyTree` if the tree holds no points and `UnknownLabel`
    /// if the label is not in the tree.
    pub fn delete_label(&mut self, label: &L) -> Result<DeleteResult<T>> {
        if self.tree.is_empty() {
            return Err(RCFError::EmptyTree);
        }
        let leaf_key = self.tree.point_index_mut().remove(label)?;

        if let Some(point) = self.decremented_leaf_mass(label, leaf_key) {
            return Ok(DeleteResult::MassDecreased(point));
        }
        self.remove_leaf(leaf_key)
    }

    /// Removes `label` from its leaf when other labels share the leaf, and
    /// decrements the mass of every ancestor. Returns the leaf's coordinates
    /// in that case and `None` when `label` is the leaf's only label.
    fn decremented_leaf_mass(&mut self, label: &L, leaf_key: NodeKey) -> Option<Vec<T>> {
        let point = match self.get_node_mut(leaf_key) {
            Node::Leaf(leaf) => {
                if leaf.mass() <= 1 {
                    return None;
                }
                leaf.remove_label(label);
                leaf.point().to_vec()
            }
            Node::Branch(_) => panic!("Inconsistent node: expected leaf"),
        };
        let ancestors: Vec<NodeKey> = self.tree.ancestors(leaf_key).collect();
        for ancestor_key in ancestors {
            if let Node::Branch(branch) = self.get_node_mut(ancestor_key) {
                branch.decrement_mass();
            }
        }
        trace!("decreased leaf mass");
        Some(point)
    }

    /// Deletion of a leaf holding a single label.
    ///
    /// In the general case we are at a leaf node `P` in the following
    /// diagram:
    ///
    /// ```text
    ///     A
    ///    / \     P = leaf node to delete
    ///   N   B    N = parent of P
    ///  / \       S = P's sibling
    /// P   S
    /// ```
    ///
    /// The leaf is deleted along with its parent and the sibling takes the
    /// parent's place:
    ///
    /// ```text
    ///   A
    ///  / \
    /// S   B
    /// ```
    ///
    /// Every ancestor of `S` then has its mass decremented and its bounding
    /// box recomputed from its children. If `N` was the root then `S` becomes
    /// the new root; if `P` was the root the tree becomes empty.
    fn remove_leaf(&mut self, leaf_key: NodeKey) -> Result<DeleteResult<T>> {
        let parent_key = match self.tree.get_parent(leaf_key) {
            Some(parent_key) => parent_key,
            None => {
                let point = self.take_leaf_point(leaf_key);
                self.tree.set_root_node(None);
                return Ok(DeleteResult::DeletedPoint(point));
            }
        };
        let sibling_key = self.tree.sibling_of(leaf_key, parent_key);
        let grandparent_key = self.tree.get_parent(parent_key);

        // rewire the sibling into the place of the parent
        self.get_node_mut(sibling_key).set_parent(grandparent_key);
        match grandparent_key {
            Some(grandparent_key) => match self.get_node_mut(grandparent_key) {
                Node::Branch(grandparent) => {
                    if !grandparent.replace_child(parent_key, sibling_key) {
                        panic!("Inconsistent node: broken parent-grandparent relationship");
                    }
                }
                Node::Leaf(_) => panic!("Inconsistent node: grandparent should be a branch"),
            },
            None => self.tree.set_root_node(Some(sibling_key)),
        }

        let point = self.take_leaf_point(leaf_key);
        self.tree.remove_node(parent_key);

        // walk up from the grandparent refreshing boxes and masses
        let mut current = grandparent_key;
        while let Some(node_key) = current {
            let merged_box = self.merged_box_of_children(node_key);
            match self.get_node_mut(node_key) {
                Node::Branch(branch) => {
                    branch.set_bounding_box(merged_box);
                    branch.decrement_mass();
                }
                Node::Leaf(_) => panic!("Inconsistent node: expected branch"),
            }
            current = self.tree.get_parent(node_key);
        }
        Ok(DeleteResult::DeletedPoint(point))
    }

    /// Removes a leaf from the node store, returning its coordinates.
    fn take_leaf_point(&mut self, leaf_key: NodeKey) -> Vec<T> {
        match self.tree.remove_node(leaf_key) {
            Node::Leaf(leaf) => leaf.point().to_vec(),
            Node::Branch(_) => panic!("Inconsistent node: expected leaf"),
        }
    }

    /// Returns the bounding box formed by merging the boxes of the two
    /// children of a branch.
    fn merged_box_of_children(&self, node_key: NodeKey) -> BoundingBox<T> {
        match self.tree.get_node(node_key) {
            Node::Branch(branch) => {
                let left_box = self.tree.get_node(branch.left()).to_bounding_box();
                let right_box = self.tree.get_node(branch.right()).to_bounding_box();
                BoundingBox::merged_box_with_box(&left_box, &right_box)
            }
            Node::Leaf(_) => panic!("Inconsistent node: expected branch"),
        }
    }

    #[inline(always)]
    fn get_node_mut(&mut self, node_key: NodeKey) -> &mut Node<L, T> {
        self.tree.get_node_mut(node_key)
    }
}

impl<L, T> Tree<L, T>
where
    L: Hash + Eq + Clone,
    T: RCFFloat,
{
    /// Delete a label from the tree.
    ///
    /// If other labels share the label's coordinates only the leaf's mass is
    /// reduced. Otherwise the leaf is removed and its sibling takes the place
    /// of its parent. See [`PointDeleter`].
    ///
    /// # Examples
    ///
    /// ```
    /// use rrcflib::{RCFError, Tree};
    /// use rrcflib::tree::DeleteResult;
    ///
    /// let mut tree: Tree<u32, f64> = Tree::new(1);
    /// tree.insert(0, vec![0.0]).unwrap();
    /// tree.insert(1, vec![0.0]).unwrap();
    /// tree.insert(2, vec![1.0]).unwrap();
    ///
    /// assert_eq!(tree.delete(&1), Ok(DeleteResult::MassDecreased(vec![0.0])));
    /// assert_eq!(tree.delete(&2), Ok(DeleteResult::DeletedPoint(vec![1.0])));
    /// assert_eq!(tree.delete(&2), Err(RCFError::UnknownLabel));
    /// assert_eq!(tree.delete(&0), Ok(DeleteResult::DeletedPoint(vec![0.0])));
    /// assert_eq!(tree.delete(&0), Err(RCFError::EmptyTree));
    /// ```
    pub fn delete(&mut self, label: &L) -> Result<DeleteResult<T>> {
        PointDeleter::new(self).delete_label(label)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::tree::tree::tests::{check_tree, generate_random_normal};

    #[test]
    fn test_delete_all_points() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let points = generate_random_normal(&mut rng, 3, 100);
        let mut tree: Tree<usize, f64> = Tree::build_with_seed(points.into_iter().enumerate(), 8).unwrap();

        for i in (0..100).rev() {
            tree.delete(&i).unwrap();
            assert_eq!(tree.len(), i);
            assert!(!tree.contains(&i));
            check_tree(&tree);
        }
        assert!(tree.is_empty());
        assert_eq!(tree.node_store().len(), 0);
    }

    #[test]
    fn test_delete_restores_box() {
        let points = vec![(0, vec![0.0, 0.0]), (1, vec![1.0, 1.0]), (2, vec![2.0, 0.5])];
        let mut tree: Tree<i32, f64> = Tree::build_with_seed(points, 2).unwrap();

        tree.insert(3, vec![10.0, -10.0]).unwrap();
        tree.delete(&3).unwrap();
        let bbox = tree.bounding_box().unwrap();
        assert_eq!(bbox.min_values(), &[0.0, 0.0]);
        assert_eq!(bbox.max_values(), &[2.0, 1.0]);
        assert_eq!(tree.num_leaves(), 3);
        check_tree(&tree);
    }

    #[test]
    fn test_delete_leaves_symmetric_pair() {
        let points = vec![("a", vec![0.0, 0.0]), ("b", vec![0.0, 1.0]), ("c", vec![10.0, 10.0])];
        let mut tree: Tree<&str, f64> = Tree::build_with_seed(points, 4).unwrap();
        tree.delete(&"c").unwrap();
        assert_eq!(tree.codisp(&"a"), Ok(0.5));
        assert_eq!(tree.codisp(&"b"), Ok(0.5));
        assert_eq!(tree.num_branches(), 1);
        check_tree(&tree);
    }

    #[test]
    fn test_delete_shared_leaf_keeps_shape() {
        let mut tree: Tree<u8, f32> = Tree::new(2);
        tree.insert(0, vec![0.0, 0.0]).unwrap();
        tree.insert(1, vec![3.0, 3.0]).unwrap();
        tree.insert(2, vec![3.0, 3.0]).unwrap();
        let num_nodes = tree.node_store().len();

        assert_eq!(tree.delete(&1), Ok(DeleteResult::MassDecreased(vec![3.0, 3.0])));
        assert_eq!(tree.node_store().len(), num_nodes);
        assert_eq!(tree.leaf(&2).unwrap().labels(), &[2]);
        assert_eq!(tree.len(), 2);
        check_tree(&tree);
    }

    #[test]
    fn test_delete_failures() {
        let mut tree: Tree<u8, f64> = Tree::new(1);
        assert_eq!(tree.delete(&0), Err(RCFError::EmptyTree));
        tree.insert(0, vec![1.0]).unwrap();
        assert_eq!(tree.delete(&1), Err(RCFError::UnknownLabel));
        assert_eq!(tree.len(), 1);
    }
}
