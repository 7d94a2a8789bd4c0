use std::hash::Hash;

use tracing::trace;

use crate::errors::RCFError;
use crate::tree::{BoundingBox, Branch, Cut, Leaf, Node, Side, Tree};
use crate::types::{NodeKey, Result};
use crate::util::check_argument;
use crate::RCFFloat;

/// The result of a point insertion.
///
/// `AddedPoint` means a new leaf was created for the point. `MassIncreased`
/// means the point duplicated the coordinates of an existing leaf; it
/// contains the new mass of that leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddResult {
    AddedPoint,
    MassIncreased(u32),
}

impl<L, T> Tree<L, T>
where
    L: Hash + Eq + Clone,
    T: RCFFloat,
{
    /// Insert a labeled point into the tree.
    ///
    /// The location of the new leaf is randomly determined by random cuts so
    /// that the resulting tree is distributed as if it had been built from
    /// scratch on the enlarged point set. A point with the same coordinates
    /// as an existing leaf is added to that leaf instead. See [`AddResult`].
    ///
    /// Fails with `DuplicateLabel` if the label is already present and with
    /// `InvalidArgument` if the point has the wrong dimensionality, a
    /// non-finite component or would make the tree's extent overflow. The
    /// tree is unchanged on failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use rrcflib::Tree;
    /// use rrcflib::tree::AddResult;
    ///
    /// let mut tree: Tree<u32, f32> = Tree::new(2);
    ///
    /// let result = tree.insert(0, vec![0.0, 0.0]).unwrap();
    /// assert_eq!(result, AddResult::AddedPoint);
    ///
    /// let result = tree.insert(1, vec![0.0, 0.0]).unwrap();
    /// assert_eq!(result, AddResult::MassIncreased(2));
    ///
    /// assert!(tree.insert(1, vec![5.0, 5.0]).is_err());
    /// ```
    pub fn insert(&mut self, label: L, point: Vec<T>) -> Result<AddResult> {
        let point = self.prepare_point(point)?;
        self.check_prepared_insertion(&label, &point)?;

        let root_key = match self.root_node() {
            Some(root_key) => root_key,
            None => {
                let leaf_key = self.insert_node(Node::Leaf(Leaf::new(label.clone(), point)));
                self.point_index_mut().insert(label, leaf_key)?;
                self.set_root_node(Some(leaf_key));
                return Ok(AddResult::AddedPoint);
            }
        };

        if let Some(leaf_key) = self.find_duplicate_leaf(&point) {
            return self.increase_mass(label, leaf_key);
        }

        self.add_point_by_node(label, point, root_key)
    }

    /// Check that [`Tree::insert`] would accept the labeled point, without
    /// modifying the tree.
    ///
    /// Returns the error `insert` would fail with. Deleting points never
    /// enlarges the tree's bounding box, so a point accepted here is also
    /// accepted after deletions.
    ///
    /// # Examples
    ///
    /// ```
    /// use rrcflib::Tree;
    ///
    /// let mut tree: Tree<u32, f64> = Tree::new(1);
    /// tree.insert(0, vec![-1.7e308]).unwrap();
    ///
    /// assert!(tree.check_insertion(&1, &[0.0]).is_ok());
    /// assert!(tree.check_insertion(&0, &[0.0]).is_err());
    /// assert!(tree.check_insertion(&1, &[1.7e308]).is_err());
    /// assert_eq!(tree.len(), 1);
    /// ```
    pub fn check_insertion(&self, label: &L, point: &[T]) -> Result<()> {
        let point = self.prepare_point(point.to_vec())?;
        self.check_prepared_insertion(label, &point)
    }

    fn check_prepared_insertion(&self, label: &L, point: &[T]) -> Result<()> {
        if self.point_index().contains(label) {
            return Err(RCFError::DuplicateLabel);
        }
        if let Some(root_key) = self.root_node() {
            let expanded_box = self.get_node(root_key).merged_box_with_point(point);
            check_argument(expanded_box.range_sum().is_finite(), "point set extent overflows")?;
        }
        Ok(())
    }

    /// Adds `label` to an existing leaf and increments the mass of every
    /// ancestor. Bounding boxes are unchanged since the coordinates are
    /// already present.
    fn increase_mass(&mut self, label: L, leaf_key: NodeKey) -> Result<AddResult> {
        self.point_index_mut().insert(label.clone(), leaf_key)?;
        let mass = match self.get_node_mut(leaf_key) {
            Node::Leaf(leaf) => {
                leaf.push_label(label);
                leaf.mass()
            }
            Node::Branch(_) => panic!("Inconsistent node: expected leaf when increasing point mass"),
        };
        let ancestors: Vec<NodeKey> = self.ancestors(leaf_key).collect();
        for ancestor_key in ancestors {
            if let Node::Branch(branch) = self.get_node_mut(ancestor_key) {
                branch.increment_mass();
            }
        }
        trace!(mass, "increased leaf mass");
        Ok(AddResult::MassIncreased(mass))
    }

    /// Main point insertion algorithm given a new point and the root node.
    ///
    /// Steps of the insertion algorithm at the current node `N`:
    ///
    /// 1. Compute the bounding box made by merging the new point with the
    ///    contents of `N` and draw a random cut on this box. If the cut
    ///    separates the point from the original contents of `N` then create a
    ///    new leaf at this level. See `insert_new_leaf()`. This step is
    ///    skipped when the point lies inside the bounding box of `N` since no
    ///    cut inside the box can separate it.
    /// 2. Otherwise, `N` keeps its cut. Its bounding box becomes the merged
    ///    box and its mass is incremented before descending to the child on
    ///    the point's side of the existing cut.
    ///
    /// A leaf never has to be descended: the point differs from the leaf's
    /// coordinates, so any cut between them isolates it.
    fn add_point_by_node(&mut self, label: L, point: Vec<T>, root_key: NodeKey) -> Result<AddResult> {
        let mut node_key = root_key;
        loop {
            // 1. propose a cut on the merged box
            let merged_box = self.get_node(node_key).merged_box_with_point(&point);
            if !self.point_inside_node(&point, node_key) {
                let cut = Cut::new_random_cut(&merged_box, self.rng_mut())?;
                let (min, max) = self.get_node(node_key).range(cut.dimension());
                if let Some(side) = cut.isolation_side(&point, min, max) {
                    self.insert_new_leaf(label, point, node_key, merged_box, cut, side)?;
                    return Ok(AddResult::AddedPoint);
                }
            }

            // 2. the cut did not separate the point from the node. descend
            // along the node's own cut
            node_key = match self.get_node_mut(node_key) {
                Node::Branch(branch) => {
                    let next_key = match branch.cut().side_of(&point) {
                        Side::Left => branch.left(),
                        Side::Right => branch.right(),
                    };
                    branch.set_bounding_box(merged_box);
                    branch.increment_mass();
                    next_key
                }
                Node::Leaf(_) => panic!("Inconsistent node: a cut failed to isolate a leaf"),
            };
        }
    }

    /// Insert a new leaf node into the tree containing the input point.
    ///
    /// When this function is called we are at a node in the tree where the
    /// merged box (between this node and the new point) has a proposed cut
    /// that separates the point from the original bounding box at this node.
    ///
    /// Our current tree state is:
    ///
    /// ```text
    ///       A        N = current node
    ///      / \       A = parent
    ///     S   N      S = sibling of N
    ///        / \
    /// ```
    ///
    /// This needs to be transformed to:
    ///
    /// ```text
    ///       A        N = current node
    ///      / \       A = parent
    ///     S   B      S = (former) sibling of N
    ///        / \     B = new branch holding the merged box and the cut
    ///       N   P    P = new leaf node
    ///      / \
    /// ```
    ///
    /// `P` goes on the side of the cut given by `side`. The ancestors of `B`
    /// were already updated on the way down.
    fn insert_new_leaf(
        &mut self,
        label: L,
        point: Vec<T>,
        node_key: NodeKey,
        merged_box: BoundingBox<T>,
        cut: Cut<T>,
        side: Side,
    ) -> Result<NodeKey> {
        let parent_key = self.get_parent(node_key);
        let node_mass = self.get_node(node_key).mass();

        // P: new leaf node
        let new_leaf_key = self.insert_node(Node::Leaf(Leaf::new(label.clone(), point)));
        self.point_index_mut().insert(label, new_leaf_key)?;

        // B: new branch in the place of N
        let (left, right) = match side {
            Side::Left => (new_leaf_key, node_key),
            Side::Right => (node_key, new_leaf_key),
        };
        let mut branch = Node::Branch(Branch::new(left, right, merged_box, cut, node_mass + 1));
        branch.set_parent(parent_key);
        let branch_key = self.insert_node(branch);

        self.get_node_mut(node_key).set_parent(Some(branch_key));
        self.get_node_mut(new_leaf_key).set_parent(Some(branch_key));

        // if N was the root then B becomes the new root
        match parent_key {
            Some(parent_key) => match self.get_node_mut(parent_key) {
                Node::Branch(parent) => {
                    if !parent.replace_child(node_key, branch_key) {
                        panic!("Inconsistent node: broken parent-child relationship");
                    }
                }
                Node::Leaf(_) => panic!("Inconsistent node: parent should not be a leaf node"),
            },
            None => self.set_root_node(Some(branch_key)),
        }
        Ok(new_leaf_key)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::tree::tree::tests::{check_tree, generate_random_normal};

    #[test]
    fn test_insert_into_empty_tree() {
        let mut tree: Tree<&str, f64> = Tree::new(3);
        assert_eq!(tree.insert("a", vec![1.0, 2.0, 3.0]), Ok(AddResult::AddedPoint));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.num_leaves(), 1);
        assert_eq!(tree.codisp(&"a"), Ok(0.0));
        check_tree(&tree);
    }

    #[test]
    fn test_insert_counts() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let points = generate_random_normal(&mut rng, 2, 200);
        let mut tree: Tree<usize, f64> = Tree::new(2);
        tree.seed(42);
        for (i, point) in points.into_iter().enumerate() {
            tree.insert(i, point).unwrap();
            assert_eq!(tree.len(), i + 1);
        }
        assert_eq!(tree.num_leaves(), 200);
        assert_eq!(tree.num_branches(), 199);
        check_tree(&tree);
    }

    #[test]
    fn test_insert_duplicate_coordinates() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let points = generate_random_normal(&mut rng, 2, 20);
        let mut tree: Tree<usize, f64> = Tree::build_with_seed(points.clone().into_iter().enumerate(), 3).unwrap();
        let num_nodes = tree.node_store().len();
        let codisp_before = tree.codisp(&7).unwrap();

        let result = tree.insert(100, points[7].clone()).unwrap();
        assert_eq!(result, AddResult::MassIncreased(2));
        assert_eq!(tree.node_store().len(), num_nodes);
        assert_eq!(tree.len(), 21);
        assert_eq!(tree.leaf(&100).unwrap().labels(), &[7, 100]);
        assert_eq!(tree.codisp(&100), tree.codisp(&7));
        // the leaf is heavier, so its siblings weigh less relative to its ancestors
        assert!(tree.codisp(&7).unwrap() <= codisp_before);
        check_tree(&tree);
    }

    #[test]
    fn test_duplicate_weighs_on_other_labels() {
        let mut tree: Tree<&str, f64> = Tree::build_with_seed(vec![("a", vec![0.0]), ("b", vec![1.0])], 4).unwrap();
        assert_eq!(tree.codisp(&"a"), Ok(0.5));
        assert_eq!(tree.codisp(&"b"), Ok(0.5));

        // masses count every label, so the heavier leaf displaces more
        tree.insert("a2", vec![0.0]).unwrap();
        assert_eq!(tree.num_leaves(), 2);
        assert_eq!(tree.codisp(&"b"), Ok(2.0 / 3.0));
        assert_eq!(tree.codisp(&"a"), Ok(1.0 / 3.0));
        assert_eq!(tree.codisp(&"a2"), Ok(1.0 / 3.0));

        tree.delete(&"a2").unwrap();
        assert_eq!(tree.codisp(&"b"), Ok(0.5));
    }

    #[test]
    fn test_check_insertion_does_not_mutate() {
        let mut tree: Tree<u32, f64> = Tree::new(2);
        assert!(tree.check_insertion(&0, &[1.0, 1.0]).is_ok());
        assert!(tree.is_empty());

        tree.insert(0, vec![-1.7e308, 0.0]).unwrap();
        tree.insert(1, vec![0.0, 0.0]).unwrap();
        let outline = tree.to_string();

        assert_eq!(tree.check_insertion(&1, &[2.0, 2.0]), Err(RCFError::DuplicateLabel));
        assert!(matches!(tree.check_insertion(&2, &[2.0]), Err(RCFError::InvalidArgument { .. })));
        assert!(matches!(tree.check_insertion(&2, &[1.7e308, 0.0]), Err(RCFError::InvalidArgument { .. })));
        assert!(matches!(tree.insert(2, vec![1.7e308, 0.0]), Err(RCFError::InvalidArgument { .. })));
        assert!(tree.check_insertion(&2, &[0.0, 1.0e300]).is_ok());
        assert_eq!(tree.to_string(), outline);
        check_tree(&tree);
    }

    #[test]
    fn test_insert_rejects_without_mutation() {
        let mut tree: Tree<&str, f64> = Tree::new(2);
        tree.insert("a", vec![0.0, 0.0]).unwrap();
        tree.insert("b", vec![1.0, 1.0]).unwrap();

        assert_eq!(tree.insert("a", vec![2.0, 2.0]), Err(RCFError::DuplicateLabel));
        assert!(matches!(tree.insert("c", vec![2.0]), Err(RCFError::InvalidArgument { .. })));
        assert!(matches!(
            tree.insert("c", vec![f64::INFINITY, 0.0]),
            Err(RCFError::InvalidArgument { .. })
        ));
        assert!(matches!(
            tree.insert("c", vec![f64::NAN, 0.0]),
            Err(RCFError::InvalidArgument { .. })
        ));
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.point(&"a").unwrap(), &[0.0, 0.0]);
        check_tree(&tree);
    }

    #[test]
    fn test_insert_signed_zero_is_duplicate() {
        let mut tree: Tree<u8, f64> = Tree::new(2);
        tree.insert(0, vec![0.0, 1.0]).unwrap();
        assert_eq!(tree.insert(1, vec![-0.0, 1.0]), Ok(AddResult::MassIncreased(2)));
        assert_eq!(tree.num_leaves(), 1);
    }

    #[test]
    fn test_insert_outside_and_inside_box() {
        let points = vec![(0, vec![0.0, 0.0]), (1, vec![4.0, 4.0]), (2, vec![0.0, 4.0])];
        let mut tree: Tree<i32, f64> = Tree::build_with_seed(points, 11).unwrap();

        // inside the root box: the root box is unchanged
        tree.insert(3, vec![2.0, 2.0]).unwrap();
        let bbox = tree.bounding_box().unwrap();
        assert_eq!(bbox.min_values(), &[0.0, 0.0]);
        assert_eq!(bbox.max_values(), &[4.0, 4.0]);

        // outside the root box: the root box grows
        tree.insert(4, vec![-1.0, 9.0]).unwrap();
        let bbox = tree.bounding_box().unwrap();
        assert_eq!(bbox.min_values(), &[-1.0, 0.0]);
        assert_eq!(bbox.max_values(), &[4.0, 9.0]);
        assert_eq!(tree.len(), 5);
        check_tree(&tree);
    }
}
