use super::BoundingBox;
use super::Cut;
use crate::types::NodeKey;
use crate::RCFFloat;

/// A leaf node in a random cut tree.
///
/// A leaf holds one coordinate vector together with every label inserted at
/// exactly that coordinate. The number of labels is the leaf's mass; keeping
/// duplicates in a single leaf avoids zero-width cuts. The parent is `None`
/// only when the leaf is the root of the tree.
///
/// # Examples
///
/// ```
/// use rrcflib::Leaf;
///
/// let leaf: Leaf<&str, f64> = Leaf::new("a", vec![1.0, 2.0, 3.0]);
/// assert_eq!(leaf.point(), &[1.0, 2.0, 3.0]);
/// assert_eq!(leaf.labels(), &["a"]);
/// assert!(leaf.parent().is_none());
/// assert_eq!(leaf.mass(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct Leaf<L, T> {
    parent: Option<NodeKey>,
    labels: Vec<L>,
    point: Vec<T>,
}

impl<L: PartialEq, T> Leaf<L, T> {

    /// Create a new leaf node holding a single label.
    pub fn new(label: L, point: Vec<T>) -> Self {
        Leaf {
            parent: None,
            labels: vec![label],
            point: point,
        }
    }

    /// Create a new leaf node holding several labels at one coordinate.
    pub(crate) fn with_labels(labels: Vec<L>, point: Vec<T>) -> Self {
        debug_assert!(!labels.is_empty());
        Leaf {
            parent: None,
            labels: labels,
            point: point,
        }
    }

    /// Returns the key of the parent [`Branch`] node.
    pub fn parent(&self) -> Option<NodeKey> { self.parent }

    /// Returns the coordinates shared by every label of this leaf.
    pub fn point(&self) -> &[T] { &self.point }

    /// Returns the labels held by this leaf, in insertion order.
    pub fn labels(&self) -> &[L] { &self.labels }

    /// Returns the mass of this leaf node.
    pub fn mass(&self) -> u32 { self.labels.len() as u32 }

    /// Adds a label at this leaf's coordinate.
    pub(crate) fn push_label(&mut self, label: L) { self.labels.push(label); }

    /// Removes a label, returning whether it was held by this leaf.
    pub(crate) fn remove_label(&mut self, label: &L) -> bool {
        match self.labels.iter().position(|l| l == label) {
            Some(position) => {
                self.labels.remove(position);
                true
            }
            None => false,
        }
    }
}

/// A branch node in a random cut tree.
///
/// Branches contain node keys to their left and right children, which must
/// exist. They also own a bounding box on the points contained below this node
/// as well as a cut defining what data belongs to the left and right nodes.
/// The mass of a branch is the total mass of the leaves below it.
///
/// # Examples
///
/// ```
/// use rrcflib::{Cut, BoundingBox, Branch, Leaf, Node, NodeStore};
///
/// let mut node_store: NodeStore<&str, f32> = NodeStore::new();
///
/// // create some nodes and add then to a node store to get their keys
/// let left_key = node_store.insert(Node::Leaf(Leaf::new("a", vec![0.0, 1.0])));
/// let right_key = node_store.insert(Node::Leaf(Leaf::new("b", vec![2.0, 3.0])));
///
/// // create a bounding box and a cut on the bounding box
/// let bbox = BoundingBox::new(&[0.0, 1.0], &[2.0, 3.0]);
/// let cut = Cut::new(0, 0.7);
///
/// // create a new branch node from these data
/// let node = Branch::new(left_key, right_key, bbox, cut, 2);
/// assert_eq!(node.mass(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct Branch<T> {
    parent: Option<NodeKey>,
    left: NodeKey,
    right: NodeKey,
    mass: u32,
    bounding_box: BoundingBox<T>,
    cut: Cut<T>,
}

impl<T> Branch<T> {

    /// Create a new branch node.
    ///
    /// A valid branch node has a left node and a right node. The data at a
    /// branch node consists of a bounding box and a cut on that bounding box.
    /// The parent is initialized to `None`.
    pub fn new(
        left: NodeKey,
        right: NodeKey,
        bounding_box: BoundingBox<T>,
        cut: Cut<T>,
        mass: u32) -> Self
    {
        Branch {
            parent: None,
            left: left,
            right: right,
            mass: mass,
            bounding_box: bounding_box,
            cut: cut,
        }
    }

    /// Returns the key of the parent [`Branch`] node.
    pub fn parent(&self) -> Option<NodeKey> { self.parent }

    /// Returns the node key of the left child.
    pub fn left(&self) -> NodeKey { self.left }

    /// Sets the left child by node key.
    pub fn set_left(&mut self, left: NodeKey) { self.left = left }

    /// Returns the node key of the right child.
    pub fn right(&self) -> NodeKey { self.right }

    /// Sets the right child by node key.
    pub fn set_right(&mut self, right: NodeKey) { self.right = right }

    /// Replaces the child `old` by `new`, returning false if `old` is not a
    /// child of this branch.
    pub(crate) fn replace_child(&mut self, old: NodeKey, new: NodeKey) -> bool {
        if self.left == old {
            self.left = new;
        } else if self.right == old {
            self.right = new;
        } else {
            return false;
        }
        true
    }

    /// Returns the child that is not `child`.
    pub fn sibling_of(&self, child: NodeKey) -> Option<NodeKey> {
        if self.left == child {
            Some(self.right)
        } else if self.right == child {
            Some(self.left)
        } else {
            None
        }
    }

    /// Returns a reference to this node's bounding box.
    pub fn bounding_box(&self) -> &BoundingBox<T> { &self.bounding_box }

    /// Sets this node's bounding box to a new bounding box.
    pub fn set_bounding_box(&mut self, bounding_box: BoundingBox<T>) {
        self.bounding_box = bounding_box
    }

    /// Returns a reference to this node's random cut.
    pub fn cut(&self) -> &Cut<T> { &self.cut }

    /// Returns the mass of this branch node.
    pub fn mass(&self) -> u32 { self.mass }

    /// Increments the mass at this branch node by one.
    pub fn increment_mass(&mut self) { self.mass += 1 }

    /// Decrements the mass at this branch node by one.
    pub fn decrement_mass(&mut self) { self.mass -= 1 }
}

/// An enum type representing either a [`Branch`] node or a [`Leaf`] node.
///
/// Nodes stored in a random cut tree are all of type `Node`. The methods
/// defined for this enum type are mainly for convenience in working
/// agnostically with either leaves or branches.
#[derive(Clone, Debug)]
pub enum Node<L, T> {
    Leaf(Leaf<L, T>),
    Branch(Branch<T>),
}

impl<L: PartialEq, T: RCFFloat> Node<L, T> {

    /// Returns the key of the parent [`Branch`] node.
    pub fn parent(&self) -> Option<NodeKey> {
        match self {
            Node::Leaf(n) => n.parent,
            Node::Branch(n) => n.parent,
        }
    }

    /// Set the parent node by node key.
    pub fn set_parent(&mut self, parent: Option<NodeKey>) {
        match self {
            Node::Leaf(n) => n.parent = parent,
            Node::Branch(n) => n.parent = parent,
        }
    }

    /// Returns the mass of this node.
    pub fn mass(&self) -> u32 {
        match self {
            Node::Leaf(n) => n.mass(),
            Node::Branch(n) => n.mass,
        }
    }

    /// Returns true if this node is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// The `(min, max)` extent of the points below this node along one
    /// dimension. A leaf spans a single value.
    pub fn range(&self, dimension: usize) -> (T, T) {
        match self {
            Node::Leaf(n) => (n.point[dimension], n.point[dimension]),
            Node::Branch(n) => n.bounding_box.range(dimension),
        }
    }

    /// Returns the bounding box of the points below this node. For a leaf
    /// this is the zero-volume box around its point.
    pub fn to_bounding_box(&self) -> BoundingBox<T> {
        match self {
            Node::Leaf(n) => BoundingBox::new_from_point(&n.point),
            Node::Branch(n) => n.bounding_box.clone(),
        }
    }

    /// Returns the smallest box covering this node and `point`.
    pub fn merged_box_with_point(&self, point: &[T]) -> BoundingBox<T> {
        match self {
            Node::Leaf(n) => BoundingBox::merged_box_with_point(
                &BoundingBox::new_from_point(&n.point), point),
            Node::Branch(n) => BoundingBox::merged_box_with_point(&n.bounding_box, point),
        }
    }

    /// Get a reference to the leaf represented by this node.
    pub fn to_leaf(&self) -> Option<&Leaf<L, T>> {
        match self {
            Node::Leaf(n) => Some(n),
            Node::Branch(_) => None,
        }
    }

    /// Get a reference to the branch represented by this node.
    pub fn to_branch(&self) -> Option<&Branch<T>> {
        match self {
            Node::Leaf(_) => None,
            Node::Branch(n) => Some(n),
        }
    }
}
