use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use tracing::debug;

use crate::errors::RCFError;
use crate::store::NodeStore;
use crate::tree::{BoundingBox, Branch, Cut, Leaf, Node, PointIndex, Side};
use crate::types::{NodeKey, Result};
use crate::util::{check_argument, check_point, point_key, round_point};
use crate::RCFFloat;

/// Random cut tree data structure on labeled points.
///
/// A random cut tree contains leaf nodes and branch nodes. [`Leaf`] nodes
/// live at the leaves of the tree and hold a point together with every label
/// inserted at that point. [`Branch`] nodes contain a [`BoundingBox`] on all
/// of the points in their subtree, the number of points below them, and the
/// random [`Cut`] separating their two children.
///
/// Nodes live in a [`NodeStore`] owned by the tree: a branch refers to its
/// children by key and every node refers to its parent by key. A
/// [`PointIndex`] maps each label to the leaf holding it.
///
/// Randomness comes from a [`ChaCha8Rng`] owned by the tree; seed it with
/// [`Tree::seed`] or construct the tree with [`Tree::with_rng`] for
/// reproducible trees.
///
/// # Examples
///
/// ```
/// use rrcflib::Tree;
///
/// // build a tree from a batch of labeled points
/// let points = vec![
///     ("a", vec![0.0, 0.0]),
///     ("b", vec![0.0, 1.0]),
///     ("c", vec![10.0, 10.0]),
/// ];
/// let mut tree: Tree<&str, f64> = Tree::build_with_seed(points, 42).unwrap();
/// assert_eq!(tree.num_leaves(), 3);
/// assert_eq!(tree.num_branches(), 2);
///
/// // stream another point in and score it
/// tree.insert("d", vec![0.5, 0.5]).unwrap();
/// let score = tree.codisp(&"d").unwrap();
/// assert!(0.0 < score && score < 1.0);
///
/// // forget a point
/// tree.delete(&"c").unwrap();
/// assert_eq!(tree.len(), 3);
/// ```
pub struct Tree<L, T> {
    node_store: NodeStore<L, T>,
    root_node: Option<NodeKey>,
    point_index: PointIndex<L>,
    dimensions: usize,
    precision: Option<u32>,
    rng: ChaCha8Rng,
}

/// A distinct coordinate together with every label observed at it.
struct PointGroup<L, T> {
    labels: Vec<L>,
    point: Vec<T>,
}

impl<L, T> Tree<L, T>
where
    L: Hash + Eq + Clone,
    T: RCFFloat,
{

    /// Create a new empty `Tree` on points of the given dimensionality.
    ///
    /// The random number generator is seeded from the operating system; use
    /// [`Tree::seed`] or [`Tree::with_rng`] for reproducible trees.
    pub fn new(dimensions: usize) -> Self {
        Tree::with_rng(dimensions, ChaCha8Rng::from_entropy())
    }

    /// Create a new empty `Tree` drawing its random cuts from `rng`.
    pub fn with_rng(dimensions: usize, rng: ChaCha8Rng) -> Self {
        Tree {
            node_store: NodeStore::new(),
            root_node: None,
            point_index: PointIndex::new(),
            dimensions: dimensions,
            precision: None,
            rng: rng,
        }
    }

    /// Round every ingested coordinate to `decimals` decimal places.
    ///
    /// Rounding makes nearly identical measurements share a leaf instead of
    /// being separated by extremely thin cuts. It applies to points built,
    /// inserted, or queried after this call.
    ///
    /// # Examples
    ///
    /// ```
    /// use rrcflib::Tree;
    ///
    /// let mut tree: Tree<u32, f64> = Tree::new(1).precision(2);
    /// tree.insert(0, vec![0.1234]).unwrap();
    /// tree.insert(1, vec![0.1230]).unwrap();
    /// assert_eq!(tree.num_leaves(), 1);
    /// assert_eq!(tree.point(&1).unwrap(), &[0.12]);
    /// ```
    pub fn precision(mut self, decimals: u32) -> Self {
        self.precision = Some(decimals);
        self
    }

    /// Build a tree from a batch of labeled points.
    ///
    /// The dimensionality of the tree is taken from the first point. See
    /// [`Tree::populate`] for the construction algorithm and failure modes.
    pub fn build<I>(points: I) -> Result<Self>
        where I: IntoIterator<Item = (L, Vec<T>)>
    {
        Tree::build_with_rng(points, ChaCha8Rng::from_entropy())
    }

    /// Build a tree from a batch of labeled points using a seeded generator.
    pub fn build_with_seed<I>(points: I, seed: u64) -> Result<Self>
        where I: IntoIterator<Item = (L, Vec<T>)>
    {
        Tree::build_with_rng(points, ChaCha8Rng::seed_from_u64(seed))
    }

    /// Build a tree from a batch of labeled points drawing cuts from `rng`.
    pub fn build_with_rng<I>(points: I, rng: ChaCha8Rng) -> Result<Self>
        where I: IntoIterator<Item = (L, Vec<T>)>
    {
        let points: Vec<(L, Vec<T>)> = points.into_iter().collect();
        check_argument(!points.is_empty(), "cannot build a tree from an empty point set")?;
        let mut tree = Tree::with_rng(points[0].1.len(), rng);
        tree.populate(points)?;
        Ok(tree)
    }

    /// Populate an empty tree from a batch of labeled points.
    ///
    /// Points with identical coordinates are merged into a single leaf. The
    /// remaining distinct points are partitioned recursively: a dimension is
    /// drawn with probability proportional to the extent of the points along
    /// it, a cut value is drawn uniformly inside that extent, and the points
    /// at or below the cut form the left subtree.
    ///
    /// Fails with `InvalidArgument` if the tree is not empty, the batch is
    /// empty, or a point has the wrong dimensionality or a non-finite
    /// component, and with `DuplicateLabel` if a label repeats. Nothing is
    /// modified on failure.
    pub fn populate<I>(&mut self, points: I) -> Result<()>
        where I: IntoIterator<Item = (L, Vec<T>)>
    {
        check_argument(self.is_empty(), "can only populate an empty tree")?;

        let mut groups: Vec<PointGroup<L, T>> = Vec::new();
        let mut group_of_point: HashMap<Vec<(u64, i16, i8)>, usize> = HashMap::new();
        let mut seen: HashSet<L> = HashSet::new();
        let mut num_points = 0;
        for (label, point) in points {
            let point = self.prepare_point(point)?;
            if !seen.insert(label.clone()) {
                return Err(RCFError::DuplicateLabel);
            }
            match group_of_point.entry(point_key(&point)) {
                Entry::Occupied(entry) => groups[*entry.get()].labels.push(label),
                Entry::Vacant(entry) => {
                    entry.insert(groups.len());
                    groups.push(PointGroup { labels: vec![label], point: point });
                }
            }
            num_points += 1;
        }
        check_argument(!groups.is_empty(), "cannot build a tree from an empty point set")?;
        let extent = PointGroup::bounding_box(&groups);
        check_argument(extent.range_sum().is_finite(), "point set extent overflows")?;

        debug!(num_points, num_leaves = groups.len(), "building random cut tree");
        let root_key = self.build_subtree(groups, extent)?;
        self.root_node = Some(root_key);
        Ok(())
    }

    /// Recursively builds the subtree on `groups`, whose bounding box is
    /// `bounding_box`, and returns the key of its root.
    fn build_subtree(
        &mut self,
        groups: Vec<PointGroup<L, T>>,
        bounding_box: BoundingBox<T>,
    ) -> Result<NodeKey> {
        // a box with no extent holds a single distinct coordinate
        if bounding_box.range_sum() == T::zero() {
            let point = bounding_box.min_values().to_vec();
            let labels: Vec<L> = groups.into_iter().flat_map(|g| g.labels).collect();
            let leaf_key = self.insert_node(Node::Leaf(Leaf::with_labels(labels.clone(), point)));
            for label in labels {
                self.point_index.insert(label, leaf_key)?;
            }
            return Ok(leaf_key);
        }

        // a cut inside the box always leaves points on both sides; the check
        // only guards against rounding at the edges of the box
        let cut = loop {
            let cut = Cut::new_random_cut(&bounding_box, &mut self.rng)?;
            let num_left = groups.iter().filter(|g| Cut::is_left_of(&g.point, &cut)).count();
            if 0 < num_left && num_left < groups.len() {
                break cut;
            }
        };
        let (left_groups, right_groups): (Vec<_>, Vec<_>) = groups
            .into_iter()
            .partition(|g| Cut::is_left_of(&g.point, &cut));

        let left_box = PointGroup::bounding_box(&left_groups);
        let right_box = PointGroup::bounding_box(&right_groups);
        let left = self.build_subtree(left_groups, left_box)?;
        let right = self.build_subtree(right_groups, right_box)?;

        let mass = self.get_node(left).mass() + self.get_node(right).mass();
        let branch = Branch::new(left, right, bounding_box, cut, mass);
        let branch_key = self.insert_node(Node::Branch(branch));
        self.get_node_mut(left).set_parent(Some(branch_key));
        self.get_node_mut(right).set_parent(Some(branch_key));
        Ok(branch_key)
    }

    /// Re-initializes the tree's random number generator with a seed.
    ///
    /// Random cut trees use the [`ChaCha8Rng`][cha] random number generator.
    /// It has fast initialization, high throughput and relatively small memory
    /// footprint.
    ///
    /// [cha]: https://rust-random.github.io/rand/rand_chacha/struct.ChaCha8Rng.html
    pub fn seed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    #[inline(always)]
    pub fn root_node(&self) -> Option<NodeKey> { self.root_node }

    #[inline(always)]
    pub(crate) fn set_root_node(&mut self, root_key: Option<NodeKey>) {
        self.root_node = root_key;
    }

    #[inline(always)]
    pub fn node_store(&self) -> &NodeStore<L, T> { &self.node_store }

    #[inline(always)]
    pub(crate) fn point_index(&self) -> &PointIndex<L> { &self.point_index }

    #[inline(always)]
    pub(crate) fn point_index_mut(&mut self) -> &mut PointIndex<L> { &mut self.point_index }

    #[inline(always)]
    pub fn rng_mut(&mut self) -> &mut ChaCha8Rng { &mut self.rng }

    /// Dimensionality of the points held by this tree.
    pub fn dimensions(&self) -> usize { self.dimensions }

    /// Returns the mass of the tree: the number of labels it holds,
    /// duplicates included.
    ///
    /// # Examples
    ///
    /// ```
    /// use rrcflib::Tree;
    ///
    /// let mut tree: Tree<u32, f32> = Tree::new(2);
    /// assert_eq!(tree.len(), 0);
    ///
    /// tree.insert(0, vec![0.0, 0.0]).unwrap();
    /// tree.insert(1, vec![1.0, 1.0]).unwrap();
    /// tree.insert(2, vec![0.0, 0.0]).unwrap();
    /// assert_eq!(tree.len(), 3);
    /// assert_eq!(tree.num_leaves(), 2);
    /// ```
    pub fn len(&self) -> usize {
        match self.root_node {
            None => 0,
            Some(key) => self.get_node(key).mass() as usize,
        }
    }

    pub fn is_empty(&self) -> bool { self.root_node.is_none() }

    /// Number of leaves, i.e. distinct coordinates, in the tree.
    pub fn num_leaves(&self) -> usize {
        self.node_store.iter().filter(|(_, node)| node.is_leaf()).count()
    }

    /// Number of branch nodes in the tree.
    pub fn num_branches(&self) -> usize {
        self.node_store.len() - self.num_leaves()
    }

    /// Returns true if the tree holds `label`.
    pub fn contains(&self, label: &L) -> bool { self.point_index.contains(label) }

    /// Iterate over the labels held by the tree in arbitrary order.
    pub fn labels(&self) -> impl Iterator<Item = &L> + '_ {
        self.point_index.labels()
    }

    /// Iterate over the leaves of the tree in arbitrary order.
    pub fn leaves(&self) -> impl Iterator<Item = &Leaf<L, T>> + '_ {
        self.node_store.iter().filter_map(|(_, node)| node.to_leaf())
    }

    /// Bounding box of every point in the tree, or `None` for an empty tree.
    pub fn bounding_box(&self) -> Option<BoundingBox<T>> {
        self.root_node.map(|key| self.get_node(key).to_bounding_box())
    }

    /// Returns the coordinates stored for `label`.
    pub fn point(&self, label: &L) -> Result<&[T]> {
        let leaf_key = self.point_index.get(label)?;
        Ok(self.expect_leaf(leaf_key).point())
    }

    /// Returns the leaf holding `label`.
    pub fn leaf(&self, label: &L) -> Result<&Leaf<L, T>> {
        let leaf_key = self.point_index.get(label)?;
        Ok(self.expect_leaf(leaf_key))
    }

    /// Number of branches between the root and the leaf holding `label`.
    pub fn depth(&self, label: &L) -> Result<usize> {
        let leaf_key = self.point_index.get(label)?;
        Ok(self.ancestors(leaf_key).count())
    }

    /// Returns an iterator on nodes from the root to the leaf reached by
    /// following the cuts with `point`.
    ///
    /// The reached leaf is the leaf approximately closest to the query point
    /// relative to the random cuts chosen in the tree. See [`NodeTraverser`].
    ///
    /// # Examples
    ///
    /// ```
    /// use rrcflib::{Node, Tree};
    ///
    /// let mut tree: Tree<u32, f32> = Tree::new(2);
    /// tree.seed(0);
    /// tree.insert(0, vec![0.0, 1.0]).unwrap();
    ///
    /// // check that we recover the only node in the tree
    /// let query = vec![0.1, 0.9];
    /// let nodes: Vec<&Node<u32, f32>> = tree.traverse(&query).collect();
    /// assert_eq!(nodes.len(), 1);
    ///
    /// // after adding a second point the traversal passes through one branch
    /// tree.insert(1, vec![-1.0, -2.0]).unwrap();
    /// let nodes: Vec<&Node<u32, f32>> = tree.traverse(&query).collect();
    /// assert_eq!(nodes.len(), 2);
    /// ```
    pub fn traverse<'a>(&'a self, point: &'a [T]) -> NodeTraverser<'a, L, T> {
        NodeTraverser::new(self, point)
    }

    /// Returns the labels of the leaf reached by following the cuts with
    /// `point`.
    ///
    /// Fails with `EmptyTree` when the tree holds no points and with
    /// `InvalidArgument` for a malformed point.
    pub fn query(&self, point: &[T]) -> Result<&[L]> {
        check_point(point, self.dimensions)?;
        if self.is_empty() {
            return Err(RCFError::EmptyTree);
        }
        let point = self.rounded(point);
        let leaf_key = self.nearest_leaf(&point)?;
        Ok(self.expect_leaf(leaf_key).labels())
    }

    /// Returns the labels stored at exactly `point`, if any.
    pub fn find_duplicate(&self, point: &[T]) -> Option<&[L]> {
        if point.len() != self.dimensions {
            return None;
        }
        let point = self.rounded(point);
        self.find_duplicate_leaf(&point)
            .map(|leaf_key| self.expect_leaf(leaf_key).labels())
    }

    /// Displacement of `label`: the mass of the sibling of its leaf, that
    /// is, the number of points whose position in the tree would change if
    /// the leaf were removed. The root leaf has displacement zero.
    pub fn disp(&self, label: &L) -> Result<u32> {
        if self.is_empty() {
            return Err(RCFError::EmptyTree);
        }
        let leaf_key = self.point_index.get(label)?;
        Ok(match self.get_parent(leaf_key) {
            None => 0,
            Some(parent_key) => {
                let sibling_key = self.sibling_of(leaf_key, parent_key);
                self.get_node(sibling_key).mass()
            }
        })
    }

    /// Collusive displacement of `label`.
    ///
    /// Walks from the leaf holding `label` to the root. At every ancestor `A`
    /// the displacement ratio is the mass of the child of `A` that is not on
    /// the path divided by the mass of `A`. The score is the largest ratio on
    /// the path and lies in `[0, 1)`; points in sparse regions score high.
    /// A tree consisting of a single leaf scores zero.
    ///
    /// Fails with `EmptyTree` on an empty tree and `UnknownLabel` if the label
    /// is not held by the tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use rrcflib::Tree;
    ///
    /// let points = vec![("a", vec![0.0]), ("b", vec![1.0])];
    /// let tree: Tree<&str, f64> = Tree::build_with_seed(points, 1).unwrap();
    /// assert_eq!(tree.codisp(&"a").unwrap(), 0.5);
    /// ```
    pub fn codisp(&self, label: &L) -> Result<f64> {
        if self.is_empty() {
            return Err(RCFError::EmptyTree);
        }
        let leaf_key = self.point_index.get(label)?;

        let mut max_ratio: f64 = 0.0;
        let mut child_key = leaf_key;
        for ancestor_key in self.ancestors(leaf_key) {
            let ancestor_mass = self.get_node(ancestor_key).mass();
            let sibling_key = self.sibling_of(child_key, ancestor_key);
            let sibling_mass = self.get_node(sibling_key).mass();
            max_ratio = max_ratio.max(sibling_mass as f64 / ancestor_mass as f64);
            child_key = ancestor_key;
        }
        Ok(max_ratio)
    }

    /// Iterate over the keys of the ancestors of a node, nearest first.
    pub(crate) fn ancestors(&self, node_key: NodeKey) -> impl Iterator<Item = NodeKey> + '_ {
        std::iter::successors(self.get_parent(node_key), move |&key| self.get_parent(key))
    }

    /// Validates a point against the tree and applies the configured rounding.
    pub(crate) fn prepare_point(&self, mut point: Vec<T>) -> Result<Vec<T>> {
        check_point(&point, self.dimensions)?;
        if let Some(decimals) = self.precision {
            round_point(&mut point, decimals);
        }
        Ok(point)
    }

    fn rounded(&self, point: &[T]) -> Vec<T> {
        let mut point = point.to_vec();
        if let Some(decimals) = self.precision {
            round_point(&mut point, decimals);
        }
        point
    }

    /// Follow the cuts with `point` down to a leaf.
    pub(crate) fn nearest_leaf(&self, point: &[T]) -> Result<NodeKey> {
        let mut node_key = self.root_node.ok_or(RCFError::EmptyTree)?;
        while let Node::Branch(branch) = self.get_node(node_key) {
            node_key = match branch.cut().side_of(point) {
                Side::Left => branch.left(),
                Side::Right => branch.right(),
            };
        }
        Ok(node_key)
    }

    /// Returns the key of the leaf storing exactly `point`, if any.
    pub(crate) fn find_duplicate_leaf(&self, point: &[T]) -> Option<NodeKey> {
        let leaf_key = self.nearest_leaf(point).ok()?;
        match self.get_node(leaf_key) {
            Node::Leaf(leaf) if leaf.point() == point => Some(leaf_key),
            _ => None,
        }
    }

    /// Returns the key of the other child of `parent_key`.
    pub(crate) fn sibling_of(&self, node_key: NodeKey, parent_key: NodeKey) -> NodeKey {
        match self.get_node(parent_key) {
            Node::Branch(parent) => match parent.sibling_of(node_key) {
                Some(sibling_key) => sibling_key,
                None => panic!("Inconsistent node: parent does not have node as a child"),
            },
            Node::Leaf(_) => panic!("Inconsistent node: parents cannot be leaves"),
        }
    }

    fn expect_leaf(&self, node_key: NodeKey) -> &Leaf<L, T> {
        match self.get_node(node_key) {
            Node::Leaf(leaf) => leaf,
            Node::Branch(_) => panic!("Inconsistent node: expected leaf"),
        }
    }

    // ########################################################################
    // Node store helper functions
    // ########################################################################

    #[inline(always)]
    pub(crate) fn insert_node(&mut self, node: Node<L, T>) -> NodeKey {
        self.node_store.insert(node)
    }

    #[inline(always)]
    pub fn get_node(&self, node_key: NodeKey) -> &Node<L, T> {
        match self.node_store.get(node_key) {
            Some(node) => node,
            None => panic!("Inconsistent node: dangling node key {}", node_key),
        }
    }

    #[inline(always)]
    pub(crate) fn get_node_mut(&mut self, node_key: NodeKey) -> &mut Node<L, T> {
        match self.node_store.get_mut(node_key) {
            Some(node) => node,
            None => panic!("Inconsistent node: dangling node key {}", node_key),
        }
    }

    #[inline(always)]
    pub(crate) fn remove_node(&mut self, node_key: NodeKey) -> Node<L, T> {
        self.node_store.remove(node_key)
    }

    #[inline(always)]
    pub(crate) fn get_parent(&self, node_key: NodeKey) -> Option<NodeKey> {
        self.get_node(node_key).parent()
    }

    #[inline(always)]
    pub(crate) fn point_inside_node(&self, point: &[T], node_key: NodeKey) -> bool {
        match self.get_node(node_key) {
            Node::Leaf(_) => false,
            Node::Branch(branch) => branch.bounding_box().contains_point(point),
        }
    }
}

impl<L, T: RCFFloat> PointGroup<L, T> {
    fn bounding_box(groups: &[PointGroup<L, T>]) -> BoundingBox<T> {
        let mut bounding_box = BoundingBox::new_from_point(&groups[0].point);
        for group in groups[1..].iter() {
            bounding_box = BoundingBox::merged_box_with_point(&bounding_box, &group.point);
        }
        bounding_box
    }
}

/// A textual outline of the tree, one node per line.
///
/// ```text
/// ─+
///  ├──(0)
///  └───+
///      ├──(1)
///      └──(2, 3)
/// ```
impl<L, T> fmt::Display for Tree<L, T>
where
    L: Hash + Eq + Clone + fmt::Debug,
    T: RCFFloat,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root_node {
            None => writeln!(f, "(empty)"),
            Some(root_key) => self.write_outline(f, root_key, &mut String::new()),
        }
    }
}

impl<L, T> Tree<L, T>
where
    L: Hash + Eq + Clone + fmt::Debug,
    T: RCFFloat,
{
    fn write_outline(
        &self,
        f: &mut fmt::Formatter<'_>,
        node_key: NodeKey,
        indent: &mut String,
    ) -> fmt::Result {
        match self.get_node(node_key) {
            Node::Leaf(leaf) => {
                let labels: Vec<String> = leaf.labels().iter().map(|l| format!("{:?}", l)).collect();
                writeln!(f, "({})", labels.join(", "))
            }
            Node::Branch(branch) => {
                writeln!(f, "─+")?;
                write!(f, "{} ├──", indent)?;
                indent.push_str(" │  ");
                self.write_outline(f, branch.left(), indent)?;
                indent.truncate(indent.len() - " │  ".len());
                write!(f, "{} └──", indent)?;
                indent.push_str("    ");
                self.write_outline(f, branch.right(), indent)?;
                indent.truncate(indent.len() - "    ".len());
                Ok(())
            }
        }
    }
}


/// A type for traversing nodes from root to the nearest leaf.
///
/// Given an input data point/vector, this type traces the path from the root
/// node of a tree to the leaf node nearest to the input. Returned by
/// [`Tree::traverse`].
pub struct NodeTraverser<'a, L, T> {
    tree: &'a Tree<L, T>,
    point: &'a [T],
    current_node_key: Option<NodeKey>,
}

impl<'a, L, T> NodeTraverser<'a, L, T>
where
    L: Hash + Eq + Clone,
    T: RCFFloat,
{
    /// Create a new node traverser from a tree and a query point.
    pub fn new(tree: &'a Tree<L, T>, point: &'a [T]) -> Self {
        NodeTraverser {
            tree: tree,
            point: point,
            current_node_key: tree.root_node(),
        }
    }

    /// Return the key of the next node in a traversal.
    fn next_node_key(&self, node: &Node<L, T>) -> Option<NodeKey> {
        match node {
            Node::Leaf(_) => None,
            Node::Branch(node) => match node.cut().side_of(self.point) {
                Side::Left => Some(node.left()),
                Side::Right => Some(node.right()),
            },
        }
    }
}

impl<'a, L, T> Iterator for NodeTraverser<'a, L, T>
where
    L: Hash + Eq + Clone,
    T: RCFFloat,
{
    type Item = &'a Node<L, T>;

    fn next(&mut self) -> Option<&'a Node<L, T>> {
        let node_key = self.current_node_key?;
        let node = self.tree.get_node(node_key);
        self.current_node_key = self.next_node_key(node);
        Some(node)
    }
}
