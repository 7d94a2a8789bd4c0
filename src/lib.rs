//! A Rust implementation of robust random cut trees and forests, a model-free
//! algorithm for anomaly detection on dynamic data streams.
//!
//! A robust random cut tree recursively partitions a set of labeled points
//! with random axis-aligned cuts. Points in sparse regions are isolated close
//! to the root; the collusive displacement ("codisp") of a point measures how
//! much the description of the rest of the data would change if the point
//! were removed, and serves as its anomaly score. Trees support streaming
//! insertion and deletion which keep the tree distributed as if it had been
//! built from scratch on the current point set.
//!
//! ```
//! use rrcflib::{RandomCutForest, RandomCutForestBuilder, Tree};
//!
//! // a single tree, built in batch and updated in place
//! let points = vec![
//!     ("a", vec![0.0, 0.0]),
//!     ("b", vec![0.0, 1.0]),
//!     ("c", vec![1.0, 0.0]),
//! ];
//! let mut tree: Tree<&str, f64> = Tree::build_with_seed(points, 17).unwrap();
//! tree.insert("outlier", vec![20.0, 20.0]).unwrap();
//! let score = tree.codisp(&"outlier").unwrap();
//! assert!(0.0 < score && score < 1.0);
//!
//! // a forest of sampled trees scoring a stream
//! let mut forest: RandomCutForest<u64, f32> = RandomCutForestBuilder::new(2)
//!     .num_trees(10)
//!     .sample_size(64)
//!     .random_seed(7)
//!     .build()
//!     .unwrap();
//! for i in 0..100u64 {
//!     forest.insert(i, vec![(i % 10) as f32, (i % 7) as f32]).unwrap();
//! }
//! ```
//!
//! ### References
//!
//! Sudipto Guha, Nina Mishra, Gourav Roy, and Okke Schrijvers. *"Robust random
//! cut forest based anomaly detection on streams."* International Conference
//! on Machine Learning, pp. 2712-2721. PMLR, 2016.

use std::fmt::{Debug, Display};
use std::iter::Sum;

pub mod errors;
pub use errors::RCFError;

pub mod types;
pub use types::{NodeKey, Result};

mod util;

mod store;
pub use store::NodeStore;

pub mod tree;
pub use tree::{
    BoundingBox, Branch, Cut, Leaf, Node, NodeTraverser, PointIndex, Side, Tree,
};

/// The tree of a robust random cut forest.
pub type RandomCutTree<L, T> = Tree<L, T>;

mod sampler;
pub use sampler::{SamplerResult, StreamSampler, WeightedSample};

mod sampled_tree;
pub use sampled_tree::{SampledTree, SampledUpdate};

mod random_cut_forest;
pub use random_cut_forest::{RandomCutForest, RandomCutForestBuilder, Reducer};

/// Floating point types usable as point coordinates.
pub trait RCFFloat: num::Float + Sum + Debug + Display + Send + Sync + 'static {}

impl<T> RCFFloat for T where T: num::Float + Sum + Debug + Display + Send + Sync + 'static {}
