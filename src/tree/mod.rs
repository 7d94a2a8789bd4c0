//! Submodule containing types and components of a random cut tree.
//!
mod bounding_box;
pub use bounding_box::BoundingBox;

mod cut;
pub use cut::{Cut, Side};

mod node;
pub use node::{Branch, Leaf, Node};

mod point_index;
pub use point_index::PointIndex;

#[allow(clippy::module_inception)]
mod tree;
pub use tree::{NodeTraverser, Tree};

mod tree_point_addition;
pub use tree_point_addition::AddResult;

mod point_deleter;
pub use point_deleter::{DeleteResult, PointDeleter};
