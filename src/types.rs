use crate::errors::RCFError;

pub type Result<T> = std::result::Result<T, RCFError>;

/// Key of a node inside a tree's [`NodeStore`](crate::NodeStore).
pub type NodeKey = usize;
