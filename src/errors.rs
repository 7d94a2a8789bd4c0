use thiserror::Error;

/// Errors that can be returned by tree and forest operations.
///
/// Every operation validates its input before touching the tree, so an
/// error never leaves a partially applied mutation behind.
#[derive(Debug, Error, PartialEq)]
pub enum RCFError {
    #[error("invalid argument: {msg}")]
    InvalidArgument {
        msg: &'static str,
    },

    #[error("label is already present")]
    DuplicateLabel,

    #[error("label is not present")]
    UnknownLabel,

    #[error("the tree holds no points")]
    EmptyTree,
}
