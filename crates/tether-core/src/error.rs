use thiserror::Error;

use crate::view::ViewTag;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("no view with tag {0}")]
    UnknownNode(ViewTag),

    #[error("a view with tag {0} already exists")]
    DuplicateNode(ViewTag),

    #[error("inserting {node} under {parent} would make it its own ancestor")]
    CycleDetected { node: ViewTag, parent: ViewTag },

    #[error("view {node} is not inside root {root}")]
    NotDescendant { node: ViewTag, root: ViewTag },

    #[error("transform of view {0} is not invertible")]
    NotInvertible(ViewTag),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
