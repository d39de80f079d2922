use thiserror::Error;

/// Problems building a tree, either from generator parameters or an explicit shape.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("branching bound must be between 1 and {max}, got {got}")]
    InvalidBranching { got: u32, max: u32 },

    #[error("depth {got} exceeds the supported maximum of {max}")]
    DepthTooLarge { got: u32, max: u32 },

    #[error("interior node at level {level} has no children")]
    EmptyInterior { level: u32 },

    #[error("leaves must all sit at depth {expected}, found one at depth {found}")]
    RaggedLeaves { expected: u32, found: u32 },

    #[error("tree would exceed {limit} nodes")]
    TooManyNodes { limit: usize },

    #[error("a uniform tree of this shape has {expected} leaves, {got} values were given")]
    LeafCount { expected: usize, got: usize },
}

/// Configuration errors reported by a search. Any of these makes the search result meaningless.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("search depth {requested} does not match tree depth {actual}")]
    DepthMismatch { requested: u32, actual: u32 },

    #[error("OPEN list capacity of {capacity} entries exceeded (tree too large or deep for the configured capacity)")]
    OpenListOverflow { capacity: usize },

    #[error(transparent)]
    Tree(#[from] TreeError),
}
