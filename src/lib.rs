pub mod error;
pub mod harness;
pub mod search;
pub mod tree;

pub use error::{SearchError, TreeError};
pub use search::{alpha_beta, explore_tree, negamax, sss_star};
pub use tree::{generate, NodeId, Tree, TreeParams};
