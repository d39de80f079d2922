pub mod frontier;
pub mod oracle;
pub mod sss;

pub use frontier::{explore_tree, FrontierParams, FrontierSearcher, FrontierStats};
pub use oracle::{alpha_beta, negamax, VisitStats};
pub use sss::{sss_star, SssParams, SssSearcher, SssStats};

use crate::error::SearchError;
use crate::tree::Tree;

pub const INF: f32 = f32::INFINITY;

/// A value some ancestor already has, seen from that ancestor's side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bound {
    pub value: f32,
    /// Side of the ancestor owning the bound.
    pub maximizing: bool,
}

impl Bound {
    pub fn new(value: f32, maximizing: bool) -> Self { Self { value, maximizing } }

    /// Strict: a tie never beats the bound.
    pub fn beaten_by(&self, v: f32) -> bool { improves(self.maximizing, v, self.value) }
}

/// `a` is strictly better than `b` for the given side.
#[inline]
pub fn improves(maximizing: bool, a: f32, b: f32) -> bool { if maximizing { a > b } else { a < b } }

pub(crate) fn check_depth(tree: &Tree, depth: u32) -> Result<(), SearchError> {
    if depth != tree.depth() { return Err(SearchError::DepthMismatch { requested: depth, actual: tree.depth() }); }
    Ok(())
}
