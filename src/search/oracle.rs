use serde::Serialize;

use crate::tree::{NodeId, Tree};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VisitStats {
    pub leaf_visits: u64,
    pub interior_visits: u64,
}

impl VisitStats {
    pub fn total(&self) -> u64 { self.leaf_visits + self.interior_visits }
}

// Leaf scores are stored from the root's side; flip them for the opponent's leaves.
fn leaf_score(tree: &Tree, node: NodeId, orig_depth: u32) -> f32 {
    let v = tree.node(node).value;
    if orig_depth % 2 == 0 { v } else { -v }
}

/// Plain negamax over every node. Records the first strictly-best child at each interior node.
pub fn negamax(tree: &mut Tree, node: NodeId, depth: u32, orig_depth: u32, stats: &mut VisitStats) -> f32 {
    if depth == 0 {
        stats.leaf_visits += 1;
        return leaf_score(tree, node, orig_depth);
    }
    stats.interior_visits += 1;
    let mut best_score = -super::INF;
    let mut best_child = 0usize;
    for (i, child) in tree.children(node).enumerate() {
        let score = -negamax(tree, child, depth - 1, orig_depth, stats);
        if score > best_score { best_score = score; best_child = i; }
    }
    let n = tree.node_mut(node);
    n.best = Some(n.first_child + best_child);
    best_score
}

/// Fail-hard alpha-beta: returns `beta` as soon as a child reaches it.
pub fn alpha_beta(tree: &mut Tree, node: NodeId, depth: u32, orig_depth: u32, mut alpha: f32, beta: f32, stats: &mut VisitStats) -> f32 {
    if depth == 0 {
        stats.leaf_visits += 1;
        return leaf_score(tree, node, orig_depth);
    }
    stats.interior_visits += 1;
    let mut best_child = 0usize;
    for (i, child) in tree.children(node).enumerate() {
        let score = -alpha_beta(tree, child, depth - 1, orig_depth, -beta, -alpha, stats);
        if score >= beta { return beta; }
        if score > alpha { alpha = score; best_child = i; }
    }
    let n = tree.node_mut(node);
    n.best = Some(n.first_child + best_child);
    alpha
}
