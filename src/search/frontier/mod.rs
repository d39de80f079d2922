//! Non-recursive alpha-beta over explicit frontiers.
//!
//! The tree below a search root is materialized one level at a time as PV,
//! CUT and ALL nodes until the wave reaches the nodes just above the leaves.
//! Those nodes form the frontier. After evaluation the frontier is scanned
//! left to right: entries that cannot beat the bound of their nearest PV
//! ancestor are ignored, the rest start an upward walk that may materialize
//! further children of CUT nodes through bounded subtree searches.
//!
//! Per-node work inside one wave never reads another node of the same wave,
//! so waves are mapped with rayon once they are long enough to pay for it.

mod expand;
mod wave;

use rayon::prelude::*;
use serde::Serialize;

use crate::error::SearchError;
use crate::search::{check_depth, Bound};
use crate::tree::{NodeClass, NodeId, Tree, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrontierParams {
    /// Map waves with rayon.
    pub parallel: bool,
    /// Shorter waves are processed inline.
    pub parallel_min_wave: usize,
}

impl Default for FrontierParams {
    fn default() -> Self { Self { parallel: true, parallel_min_wave: 512 } }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrontierStats {
    pub passes: u64,
    pub expansions: u64,
    pub subtree_searches: u64,
    pub leaf_evals: u64,
    pub refuted: u64,
    pub pruned: u64,
}

/// Where entries of a frontier take their bound from.
#[derive(Clone, Copy, Debug, PartialEq)]
enum BoundSource {
    /// Current value of the nearest PV ancestor.
    Pv,
    Fixed(Bound),
}

/// Waves materialized below one search root. The last wave is the frontier.
struct Frontier {
    root: NodeId,
    waves: Vec<Vec<NodeId>>,
    source: BoundSource,
}

impl Frontier {
    fn entries(&self) -> &[NodeId] {
        self.waves.last().map(Vec::as_slice).unwrap_or_default()
    }

    fn bound_for(&self, tree: &Tree, entry: NodeId) -> Bound {
        match self.source {
            BoundSource::Fixed(b) => b,
            BoundSource::Pv => {
                let mut cur = entry;
                loop {
                    let parent = tree.node(cur).parent
                        .unwrap_or_else(|| panic!("frontier entry {entry} has no PV ancestor"));
                    let p = tree.node(parent);
                    if p.class == Some(NodeClass::Pv) { return Bound::new(p.value, p.maximizing); }
                    cur = parent;
                }
            }
        }
    }
}

fn map_wave<T, F>(params: &FrontierParams, wave: &[NodeId], f: F) -> Vec<T>
where
    T: Send,
    F: Fn(NodeId) -> T + Sync + Send,
{
    if params.parallel && wave.len() >= params.parallel_min_wave {
        wave.par_iter().map(|&id| f(id)).collect()
    } else {
        wave.iter().map(|&id| f(id)).collect()
    }
}

#[derive(Default)]
pub struct FrontierSearcher {
    params: FrontierParams,
    stats: FrontierStats,
}

impl FrontierSearcher {
    pub fn new(params: FrontierParams) -> Self { Self { params, stats: FrontierStats::default() } }

    pub fn stats(&self) -> FrontierStats { self.stats }

    /// Minimax value of the whole tree. Leaves `best` links along the
    /// principal variation and resets any state left by an earlier search.
    pub fn explore_tree(&mut self, tree: &mut Tree, depth: u32) -> Result<f32, SearchError> {
        check_depth(tree, depth)?;
        tree.reset_search_state();
        self.stats = FrontierStats::default();
        let root = tree.root();
        if tree.is_leaf(root) {
            self.stats.leaf_evals += 1;
            return Ok(tree.node(root).value);
        }
        let frontier = self.build(tree, root, NodeClass::Pv, BoundSource::Pv);
        seed_pv(tree, &frontier);
        self.converge(tree, &frontier);
        let value = tree.node(root).value;
        log::debug!(
            "frontier search depth={} value={} passes={} expansions={} subtrees={} leaves={}",
            depth, value, self.stats.passes, self.stats.expansions, self.stats.subtree_searches, self.stats.leaf_evals
        );
        Ok(value)
    }

    /// Bounded search of a child just materialized under a CUT node: returns
    /// `bound.value` when the subtree cannot beat `bound`, else its exact value.
    fn explore_subtree(&mut self, tree: &mut Tree, node: NodeId, bound: Bound) -> f32 {
        self.stats.subtree_searches += 1;
        if tree.is_leaf(node) {
            self.stats.leaf_evals += 1;
            let v = tree.node(node).value;
            return if bound.beaten_by(v) { v } else { bound.value };
        }
        assert_eq!(
            tree.node(node).maximizing, bound.maximizing,
            "subtree root {node} must play for the side owning bound {bound:?}"
        );
        let frontier = self.build(tree, node, NodeClass::All, BoundSource::Fixed(bound));
        self.converge(tree, &frontier);
        let n = tree.node(node);
        log::trace!("subtree {} against {:?}: {:?} {}", node, bound, n.verdict, n.value);
        match n.verdict {
            Verdict::Exact => n.value,
            Verdict::Refuted => bound.value,
            Verdict::Open => panic!("subtree search at node {node} ended without settling its root"),
        }
    }

    fn build(&mut self, tree: &mut Tree, root: NodeId, class: NodeClass, source: BoundSource) -> Frontier {
        let waves = wave::build_waves(tree, root, class, &self.params);
        let entries = waves.last().map(Vec::as_slice).unwrap_or_default();
        self.stats.leaf_evals += wave::evaluate_entries(tree, entries, &self.params);
        wave::back_up(tree, &waves, &self.params);
        wave::assign_spans(tree, &waves, &self.params);
        Frontier { root, waves, source }
    }

    /// Scans until a pass expands nothing.
    fn converge(&mut self, tree: &mut Tree, frontier: &Frontier) {
        loop {
            self.stats.passes += 1;
            let expanded = self.scan_pass(tree, frontier);
            log::trace!("pass over {} entries below {}: {} expansions", frontier.entries().len(), frontier.root, expanded);
            if expanded == 0 { break; }
        }
        expand::check_settled(tree, frontier);
    }
}

/// The leftmost entry ends the PV chain. Its leaves are all evaluated, so its value is exact.
fn seed_pv(tree: &mut Tree, frontier: &Frontier) {
    let first = *frontier.entries().first().expect("frontier is never empty");
    assert_eq!(tree.node(first).class, Some(NodeClass::Pv), "leftmost frontier entry {first} is not PV");
    tree.node_mut(first).verdict = Verdict::Exact;
}

/// [`FrontierSearcher::explore_tree`] with default parameters.
pub fn explore_tree(tree: &mut Tree, depth: u32) -> Result<f32, SearchError> {
    FrontierSearcher::default().explore_tree(tree, depth)
}
