use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::ops::Range;

use crate::error::TreeError;

pub type NodeId = usize;

pub const ROOT: NodeId = 0;
pub const MAX_DEPTH: u32 = 16;
pub const MAX_BRANCHING: u32 = 64;
/// Depth and branching limits only bound the shape; this bounds the allocation.
pub const MAX_NODES: usize = 1 << 26;

// Leaf scores are whole hundredths in [0, 100).
const SCORE_STEPS: u32 = 10_000;

/// Role a node plays in the frontier search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NodeClass {
    /// On the best line found so far; all children explored, the first one is PV too.
    Pv,
    /// Expected to be refuted; children are explored one at a time.
    Cut,
    /// Needs every child's value.
    All,
}

/// Contiguous range of a frontier array covering a node's explored subtree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrontierSpan {
    pub offset: usize,
    pub count: usize,
}

impl FrontierSpan {
    pub fn range(&self) -> Range<usize> { self.offset..self.offset + self.count }
}

/// Outcome of testing a node against the bound of the search that owns it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verdict {
    #[default]
    Open,
    /// Beats the bound; `value` is exact.
    Exact,
    /// Cannot beat the bound.
    Refuted,
}

#[derive(Clone, Debug)]
pub struct Node {
    /// Generated score for leaves, backed-up value for interior nodes.
    pub value: f32,
    pub parent: Option<NodeId>,
    pub first_child: NodeId,
    pub child_count: u32,
    /// Children materialized so far, always a prefix of the child block.
    pub explored: u32,
    pub best: Option<NodeId>,
    pub class: Option<NodeClass>,
    pub maximizing: bool,
    /// Distance from the root.
    pub level: u32,
    pub span: Option<FrontierSpan>,
    /// Proven not to improve anything above it; scans skip it.
    pub ignored: bool,
    pub verdict: Verdict,
}

impl Node {
    fn new(parent: Option<NodeId>, level: u32) -> Self {
        Self {
            value: 0.0,
            parent,
            first_child: 0,
            child_count: 0,
            explored: 0,
            best: None,
            class: None,
            maximizing: level % 2 == 0,
            level,
            span: None,
            ignored: false,
            verdict: Verdict::Open,
        }
    }

    pub fn is_leaf(&self) -> bool { self.child_count == 0 }

    pub fn children(&self) -> Range<NodeId> { self.first_child..self.first_child + self.child_count as usize }

    pub fn explored_children(&self) -> Range<NodeId> { self.first_child..self.first_child + self.explored as usize }

    fn clear_search_state(&mut self) {
        if !self.is_leaf() { self.value = 0.0; }
        self.explored = 0;
        self.best = None;
        self.class = None;
        self.span = None;
        self.ignored = false;
        self.verdict = Verdict::Open;
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TreeStats {
    pub total_nodes: u64,
    pub leaf_nodes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TreeParams {
    pub depth: u32,
    pub branching_bound: u32,
    pub seed: u64,
}

impl Default for TreeParams {
    fn default() -> Self { Self { depth: 5, branching_bound: 16, seed: 42 } }
}

impl TreeParams {
    pub fn validate(&self) -> Result<(), TreeError> {
        if self.depth > MAX_DEPTH { return Err(TreeError::DepthTooLarge { got: self.depth, max: MAX_DEPTH }); }
        check_branching(self.branching_bound)
    }
}

fn check_branching(branching: u32) -> Result<(), TreeError> {
    if branching == 0 || branching > MAX_BRANCHING {
        return Err(TreeError::InvalidBranching { got: branching, max: MAX_BRANCHING });
    }
    Ok(())
}

/// Explicit tree description, used to build fixed scenarios.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Leaf(f32),
    Node(Vec<Shape>),
}

impl Shape {
    /// Depth measured along first children.
    fn depth(&self) -> u32 {
        match self {
            Shape::Leaf(_) => 0,
            Shape::Node(kids) => kids.first().map_or(0, |k| k.depth() + 1),
        }
    }

    fn uniform(depth: u32, branching: u32, values: &mut impl Iterator<Item = f32>) -> Shape {
        if depth == 0 { return Shape::Leaf(values.next().unwrap_or_default()); }
        Shape::Node((0..branching).map(|_| Shape::uniform(depth - 1, branching, values)).collect())
    }
}

#[derive(Clone, Debug)]
pub struct Tree {
    nodes: Vec<Node>,
    depth: u32,
    stats: TreeStats,
}

/// Random tree of exactly `params.depth` levels; see [`Tree::generate`].
pub fn generate(params: &TreeParams) -> Result<Tree, TreeError> { Tree::generate(params) }

impl Tree {
    /// Builds a tree depth first: every interior node draws a child count in
    /// `1..=branching_bound`, every leaf a score in `[0, 100)`. The same seed
    /// always yields the same tree.
    pub fn generate(params: &TreeParams) -> Result<Tree, TreeError> { Tree::generate_with_limit(params, MAX_NODES) }

    /// [`Tree::generate`] that gives up with `TooManyNodes` once the tree
    /// would hold more than `max_nodes` nodes.
    pub fn generate_with_limit(params: &TreeParams, max_nodes: usize) -> Result<Tree, TreeError> {
        params.validate()?;
        let mut rng = SmallRng::seed_from_u64(params.seed);
        let mut nodes = vec![Node::new(None, 0)];
        let mut stats = TreeStats::default();
        let mut grower = Grower { rng: &mut rng, branching: params.branching_bound, max_nodes, stats: &mut stats };
        grower.grow(&mut nodes, ROOT, params.depth)?;
        log::debug!("generated tree depth={} nodes={} leaves={}", params.depth, stats.total_nodes, stats.leaf_nodes);
        Ok(Tree { nodes, depth: params.depth, stats })
    }

    pub fn from_shape(shape: &Shape) -> Result<Tree, TreeError> {
        let depth = shape.depth();
        if depth > MAX_DEPTH { return Err(TreeError::DepthTooLarge { got: depth, max: MAX_DEPTH }); }
        let mut nodes = vec![Node::new(None, 0)];
        let mut stats = TreeStats::default();
        place(&mut nodes, shape, ROOT, depth, &mut stats)?;
        Ok(Tree { nodes, depth, stats })
    }

    /// Uniform tree with exactly `branching` children per interior node and
    /// `values` assigned to the leaves in depth-first, left-to-right order.
    pub fn from_leaves(depth: u32, branching: u32, values: &[f32]) -> Result<Tree, TreeError> {
        check_branching(branching)?;
        if depth > MAX_DEPTH { return Err(TreeError::DepthTooLarge { got: depth, max: MAX_DEPTH }); }
        let expected = (branching as usize).checked_pow(depth)
            .filter(|&n| n <= MAX_NODES)
            .ok_or(TreeError::TooManyNodes { limit: MAX_NODES })?;
        if values.len() != expected { return Err(TreeError::LeafCount { expected, got: values.len() }); }
        let shape = Shape::uniform(depth, branching, &mut values.iter().copied());
        Tree::from_shape(&shape)
    }

    pub fn root(&self) -> NodeId { ROOT }

    pub fn depth(&self) -> u32 { self.depth }

    pub fn stats(&self) -> TreeStats { self.stats }

    pub fn len(&self) -> usize { self.nodes.len() }

    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    pub fn node(&self, id: NodeId) -> &Node { &self.nodes[id] }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node { &mut self.nodes[id] }

    pub fn children(&self, id: NodeId) -> Range<NodeId> { self.nodes[id].children() }

    pub fn is_leaf(&self, id: NodeId) -> bool { self.nodes[id].is_leaf() }

    /// True for nodes whose children are leaves.
    pub fn is_frontier_level(&self, id: NodeId) -> bool { self.nodes[id].level + 1 == self.depth }

    /// Position of `id` among its siblings; `None` for the root.
    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        self.nodes[id].parent.map(|p| id - self.nodes[p].first_child)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.nodes[id].parent?;
        let next = id + 1;
        if self.nodes[parent].children().contains(&next) { Some(next) } else { None }
    }

    pub fn best_child_index(&self, id: NodeId) -> Option<usize> {
        self.nodes[id].best.map(|b| b - self.nodes[id].first_child)
    }

    /// Child indices along the `best` chain starting at the root.
    pub fn principal_variation(&self) -> Vec<usize> {
        let mut line = Vec::new();
        let mut cur = ROOT;
        while let Some(next) = self.nodes[cur].best {
            line.push(next - self.nodes[cur].first_child);
            cur = next;
        }
        line
    }

    /// Leaf scores in depth-first, left-to-right order.
    pub fn leaf_values(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.stats.leaf_nodes as usize);
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            let n = &self.nodes[id];
            if n.is_leaf() { out.push(n.value); continue; }
            stack.extend(n.children().rev());
        }
        out
    }

    /// Forgets everything a previous search left behind. Leaf scores are kept.
    pub fn reset_search_state(&mut self) {
        for n in &mut self.nodes { n.clear_search_state(); }
    }
}

struct Grower<'a> {
    rng: &'a mut SmallRng,
    branching: u32,
    max_nodes: usize,
    stats: &'a mut TreeStats,
}

impl Grower<'_> {
    fn grow(&mut self, nodes: &mut Vec<Node>, id: NodeId, remaining: u32) -> Result<(), TreeError> {
        self.stats.total_nodes += 1;
        if remaining == 0 {
            self.stats.leaf_nodes += 1;
            nodes[id].value = self.rng.gen_range(0..SCORE_STEPS) as f32 / 100.0;
            return Ok(());
        }
        let count = self.rng.gen_range(1..=self.branching);
        let first = nodes.len();
        if first + count as usize > self.max_nodes { return Err(TreeError::TooManyNodes { limit: self.max_nodes }); }
        let level = nodes[id].level + 1;
        nodes.extend((0..count).map(|_| Node::new(Some(id), level)));
        nodes[id].first_child = first;
        nodes[id].child_count = count;
        for child in first..first + count as usize {
            self.grow(nodes, child, remaining - 1)?;
        }
        Ok(())
    }
}

fn place(nodes: &mut Vec<Node>, shape: &Shape, id: NodeId, depth: u32, stats: &mut TreeStats) -> Result<(), TreeError> {
    stats.total_nodes += 1;
    let level = nodes[id].level;
    match shape {
        Shape::Leaf(v) => {
            if level != depth { return Err(TreeError::RaggedLeaves { expected: depth, found: level }); }
            stats.leaf_nodes += 1;
            nodes[id].value = *v;
        }
        Shape::Node(kids) => {
            if kids.is_empty() { return Err(TreeError::EmptyInterior { level }); }
            let first = nodes.len();
            nodes.extend(kids.iter().map(|_| Node::new(Some(id), level + 1)));
            nodes[id].first_child = first;
            nodes[id].child_count = kids.len() as u32;
            for (i, kid) in kids.iter().enumerate() {
                place(nodes, kid, first + i, depth, stats)?;
            }
        }
    }
    Ok(())
}
