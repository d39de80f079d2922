use super::wave::best_of;
use super::{map_wave, Frontier, FrontierSearcher};
use crate::search::improves;
use crate::tree::{NodeClass, NodeId, Tree, Verdict};

#[derive(Clone, Copy, Debug, PartialEq)]
enum Outcome {
    Exact(f32),
    Refuted,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Walk {
    Settle { node: NodeId, outcome: Outcome },
    /// A CUT node whose explored children all beat the bound; try the rest.
    AscendCut(NodeId),
    DecideAll(NodeId),
    PropagatePv { node: NodeId, child: NodeId },
    Done,
}

fn is_live(tree: &Tree, id: NodeId) -> bool {
    let n = tree.node(id);
    !n.ignored && n.verdict == Verdict::Open
}

impl FrontierSearcher {
    /// One left-to-right pass over the frontier. Returns how many entries
    /// beat their bound and started a walk.
    pub(super) fn scan_pass(&mut self, tree: &mut Tree, frontier: &Frontier) -> usize {
        let entries = frontier.entries();
        let live = {
            let view: &Tree = tree;
            map_wave(&self.params, entries, |id| is_live(view, id))
        };
        let mut expanded = 0;
        for (&entry, was_live) in entries.iter().zip(live) {
            // earlier walks in this pass may have settled or ignored it
            if !was_live || !is_live(tree, entry) { continue; }
            let bound = frontier.bound_for(tree, entry);
            let n = tree.node(entry);
            let start = if !bound.beaten_by(n.value) {
                Walk::Settle { node: entry, outcome: Outcome::Refuted }
            } else {
                expanded += 1;
                match n.class {
                    Some(NodeClass::Cut) => Walk::AscendCut(entry),
                    Some(_) => Walk::Settle { node: entry, outcome: Outcome::Exact(n.value) },
                    None => panic!("frontier entry {entry} is unclassified"),
                }
            };
            self.walk(tree, frontier, start);
        }
        self.stats.expansions += expanded as u64;
        expanded
    }

    fn walk(&mut self, tree: &mut Tree, frontier: &Frontier, start: Walk) {
        let mut step = start;
        loop {
            log::trace!("walk {:?}", step);
            step = match step {
                Walk::Settle { node, outcome } => {
                    self.settle(tree, frontier, node, outcome);
                    after_settle(tree, frontier, node)
                }
                Walk::AscendCut(node) => self.ascend_cut(tree, frontier, node),
                Walk::DecideAll(node) => self.decide_all(tree, frontier, node),
                Walk::PropagatePv { node, child } => propagate_pv(tree, frontier, node, child),
                Walk::Done => return,
            };
        }
    }

    fn settle(&mut self, tree: &mut Tree, frontier: &Frontier, node: NodeId, outcome: Outcome) {
        let n = tree.node_mut(node);
        assert_eq!(n.verdict, Verdict::Open, "node {node} settled twice");
        match outcome {
            Outcome::Exact(v) => {
                n.value = v;
                n.verdict = Verdict::Exact;
            }
            Outcome::Refuted => {
                n.verdict = Verdict::Refuted;
                self.stats.refuted += 1;
                ignore_subtree(tree, frontier, node);
            }
        }
    }

    /// Materializes the remaining children of a CUT node one at a time, each
    /// searched against the bound. The first child that fails refutes the node.
    fn ascend_cut(&mut self, tree: &mut Tree, frontier: &Frontier, node: NodeId) -> Walk {
        let bound = frontier.bound_for(tree, node);
        let n = tree.node(node);
        let side = n.maximizing;
        assert_ne!(side, bound.maximizing, "CUT node {node} plays for the side owning its bound {bound:?}");
        let (mut value, mut best) = best_of(tree, side, n.explored_children());
        assert!(bound.beaten_by(value), "CUT node {node} ascended with {value} against {bound:?}");
        let children = n.children();
        let start = n.first_child + n.explored as usize;
        for child in start..children.end {
            tree.node_mut(node).explored += 1;
            let v = self.explore_subtree(tree, child, bound);
            if !bound.beaten_by(v) { return Walk::Settle { node, outcome: Outcome::Refuted }; }
            if improves(side, v, value) { value = v; best = child; }
        }
        tree.node_mut(node).best = Some(best);
        Walk::Settle { node, outcome: Outcome::Exact(value) }
    }

    /// Settles an ALL node once none of its children is pending. Pending
    /// children that cannot improve on the best exact child are dropped.
    fn decide_all(&mut self, tree: &mut Tree, frontier: &Frontier, node: NodeId) -> Walk {
        let n = tree.node(node);
        assert_eq!(n.verdict, Verdict::Open, "ALL node {node} revisited after settling");
        let side = n.maximizing;
        let children = n.explored_children();
        let mut best: Option<(f32, NodeId)> = None;
        for c in children.clone() {
            let cn = tree.node(c);
            if cn.verdict != Verdict::Exact { continue; }
            if best.map_or(true, |(v, _)| improves(side, cn.value, v)) { best = Some((cn.value, c)); }
        }
        let mut pending = 0;
        for c in children {
            if !is_live(tree, c) { continue; }
            match best {
                Some((v, _)) if !can_exceed(tree, frontier, c, side, v) => {
                    ignore_subtree(tree, frontier, c);
                    self.stats.pruned += 1;
                }
                _ => pending += 1,
            }
        }
        if pending > 0 { return Walk::Done; }
        match best {
            Some((v, c)) => {
                tree.node_mut(node).best = Some(c);
                Walk::Settle { node, outcome: Outcome::Exact(v) }
            }
            None => Walk::Settle { node, outcome: Outcome::Refuted },
        }
    }
}

/// Routes a settled node to whatever its parent does next.
fn after_settle(tree: &Tree, frontier: &Frontier, node: NodeId) -> Walk {
    if node == frontier.root { return Walk::Done; }
    let n = tree.node(node);
    let parent = n.parent.unwrap_or_else(|| panic!("node {node} below the search root has no parent"));
    match tree.node(parent).class {
        Some(NodeClass::Cut) => match n.verdict {
            Verdict::Exact => Walk::AscendCut(parent),
            Verdict::Refuted => Walk::Settle { node: parent, outcome: Outcome::Refuted },
            Verdict::Open => panic!("node {node} routed upward while open"),
        },
        Some(NodeClass::All) => Walk::DecideAll(parent),
        Some(NodeClass::Pv) => Walk::PropagatePv { node: parent, child: node },
        None => panic!("parent {parent} of node {node} is unclassified"),
    }
}

// Every entry in the span bounds the node's value from the parent's side.
fn can_exceed(tree: &Tree, frontier: &Frontier, node: NodeId, side: bool, target: f32) -> bool {
    let span = tree.node(node).span.unwrap_or_else(|| panic!("node {node} has no frontier span"));
    frontier.entries()[span.range()].iter().any(|&e| improves(side, tree.node(e).value, target))
}

fn ignore_subtree(tree: &mut Tree, frontier: &Frontier, node: NodeId) {
    tree.node_mut(node).ignored = true;
    let Some(span) = tree.node(node).span else { return };
    for &e in &frontier.entries()[span.range()] {
        tree.node_mut(e).ignored = true;
    }
}

/// A settled child that improves a PV node replaces its value and `best`.
/// The new value runs up the PV chain to the search root.
fn propagate_pv(tree: &mut Tree, frontier: &Frontier, node: NodeId, child: NodeId) -> Walk {
    let c = tree.node(child);
    let p = tree.node(node);
    if c.verdict != Verdict::Exact || !improves(p.maximizing, c.value, p.value) { return Walk::Done; }
    let value = c.value;
    let n = tree.node_mut(node);
    n.value = value;
    n.best = Some(child);
    let mut cur = node;
    while cur != frontier.root {
        let parent = tree.node(cur).parent.unwrap_or_else(|| panic!("PV node {cur} has no parent"));
        let p = tree.node_mut(parent);
        assert_eq!(p.best, Some(cur), "PV chain broken at node {parent}");
        p.value = value;
        cur = parent;
    }
    Walk::Done
}

/// Panics unless every entry was settled or dropped, and a bounded search root got a verdict.
pub(super) fn check_settled(tree: &Tree, frontier: &Frontier) {
    for &e in frontier.entries() {
        assert!(!is_live(tree, e), "frontier entry {e} is still open after convergence");
    }
    let root = tree.node(frontier.root);
    if root.class != Some(NodeClass::Pv) {
        assert_ne!(root.verdict, Verdict::Open, "bounded search root {} never settled", frontier.root);
    }
}
