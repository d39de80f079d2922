use std::ops::Range;

use super::{map_wave, FrontierParams};
use crate::search::improves;
use crate::tree::{FrontierSpan, NodeClass, NodeId, Tree};

/// Children a node adds to the next wave, with their classes.
fn wave_children(tree: &Tree, id: NodeId) -> Vec<(NodeId, NodeClass)> {
    let n = tree.node(id);
    let class = n.class.unwrap_or_else(|| panic!("node {id} reached wave construction unclassified"));
    match class {
        NodeClass::Pv => n.children()
            .enumerate()
            .map(|(i, c)| (c, if i == 0 { NodeClass::Pv } else { NodeClass::Cut }))
            .collect(),
        NodeClass::All => n.children().map(|c| (c, NodeClass::Cut)).collect(),
        NodeClass::Cut => vec![(n.first_child, NodeClass::All)],
    }
}

/// Classifies `root` and materializes the subtree below it level by level
/// down to the nodes just above the leaves. `waves[0]` is `[root]`.
pub(super) fn build_waves(tree: &mut Tree, root: NodeId, class: NodeClass, params: &FrontierParams) -> Vec<Vec<NodeId>> {
    assert!(!tree.is_leaf(root), "wave construction started at leaf {root}");
    tree.node_mut(root).class = Some(class);
    let mut waves = vec![vec![root]];
    loop {
        let current = waves.last().expect("waves start with the root");
        if tree.is_frontier_level(current[0]) { break; }
        let expanded = {
            let view: &Tree = tree;
            map_wave(params, current, |id| wave_children(view, id))
        };
        let mut next = Vec::with_capacity(expanded.iter().map(Vec::len).sum());
        for (&parent, kids) in current.iter().zip(&expanded) {
            tree.node_mut(parent).explored = kids.len() as u32;
            for &(kid, kid_class) in kids {
                tree.node_mut(kid).class = Some(kid_class);
                next.push(kid);
            }
        }
        waves.push(next);
    }
    waves
}

/// First strictly-best node in `range` for the given side.
pub(super) fn best_of(tree: &Tree, maximizing: bool, mut range: Range<NodeId>) -> (f32, NodeId) {
    let first = range.next().unwrap_or_else(|| panic!("empty child range"));
    let mut best = (tree.node(first).value, first);
    for id in range {
        let v = tree.node(id).value;
        if improves(maximizing, v, best.0) { best = (v, id); }
    }
    best
}

struct Reduction {
    value: f32,
    best: NodeId,
    explored: u32,
}

fn reduce_leaves(tree: &Tree, id: NodeId) -> Reduction {
    assert!(tree.is_frontier_level(id), "node {id} is not just above the leaves");
    let n = tree.node(id);
    let explored = match n.class {
        Some(NodeClass::Cut) => 1,
        Some(_) => n.child_count,
        None => panic!("frontier entry {id} is unclassified"),
    };
    let (value, best) = best_of(tree, n.maximizing, n.first_child..n.first_child + explored as usize);
    Reduction { value, best, explored }
}

/// PV and ALL entries are reduced over all their leaves, CUT entries read
/// only the first one. Returns the number of leaves read.
pub(super) fn evaluate_entries(tree: &mut Tree, entries: &[NodeId], params: &FrontierParams) -> u64 {
    let reductions = {
        let view: &Tree = tree;
        map_wave(params, entries, |id| reduce_leaves(view, id))
    };
    let mut leaves = 0u64;
    for (&id, r) in entries.iter().zip(reductions) {
        let n = tree.node_mut(id);
        n.explored = r.explored;
        n.value = r.value;
        n.best = Some(r.best);
        leaves += r.explored as u64;
    }
    leaves
}

// PV nodes only trust their PV child until CUT siblings are settled.
fn backed_up(tree: &Tree, id: NodeId) -> (f32, NodeId) {
    let n = tree.node(id);
    if n.class == Some(NodeClass::Pv) { return (tree.node(n.first_child).value, n.first_child); }
    best_of(tree, n.maximizing, n.explored_children())
}

/// Provisional values from the frontier up to the search root.
pub(super) fn back_up(tree: &mut Tree, waves: &[Vec<NodeId>], params: &FrontierParams) {
    for wave in waves.iter().rev().skip(1) {
        let values = {
            let view: &Tree = tree;
            map_wave(params, wave, |id| backed_up(view, id))
        };
        for (&id, (value, best)) in wave.iter().zip(values) {
            let n = tree.node_mut(id);
            n.value = value;
            n.best = Some(best);
        }
    }
}

fn union_span(tree: &Tree, id: NodeId) -> FrontierSpan {
    let mut span: Option<FrontierSpan> = None;
    for c in tree.node(id).explored_children() {
        let cs = tree.node(c).span.unwrap_or_else(|| panic!("child {c} of node {id} has no frontier span"));
        span = Some(match span {
            None => cs,
            Some(s) => {
                assert_eq!(s.offset + s.count, cs.offset, "span of node {c} does not continue its left sibling's");
                FrontierSpan { offset: s.offset, count: s.count + cs.count }
            }
        });
    }
    span.unwrap_or_else(|| panic!("node {id} has no explored children"))
}

/// Entry `i` covers `(i, 1)`; every node above covers the union of its explored children.
pub(super) fn assign_spans(tree: &mut Tree, waves: &[Vec<NodeId>], params: &FrontierParams) {
    let Some(entries) = waves.last() else { return };
    for (i, &id) in entries.iter().enumerate() {
        tree.node_mut(id).span = Some(FrontierSpan { offset: i, count: 1 });
    }
    for wave in waves.iter().rev().skip(1) {
        let spans = {
            let view: &Tree = tree;
            map_wave(params, wave, |id| union_span(view, id))
        };
        for (&id, span) in wave.iter().zip(spans) {
            tree.node_mut(id).span = Some(span);
        }
    }
    let root = waves[0][0];
    let covered = tree.node(root).span.map(|s| s.count);
    assert_eq!(covered, Some(entries.len()), "span of search root {root} does not cover its frontier");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ROOT;
    use pretty_assertions::assert_eq;

    fn inline() -> FrontierParams { FrontierParams { parallel: false, parallel_min_wave: 0 } }

    #[test]
    fn pv_root_classifies_first_children_pv_and_cut_children_all() {
        // depth 3, two children everywhere
        let mut tree = Tree::from_leaves(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]).unwrap();
        let waves = build_waves(&mut tree, ROOT, NodeClass::Pv, &inline());
        let classes: Vec<Vec<NodeClass>> = waves.iter()
            .map(|w| w.iter().map(|&id| tree.node(id).class.unwrap()).collect())
            .collect();
        assert_eq!(classes, vec![
            vec![NodeClass::Pv],
            vec![NodeClass::Pv, NodeClass::Cut],
            vec![NodeClass::Pv, NodeClass::Cut, NodeClass::All],
        ]);
        // the CUT node at level 1 contributed only its first child
        let cut = waves[1][1];
        assert_eq!(tree.node(cut).explored, 1);
    }

    #[test]
    fn spans_cover_explored_subtrees() {
        let mut tree = Tree::from_leaves(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]).unwrap();
        let waves = build_waves(&mut tree, ROOT, NodeClass::Pv, &inline());
        evaluate_entries(&mut tree, waves.last().unwrap(), &inline());
        back_up(&mut tree, &waves, &inline());
        assign_spans(&mut tree, &waves, &inline());
        let spans: Vec<FrontierSpan> = waves[1].iter().map(|&id| tree.node(id).span.unwrap()).collect();
        assert_eq!(spans, vec![FrontierSpan { offset: 0, count: 2 }, FrontierSpan { offset: 2, count: 1 }]);
        assert_eq!(tree.node(ROOT).span, Some(FrontierSpan { offset: 0, count: 3 }));
    }

    #[test]
    fn evaluation_reads_one_leaf_under_cut_entries() {
        let mut tree = Tree::from_leaves(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]).unwrap();
        let waves = build_waves(&mut tree, ROOT, NodeClass::Pv, &inline());
        let leaves = evaluate_entries(&mut tree, waves.last().unwrap(), &inline());
        // PV entry reads 2, CUT entry 1, ALL entry 2
        assert_eq!(leaves, 5);
        let values: Vec<f32> = waves[2].iter().map(|&id| tree.node(id).value).collect();
        assert_eq!(values, vec![2.0, 3.0, 6.0]);
        back_up(&mut tree, &waves, &inline());
        // PV chain carries the PV entry's value
        assert_eq!(tree.node(ROOT).value, 2.0);
    }
}
