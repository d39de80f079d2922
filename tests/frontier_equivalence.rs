use abfrontier::search::{alpha_beta, FrontierParams, FrontierSearcher, VisitStats, INF};
use abfrontier::tree::{NodeId, Tree, TreeParams, ROOT};
use pretty_assertions::assert_eq;

const BRANCHING: [u32; 6] = [1, 2, 3, 4, 8, 16];

fn grid(seeds: u64, max_leaves: u64) -> Vec<TreeParams> {
    let mut out = Vec::new();
    for depth in 0..=8u32 {
        for &b in &BRANCHING {
            if (b as u64).pow(depth) > max_leaves { continue; }
            for seed in 0..seeds { out.push(TreeParams { depth, branching_bound: b, seed: seed * 7919 + depth as u64 }); }
        }
    }
    out
}

fn minimax(tree: &Tree, id: NodeId) -> f32 {
    let n = tree.node(id);
    if n.is_leaf() { return n.value; }
    let vals = n.children().map(|c| minimax(tree, c));
    if n.maximizing { vals.fold(-INF, f32::max) } else { vals.fold(INF, f32::min) }
}

/// Index of the unique best root child, `None` when the best value is shared.
fn unique_best(tree: &Tree) -> Option<usize> {
    let vals: Vec<f32> = tree.children(ROOT).map(|c| minimax(tree, c)).collect();
    let best = vals.iter().copied().fold(-INF, f32::max);
    let mut hits = vals.iter().enumerate().filter(|&(_, &v)| v == best);
    let first = hits.next()?.0;
    if hits.next().is_some() { None } else { Some(first) }
}

fn oracle(tree: &mut Tree, depth: u32) -> (f32, Option<usize>) {
    tree.reset_search_state();
    let mut stats = VisitStats::default();
    let v = alpha_beta(tree, ROOT, depth, depth, -INF, INF, &mut stats);
    (v, tree.best_child_index(ROOT))
}

#[test]
fn frontier_matches_alpha_beta_bit_for_bit() {
    for p in grid(4, 65_536) {
        let mut tree = Tree::generate(&p).unwrap();
        let (expected, _) = oracle(&mut tree, p.depth);
        let mut s = FrontierSearcher::default();
        let got = s.explore_tree(&mut tree, p.depth).unwrap();
        assert_eq!(got.to_bits(), expected.to_bits(), "value {got} != {expected} for {p:?}");
    }
}

#[test]
fn frontier_picks_the_alpha_beta_move_without_ties() {
    let mut checked = 0;
    for p in grid(4, 65_536) {
        if p.depth == 0 { continue; }
        let mut tree = Tree::generate(&p).unwrap();
        let Some(best) = unique_best(&tree) else { continue };
        let (_, ab_move) = oracle(&mut tree, p.depth);
        FrontierSearcher::default().explore_tree(&mut tree, p.depth).unwrap();
        assert_eq!(tree.best_child_index(ROOT), Some(best), "frontier move for {p:?}");
        assert_eq!(ab_move, Some(best), "alpha-beta move for {p:?}");
        checked += 1;
    }
    assert!(checked > 50, "only {checked} trees without root ties");
}

#[test]
fn wave_mapping_does_not_change_results() {
    let inline = FrontierParams { parallel: false, parallel_min_wave: 0 };
    let eager = FrontierParams { parallel: true, parallel_min_wave: 1 };
    for p in grid(2, 4_096) {
        let mut tree = Tree::generate(&p).unwrap();
        let mut a = FrontierSearcher::new(inline);
        let va = a.explore_tree(&mut tree, p.depth).unwrap();
        let pv_a = tree.principal_variation();
        let mut b = FrontierSearcher::new(eager);
        let vb = b.explore_tree(&mut tree, p.depth).unwrap();
        assert_eq!(va.to_bits(), vb.to_bits(), "{p:?}");
        assert_eq!(pv_a, tree.principal_variation(), "{p:?}");
        assert_eq!(a.stats(), b.stats(), "{p:?}");
    }
}

#[test]
fn repeated_searches_on_one_tree_agree() {
    let p = TreeParams { depth: 6, branching_bound: 5, seed: 99 };
    let mut tree = Tree::generate(&p).unwrap();
    let mut s = FrontierSearcher::default();
    let first = s.explore_tree(&mut tree, 6).unwrap();
    let first_stats = s.stats();
    let (expected, _) = oracle(&mut tree, 6);
    let second = s.explore_tree(&mut tree, 6).unwrap();
    assert_eq!(first.to_bits(), second.to_bits());
    assert_eq!(second.to_bits(), expected.to_bits());
    assert_eq!(first_stats, s.stats());
}

#[test]
fn frontier_reads_no_more_leaves_than_exist() {
    for p in grid(2, 65_536) {
        let mut tree = Tree::generate(&p).unwrap();
        let mut s = FrontierSearcher::default();
        s.explore_tree(&mut tree, p.depth).unwrap();
        assert!(s.stats().leaf_evals <= tree.stats().leaf_nodes, "{p:?}: {:?}", s.stats());
    }
}

#[test]
fn principal_variation_reaches_a_leaf_with_the_root_value() {
    for p in grid(2, 4_096) {
        let mut tree = Tree::generate(&p).unwrap();
        let v = FrontierSearcher::default().explore_tree(&mut tree, p.depth).unwrap();
        let mut node = ROOT;
        for idx in tree.principal_variation() {
            node = tree.children(node).nth(idx).unwrap();
        }
        assert!(tree.is_leaf(node), "PV stops above the leaves for {p:?}");
        assert_eq!(tree.node(node).value.to_bits(), v.to_bits(), "{p:?}");
    }
}
