use abfrontier::search::{alpha_beta, explore_tree, negamax, sss_star, FrontierSearcher, VisitStats, INF};
use abfrontier::tree::{Shape, Tree, TreeParams, ROOT};
use pretty_assertions::assert_eq;

/// Values from all four searches, oracle runs first.
fn all_four(tree: &mut Tree, depth: u32) -> [f32; 4] {
    let mut nm = VisitStats::default();
    let a = negamax(tree, ROOT, depth, depth, &mut nm);
    let mut ab = VisitStats::default();
    let b = alpha_beta(tree, ROOT, depth, depth, -INF, INF, &mut ab);
    let c = explore_tree(tree, depth).unwrap();
    let d = sss_star(tree, depth).unwrap();
    [a, b, c, d]
}

#[test]
fn depth_zero_returns_the_root_score_without_recursion() {
    let mut tree = Tree::generate(&TreeParams { depth: 0, branching_bound: 8, seed: 3 }).unwrap();
    let score = tree.node(ROOT).value;
    assert_eq!(all_four(&mut tree, 0), [score; 4]);
    let mut stats = VisitStats::default();
    negamax(&mut tree, ROOT, 0, 0, &mut stats);
    assert_eq!(stats, VisitStats { leaf_visits: 1, interior_visits: 0 });
    let mut s = FrontierSearcher::default();
    s.explore_tree(&mut tree, 0).unwrap();
    assert_eq!((s.stats().leaf_evals, s.stats().passes), (1, 0));
    assert!(tree.principal_variation().is_empty());
}

#[test]
fn branching_bound_one_follows_the_only_path() {
    for depth in 1..=8 {
        let mut tree = Tree::generate(&TreeParams { depth, branching_bound: 1, seed: depth as u64 }).unwrap();
        let leaf = tree.leaf_values()[0];
        assert_eq!(all_four(&mut tree, depth), [leaf; 4], "depth {depth}");
        explore_tree(&mut tree, depth).unwrap();
        assert_eq!(tree.principal_variation(), vec![0; depth as usize]);
    }
}

#[test]
fn two_by_two_scenario_returns_three() {
    let mut tree = Tree::from_leaves(2, 2, &[3.0, 5.0, 1.0, 9.0]).unwrap();
    assert_eq!(all_four(&mut tree, 2), [3.0; 4]);
    for search in [0, 1, 2, 3] {
        tree.reset_search_state();
        let mut stats = VisitStats::default();
        match search {
            0 => { negamax(&mut tree, ROOT, 2, 2, &mut stats); }
            1 => { alpha_beta(&mut tree, ROOT, 2, 2, -INF, INF, &mut stats); }
            2 => { explore_tree(&mut tree, 2).unwrap(); }
            _ => { sss_star(&mut tree, 2).unwrap(); }
        }
        assert_eq!(tree.best_child_index(ROOT), Some(0), "search {search}");
    }
}

#[test]
fn odd_depth_root_still_maximizes() {
    let shape = Shape::Node(vec![
        Shape::Node(vec![Shape::Node(vec![Shape::Leaf(4.0), Shape::Leaf(6.0)]), Shape::Node(vec![Shape::Leaf(2.0)])]),
        Shape::Node(vec![Shape::Node(vec![Shape::Leaf(7.0)]), Shape::Node(vec![Shape::Leaf(8.0), Shape::Leaf(1.0)])]),
    ]);
    let mut tree = Tree::from_shape(&shape).unwrap();
    // max(min(6, 2), min(7, 8)) = 7
    assert_eq!(all_four(&mut tree, 3), [7.0; 4]);
}

#[test]
fn all_equal_leaves_keep_the_first_move() {
    let mut tree = Tree::from_leaves(3, 3, &[5.0; 27]).unwrap();
    assert_eq!(all_four(&mut tree, 3), [5.0; 4]);
    explore_tree(&mut tree, 3).unwrap();
    assert_eq!(tree.best_child_index(ROOT), Some(0));
}
