//! Best-first search over an OPEN list of live and solved states.
//!
//! Live states carry an upper bound on what their subtree can still reach,
//! solved states a proven value. The state with the highest merit is always
//! taken next, so the root comes off the list solved as soon as no other
//! state can beat it.

use serde::Serialize;

use crate::error::SearchError;
use crate::search::{check_depth, INF};
use crate::tree::{NodeId, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SssParams {
    /// Maximum number of states held at once.
    pub open_capacity: usize,
}

impl Default for SssParams {
    fn default() -> Self { Self { open_capacity: 1 << 20 } }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SssStats {
    pub pops: u64,
    pub leaf_evals: u64,
    pub purged: u64,
    pub peak_open: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OpenEntry {
    pub node: NodeId,
    pub merit: f32,
    pub depth: u32,
    pub live: bool,
}

impl OpenEntry {
    fn live(node: NodeId, merit: f32, depth: u32) -> Self { Self { node, merit, depth, live: true } }

    fn solved(node: NodeId, merit: f32, depth: u32) -> Self { Self { node, merit, depth, live: false } }
}

/// Bounded, insertion-ordered collection of states.
#[derive(Debug, Clone)]
pub struct OpenList {
    entries: Vec<OpenEntry>,
    capacity: usize,
    peak: usize,
}

impl OpenList {
    pub fn new(capacity: usize) -> Self { Self { entries: Vec::new(), capacity, peak: 0 } }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn peak(&self) -> usize { self.peak }

    pub fn push(&mut self, entry: OpenEntry) -> Result<(), SearchError> {
        if self.entries.len() >= self.capacity { return Err(SearchError::OpenListOverflow { capacity: self.capacity }); }
        self.entries.push(entry);
        self.peak = self.peak.max(self.entries.len());
        Ok(())
    }

    /// Removes the entry with the highest merit; ties go to the oldest.
    pub fn pop_best(&mut self) -> Option<OpenEntry> {
        let mut best: Option<(usize, f32)> = None;
        for (i, e) in self.entries.iter().enumerate() {
            if best.map_or(true, |(_, m)| e.merit > m) { best = Some((i, e.merit)); }
        }
        best.map(|(i, _)| self.entries.remove(i))
    }

    /// Drops every entry at or below `ancestor`. Returns how many were removed.
    pub fn purge_subtree(&mut self, tree: &Tree, ancestor: NodeId, ancestor_depth: u32) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !descends_from(tree, e.node, e.depth, ancestor, ancestor_depth));
        before - self.entries.len()
    }
}

fn descends_from(tree: &Tree, node: NodeId, depth: u32, ancestor: NodeId, ancestor_depth: u32) -> bool {
    if depth < ancestor_depth { return false; }
    let mut cur = node;
    for _ in ancestor_depth..depth {
        match tree.node(cur).parent {
            Some(p) => cur = p,
            None => return false,
        }
    }
    cur == ancestor
}

#[derive(Default)]
pub struct SssSearcher {
    params: SssParams,
    stats: SssStats,
}

impl SssSearcher {
    pub fn new(params: SssParams) -> Self { Self { params, stats: SssStats::default() } }

    pub fn stats(&self) -> SssStats { self.stats }

    /// Minimax value of the whole tree, root maximizing. Records the chosen
    /// child on the root and on every MAX node it solves.
    pub fn sss_star(&mut self, tree: &mut Tree, depth: u32) -> Result<f32, SearchError> {
        check_depth(tree, depth)?;
        tree.reset_search_state();
        self.stats = SssStats::default();
        let mut open = OpenList::new(self.params.open_capacity);
        open.push(OpenEntry::live(tree.root(), INF, 0))?;
        let result = self.run(tree, depth, &mut open);
        self.stats.peak_open = open.peak();
        if let Err(e) = &result { log::debug!("sss* aborted after {} pops: {}", self.stats.pops, e); }
        let value = result?;
        log::debug!(
            "sss* depth={} value={} pops={} leaves={} peak_open={}",
            depth, value, self.stats.pops, self.stats.leaf_evals, self.stats.peak_open
        );
        Ok(value)
    }

    fn run(&mut self, tree: &mut Tree, depth: u32, open: &mut OpenList) -> Result<f32, SearchError> {
        while let Some(e) = open.pop_best() {
            self.stats.pops += 1;
            if e.live {
                self.expand_live(tree, depth, open, e)?;
                continue;
            }
            if e.depth == 0 { return Ok(e.merit); }
            let parent = tree.node(e.node).parent
                .unwrap_or_else(|| panic!("solved node {} at depth {} has no parent", e.node, e.depth));
            if e.depth % 2 == 1 {
                // one solved child settles a MAX parent
                self.stats.purged += open.purge_subtree(tree, parent, e.depth - 1) as u64;
                let p = tree.node_mut(parent);
                p.value = e.merit;
                p.best = Some(e.node);
                open.push(OpenEntry::solved(parent, e.merit, e.depth - 1))?;
            } else {
                match tree.next_sibling(e.node) {
                    Some(next) => open.push(OpenEntry::live(next, e.merit, e.depth))?,
                    None => open.push(OpenEntry::solved(parent, e.merit, e.depth - 1))?,
                }
            }
        }
        panic!("OPEN list ran dry before the root was solved");
    }

    fn expand_live(&mut self, tree: &Tree, depth: u32, open: &mut OpenList, e: OpenEntry) -> Result<(), SearchError> {
        if e.depth == depth {
            self.stats.leaf_evals += 1;
            let v = tree.node(e.node).value;
            return open.push(OpenEntry::solved(e.node, e.merit.min(v), e.depth));
        }
        let n = tree.node(e.node);
        assert!(!n.is_leaf(), "node {} at depth {} has no children above depth {}", e.node, e.depth, depth);
        if e.depth % 2 == 0 {
            for c in n.children() { open.push(OpenEntry::live(c, e.merit, e.depth + 1))?; }
            Ok(())
        } else {
            open.push(OpenEntry::live(n.first_child, e.merit, e.depth + 1))
        }
    }
}

/// [`SssSearcher::sss_star`] with default parameters.
pub fn sss_star(tree: &mut Tree, depth: u32) -> Result<f32, SearchError> {
    SssSearcher::default().sss_star(tree, depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ROOT;
    use pretty_assertions::assert_eq;

    #[test]
    fn pop_best_prefers_the_oldest_of_equal_merits() {
        let mut open = OpenList::new(8);
        open.push(OpenEntry::live(1, 4.0, 1)).unwrap();
        open.push(OpenEntry::live(2, 7.0, 1)).unwrap();
        open.push(OpenEntry::solved(3, 7.0, 1)).unwrap();
        open.push(OpenEntry::live(4, 2.0, 1)).unwrap();
        let order: Vec<NodeId> = std::iter::from_fn(|| open.pop_best()).map(|e| e.node).collect();
        assert_eq!(order, vec![2, 3, 1, 4]);
        assert!(open.is_empty());
    }

    #[test]
    fn push_past_capacity_fails() {
        let mut open = OpenList::new(2);
        open.push(OpenEntry::live(1, 1.0, 1)).unwrap();
        open.push(OpenEntry::live(2, 1.0, 1)).unwrap();
        assert_eq!(open.push(OpenEntry::live(3, 1.0, 1)), Err(SearchError::OpenListOverflow { capacity: 2 }));
        assert_eq!((open.len(), open.peak()), (2, 2));
    }

    #[test]
    fn purge_removes_only_the_given_subtree() {
        // root -> 1, 2; 1 -> 3, 4; 2 -> 5, 6
        let tree = Tree::from_leaves(2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let mut open = OpenList::new(8);
        for (node, depth) in [(3, 2), (1, 1), (5, 2), (2, 1), (4, 2)] {
            open.push(OpenEntry::live(node, 9.0, depth)).unwrap();
        }
        assert_eq!(open.purge_subtree(&tree, 1, 1), 3);
        let left: Vec<NodeId> = std::iter::from_fn(|| open.pop_best()).map(|e| e.node).collect();
        assert_eq!(left, vec![5, 2]);
    }

    #[test]
    fn fixed_scenario_returns_three() {
        let mut tree = Tree::from_leaves(2, 2, &[3.0, 5.0, 1.0, 9.0]).unwrap();
        let mut s = SssSearcher::default();
        assert_eq!(s.sss_star(&mut tree, 2).unwrap(), 3.0);
        assert_eq!(tree.best_child_index(ROOT), Some(0));
        // the 9 is never looked at
        assert_eq!(s.stats().leaf_evals, 3);
    }

    #[test]
    fn single_max_level_takes_the_largest_leaf() {
        let mut tree = Tree::from_leaves(1, 4, &[2.0, 6.5, 3.0, 6.0]).unwrap();
        assert_eq!(sss_star(&mut tree, 1).unwrap(), 6.5);
        assert_eq!(tree.best_child_index(ROOT), Some(1));
    }

    #[test]
    fn leaf_root_is_its_own_value() {
        let mut tree = Tree::from_shape(&crate::tree::Shape::Leaf(42.5)).unwrap();
        assert_eq!(sss_star(&mut tree, 0).unwrap(), 42.5);
    }
}
