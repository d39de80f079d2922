use std::time::Instant;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::search::{alpha_beta, negamax, FrontierParams, FrontierSearcher, SssParams, SssSearcher, VisitStats, INF};
use crate::tree::{Tree, TreeParams, TreeStats};

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct HarnessParams {
    pub tree: TreeParams,
    pub frontier: FrontierParams,
    pub sss: SssParams,
    pub skip_negamax: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    Negamax,
    AlphaBeta,
    Frontier,
    SssStar,
}

impl Algorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::Negamax => "negamax",
            Algorithm::AlphaBeta => "alpha-beta",
            Algorithm::Frontier => "frontier",
            Algorithm::SssStar => "sss*",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AlgorithmRun {
    pub algorithm: Algorithm,
    pub value: f32,
    pub best_child: Option<usize>,
    pub leaf_evals: u64,
    pub millis: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    pub seed: u64,
    pub algorithm: Algorithm,
    pub expected: f32,
    pub got: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub params: TreeParams,
    pub tree: TreeStats,
    pub runs: Vec<AlgorithmRun>,
    pub mismatches: Vec<Mismatch>,
}

impl Report {
    pub fn run_of(&self, algorithm: Algorithm) -> Option<&AlgorithmRun> {
        self.runs.iter().find(|r| r.algorithm == algorithm)
    }

    pub fn agrees(&self) -> bool { self.mismatches.is_empty() }
}

fn timed<T>(f: impl FnOnce() -> T) -> (T, f64) {
    let t0 = Instant::now();
    let out = f();
    (out, t0.elapsed().as_secs_f64() * 1000.0)
}

/// Generates one tree and runs every search on it.
pub fn run(params: &HarnessParams) -> Result<Report> {
    let p = &params.tree;
    let (tree, gen_ms) = timed(|| Tree::generate(p));
    let mut tree = tree.with_context(|| format!("generating tree depth={} branching={} seed={}", p.depth, p.branching_bound, p.seed))?;
    log::info!("tree seed={} nodes={} leaves={} in {:.3}ms", p.seed, tree.stats().total_nodes, tree.stats().leaf_nodes, gen_ms);
    let depth = p.depth;
    let root = tree.root();
    let mut runs = Vec::with_capacity(4);

    if !params.skip_negamax {
        tree.reset_search_state();
        let mut stats = VisitStats::default();
        let (value, millis) = timed(|| negamax(&mut tree, root, depth, depth, &mut stats));
        runs.push(AlgorithmRun { algorithm: Algorithm::Negamax, value, best_child: tree.best_child_index(root), leaf_evals: stats.leaf_visits, millis });
    }

    tree.reset_search_state();
    let mut stats = VisitStats::default();
    let (value, millis) = timed(|| alpha_beta(&mut tree, root, depth, depth, -INF, INF, &mut stats));
    runs.push(AlgorithmRun { algorithm: Algorithm::AlphaBeta, value, best_child: tree.best_child_index(root), leaf_evals: stats.leaf_visits, millis });

    let mut frontier = FrontierSearcher::new(params.frontier);
    let (value, millis) = timed(|| frontier.explore_tree(&mut tree, depth));
    let value = value.context("frontier search")?;
    runs.push(AlgorithmRun { algorithm: Algorithm::Frontier, value, best_child: tree.best_child_index(root), leaf_evals: frontier.stats().leaf_evals, millis });

    let mut sss = SssSearcher::new(params.sss);
    let (value, millis) = timed(|| sss.sss_star(&mut tree, depth));
    let value = value.context("sss* search")?;
    runs.push(AlgorithmRun { algorithm: Algorithm::SssStar, value, best_child: tree.best_child_index(root), leaf_evals: sss.stats().leaf_evals, millis });

    let mismatches = cross_check(p.seed, &runs);
    for m in &mismatches {
        log::warn!("seed {}: {} returned {} but alpha-beta returned {}", m.seed, m.algorithm.name(), m.got, m.expected);
    }
    Ok(Report { params: *p, tree: tree.stats(), runs, mismatches })
}

/// Every run whose value differs from alpha-beta's in any bit.
pub fn cross_check(seed: u64, runs: &[AlgorithmRun]) -> Vec<Mismatch> {
    let Some(reference) = runs.iter().find(|r| r.algorithm == Algorithm::AlphaBeta) else { return Vec::new() };
    runs.iter()
        .filter(|r| r.value.to_bits() != reference.value.to_bits())
        .map(|r| Mismatch { seed, algorithm: r.algorithm, expected: reference.value, got: r.value })
        .collect()
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepSummary {
    pub depth: u32,
    pub branching_bound: u32,
    pub first_seed: u64,
    pub trees: u64,
    pub total_nodes: u64,
    /// Summed per algorithm, in the order the runs were made.
    pub leaf_evals: Vec<(Algorithm, u64)>,
    pub millis: Vec<(Algorithm, f64)>,
    pub mismatches: Vec<Mismatch>,
}

impl SweepSummary {
    fn absorb(&mut self, report: Report) {
        self.trees += 1;
        self.total_nodes += report.tree.total_nodes;
        for r in &report.runs {
            match self.leaf_evals.iter_mut().find(|(a, _)| *a == r.algorithm) {
                Some((_, n)) => *n += r.leaf_evals,
                None => self.leaf_evals.push((r.algorithm, r.leaf_evals)),
            }
            match self.millis.iter_mut().find(|(a, _)| *a == r.algorithm) {
                Some((_, ms)) => *ms += r.millis,
                None => self.millis.push((r.algorithm, r.millis)),
            }
        }
        self.mismatches.extend(report.mismatches);
    }
}

/// Runs `count` consecutive seeds starting at `params.tree.seed`.
pub fn sweep(params: &HarnessParams, count: u64, progress: bool) -> Result<SweepSummary> {
    let first = params.tree.seed;
    let Some(end) = first.checked_add(count) else {
        bail!("sweep of {count} seeds starting at {first} runs past the last seed");
    };
    let pb = if progress { ProgressBar::new(count) } else { ProgressBar::hidden() };
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} trees ({msg})")?
            .progress_chars("=>-"),
    );
    let mut summary = SweepSummary {
        depth: params.tree.depth,
        branching_bound: params.tree.branching_bound,
        first_seed: first,
        ..SweepSummary::default()
    };
    for seed in first..end {
        let p = HarnessParams { tree: TreeParams { seed, ..params.tree }, ..*params };
        let report = run(&p)?;
        summary.absorb(report);
        pb.set_message(format!("{} mismatches", summary.mismatches.len()));
        pb.inc(1);
    }
    pb.finish_and_clear();
    log::info!("sweep of {} trees done, {} mismatches", summary.trees, summary.mismatches.len());
    Ok(summary)
}
