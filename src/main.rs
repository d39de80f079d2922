use abfrontier::harness::{self, Algorithm, HarnessParams, Report, SweepSummary};
use abfrontier::search::{FrontierParams, SssParams};
use abfrontier::tree::TreeParams;
use anyhow::{bail, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Compare frontier alpha-beta and SSS* against recursive searches on random game trees", long_about = None)]
struct Args {
    /// Tree depth (leaves sit at this level)
    #[arg(long, default_value_t = 5)]
    depth: u32,

    /// Every interior node gets between 1 and this many children
    #[arg(long, default_value_t = 16)]
    branching: u32,

    /// Generator seed (first seed of a sweep)
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Run this many consecutive seeds instead of a single tree
    #[arg(long, default_value_t = 0)]
    sweep: u64,

    /// Worker threads for wave mapping (0 = rayon default)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Capacity of the SSS* OPEN list
    #[arg(long, default_value_t = 1 << 20)]
    open_capacity: usize,

    /// Waves shorter than this are processed inline
    #[arg(long, default_value_t = 512)]
    parallel_min_wave: usize,

    /// Never map waves with rayon
    #[arg(long)]
    no_parallel: bool,

    /// Skip plain negamax (slow on wide trees)
    #[arg(long)]
    skip_negamax: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn harness_params(&self) -> HarnessParams {
        HarnessParams {
            tree: TreeParams { depth: self.depth, branching_bound: self.branching, seed: self.seed },
            frontier: FrontierParams { parallel: !self.no_parallel, parallel_min_wave: self.parallel_min_wave },
            sss: SssParams { open_capacity: self.open_capacity },
            skip_negamax: self.skip_negamax,
        }
    }
}

fn print_report(r: &Report) {
    println!("depth={} branching<={} seed={}", r.params.depth, r.params.branching_bound, r.params.seed);
    println!("nodes={} leaves={}", r.tree.total_nodes, r.tree.leaf_nodes);
    for run in &r.runs {
        let best = run.best_child.map_or_else(|| "-".to_string(), |b| b.to_string());
        println!("{:<10} value={:>7.2} best={:>3} leaves={:>10} time={:.3}ms", run.algorithm.name(), run.value, best, run.leaf_evals, run.millis);
    }
    if let (Some(ab), Some(nm)) = (r.run_of(Algorithm::AlphaBeta), r.run_of(Algorithm::Negamax)) {
        if nm.leaf_evals > 0 {
            println!("alpha-beta read {:.1}% of the leaves negamax read", 100.0 * ab.leaf_evals as f64 / nm.leaf_evals as f64);
        }
    }
}

fn print_summary(s: &SweepSummary) {
    println!("sweep depth={} branching<={} seeds {}..{}", s.depth, s.branching_bound, s.first_seed, s.first_seed + s.trees);
    println!("trees={} nodes={}", s.trees, s.total_nodes);
    for ((algorithm, leaves), (_, ms)) in s.leaf_evals.iter().zip(&s.millis) {
        println!("{:<10} leaves={:>12} time={:.3}ms", algorithm.name(), leaves, ms);
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let params = args.harness_params();

    let work = || -> Result<Vec<harness::Mismatch>> {
        if args.sweep > 0 {
            let summary = harness::sweep(&params, args.sweep, !args.json)?;
            if args.json { println!("{}", serde_json::to_string_pretty(&summary)?); } else { print_summary(&summary); }
            Ok(summary.mismatches)
        } else {
            let report = harness::run(&params)?;
            if args.json { println!("{}", serde_json::to_string_pretty(&report)?); } else { print_report(&report); }
            Ok(report.mismatches)
        }
    };
    let mismatches = if args.threads > 0 {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(args.threads).build()?;
        pool.install(work)?
    } else {
        work()?
    };

    if let Some(m) = mismatches.first() {
        bail!("{} mismatches; first: seed {} {} returned {} instead of {}", mismatches.len(), m.seed, m.algorithm.name(), m.got, m.expected);
    }
    Ok(())
}
