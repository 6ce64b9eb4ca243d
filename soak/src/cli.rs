//! CLI command implementations.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{debug, info};

use verbfuzz::io::config::{FuzzConfig, load_config};
use verbfuzz::io::scaffold_store::load_scaffold;
use verbfuzz::scaffold::{Scaffold, builtin};

use crate::report::{SoakReport, SoakSummary, load_report, summarize, write_report};
use crate::run::soak_seed;

pub struct RunArgs {
    pub scaffold: String,
    pub seeds: u32,
    pub rounds: Option<u32>,
    pub config: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub seed_base: Option<u64>,
}

/// Soak a scaffold across seeds, write the report and fail if any seed failed.
pub fn run_soak(args: &RunArgs) -> Result<()> {
    if args.seeds == 0 {
        bail!("seeds must be > 0");
    }
    let cfg = match &args.config {
        Some(path) => load_config(path)?,
        None => FuzzConfig::default(),
    };
    let rounds = args.rounds.unwrap_or(cfg.rounds);
    if rounds == 0 {
        bail!("rounds must be > 0");
    }
    let scaffold = resolve_scaffold(&args.scaffold)?;
    let seeds: Vec<u64> = match args.seed_base {
        Some(base) => (0..u64::from(args.seeds))
            .map(|offset| base.wrapping_add(offset))
            .collect(),
        None => (0..args.seeds).map(|_| rand::random()).collect(),
    };
    debug!(seeds = seeds.len(), rounds, "soak configured");

    let started_at = Utc::now();
    let runs = seeds
        .iter()
        .map(|&seed| soak_seed(&scaffold, &cfg.mutation, seed, rounds))
        .collect();
    let finished_at = Utc::now();
    let report = SoakReport {
        scaffold: args.scaffold.clone(),
        rounds,
        started_at: started_at.to_rfc3339(),
        finished_at: finished_at.to_rfc3339(),
        runs,
    };

    let out = args.out.clone().unwrap_or_else(|| {
        PathBuf::from(format!("soak-{}.json", started_at.format("%Y%m%d_%H%M%S")))
    });
    write_report(&out, &report)?;
    info!(path = %out.display(), "report written");

    let summary = summarize(&report);
    print_summary(&report.scaffold, &summary);
    println!("report: path={}", out.display());
    if summary.failures() > 0 {
        bail!("{} soak failures", summary.failures());
    }
    Ok(())
}

/// Summarize a written report.
pub fn show_report(path: &Path) -> Result<()> {
    let report = load_report(path)?;
    let summary = summarize(&report);
    print_summary(&report.scaffold, &summary);
    for run in report.runs.iter().filter(|run| !run.passed()) {
        let reason = run
            .engine_error
            .as_deref()
            .or(run.safety_error.as_deref())
            .unwrap_or("not reproducible");
        println!("report: fail seed={} {}", run.seed, reason);
    }
    Ok(())
}

fn print_summary(scaffold: &str, summary: &SoakSummary) {
    println!("report: scaffold={} runs={}", scaffold, summary.runs);
    println!(
        "report: safety_failures={} reproducibility_failures={} engine_errors={}",
        summary.safety_failures, summary.reproducibility_failures, summary.engine_errors
    );
    if let Some(mean) = summary.mean_committed {
        println!("report: mean_committed={:.2}", mean);
    }
}

/// A built-in scaffold name, or else a path to a scaffold file.
fn resolve_scaffold(source: &str) -> Result<Scaffold> {
    if let Some(scaffold) = builtin(source) {
        return Ok(scaffold);
    }
    let path = Path::new(source);
    if !path.exists() {
        bail!("scaffold {} is neither a built-in nor a file", source);
    }
    load_scaffold(path).context("load soak scaffold")
}
