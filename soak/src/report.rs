//! Soak report persistence and aggregation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::run::SeedRun;

/// A soak run, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoakReport {
    /// Built-in name or file path the scaffold came from.
    pub scaffold: String,
    pub rounds: u32,
    /// RFC 3339 timestamps.
    pub started_at: String,
    pub finished_at: String,
    pub runs: Vec<SeedRun>,
}

#[derive(Debug, Default, PartialEq)]
pub struct SoakSummary {
    pub runs: usize,
    pub safety_failures: usize,
    pub reproducibility_failures: usize,
    pub engine_errors: usize,
    pub mean_committed: Option<f64>,
}

impl SoakSummary {
    pub fn failures(&self) -> usize {
        self.safety_failures + self.reproducibility_failures + self.engine_errors
    }
}

pub fn summarize(report: &SoakReport) -> SoakSummary {
    let mut summary = SoakSummary {
        runs: report.runs.len(),
        ..SoakSummary::default()
    };
    let mut committed = 0usize;
    for run in &report.runs {
        if run.engine_error.is_some() {
            summary.engine_errors += 1;
            continue;
        }
        if run.safety_error.is_some() {
            summary.safety_failures += 1;
        }
        if !run.reproducible {
            summary.reproducibility_failures += 1;
        }
        committed += run.committed;
    }
    let completed = summary.runs - summary.engine_errors;
    if completed > 0 {
        summary.mean_committed = Some(committed as f64 / completed as f64);
    }
    summary
}

pub fn write_report(path: &Path, report: &SoakReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
    }
    let contents = serde_json::to_string_pretty(report).context("serialize report")?;
    fs::write(path, format!("{contents}\n"))
        .with_context(|| format!("write report {}", path.display()))?;
    Ok(())
}

pub fn load_report(path: &Path) -> Result<SoakReport> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse report {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn seed_run(seed: u64, committed: usize) -> SeedRun {
        SeedRun {
            seed,
            committed,
            final_len: 9,
            digest: "00".repeat(32),
            safety_error: None,
            reproducible: true,
            engine_error: None,
        }
    }

    fn report(runs: Vec<SeedRun>) -> SoakReport {
        SoakReport {
            scaffold: "endpoint_lifecycle".to_string(),
            rounds: 4,
            started_at: "2026-01-01T00:00:00+00:00".to_string(),
            finished_at: "2026-01-01T00:00:01+00:00".to_string(),
            runs,
        }
    }

    #[test]
    fn aggregates_failures_and_mean() {
        let mut unsafe_run = seed_run(2, 3);
        unsafe_run.safety_error = Some("verb 4 (DestroyQp): ...".to_string());
        let mut flaky = seed_run(3, 1);
        flaky.reproducible = false;
        let mut broken = seed_run(4, 0);
        broken.engine_error = Some("model error".to_string());
        broken.reproducible = false;

        let summary = summarize(&report(vec![seed_run(1, 2), unsafe_run, flaky, broken]));
        assert_eq!(summary.runs, 4);
        assert_eq!(summary.safety_failures, 1);
        assert_eq!(summary.reproducibility_failures, 1);
        assert_eq!(summary.engine_errors, 1);
        assert_eq!(summary.failures(), 3);
        assert_eq!(summary.mean_committed, Some(2.0));
    }

    #[test]
    fn empty_report_has_no_mean() {
        let summary = summarize(&report(Vec::new()));
        assert_eq!(summary, SoakSummary::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("reports").join("soak.json");
        let original = report(vec![seed_run(7, 1)]);
        write_report(&path, &original).expect("write");
        assert_eq!(load_report(&path).expect("load"), original);
    }
}
