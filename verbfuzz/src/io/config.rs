//! Fuzzer configuration, usually `verbfuzz.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::mutate::MutatorConfig;

/// Fuzzer configuration (TOML).
///
/// Missing fields take their defaults, so an empty file is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FuzzConfig {
    /// Mutation rounds per `mutate` run.
    pub rounds: u32,

    /// Seed used when the command line does not give one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    pub mutation: MutatorConfig,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            rounds: 16,
            seed: None,
            mutation: MutatorConfig::default(),
        }
    }
}

impl FuzzConfig {
    pub fn validate(&self) -> Result<()> {
        if self.rounds == 0 {
            return Err(anyhow!("rounds must be > 0"));
        }
        let problems = self.mutation.problems();
        if !problems.is_empty() {
            return Err(anyhow!("{}", problems.join("; ")));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `FuzzConfig::default()`.
pub fn load_config(path: &Path) -> Result<FuzzConfig> {
    if !path.exists() {
        let cfg = FuzzConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: FuzzConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &FuzzConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, FuzzConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("verbfuzz.toml");
        let mut cfg = FuzzConfig {
            seed: Some(42),
            ..FuzzConfig::default()
        };
        cfg.mutation.weights.relocate = 7;
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_keeps_defaults_and_reads_move_weight() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("verbfuzz.toml");
        fs::write(&path, "rounds = 3\n[mutation.weights]\nmove = 9\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.rounds, 3);
        assert_eq!(cfg.mutation.weights.relocate, 9);
        assert_eq!(cfg.mutation.weights.insert, 4);
        assert_eq!(cfg.mutation.max_attempts, 64);
    }

    #[test]
    fn zero_rounds_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("verbfuzz.toml");
        fs::write(&path, "rounds = 0\n").expect("write");
        let err = load_config(&path).expect_err("invalid");
        assert!(format!("{err:#}").contains("rounds must be > 0"));
    }
}
