//! Per-seed soak checks.
//!
//! Each seed runs the engine once, replays the result end to end, then runs
//! the same seed again and compares digests of the two outcomes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use verbfuzz::core::replay::replay;
use verbfuzz::mutate::MutatorConfig;
use verbfuzz::run::{RunOutcome, run_mutations};
use verbfuzz::scaffold::Scaffold;

/// What one seed showed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedRun {
    pub seed: u64,
    pub committed: usize,
    pub final_len: usize,
    /// SHA-256 of the serialized first outcome.
    pub digest: String,
    /// Replay failure of the mutated sequence, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_error: Option<String>,
    pub reproducible: bool,
    /// Engine failure (a modeling defect), if the run aborted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_error: Option<String>,
}

impl SeedRun {
    pub fn passed(&self) -> bool {
        self.engine_error.is_none() && self.safety_error.is_none() && self.reproducible
    }
}

#[instrument(skip(scaffold, config))]
pub fn soak_seed(scaffold: &Scaffold, config: &MutatorConfig, seed: u64, rounds: u32) -> SeedRun {
    let first = match run_mutations(scaffold, config, seed, rounds) {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!(%err, "engine failed");
            return aborted(seed, 0, scaffold.verbs.len(), None, err.to_string());
        }
    };
    let safety_error = replay(&first.scaffold.verbs).err().map(|err| err.to_string());
    if let Some(err) = &safety_error {
        warn!(%err, "mutated sequence does not replay");
    }

    let digest = match outcome_digest(&first) {
        Ok(digest) => digest,
        Err(err) => {
            warn!(err = %format!("{err:#}"), "outcome digest failed");
            return aborted(
                seed,
                first.committed(),
                first.scaffold.verbs.len(),
                safety_error,
                format!("digest: {err:#}"),
            );
        }
    };
    let reproducible = match run_mutations(scaffold, config, seed, rounds) {
        Ok(second) => outcome_digest(&second).is_ok_and(|again| again == digest),
        Err(_) => false,
    };
    debug!(committed = first.committed(), reproducible, "seed done");

    SeedRun {
        seed,
        committed: first.committed(),
        final_len: first.scaffold.verbs.len(),
        digest,
        safety_error,
        reproducible,
        engine_error: None,
    }
}

/// A run that stopped before its outcome could be compared.
fn aborted(
    seed: u64,
    committed: usize,
    final_len: usize,
    safety_error: Option<String>,
    engine_error: String,
) -> SeedRun {
    SeedRun {
        seed,
        committed,
        final_len,
        digest: String::new(),
        safety_error,
        reproducible: false,
        engine_error: Some(engine_error),
    }
}

pub fn outcome_digest(outcome: &RunOutcome) -> Result<String> {
    let bytes = serde_json::to_vec(outcome).context("serialize run outcome")?;
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Ok(hex::encode(hasher.finalize()))
}
