//! Mutation engine: edits that keep a verb sequence valid end to end.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::error::ModelError;
use crate::core::replay::ReplayError;

pub mod config;
pub mod deps;
pub mod engine;
pub mod synth;

pub use config::{MutationWeights, MutatorConfig};
pub use engine::Mutator;
pub use synth::{SynthContext, Synthesize};

/// A committed edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    Insert {
        index: usize,
        verb: String,
    },
    /// `removed` counts the verb itself plus any cascaded dependents.
    Remove {
        index: usize,
        verb: String,
        removed: usize,
    },
    Move {
        from: usize,
        to: usize,
        verb: String,
    },
    Reparam {
        index: usize,
        verb: String,
    },
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::Insert { index, verb } => write!(f, "insert {verb} at {index}"),
            Mutation::Remove {
                index,
                verb,
                removed,
            } => write!(f, "remove {verb} at {index} ({removed} verbs)"),
            Mutation::Move { from, to, verb } => write!(f, "move {verb} {from} -> {to}"),
            Mutation::Reparam { index, verb } => write!(f, "reparam {verb} at {index}"),
        }
    }
}

/// Failure of a one-shot engine call.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("starting sequence is invalid: {0}")]
    InvalidScaffold(#[source] ReplayError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Apply one random mutation to `seq`, returning the resulting sequence
/// (the original when nothing committed) and the committed edit, if any.
pub fn mutate_sequence<V: Synthesize, R: Rng + ?Sized>(
    seq: Vec<V>,
    rng: &mut R,
    config: &MutatorConfig,
) -> Result<(Vec<V>, Option<Mutation>), EngineError> {
    let mut mutator = Mutator::new(seq, config.clone()).map_err(EngineError::InvalidScaffold)?;
    let mutation = mutator.mutate(rng)?;
    Ok((mutator.into_sequence(), mutation))
}
