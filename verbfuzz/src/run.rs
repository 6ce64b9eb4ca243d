//! Multi-round mutation runs over a scaffold.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::mutate::{EngineError, Mutation, Mutator, MutatorConfig};
use crate::scaffold::Scaffold;

/// Result of [`run_mutations`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub seed: u64,
    pub rounds: u32,
    /// Committed edits in the order they were applied.
    pub mutations: Vec<Mutation>,
    /// The sequence after the last round.
    pub scaffold: Scaffold,
}

impl RunOutcome {
    pub fn committed(&self) -> usize {
        self.mutations.len()
    }
}

/// Run `rounds` mutation rounds seeded with `seed`.
///
/// The same scaffold, config and seed always produce the same outcome.
/// Rounds that commit nothing are skipped over; the run continues from the
/// unchanged sequence.
#[instrument(skip(scaffold, config))]
pub fn run_mutations(
    scaffold: &Scaffold,
    config: &MutatorConfig,
    seed: u64,
    rounds: u32,
) -> Result<RunOutcome, EngineError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut mutator =
        Mutator::new(scaffold.verbs.clone(), config.clone()).map_err(EngineError::InvalidScaffold)?;
    let mut mutations = Vec::new();
    for round in 0..rounds {
        if let Some(mutation) = mutator.mutate(&mut rng)? {
            mutations.push(mutation);
        } else {
            info!(round, "round committed nothing");
        }
    }
    let mut result = Scaffold::new(mutator.into_sequence());
    result.description = scaffold.description.clone();
    Ok(RunOutcome {
        seed,
        rounds,
        mutations,
        scaffold: result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::replay::replay;
    use crate::scaffold::builtin;

    #[test]
    fn same_seed_same_outcome() {
        let scaffold = builtin("rc_send_recv").expect("builtin");
        let config = MutatorConfig::default();
        let first = run_mutations(&scaffold, &config, 7, 12).expect("run");
        let second = run_mutations(&scaffold, &config, 7, 12).expect("run");
        assert_eq!(first, second);
        assert!(first.committed() <= 12);
    }

    #[test]
    fn outcome_sequence_replays() {
        let scaffold = builtin("endpoint_lifecycle").expect("builtin");
        for seed in 0..8 {
            let outcome =
                run_mutations(&scaffold, &MutatorConfig::default(), seed, 10).expect("run");
            replay(&outcome.scaffold.verbs)
                .unwrap_or_else(|err| panic!("seed {seed}: {err}"));
            assert_eq!(outcome.scaffold.description, scaffold.description);
        }
    }

    #[test]
    fn invalid_scaffold_is_an_engine_error() {
        let scaffold = Scaffold::new(vec![crate::verbs::DestroyQp::new("qp0").into()]);
        let err = run_mutations(&scaffold, &MutatorConfig::default(), 1, 1).expect_err("invalid");
        assert!(matches!(err, EngineError::InvalidScaffold(_)));
    }
}
