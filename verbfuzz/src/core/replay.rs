//! Sequence replay: instantiate and apply each verb in order.

use thiserror::Error;
use tracing::trace;

use crate::core::error::{ContractError, ModelError};
use crate::core::instantiate::instantiate;
use crate::core::node::Node;
use crate::core::spec::InstantiatedContract;
use crate::core::table::{ResourceTable, Snapshot};

/// Replay failure pinned to the verb that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("verb {index} ({verb}): {source}")]
    Model {
        index: usize,
        verb: &'static str,
        #[source]
        source: ModelError,
    },
    #[error("verb {index} ({verb}): {source}")]
    Contract {
        index: usize,
        verb: &'static str,
        #[source]
        source: ContractError,
    },
}

impl ReplayError {
    pub fn index(&self) -> usize {
        match self {
            ReplayError::Model { index, .. } | ReplayError::Contract { index, .. } => *index,
        }
    }
}

/// Per-verb results of replaying a run of verbs from a starting snapshot.
#[derive(Debug, Clone, Default)]
pub struct Replay {
    /// Instantiated contract of each replayed verb.
    pub contracts: Vec<InstantiatedContract>,
    /// `snapshots[i]` is the state before verb `i`; the last entry is the
    /// state after the final verb, so there is one more snapshot than verbs.
    pub snapshots: Vec<Snapshot>,
}

/// Replay `verbs` against a table seeded from `start`.
///
/// `offset` is the sequence index of `verbs[0]` and only affects error
/// reporting.
pub fn replay_from<V: Node>(
    start: &Snapshot,
    verbs: &[V],
    offset: usize,
) -> Result<Replay, ReplayError> {
    let mut table = ResourceTable::from_snapshot(start);
    let mut out = Replay {
        contracts: Vec::with_capacity(verbs.len()),
        snapshots: Vec::with_capacity(verbs.len() + 1),
    };
    out.snapshots.push(table.snapshot());

    for (position, verb) in verbs.iter().enumerate() {
        let contract = apply_verb(&mut table, verb, offset + position)?;
        out.contracts.push(contract);
        out.snapshots.push(table.snapshot());
    }

    Ok(out)
}

/// Replay a whole sequence through a fresh table.
pub fn replay<V: Node>(verbs: &[V]) -> Result<ResourceTable, ReplayError> {
    let mut table = ResourceTable::new();
    for (index, verb) in verbs.iter().enumerate() {
        apply_verb(&mut table, verb, index)?;
    }
    Ok(table)
}

/// Instantiate `verb` and apply it, pinning any failure to `index`.
fn apply_verb<V: Node>(
    table: &mut ResourceTable,
    verb: &V,
    index: usize,
) -> Result<InstantiatedContract, ReplayError> {
    let contract = instantiate(verb).map_err(|source| ReplayError::Model {
        index,
        verb: verb.type_name(),
        source,
    })?;
    table
        .apply(&contract)
        .map_err(|source| ReplayError::Contract {
            index,
            verb: verb.type_name(),
            source,
        })?;
    trace!(index, verb = verb.type_name(), "applied");
    Ok(contract)
}

/// Snapshot before every position, plus the final state.
pub fn prefix_snapshots<V: Node>(verbs: &[V]) -> Result<Vec<Snapshot>, ReplayError> {
    replay_from(&Snapshot::default(), verbs, 0).map(|replay| replay.snapshots)
}
