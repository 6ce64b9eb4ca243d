//! Dependency queries over the instantiated contracts of a sequence.

use crate::core::spec::{InstantiatedContract, ResourceRef};
use crate::core::state::State;
use crate::core::table::Snapshot;

/// Indices of verbs in the first lifecycle of `resource` whose contracts
/// reference it.
///
/// The lifecycle starts at the first producer (or, if nothing produces it,
/// the first verb transitioning it) and ends before the next verb that
/// produces it again.
pub fn dependent_verbs(contracts: &[InstantiatedContract], resource: &ResourceRef) -> Vec<usize> {
    let start = contracts
        .iter()
        .position(|contract| contract.is_produced(resource))
        .or_else(|| {
            contracts
                .iter()
                .position(|contract| contract.is_transitioned(resource))
        });
    match start {
        Some(start) => lifecycle_dependents(contracts, resource, start),
        None => Vec::new(),
    }
}

/// Indices after `start` that reference `resource`, up to the next verb that
/// produces it again.
pub fn lifecycle_dependents(
    contracts: &[InstantiatedContract],
    resource: &ResourceRef,
    start: usize,
) -> Vec<usize> {
    (start + 1..lifecycle_end(contracts, resource, start))
        .filter(|&index| contracts[index].references(resource))
        .collect()
}

/// Like [`dependent_verbs`], scanning from the first verb that leaves
/// `resource` in `state` and keeping only verbs that see it in that state.
///
/// `snapshots[i]` must be the state before verb `i`.
pub fn dependent_verbs_stateful(
    contracts: &[InstantiatedContract],
    snapshots: &[Snapshot],
    resource: &ResourceRef,
    state: State,
) -> Vec<usize> {
    let Some(start) = contracts
        .iter()
        .position(|contract| contract.establishes(resource, state))
    else {
        return Vec::new();
    };
    (start + 1..lifecycle_end(contracts, resource, start))
        .filter(|&index| {
            contracts[index].references(resource)
                && snapshots
                    .get(index)
                    .and_then(|snapshot| snapshot.state_of(resource))
                    == Some(state)
        })
        .collect()
}

fn lifecycle_end(contracts: &[InstantiatedContract], resource: &ResourceRef, start: usize) -> usize {
    (start + 1..contracts.len())
        .find(|&index| contracts[index].is_produced(resource))
        .unwrap_or(contracts.len())
}

/// Resources produced by the verb at `index`.
pub fn produced_by(contracts: &[InstantiatedContract], index: usize) -> Vec<ResourceRef> {
    contracts
        .get(index)
        .map(|contract| {
            contract
                .produces
                .iter()
                .map(|entry| entry.resource.clone())
                .collect()
        })
        .unwrap_or_default()
}
