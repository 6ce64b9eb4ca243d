//! Resource table: the authoritative resource -> state store.
//!
//! Records live behind an `Arc`, so a [`Snapshot`] is a reference-count bump
//! and the table copies the map only when it is next written while a snapshot
//! is still held.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::core::error::ContractError;
use crate::core::spec::{InstantiatedContract, ResourceRef};
use crate::core::state::{ResourceKind, State};

/// Current state of one resource plus the links recorded when it was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceRecord {
    pub state: State,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, ResourceRef>,
}

impl ResourceRecord {
    pub fn is_live(&self) -> bool {
        !self.state.is_terminal()
    }
}

type Records = BTreeMap<ResourceRef, ResourceRecord>;

/// Immutable point-in-time view of a resource table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    records: Arc<Records>,
}

impl Snapshot {
    pub fn get(&self, resource: &ResourceRef) -> Option<&ResourceRecord> {
        self.records.get(resource)
    }

    pub fn state_of(&self, resource: &ResourceRef) -> Option<State> {
        self.get(resource).map(|record| record.state)
    }

    /// True if the resource exists and is not in a terminal state.
    pub fn is_live(&self, resource: &ResourceRef) -> bool {
        self.get(resource).is_some_and(ResourceRecord::is_live)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceRef, &ResourceRecord)> {
        self.records.iter()
    }

    /// Records of one kind, ordered by name.
    pub fn of_kind(
        &self,
        kind: ResourceKind,
    ) -> impl Iterator<Item = (&ResourceRef, &ResourceRecord)> {
        self.records
            .iter()
            .filter(move |(resource, _)| resource.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Serialize for Snapshot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.records
                .iter()
                .map(|(resource, record)| (resource.to_string(), record)),
        )
    }
}

/// Mutable resource table validating contracts transactionally.
#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    records: Arc<Records>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table seeded from `snapshot`; later writes never affect the snapshot.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            records: Arc::clone(&snapshot.records),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            records: Arc::clone(&self.records),
        }
    }

    pub fn state_of(&self, resource: &ResourceRef) -> Option<State> {
        self.records.get(resource).map(|record| record.state)
    }

    /// Validate and apply `contract`: requirements, then productions, then
    /// transitions. On error the table is left exactly as it was.
    pub fn apply(&mut self, contract: &InstantiatedContract) -> Result<(), ContractError> {
        for require in &contract.requires {
            let actual = self.state_of(&require.resource);
            if !actual.is_some_and(|state| require.accepts(state)) {
                return Err(ContractError::RequirementNotSatisfied {
                    resource: require.resource.clone(),
                    expected: require.expected,
                    exclude: require.exclude.clone(),
                    actual,
                });
            }
        }

        // Staged writes; productions and transitions in the same contract see
        // each other's effects.
        let mut staged: Records = BTreeMap::new();

        for produce in &contract.produces {
            let resource = &produce.resource;
            if !resource.kind.allows(produce.initial) {
                return Err(ContractError::StateNotAllowed {
                    resource: resource.clone(),
                    state: produce.initial,
                });
            }
            if let Some(existing) = self.current(&staged, resource) {
                if existing.is_live() {
                    return Err(ContractError::ResourceAlreadyLive {
                        resource: resource.clone(),
                        state: existing.state,
                    });
                }
            }
            staged.insert(
                resource.clone(),
                ResourceRecord {
                    state: produce.initial,
                    metadata: produce.metadata.clone(),
                },
            );
        }

        for transition in &contract.transitions {
            let resource = &transition.resource;
            let current = self.current(&staged, resource).cloned();
            let actual = current.as_ref().map(|record| record.state);
            let accepted = actual.is_some_and(|state| {
                !state.is_terminal() && transition.from.accepts(state)
            });
            let Some(mut record) = current.filter(|_| accepted) else {
                return Err(ContractError::TransitionPreconditionViolated {
                    resource: resource.clone(),
                    from: transition.from,
                    to: transition.to,
                    actual,
                });
            };
            if !resource.kind.allows(transition.to) {
                return Err(ContractError::StateNotAllowed {
                    resource: resource.clone(),
                    state: transition.to,
                });
            }
            record.state = transition.to;
            staged.insert(resource.clone(), record);
        }

        if !staged.is_empty() {
            Arc::make_mut(&mut self.records).extend(staged);
        }
        Ok(())
    }

    fn current<'a>(
        &'a self,
        staged: &'a Records,
        resource: &ResourceRef,
    ) -> Option<&'a ResourceRecord> {
        staged.get(resource).or_else(|| self.records.get(resource))
    }
}
