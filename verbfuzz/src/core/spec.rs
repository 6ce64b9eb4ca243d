//! Contract primitives: requirements, productions and transitions.
//!
//! A [`Contract`] is declared by a verb in terms of path expressions. An
//! [`InstantiatedContract`] is the same description after every path has been
//! resolved against one concrete verb instance.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::PathSyntaxError;
use crate::core::path::PathExpr;
use crate::core::state::{ResourceKind, State};

/// Identity of a tracked resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub name: String,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// Expected state of a requirement or source state of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateMatch {
    Any,
    Exactly(State),
}

impl StateMatch {
    pub fn accepts(self, state: State) -> bool {
        match self {
            StateMatch::Any => true,
            StateMatch::Exactly(expected) => expected == state,
        }
    }
}

impl fmt::Display for StateMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateMatch::Any => f.write_str("any"),
            StateMatch::Exactly(state) => write!(f, "{state}"),
        }
    }
}

/// A resource the verb needs, in an accepted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequireSpec {
    pub kind: ResourceKind,
    pub expected: StateMatch,
    pub path: String,
    pub exclude: Vec<State>,
    pub optional: bool,
}

impl RequireSpec {
    /// Require the resource in exactly `state`.
    pub fn in_state(kind: ResourceKind, path: impl Into<String>, state: State) -> Self {
        Self {
            kind,
            expected: StateMatch::Exactly(state),
            path: path.into(),
            exclude: Vec::new(),
            optional: false,
        }
    }

    /// Require the resource to exist and not be in a terminal state.
    pub fn live(kind: ResourceKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            expected: StateMatch::Any,
            path: path.into(),
            exclude: kind.terminal_states(),
            optional: false,
        }
    }

    /// Additionally reject the listed states.
    pub fn excluding(mut self, states: &[State]) -> Self {
        for state in states {
            if !self.exclude.contains(state) {
                self.exclude.push(*state);
            }
        }
        self
    }

    /// Accept an unresolved path as vacuously satisfied.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// A resource link recorded on a produced record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataSpec {
    pub key: String,
    pub path: String,
}

/// A resource the verb creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProduceSpec {
    pub kind: ResourceKind,
    pub initial: State,
    pub path: String,
    pub metadata: Vec<MetadataSpec>,
}

impl ProduceSpec {
    pub fn new(kind: ResourceKind, initial: State, path: impl Into<String>) -> Self {
        Self {
            kind,
            initial,
            path: path.into(),
            metadata: Vec::new(),
        }
    }

    /// Record the resource reached by `path` under `key` on the new record.
    pub fn with_metadata(mut self, key: impl Into<String>, path: impl Into<String>) -> Self {
        self.metadata.push(MetadataSpec {
            key: key.into(),
            path: path.into(),
        });
        self
    }
}

/// A state change the verb performs on an existing resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionSpec {
    pub kind: ResourceKind,
    pub from: StateMatch,
    pub to: State,
    pub path: String,
}

impl TransitionSpec {
    pub fn new(kind: ResourceKind, from: StateMatch, to: State, path: impl Into<String>) -> Self {
        Self {
            kind,
            from,
            to,
            path: path.into(),
        }
    }
}

/// Declared contract of one verb (or contract-bearing sub-object).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contract {
    pub requires: Vec<RequireSpec>,
    pub produces: Vec<ProduceSpec>,
    pub transitions: Vec<TransitionSpec>,
}

impl Contract {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, spec: RequireSpec) -> Self {
        self.requires.push(spec);
        self
    }

    pub fn produce(mut self, spec: ProduceSpec) -> Self {
        self.produces.push(spec);
        self
    }

    pub fn transition(mut self, spec: TransitionSpec) -> Self {
        self.transitions.push(spec);
        self
    }

    /// Parse every path the contract declares, reporting the first malformed one.
    pub fn check_paths(&self) -> Result<(), PathSyntaxError> {
        let metadata = self
            .produces
            .iter()
            .flat_map(|spec| spec.metadata.iter().map(|meta| meta.path.as_str()));
        self.requires
            .iter()
            .map(|spec| spec.path.as_str())
            .chain(self.produces.iter().map(|spec| spec.path.as_str()))
            .chain(self.transitions.iter().map(|spec| spec.path.as_str()))
            .chain(metadata)
            .try_for_each(|path| PathExpr::parse(path).map(|_| ()))
    }
}

/// Requirement bound to a concrete resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequire {
    pub resource: ResourceRef,
    pub expected: StateMatch,
    pub exclude: Vec<State>,
}

impl ResolvedRequire {
    /// Requirement that `resource` exists outside its terminal states.
    pub fn live(resource: ResourceRef) -> Self {
        Self {
            exclude: resource.kind.terminal_states(),
            resource,
            expected: StateMatch::Any,
        }
    }

    pub fn accepts(&self, state: State) -> bool {
        self.expected.accepts(state) && !self.exclude.contains(&state)
    }
}

/// Production bound to a concrete resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProduce {
    pub resource: ResourceRef,
    pub initial: State,
    pub metadata: BTreeMap<String, ResourceRef>,
}

/// Transition bound to a concrete resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTransition {
    pub resource: ResourceRef,
    pub from: StateMatch,
    pub to: State,
}

/// Fully concrete contract for one verb instance at one point in a sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstantiatedContract {
    pub requires: Vec<ResolvedRequire>,
    pub produces: Vec<ResolvedProduce>,
    pub transitions: Vec<ResolvedTransition>,
}

impl InstantiatedContract {
    /// Append `other`'s entries after this contract's entries.
    pub fn merge(&mut self, other: InstantiatedContract) {
        self.requires.extend(other.requires);
        self.produces.extend(other.produces);
        self.transitions.extend(other.transitions);
    }

    /// Every resource the contract touches, in declaration order (may repeat).
    pub fn resources(&self) -> impl Iterator<Item = &ResourceRef> {
        self.requires
            .iter()
            .map(|entry| &entry.resource)
            .chain(self.produces.iter().map(|entry| &entry.resource))
            .chain(self.transitions.iter().map(|entry| &entry.resource))
    }

    pub fn references(&self, resource: &ResourceRef) -> bool {
        self.resources().any(|candidate| candidate == resource)
    }

    pub fn is_produced(&self, resource: &ResourceRef) -> bool {
        self.produces.iter().any(|entry| &entry.resource == resource)
    }

    /// True if the contract leaves `resource` in `state`, by production or transition.
    pub fn establishes(&self, resource: &ResourceRef, state: State) -> bool {
        self.produces
            .iter()
            .any(|entry| &entry.resource == resource && entry.initial == state)
            || self
                .transitions
                .iter()
                .any(|entry| &entry.resource == resource && entry.to == state)
    }

    pub fn is_transitioned(&self, resource: &ResourceRef) -> bool {
        self.transitions
            .iter()
            .any(|entry| &entry.resource == resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_requirement_excludes_terminal_states() {
        let spec = RequireSpec::live(ResourceKind::Qp, "qp");
        assert_eq!(spec.expected, StateMatch::Any);
        assert_eq!(spec.exclude, vec![State::Destroyed]);
    }

    #[test]
    fn excluding_does_not_duplicate_states() {
        let spec = RequireSpec::live(ResourceKind::Qp, "qp")
            .excluding(&[State::Reset, State::Destroyed]);
        assert_eq!(spec.exclude, vec![State::Destroyed, State::Reset]);
    }

    #[test]
    fn check_paths_reports_metadata_paths_too() {
        let contract = Contract::new().produce(
            ProduceSpec::new(ResourceKind::Mr, State::Registered, "mr").with_metadata("pd", "pd["),
        );
        assert!(matches!(
            contract.check_paths(),
            Err(PathSyntaxError::UnbalancedBracket { .. })
        ));
    }

    #[test]
    fn merge_concatenates_in_order() {
        let qp = ResourceRef::new(ResourceKind::Qp, "qp0");
        let cq = ResourceRef::new(ResourceKind::Cq, "cq0");
        let mut head = InstantiatedContract {
            requires: vec![ResolvedRequire {
                resource: qp.clone(),
                expected: StateMatch::Any,
                exclude: Vec::new(),
            }],
            ..InstantiatedContract::default()
        };
        let tail = InstantiatedContract {
            requires: vec![ResolvedRequire {
                resource: cq.clone(),
                expected: StateMatch::Any,
                exclude: Vec::new(),
            }],
            ..InstantiatedContract::default()
        };
        head.merge(tail);
        let order: Vec<&ResourceRef> = head.resources().collect();
        assert_eq!(order, vec![&qp, &cq]);
    }
}
