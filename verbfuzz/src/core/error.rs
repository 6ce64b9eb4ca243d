//! Typed errors for contract modeling and contract validation.
//!
//! [`ModelError`] marks a defect in a verb's declared contract (bad path,
//! ambiguous target, undeclared state) and must surface to the caller.
//! [`ContractError`] is the ordinary outcome of validating a contract against
//! the current resource table.

use thiserror::Error;

use crate::core::spec::{ResourceRef, StateMatch};
use crate::core::state::{ResourceKind, State};

/// Malformed path expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathSyntaxError {
    #[error("path expression is empty")]
    Empty,
    #[error("path '{path}': empty segment at position {position}")]
    EmptySegment { path: String, position: usize },
    #[error("path '{path}': unbalanced bracket in segment '{segment}'")]
    UnbalancedBracket { path: String, segment: String },
    #[error("path '{path}': unexpected token '{token}'")]
    UnexpectedToken { path: String, token: String },
}

/// Defect in a declared contract, detected while instantiating it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("{node}: {source}")]
    PathSyntaxInvalid {
        node: &'static str,
        #[source]
        source: PathSyntaxError,
    },
    #[error("{node}: path '{path}' matched {count} {kind} resources where exactly one was expected")]
    PathResolutionAmbiguous {
        node: &'static str,
        path: String,
        kind: ResourceKind,
        count: usize,
    },
    #[error("{node}: path '{path}' matched no {kind} resource for a {role}")]
    Unresolved {
        node: &'static str,
        path: String,
        kind: ResourceKind,
        role: &'static str,
    },
    #[error("{node}: path '{path}' reached a {found} resource but the spec names {expected}")]
    KindMismatch {
        node: &'static str,
        path: String,
        expected: ResourceKind,
        found: ResourceKind,
    },
    #[error("{node}: state {state} is not declared for {kind}")]
    StateNotAllowed {
        node: &'static str,
        kind: ResourceKind,
        state: State,
    },
    #[error("{node}: contract-bearing field '{field}' does not exist")]
    UnknownContractField { node: &'static str, field: String },
}

/// Outcome of validating an instantiated contract against a resource table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error(
        "requirement not satisfied for {resource}: expected {expected}{}, found {}",
        excluded_suffix(.exclude),
        found(.actual)
    )]
    RequirementNotSatisfied {
        resource: ResourceRef,
        expected: StateMatch,
        exclude: Vec<State>,
        actual: Option<State>,
    },
    #[error("{resource} is already live in state {state}")]
    ResourceAlreadyLive { resource: ResourceRef, state: State },
    #[error(
        "transition precondition violated for {resource}: expected {from} -> {to}, found {}",
        found(.actual)
    )]
    TransitionPreconditionViolated {
        resource: ResourceRef,
        from: StateMatch,
        to: State,
        actual: Option<State>,
    },
    #[error("state {state} is not declared for {resource}")]
    StateNotAllowed { resource: ResourceRef, state: State },
}

impl ContractError {
    /// Resource the failure is about.
    pub fn resource(&self) -> &ResourceRef {
        match self {
            ContractError::RequirementNotSatisfied { resource, .. }
            | ContractError::ResourceAlreadyLive { resource, .. }
            | ContractError::TransitionPreconditionViolated { resource, .. }
            | ContractError::StateNotAllowed { resource, .. } => resource,
        }
    }
}

fn found(state: &Option<State>) -> &'static str {
    state.map_or("absent", State::label)
}

fn excluded_suffix(exclude: &[State]) -> String {
    if exclude.is_empty() {
        return String::new();
    }
    let labels: Vec<&str> = exclude.iter().map(|state| state.label()).collect();
    format!(" excluding [{}]", labels.join(", "))
}
