//! Contract instantiation: resolving a verb's declared contract into concrete
//! resource references.
//!
//! Target cardinality rules:
//! - A production or transition must reach at least one resource.
//! - A requirement on a wildcard-free path must reach its resource unless the
//!   spec is optional; an unresolved optional requirement contributes nothing.
//! - A requirement on a wildcard path is satisfied vacuously by zero matches.
//! - Every wildcard match becomes its own entry (first occurrence kept).
//! - A metadata link must reach at most one resource; zero omits the key.

use std::collections::BTreeMap;

use crate::core::error::ModelError;
use crate::core::node::{Field, Node, ResourceLeaf};
use crate::core::path::PathExpr;
use crate::core::spec::{
    InstantiatedContract, ProduceSpec, ResolvedProduce, ResolvedRequire, ResolvedTransition,
    ResourceRef, StateMatch,
};
use crate::core::state::{ResourceKind, State};

/// Instantiate `node`'s contract, merged with those of its contract-bearing
/// sub-objects (own entries first, then each child in declaration order).
pub fn instantiate(node: &dyn Node) -> Result<InstantiatedContract, ModelError> {
    let mut contract = InstantiatedContract::default();
    instantiate_into(node, &mut contract)?;
    Ok(contract)
}

fn instantiate_into(node: &dyn Node, out: &mut InstantiatedContract) -> Result<(), ModelError> {
    let contract = node.contract();

    for spec in &contract.requires {
        let expr = parse(node, &spec.path)?;
        let targets = targets(node, &expr, spec.kind)?;
        if targets.is_empty() && !spec.optional && !expr.has_wildcard() {
            return Err(ModelError::Unresolved {
                node: node.type_name(),
                path: spec.path.clone(),
                kind: spec.kind,
                role: "requirement",
            });
        }
        out.requires
            .extend(targets.into_iter().map(|resource| ResolvedRequire {
                resource,
                expected: spec.expected,
                exclude: spec.exclude.clone(),
            }));
    }

    for spec in &contract.produces {
        check_state(node, spec.kind, spec.initial)?;
        let expr = parse(node, &spec.path)?;
        let targets = mandatory_targets(node, &expr, spec.kind, "production")?;
        let metadata = metadata(node, spec)?;
        out.produces
            .extend(targets.into_iter().map(|resource| ResolvedProduce {
                resource,
                initial: spec.initial,
                metadata: metadata.clone(),
            }));
    }

    for spec in &contract.transitions {
        check_state(node, spec.kind, spec.to)?;
        if let StateMatch::Exactly(from) = spec.from {
            check_state(node, spec.kind, from)?;
        }
        let expr = parse(node, &spec.path)?;
        let targets = mandatory_targets(node, &expr, spec.kind, "transition")?;
        out.transitions
            .extend(targets.into_iter().map(|resource| ResolvedTransition {
                resource,
                from: spec.from,
                to: spec.to,
            }));
    }

    for field_name in node.contract_fields() {
        let Some(field) = node.field(field_name) else {
            return Err(ModelError::UnknownContractField {
                node: node.type_name(),
                field: field_name.to_string(),
            });
        };
        for child in child_nodes(field) {
            instantiate_into(child, out)?;
        }
    }

    Ok(())
}

fn parse(node: &dyn Node, raw: &str) -> Result<PathExpr, ModelError> {
    PathExpr::parse(raw).map_err(|source| ModelError::PathSyntaxInvalid {
        node: node.type_name(),
        source,
    })
}

fn check_state(node: &dyn Node, kind: ResourceKind, state: State) -> Result<(), ModelError> {
    if kind.allows(state) {
        return Ok(());
    }
    Err(ModelError::StateNotAllowed {
        node: node.type_name(),
        kind,
        state,
    })
}

fn targets(
    node: &dyn Node,
    expr: &PathExpr,
    kind: ResourceKind,
) -> Result<Vec<ResourceRef>, ModelError> {
    expr.resolve_unique(node)
        .into_iter()
        .map(|leaf| to_ref(node, expr, kind, leaf))
        .collect()
}

fn mandatory_targets(
    node: &dyn Node,
    expr: &PathExpr,
    kind: ResourceKind,
    role: &'static str,
) -> Result<Vec<ResourceRef>, ModelError> {
    let found = targets(node, expr, kind)?;
    if found.is_empty() {
        return Err(ModelError::Unresolved {
            node: node.type_name(),
            path: expr.as_str().to_string(),
            kind,
            role,
        });
    }
    Ok(found)
}

fn metadata(
    node: &dyn Node,
    spec: &ProduceSpec,
) -> Result<BTreeMap<String, ResourceRef>, ModelError> {
    let mut links = BTreeMap::new();
    for meta in &spec.metadata {
        let expr = parse(node, &meta.path)?;
        let leaves = expr.resolve_unique(node);
        match leaves.as_slice() {
            [] => {}
            [leaf] => {
                let kind = leaf.kind;
                links.insert(meta.key.clone(), to_ref(node, &expr, kind, *leaf)?);
            }
            [first, ..] => {
                return Err(ModelError::PathResolutionAmbiguous {
                    node: node.type_name(),
                    path: meta.path.clone(),
                    kind: first.kind,
                    count: leaves.len(),
                });
            }
        }
    }
    Ok(links)
}

fn to_ref(
    node: &dyn Node,
    expr: &PathExpr,
    kind: ResourceKind,
    leaf: ResourceLeaf<'_>,
) -> Result<ResourceRef, ModelError> {
    if leaf.kind != kind {
        return Err(ModelError::KindMismatch {
            node: node.type_name(),
            path: expr.as_str().to_string(),
            expected: kind,
            found: leaf.kind,
        });
    }
    Ok(ResourceRef::new(kind, leaf.name))
}

fn child_nodes(field: Field<'_>) -> Vec<&dyn Node> {
    match field {
        Field::Node(node) => vec![node],
        Field::List(items) => items.into_iter().flat_map(child_nodes).collect(),
        Field::Scalar | Field::Null | Field::Resource(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spec::{Contract, RequireSpec, TransitionSpec};

    /// Minimal endpoint with a contract-bearing attribute object.
    struct Attr {
        send: String,
        recv: String,
        shared: Option<String>,
    }

    struct Endpoint {
        name: String,
        domain: String,
        attr: Attr,
        peers: Vec<String>,
        extra: Contract,
    }

    impl Node for Attr {
        fn type_name(&self) -> &'static str {
            "Attr"
        }

        fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
            vec![
                ("send", Field::resource(ResourceKind::Cq, &self.send)),
                ("recv", Field::resource(ResourceKind::Cq, &self.recv)),
                (
                    "shared",
                    Field::optional_resource(ResourceKind::Srq, self.shared.as_ref()),
                ),
            ]
        }

        fn contract(&self) -> Contract {
            Contract::new()
                .require(RequireSpec::live(ResourceKind::Cq, "send"))
                .require(RequireSpec::live(ResourceKind::Cq, "recv"))
                .require(RequireSpec::live(ResourceKind::Srq, "shared").optional())
        }
    }

    impl Node for Endpoint {
        fn type_name(&self) -> &'static str {
            "Endpoint"
        }

        fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
            vec![
                ("name", Field::resource(ResourceKind::Qp, &self.name)),
                ("domain", Field::resource(ResourceKind::Pd, &self.domain)),
                ("attr", Field::node(&self.attr)),
                (
                    "peers",
                    Field::List(
                        self.peers
                            .iter()
                            .map(|peer| Field::resource(ResourceKind::Qp, peer))
                            .collect(),
                    ),
                ),
            ]
        }

        fn contract(&self) -> Contract {
            let mut contract = Contract::new()
                .require(RequireSpec::live(ResourceKind::Pd, "domain"))
                .produce(
                    ProduceSpec::new(ResourceKind::Qp, State::Reset, "name")
                        .with_metadata("pd", "domain")
                        .with_metadata("srq", "attr.shared"),
                )
                .require(RequireSpec::live(ResourceKind::Qp, "peers[*]"));
            contract.requires.extend(self.extra.requires.iter().cloned());
            contract.produces.extend(self.extra.produces.iter().cloned());
            contract
                .transitions
                .extend(self.extra.transitions.iter().cloned());
            contract
        }

        fn contract_fields(&self) -> &'static [&'static str] {
            &["attr"]
        }
    }

    fn endpoint() -> Endpoint {
        Endpoint {
            name: "qp0".to_string(),
            domain: "pd0".to_string(),
            attr: Attr {
                send: "cq0".to_string(),
                recv: "cq0".to_string(),
                shared: None,
            },
            peers: Vec::new(),
            extra: Contract::new(),
        }
    }

    fn r(kind: ResourceKind, name: &str) -> ResourceRef {
        ResourceRef::new(kind, name)
    }

    #[test]
    fn merges_child_contract_after_own_entries() {
        let contract = instantiate(&endpoint()).expect("instantiate");
        let required: Vec<&ResourceRef> = contract.requires.iter().map(|e| &e.resource).collect();
        // Duplicate send/recv CQs are separate specs, so both entries stay.
        assert_eq!(
            required,
            vec![
                &r(ResourceKind::Pd, "pd0"),
                &r(ResourceKind::Cq, "cq0"),
                &r(ResourceKind::Cq, "cq0")
            ]
        );
        assert_eq!(contract.produces.len(), 1);
        assert_eq!(
            contract.produces[0].metadata,
            BTreeMap::from([("pd".to_string(), r(ResourceKind::Pd, "pd0"))])
        );
    }

    #[test]
    fn optional_requirement_is_kept_when_resolved() {
        let mut node = endpoint();
        node.attr.shared = Some("srq0".to_string());
        let contract = instantiate(&node).expect("instantiate");
        assert!(contract.references(&r(ResourceKind::Srq, "srq0")));
        assert_eq!(
            contract.produces[0].metadata.get("srq"),
            Some(&r(ResourceKind::Srq, "srq0"))
        );
    }

    #[test]
    fn wildcard_requirement_with_no_matches_is_vacuous() {
        let contract = instantiate(&endpoint()).expect("instantiate");
        assert!(
            contract
                .requires
                .iter()
                .all(|entry| entry.resource.kind != ResourceKind::Qp)
        );
    }

    #[test]
    fn wildcard_matches_are_deduplicated() {
        let mut node = endpoint();
        node.peers = vec!["qp1".to_string(), "qp2".to_string(), "qp1".to_string()];
        let contract = instantiate(&node).expect("instantiate");
        let peers: Vec<&str> = contract
            .requires
            .iter()
            .filter(|entry| entry.resource.kind == ResourceKind::Qp)
            .map(|entry| entry.resource.name.as_str())
            .collect();
        assert_eq!(peers, ["qp1", "qp2"]);
    }

    #[test]
    fn unresolved_plain_requirement_is_a_model_error() {
        let mut node = endpoint();
        node.extra = Contract::new().require(RequireSpec::live(ResourceKind::Srq, "attr.shared"));
        let err = instantiate(&node).expect_err("unresolved");
        assert!(matches!(err, ModelError::Unresolved { role: "requirement", .. }));
    }

    #[test]
    fn production_without_target_is_a_model_error() {
        let mut node = endpoint();
        node.extra = Contract::new().produce(ProduceSpec::new(
            ResourceKind::Srq,
            State::Allocated,
            "attr.shared",
        ));
        let err = instantiate(&node).expect_err("unresolved");
        assert!(matches!(err, ModelError::Unresolved { role: "production", .. }));
    }

    #[test]
    fn transition_without_target_is_a_model_error() {
        let mut node = endpoint();
        node.extra = Contract::new().transition(TransitionSpec::new(
            ResourceKind::Qp,
            StateMatch::Any,
            State::Error,
            "peers[*]",
        ));
        let err = instantiate(&node).expect_err("unresolved");
        assert!(matches!(err, ModelError::Unresolved { role: "transition", .. }));
    }

    #[test]
    fn ambiguous_metadata_link_is_a_model_error() {
        let mut node = endpoint();
        node.peers = vec!["qp1".to_string(), "qp2".to_string()];
        node.extra = Contract::new().produce(
            ProduceSpec::new(ResourceKind::Cq, State::Allocated, "attr.send")
                .with_metadata("peer", "peers[*]"),
        );
        let err = instantiate(&node).expect_err("ambiguous");
        assert!(matches!(
            err,
            ModelError::PathResolutionAmbiguous { count: 2, .. }
        ));
    }

    #[test]
    fn kind_mismatch_is_a_model_error() {
        let mut node = endpoint();
        node.extra = Contract::new().require(RequireSpec::live(ResourceKind::Mr, "domain"));
        let err = instantiate(&node).expect_err("mismatch");
        assert!(matches!(
            err,
            ModelError::KindMismatch {
                expected: ResourceKind::Mr,
                found: ResourceKind::Pd,
                ..
            }
        ));
    }

    #[test]
    fn undeclared_state_is_a_model_error() {
        let mut node = endpoint();
        node.extra = Contract::new().transition(TransitionSpec::new(
            ResourceKind::Pd,
            StateMatch::Any,
            State::Destroyed,
            "domain",
        ));
        let err = instantiate(&node).expect_err("state");
        assert!(matches!(err, ModelError::StateNotAllowed { .. }));
    }

    #[test]
    fn malformed_path_is_reported_with_node_name() {
        let mut node = endpoint();
        node.extra = Contract::new().require(RequireSpec::live(ResourceKind::Pd, "domain[*"));
        let err = instantiate(&node).expect_err("syntax");
        assert!(err.to_string().starts_with("Endpoint: path 'domain[*'"));
    }
}
