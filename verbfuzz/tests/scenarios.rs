//! End-to-end validation scenarios over the verb catalog.

use verbfuzz::core::error::ContractError;
use verbfuzz::core::instantiate::instantiate;
use verbfuzz::core::replay::{ReplayError, prefix_snapshots, replay};
use verbfuzz::core::spec::ResourceRef;
use verbfuzz::core::state::{ResourceKind, State};
use verbfuzz::core::table::ResourceTable;
use verbfuzz::scaffold::{BUILTIN_SCAFFOLDS, endpoint_lifecycle};
use verbfuzz::test_support::catalog_samples;
use verbfuzz::verbs::{
    AllocPd, CreateCq, CreateQp, DeallocPd, DestroyCq, DestroyQp, ImportPd, ModifyQp, QpInitAttr,
    QpState, Verb,
};

#[test]
fn endpoint_lifecycle_validates() {
    let table = replay(&endpoint_lifecycle()).expect("accept scenario");
    let snapshot = table.snapshot();
    assert_eq!(
        snapshot.state_of(&ResourceRef::new(ResourceKind::Qp, "qp0")),
        Some(State::Destroyed)
    );
    assert_eq!(
        snapshot.state_of(&ResourceRef::new(ResourceKind::Cq, "cq0")),
        Some(State::Destroyed)
    );
    assert_eq!(
        snapshot.state_of(&ResourceRef::new(ResourceKind::Pd, "pd0")),
        Some(State::Freed)
    );
}

#[test]
fn ready_to_receive_from_reset_is_a_transition_violation() {
    let verbs: Vec<Verb> = vec![
        AllocPd::new("pd0").into(),
        CreateCq::new("cq0", 16).into(),
        CreateQp::new("qp0", "pd0", QpInitAttr::new("cq0", "cq0")).into(),
        ModifyQp::new("qp0", QpState::Rtr).into(),
    ];
    let err = replay(&verbs).expect_err("reject scenario");
    match err {
        ReplayError::Contract {
            index,
            source:
                ContractError::TransitionPreconditionViolated {
                    resource, actual, ..
                },
            ..
        } => {
            assert_eq!(index, 3);
            assert_eq!(resource, ResourceRef::new(ResourceKind::Qp, "qp0"));
            assert_eq!(actual, Some(State::Reset));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn every_prefix_of_a_valid_sequence_replays() {
    for entry in BUILTIN_SCAFFOLDS {
        let verbs = entry.scaffold().verbs;
        for len in 0..=verbs.len() {
            replay(&verbs[..len]).unwrap_or_else(|err| panic!("{} [..{len}]: {err}", entry.name));
        }
    }
    let samples = catalog_samples();
    let snapshots = prefix_snapshots(&samples).expect("prefix snapshots");
    assert_eq!(snapshots.len(), samples.len() + 1);
}

#[test]
fn snapshot_is_stable_without_apply() {
    let table = replay(&catalog_samples()).expect("replay");
    assert_eq!(table.snapshot(), table.snapshot());
}

#[test]
fn live_identity_cannot_be_produced_by_any_verb() {
    let mut table = ResourceTable::new();
    let alloc: Verb = AllocPd::new("pd0").into();
    table
        .apply(&instantiate(&alloc).expect("instantiate"))
        .expect("first production");

    let import: Verb = ImportPd {
        pd: "pd0".to_string(),
        fd: 3,
        handle: 1,
    }
    .into();
    for verb in [&alloc, &import] {
        let contract = instantiate(verb).expect("instantiate");
        let err = table.apply(&contract).expect_err("double production");
        assert!(matches!(err, ContractError::ResourceAlreadyLive { .. }), "{err}");
    }

    let dealloc: Verb = DeallocPd::new("pd0").into();
    table
        .apply(&instantiate(&dealloc).expect("instantiate"))
        .expect("free");
    table
        .apply(&instantiate(&import).expect("instantiate"))
        .expect("freed identity can be produced again");
}

#[test]
fn destroying_a_resource_twice_fails_on_the_second() {
    let mut verbs = endpoint_lifecycle();
    verbs.push(DestroyQp::new("qp0").into());
    let err = replay(&verbs).expect_err("double destroy");
    assert_eq!(err.index(), verbs.len() - 1);

    let mut verbs = endpoint_lifecycle();
    verbs.insert(7, DestroyCq::new("cq0").into());
    assert_eq!(replay(&verbs).expect_err("double destroy").index(), 8);
}
