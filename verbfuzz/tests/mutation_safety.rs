//! Mutation engine properties checked across many seeds.

use verbfuzz::core::replay::replay;
use verbfuzz::core::spec::ResourceRef;
use verbfuzz::core::state::{ResourceKind, State};
use verbfuzz::mutate::{
    EngineError, Mutation, MutationWeights, Mutator, MutatorConfig, mutate_sequence,
};
use verbfuzz::scaffold::{BUILTIN_SCAFFOLDS, endpoint_lifecycle, rc_send_recv};
use verbfuzz::test_support::{catalog_samples, seeded_rng};
use verbfuzz::verbs::{AllocPd, CreateCq, DeallocPd, DestroyQp, Verb, VerbKind};

fn mutator(verbs: Vec<Verb>) -> Mutator<Verb> {
    Mutator::new(verbs, MutatorConfig::default()).expect("valid scaffold")
}

#[test]
fn committed_mutations_always_replay() {
    for entry in BUILTIN_SCAFFOLDS {
        for seed in 0..24 {
            let mut rng = seeded_rng(seed);
            let mut engine = mutator(entry.scaffold().verbs);
            for round in 0..8 {
                let before = engine.sequence().to_vec();
                match engine.mutate(&mut rng).expect("no model error") {
                    Some(mutation) => {
                        replay(engine.sequence()).unwrap_or_else(|err| {
                            panic!("{} seed {seed} round {round} {mutation}: {err}", entry.name)
                        });
                    }
                    None => assert_eq!(engine.sequence(), before.as_slice()),
                }
            }
        }
    }
}

#[test]
fn targeted_inserts_and_moves_replay_when_committed() {
    let mut rng = seeded_rng(11);
    for &kind in VerbKind::ALL {
        for index in 0..=catalog_samples().len() {
            let mut engine = mutator(catalog_samples());
            let before = engine.sequence().to_vec();
            if engine.mutate_insert(index, kind, &mut rng).expect("no model error") {
                replay(engine.sequence())
                    .unwrap_or_else(|err| panic!("insert {kind} at {index}: {err}"));
                assert_eq!(engine.len(), before.len() + 1);
            } else {
                assert_eq!(engine.sequence(), before.as_slice());
            }
        }
    }

    let len = rc_send_recv().len();
    for from in 0..len {
        for to in 0..len {
            let mut engine = mutator(rc_send_recv());
            if engine.mutate_move(from, to).expect("no model error") {
                replay(engine.sequence()).unwrap_or_else(|err| panic!("move {from}->{to}: {err}"));
            } else {
                assert_eq!(engine.sequence(), rc_send_recv().as_slice());
            }
        }
    }
}

#[test]
fn destroy_of_a_never_produced_resource_is_never_inserted() {
    let ghost: Verb = DestroyQp::new("qp_ghost").into();
    let original = endpoint_lifecycle();
    let mut engine = mutator(original.clone());
    for index in 0..=original.len() {
        let committed = engine
            .mutate_insert_verb(index, ghost.clone())
            .expect("no model error");
        assert!(!committed, "dangling destroy inserted at {index}");
        assert_eq!(engine.sequence(), original.as_slice());
    }
}

#[test]
fn moving_a_producer_after_its_consumers_is_rejected() {
    let original = endpoint_lifecycle();
    let mut engine = mutator(original.clone());
    // alloc_pd to the end leaves create_qp without its domain.
    assert!(!engine.mutate_move(0, original.len() - 1).expect("move"));
    assert_eq!(engine.sequence(), original.as_slice());
    // destroy_cq and dealloc_pd are independent of each other.
    assert!(engine.mutate_move(7, 8).expect("move"));
    assert_eq!(engine.sequence()[7], original[8]);
    assert_eq!(engine.sequence()[8], original[7]);
}

#[test]
fn cascading_remove_takes_dependents_with_it() {
    let original = endpoint_lifecycle();
    let mut engine = mutator(original.clone());
    // create_qp plus its three modifies and the destroy.
    assert!(engine.mutate_remove(2).expect("remove"));
    assert_eq!(engine.len(), original.len() - 5);
    replay(engine.sequence()).expect("replay after remove");

    let config = MutatorConfig {
        cascade_remove: false,
        ..MutatorConfig::default()
    };
    let mut engine = Mutator::new(original.clone(), config).expect("valid");
    assert!(!engine.mutate_remove(2).expect("remove"));
    assert_eq!(engine.sequence(), original.as_slice());
}

#[test]
fn dependency_queries_follow_the_resource() {
    let engine = mutator(endpoint_lifecycle());
    let qp = ResourceRef::new(ResourceKind::Qp, "qp0");
    assert_eq!(engine.find_dependent_verbs(&qp), vec![3, 4, 5, 6]);
    assert_eq!(
        engine.find_dependent_verbs_stateful(&qp, State::Reset),
        vec![3]
    );
    assert_eq!(
        engine.find_dependent_verbs_stateful(&qp, State::ReadyToSend),
        vec![6]
    );
    let pd = ResourceRef::new(ResourceKind::Pd, "pd0");
    assert_eq!(engine.find_dependent_verbs(&pd), vec![2, 8]);
    let missing = ResourceRef::new(ResourceKind::Mr, "mr9");
    assert!(engine.find_dependent_verbs(&missing).is_empty());
}

#[test]
fn remove_only_cascades_within_one_lifecycle() {
    let verbs: Vec<Verb> = vec![
        AllocPd::new("pd0").into(),
        DeallocPd::new("pd0").into(),
        AllocPd::new("pd0").into(),
        CreateCq::new("cq0", 16).into(),
        DeallocPd::new("pd0").into(),
    ];
    let mut engine = mutator(verbs);
    let pd = ResourceRef::new(ResourceKind::Pd, "pd0");
    assert_eq!(engine.find_dependent_verbs(&pd), vec![1]);
    assert_eq!(
        engine.find_dependent_verbs_stateful(&pd, State::Allocated),
        vec![1]
    );

    assert!(engine.mutate_remove(0).expect("remove"));
    let kinds: Vec<VerbKind> = engine.sequence().iter().map(Verb::kind).collect();
    assert_eq!(
        kinds,
        vec![VerbKind::AllocPd, VerbKind::CreateCq, VerbKind::DeallocPd]
    );
    replay(engine.sequence()).expect("replay after remove");
}

#[test]
fn reparam_keeps_the_verb_kind() {
    let original = rc_send_recv();
    for seed in 0..8 {
        let mut rng = seeded_rng(seed);
        for index in 0..original.len() {
            let mut engine = mutator(original.clone());
            if engine.mutate_reparam(index, &mut rng).expect("no model error") {
                let seq = engine.sequence();
                assert_eq!(seq.len(), original.len());
                assert_eq!(seq[index].kind(), original[index].kind());
                replay(seq).unwrap_or_else(|err| panic!("seed {seed} index {index}: {err}"));
            } else {
                assert_eq!(engine.sequence(), original.as_slice());
            }
        }
    }
}

#[test]
fn random_move_never_targets_its_own_slot() {
    let config = MutatorConfig {
        max_attempts: 1,
        weights: MutationWeights {
            insert: 0,
            remove: 0,
            relocate: 1,
            reparam: 0,
        },
        ..MutatorConfig::default()
    };
    let verbs: Vec<Verb> = vec![AllocPd::new("pd0").into(), AllocPd::new("pd1").into()];
    for seed in 0..16 {
        let mut rng = seeded_rng(seed);
        let mut engine = Mutator::new(verbs.clone(), config.clone()).expect("valid");
        match engine.mutate(&mut rng).expect("no model error") {
            Some(Mutation::Move { from, to, .. }) => assert_ne!(from, to),
            other => panic!("seed {seed}: expected a move, got {other:?}"),
        }
    }
}

#[test]
fn functional_wrapper_rejects_invalid_scaffolds() {
    let mut rng = seeded_rng(3);
    let verbs: Vec<Verb> = vec![DestroyQp::new("qp0").into()];
    let err = mutate_sequence(verbs, &mut rng, &MutatorConfig::default()).expect_err("invalid");
    assert!(matches!(err, EngineError::InvalidScaffold(_)));

    let (seq, mutation) =
        mutate_sequence(rc_send_recv(), &mut rng, &MutatorConfig::default()).expect("mutate");
    match mutation {
        Some(_) => {
            replay(&seq).expect("replay");
        }
        None => assert_eq!(seq, rc_send_recv()),
    }
}
