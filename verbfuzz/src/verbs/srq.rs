//! Shared receive queues.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::node::{Field, Node};
use crate::core::spec::{Contract, ProduceSpec, RequireSpec, StateMatch, TransitionSpec};
use crate::core::state::{ResourceKind, State};
use crate::mutate::synth::SynthContext;
use crate::verbs::Generate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSrq {
    pub srq: String,
    pub pd: String,
    pub max_wr: u32,
    pub max_sge: u32,
}

impl Node for CreateSrq {
    fn type_name(&self) -> &'static str {
        "CreateSrq"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![
            ("srq", Field::resource(ResourceKind::Srq, &self.srq)),
            ("pd", Field::resource(ResourceKind::Pd, &self.pd)),
            ("max_wr", Field::Scalar),
            ("max_sge", Field::Scalar),
        ]
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .require(RequireSpec::live(ResourceKind::Pd, "pd"))
            .produce(
                ProduceSpec::new(ResourceKind::Srq, State::Allocated, "srq")
                    .with_metadata("pd", "pd"),
            )
    }
}

impl Generate for CreateSrq {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        let pd = cx.pick_live(ResourceKind::Pd)?;
        let srq = cx.fresh_name(ResourceKind::Srq);
        let max_wr = cx.rng().gen_range(1..=128);
        let max_sge = cx.rng().gen_range(1..=4);
        Some(Self {
            srq,
            pd,
            max_wr,
            max_sge,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroySrq {
    pub srq: String,
}

impl Node for DestroySrq {
    fn type_name(&self) -> &'static str {
        "DestroySrq"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![("srq", Field::resource(ResourceKind::Srq, &self.srq))]
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .require(RequireSpec::live(ResourceKind::Srq, "srq"))
            .transition(TransitionSpec::new(
                ResourceKind::Srq,
                StateMatch::Any,
                State::Destroyed,
                "srq",
            ))
    }
}

impl Generate for DestroySrq {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        let srq = cx.pick_live(ResourceKind::Srq)?;
        Some(Self { srq })
    }
}
