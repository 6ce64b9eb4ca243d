//! Address handles.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::node::{Field, Node};
use crate::core::spec::{Contract, ProduceSpec, RequireSpec, StateMatch, TransitionSpec};
use crate::core::state::{ResourceKind, State};
use crate::mutate::synth::SynthContext;
use crate::verbs::Generate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAh {
    pub ah: String,
    pub pd: String,
    pub port: u8,
    pub dlid: u16,
}

impl Node for CreateAh {
    fn type_name(&self) -> &'static str {
        "CreateAh"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![
            ("ah", Field::resource(ResourceKind::Ah, &self.ah)),
            ("pd", Field::resource(ResourceKind::Pd, &self.pd)),
            ("port", Field::Scalar),
            ("dlid", Field::Scalar),
        ]
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .require(RequireSpec::live(ResourceKind::Pd, "pd"))
            .produce(
                ProduceSpec::new(ResourceKind::Ah, State::Allocated, "ah").with_metadata("pd", "pd"),
            )
    }
}

impl Generate for CreateAh {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        let pd = cx.pick_live(ResourceKind::Pd)?;
        let ah = cx.fresh_name(ResourceKind::Ah);
        let port = cx.rng().gen_range(1..=2);
        let dlid = cx.rng().gen_range(1..=0xbfff);
        Some(Self { ah, pd, port, dlid })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroyAh {
    pub ah: String,
}

impl Node for DestroyAh {
    fn type_name(&self) -> &'static str {
        "DestroyAh"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![("ah", Field::resource(ResourceKind::Ah, &self.ah))]
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .require(RequireSpec::live(ResourceKind::Ah, "ah"))
            .transition(TransitionSpec::new(
                ResourceKind::Ah,
                StateMatch::Any,
                State::Destroyed,
                "ah",
            ))
    }
}

impl Generate for DestroyAh {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        let ah = cx.pick_live(ResourceKind::Ah)?;
        Some(Self { ah })
    }
}
