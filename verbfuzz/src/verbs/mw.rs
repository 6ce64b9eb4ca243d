//! Memory windows.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::node::{Field, Node};
use crate::core::spec::{Contract, ProduceSpec, RequireSpec, StateMatch, TransitionSpec};
use crate::core::state::{ResourceKind, State};
use crate::mutate::synth::SynthContext;
use crate::verbs::Generate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocMw {
    pub mw: String,
    pub pd: String,
}

impl Node for AllocMw {
    fn type_name(&self) -> &'static str {
        "AllocMw"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![
            ("mw", Field::resource(ResourceKind::Mw, &self.mw)),
            ("pd", Field::resource(ResourceKind::Pd, &self.pd)),
        ]
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .require(RequireSpec::live(ResourceKind::Pd, "pd"))
            .produce(
                ProduceSpec::new(ResourceKind::Mw, State::Allocated, "mw").with_metadata("pd", "pd"),
            )
    }
}

impl Generate for AllocMw {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        let pd = cx.pick_live(ResourceKind::Pd)?;
        let mw = cx.fresh_name(ResourceKind::Mw);
        Some(Self { mw, pd })
    }
}

/// Bind a window to a memory region by posting on a ready-to-send queue pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindMw {
    pub mw: String,
    pub qp: String,
    pub mr: String,
    pub offset: u64,
    pub length: u64,
}

impl Node for BindMw {
    fn type_name(&self) -> &'static str {
        "BindMw"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![
            ("mw", Field::resource(ResourceKind::Mw, &self.mw)),
            ("qp", Field::resource(ResourceKind::Qp, &self.qp)),
            ("mr", Field::resource(ResourceKind::Mr, &self.mr)),
            ("offset", Field::Scalar),
            ("length", Field::Scalar),
        ]
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .require(RequireSpec::live(ResourceKind::Mw, "mw"))
            .require(RequireSpec::in_state(
                ResourceKind::Qp,
                "qp",
                State::ReadyToSend,
            ))
            .require(RequireSpec::live(ResourceKind::Mr, "mr"))
            .transition(TransitionSpec::new(
                ResourceKind::Mw,
                StateMatch::Any,
                State::Bound,
                "mw",
            ))
    }
}

impl Generate for BindMw {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        let mw = cx.pick_live(ResourceKind::Mw)?;
        let pd = cx.metadata_of(ResourceKind::Mw, &mw, "pd")?;
        let qp = cx.pick_in(ResourceKind::Qp, State::ReadyToSend)?;
        let mr = cx.pick_linked(ResourceKind::Mr, "pd", &pd)?;
        let offset = cx.rng().gen_range(0..64) * 64;
        let length = cx.rng().gen_range(1..=64) * 64;
        Some(Self {
            mw,
            qp,
            mr,
            offset,
            length,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeallocMw {
    pub mw: String,
}

impl Node for DeallocMw {
    fn type_name(&self) -> &'static str {
        "DeallocMw"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![("mw", Field::resource(ResourceKind::Mw, &self.mw))]
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .require(RequireSpec::live(ResourceKind::Mw, "mw"))
            .transition(TransitionSpec::new(
                ResourceKind::Mw,
                StateMatch::Any,
                State::Freed,
                "mw",
            ))
    }
}

impl Generate for DeallocMw {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        let mw = cx.pick_live(ResourceKind::Mw)?;
        Some(Self { mw })
    }
}
