//! Memory registration.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::node::{Field, Node};
use crate::core::spec::{Contract, ProduceSpec, RequireSpec, StateMatch, TransitionSpec};
use crate::core::state::{ResourceKind, State};
use crate::mutate::synth::SynthContext;
use crate::verbs::Generate;

/// `IBV_ACCESS_LOCAL_WRITE`.
pub const ACCESS_LOCAL_WRITE: u32 = 1;
/// `IBV_ACCESS_REMOTE_WRITE`.
pub const ACCESS_REMOTE_WRITE: u32 = 1 << 1;
/// `IBV_ACCESS_REMOTE_READ`.
pub const ACCESS_REMOTE_READ: u32 = 1 << 2;

/// Register a buffer of `length` bytes on a protection domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegMr {
    pub mr: String,
    pub pd: String,
    pub length: u64,
    pub access: u32,
}

impl RegMr {
    pub fn new(mr: impl Into<String>, pd: impl Into<String>, length: u64) -> Self {
        Self {
            mr: mr.into(),
            pd: pd.into(),
            length,
            access: ACCESS_LOCAL_WRITE,
        }
    }
}

impl Node for RegMr {
    fn type_name(&self) -> &'static str {
        "RegMr"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![
            ("mr", Field::resource(ResourceKind::Mr, &self.mr)),
            ("pd", Field::resource(ResourceKind::Pd, &self.pd)),
            ("length", Field::Scalar),
            ("access", Field::Scalar),
        ]
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .require(RequireSpec::live(ResourceKind::Pd, "pd"))
            .produce(
                ProduceSpec::new(ResourceKind::Mr, State::Registered, "mr")
                    .with_metadata("pd", "pd"),
            )
    }
}

impl Generate for RegMr {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        let pd = cx.pick_live(ResourceKind::Pd)?;
        let mr = cx.fresh_name(ResourceKind::Mr);
        let length = 1u64 << cx.rng().gen_range(6..=16);
        let mut access = ACCESS_LOCAL_WRITE;
        if cx.rng().gen_bool(0.5) {
            access |= ACCESS_REMOTE_WRITE;
        }
        if cx.rng().gen_bool(0.5) {
            access |= ACCESS_REMOTE_READ;
        }
        Some(Self {
            mr,
            pd,
            length,
            access,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeregMr {
    pub mr: String,
}

impl DeregMr {
    pub fn new(mr: impl Into<String>) -> Self {
        Self { mr: mr.into() }
    }
}

impl Node for DeregMr {
    fn type_name(&self) -> &'static str {
        "DeregMr"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![("mr", Field::resource(ResourceKind::Mr, &self.mr))]
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .require(RequireSpec::live(ResourceKind::Mr, "mr"))
            .transition(TransitionSpec::new(
                ResourceKind::Mr,
                StateMatch::Exactly(State::Registered),
                State::Deregistered,
                "mr",
            ))
    }
}

impl Generate for DeregMr {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        cx.pick_in(ResourceKind::Mr, State::Registered)
            .map(Self::new)
    }
}
