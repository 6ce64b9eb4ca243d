//! Protection domain verbs.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::node::{Field, Node};
use crate::core::spec::{Contract, ProduceSpec, RequireSpec, StateMatch, TransitionSpec};
use crate::core::state::{ResourceKind, State};
use crate::mutate::synth::SynthContext;
use crate::verbs::Generate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocPd {
    pub pd: String,
}

impl AllocPd {
    pub fn new(pd: impl Into<String>) -> Self {
        Self { pd: pd.into() }
    }
}

impl Node for AllocPd {
    fn type_name(&self) -> &'static str {
        "AllocPd"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![("pd", Field::resource(ResourceKind::Pd, &self.pd))]
    }

    fn contract(&self) -> Contract {
        Contract::new().produce(ProduceSpec::new(ResourceKind::Pd, State::Allocated, "pd"))
    }
}

impl Generate for AllocPd {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        Some(Self::new(cx.fresh_name(ResourceKind::Pd)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeallocPd {
    pub pd: String,
}

impl DeallocPd {
    pub fn new(pd: impl Into<String>) -> Self {
        Self { pd: pd.into() }
    }
}

impl Node for DeallocPd {
    fn type_name(&self) -> &'static str {
        "DeallocPd"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![("pd", Field::resource(ResourceKind::Pd, &self.pd))]
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .require(RequireSpec::live(ResourceKind::Pd, "pd"))
            .transition(TransitionSpec::new(
                ResourceKind::Pd,
                StateMatch::Any,
                State::Freed,
                "pd",
            ))
    }
}

impl Generate for DeallocPd {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        cx.pick_live(ResourceKind::Pd).map(Self::new)
    }
}

/// Import of a protection domain shared by another process through `fd`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportPd {
    pub pd: String,
    pub fd: u32,
    pub handle: u32,
}

impl Node for ImportPd {
    fn type_name(&self) -> &'static str {
        "ImportPd"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![
            ("pd", Field::resource(ResourceKind::Pd, &self.pd)),
            ("fd", Field::Scalar),
            ("handle", Field::Scalar),
        ]
    }

    fn contract(&self) -> Contract {
        Contract::new().produce(ProduceSpec::new(ResourceKind::Pd, State::Imported, "pd"))
    }
}

impl Generate for ImportPd {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        let pd = cx.fresh_name(ResourceKind::Pd);
        let fd = cx.rng().gen_range(3..64);
        let handle = cx.rng().gen_range(0..1024);
        Some(Self { pd, fd, handle })
    }
}
