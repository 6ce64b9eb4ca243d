//! Completion queues and completion channels.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::node::{Field, Node};
use crate::core::spec::{Contract, ProduceSpec, RequireSpec, StateMatch, TransitionSpec};
use crate::core::state::{ResourceKind, State};
use crate::mutate::synth::SynthContext;
use crate::verbs::Generate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCompChannel {
    pub channel: String,
}

impl Node for CreateCompChannel {
    fn type_name(&self) -> &'static str {
        "CreateCompChannel"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![(
            "channel",
            Field::resource(ResourceKind::CompChannel, &self.channel),
        )]
    }

    fn contract(&self) -> Contract {
        Contract::new().produce(ProduceSpec::new(
            ResourceKind::CompChannel,
            State::Allocated,
            "channel",
        ))
    }
}

impl Generate for CreateCompChannel {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        Some(Self {
            channel: cx.fresh_name(ResourceKind::CompChannel),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroyCompChannel {
    pub channel: String,
}

impl Node for DestroyCompChannel {
    fn type_name(&self) -> &'static str {
        "DestroyCompChannel"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![(
            "channel",
            Field::resource(ResourceKind::CompChannel, &self.channel),
        )]
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .require(RequireSpec::live(ResourceKind::CompChannel, "channel"))
            .transition(TransitionSpec::new(
                ResourceKind::CompChannel,
                StateMatch::Any,
                State::Destroyed,
                "channel",
            ))
    }
}

impl Generate for DestroyCompChannel {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        let channel = cx.pick_live(ResourceKind::CompChannel)?;
        Some(Self { channel })
    }
}

/// Completion queue, optionally bound to a completion channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCq {
    pub cq: String,
    pub cqe: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

impl CreateCq {
    pub fn new(cq: impl Into<String>, cqe: u32) -> Self {
        Self {
            cq: cq.into(),
            cqe,
            channel: None,
        }
    }

    pub fn on_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }
}

impl Node for CreateCq {
    fn type_name(&self) -> &'static str {
        "CreateCq"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![
            ("cq", Field::resource(ResourceKind::Cq, &self.cq)),
            ("cqe", Field::Scalar),
            (
                "channel",
                Field::optional_resource(ResourceKind::CompChannel, self.channel.as_ref()),
            ),
        ]
    }

    fn contract(&self) -> Contract {
        let contract =
            Contract::new().produce(ProduceSpec::new(ResourceKind::Cq, State::Allocated, "cq"));
        if self.channel.is_none() {
            return contract;
        }
        contract
            .require(RequireSpec::live(ResourceKind::CompChannel, "channel"))
            .transition(TransitionSpec::new(
                ResourceKind::CompChannel,
                StateMatch::Any,
                State::Used,
                "channel",
            ))
    }
}

impl Generate for CreateCq {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        let cq = cx.fresh_name(ResourceKind::Cq);
        let cqe = cx.rng().gen_range(1..=256);
        let channel = if cx.rng().gen_bool(0.5) {
            cx.pick_live(ResourceKind::CompChannel)
        } else {
            None
        };
        Some(Self { cq, cqe, channel })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroyCq {
    pub cq: String,
}

impl DestroyCq {
    pub fn new(cq: impl Into<String>) -> Self {
        Self { cq: cq.into() }
    }
}

impl Node for DestroyCq {
    fn type_name(&self) -> &'static str {
        "DestroyCq"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![("cq", Field::resource(ResourceKind::Cq, &self.cq))]
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .require(RequireSpec::live(ResourceKind::Cq, "cq"))
            .transition(TransitionSpec::new(
                ResourceKind::Cq,
                StateMatch::Any,
                State::Destroyed,
                "cq",
            ))
    }
}

impl Generate for DestroyCq {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        cx.pick_live(ResourceKind::Cq).map(Self::new)
    }
}
