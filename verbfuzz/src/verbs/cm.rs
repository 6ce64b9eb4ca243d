//! Connection manager: event channels and communication identifiers.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::node::{Field, Node};
use crate::core::spec::{Contract, ProduceSpec, RequireSpec, StateMatch, TransitionSpec};
use crate::core::state::{ResourceKind, State};
use crate::mutate::synth::SynthContext;
use crate::verbs::Generate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateEventChannel {
    pub channel: String,
}

impl Node for CreateEventChannel {
    fn type_name(&self) -> &'static str {
        "CreateEventChannel"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![(
            "channel",
            Field::resource(ResourceKind::CmEventChannel, &self.channel),
        )]
    }

    fn contract(&self) -> Contract {
        Contract::new().produce(ProduceSpec::new(
            ResourceKind::CmEventChannel,
            State::Allocated,
            "channel",
        ))
    }
}

impl Generate for CreateEventChannel {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        Some(Self {
            channel: cx.fresh_name(ResourceKind::CmEventChannel),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroyEventChannel {
    pub channel: String,
}

impl Node for DestroyEventChannel {
    fn type_name(&self) -> &'static str {
        "DestroyEventChannel"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![(
            "channel",
            Field::resource(ResourceKind::CmEventChannel, &self.channel),
        )]
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .require(RequireSpec::live(ResourceKind::CmEventChannel, "channel"))
            .transition(TransitionSpec::new(
                ResourceKind::CmEventChannel,
                StateMatch::Any,
                State::Destroyed,
                "channel",
            ))
    }
}

impl Generate for DestroyEventChannel {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        let channel = cx.pick_live(ResourceKind::CmEventChannel)?;
        Some(Self { channel })
    }
}

/// `rdma_port_space`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortSpace {
    Tcp,
    Udp,
    Ib,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateId {
    pub id: String,
    pub channel: String,
    pub port_space: PortSpace,
}

impl Node for CreateId {
    fn type_name(&self) -> &'static str {
        "CreateId"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![
            ("id", Field::resource(ResourceKind::CmId, &self.id)),
            (
                "channel",
                Field::resource(ResourceKind::CmEventChannel, &self.channel),
            ),
            ("port_space", Field::Scalar),
        ]
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .require(RequireSpec::live(ResourceKind::CmEventChannel, "channel"))
            .produce(
                ProduceSpec::new(ResourceKind::CmId, State::Allocated, "id")
                    .with_metadata("channel", "channel"),
            )
    }
}

impl Generate for CreateId {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        let channel = cx.pick_live(ResourceKind::CmEventChannel)?;
        let id = cx.fresh_name(ResourceKind::CmId);
        let port_space = if cx.rng().gen_bool(0.8) {
            PortSpace::Tcp
        } else {
            PortSpace::Udp
        };
        Some(Self {
            id,
            channel,
            port_space,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindAddr {
    pub id: String,
    pub addr: String,
    pub port: u16,
}

impl Node for BindAddr {
    fn type_name(&self) -> &'static str {
        "BindAddr"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![
            ("id", Field::resource(ResourceKind::CmId, &self.id)),
            ("addr", Field::Scalar),
            ("port", Field::Scalar),
        ]
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .require(RequireSpec::in_state(ResourceKind::CmId, "id", State::Allocated))
            .transition(TransitionSpec::new(
                ResourceKind::CmId,
                StateMatch::Exactly(State::Allocated),
                State::Bound,
                "id",
            ))
    }
}

impl Generate for BindAddr {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        let id = cx.pick_in(ResourceKind::CmId, State::Allocated)?;
        let host = cx.rng().gen_range(1..=254);
        let port = cx.rng().gen_range(1024..=65535);
        Some(Self {
            id,
            addr: format!("10.0.0.{host}"),
            port,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listen {
    pub id: String,
    pub backlog: u32,
}

impl Node for Listen {
    fn type_name(&self) -> &'static str {
        "Listen"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![
            ("id", Field::resource(ResourceKind::CmId, &self.id)),
            ("backlog", Field::Scalar),
        ]
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .require(RequireSpec::in_state(ResourceKind::CmId, "id", State::Bound))
            .transition(TransitionSpec::new(
                ResourceKind::CmId,
                StateMatch::Exactly(State::Bound),
                State::Listening,
                "id",
            ))
    }
}

impl Generate for Listen {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        let id = cx.pick_in(ResourceKind::CmId, State::Bound)?;
        let backlog = cx.rng().gen_range(1..=64);
        Some(Self { id, backlog })
    }
}

/// Active-side connect from a bound identifier, optionally carrying a queue pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connect {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qp: Option<String>,
}

impl Node for Connect {
    fn type_name(&self) -> &'static str {
        "Connect"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![
            ("id", Field::resource(ResourceKind::CmId, &self.id)),
            (
                "qp",
                Field::optional_resource(ResourceKind::Qp, self.qp.as_ref()),
            ),
        ]
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .require(RequireSpec::in_state(ResourceKind::CmId, "id", State::Bound))
            .require(RequireSpec::live(ResourceKind::Qp, "qp").optional())
            .transition(TransitionSpec::new(
                ResourceKind::CmId,
                StateMatch::Exactly(State::Bound),
                State::Connected,
                "id",
            ))
    }
}

impl Generate for Connect {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        let id = cx.pick_in(ResourceKind::CmId, State::Bound)?;
        let qp = if cx.rng().gen_bool(0.5) {
            cx.pick_live(ResourceKind::Qp)
        } else {
            None
        };
        Some(Self { id, qp })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroyId {
    pub id: String,
}

impl Node for DestroyId {
    fn type_name(&self) -> &'static str {
        "DestroyId"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![("id", Field::resource(ResourceKind::CmId, &self.id))]
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .require(RequireSpec::live(ResourceKind::CmId, "id"))
            .transition(TransitionSpec::new(
                ResourceKind::CmId,
                StateMatch::Any,
                State::Destroyed,
                "id",
            ))
    }
}

impl Generate for DestroyId {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        let id = cx.pick_live(ResourceKind::CmId)?;
        Some(Self { id })
    }
}
