//! Queue pair lifecycle.
//!
//! `modify_qp` carries the requested state in its attribute payload, so its
//! contract is computed per instance: the requested state decides the state
//! the queue pair must be in beforehand.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::core::node::{Field, Node};
use crate::core::spec::{Contract, ProduceSpec, RequireSpec, StateMatch, TransitionSpec};
use crate::core::state::{ResourceKind, State};
use crate::mutate::synth::SynthContext;
use crate::verbs::Generate;

/// Transport service type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QpType {
    Rc,
    Uc,
    Ud,
}

/// Queue sizing requested at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QpCap {
    pub max_send_wr: u32,
    pub max_recv_wr: u32,
    pub max_send_sge: u32,
    pub max_recv_sge: u32,
}

impl Default for QpCap {
    fn default() -> Self {
        Self {
            max_send_wr: 16,
            max_recv_wr: 16,
            max_send_sge: 1,
            max_recv_sge: 1,
        }
    }
}

/// Creation attributes; declares its own requirements on the queues it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QpInitAttr {
    pub send_cq: String,
    pub recv_cq: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srq: Option<String>,
    pub qp_type: QpType,
    #[serde(default)]
    pub cap: QpCap,
}

impl QpInitAttr {
    pub fn new(send_cq: impl Into<String>, recv_cq: impl Into<String>) -> Self {
        Self {
            send_cq: send_cq.into(),
            recv_cq: recv_cq.into(),
            srq: None,
            qp_type: QpType::Rc,
            cap: QpCap::default(),
        }
    }
}

impl Node for QpInitAttr {
    fn type_name(&self) -> &'static str {
        "QpInitAttr"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![
            ("send_cq", Field::resource(ResourceKind::Cq, &self.send_cq)),
            ("recv_cq", Field::resource(ResourceKind::Cq, &self.recv_cq)),
            (
                "srq",
                Field::optional_resource(ResourceKind::Srq, self.srq.as_ref()),
            ),
            ("qp_type", Field::Scalar),
            ("cap", Field::Scalar),
        ]
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .require(RequireSpec::live(ResourceKind::Cq, "send_cq"))
            .require(RequireSpec::live(ResourceKind::Cq, "recv_cq"))
            .require(RequireSpec::live(ResourceKind::Srq, "srq").optional())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateQp {
    pub qp: String,
    pub pd: String,
    pub init_attr: QpInitAttr,
}

impl CreateQp {
    pub fn new(qp: impl Into<String>, pd: impl Into<String>, init_attr: QpInitAttr) -> Self {
        Self {
            qp: qp.into(),
            pd: pd.into(),
            init_attr,
        }
    }
}

impl Node for CreateQp {
    fn type_name(&self) -> &'static str {
        "CreateQp"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![
            ("qp", Field::resource(ResourceKind::Qp, &self.qp)),
            ("pd", Field::resource(ResourceKind::Pd, &self.pd)),
            ("init_attr", Field::node(&self.init_attr)),
        ]
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .require(RequireSpec::live(ResourceKind::Pd, "pd"))
            .produce(
                ProduceSpec::new(ResourceKind::Qp, State::Reset, "qp")
                    .with_metadata("pd", "pd")
                    .with_metadata("send_cq", "init_attr.send_cq")
                    .with_metadata("srq", "init_attr.srq"),
            )
    }

    fn contract_fields(&self) -> &'static [&'static str] {
        &["init_attr"]
    }
}

impl Generate for CreateQp {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        let pd = cx.pick_live(ResourceKind::Pd)?;
        let send_cq = cx.pick_live(ResourceKind::Cq)?;
        let recv_cq = if cx.rng().gen_bool(0.5) {
            send_cq.clone()
        } else {
            cx.pick_live(ResourceKind::Cq)?
        };
        let srq = if cx.rng().gen_bool(0.25) {
            cx.pick_live(ResourceKind::Srq)
        } else {
            None
        };
        let qp_type = *[QpType::Rc, QpType::Uc, QpType::Ud].choose(cx.rng())?;
        let cap = QpCap {
            max_send_wr: cx.rng().gen_range(1..=64),
            max_recv_wr: cx.rng().gen_range(1..=64),
            max_send_sge: cx.rng().gen_range(1..=4),
            max_recv_sge: cx.rng().gen_range(1..=4),
        };
        let qp = cx.fresh_name(ResourceKind::Qp);
        Some(Self {
            qp,
            pd,
            init_attr: QpInitAttr {
                send_cq,
                recv_cq,
                srq,
                qp_type,
                cap,
            },
        })
    }
}

/// State requested by `modify_qp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QpState {
    Reset,
    Init,
    Rtr,
    Rts,
    Sqd,
    Err,
}

impl QpState {
    pub const ALL: [QpState; 6] = [
        QpState::Reset,
        QpState::Init,
        QpState::Rtr,
        QpState::Rts,
        QpState::Sqd,
        QpState::Err,
    ];

    /// Tracked state the queue pair lands in.
    pub fn target(self) -> State {
        match self {
            QpState::Reset => State::Reset,
            QpState::Init => State::Init,
            QpState::Rtr => State::ReadyToReceive,
            QpState::Rts => State::ReadyToSend,
            QpState::Sqd => State::SendQueueDrained,
            QpState::Err => State::Error,
        }
    }

    /// State the queue pair must be in for the request to be legal.
    pub fn source(self) -> StateMatch {
        match self {
            QpState::Init => StateMatch::Exactly(State::Reset),
            QpState::Rtr => StateMatch::Exactly(State::Init),
            QpState::Rts => StateMatch::Exactly(State::ReadyToReceive),
            QpState::Sqd => StateMatch::Exactly(State::ReadyToSend),
            QpState::Reset | QpState::Err => StateMatch::Any,
        }
    }
}

/// Attribute payload of `modify_qp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QpAttr {
    pub qp_state: QpState,
    /// Remote queue pair, named when moving to ready-to-receive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_qp: Option<String>,
    #[serde(default = "default_port")]
    pub port: u8,
}

fn default_port() -> u8 {
    1
}

impl QpAttr {
    pub fn new(qp_state: QpState) -> Self {
        Self {
            qp_state,
            dest_qp: None,
            port: default_port(),
        }
    }
}

impl Node for QpAttr {
    fn type_name(&self) -> &'static str {
        "QpAttr"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![
            ("qp_state", Field::Scalar),
            (
                "dest_qp",
                Field::optional_resource(ResourceKind::Qp, self.dest_qp.as_ref()),
            ),
            ("port", Field::Scalar),
        ]
    }

    fn contract(&self) -> Contract {
        Contract::new().require(RequireSpec::live(ResourceKind::Qp, "dest_qp").optional())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyQp {
    pub qp: String,
    pub attr: QpAttr,
}

impl ModifyQp {
    pub fn new(qp: impl Into<String>, qp_state: QpState) -> Self {
        Self {
            qp: qp.into(),
            attr: QpAttr::new(qp_state),
        }
    }
}

impl Node for ModifyQp {
    fn type_name(&self) -> &'static str {
        "ModifyQp"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![
            ("qp", Field::resource(ResourceKind::Qp, &self.qp)),
            ("attr", Field::node(&self.attr)),
        ]
    }

    fn contract(&self) -> Contract {
        let requested = self.attr.qp_state;
        Contract::new()
            .require(RequireSpec::live(ResourceKind::Qp, "qp"))
            .transition(TransitionSpec::new(
                ResourceKind::Qp,
                requested.source(),
                requested.target(),
                "qp",
            ))
    }

    fn contract_fields(&self) -> &'static [&'static str] {
        &["attr"]
    }
}

impl Generate for ModifyQp {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        let mut requests = QpState::ALL;
        requests.shuffle(cx.rng());
        for requested in requests {
            let qp = match requested.source() {
                StateMatch::Exactly(state) => cx.pick_in(ResourceKind::Qp, state),
                StateMatch::Any => cx.pick_live(ResourceKind::Qp),
            };
            let Some(qp) = qp else {
                continue;
            };
            let mut attr = QpAttr::new(requested);
            if requested == QpState::Rtr && cx.rng().gen_bool(0.75) {
                attr.dest_qp = cx.pick_live(ResourceKind::Qp);
            }
            attr.port = cx.rng().gen_range(1..=2);
            return Some(Self { qp, attr });
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroyQp {
    pub qp: String,
}

impl DestroyQp {
    pub fn new(qp: impl Into<String>) -> Self {
        Self { qp: qp.into() }
    }
}

impl Node for DestroyQp {
    fn type_name(&self) -> &'static str {
        "DestroyQp"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![("qp", Field::resource(ResourceKind::Qp, &self.qp))]
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .require(RequireSpec::live(ResourceKind::Qp, "qp"))
            .transition(TransitionSpec::new(
                ResourceKind::Qp,
                StateMatch::Any,
                State::Destroyed,
                "qp",
            ))
    }
}

impl Generate for DestroyQp {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        cx.pick_live(ResourceKind::Qp).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::instantiate::instantiate;
    use crate::core::spec::ResourceRef;

    fn qp0() -> ResourceRef {
        ResourceRef::new(ResourceKind::Qp, "qp0")
    }

    #[test]
    fn modify_contract_follows_requested_state() {
        let contract = instantiate(&ModifyQp::new("qp0", QpState::Rtr)).expect("instantiate");
        assert_eq!(contract.transitions.len(), 1);
        let transition = &contract.transitions[0];
        assert_eq!(transition.resource, qp0());
        assert_eq!(transition.from, StateMatch::Exactly(State::Init));
        assert_eq!(transition.to, State::ReadyToReceive);

        let contract = instantiate(&ModifyQp::new("qp0", QpState::Err)).expect("instantiate");
        assert_eq!(contract.transitions[0].from, StateMatch::Any);
    }

    #[test]
    fn destination_queue_pair_is_required_when_named() {
        let mut modify = ModifyQp::new("qp0", QpState::Rtr);
        let bare = instantiate(&modify).expect("instantiate");
        assert_eq!(bare.requires.len(), 1);

        modify.attr.dest_qp = Some("qp1".to_string());
        let linked = instantiate(&modify).expect("instantiate");
        assert!(linked.references(&ResourceRef::new(ResourceKind::Qp, "qp1")));
    }

    #[test]
    fn create_merges_init_attr_requirements_and_records_links() {
        let mut init_attr = QpInitAttr::new("cq0", "cq1");
        init_attr.srq = Some("srq0".to_string());
        let contract = instantiate(&CreateQp::new("qp0", "pd0", init_attr)).expect("instantiate");
        let required: Vec<String> = contract
            .requires
            .iter()
            .map(|entry| entry.resource.to_string())
            .collect();
        assert_eq!(required, ["pd:pd0", "cq:cq0", "cq:cq1", "srq:srq0"]);

        let produced = &contract.produces[0];
        assert_eq!(produced.initial, State::Reset);
        assert_eq!(
            produced.metadata.get("send_cq"),
            Some(&ResourceRef::new(ResourceKind::Cq, "cq0"))
        );
        assert!(produced.metadata.contains_key("srq"));
    }

    #[test]
    fn create_without_srq_omits_the_link() {
        let contract = instantiate(&CreateQp::new("qp0", "pd0", QpInitAttr::new("cq0", "cq0")))
            .expect("instantiate");
        assert_eq!(contract.requires.len(), 3);
        assert!(!contract.produces[0].metadata.contains_key("srq"));
    }
}
