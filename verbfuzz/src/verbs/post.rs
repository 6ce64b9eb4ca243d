//! Posting work requests.
//!
//! Work requests form a singly linked chain through `next`. Every request
//! carries a scatter/gather list whose entries name memory regions, so the
//! regions a post touches are reached with `wr.**.sg_list[*].mr`.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::core::node::{Field, Node};
use crate::core::spec::{Contract, RequireSpec, ResourceRef};
use crate::core::state::{ResourceKind, State};
use crate::mutate::synth::SynthContext;
use crate::verbs::Generate;

const SG_REGIONS: &str = "wr.**.sg_list[*].mr";

/// Longest chain a synthesized post builds.
const MAX_CHAIN: usize = 3;

/// One scatter/gather entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sge {
    pub mr: String,
    pub offset: u64,
    pub length: u32,
}

impl Sge {
    pub fn new(mr: impl Into<String>, length: u32) -> Self {
        Self {
            mr: mr.into(),
            offset: 0,
            length,
        }
    }
}

impl Node for Sge {
    fn type_name(&self) -> &'static str {
        "Sge"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![
            ("mr", Field::resource(ResourceKind::Mr, &self.mr)),
            ("offset", Field::Scalar),
            ("length", Field::Scalar),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendOpcode {
    Send,
    SendWithImm,
    RdmaWrite,
    RdmaRead,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendWr {
    pub wr_id: u64,
    pub opcode: SendOpcode,
    #[serde(default)]
    pub sg_list: Vec<Sge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Box<SendWr>>,
}

impl SendWr {
    pub fn new(wr_id: u64, sg_list: Vec<Sge>) -> Self {
        Self {
            wr_id,
            opcode: SendOpcode::Send,
            sg_list,
            next: None,
        }
    }

    pub fn then(mut self, next: SendWr) -> Self {
        self.next = Some(Box::new(next));
        self
    }
}

impl Node for SendWr {
    fn type_name(&self) -> &'static str {
        "SendWr"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![
            ("wr_id", Field::Scalar),
            ("opcode", Field::Scalar),
            ("sg_list", Field::nodes(&self.sg_list)),
            ("next", Field::optional_node(self.next.as_deref())),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecvWr {
    pub wr_id: u64,
    #[serde(default)]
    pub sg_list: Vec<Sge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Box<RecvWr>>,
}

impl RecvWr {
    pub fn new(wr_id: u64, sg_list: Vec<Sge>) -> Self {
        Self {
            wr_id,
            sg_list,
            next: None,
        }
    }

    pub fn then(mut self, next: RecvWr) -> Self {
        self.next = Some(Box::new(next));
        self
    }
}

impl Node for RecvWr {
    fn type_name(&self) -> &'static str {
        "RecvWr"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![
            ("wr_id", Field::Scalar),
            ("sg_list", Field::nodes(&self.sg_list)),
            ("next", Field::optional_node(self.next.as_deref())),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSend {
    pub qp: String,
    pub wr: SendWr,
}

impl Node for PostSend {
    fn type_name(&self) -> &'static str {
        "PostSend"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![
            ("qp", Field::resource(ResourceKind::Qp, &self.qp)),
            ("wr", Field::node(&self.wr)),
        ]
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .require(RequireSpec::in_state(ResourceKind::Qp, "qp", State::ReadyToSend))
            .require(RequireSpec::live(ResourceKind::Mr, SG_REGIONS))
    }
}

impl Generate for PostSend {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        let qp = cx.pick_in(ResourceKind::Qp, State::ReadyToSend)?;
        let pd = cx.metadata_of(ResourceKind::Qp, &qp, "pd")?;
        let opcodes = [
            SendOpcode::Send,
            SendOpcode::SendWithImm,
            SendOpcode::RdmaWrite,
            SendOpcode::RdmaRead,
        ];
        let len = cx.rng().gen_range(1..=MAX_CHAIN);
        let mut chain: Option<SendWr> = None;
        for wr_id in (0..len as u64).rev() {
            let mut wr = SendWr::new(wr_id, scatter_list(cx, &pd));
            wr.opcode = *opcodes.choose(cx.rng())?;
            wr.next = chain.take().map(Box::new);
            chain = Some(wr);
        }
        Some(Self { qp, wr: chain? })
    }
}

/// Posting receives is legal in every live state but reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecv {
    pub qp: String,
    pub wr: RecvWr,
}

impl Node for PostRecv {
    fn type_name(&self) -> &'static str {
        "PostRecv"
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        vec![
            ("qp", Field::resource(ResourceKind::Qp, &self.qp)),
            ("wr", Field::node(&self.wr)),
        ]
    }

    fn contract(&self) -> Contract {
        Contract::new()
            .require(RequireSpec::live(ResourceKind::Qp, "qp").excluding(&[State::Reset]))
            .require(RequireSpec::live(ResourceKind::Mr, SG_REGIONS))
    }
}

impl Generate for PostRecv {
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self> {
        let qp = cx.pick_where(ResourceKind::Qp, |record| {
            record.is_live() && record.state != State::Reset
        })?;
        let pd = cx.metadata_of(ResourceKind::Qp, &qp, "pd")?;
        let len = cx.rng().gen_range(1..=MAX_CHAIN);
        let mut chain: Option<RecvWr> = None;
        for wr_id in (0..len as u64).rev() {
            let mut wr = RecvWr::new(wr_id, scatter_list(cx, &pd));
            wr.next = chain.take().map(Box::new);
            chain = Some(wr);
        }
        Some(Self { qp, wr: chain? })
    }
}

/// Up to two entries on regions registered with `pd`; empty when there are none.
fn scatter_list<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>, pd: &ResourceRef) -> Vec<Sge> {
    let count = cx.rng().gen_range(1..=2);
    let mut sg_list = Vec::with_capacity(count);
    for _ in 0..count {
        let Some(mr) = cx.pick_linked(ResourceKind::Mr, "pd", pd) else {
            break;
        };
        let length = cx.rng().gen_range(1..=64) * 64;
        sg_list.push(Sge::new(mr, length));
    }
    sg_list
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::instantiate::instantiate;

    #[test]
    fn regions_are_collected_across_the_chain() {
        let wr = SendWr::new(0, vec![Sge::new("mr0", 64)])
            .then(SendWr::new(1, vec![Sge::new("mr1", 64), Sge::new("mr0", 64)]));
        let post = PostSend {
            qp: "qp0".to_string(),
            wr,
        };
        let contract = instantiate(&post).expect("instantiate");
        let regions: Vec<&str> = contract
            .requires
            .iter()
            .filter(|entry| entry.resource.kind == ResourceKind::Mr)
            .map(|entry| entry.resource.name.as_str())
            .collect();
        assert_eq!(regions, ["mr0", "mr1"]);
    }

    #[test]
    fn empty_scatter_list_needs_only_the_queue_pair() {
        let post = PostRecv {
            qp: "qp0".to_string(),
            wr: RecvWr::new(0, Vec::new()),
        };
        let contract = instantiate(&post).expect("instantiate");
        assert_eq!(contract.requires.len(), 1);
        assert!(!contract.requires[0].accepts(State::Reset));
        assert!(contract.requires[0].accepts(State::Init));
    }
}
