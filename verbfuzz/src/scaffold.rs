//! Scaffolds: known-valid starting sequences for the mutation engine.

use serde::{Deserialize, Serialize};

use crate::verbs::{
    AllocPd, BindAddr, Connect, CreateCompChannel, CreateCq, CreateEventChannel, CreateId,
    CreateQp, DeallocPd, DeregMr, DestroyCompChannel, DestroyCq, DestroyEventChannel, DestroyId,
    DestroyQp, Listen, ModifyQp, PortSpace, PostRecv, PostSend, QpInitAttr, QpState, RecvWr, RegMr,
    SendWr, Sge, Verb,
};

/// Current scaffold file format version.
pub const SCAFFOLD_VERSION: u32 = 1;

/// A verb sequence plus the metadata stored alongside it on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scaffold {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub verbs: Vec<Verb>,
}

impl Scaffold {
    pub fn new(verbs: Vec<Verb>) -> Self {
        Self {
            version: SCAFFOLD_VERSION,
            description: None,
            verbs,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Scaffold shipped with the binary.
pub struct Builtin {
    pub name: &'static str,
    pub description: &'static str,
    build: fn() -> Vec<Verb>,
}

impl Builtin {
    pub fn scaffold(&self) -> Scaffold {
        Scaffold::new((self.build)()).with_description(self.description)
    }
}

pub const BUILTIN_SCAFFOLDS: &[Builtin] = &[
    Builtin {
        name: "endpoint_lifecycle",
        description: "single queue pair driven reset -> init -> rtr -> rts, then torn down",
        build: endpoint_lifecycle,
    },
    Builtin {
        name: "rc_send_recv",
        description: "two connected RC queue pairs exchanging posted work requests",
        build: rc_send_recv,
    },
    Builtin {
        name: "cm_listener",
        description: "connection manager listener and an active-side connect",
        build: cm_listener,
    },
];

/// Look up a built-in scaffold by name.
pub fn builtin(name: &str) -> Option<Scaffold> {
    BUILTIN_SCAFFOLDS
        .iter()
        .find(|entry| entry.name == name)
        .map(Builtin::scaffold)
}

pub fn endpoint_lifecycle() -> Vec<Verb> {
    vec![
        AllocPd::new("pd0").into(),
        CreateCq::new("cq0", 16).into(),
        CreateQp::new("qp0", "pd0", QpInitAttr::new("cq0", "cq0")).into(),
        ModifyQp::new("qp0", QpState::Init).into(),
        ModifyQp::new("qp0", QpState::Rtr).into(),
        ModifyQp::new("qp0", QpState::Rts).into(),
        DestroyQp::new("qp0").into(),
        DestroyCq::new("cq0").into(),
        DeallocPd::new("pd0").into(),
    ]
}

pub fn rc_send_recv() -> Vec<Verb> {
    let connect = |qp: &str, peer: &str| {
        let mut modify = ModifyQp::new(qp, QpState::Rtr);
        modify.attr.dest_qp = Some(peer.to_string());
        Verb::from(modify)
    };
    vec![
        AllocPd::new("pd0").into(),
        CreateCompChannel {
            channel: "ch0".to_string(),
        }
        .into(),
        CreateCq::new("cq0", 64).on_channel("ch0").into(),
        CreateCq::new("cq1", 64).into(),
        RegMr::new("mr0", "pd0", 4096).into(),
        RegMr::new("mr1", "pd0", 4096).into(),
        CreateQp::new("qp0", "pd0", QpInitAttr::new("cq0", "cq1")).into(),
        CreateQp::new("qp1", "pd0", QpInitAttr::new("cq1", "cq1")).into(),
        ModifyQp::new("qp0", QpState::Init).into(),
        ModifyQp::new("qp1", QpState::Init).into(),
        PostRecv {
            qp: "qp1".to_string(),
            wr: RecvWr::new(0, vec![Sge::new("mr1", 4096)]),
        }
        .into(),
        connect("qp0", "qp1"),
        connect("qp1", "qp0"),
        ModifyQp::new("qp0", QpState::Rts).into(),
        ModifyQp::new("qp1", QpState::Rts).into(),
        PostSend {
            qp: "qp0".to_string(),
            wr: SendWr::new(0, vec![Sge::new("mr0", 1024)])
                .then(SendWr::new(1, vec![Sge::new("mr0", 512), Sge::new("mr1", 512)])),
        }
        .into(),
        DestroyQp::new("qp0").into(),
        DestroyQp::new("qp1").into(),
        DeregMr::new("mr0").into(),
        DeregMr::new("mr1").into(),
        DestroyCq::new("cq0").into(),
        DestroyCq::new("cq1").into(),
        DestroyCompChannel {
            channel: "ch0".to_string(),
        }
        .into(),
        DeallocPd::new("pd0").into(),
    ]
}

pub fn cm_listener() -> Vec<Verb> {
    let create_id = |id: &str| {
        Verb::from(CreateId {
            id: id.to_string(),
            channel: "ec0".to_string(),
            port_space: PortSpace::Tcp,
        })
    };
    let bind = |id: &str, port: u16| {
        Verb::from(BindAddr {
            id: id.to_string(),
            addr: "10.0.0.1".to_string(),
            port,
        })
    };
    vec![
        CreateEventChannel {
            channel: "ec0".to_string(),
        }
        .into(),
        create_id("id0"),
        bind("id0", 7471),
        Listen {
            id: "id0".to_string(),
            backlog: 16,
        }
        .into(),
        create_id("id1"),
        bind("id1", 7472),
        Connect {
            id: "id1".to_string(),
            qp: None,
        }
        .into(),
        DestroyId {
            id: "id1".to_string(),
        }
        .into(),
        DestroyId {
            id: "id0".to_string(),
        }
        .into(),
        DestroyEventChannel {
            channel: "ec0".to_string(),
        }
        .into(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::replay::replay;
    use crate::core::spec::ResourceRef;
    use crate::core::state::{ResourceKind, State};

    #[test]
    fn every_builtin_replays_cleanly() {
        for entry in BUILTIN_SCAFFOLDS {
            let scaffold = entry.scaffold();
            replay(&scaffold.verbs)
                .unwrap_or_else(|err| panic!("{}: {err}", entry.name));
        }
    }

    #[test]
    fn endpoint_lifecycle_ends_with_everything_released() {
        let table = replay(&endpoint_lifecycle()).expect("replay");
        assert_eq!(
            table.state_of(&ResourceRef::new(ResourceKind::Qp, "qp0")),
            Some(State::Destroyed)
        );
        assert_eq!(
            table.state_of(&ResourceRef::new(ResourceKind::Pd, "pd0")),
            Some(State::Freed)
        );
    }

    #[test]
    fn unknown_builtin_is_none() {
        assert!(builtin("endpoint_lifecycle").is_some());
        assert!(builtin("nope").is_none());
    }
}
