//! Test-only helpers: fixture verbs, seeded RNGs and scaffold files.

use std::path::PathBuf;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::TempDir;

use crate::io::scaffold_store::write_scaffold;
use crate::scaffold::Scaffold;
use crate::verbs::{
    AllocMw, AllocPd, BindAddr, BindMw, Connect, CreateAh, CreateCompChannel, CreateCq,
    CreateEventChannel, CreateId, CreateQp, CreateSrq, DeallocMw, DeallocPd, DeregMr, DestroyAh,
    DestroyCompChannel, DestroyCq, DestroyEventChannel, DestroyId, DestroyQp, DestroySrq,
    ImportPd, Listen, ModifyQp, PortSpace, PostRecv, PostSend, QpInitAttr, QpState, RecvWr, RegMr,
    SendWr, Sge, Verb,
};

/// Deterministic RNG for engine tests.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// A valid sequence that uses every verb in the catalog at least once.
pub fn catalog_samples() -> Vec<Verb> {
    let mut srq_attr = QpInitAttr::new("cq0", "cq0");
    srq_attr.srq = Some("srq0".to_string());
    let cm_id = |id: &str| {
        Verb::from(CreateId {
            id: id.to_string(),
            channel: "ec0".to_string(),
            port_space: PortSpace::Tcp,
        })
    };
    let bind = |id: &str, port: u16| {
        Verb::from(BindAddr {
            id: id.to_string(),
            addr: "10.0.0.2".to_string(),
            port,
        })
    };
    vec![
        ImportPd {
            pd: "pd1".to_string(),
            fd: 5,
            handle: 7,
        }
        .into(),
        AllocPd::new("pd0").into(),
        CreateCompChannel {
            channel: "ch0".to_string(),
        }
        .into(),
        CreateCq::new("cq0", 32).on_channel("ch0").into(),
        CreateSrq {
            srq: "srq0".to_string(),
            pd: "pd0".to_string(),
            max_wr: 16,
            max_sge: 1,
        }
        .into(),
        CreateAh {
            ah: "ah0".to_string(),
            pd: "pd0".to_string(),
            port: 1,
            dlid: 3,
        }
        .into(),
        RegMr::new("mr0", "pd0", 4096).into(),
        AllocMw {
            mw: "mw0".to_string(),
            pd: "pd0".to_string(),
        }
        .into(),
        CreateQp::new("qp0", "pd0", srq_attr).into(),
        ModifyQp::new("qp0", QpState::Init).into(),
        ModifyQp::new("qp0", QpState::Rtr).into(),
        ModifyQp::new("qp0", QpState::Rts).into(),
        PostRecv {
            qp: "qp0".to_string(),
            wr: RecvWr::new(1, vec![Sge::new("mr0", 256)]),
        }
        .into(),
        PostSend {
            qp: "qp0".to_string(),
            wr: SendWr::new(2, vec![Sge::new("mr0", 128)]),
        }
        .into(),
        BindMw {
            mw: "mw0".to_string(),
            qp: "qp0".to_string(),
            mr: "mr0".to_string(),
            offset: 0,
            length: 64,
        }
        .into(),
        DeallocMw {
            mw: "mw0".to_string(),
        }
        .into(),
        CreateEventChannel {
            channel: "ec0".to_string(),
        }
        .into(),
        cm_id("id0"),
        bind("id0", 7471),
        Listen {
            id: "id0".to_string(),
            backlog: 4,
        }
        .into(),
        cm_id("id1"),
        bind("id1", 7472),
        Connect {
            id: "id1".to_string(),
            qp: Some("qp0".to_string()),
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
        DestroyQp::new("qp0").into(),
        DeregMr::new("mr0").into(),
        DestroyAh {
            ah: "ah0".to_string(),
        }
        .into(),
        DestroySrq {
            srq: "srq0".to_string(),
        }
        .into(),
        DestroyCq::new("cq0").into(),
        DestroyCompChannel {
            channel: "ch0".to_string(),
        }
        .into(),
        DeallocPd::new("pd0").into(),
        DeallocPd::new("pd1").into(),
    ]
}

/// Write `scaffold` as `<name>.json` inside a fresh temp directory.
///
/// The directory is removed when the returned guard drops.
pub fn scaffold_file(name: &str, scaffold: &Scaffold) -> (TempDir, PathBuf) {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join(format!("{name}.json"));
    write_scaffold(&path, scaffold).expect("write scaffold");
    (temp, path)
}

/// Write raw scaffold text, for tests that need malformed files.
pub fn raw_scaffold_file(contents: &str) -> (TempDir, PathBuf) {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("scaffold.json");
    std::fs::write(&path, contents).expect("write scaffold");
    (temp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::replay::replay;

    #[test]
    fn catalog_samples_replay() {
        replay(&catalog_samples()).expect("catalog samples replay");
    }
}
