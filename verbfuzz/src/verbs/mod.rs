//! Verb catalog.
//!
//! Each verb is a plain data holder: its fields name the resources it touches,
//! [`Node::contract`] states what it needs and does to them, and
//! [`Generate::generate`] builds a fresh instance for the mutation engine.
//! [`Verb`] is the closed union the engine and the scaffold format work with.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::node::{Field, Node};
use crate::core::spec::Contract;
use crate::mutate::synth::{SynthContext, Synthesize};

pub mod ah;
pub mod cm;
pub mod cq;
pub mod mr;
pub mod mw;
pub mod pd;
pub mod post;
pub mod qp;
pub mod srq;

pub use ah::{CreateAh, DestroyAh};
pub use cm::{
    BindAddr, Connect, CreateEventChannel, CreateId, DestroyEventChannel, DestroyId, Listen,
    PortSpace,
};
pub use cq::{CreateCompChannel, CreateCq, DestroyCompChannel, DestroyCq};
pub use mr::{DeregMr, RegMr};
pub use mw::{AllocMw, BindMw, DeallocMw};
pub use pd::{AllocPd, DeallocPd, ImportPd};
pub use post::{PostRecv, PostSend, RecvWr, SendOpcode, SendWr, Sge};
pub use qp::{CreateQp, DestroyQp, ModifyQp, QpAttr, QpCap, QpInitAttr, QpState, QpType};
pub use srq::{CreateSrq, DestroySrq};

/// Per-verb synthesis hook.
pub trait Generate: Sized {
    /// Build an instance consistent with `cx`, or `None` if none exists.
    fn generate<R: Rng + ?Sized>(cx: &mut SynthContext<'_, R>) -> Option<Self>;
}

macro_rules! verb_catalog {
    ($($variant:ident => $tag:literal),+ $(,)?) => {
        /// Any catalog verb, tagged by `verb` in serialized form.
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(tag = "verb")]
        pub enum Verb {
            $(
                #[serde(rename = $tag)]
                $variant($variant),
            )+
        }

        /// Discriminant of [`Verb`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum VerbKind {
            $(
                #[serde(rename = $tag)]
                $variant,
            )+
        }

        impl VerbKind {
            pub const ALL: &'static [VerbKind] = &[$(VerbKind::$variant),+];

            pub fn tag(self) -> &'static str {
                match self {
                    $(VerbKind::$variant => $tag,)+
                }
            }
        }

        impl Verb {
            pub fn kind(&self) -> VerbKind {
                match self {
                    $(Verb::$variant(_) => VerbKind::$variant,)+
                }
            }

            fn as_node(&self) -> &dyn Node {
                match self {
                    $(Verb::$variant(verb) => verb,)+
                }
            }

            fn generate<R: Rng + ?Sized>(
                kind: VerbKind,
                cx: &mut SynthContext<'_, R>,
            ) -> Option<Verb> {
                match kind {
                    $(VerbKind::$variant => $variant::generate(cx).map(Verb::$variant),)+
                }
            }
        }

        $(
            impl From<$variant> for Verb {
                fn from(verb: $variant) -> Self {
                    Verb::$variant(verb)
                }
            }
        )+
    };
}

verb_catalog! {
    AllocPd => "alloc_pd",
    DeallocPd => "dealloc_pd",
    ImportPd => "import_pd",
    CreateCompChannel => "create_comp_channel",
    DestroyCompChannel => "destroy_comp_channel",
    CreateCq => "create_cq",
    DestroyCq => "destroy_cq",
    CreateSrq => "create_srq",
    DestroySrq => "destroy_srq",
    CreateQp => "create_qp",
    ModifyQp => "modify_qp",
    DestroyQp => "destroy_qp",
    RegMr => "reg_mr",
    DeregMr => "dereg_mr",
    AllocMw => "alloc_mw",
    BindMw => "bind_mw",
    DeallocMw => "dealloc_mw",
    CreateAh => "create_ah",
    DestroyAh => "destroy_ah",
    PostSend => "post_send",
    PostRecv => "post_recv",
    CreateEventChannel => "create_event_channel",
    DestroyEventChannel => "destroy_event_channel",
    CreateId => "create_id",
    BindAddr => "bind_addr",
    Listen => "listen",
    Connect => "connect",
    DestroyId => "destroy_id",
}

impl fmt::Display for VerbKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for VerbKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        VerbKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.tag() == value)
            .ok_or_else(|| format!("unknown verb '{value}'"))
    }
}

impl Node for Verb {
    fn type_name(&self) -> &'static str {
        self.as_node().type_name()
    }

    fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
        self.as_node().fields()
    }

    fn field(&self, name: &str) -> Option<Field<'_>> {
        self.as_node().field(name)
    }

    fn contract(&self) -> Contract {
        self.as_node().contract()
    }

    fn contract_fields(&self) -> &'static [&'static str] {
        self.as_node().contract_fields()
    }
}

impl Synthesize for Verb {
    type Kind = VerbKind;

    fn kinds() -> &'static [VerbKind] {
        VerbKind::ALL
    }

    fn kind(&self) -> VerbKind {
        Verb::kind(self)
    }

    fn synthesize<R: Rng + ?Sized>(kind: VerbKind, cx: &mut SynthContext<'_, R>) -> Option<Self> {
        Verb::generate(kind, cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_from_str() {
        for kind in VerbKind::ALL {
            assert_eq!(kind.tag().parse::<VerbKind>(), Ok(*kind));
        }
        assert!("post_write".parse::<VerbKind>().is_err());
    }

    #[test]
    fn serialized_tag_matches_kind_tag() {
        let verb = Verb::from(AllocPd::new("pd0"));
        let value = serde_json::to_value(&verb).expect("serialize");
        assert_eq!(value["verb"], "alloc_pd");
        assert_eq!(value["pd"], "pd0");
        let back: Verb = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, verb);
    }

    /// Every contract in the catalog instantiates, so path typos and kind
    /// mix-ups surface here rather than mid-run.
    #[test]
    fn every_catalog_verb_instantiates() {
        let samples = crate::test_support::catalog_samples();
        let mut kinds: Vec<VerbKind> = samples.iter().map(Verb::kind).collect();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), VerbKind::ALL.len(), "sample for every kind");
        for verb in &samples {
            verb.contract()
                .check_paths()
                .unwrap_or_else(|err| panic!("{}: {err}", verb.type_name()));
            crate::core::instantiate::instantiate(verb)
                .unwrap_or_else(|err| panic!("{}: {err}", verb.type_name()));
        }
    }
}
