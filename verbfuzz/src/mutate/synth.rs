//! Parameter synthesis for inserted or re-parameterized verbs.
//!
//! A [`SynthContext`] exposes the snapshot at the edit point. Producing verbs
//! take names from [`SynthContext::fresh_name`]; consuming verbs pick among
//! resources that are live (or in a given state) at that point.

use std::collections::BTreeSet;
use std::fmt;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::core::node::Node;
use crate::core::spec::ResourceRef;
use crate::core::state::{ResourceKind, State};
use crate::core::table::{ResourceRecord, Snapshot};

/// Verb type the engine can edit and synthesize.
pub trait Synthesize: Node + Clone + PartialEq + Sized {
    type Kind: Copy + Eq + fmt::Display + 'static;

    /// Every kind the engine may insert.
    fn kinds() -> &'static [Self::Kind];

    fn kind(&self) -> Self::Kind;

    /// Build a fresh instance of `kind` consistent with the context's
    /// snapshot, or `None` when no such parameters exist.
    fn synthesize<R: Rng + ?Sized>(kind: Self::Kind, cx: &mut SynthContext<'_, R>) -> Option<Self>;
}

/// Snapshot and bookkeeping visible to a synthesis hook.
pub struct SynthContext<'a, R: ?Sized> {
    snapshot: &'a Snapshot,
    rng: &'a mut R,
    taken: BTreeSet<ResourceRef>,
    busy: BTreeSet<ResourceRef>,
    prefer_independent: bool,
    claimed: BTreeSet<ResourceRef>,
}

impl<'a, R: Rng + ?Sized> SynthContext<'a, R> {
    /// `taken` holds every resource named anywhere in the sequence; `busy`
    /// holds resources referenced at or after the edit point.
    pub fn new(
        snapshot: &'a Snapshot,
        rng: &'a mut R,
        taken: BTreeSet<ResourceRef>,
        busy: BTreeSet<ResourceRef>,
        prefer_independent: bool,
    ) -> Self {
        Self {
            snapshot,
            rng,
            taken,
            busy,
            prefer_independent,
            claimed: BTreeSet::new(),
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        self.snapshot
    }

    pub fn rng(&mut self) -> &mut R {
        self.rng
    }

    /// A name for a new `kind` resource: not live at the snapshot, not named
    /// anywhere in the sequence, and not handed out earlier in this context.
    pub fn fresh_name(&mut self, kind: ResourceKind) -> String {
        let mut n = 0usize;
        loop {
            let name = format!("{}{n}", kind.name_prefix());
            let resource = ResourceRef::new(kind, name.as_str());
            if !self.taken.contains(&resource)
                && !self.claimed.contains(&resource)
                && !self.snapshot.is_live(&resource)
            {
                self.claimed.insert(resource);
                return name;
            }
            n += 1;
        }
    }

    /// A live `kind` resource.
    pub fn pick_live(&mut self, kind: ResourceKind) -> Option<String> {
        self.pick_where(kind, |record| record.is_live())
    }

    /// A `kind` resource currently in `state`.
    pub fn pick_in(&mut self, kind: ResourceKind, state: State) -> Option<String> {
        self.pick_where(kind, |record| record.state == state)
    }

    /// A live `kind` resource whose `key` metadata link points at `target`.
    pub fn pick_linked(
        &mut self,
        kind: ResourceKind,
        key: &str,
        target: &ResourceRef,
    ) -> Option<String> {
        self.pick_where(kind, |record| {
            record.is_live() && record.metadata.get(key) == Some(target)
        })
    }

    /// A `kind` resource whose record satisfies `accept`.
    ///
    /// With `prefer_independent`, resources no later verb references win
    /// whenever at least one qualifies.
    pub fn pick_where(
        &mut self,
        kind: ResourceKind,
        accept: impl Fn(&ResourceRecord) -> bool,
    ) -> Option<String> {
        let candidates: Vec<&ResourceRef> = self
            .snapshot
            .of_kind(kind)
            .filter(|(_, record)| accept(record))
            .map(|(resource, _)| resource)
            .collect();
        let independent: Vec<&ResourceRef> = candidates
            .iter()
            .copied()
            .filter(|resource| !self.busy.contains(*resource))
            .collect();
        let pool = if self.prefer_independent && !independent.is_empty() {
            independent
        } else {
            candidates
        };
        pool.choose(&mut *self.rng)
            .map(|resource| resource.name.clone())
    }

    pub fn state_of(&self, kind: ResourceKind, name: &str) -> Option<State> {
        self.snapshot.state_of(&ResourceRef::new(kind, name))
    }

    /// Resource recorded under `key` when `kind:name` was produced.
    pub fn metadata_of(&self, kind: ResourceKind, name: &str, key: &str) -> Option<ResourceRef> {
        self.snapshot
            .get(&ResourceRef::new(kind, name))
            .and_then(|record| record.metadata.get(key))
            .cloned()
    }
}
