//! Contract-aware sequence editing.
//!
//! Every edit follows the same shape: build a trial copy of the sequence,
//! replay the affected suffix against a table seeded from the snapshot just
//! before the edit point, then either commit the trial (refreshing the cached
//! snapshots from that point on) or drop it. A contract failure during a trial
//! is a normal rejection; a modeling defect is returned as an error.

use std::collections::BTreeSet;

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use tracing::{debug, info, instrument};

use crate::core::error::ModelError;
use crate::core::path::all_leaves;
use crate::core::replay::{Replay, ReplayError, replay_from};
use crate::core::spec::{InstantiatedContract, ResourceRef};
use crate::core::state::State;
use crate::core::table::Snapshot;
use crate::mutate::config::MutatorConfig;
use crate::mutate::deps::{
    dependent_verbs, dependent_verbs_stateful, lifecycle_dependents, produced_by,
};
use crate::mutate::synth::{SynthContext, Synthesize};
use crate::mutate::Mutation;

#[derive(Debug, Clone, Copy)]
enum Choice {
    Insert,
    Remove,
    Move,
    Reparam,
}

/// Owns a valid sequence and its cached replay.
#[derive(Debug, Clone)]
pub struct Mutator<V> {
    seq: Vec<V>,
    contracts: Vec<InstantiatedContract>,
    prefix: Vec<Snapshot>,
    config: MutatorConfig,
}

impl<V: Synthesize> Mutator<V> {
    /// Replay `seq` once to build the prefix snapshots.
    ///
    /// Any failure here means the starting sequence itself is invalid.
    pub fn new(seq: Vec<V>, config: MutatorConfig) -> Result<Self, ReplayError> {
        let Replay {
            contracts,
            snapshots,
        } = replay_from(&Snapshot::default(), &seq, 0)?;
        Ok(Self {
            seq,
            contracts,
            prefix: snapshots,
            config,
        })
    }

    pub fn sequence(&self) -> &[V] {
        &self.seq
    }

    pub fn into_sequence(self) -> Vec<V> {
        self.seq
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }

    pub fn config(&self) -> &MutatorConfig {
        &self.config
    }

    /// State before the verb at `index`; `index == len()` gives the final state.
    pub fn snapshot_before(&self, index: usize) -> Option<&Snapshot> {
        self.prefix.get(index)
    }

    pub fn final_snapshot(&self) -> &Snapshot {
        // `prefix` always holds len() + 1 entries.
        &self.prefix[self.seq.len()]
    }

    pub fn contracts(&self) -> &[InstantiatedContract] {
        &self.contracts
    }

    pub fn find_dependent_verbs(&self, resource: &ResourceRef) -> Vec<usize> {
        dependent_verbs(&self.contracts, resource)
    }

    pub fn find_dependent_verbs_stateful(
        &self,
        resource: &ResourceRef,
        state: State,
    ) -> Vec<usize> {
        dependent_verbs_stateful(&self.contracts, &self.prefix, resource, state)
    }

    /// Pick and attempt random edits until one commits or the attempt budget
    /// runs out. `Ok(None)` leaves the sequence unchanged.
    #[instrument(skip_all, fields(len = self.seq.len()))]
    pub fn mutate<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<Option<Mutation>, ModelError> {
        let weights = self.config.weights;
        let choices = [
            (Choice::Insert, weights.insert),
            (Choice::Remove, weights.remove),
            (Choice::Move, weights.relocate),
            (Choice::Reparam, weights.reparam),
        ];
        let Ok(dist) = WeightedIndex::new(choices.iter().map(|(_, weight)| *weight)) else {
            debug!("all mutation weights are zero");
            return Ok(None);
        };

        for attempt in 0..self.config.max_attempts {
            let len = self.seq.len();
            let mutation = match choices[dist.sample(rng)].0 {
                Choice::Insert => {
                    let index = rng.gen_range(0..=len);
                    let Some(&kind) = V::kinds().choose(rng) else {
                        continue;
                    };
                    self.mutate_insert(index, kind, rng)?
                        .then(|| Mutation::Insert {
                            index,
                            verb: kind.to_string(),
                        })
                }
                Choice::Remove => {
                    if len == 0 {
                        continue;
                    }
                    let index = rng.gen_range(0..len);
                    let verb = self.seq[index].kind().to_string();
                    self.mutate_remove(index)?.then(|| Mutation::Remove {
                        index,
                        verb,
                        removed: len - self.seq.len(),
                    })
                }
                Choice::Move => {
                    if len < 2 {
                        continue;
                    }
                    let from = rng.gen_range(0..len);
                    let mut to = rng.gen_range(0..len - 1);
                    if to >= from {
                        to += 1;
                    }
                    let verb = self.seq[from].kind().to_string();
                    self.mutate_move(from, to)?
                        .then(|| Mutation::Move { from, to, verb })
                }
                Choice::Reparam => {
                    if len == 0 {
                        continue;
                    }
                    let index = rng.gen_range(0..len);
                    let verb = self.seq[index].kind().to_string();
                    self.mutate_reparam(index, rng)?
                        .then(|| Mutation::Reparam { index, verb })
                }
            };
            if let Some(mutation) = mutation {
                info!(attempt, %mutation, "committed");
                return Ok(Some(mutation));
            }
        }

        debug!(attempts = self.config.max_attempts, "no legal mutation found");
        Ok(None)
    }

    /// Synthesize a `kind` verb against the state at `index` and insert it there.
    pub fn mutate_insert<R: Rng + ?Sized>(
        &mut self,
        index: usize,
        kind: V::Kind,
        rng: &mut R,
    ) -> Result<bool, ModelError> {
        if index > self.seq.len() {
            return Ok(false);
        }
        let verb = {
            let mut cx = self.context(index, index, rng);
            V::synthesize(kind, &mut cx)
        };
        let Some(verb) = verb else {
            debug!(index, %kind, "no consistent parameters");
            return Ok(false);
        };
        self.mutate_insert_verb(index, verb)
    }

    /// Insert a caller-built verb at `index`.
    pub fn mutate_insert_verb(&mut self, index: usize, verb: V) -> Result<bool, ModelError> {
        if index > self.seq.len() {
            return Ok(false);
        }
        let mut trial = self.seq.clone();
        trial.insert(index, verb);
        self.try_commit(trial, index)
    }

    /// Remove the verb at `index`, plus (with `cascade_remove`) every later
    /// verb that transitively depends on what it produced.
    pub fn mutate_remove(&mut self, index: usize) -> Result<bool, ModelError> {
        if index >= self.seq.len() {
            return Ok(false);
        }
        let doomed = if self.config.cascade_remove {
            self.cascade(index)
        } else {
            BTreeSet::from([index])
        };
        let trial: Vec<V> = self
            .seq
            .iter()
            .enumerate()
            .filter(|(position, _)| !doomed.contains(position))
            .map(|(_, verb)| verb.clone())
            .collect();
        self.try_commit(trial, index)
    }

    /// Move the verb at `index` so that it ends up at `target`.
    pub fn mutate_move(&mut self, index: usize, target: usize) -> Result<bool, ModelError> {
        let len = self.seq.len();
        if index >= len || target >= len || index == target {
            return Ok(false);
        }
        let mut trial = self.seq.clone();
        let verb = trial.remove(index);
        trial.insert(target, verb);
        self.try_commit(trial, index.min(target))
    }

    /// Replace the verb at `index` with a freshly synthesized one of the same kind.
    pub fn mutate_reparam<R: Rng + ?Sized>(
        &mut self,
        index: usize,
        rng: &mut R,
    ) -> Result<bool, ModelError> {
        if index >= self.seq.len() {
            return Ok(false);
        }
        let kind = self.seq[index].kind();
        let verb = {
            let mut cx = self.context(index, index + 1, rng);
            V::synthesize(kind, &mut cx)
        };
        let Some(verb) = verb else {
            return Ok(false);
        };
        if verb == self.seq[index] {
            return Ok(false);
        }
        let mut trial = self.seq.clone();
        trial[index] = verb;
        self.try_commit(trial, index)
    }

    fn context<'a, R: Rng + ?Sized>(
        &'a self,
        index: usize,
        later: usize,
        rng: &'a mut R,
    ) -> SynthContext<'a, R> {
        let taken: BTreeSet<ResourceRef> = self
            .seq
            .iter()
            .flat_map(|verb| {
                all_leaves(verb)
                    .into_iter()
                    .map(|(_, leaf)| ResourceRef::new(leaf.kind, leaf.name))
            })
            .collect();
        let busy: BTreeSet<ResourceRef> = self.contracts[later.min(self.contracts.len())..]
            .iter()
            .flat_map(|contract| contract.resources().cloned())
            .collect();
        SynthContext::new(
            &self.prefix[index],
            rng,
            taken,
            busy,
            self.config.prefer_independent,
        )
    }

    fn cascade(&self, index: usize) -> BTreeSet<usize> {
        let mut doomed = BTreeSet::from([index]);
        let mut pending = vec![index];
        while let Some(current) = pending.pop() {
            for resource in produced_by(&self.contracts, current) {
                for dependent in lifecycle_dependents(&self.contracts, &resource, current) {
                    if doomed.insert(dependent) {
                        pending.push(dependent);
                    }
                }
            }
        }
        doomed
    }

    /// Revalidate `trial` from `from` onward and adopt it if every verb passes.
    fn try_commit(&mut self, trial: Vec<V>, from: usize) -> Result<bool, ModelError> {
        let start = &self.prefix[from];
        let replay = match replay_from(start, &trial[from..], from) {
            Ok(replay) => replay,
            Err(ReplayError::Contract { index, verb, source }) => {
                debug!(index, verb, error = %source, "trial rejected");
                return Ok(false);
            }
            Err(ReplayError::Model { source, .. }) => return Err(source),
        };
        self.contracts.truncate(from);
        self.contracts.extend(replay.contracts);
        self.prefix.truncate(from);
        self.prefix.extend(replay.snapshots);
        self.seq = trial;
        Ok(true)
    }
}
