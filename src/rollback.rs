/*!
The generation/rollback state machine that wraps DYN re-sharing (spec §4.5).

Configs are the only object that persists between sessions; this module is
what lets an operational layer recover from a failed or malicious reshare by
reverting to a known-good prior generation, without this crate ever
mutating a Config in place (the terminal round of a session always produces
a *new* Config object; rollback is just another way to produce one).
*/

use alloc::collections::{BTreeMap, VecDeque};

use crate::{
    config::Config,
    error::{Abort, ErrorKind},
    group::Group,
    party::PartyId,
};

/// Default bound on the number of generations retained per party, per
/// spec §3 "Generation snapshot (for rollback)".
pub const DEFAULT_HISTORY_BOUND: usize = 10;

/// A recorded generation for one party: its Config at that generation plus
/// the bookkeeping the rollback policy needs.
///
/// Ported in shape from spec §3's `(generation, Config, parties, threshold,
/// timestamp, failure count, per-party health score)` tuple; `parties` and
/// `threshold` are read off the embedded Config rather than duplicated.
#[derive(Debug, Clone)]
pub struct Snapshot<Id, G: Group> {
    pub config: Config<Id, G>,
    pub timestamp: u64,
    pub failure_count: u32,
    pub health_score: f64,
}

impl<Id: PartyId, G: Group> Snapshot<Id, G> {
    fn new(config: Config<Id, G>, timestamp: u64) -> Self {
        Self {
            config,
            timestamp,
            failure_count: 0,
            health_score: 1.0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.config.core().generation
    }
}

/// A bounded ring buffer of generation snapshots, one per party this
/// process tracks.
///
/// Per spec §5 "Shared resources": this is a single-writer, single-reader
/// structure under an exclusive lock held by the caller during
/// `save`/`rollback`/`evict`; this type itself holds no lock (no hidden
/// singletons, per spec §9's redesign note), it only requires `&mut self`.
#[derive(Debug)]
pub struct RollbackManager<Id, G: Group> {
    history: BTreeMap<Id, VecDeque<Snapshot<Id, G>>>,
    bound: usize,
}

impl<Id: PartyId, G: Group> RollbackManager<Id, G> {
    pub fn new(bound: usize) -> Self {
        Self {
            history: BTreeMap::new(),
            bound: bound.max(1),
        }
    }

    /// Appends a deep copy of `config` as the latest snapshot for its own
    /// `id`, evicting the oldest generation if the bound is reached.
    pub fn save(&mut self, config: Config<Id, G>, timestamp: u64) {
        let id = config.core().id.clone();
        let buffer = self.history.entry(id).or_default();
        if buffer.len() == self.bound {
            buffer.pop_front();
        }
        buffer.push_back(Snapshot::new(config, timestamp));
    }

    fn buffer(&self, id: &Id) -> Result<&VecDeque<Snapshot<Id, G>>, Abort<Id>> {
        self.history
            .get(id)
            .filter(|buffer| !buffer.is_empty())
            .ok_or_else(|| Abort::new(ErrorKind::GenerationNotFound, "no snapshot history for this party"))
    }

    fn current_generation(&self, id: &Id) -> Result<u64, Abort<Id>> {
        Ok(self.buffer(id)?.back().expect("non-empty by construction").generation())
    }

    /// Produces a Config derived from the snapshot at `target_generation`:
    /// same contents, `generation` set to `current + 1`, `rollback_from`
    /// set to `current`. The rolled-back Config is itself a new generation,
    /// so a Config at the stale generation can never silently interoperate
    /// with it again (spec §4.5).
    pub fn rollback(&mut self, id: &Id, target_generation: u64) -> Result<Config<Id, G>, Abort<Id>> {
        let current = self.current_generation(id)?;
        if target_generation >= current {
            return Err(Abort::new(
                ErrorKind::CannotRollForward,
                "rollback target must be older than the current generation",
            ));
        }
        let buffer = self.buffer(id)?;
        let target = buffer
            .iter()
            .find(|snapshot| snapshot.generation() == target_generation)
            .ok_or_else(|| Abort::new(ErrorKind::GenerationNotFound, "target generation not in history"))?;
        let rolled_back = with_new_generation(target.config.clone(), current + 1, Some(current));
        self.save(rolled_back.clone(), target.timestamp);
        Ok(rolled_back)
    }

    /// Increments the current snapshot's failure counter; once it reaches
    /// `threshold`, automatically rolls back to the previous generation and
    /// resets the counter.
    pub fn rollback_on_failure(&mut self, id: &Id, threshold: u32) -> Result<Option<Config<Id, G>>, Abort<Id>> {
        let current = self.current_generation(id)?;
        let buffer = self
            .history
            .get_mut(id)
            .ok_or_else(|| Abort::new(ErrorKind::GenerationNotFound, "no snapshot history for this party"))?;
        let snapshot = buffer.back_mut().expect("non-empty, checked by current_generation");
        snapshot.failure_count += 1;
        if snapshot.failure_count < threshold {
            return Ok(None);
        }
        snapshot.failure_count = 0;
        if current == 0 {
            return Ok(None);
        }
        self.rollback(id, current - 1).map(Some)
    }

    /// Produces a candidate Config with `parties` removed; a proposal only
    /// (spec §4.5: "the actual committee change must be effected by a DYN
    /// session"), not applied to history.
    pub fn evict(&self, config: &Config<Id, G>, parties: &[Id]) -> Result<Config<Id, G>, Abort<Id>> {
        let mut core = config.core().clone();
        for id in parties {
            core.public_shares.remove(id);
        }
        if core.public_shares.len() < core.threshold {
            return Err(Abort::new(
                ErrorKind::InvalidThreshold,
                "evicting these parties would leave fewer than threshold public shares",
            ));
        }
        Ok(replace_core(config.clone(), core))
    }
}

fn with_new_generation<Id: PartyId, G: Group>(
    config: Config<Id, G>,
    generation: u64,
    rollback_from: Option<u64>,
) -> Config<Id, G> {
    let mut core = config.core().clone();
    core.generation = generation;
    core.rollback_from = rollback_from;
    replace_core(config, core)
}

fn replace_core<Id: PartyId, G: Group>(config: Config<Id, G>, core: crate::config::ConfigCore<Id, G>) -> Config<Id, G> {
    match config {
        Config::Cgg21(mut c) => {
            c.core = core;
            Config::Cgg21(c)
        }
        Config::Frost(mut c) => {
            c.core = core;
            Config::Frost(c)
        }
        Config::Dyn(mut c) => {
            c.core = core;
            Config::Dyn(c)
        }
    }
}
