use alloc::{collections::BTreeMap, string::String, vec::Vec};

use crate::{
    error::{Abort, ErrorKind},
    protocol::RoundId,
};

/// A single recorded event in a round's transcript: either a message from
/// `from` was accepted, or processing it produced an error.
#[derive(Debug, Clone)]
pub enum TranscriptEntry<Id> {
    Accepted { from: Id },
    Rejected { from: Id, reason: String },
}

/// An append-only, per-round record of what happened while processing
/// inbound messages, kept across the whole session so that a terminal
/// [`Abort`] can be explained and so that a banned sender is never
/// reconsidered in a later round.
///
/// Ported from `manul::session::transcript::Transcript`.
#[derive(Debug, Clone, Default)]
pub struct Transcript<Id> {
    rounds: BTreeMap<RoundId, Vec<TranscriptEntry<Id>>>,
    banned: BTreeMap<Id, ErrorKind>,
}

impl<Id: Ord + Clone> Transcript<Id> {
    pub fn new() -> Self {
        Self {
            rounds: BTreeMap::new(),
            banned: BTreeMap::new(),
        }
    }

    pub fn record_accepted(&mut self, round_id: RoundId, from: Id) {
        self.rounds
            .entry(round_id)
            .or_default()
            .push(TranscriptEntry::Accepted { from });
    }

    pub fn record_rejected(&mut self, round_id: RoundId, from: Id, reason: impl Into<String>) {
        self.rounds.entry(round_id).or_default().push(TranscriptEntry::Rejected {
            from,
            reason: reason.into(),
        });
    }

    /// Marks `id` as banned under `kind`: no later round will accept a
    /// message from it again, even if a quorum would otherwise be reachable
    /// without it.
    pub fn ban(&mut self, id: Id, kind: ErrorKind) {
        self.banned.insert(id, kind);
    }

    pub fn is_banned(&self, id: &Id) -> bool {
        self.banned.contains_key(id)
    }

    pub fn banned(&self) -> &BTreeMap<Id, ErrorKind> {
        &self.banned
    }

    pub fn entries(&self, round_id: RoundId) -> &[TranscriptEntry<Id>] {
        self.rounds.get(&round_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// How a session run ended.
#[derive(Debug)]
pub enum SessionOutcome<Id, R> {
    Result(R),
    Abort(Abort<Id>),
}

/// A full account of a finished session: its outcome plus the transcript
/// that led to it, so a caller can explain (or, for an `Abort`, prove) why
/// the run ended the way it did.
///
/// Ported from `manul::session::transcript::SessionReport`, trimmed to the
/// two outcomes this crate's spec recognizes (see `SPEC_FULL.md` §6 on
/// dropping the "stalled" outcome).
#[derive(Debug)]
pub struct SessionReport<Id, R> {
    pub outcome: SessionOutcome<Id, R>,
    pub transcript: Transcript<Id>,
}
