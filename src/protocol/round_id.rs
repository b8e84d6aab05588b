use serde::{Deserialize, Serialize};

/// Identifies a round within a protocol's state-transition graph.
///
/// A plain round number plus a flag marking the automatically-inserted echo
/// round that follows a broadcast round requiring reliability (see
/// [`EchoRoundCommunicationInfo`](super::EchoRoundCommunicationInfo)).
/// Ported from `manul::protocol::round_id::RoundId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoundId {
    round_num: u16,
    is_echo: bool,
}

impl RoundId {
    /// Creates the (non-echo) round ID for round number `round_num`.
    pub fn new(round_num: u16) -> Self {
        Self {
            round_num,
            is_echo: false,
        }
    }

    /// The underlying round number.
    pub fn round_num(&self) -> u16 {
        self.round_num
    }

    /// Whether this is an echo round.
    pub fn is_echo(&self) -> bool {
        self.is_echo
    }

    /// The echo round ID following this (non-echo) round.
    ///
    /// Panics if called on an echo round ID already — this would indicate a
    /// bug in the engine, not a reachable protocol state.
    pub fn echo(&self) -> Self {
        assert!(!self.is_echo, "round {:?} is already an echo round", self);
        Self {
            round_num: self.round_num,
            is_echo: true,
        }
    }
}

impl core::fmt::Display for RoundId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_echo {
            write!(f, "round {} (echo)", self.round_num)
        } else {
            write!(f, "round {}", self.round_num)
        }
    }
}

impl From<u16> for RoundId {
    fn from(round_num: u16) -> Self {
        Self::new(round_num)
    }
}

/// Describes where a round sits in the protocol's state-transition graph:
/// its own ID and the IDs it may transition to.
///
/// The engine uses `possible_next_rounds` to reject an unexpected transition
/// coming out of [`Round::finalize`](super::Round::finalize) as an
/// [`ErrorKind::Internal`](crate::error::ErrorKind::Internal) bug rather than
/// silently accepting it — mirroring `manul::session::session::Session`'s
/// `possible_next_rounds` check.
#[derive(Debug, Clone)]
pub struct TransitionInfo {
    id: RoundId,
    possible_next_rounds: alloc::collections::BTreeSet<RoundId>,
    is_final: bool,
}

impl TransitionInfo {
    /// A round that may transition to any of `possible_next_rounds`.
    pub fn new(id: RoundId, possible_next_rounds: alloc::collections::BTreeSet<RoundId>) -> Self {
        Self {
            id,
            possible_next_rounds,
            is_final: false,
        }
    }

    /// A round whose `finalize` always produces the protocol's terminal result.
    pub fn new_final(id: RoundId) -> Self {
        Self {
            id,
            possible_next_rounds: alloc::collections::BTreeSet::new(),
            is_final: true,
        }
    }

    /// This round's own ID.
    pub fn id(&self) -> RoundId {
        self.id
    }

    /// Whether `next` is a valid round to transition to from here.
    pub fn allows_transition_to(&self, next: RoundId) -> bool {
        self.possible_next_rounds.contains(&next)
    }

    /// Whether this round's `finalize` is expected to always produce a result.
    pub fn is_final(&self) -> bool {
        self.is_final
    }
}
