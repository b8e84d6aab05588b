use alloc::collections::{BTreeMap, BTreeSet};

use crate::{
    error::RemoteError,
    party::{IdSet, PartyId},
    protocol::{Artifact, EchoBroadcast, Payload, Protocol},
};

/// Whether a round's accumulated state is ready for [`Round::finalize`](crate::protocol::Round::finalize).
///
/// Ported from `manul::session::session::CanFinalize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanFinalize {
    /// A quorum of payloads has been collected; `finalize` may be called.
    Yes,
    /// Not enough payloads yet, but a quorum is still reachable.
    NotYet,
    /// Too many senders have been banned or dropped out; a quorum can never
    /// be reached, so the round (and the session) must abort.
    Never,
}

/// Accumulates the state produced while processing inbound messages for one
/// round, until enough have arrived to attempt [`Round::finalize`](crate::protocol::Round::finalize).
///
/// Ported from `manul::session::session::RoundAccumulator`.
#[derive(Debug)]
pub struct RoundAccumulator<Id: PartyId, P: Protocol<Id>> {
    expecting_messages_from: IdSet<Id>,
    payloads: BTreeMap<Id, Payload>,
    artifacts: BTreeMap<Id, Artifact>,
    echo_broadcasts: BTreeMap<Id, EchoBroadcast>,
    provable_errors: BTreeMap<Id, P::ProtocolError>,
    unprovable_errors: BTreeMap<Id, RemoteError>,
}

impl<Id: PartyId, P: Protocol<Id>> RoundAccumulator<Id, P> {
    pub fn new(expecting_messages_from: IdSet<Id>) -> Self {
        Self {
            expecting_messages_from,
            payloads: BTreeMap::new(),
            artifacts: BTreeMap::new(),
            echo_broadcasts: BTreeMap::new(),
            provable_errors: BTreeMap::new(),
            unprovable_errors: BTreeMap::new(),
        }
    }

    pub fn add_payload(&mut self, from: Id, payload: Payload) {
        self.payloads.insert(from, payload);
    }

    /// Records the raw echo broadcast received from `from`, so that an
    /// [`EchoRound`](super::EchoRound) can later be built bundling every
    /// sender's broadcast for cross-checking.
    pub fn add_echo_broadcast(&mut self, from: Id, echo_broadcast: EchoBroadcast) {
        if !echo_broadcast.is_none() {
            self.echo_broadcasts.insert(from, echo_broadcast);
        }
    }

    pub fn echo_broadcasts(&self) -> &BTreeMap<Id, EchoBroadcast> {
        &self.echo_broadcasts
    }

    pub fn add_artifact(&mut self, to: Id, artifact: Artifact) {
        self.artifacts.insert(to, artifact);
    }

    pub fn add_provable_error(&mut self, from: Id, error: P::ProtocolError) {
        self.provable_errors.insert(from, error);
    }

    pub fn add_unprovable_error(&mut self, from: Id, error: RemoteError) {
        self.unprovable_errors.insert(from, error);
    }

    /// Senders who are out of the running for this round: those who reported
    /// a protocol or unprovable error.
    pub fn excluded(&self) -> BTreeSet<Id> {
        self.provable_errors.keys().chain(self.unprovable_errors.keys()).cloned().collect()
    }

    /// Expected senders who have neither responded nor been excluded yet —
    /// the parties a caller declaring "no more messages are coming" (e.g.
    /// after its own transport-level timeout) would hold responsible for the
    /// round never reaching quorum.
    pub fn missing(&self) -> BTreeSet<Id> {
        let responded: BTreeSet<Id> = self.payloads.keys().cloned().collect();
        let excluded = self.excluded();
        self.expecting_messages_from
            .ids()
            .iter()
            .filter(|id| !responded.contains(*id) && !excluded.contains(*id))
            .cloned()
            .collect()
    }

    pub fn can_finalize(&self) -> CanFinalize {
        let responded: BTreeSet<Id> = self.payloads.keys().cloned().collect();
        if self.expecting_messages_from.is_quorum(&responded) {
            CanFinalize::Yes
        } else if self.expecting_messages_from.is_quorum_possible(&self.excluded()) {
            CanFinalize::NotYet
        } else {
            CanFinalize::Never
        }
    }

    pub fn provable_errors(&self) -> &BTreeMap<Id, P::ProtocolError> {
        &self.provable_errors
    }

    pub fn unprovable_errors(&self) -> &BTreeMap<Id, RemoteError> {
        &self.unprovable_errors
    }

    /// Consumes the accumulator, returning the payloads/artifacts collected
    /// so far, restricted to senders who are still expected (not banned in a
    /// later pass).
    pub fn into_payloads_and_artifacts(self) -> (BTreeMap<Id, Payload>, BTreeMap<Id, Artifact>) {
        (self.payloads, self.artifacts)
    }

    pub fn has_payload_from(&self, id: &Id) -> bool {
        self.payloads.contains_key(id)
    }
}
