use alloc::{boxed::Box, collections::BTreeSet, vec::Vec};

use rand_core::CryptoRngCore;

use super::{
    accumulator::{CanFinalize, RoundAccumulator},
    message::{Message, SessionId},
    transcript::Transcript,
};
use crate::{
    error::LocalError,
    party::PartyId,
    protocol::{Artifact, EntryPoint, FinalizeOutcome, Protocol, Round},
};

/// What to do with a freshly-arrived message, decided before it is ever
/// handed to the current round's `receive_message`.
///
/// Ported from `manul::session::session::PreprocessOutcome`.
#[derive(Debug)]
pub enum PreprocessOutcome<Id> {
    /// The message belongs to the round in progress; process it now.
    ProcessNow(Message<Id>),
    /// The message is for the round after this one; keep it for later.
    CacheForNextRound,
    /// The message is a duplicate or mis-addressed; drop it silently.
    Ignore,
    /// The message claims a round more than one ahead of the current one, or
    /// a protocol id that does not match the one this session is running;
    /// the sender is at fault and the session cannot make progress on trust.
    Reject(Id, crate::error::ErrorKind, alloc::string::String),
}

/// Drives a single [`Round`] through its lifecycle: collecting outbound
/// messages, verifying and storing inbound ones, and attempting to
/// finalize once a quorum of payloads has arrived.
///
/// Ported from `manul::session::session::Session`, with the signed-message
/// bookkeeping dropped (see `SPEC_FULL.md` §3) and the echo-round insertion
/// moved up into [`crate::handler::Handler`], which owns the multi-round
/// loop this type does not know about.
pub struct Session<Id: PartyId, P: Protocol<Id>> {
    session_id: SessionId,
    own_id: Id,
    current_round: Box<dyn Round<Id, Protocol = P>>,
    own_artifacts: alloc::collections::BTreeMap<Id, Artifact>,
    accumulator: RoundAccumulator<Id, P>,
    transcript: Transcript<Id>,
    cached: Vec<Message<Id>>,
    processed: BTreeSet<(SessionId, crate::protocol::RoundId, Id, Option<Id>)>,
    outbound_sent: bool,
    own_echo_broadcast: Option<crate::protocol::EchoBroadcast>,
}

impl<Id: PartyId, P: Protocol<Id>> Session<Id, P> {
    /// Starts a new session by constructing the entry round.
    pub fn new(
        rng: &mut dyn CryptoRngCore,
        entry_point: impl EntryPoint<Id, Protocol = P>,
        shared_randomness: &[u8],
        session_id: SessionId,
        own_id: Id,
    ) -> Result<Self, LocalError> {
        let round = entry_point.make_round(rng, shared_randomness, &own_id)?;
        let expecting = round.communication_info().main_round.expecting_messages_from;
        Ok(Self {
            session_id,
            own_id,
            current_round: round,
            own_artifacts: alloc::collections::BTreeMap::new(),
            accumulator: RoundAccumulator::new(expecting),
            transcript: Transcript::new(),
            cached: Vec::new(),
            processed: BTreeSet::new(),
            outbound_sent: false,
            own_echo_broadcast: None,
        })
    }

    /// Continues a session with an already-built round: used by
    /// [`crate::handler::Handler`] to advance past a finished round (with or
    /// without an interposed [`super::EchoRound`]).
    pub fn from_round(
        round: Box<dyn Round<Id, Protocol = P>>,
        session_id: SessionId,
        own_id: Id,
        transcript: Transcript<Id>,
    ) -> Self {
        let expecting = round.communication_info().main_round.expecting_messages_from;
        Self {
            session_id,
            own_id,
            current_round: round,
            own_artifacts: alloc::collections::BTreeMap::new(),
            accumulator: RoundAccumulator::new(expecting),
            transcript,
            cached: Vec::new(),
            processed: BTreeSet::new(),
            outbound_sent: false,
            own_echo_broadcast: None,
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn round_id(&self) -> crate::protocol::RoundId {
        self.current_round.transition_info().id()
    }

    pub fn own_id(&self) -> &Id {
        &self.own_id
    }

    /// Builds this round's outbound messages (echo/normal broadcast plus one
    /// direct message per destination), recording the artifacts this party
    /// produced along the way. Idempotent: calling it twice returns the same
    /// messages without re-sampling randomness for the broadcast parts.
    pub fn make_outbound(&mut self, rng: &mut dyn CryptoRngCore) -> Result<Vec<Message<Id>>, LocalError> {
        let info = self.current_round.communication_info();
        let echo_broadcast = self.current_round.make_echo_broadcast(rng)?;
        let normal_broadcast = self.current_round.make_normal_broadcast(rng)?;
        self.own_echo_broadcast = Some(echo_broadcast.clone());
        let mut messages = Vec::with_capacity(info.main_round.message_destinations.len());
        for destination in &info.main_round.message_destinations {
            let (direct_message, artifact) = self.current_round.make_direct_message(rng, destination)?;
            if let Some(artifact) = artifact {
                self.own_artifacts.insert(destination.clone(), artifact);
            }
            messages.push(Message {
                protocol_id: alloc::string::String::from(P::PROTOCOL_ID),
                session_id: self.session_id.clone(),
                round_id: self.round_id(),
                from: self.own_id.clone(),
                to: Some(destination.clone()),
                echo_broadcast: echo_broadcast.clone(),
                normal_broadcast: normal_broadcast.clone(),
                direct_message,
            });
        }
        self.outbound_sent = true;
        Ok(messages)
    }

    pub fn outbound_sent(&self) -> bool {
        self.outbound_sent
    }

    /// Decides what to do with an inbound message before touching the
    /// current round: cache it if it is one round ahead, drop it if it is
    /// stale or a repeat, or hand it back for immediate processing.
    pub fn preprocess_message(&mut self, message: Message<Id>) -> PreprocessOutcome<Id> {
        if message.session_id != self.session_id {
            return PreprocessOutcome::Ignore;
        }
        if message.protocol_id != P::PROTOCOL_ID {
            return PreprocessOutcome::Reject(
                message.from,
                crate::error::ErrorKind::MessageMalformed,
                alloc::format!(
                    "message claims protocol {:?}, this session is running {:?}",
                    message.protocol_id,
                    P::PROTOCOL_ID
                ),
            );
        }
        let key = message.dedup_key();
        if self.processed.contains(&key) {
            return PreprocessOutcome::Ignore;
        }
        let current = self.round_id();
        if message.round_id == current {
            self.processed.insert(key);
            PreprocessOutcome::ProcessNow(message)
        } else if message.round_id > current {
            // A sender can legitimately be one step ahead of us in exactly two ways:
            // they already see the echo round that follows our current (non-echo)
            // round, or they have moved on to the plain round that follows whichever
            // round we are in now. Anything past that is not "one round ahead" and
            // the sender is at fault.
            let is_one_round_ahead = if current.is_echo() {
                message.round_id.round_num() == current.round_num() + 1 && !message.round_id.is_echo()
            } else {
                (message.round_id.round_num() == current.round_num() && message.round_id.is_echo())
                    || (message.round_id.round_num() == current.round_num() + 1 && !message.round_id.is_echo())
            };
            if is_one_round_ahead {
                self.cached.push(message);
                PreprocessOutcome::CacheForNextRound
            } else {
                PreprocessOutcome::Reject(
                    message.from,
                    crate::error::ErrorKind::MessageMalformed,
                    alloc::format!(
                        "message for {:?} is more than one round ahead of the current {:?}",
                        message.round_id,
                        current
                    ),
                )
            }
        } else {
            PreprocessOutcome::Ignore
        }
    }

    /// Hands a same-round message to the current round's `receive_message`,
    /// storing the resulting payload or recording (and banning, where
    /// appropriate) the sender on failure.
    pub fn process_message(&mut self, rng: &mut dyn CryptoRngCore, message: Message<Id>) {
        let from = message.from.clone();
        if self.transcript.is_banned(&from) {
            self.transcript.record_rejected(self.round_id(), from, "sender already banned");
            return;
        }
        let round_id = self.round_id();
        self.accumulator.add_echo_broadcast(from.clone(), message.echo_broadcast.clone());
        let result = self.current_round.receive_message(
            rng,
            &from,
            message.echo_broadcast,
            message.normal_broadcast,
            message.direct_message,
        );
        match result {
            Ok(payload) => {
                self.accumulator.add_payload(from.clone(), payload);
                self.transcript.record_accepted(round_id, from);
            }
            Err(error) => {
                use crate::protocol::ReceiveErrorKindView;
                let description = match error.into_view() {
                    ReceiveErrorKindView::Local(message) => alloc::format!("{message}"),
                    ReceiveErrorKindView::Malformed(message) => message,
                    ReceiveErrorKindView::Protocol(protocol_error) => {
                        self.transcript.ban(from.clone(), crate::error::ErrorKind::VerificationFailed);
                        let description = protocol_error.description();
                        self.accumulator.add_provable_error(from.clone(), protocol_error);
                        description
                    }
                    ReceiveErrorKindView::Unprovable(remote) => {
                        self.transcript.ban(from.clone(), remote.kind());
                        let description = alloc::format!("{remote}");
                        self.accumulator.add_unprovable_error(from.clone(), remote);
                        description
                    }
                };
                self.transcript.record_rejected(round_id, from, description);
            }
        }
    }

    pub fn can_finalize(&self) -> CanFinalize {
        self.accumulator.can_finalize()
    }

    /// Expected senders for the current round who have neither sent a
    /// message nor been banned yet. Meant for a caller who has given up
    /// waiting (e.g. a transport-level timeout) and wants to know who to
    /// blame for the round stalling.
    pub fn missing_parties(&self) -> BTreeSet<Id> {
        self.accumulator.missing()
    }

    pub fn communication_info(&self) -> crate::protocol::CommunicationInfo<Id> {
        self.current_round.communication_info()
    }

    /// The echo-broadcast bundle seen by this party this round: every
    /// sender's broadcast it received, plus its own. Used by
    /// [`crate::handler::Handler`] to build the automatic [`super::EchoRound`]
    /// when `communication_info().echo_round` asked for one.
    pub fn echo_broadcasts_bundle(&self) -> alloc::collections::BTreeMap<Id, crate::protocol::EchoBroadcast> {
        let mut bundle = self.accumulator.echo_broadcasts().clone();
        if let Some(own) = &self.own_echo_broadcast {
            if !own.is_none() {
                bundle.insert(self.own_id.clone(), own.clone());
            }
        }
        bundle
    }

    pub fn transcript(&self) -> &Transcript<Id> {
        &self.transcript
    }

    /// Pulls cached messages for the round that is about to start; the
    /// caller re-feeds these through `preprocess_message`/`process_message`
    /// once the session has advanced.
    pub fn take_cached(&mut self) -> Vec<Message<Id>> {
        core::mem::take(&mut self.cached)
    }

    /// Consumes the session, finalizing the current round. Returns the
    /// transcript accumulated so far alongside the outcome, so a caller
    /// advancing to the next round can carry ban state and transcript
    /// history forward via [`Self::from_round`].
    pub fn finalize(
        self,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<(FinalizeOutcome<Id, P>, Transcript<Id>), LocalError> {
        let (payloads, _received_artifacts) = self.accumulator.into_payloads_and_artifacts();
        let outcome = self.current_round.finalize(rng, payloads, self.own_artifacts)?;
        Ok((outcome, self.transcript))
    }
}
