/*!
The blocking driver callers actually use: feed it inbound messages, pull
outbound ones, and read off the terminal result or abort once the protocol
is done.

`manul` leaves this loop to the caller, exposing only `Session` and letting
an async runtime (or a test harness) drive the round-to-round bookkeeping
itself. This crate's spec calls for a single decorator type that owns that
loop directly — so `Handler` wraps a [`Session`](crate::session::Session),
advancing it round by round (inserting an automatic
[`EchoRound`](crate::session::EchoRound) where a round's
[`CommunicationInfo::echo_round`](crate::protocol::CommunicationInfo) asked
for one) until it reaches a terminal [`Protocol::Result`] or an
[`Abort`].
*/

use alloc::{boxed::Box, vec::Vec};

use rand_core::CryptoRngCore;

use crate::{
    error::{Abort, ErrorKind, LocalError},
    party::PartyId,
    protocol::{EntryPoint, EchoRoundCommunicationInfo, FinalizeOutcome, Protocol, Round},
    session::{CanFinalize, EchoRound, Message, PreprocessOutcome, Session, SessionId, Transcript},
};

/// Drives one protocol run (keygen, sign, reshare, ...) from its
/// [`EntryPoint`] to completion.
pub struct Handler<Id: PartyId, P: Protocol<Id>> {
    session: Option<Session<Id, P>>,
    outbound: Vec<Message<Id>>,
    outcome: Option<Result<P::Result, Abort<Id>>>,
}

impl<Id: PartyId, P: Protocol<Id>> Handler<Id, P> {
    /// Starts the protocol: builds the entry round and queues its outbound
    /// messages.
    pub fn new(
        rng: &mut dyn CryptoRngCore,
        entry_point: impl EntryPoint<Id, Protocol = P>,
        shared_randomness: &[u8],
        session_id: SessionId,
        own_id: Id,
    ) -> Result<Self, LocalError> {
        let mut session = Session::new(rng, entry_point, shared_randomness, session_id, own_id)?;
        let outbound = session.make_outbound(rng)?;
        Ok(Self {
            session: Some(session),
            outbound,
            outcome: None,
        })
    }

    /// Whether the protocol has reached a terminal result or an abort.
    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Feeds one inbound message to the running session, advancing through
    /// as many rounds (including any echo rounds) as the new message makes
    /// possible.
    pub fn handle_inbound(&mut self, rng: &mut dyn CryptoRngCore, message: Message<Id>) -> Result<(), LocalError> {
        if self.outcome.is_some() {
            return Ok(());
        }
        let session = self
            .session
            .as_mut()
            .expect("session is Some whenever outcome is None");
        match session.preprocess_message(message) {
            PreprocessOutcome::ProcessNow(message) => session.process_message(rng, message),
            PreprocessOutcome::Reject(from, kind, description) => {
                self.session = None;
                self.outcome = Some(Err(Abort::with_culprit(kind, from, description)));
                return Ok(());
            }
            PreprocessOutcome::CacheForNextRound | PreprocessOutcome::Ignore => {}
        }
        self.try_advance(rng)
    }

    /// Drains and returns the outbound messages queued since the last call.
    pub fn next_outbound(&mut self) -> Vec<Message<Id>> {
        core::mem::take(&mut self.outbound)
    }

    /// Tells the handler that no further inbound messages will arrive for
    /// the round in progress (the caller's transport gave up waiting).
    ///
    /// If the round had already reached quorum or already aborted this is a
    /// no-op. Otherwise every expected sender who neither responded nor was
    /// banned is blamed for the stall and the session aborts with
    /// [`ErrorKind::Missing`].
    pub fn no_more_inbound(&mut self) -> Result<(), LocalError> {
        if self.outcome.is_some() {
            return Ok(());
        }
        let session = self
            .session
            .as_ref()
            .expect("session is Some whenever outcome is None");
        if session.can_finalize() == CanFinalize::NotYet {
            let missing = session.missing_parties();
            if !missing.is_empty() {
                self.session = None;
                self.outcome = Some(Err(Abort::with_culprits(
                    ErrorKind::Missing,
                    missing,
                    "round finished without a message from a required party",
                )));
            }
        }
        Ok(())
    }

    /// Consumes the handler, returning the terminal outcome if the protocol
    /// has finished, or `None` if it is still running.
    pub fn result(self) -> Option<Result<P::Result, Abort<Id>>> {
        self.outcome
    }

    fn try_advance(&mut self, rng: &mut dyn CryptoRngCore) -> Result<(), LocalError> {
        loop {
            let can_finalize = match &self.session {
                Some(session) => session.can_finalize(),
                None => return Ok(()),
            };
            match can_finalize {
                CanFinalize::NotYet => return Ok(()),
                CanFinalize::Never => {
                    let session = self.session.take().expect("checked Some above");
                    let banned = session.transcript().banned();
                    // A round can only become unreachable by banning senders (a quorum
                    // that was reachable stays reachable while parties are merely slow
                    // or silent); every name in `culprits` was banned for a rejected
                    // message, so this is always a provable/unprovable fault, never a
                    // plain non-response. Pick whichever banned kind is most specific
                    // to surface to the caller; fall back to `VerificationFailed` if
                    // every culprit was banned for the generic reason.
                    let kind = banned
                        .values()
                        .find(|kind| **kind != ErrorKind::VerificationFailed)
                        .cloned()
                        .unwrap_or(ErrorKind::VerificationFailed);
                    let culprits = banned.keys().cloned().collect();
                    self.outcome = Some(Err(Abort::with_culprits(
                        kind,
                        culprits,
                        "quorum unreachable: banned senders made it impossible to reach the required threshold",
                    )));
                    return Ok(());
                }
                CanFinalize::Yes => self.advance_one_round(rng)?,
            }
        }
    }

    fn advance_one_round(&mut self, rng: &mut dyn CryptoRngCore) -> Result<(), LocalError> {
        let session = self.session.take().expect("checked Some by caller");
        let finished_round_id = session.round_id();
        let comm_info = session.communication_info();
        let echo_bundle = session.echo_broadcasts_bundle();
        let session_id = session.session_id().clone();
        let own_id = session.own_id().clone();
        let cached = {
            let mut session = session;
            let cached = session.take_cached();
            let (outcome, transcript) = session.finalize(rng)?;
            self.continue_from(outcome, transcript, finished_round_id, comm_info, echo_bundle, session_id, own_id, rng)?;
            cached
        };
        if let Some(session) = self.session.as_mut() {
            for message in cached {
                match session.preprocess_message(message) {
                    PreprocessOutcome::ProcessNow(message) => session.process_message(rng, message),
                    PreprocessOutcome::Reject(from, kind, description) => {
                        self.session = None;
                        self.outcome = Some(Err(Abort::with_culprit(kind, from, description)));
                        return Ok(());
                    }
                    PreprocessOutcome::CacheForNextRound | PreprocessOutcome::Ignore => {}
                }
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn continue_from(
        &mut self,
        outcome: FinalizeOutcome<Id, P>,
        transcript: Transcript<Id>,
        finished_round_id: crate::protocol::RoundId,
        comm_info: crate::protocol::CommunicationInfo<Id>,
        echo_bundle: alloc::collections::BTreeMap<Id, crate::protocol::EchoBroadcast>,
        session_id: SessionId,
        own_id: Id,
        rng: &mut dyn CryptoRngCore,
    ) -> Result<(), LocalError> {
        match outcome {
            FinalizeOutcome::Result(result) => {
                self.outcome = Some(Ok(result));
            }
            FinalizeOutcome::AnotherRound(next_round) => {
                let next_round: Box<dyn Round<Id, Protocol = P>> = match comm_info.echo_round {
                    EchoRoundCommunicationInfo::None => next_round,
                    EchoRoundCommunicationInfo::SameAsMainRound => Box::new(EchoRound::new(
                        finished_round_id.echo(),
                        own_id.clone(),
                        comm_info.main_round,
                        echo_bundle,
                        next_round,
                    )),
                    EchoRoundCommunicationInfo::Custom(custom_info) => Box::new(EchoRound::new(
                        finished_round_id.echo(),
                        own_id.clone(),
                        custom_info,
                        echo_bundle,
                        next_round,
                    )),
                };
                let mut next_session = Session::from_round(next_round, session_id, own_id, transcript);
                let mut outbound = next_session.make_outbound(rng)?;
                self.outbound.append(&mut outbound);
                self.session = Some(next_session);
            }
        }
        Ok(())
    }
}
