use alloc::{boxed::Box, collections::BTreeMap, format};

use rand_core::CryptoRngCore;

use crate::{
    error::LocalError,
    party::PartyId,
    protocol::{
        Artifact, CommunicationInfo, DirectMessage, EchoBroadcast, EchoRoundCommunicationInfo, FinalizeOutcome,
        NormalBroadcast, Payload, Protocol, ReceiveError, Round, RoundCommunicationInfo, TransitionInfo,
    },
};

/// The automatically-inserted round that follows a broadcast round whose
/// [`CommunicationInfo::echo_round`] requests one: it re-broadcasts every
/// party's [`EchoBroadcast`] from the previous round to every other party,
/// so each party can confirm everyone received the same bytes from every
/// sender before the protocol moves on.
///
/// Ported from `manul::session::session::Session`'s `echo_round_needed`
/// handling; here it is its own [`Round`] impl rather than inlined into the
/// session driver, matching spec §4.1's "broadcast reliability checks" as a
/// first-class engine feature rather than a per-protocol responsibility.
pub struct EchoRound<Id: PartyId, P: Protocol<Id>> {
    transition_info: TransitionInfo,
    communication_info: RoundCommunicationInfo<Id>,
    own_id: Id,
    received_broadcasts: BTreeMap<Id, EchoBroadcast>,
    next_round: Box<dyn Round<Id, Protocol = P>>,
}

impl<Id: PartyId, P: Protocol<Id>> core::fmt::Debug for EchoRound<Id, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EchoRound")
            .field("transition_info", &self.transition_info)
            .field("communication_info", &self.communication_info)
            .field("own_id", &self.own_id)
            .field("received_broadcasts", &self.received_broadcasts)
            .finish_non_exhaustive()
    }
}

impl<Id: PartyId, P: Protocol<Id>> EchoRound<Id, P> {
    /// `echo_round_id` is the finished main round's own id with its echo
    /// flag set (`finished_round_id.echo()`); `main_round_info` is that same
    /// round's communication pattern (the echo round talks to the same
    /// destinations). `received_broadcasts` is what the main round collected
    /// from each sender, including this party's own broadcast. `next_round`
    /// is the round to run once every destination confirms they saw the
    /// same bundle.
    pub fn new(
        echo_round_id: crate::protocol::RoundId,
        own_id: Id,
        main_round_info: RoundCommunicationInfo<Id>,
        received_broadcasts: BTreeMap<Id, EchoBroadcast>,
        next_round: Box<dyn Round<Id, Protocol = P>>,
    ) -> Self {
        let next_id = next_round.transition_info().id();
        let transition_info = TransitionInfo::new(echo_round_id, [next_id].into_iter().collect());
        Self {
            transition_info,
            communication_info: main_round_info,
            own_id,
            received_broadcasts,
            next_round,
        }
    }
}

impl<Id: PartyId, P: Protocol<Id>> Round<Id> for EchoRound<Id, P> {
    type Protocol = P;

    fn transition_info(&self) -> TransitionInfo {
        self.transition_info.clone()
    }

    fn communication_info(&self) -> CommunicationInfo<Id> {
        CommunicationInfo {
            main_round: RoundCommunicationInfo::all_to_all(&self.communication_info.message_destinations),
            echo_round: EchoRoundCommunicationInfo::None,
        }
    }

    fn make_normal_broadcast(&self, _rng: &mut dyn CryptoRngCore) -> Result<NormalBroadcast, LocalError> {
        NormalBroadcast::new(&self.received_broadcasts)
    }

    fn receive_message(
        &self,
        _rng: &mut dyn CryptoRngCore,
        from: &Id,
        _echo_broadcast: EchoBroadcast,
        normal_broadcast: NormalBroadcast,
        _direct_message: DirectMessage,
    ) -> Result<Payload, ReceiveError<Id, Self::Protocol>> {
        let their_view: BTreeMap<Id, EchoBroadcast> = normal_broadcast
            .deserialize()
            .map_err(|error| ReceiveError::malformed(format!("echo bundle did not deserialize: {error}")))?;

        for (id, ours) in &self.received_broadcasts {
            if id == &self.own_id {
                continue;
            }
            match their_view.get(id) {
                Some(theirs) if theirs == ours => {}
                Some(_) => {
                    return Err(ReceiveError::unprovable(format!(
                        "{from:?} saw a different broadcast from {id:?} than we did"
                    )))
                }
                None => {
                    return Err(ReceiveError::unprovable(format!(
                        "{from:?} did not report a broadcast from {id:?}"
                    )))
                }
            }
        }

        Ok(Payload::empty())
    }

    fn finalize(
        self: Box<Self>,
        _rng: &mut dyn CryptoRngCore,
        _payloads: BTreeMap<Id, Payload>,
        _artifacts: BTreeMap<Id, Artifact>,
    ) -> Result<FinalizeOutcome<Id, Self::Protocol>, LocalError> {
        Ok(FinalizeOutcome::AnotherRound(self.next_round))
    }
}
