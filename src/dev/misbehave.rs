/*!
A combinator that intercepts one round's outbound messages so a test can
make a single party send a corrupted share, commitment, or signature
fragment, then check the round engine attributes the fault to the right
culprit.

Ported from `manul::combinators::misbehave`, trimmed to this crate's simpler
object-safe `Round` (no serializer/deserializer indirection: messages here
are already the concrete [`DirectMessage`]/[`EchoBroadcast`]/
[`NormalBroadcast`] wire types).
*/

use alloc::{boxed::Box, collections::BTreeMap, vec::Vec};
use core::fmt::Debug;

use rand_core::CryptoRngCore;

use crate::{
    error::{Abort, LocalError},
    party::PartyId,
    protocol::{
        Artifact, CommunicationInfo, DirectMessage, EchoBroadcast, EntryPoint, FinalizeOutcome, NormalBroadcast,
        Payload, ReceiveError, Round,
    },
};

use super::run_sync::{run_sync, ExecutionResult};

/// Marker bound for a misbehavior's parameter type (usually a field-less enum
/// naming which message part to corrupt).
pub trait Behavior: 'static + Debug + Send + Sync {}

impl<T: 'static + Debug + Send + Sync> Behavior for T {}

/// Defines how to corrupt the messages of some wrapped protocol's rounds.
///
/// Override only the `modify_*` method the test needs; the rest pass
/// messages through unchanged.
pub trait Misbehaving<Id, B>: 'static
where
    Id: PartyId,
    B: Behavior,
{
    /// The entry point of the wrapped, unmodified protocol.
    type EntryPoint: EntryPoint<Id>;

    #[allow(unused_variables, clippy::too_many_arguments)]
    fn modify_direct_message(
        rng: &mut dyn CryptoRngCore,
        round: &dyn Round<Id, Protocol = <Self::EntryPoint as EntryPoint<Id>>::Protocol>,
        behavior: &B,
        destination: &Id,
        direct_message: DirectMessage,
        artifact: Option<Artifact>,
    ) -> Result<(DirectMessage, Option<Artifact>), LocalError> {
        Ok((direct_message, artifact))
    }

    #[allow(unused_variables)]
    fn modify_echo_broadcast(
        rng: &mut dyn CryptoRngCore,
        round: &dyn Round<Id, Protocol = <Self::EntryPoint as EntryPoint<Id>>::Protocol>,
        behavior: &B,
        echo_broadcast: EchoBroadcast,
    ) -> Result<EchoBroadcast, LocalError> {
        Ok(echo_broadcast)
    }

    #[allow(unused_variables)]
    fn modify_normal_broadcast(
        rng: &mut dyn CryptoRngCore,
        round: &dyn Round<Id, Protocol = <Self::EntryPoint as EntryPoint<Id>>::Protocol>,
        behavior: &B,
        normal_broadcast: NormalBroadcast,
    ) -> Result<NormalBroadcast, LocalError> {
        Ok(normal_broadcast)
    }
}

/// Entry point for a protocol with its first round (by construction order)
/// possibly wrapped in a [`Misbehaving`] behavior.
pub struct MisbehavingEntryPoint<Id, B, M>
where
    Id: PartyId,
    B: Behavior,
    M: Misbehaving<Id, B>,
{
    entry_point: M::EntryPoint,
    behavior: Option<B>,
}

impl<Id, B, M> MisbehavingEntryPoint<Id, B, M>
where
    Id: PartyId,
    B: Behavior,
    M: Misbehaving<Id, B>,
{
    /// Wraps `entry_point`; `behavior` is `Some` for the one party that
    /// should misbehave, `None` for every lawful party.
    pub fn new(entry_point: M::EntryPoint, behavior: Option<B>) -> Self {
        Self { entry_point, behavior }
    }
}

impl<Id, B, M> EntryPoint<Id> for MisbehavingEntryPoint<Id, B, M>
where
    Id: PartyId,
    B: Behavior,
    M: Misbehaving<Id, B>,
{
    type Protocol = <M::EntryPoint as EntryPoint<Id>>::Protocol;

    fn make_round(
        self,
        rng: &mut dyn CryptoRngCore,
        shared_randomness: &[u8],
        id: &Id,
    ) -> Result<Box<dyn Round<Id, Protocol = Self::Protocol>>, LocalError> {
        let round = self.entry_point.make_round(rng, shared_randomness, id)?;
        Ok(Box::new(MisbehavingRound::<Id, B, M> {
            round,
            behavior: self.behavior,
        }))
    }
}

struct MisbehavingRound<Id, B, M>
where
    Id: PartyId,
    B: Behavior,
    M: Misbehaving<Id, B>,
{
    round: Box<dyn Round<Id, Protocol = <M::EntryPoint as EntryPoint<Id>>::Protocol>>,
    behavior: Option<B>,
}

impl<Id, B, M> Debug for MisbehavingRound<Id, B, M>
where
    Id: PartyId,
    B: Behavior,
    M: Misbehaving<Id, B>,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MisbehavingRound")
            .field("round", &self.round)
            .field("behavior", &self.behavior)
            .finish()
    }
}

impl<Id, B, M> Round<Id> for MisbehavingRound<Id, B, M>
where
    Id: PartyId,
    B: Behavior,
    M: Misbehaving<Id, B>,
{
    type Protocol = <M::EntryPoint as EntryPoint<Id>>::Protocol;

    fn transition_info(&self) -> crate::protocol::TransitionInfo {
        self.round.transition_info()
    }

    fn communication_info(&self) -> CommunicationInfo<Id> {
        self.round.communication_info()
    }

    fn make_direct_message(
        &self,
        rng: &mut dyn CryptoRngCore,
        destination: &Id,
    ) -> Result<(DirectMessage, Option<Artifact>), LocalError> {
        let (direct_message, artifact) = self.round.make_direct_message(rng, destination)?;
        match self.behavior.as_ref() {
            Some(behavior) => M::modify_direct_message(rng, self.round.as_ref(), behavior, destination, direct_message, artifact),
            None => Ok((direct_message, artifact)),
        }
    }

    fn make_echo_broadcast(&self, rng: &mut dyn CryptoRngCore) -> Result<EchoBroadcast, LocalError> {
        let echo_broadcast = self.round.make_echo_broadcast(rng)?;
        match self.behavior.as_ref() {
            Some(behavior) => M::modify_echo_broadcast(rng, self.round.as_ref(), behavior, echo_broadcast),
            None => Ok(echo_broadcast),
        }
    }

    fn make_normal_broadcast(&self, rng: &mut dyn CryptoRngCore) -> Result<NormalBroadcast, LocalError> {
        let normal_broadcast = self.round.make_normal_broadcast(rng)?;
        match self.behavior.as_ref() {
            Some(behavior) => M::modify_normal_broadcast(rng, self.round.as_ref(), behavior, normal_broadcast),
            None => Ok(normal_broadcast),
        }
    }

    fn receive_message(
        &self,
        rng: &mut dyn CryptoRngCore,
        from: &Id,
        echo_broadcast: EchoBroadcast,
        normal_broadcast: NormalBroadcast,
        direct_message: DirectMessage,
    ) -> Result<Payload, ReceiveError<Id, Self::Protocol>> {
        self.round.receive_message(rng, from, echo_broadcast, normal_broadcast, direct_message)
    }

    fn finalize(
        self: Box<Self>,
        rng: &mut dyn CryptoRngCore,
        payloads: BTreeMap<Id, Payload>,
        artifacts: BTreeMap<Id, Artifact>,
    ) -> Result<FinalizeOutcome<Id, Self::Protocol>, LocalError> {
        let this = *self;
        let outcome = this.round.finalize(rng, payloads, artifacts)?;
        Ok(match outcome {
            FinalizeOutcome::Result(result) => FinalizeOutcome::Result(result),
            FinalizeOutcome::AnotherRound(next) => FinalizeOutcome::AnotherRound(Box::new(MisbehavingRound {
                round: next,
                behavior: this.behavior,
            })),
        })
    }
}

/// Runs a session where the first party (in `Id` order) uses `behavior` and
/// every other party runs the unmodified protocol.
#[allow(clippy::type_complexity)]
pub fn run_with_one_malicious_party<Id, B, M>(
    rng: &mut dyn CryptoRngCore,
    entry_points: Vec<(Id, M::EntryPoint)>,
    behavior: &B,
) -> Result<
    (Id, ExecutionResult<Id, <M::EntryPoint as EntryPoint<Id>>::Protocol>),
    LocalError,
>
where
    Id: PartyId,
    B: Behavior + Clone,
    M: Misbehaving<Id, B>,
{
    let misbehaving_id = entry_points
        .iter()
        .map(|(id, _)| id.clone())
        .min()
        .ok_or_else(|| LocalError::new("entry point list must not be empty"))?;

    let wrapped: Vec<(Id, MisbehavingEntryPoint<Id, B, M>)> = entry_points
        .into_iter()
        .map(|(id, entry_point)| {
            let behavior = if id == misbehaving_id { Some(behavior.clone()) } else { None };
            (id, MisbehavingEntryPoint::new(entry_point, behavior))
        })
        .collect();

    let result = run_sync(rng, wrapped)?;
    Ok((misbehaving_id, result))
}

/// Checks that every lawful party either finished successfully with
/// `misbehaving_id` excluded, or aborted naming `misbehaving_id` as a
/// culprit — the minimal "culprit identification" property a
/// single-malicious-party scenario must satisfy.
pub fn assert_culprit_identified<Id, P>(
    execution_result: &ExecutionResult<Id, P>,
    misbehaving_id: &Id,
) -> Result<(), LocalError>
where
    Id: PartyId,
    P: crate::protocol::Protocol<Id>,
{
    for (id, outcome) in &execution_result.results {
        if id == misbehaving_id {
            continue;
        }
        if let Err(abort) = outcome {
            if !abort.culprits().contains(misbehaving_id) {
                return Err(LocalError::new(alloc::format!(
                    "{id:?} aborted without naming {misbehaving_id:?} as a culprit: {abort}"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorKind,
        families::frost::{Frost, KeygenEntryPoint},
        group::Secp256k1,
    };
    use alloc::collections::BTreeSet;

    #[derive(Debug, Clone, Copy)]
    struct CorruptShare;

    struct CorruptShareMisbehavior;

    impl Misbehaving<u32, CorruptShare> for CorruptShareMisbehavior {
        type EntryPoint = KeygenEntryPoint<u32, Secp256k1>;

        fn modify_direct_message(
            _rng: &mut dyn CryptoRngCore,
            _round: &dyn Round<u32, Protocol = <Self::EntryPoint as EntryPoint<u32>>::Protocol>,
            _behavior: &CorruptShare,
            _destination: &u32,
            direct_message: DirectMessage,
            artifact: Option<Artifact>,
        ) -> Result<(DirectMessage, Option<Artifact>), LocalError> {
            if direct_message.is_none() {
                Ok((direct_message, artifact))
            } else {
                Ok((DirectMessage::new(&[0xffu8; 8])?, artifact))
            }
        }
    }

    #[test]
    fn corrupted_share_is_attributed_to_the_sender() {
        let _ = Frost;
        let rng = &mut rand_core::OsRng;
        let parties: BTreeSet<u32> = [1u32, 2, 3].into_iter().collect();
        let entry_points: Vec<(u32, KeygenEntryPoint<u32, Secp256k1>)> = parties
            .iter()
            .map(|id| (*id, KeygenEntryPoint::new(*id, parties.clone(), 2)))
            .collect();

        let (misbehaving_id, result) =
            run_with_one_malicious_party::<u32, CorruptShare, CorruptShareMisbehavior>(rng, entry_points, &CorruptShare)
                .unwrap();
        assert_eq!(misbehaving_id, 1);

        assert_culprit_identified(&result, &misbehaving_id).unwrap();

        for (id, outcome) in &result.results {
            if *id == misbehaving_id {
                continue;
            }
            let abort = outcome.as_ref().expect_err("lawful parties must reject a corrupted share");
            assert_eq!(*abort.kind(), ErrorKind::VerificationFailed);
        }
    }
}
