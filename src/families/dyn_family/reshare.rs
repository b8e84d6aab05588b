/*!
The three-round VSS re-sharing protocol: `OLD` hands a `t'`-of-`NEW` sharing
of the same secret to `NEW`, incrementing the generation and leaving the
group public key unchanged.

Grounded on the same Feldman VSS machinery as [`super::super::dkg`] — round 1
here plays the same commit-with-echo role DKG's round 1 plays, except an
`OLD` party's polynomial constant term is its *current* share rather than a
fresh secret, and a `NEW`-only party commits to the identity polynomial
instead (see [`crate::group::Polynomial::zero`]).
*/

use alloc::{
    boxed::Box,
    collections::{BTreeMap, BTreeSet},
    format,
    vec::Vec,
};

use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use crate::{
    config::DynConfig,
    error::LocalError,
    group::{CommitmentVector, Group, Polynomial},
    party::{id_scalar, PartyId},
    protocol::{
        Artifact, CommunicationInfo, DirectMessage, EchoBroadcast, EntryPoint, FinalizeOutcome, NoProtocolErrors,
        NormalBroadcast, Payload, Protocol, ReceiveError, Round, RoundCommunicationInfo, TransitionInfo,
    },
};

/// Builds the `(OLD, NEW, t')` triple from a starting [`DynConfig`] and a
/// target committee, and validates it per spec's edge-case policies before
/// any round runs.
pub struct ReshareEntryPoint<Id, G: Group> {
    pub config: DynConfig<Id, G>,
    pub new_parties: BTreeSet<Id>,
    pub new_threshold: usize,
}

#[derive(Debug)]
pub struct ReshareProtocol<Id, G>(core::marker::PhantomData<(Id, G)>);

impl<Id: PartyId, G: Group> Protocol<Id> for ReshareProtocol<Id, G> {
    /// `None` for a party in `OLD \ NEW`, which contributes its share and
    /// holds no new one; `Some` for every party in `NEW`.
    type Result = Option<DynConfig<Id, G>>;
    type ProtocolError = NoProtocolErrors;
    const PROTOCOL_ID: &'static str = "dyn/reshare";
}

impl<Id: PartyId, G: Group> EntryPoint<Id> for ReshareEntryPoint<Id, G> {
    type Protocol = ReshareProtocol<Id, G>;

    fn make_round(
        self,
        rng: &mut dyn CryptoRngCore,
        _shared_randomness: &[u8],
        id: &Id,
    ) -> Result<Box<dyn Round<Id, Protocol = Self::Protocol>>, LocalError> {
        let old: BTreeSet<Id> = self.config.core.public_shares.keys().cloned().collect();
        let new = self.new_parties;
        if self.new_threshold == 0 || self.new_threshold > new.len() {
            return Err(LocalError::new("new threshold must be in [1, |NEW|]"));
        }
        if !old.contains(id) && !new.contains(id) {
            return Err(LocalError::new("own id is neither in OLD nor in NEW"));
        }
        let all: BTreeSet<Id> = old.union(&new).cloned().collect();

        let polynomial = if old.contains(id) {
            Polynomial::<G>::sample(rng, self.new_threshold, self.config.core.private_share.as_ref().clone())
        } else {
            Polynomial::<G>::zero(self.new_threshold)
        };
        let mut chain_key_part = [0u8; 32];
        rng.fill_bytes(&mut chain_key_part);

        Ok(Box::new(ReshareRound1 {
            own_id: id.clone(),
            old,
            new,
            all,
            new_threshold: self.new_threshold,
            old_generation: self.config.core.generation,
            group_public_key: self.config.public_key,
            old_public_shares: self.config.core.public_shares,
            polynomial,
            chain_key_part,
        }))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(bound = "")]
struct Round1Bcast<G: Group> {
    commitment: CommitmentVector<G>,
    chain_key_part: [u8; 32],
}

#[derive(Debug)]
struct ReshareRound1<Id: PartyId, G: Group> {
    own_id: Id,
    old: BTreeSet<Id>,
    new: BTreeSet<Id>,
    all: BTreeSet<Id>,
    new_threshold: usize,
    old_generation: u64,
    group_public_key: G::Point,
    old_public_shares: BTreeMap<Id, G::Point>,
    polynomial: Polynomial<G>,
    chain_key_part: [u8; 32],
}

impl<Id: PartyId, G: Group> Round<Id> for ReshareRound1<Id, G> {
    type Protocol = ReshareProtocol<Id, G>;

    fn transition_info(&self) -> TransitionInfo {
        TransitionInfo::new(1u16.into(), [2u16.into()].into_iter().collect())
    }

    fn communication_info(&self) -> CommunicationInfo<Id> {
        CommunicationInfo::with_echo(RoundCommunicationInfo::all_to_all(&self.all))
    }

    fn make_echo_broadcast(&self, _rng: &mut dyn CryptoRngCore) -> Result<EchoBroadcast, LocalError> {
        EchoBroadcast::new(&Round1Bcast::<G> {
            commitment: self.polynomial.commit(),
            chain_key_part: self.chain_key_part,
        })
    }

    fn receive_message(
        &self,
        _rng: &mut dyn CryptoRngCore,
        from: &Id,
        echo_broadcast: EchoBroadcast,
        _normal_broadcast: NormalBroadcast,
        _direct_message: DirectMessage,
    ) -> Result<Payload, ReceiveError<Id, Self::Protocol>> {
        let bcast: Round1Bcast<G> = echo_broadcast
            .deserialize()
            .map_err(|error| ReceiveError::malformed(format!("reshare round 1: {error}")))?;
        if bcast.commitment.degree() != self.new_threshold {
            return Err(ReceiveError::malformed("commitment vector has the wrong degree"));
        }
        // Pins the new sharing to the same secret `a`: an OLD sender's
        // constant-term commitment must equal the public share the current
        // Config already records for it.
        if let Some(current_share) = self.old_public_shares.get(from) {
            if bcast.commitment.constant_term_commitment() != current_share {
                return Err(ReceiveError::unprovable(format!(
                    "{from:?}'s round 1 commitment does not match its current public share"
                )));
            }
        }
        Ok(Payload::new(bcast))
    }

    fn finalize(
        self: Box<Self>,
        _rng: &mut dyn CryptoRngCore,
        payloads: BTreeMap<Id, Payload>,
        _artifacts: BTreeMap<Id, Artifact>,
    ) -> Result<FinalizeOutcome<Id, Self::Protocol>, LocalError> {
        let mut commitments = BTreeMap::new();
        let mut chain_key_parts = BTreeMap::new();
        commitments.insert(
            self.own_id.clone(),
            Round1Bcast::<G> {
                commitment: self.polynomial.commit(),
                chain_key_part: self.chain_key_part,
            },
        );
        for (id, payload) in payloads {
            let bcast: Round1Bcast<G> = payload.downcast()?;
            commitments.insert(id, bcast);
        }
        chain_key_parts.extend(commitments.iter().map(|(id, b)| (id.clone(), b.chain_key_part)));
        let commitments: BTreeMap<Id, CommitmentVector<G>> =
            commitments.into_iter().map(|(id, b)| (id, b.commitment)).collect();

        Ok(FinalizeOutcome::AnotherRound(Box::new(ReshareRound2 {
            own_id: self.own_id,
            old: self.old,
            new: self.new,
            new_threshold: self.new_threshold,
            old_generation: self.old_generation,
            group_public_key: self.group_public_key,
            polynomial: self.polynomial,
            commitments,
            chain_key_parts,
        })))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(bound = "")]
struct DealMessage<G: Group> {
    share: G::Scalar,
}

#[derive(Debug)]
struct ReshareRound2<Id: PartyId, G: Group> {
    own_id: Id,
    old: BTreeSet<Id>,
    new: BTreeSet<Id>,
    new_threshold: usize,
    old_generation: u64,
    group_public_key: G::Point,
    polynomial: Polynomial<G>,
    commitments: BTreeMap<Id, CommitmentVector<G>>,
    chain_key_parts: BTreeMap<Id, [u8; 32]>,
}

impl<Id: PartyId, G: Group> Round<Id> for ReshareRound2<Id, G> {
    type Protocol = ReshareProtocol<Id, G>;

    fn transition_info(&self) -> TransitionInfo {
        TransitionInfo::new(2u16.into(), [3u16.into()].into_iter().collect())
    }

    fn communication_info(&self) -> CommunicationInfo<Id> {
        let destinations = if self.old.contains(&self.own_id) {
            self.new.clone()
        } else {
            BTreeSet::new()
        };
        let expecting = if self.new.contains(&self.own_id) {
            RoundCommunicationInfo::all_to_all(&self.old)
        } else {
            RoundCommunicationInfo::none()
        };
        CommunicationInfo::new(RoundCommunicationInfo {
            message_destinations: destinations,
            expecting_messages_from: expecting.expecting_messages_from,
        })
    }

    fn make_direct_message(
        &self,
        _rng: &mut dyn CryptoRngCore,
        destination: &Id,
    ) -> Result<(DirectMessage, Option<Artifact>), LocalError> {
        let x = id_scalar::<G, Id>(destination);
        let share = self.polynomial.eval(&x);
        Ok((DirectMessage::new(&DealMessage::<G> { share })?, None))
    }

    fn receive_message(
        &self,
        _rng: &mut dyn CryptoRngCore,
        from: &Id,
        _echo_broadcast: EchoBroadcast,
        _normal_broadcast: NormalBroadcast,
        direct_message: DirectMessage,
    ) -> Result<Payload, ReceiveError<Id, Self::Protocol>> {
        let deal: DealMessage<G> = direct_message
            .deserialize()
            .map_err(|error| ReceiveError::malformed(format!("reshare round 2 deal: {error}")))?;
        let commitment = self
            .commitments
            .get(from)
            .ok_or_else(|| ReceiveError::local("missing round 1 commitment for a round 2 sender"))?;
        let own_x = id_scalar::<G, Id>(&self.own_id);
        if !commitment.verify_share(&own_x, &deal.share) {
            return Err(ReceiveError::unprovable(format!("{from:?} dealt a share inconsistent with its commitment")));
        }
        Ok(Payload::new(deal.share))
    }

    fn finalize(
        self: Box<Self>,
        _rng: &mut dyn CryptoRngCore,
        payloads: BTreeMap<Id, Payload>,
        _artifacts: BTreeMap<Id, Artifact>,
    ) -> Result<FinalizeOutcome<Id, Self::Protocol>, LocalError> {
        if !self.new.contains(&self.own_id) {
            return Ok(FinalizeOutcome::Result(None));
        }

        let own_x = id_scalar::<G, Id>(&self.own_id);
        let mut new_share = if self.old.contains(&self.own_id) {
            self.polynomial.eval(&own_x)
        } else {
            G::zero_scalar()
        };
        for (_, payload) in payloads {
            let share: G::Scalar = payload.downcast()?;
            new_share = G::add_scalar(&new_share, &share);
        }

        Ok(FinalizeOutcome::AnotherRound(Box::new(ReshareRound3 {
            own_id: self.own_id,
            new: self.new,
            new_threshold: self.new_threshold,
            old_generation: self.old_generation,
            group_public_key: self.group_public_key,
            new_share,
            commitments: self.commitments,
            chain_key_parts: self.chain_key_parts,
        })))
    }
}

#[derive(Debug)]
struct ReshareRound3<Id: PartyId, G: Group> {
    own_id: Id,
    new: BTreeSet<Id>,
    new_threshold: usize,
    old_generation: u64,
    group_public_key: G::Point,
    new_share: G::Scalar,
    commitments: BTreeMap<Id, CommitmentVector<G>>,
    chain_key_parts: BTreeMap<Id, [u8; 32]>,
}

impl<Id: PartyId, G: Group> Round<Id> for ReshareRound3<Id, G> {
    type Protocol = ReshareProtocol<Id, G>;

    fn transition_info(&self) -> TransitionInfo {
        TransitionInfo::new_final(3u16.into())
    }

    fn communication_info(&self) -> CommunicationInfo<Id> {
        CommunicationInfo::new(RoundCommunicationInfo::none())
    }

    fn receive_message(
        &self,
        _rng: &mut dyn CryptoRngCore,
        _from: &Id,
        _echo_broadcast: EchoBroadcast,
        _normal_broadcast: NormalBroadcast,
        _direct_message: DirectMessage,
    ) -> Result<Payload, ReceiveError<Id, Self::Protocol>> {
        Err(ReceiveError::local("reshare round 3 expects no inbound messages"))
    }

    fn finalize(
        self: Box<Self>,
        _rng: &mut dyn CryptoRngCore,
        _payloads: BTreeMap<Id, Payload>,
        _artifacts: BTreeMap<Id, Artifact>,
    ) -> Result<FinalizeOutcome<Id, Self::Protocol>, LocalError> {
        let mut public_shares = BTreeMap::new();
        for j in &self.new {
            let x_j = id_scalar::<G, Id>(j);
            let mut point = G::identity_point();
            for commitment in self.commitments.values() {
                point = G::add_points(&point, &commitment.eval_in_exponent(&x_j));
            }
            public_shares.insert(j.clone(), point);
        }

        let mut rid_input = Vec::new();
        for (id, commitment) in &self.commitments {
            rid_input.extend_from_slice(&postcard::to_allocvec(id).unwrap_or_default());
            rid_input.extend_from_slice(&G::encode_point(commitment.constant_term_commitment()));
        }
        let rid_scalar = G::hash_to_scalar(b"reshare-rid", &rid_input);
        let rid = fixed_32_digest(&G::encode_scalar(&rid_scalar));

        let mut chain_key_input = Vec::new();
        for (id, part) in &self.chain_key_parts {
            chain_key_input.extend_from_slice(&postcard::to_allocvec(id).unwrap_or_default());
            chain_key_input.extend_from_slice(part);
        }
        let chain_key_scalar = G::hash_to_scalar(b"reshare-chain-key", &chain_key_input);
        let chain_key = fixed_32_digest(&G::encode_scalar(&chain_key_scalar));

        Ok(FinalizeOutcome::Result(Some(DynConfig {
            core: crate::config::ConfigCore {
                id: self.own_id,
                threshold: self.new_threshold,
                generation: self.old_generation + 1,
                private_share: zeroize::Zeroizing::new(self.new_share),
                public_shares,
                chain_key,
                rid,
                rollback_from: None,
            },
            public_key: self.group_public_key,
        })))
    }
}

fn fixed_32_digest(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (i, byte) in bytes.iter().enumerate() {
        out[i % 32] ^= byte;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorKind,
        group::Secp256k1,
        handler::Handler,
        session::{Message, SessionId},
    };

    fn sample_old_config(id: u32, secret: <Secp256k1 as Group>::Scalar) -> DynConfig<u32, Secp256k1> {
        let mut public_shares = BTreeMap::new();
        for old_id in [1u32, 2, 3] {
            public_shares.insert(old_id, Secp256k1::generator_mul(&secret));
        }
        DynConfig {
            core: crate::config::ConfigCore {
                id,
                threshold: 2,
                generation: 0,
                private_share: zeroize::Zeroizing::new(secret),
                public_shares,
                chain_key: [0u8; 32],
                rid: [0u8; 32],
                rollback_from: None,
            },
            public_key: Secp256k1::generator_mul(&secret),
        }
    }

    /// A party going silent after entering round 1 is not a round 1
    /// `receive_message` failure (nothing was ever received to reject); it
    /// can only be detected once a caller gives up waiting and declares "no
    /// more inbound", the way a real transport's timeout would.
    #[test]
    fn silent_old_party_is_named_missing_after_timeout() {
        let rng = &mut rand_core::OsRng;
        let secret = Secp256k1::random_scalar(rng);
        let old: BTreeSet<u32> = [1u32, 2, 3].into_iter().collect();
        let silent_id = 3u32;

        let entry_points: Vec<(u32, ReshareEntryPoint<u32, Secp256k1>)> = old
            .iter()
            .map(|id| {
                (
                    *id,
                    ReshareEntryPoint {
                        config: sample_old_config(*id, secret),
                        new_parties: old.clone(),
                        new_threshold: 2,
                    },
                )
            })
            .collect();

        let session_id = SessionId::new("silent-old-party-test");
        let shared_randomness = b"silent old party shared randomness";
        let mut handlers: BTreeMap<u32, Handler<u32, ReshareProtocol<u32, Secp256k1>>> = BTreeMap::new();
        let mut queue: Vec<Message<u32>> = Vec::new();
        for (id, entry_point) in entry_points {
            let mut handler = Handler::new(rng, entry_point, shared_randomness, session_id.clone(), id).unwrap();
            queue.extend(handler.next_outbound());
            handlers.insert(id, handler);
        }

        while !queue.is_empty() {
            let mut deliveries: BTreeMap<u32, Vec<Message<u32>>> = BTreeMap::new();
            for message in queue.drain(..) {
                // The silent party's own messages never make it onto the wire past
                // round 1; everyone else's messages (including those addressed to
                // it) are delivered as usual.
                if message.from == silent_id {
                    continue;
                }
                match &message.to {
                    Some(to) => deliveries.entry(*to).or_default().push(message),
                    None => {
                        for id in old.iter().filter(|id| **id != message.from) {
                            deliveries.entry(*id).or_default().push(message.clone());
                        }
                    }
                }
            }
            for (id, messages) in deliveries {
                if let Some(handler) = handlers.get_mut(&id) {
                    for message in messages {
                        handler.handle_inbound(rng, message).unwrap();
                    }
                }
            }
            let mut next_queue = Vec::new();
            for handler in handlers.values_mut() {
                next_queue.extend(handler.next_outbound());
            }
            queue = next_queue;
            if handlers.values().all(Handler::is_finished) {
                break;
            }
        }
        for handler in handlers.values_mut() {
            handler.no_more_inbound().unwrap();
        }

        for (id, handler) in handlers {
            let outcome = handler.result().expect("every handler must have reached an outcome");
            if id == silent_id {
                continue;
            }
            let abort = outcome.expect_err("lawful parties must abort when an old party goes silent");
            assert_eq!(*abort.kind(), ErrorKind::Missing);
            assert!(abort.culprits().contains(&silent_id));
        }
    }

    #[test]
    fn rejects_threshold_outside_new_bounds() {
        let rng = &mut rand_core::OsRng;
        let secret = Secp256k1::random_scalar(rng);
        let mut public_shares = BTreeMap::new();
        public_shares.insert(1u32, Secp256k1::generator_mul(&secret));
        let config = DynConfig::<u32, Secp256k1> {
            core: crate::config::ConfigCore {
                id: 1,
                threshold: 1,
                generation: 0,
                private_share: zeroize::Zeroizing::new(secret),
                public_shares,
                chain_key: [0u8; 32],
                rid: [0u8; 32],
                rollback_from: None,
            },
            public_key: Secp256k1::generator_mul(&Secp256k1::one_scalar()),
        };
        let entry = ReshareEntryPoint {
            config,
            new_parties: [1u32, 2].into_iter().collect(),
            new_threshold: 0,
        };
        assert!(entry.make_round(rng, b"session", &1u32).is_err());
    }
}
