/*!
A dealer-less Feldman VSS distributed key generation, shared by [`super::cgg21`]
and [`super::frost`] keygen (both families start from the same kind of
Config chassis; only the auxiliary fields they attach differ).

Grounded on the same commitment-vector machinery as
[`crate::families::dyn_family::reshare`]: here every party plays the role
DYN round 1 gives to an `OLD` party (it deals itself in), since keygen has
no prior committee to hand off from.
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
    error::LocalError,
    group::{CommitmentVector, Group, Polynomial},
    party::{id_scalar, PartyId},
    protocol::{
        Artifact, CommunicationInfo, DirectMessage, EchoBroadcast, FinalizeOutcome, NoProtocolErrors, Payload, Protocol,
        ReceiveError, Round, RoundCommunicationInfo, TransitionInfo,
    },
};

/// The chassis fields a completed DKG produces, independent of which family
/// wraps them into a `Config`.
#[derive(Debug, Clone)]
pub struct DkgOutput<Id, G: Group> {
    pub own_id: Id,
    pub threshold: usize,
    pub private_share: G::Scalar,
    pub public_shares: BTreeMap<Id, G::Point>,
    pub chain_key: [u8; 32],
    pub rid: [u8; 32],
}

#[derive(Debug)]
pub struct DkgProtocol<Id, G>(core::marker::PhantomData<(Id, G)>);

impl<Id: PartyId, G: Group> Protocol<Id> for DkgProtocol<Id, G> {
    type Result = DkgOutput<Id, G>;
    type ProtocolError = NoProtocolErrors;
    const PROTOCOL_ID: &'static str = "dkg";
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(bound = "")]
struct Round1Bcast<G: Group> {
    commitment: CommitmentVector<G>,
    chain_key_part: [u8; 32],
}

#[derive(Debug)]
pub struct DkgRound1<Id: PartyId, G: Group> {
    own_id: Id,
    parties: BTreeSet<Id>,
    threshold: usize,
    polynomial: Polynomial<G>,
    chain_key_part: [u8; 32],
}

impl<Id: PartyId, G: Group> DkgRound1<Id, G> {
    pub fn new(rng: &mut dyn CryptoRngCore, own_id: Id, parties: BTreeSet<Id>, threshold: usize) -> Result<Self, LocalError> {
        if threshold == 0 || threshold > parties.len() {
            return Err(LocalError::new("threshold must be in [1, |parties|]"));
        }
        let secret = G::random_scalar(rng);
        let polynomial = Polynomial::<G>::sample(rng, threshold, secret);
        let mut chain_key_part = [0u8; 32];
        rng.fill_bytes(&mut chain_key_part);
        Ok(Self {
            own_id,
            parties,
            threshold,
            polynomial,
            chain_key_part,
        })
    }
}

impl<Id: PartyId, G: Group> Round<Id> for DkgRound1<Id, G> {
    type Protocol = DkgProtocol<Id, G>;

    fn transition_info(&self) -> TransitionInfo {
        TransitionInfo::new(1u16.into(), [2u16.into()].into_iter().collect())
    }

    fn communication_info(&self) -> CommunicationInfo<Id> {
        CommunicationInfo::with_echo(RoundCommunicationInfo::all_to_all(&self.parties))
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
        _from: &Id,
        echo_broadcast: EchoBroadcast,
        _normal_broadcast: crate::protocol::NormalBroadcast,
        _direct_message: DirectMessage,
    ) -> Result<Payload, ReceiveError<Id, Self::Protocol>> {
        let bcast: Round1Bcast<G> = echo_broadcast
            .deserialize()
            .map_err(|error| ReceiveError::malformed(format!("round 1 broadcast: {error}")))?;
        if bcast.commitment.degree() != self.threshold {
            return Err(ReceiveError::malformed("commitment vector has the wrong degree"));
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
        let commitments = commitments.into_iter().map(|(id, b)| (id, b.commitment)).collect();
        Ok(FinalizeOutcome::AnotherRound(Box::new(DkgRound2 {
            own_id: self.own_id,
            parties: self.parties,
            threshold: self.threshold,
            polynomial: self.polynomial,
            commitments,
            chain_key_parts,
        })))
    }
}

#[derive(Debug)]
pub struct DkgRound2<Id: PartyId, G: Group> {
    own_id: Id,
    parties: BTreeSet<Id>,
    threshold: usize,
    polynomial: Polynomial<G>,
    commitments: BTreeMap<Id, CommitmentVector<G>>,
    chain_key_parts: BTreeMap<Id, [u8; 32]>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(bound = "")]
struct DealMessage<G: Group> {
    share: G::Scalar,
}

impl<Id: PartyId, G: Group> Round<Id> for DkgRound2<Id, G> {
    type Protocol = DkgProtocol<Id, G>;

    fn transition_info(&self) -> TransitionInfo {
        TransitionInfo::new_final(2u16.into())
    }

    fn communication_info(&self) -> CommunicationInfo<Id> {
        CommunicationInfo::new(RoundCommunicationInfo::all_to_all(&self.parties))
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
        _normal_broadcast: crate::protocol::NormalBroadcast,
        direct_message: DirectMessage,
    ) -> Result<Payload, ReceiveError<Id, Self::Protocol>> {
        let deal: DealMessage<G> = direct_message
            .deserialize()
            .map_err(|error| ReceiveError::malformed(format!("round 2 deal: {error}")))?;
        let commitment = self
            .commitments
            .get(from)
            .ok_or_else(|| ReceiveError::local("missing round 1 commitment for a round 2 sender"))?;
        let own_x = id_scalar::<G, Id>(&self.own_id);
        if !commitment.verify_share(&own_x, &deal.share) {
            return Err(ReceiveError::unprovable(format!("{from:?} sent a share inconsistent with its commitment")));
        }
        Ok(Payload::new(deal.share))
    }

    fn finalize(
        self: Box<Self>,
        _rng: &mut dyn CryptoRngCore,
        payloads: BTreeMap<Id, Payload>,
        _artifacts: BTreeMap<Id, Artifact>,
    ) -> Result<FinalizeOutcome<Id, Self::Protocol>, LocalError> {
        let own_x = id_scalar::<G, Id>(&self.own_id);
        let mut private_share = self.polynomial.eval(&own_x);
        for (_, payload) in payloads {
            let share: G::Scalar = payload.downcast()?;
            private_share = G::add_scalar(&private_share, &share);
        }

        let xs: Vec<(Id, G::Scalar)> = self.parties.iter().map(|id| (id.clone(), id_scalar::<G, Id>(id))).collect();
        let mut public_shares = BTreeMap::new();
        for (id, x) in &xs {
            let mut point = G::identity_point();
            for commitment in self.commitments.values() {
                point = G::add_points(&point, &commitment.eval_in_exponent(x));
            }
            public_shares.insert(id.clone(), point);
        }

        let mut rid_input = alloc::vec::Vec::new();
        let mut chain_key_acc = [0u8; 32];
        for (_, part) in &self.chain_key_parts {
            for (acc, byte) in chain_key_acc.iter_mut().zip(part.iter()) {
                *acc ^= byte;
            }
        }
        for commitment in self.commitments.values() {
            rid_input.extend_from_slice(&G::encode_point(commitment.constant_term_commitment()));
        }
        let rid_scalar = G::hash_to_scalar(b"dkg-rid", &rid_input);
        let rid = fixed_32_digest(&G::encode_scalar(&rid_scalar));

        Ok(FinalizeOutcome::Result(DkgOutput {
            own_id: self.own_id,
            threshold: self.threshold,
            private_share,
            public_shares,
            chain_key: chain_key_acc,
            rid,
        }))
    }
}

fn fixed_32_digest(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (i, byte) in bytes.iter().enumerate() {
        out[i % 32] ^= byte;
    }
    out
}
