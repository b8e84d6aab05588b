/*!
FROST-style threshold Schnorr/EdDSA: a two-round signing protocol (nonce
commitment, then binding and partial-signature aggregation) on top of the
same [`dkg`] keygen shared with [`super::cgg21`].

Unlike CGG21, nothing here needs a Paillier-based conversion: both rounds
are plain scalar/point arithmetic over the abstract [`crate::group::Group`]
interface, so this family's signing protocol is implemented in full,
grounded on the standard two-round FROST construction described across the
`other_examples/` FROST implementations retrieved alongside this spec.
*/

use alloc::{
    boxed::Box,
    collections::{BTreeMap, BTreeSet},
    format,
    vec::Vec,
};

use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use super::{check_signers, dkg, schnorr_challenge, SchnorrSignature};
use crate::{
    config::FrostConfig,
    error::LocalError,
    group::Group,
    party::{id_scalar, lagrange_coefficient, PartyId},
    protocol::{
        Artifact, CommunicationInfo, DirectMessage, EchoBroadcast, EntryPoint, FinalizeOutcome, NoProtocolErrors,
        NormalBroadcast, Payload, Protocol, ReceiveError, Round, RoundCommunicationInfo, TransitionInfo,
    },
};

/// Zero-sized marker identifying the FROST family in [`crate::adapter`].
#[derive(Debug, Clone, Copy)]
pub struct Frost;

// ---- Keygen (shares the DKG with CGG21) ---------------------------------

pub struct KeygenEntryPoint<Id, G: Group> {
    own_id: Id,
    parties: BTreeSet<Id>,
    threshold: usize,
    _group: core::marker::PhantomData<G>,
}

impl<Id: PartyId, G: Group> KeygenEntryPoint<Id, G> {
    pub fn new(own_id: Id, parties: BTreeSet<Id>, threshold: usize) -> Self {
        Self {
            own_id,
            parties,
            threshold,
            _group: core::marker::PhantomData,
        }
    }
}

#[derive(Debug)]
pub struct KeygenProtocol<Id, G>(core::marker::PhantomData<(Id, G)>);

impl<Id: PartyId, G: Group> Protocol<Id> for KeygenProtocol<Id, G> {
    type Result = FrostConfig<Id, G>;
    type ProtocolError = NoProtocolErrors;
    const PROTOCOL_ID: &'static str = "frost/keygen";
}

impl<Id: PartyId, G: Group> EntryPoint<Id> for KeygenEntryPoint<Id, G> {
    type Protocol = KeygenProtocol<Id, G>;

    fn make_round(
        self,
        rng: &mut dyn CryptoRngCore,
        _shared_randomness: &[u8],
        id: &Id,
    ) -> Result<Box<dyn Round<Id, Protocol = Self::Protocol>>, LocalError> {
        if !self.parties.contains(id) {
            return Err(LocalError::new("own id is not among the keygen parties"));
        }
        let dkg_round1 = dkg::DkgRound1::<Id, G>::new(rng, self.own_id, self.parties, self.threshold)?;
        Ok(Box::new(FrostKeygenRound { inner: Box::new(dkg_round1) }))
    }
}

struct FrostKeygenRound<Id: PartyId, G: Group> {
    inner: Box<dyn Round<Id, Protocol = dkg::DkgProtocol<Id, G>>>,
}

impl<Id: PartyId, G: Group> core::fmt::Debug for FrostKeygenRound<Id, G> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrostKeygenRound").finish_non_exhaustive()
    }
}

impl<Id: PartyId, G: Group> Round<Id> for FrostKeygenRound<Id, G> {
    type Protocol = KeygenProtocol<Id, G>;

    fn transition_info(&self) -> TransitionInfo {
        self.inner.transition_info()
    }

    fn communication_info(&self) -> CommunicationInfo<Id> {
        self.inner.communication_info()
    }

    fn make_direct_message(
        &self,
        rng: &mut dyn CryptoRngCore,
        destination: &Id,
    ) -> Result<(DirectMessage, Option<Artifact>), LocalError> {
        self.inner.make_direct_message(rng, destination)
    }

    fn make_echo_broadcast(&self, rng: &mut dyn CryptoRngCore) -> Result<EchoBroadcast, LocalError> {
        self.inner.make_echo_broadcast(rng)
    }

    fn make_normal_broadcast(&self, rng: &mut dyn CryptoRngCore) -> Result<NormalBroadcast, LocalError> {
        self.inner.make_normal_broadcast(rng)
    }

    fn receive_message(
        &self,
        rng: &mut dyn CryptoRngCore,
        from: &Id,
        echo_broadcast: EchoBroadcast,
        normal_broadcast: NormalBroadcast,
        direct_message: DirectMessage,
    ) -> Result<Payload, ReceiveError<Id, Self::Protocol>> {
        self.inner
            .receive_message(rng, from, echo_broadcast, normal_broadcast, direct_message)
            .map_err(|error| match error.into_view() {
                crate::protocol::ReceiveErrorKindView::Local(e) => ReceiveError::local(format!("{e}")),
                crate::protocol::ReceiveErrorKindView::Malformed(m) => ReceiveError::malformed(m),
                crate::protocol::ReceiveErrorKindView::Protocol(_) => ReceiveError::local("unreachable: DKG has no protocol errors"),
                crate::protocol::ReceiveErrorKindView::Unprovable(e) => ReceiveError::unprovable(format!("{e}")),
            })
    }

    fn finalize(
        self: Box<Self>,
        rng: &mut dyn CryptoRngCore,
        payloads: BTreeMap<Id, Payload>,
        artifacts: BTreeMap<Id, Artifact>,
    ) -> Result<FinalizeOutcome<Id, Self::Protocol>, LocalError> {
        match self.inner.finalize(rng, payloads, artifacts)? {
            FinalizeOutcome::AnotherRound(next) => Ok(FinalizeOutcome::AnotherRound(Box::new(FrostKeygenRound { inner: next }))),
            FinalizeOutcome::Result(output) => {
                let xs: Vec<G::Scalar> = output.public_shares.keys().map(id_scalar::<G, Id>).collect();
                let mut public_key = G::identity_point();
                for (id, point) in &output.public_shares {
                    let x_j = id_scalar::<G, Id>(id);
                    let lambda = lagrange_coefficient::<G>(&x_j, &xs);
                    public_key = G::add_points(&public_key, &G::point_mul(&lambda, point));
                }
                Ok(FinalizeOutcome::Result(FrostConfig {
                    core: crate::config::ConfigCore {
                        id: output.own_id,
                        threshold: output.threshold,
                        generation: 0,
                        private_share: zeroize::Zeroizing::new(output.private_share),
                        public_shares: output.public_shares,
                        chain_key: output.chain_key,
                        rid: output.rid,
                        rollback_from: None,
                    },
                    public_key,
                }))
            }
        }
    }
}

// ---- Sign ----------------------------------------------------------------

pub struct SignEntryPoint<Id, G: Group> {
    pub config: FrostConfig<Id, G>,
    pub signers: BTreeSet<Id>,
    pub message: alloc::vec::Vec<u8>,
}

#[derive(Debug)]
pub struct SignProtocol<Id, G>(core::marker::PhantomData<(Id, G)>);

impl<Id: PartyId, G: Group> Protocol<Id> for SignProtocol<Id, G> {
    type Result = SchnorrSignature<G>;
    type ProtocolError = NoProtocolErrors;
    const PROTOCOL_ID: &'static str = "frost/sign";
}

impl<Id: PartyId, G: Group> EntryPoint<Id> for SignEntryPoint<Id, G> {
    type Protocol = SignProtocol<Id, G>;

    fn make_round(
        self,
        rng: &mut dyn CryptoRngCore,
        _shared_randomness: &[u8],
        id: &Id,
    ) -> Result<Box<dyn Round<Id, Protocol = Self::Protocol>>, LocalError> {
        check_signers(
            &self.signers,
            &self.config.core.public_shares.keys().cloned().collect(),
            self.config.core.threshold,
        )
        .map_err(|abort| LocalError::new(format!("{abort}")))?;
        let d_i = G::random_scalar(rng);
        let e_i = G::random_scalar(rng);
        Ok(Box::new(SignRound1 {
            own_id: id.clone(),
            signers: self.signers,
            public_key: self.config.public_key,
            own_share: self.config.core.private_share.clone(),
            generation: self.config.core.generation,
            message: self.message,
            d_i,
            e_i,
        }))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(bound = "")]
struct NonceBcast<G: Group> {
    generation: u64,
    big_d: G::Point,
    big_e: G::Point,
}

#[derive(Debug)]
struct SignRound1<Id: PartyId, G: Group> {
    own_id: Id,
    signers: BTreeSet<Id>,
    public_key: G::Point,
    own_share: zeroize::Zeroizing<G::Scalar>,
    generation: u64,
    message: alloc::vec::Vec<u8>,
    d_i: G::Scalar,
    e_i: G::Scalar,
}

impl<Id: PartyId, G: Group> Round<Id> for SignRound1<Id, G> {
    type Protocol = SignProtocol<Id, G>;

    fn transition_info(&self) -> TransitionInfo {
        TransitionInfo::new(1u16.into(), [2u16.into()].into_iter().collect())
    }

    fn communication_info(&self) -> CommunicationInfo<Id> {
        CommunicationInfo::with_echo(RoundCommunicationInfo::all_to_all(&self.signers))
    }

    fn make_echo_broadcast(&self, _rng: &mut dyn CryptoRngCore) -> Result<EchoBroadcast, LocalError> {
        EchoBroadcast::new(&NonceBcast::<G> {
            generation: self.generation,
            big_d: G::generator_mul(&self.d_i),
            big_e: G::generator_mul(&self.e_i),
        })
    }

    fn receive_message(
        &self,
        _rng: &mut dyn CryptoRngCore,
        _from: &Id,
        echo_broadcast: EchoBroadcast,
        _normal_broadcast: NormalBroadcast,
        _direct_message: DirectMessage,
    ) -> Result<Payload, ReceiveError<Id, Self::Protocol>> {
        let bcast: NonceBcast<G> = echo_broadcast
            .deserialize()
            .map_err(|error| ReceiveError::malformed(format!("sign round 1: {error}")))?;
        if bcast.generation != self.generation {
            return Err(ReceiveError::unprovable_kind(
                crate::error::ErrorKind::MixedGeneration,
                format!("sign round 1: generation {} does not match our {}", bcast.generation, self.generation),
            ));
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
        commitments.insert(
            self.own_id.clone(),
            NonceBcast::<G> {
                generation: self.generation,
                big_d: G::generator_mul(&self.d_i),
                big_e: G::generator_mul(&self.e_i),
            },
        );
        for (id, payload) in payloads {
            let bcast: NonceBcast<G> = payload.downcast()?;
            commitments.insert(id, bcast);
        }
        Ok(FinalizeOutcome::AnotherRound(Box::new(SignRound2 {
            own_id: self.own_id,
            signers: self.signers,
            public_key: self.public_key,
            own_share: self.own_share,
            message: self.message,
            d_i: self.d_i,
            e_i: self.e_i,
            commitments,
        })))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(bound = "")]
struct PartialSigBcast<G: Group> {
    z: G::Scalar,
}

#[derive(Debug)]
struct SignRound2<Id: PartyId, G: Group> {
    own_id: Id,
    signers: BTreeSet<Id>,
    public_key: G::Point,
    own_share: zeroize::Zeroizing<G::Scalar>,
    message: alloc::vec::Vec<u8>,
    d_i: G::Scalar,
    e_i: G::Scalar,
    commitments: BTreeMap<Id, NonceBcast<G>>,
}

impl<Id: PartyId, G: Group> SignRound2<Id, G> {
    /// The binding factor `rho_i` each signer applies to its hiding nonce,
    /// derived from a transcript of every signer's commitment pair and the
    /// message, per the standard FROST binding-factor construction.
    fn binding_factor(&self, id: &Id) -> G::Scalar {
        let mut transcript = alloc::vec::Vec::new();
        transcript.extend_from_slice(&self.message);
        for (signer, bcast) in &self.commitments {
            transcript.extend_from_slice(&postcard::to_allocvec(signer).unwrap_or_default());
            transcript.extend_from_slice(&G::encode_point(&bcast.big_d));
            transcript.extend_from_slice(&G::encode_point(&bcast.big_e));
        }
        transcript.extend_from_slice(&postcard::to_allocvec(id).unwrap_or_default());
        G::hash_to_scalar(b"frost-binding", &transcript)
    }

    fn group_commitment(&self) -> G::Point {
        let mut acc = G::identity_point();
        for (id, bcast) in &self.commitments {
            let rho = self.binding_factor(id);
            acc = G::add_points(&acc, &G::add_points(&bcast.big_d, &G::point_mul(&rho, &bcast.big_e)));
        }
        acc
    }
}

impl<Id: PartyId, G: Group> Round<Id> for SignRound2<Id, G> {
    type Protocol = SignProtocol<Id, G>;

    fn transition_info(&self) -> TransitionInfo {
        TransitionInfo::new_final(2u16.into())
    }

    fn communication_info(&self) -> CommunicationInfo<Id> {
        CommunicationInfo::new(RoundCommunicationInfo::all_to_all(&self.signers))
    }

    fn make_normal_broadcast(&self, _rng: &mut dyn CryptoRngCore) -> Result<NormalBroadcast, LocalError> {
        let big_r = self.group_commitment();
        let c = schnorr_challenge::<G>(&big_r, &self.public_key, &self.message);
        let xs: Vec<G::Scalar> = self.signers.iter().map(id_scalar::<G, Id>).collect();
        let own_x = id_scalar::<G, Id>(&self.own_id);
        let lambda = lagrange_coefficient::<G>(&own_x, &xs);
        let rho = self.binding_factor(&self.own_id);
        let z = G::add_scalar(
            &G::add_scalar(&self.d_i, &G::mul_scalar(&rho, &self.e_i)),
            &G::mul_scalar(&c, &G::mul_scalar(&lambda, &self.own_share)),
        );
        NormalBroadcast::new(&PartialSigBcast::<G> { z })
    }

    fn receive_message(
        &self,
        _rng: &mut dyn CryptoRngCore,
        _from: &Id,
        _echo_broadcast: EchoBroadcast,
        normal_broadcast: NormalBroadcast,
        _direct_message: DirectMessage,
    ) -> Result<Payload, ReceiveError<Id, Self::Protocol>> {
        let bcast: PartialSigBcast<G> = normal_broadcast
            .deserialize()
            .map_err(|error| ReceiveError::malformed(format!("sign round 2: {error}")))?;
        Ok(Payload::new(bcast.z))
    }

    fn finalize(
        self: Box<Self>,
        _rng: &mut dyn CryptoRngCore,
        payloads: BTreeMap<Id, Payload>,
        _artifacts: BTreeMap<Id, Artifact>,
    ) -> Result<FinalizeOutcome<Id, Self::Protocol>, LocalError> {
        let big_r = self.group_commitment();
        let c = schnorr_challenge::<G>(&big_r, &self.public_key, &self.message);
        let xs: Vec<G::Scalar> = self.signers.iter().map(id_scalar::<G, Id>).collect();
        let own_x = id_scalar::<G, Id>(&self.own_id);
        let lambda = lagrange_coefficient::<G>(&own_x, &xs);
        let rho = self.binding_factor(&self.own_id);
        let mut z = G::add_scalar(
            &G::add_scalar(&self.d_i, &G::mul_scalar(&rho, &self.e_i)),
            &G::mul_scalar(&c, &G::mul_scalar(&lambda, &self.own_share)),
        );
        for (_, payload) in payloads {
            let part: G::Scalar = payload.downcast()?;
            z = G::add_scalar(&z, &part);
        }
        Ok(FinalizeOutcome::Result(SchnorrSignature { r_point: big_r, s: z }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Secp256k1;

    #[test]
    fn schnorr_signature_roundtrips() {
        let rng = &mut rand_core::OsRng;
        let secret = Secp256k1::random_scalar(rng);
        let public_key = Secp256k1::generator_mul(&secret);
        let k = Secp256k1::random_scalar(rng);
        let r_point = Secp256k1::generator_mul(&k);
        let msg = b"hello frost";
        let c = schnorr_challenge::<Secp256k1>(&r_point, &public_key, msg);
        let s = Secp256k1::add_scalar(&k, &Secp256k1::mul_scalar(&c, &secret));
        let signature = SchnorrSignature::<Secp256k1> { r_point, s };
        assert!(signature.verify(&public_key, msg));
    }

    #[test]
    fn sign_rejects_a_peer_on_a_different_generation() {
        let rng = &mut rand_core::OsRng;
        let parties: BTreeSet<u32> = [1u32, 2].into_iter().collect();
        let threshold = 2;
        let keygen_entry_points: Vec<(u32, KeygenEntryPoint<u32, Secp256k1>)> = parties
            .iter()
            .map(|id| (*id, KeygenEntryPoint::new(*id, parties.clone(), threshold)))
            .collect();
        let mut configs = crate::dev::run_sync(rng, keygen_entry_points).unwrap().unwrap_all();
        configs.get_mut(&2).unwrap().core.generation = 1;

        let sign_entry_points: Vec<(u32, SignEntryPoint<u32, Secp256k1>)> = parties
            .iter()
            .map(|id| {
                (
                    *id,
                    SignEntryPoint {
                        config: configs.get(id).unwrap().clone(),
                        signers: parties.clone(),
                        message: b"hello frost".to_vec(),
                    },
                )
            })
            .collect();
        let result = crate::dev::run_sync(rng, sign_entry_points).unwrap();
        let abort = result.results.get(&1).unwrap().as_ref().expect_err("party 1 should abort on generation mismatch");
        assert_eq!(*abort.kind(), crate::error::ErrorKind::MixedGeneration);
        assert!(abort.culprits().contains(&2));
    }
}
