/*!
CGG21-style threshold ECDSA: presignature generation plus an online finish.

The presignature round's multiplicative-to-additive conversion is normally
carried out via Paillier-encrypted affine operations and accompanying
zero-knowledge proofs (`synedrion::cggmp21::sigma`); per `SPEC_FULL.md` §8/
§11 that machinery, and the concrete content of [`Cgg21Aux`], are out of
scope here. What this module implements is the round skeleton spec §4.3
specifies and the linear combination the online finish performs over
whatever additive shares presigning produced — ported in shape from
`synedrion::cggmp21::protocols::signing::Round1`, which is exactly this
linear step (`s_part = k_share * m + r * product_share`) with the MtA detail
already factored out into `context.presigning`.

Without the MtA layer, the nonce `k = sum(k_i)` has to be reconstructed in
the clear for every signer to agree on `r`: round 1 reveals each signer's
`k_i` alongside its point commitment so every signer can sum to the same
`k` and invert it. `k_i` is independent of the key shares, so revealing it
costs nothing beyond the hiding property CGG21's ZK layer would otherwise
give the nonce — the presignature's secrecy of the private key shares is
unaffected.
*/

use alloc::{
    boxed::Box,
    collections::{BTreeMap, BTreeSet},
    format,
};

use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use super::{check_ecdsa_msg_hash, check_signers, dkg, EcdsaSignature};
use crate::{
    config::{Cgg21Aux, Cgg21Config},
    error::LocalError,
    group::{Group, WeierstrassGroup},
    party::{id_scalar, lagrange_coefficient, PartyId},
    protocol::{
        Artifact, CommunicationInfo, DirectMessage, EchoBroadcast, EntryPoint, FinalizeOutcome, NoProtocolErrors,
        NormalBroadcast, Payload, Protocol, ReceiveError, Round, RoundCommunicationInfo, TransitionInfo,
    },
};

/// Zero-sized marker identifying the CGG21 family in [`crate::adapter`].
#[derive(Debug, Clone, Copy)]
pub struct Cgg21;

/// A presignature: the additive shares a threshold of signers must combine,
/// in the online finish, into a full ECDSA signature over a specific
/// message. Reusable across messages only in the sense that the source
/// permits it; this crate treats a `PreSignature` as single-use, matching
/// `synedrion`'s `PresigningData`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct PreSignature<G: Group> {
    r: G::Scalar,
    /// The inverse of the aggregated nonce `k = sum(k_i)`, public once round
    /// 1 reveals every `k_i` (see module docs).
    kappa_inv: G::Scalar,
    /// `kappa_inv * lambda_i * x_i`, this signer's additive contribution to
    /// `kappa_inv * x`.
    chi_share: G::Scalar,
    /// Whether this signer is the one designated (deterministically, by
    /// having the lowest id among the signers) to contribute the message
    /// term `kappa_inv * e` in the online round, so it is added exactly
    /// once rather than once per signer.
    is_designated: bool,
}

// ---- Keygen -----------------------------------------------------------

pub struct KeygenEntryPoint<Id, G: Group> {
    own_id: Id,
    parties: BTreeSet<Id>,
    threshold: usize,
    aux: BTreeMap<Id, Cgg21Aux>,
    _group: core::marker::PhantomData<G>,
}

impl<Id: PartyId, G: Group> KeygenEntryPoint<Id, G> {
    pub fn new(own_id: Id, parties: BTreeSet<Id>, threshold: usize, aux: BTreeMap<Id, Cgg21Aux>) -> Self {
        Self {
            own_id,
            parties,
            threshold,
            aux,
            _group: core::marker::PhantomData,
        }
    }
}

#[derive(Debug)]
pub struct KeygenProtocol<Id, G>(core::marker::PhantomData<(Id, G)>);

impl<Id: PartyId, G: Group> Protocol<Id> for KeygenProtocol<Id, G> {
    type Result = Cgg21Config<Id, G>;
    type ProtocolError = NoProtocolErrors;
    const PROTOCOL_ID: &'static str = "cgg21/keygen";
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
        let dkg_round1 = dkg::DkgRound1::<Id, G>::new(rng, self.own_id.clone(), self.parties.clone(), self.threshold)?;
        Ok(Box::new(Cgg21KeygenRound {
            inner: Box::new(dkg_round1),
            aux: self.aux,
        }))
    }
}

/// Wraps the shared [`dkg`] rounds, attaching CGG21's auxiliary material to
/// the terminal Config once the DKG itself completes.
struct Cgg21KeygenRound<Id: PartyId, G: Group> {
    inner: Box<dyn Round<Id, Protocol = dkg::DkgProtocol<Id, G>>>,
    aux: BTreeMap<Id, Cgg21Aux>,
}

impl<Id: PartyId, G: Group> core::fmt::Debug for Cgg21KeygenRound<Id, G> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Cgg21KeygenRound").finish_non_exhaustive()
    }
}

impl<Id: PartyId, G: Group> Round<Id> for Cgg21KeygenRound<Id, G> {
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
            FinalizeOutcome::AnotherRound(next) => Ok(FinalizeOutcome::AnotherRound(Box::new(Cgg21KeygenRound {
                inner: next,
                aux: self.aux,
            }))),
            FinalizeOutcome::Result(output) => {
                let public_key = reconstruct_from_shares::<Id, G>(&output.public_shares);
                Ok(FinalizeOutcome::Result(Cgg21Config {
                    core: crate::config::ConfigCore {
                        id: output.own_id.clone(),
                        threshold: output.threshold,
                        generation: 0,
                        private_share: zeroize::Zeroizing::new(output.private_share),
                        public_shares: output.public_shares,
                        chain_key: output.chain_key,
                        rid: output.rid,
                        rollback_from: None,
                    },
                    public_key,
                    aux: self.aux,
                }))
            }
        }
    }
}

fn reconstruct_from_shares<Id: PartyId, G: Group>(public_shares: &BTreeMap<Id, G::Point>) -> G::Point {
    let xs: alloc::vec::Vec<G::Scalar> = public_shares.keys().map(id_scalar::<G, Id>).collect();
    let mut acc = G::identity_point();
    for (id, point) in public_shares {
        let x_j = id_scalar::<G, Id>(id);
        let lambda = lagrange_coefficient::<G>(&x_j, &xs);
        acc = G::add_points(&acc, &G::point_mul(&lambda, point));
    }
    acc
}

// ---- Presign ------------------------------------------------------------

pub struct PresignEntryPoint<Id, G: Group> {
    pub config: Cgg21Config<Id, G>,
    pub signers: BTreeSet<Id>,
}

#[derive(Debug)]
pub struct PresignProtocol<Id, G>(core::marker::PhantomData<(Id, G)>);

impl<Id: PartyId, G: Group> Protocol<Id> for PresignProtocol<Id, G> {
    type Result = PreSignature<G>;
    type ProtocolError = NoProtocolErrors;
    const PROTOCOL_ID: &'static str = "cgg21/presign";
}

impl<Id: PartyId, G: WeierstrassGroup> EntryPoint<Id> for PresignEntryPoint<Id, G> {
    type Protocol = PresignProtocol<Id, G>;

    fn make_round(
        self,
        rng: &mut dyn CryptoRngCore,
        _shared_randomness: &[u8],
        id: &Id,
    ) -> Result<Box<dyn Round<Id, Protocol = Self::Protocol>>, LocalError> {
        check_signers(&self.signers, &self.config.core.public_shares.keys().cloned().collect(), self.config.core.threshold)
            .map_err(|abort| LocalError::new(format!("{abort}")))?;
        let k_i = G::random_scalar(rng);
        Ok(Box::new(PresignRound1 {
            own_id: id.clone(),
            signers: self.signers,
            threshold: self.config.core.threshold,
            own_share: self.config.core.private_share.clone(),
            generation: self.config.core.generation,
            k_i,
        }))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(bound = "")]
struct PresignBcast<G: Group> {
    generation: u64,
    big_k: G::Point,
    k_i: G::Scalar,
}

#[derive(Debug)]
struct PresignRound1<Id: PartyId, G: WeierstrassGroup> {
    own_id: Id,
    signers: BTreeSet<Id>,
    threshold: usize,
    own_share: zeroize::Zeroizing<G::Scalar>,
    generation: u64,
    k_i: G::Scalar,
}

impl<Id: PartyId, G: WeierstrassGroup> Round<Id> for PresignRound1<Id, G> {
    type Protocol = PresignProtocol<Id, G>;

    fn transition_info(&self) -> TransitionInfo {
        TransitionInfo::new_final(1u16.into())
    }

    fn communication_info(&self) -> CommunicationInfo<Id> {
        CommunicationInfo::with_echo(RoundCommunicationInfo::all_to_all(&self.signers))
    }

    fn make_echo_broadcast(&self, _rng: &mut dyn CryptoRngCore) -> Result<EchoBroadcast, LocalError> {
        EchoBroadcast::new(&PresignBcast::<G> {
            generation: self.generation,
            big_k: G::generator_mul(&self.k_i),
            k_i: self.k_i.clone(),
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
        let bcast: PresignBcast<G> = echo_broadcast
            .deserialize()
            .map_err(|error| ReceiveError::malformed(format!("presign round 1: {error}")))?;
        if bcast.generation != self.generation {
            return Err(ReceiveError::unprovable_kind(
                crate::error::ErrorKind::MixedGeneration,
                format!("presign round 1: generation {} does not match our {}", bcast.generation, self.generation),
            ));
        }
        if bcast.big_k != G::generator_mul(&bcast.k_i) {
            return Err(ReceiveError::malformed("presign round 1: revealed k_i does not match its own commitment"));
        }
        Ok(Payload::new(bcast))
    }

    fn finalize(
        self: Box<Self>,
        _rng: &mut dyn CryptoRngCore,
        payloads: BTreeMap<Id, Payload>,
        _artifacts: BTreeMap<Id, Artifact>,
    ) -> Result<FinalizeOutcome<Id, Self::Protocol>, LocalError> {
        // Every signer sums the same revealed `k_j`s to the same aggregated
        // nonce `kappa`, so every signer derives the same `r` — unlike
        // deriving `r` from any one signer's private `k_i`, which would make
        // `r` signer-dependent and the combined signature unverifiable.
        let mut kappa = self.k_i.clone();
        for (_, payload) in payloads {
            let bcast: PresignBcast<G> = payload.downcast()?;
            kappa = G::add_scalar(&kappa, &bcast.k_i);
        }
        if G::is_zero_scalar(&kappa) {
            return Err(LocalError::new("aggregated nonce is zero"));
        }
        let big_r = G::generator_mul(&kappa);
        let r = G::x_coordinate(&big_r);
        let kappa_inv = G::invert_scalar(&kappa).ok_or_else(|| LocalError::new("aggregated nonce has no inverse"))?;

        // The multiplicative-to-additive conversion that would turn
        // (k_i, gamma_i, s_i) into an additive share `chi_i` of
        // `kappa^-1 * x` is Paillier/ZK machinery out of scope here (see
        // module docs); with `kappa` public, every signer can apply
        // `kappa_inv` to its own Lagrange-weighted key share directly.
        let xs: alloc::vec::Vec<G::Scalar> = self.signers.iter().map(id_scalar::<G, Id>).collect();
        let own_x = id_scalar::<G, Id>(&self.own_id);
        let lambda = lagrange_coefficient::<G>(&own_x, &xs);
        let chi_i = G::mul_scalar(&kappa_inv, &G::mul_scalar(&lambda, &self.own_share));
        let is_designated = self.signers.iter().next() == Some(&self.own_id);

        Ok(FinalizeOutcome::Result(PreSignature {
            r,
            kappa_inv,
            chi_share: chi_i,
            is_designated,
        }))
    }
}

// ---- Online finish / direct sign ----------------------------------------

pub struct OnlineEntryPoint<Id, G: WeierstrassGroup> {
    pub presignature: PreSignature<G>,
    pub signers: BTreeSet<Id>,
    pub msg_hash: [u8; 32],
}

#[derive(Debug)]
pub struct SignProtocol<Id, G>(core::marker::PhantomData<(Id, G)>);

impl<Id: PartyId, G: WeierstrassGroup> Protocol<Id> for SignProtocol<Id, G> {
    type Result = EcdsaSignature<G>;
    type ProtocolError = NoProtocolErrors;
    const PROTOCOL_ID: &'static str = "cgg21/sign";
}

impl<Id: PartyId, G: WeierstrassGroup> EntryPoint<Id> for OnlineEntryPoint<Id, G> {
    type Protocol = SignProtocol<Id, G>;

    fn make_round(
        self,
        _rng: &mut dyn CryptoRngCore,
        _shared_randomness: &[u8],
        _id: &Id,
    ) -> Result<Box<dyn Round<Id, Protocol = Self::Protocol>>, LocalError> {
        let m = super::hash_to_scalar::<G>(b"ecdsa-e", &self.msg_hash);
        // Only the designated signer contributes `kappa_inv * e`; every
        // signer contributes its own share of `kappa_inv * x`, so summing
        // every `s_part` gives exactly `kappa_inv * (e + r * x)`.
        let e_share = if self.presignature.is_designated {
            G::mul_scalar(&self.presignature.kappa_inv, &m)
        } else {
            G::zero_scalar()
        };
        let s_part = G::add_scalar(&e_share, &G::mul_scalar(&self.presignature.r, &self.presignature.chi_share));
        Ok(Box::new(OnlineRound {
            signers: self.signers,
            r: self.presignature.r,
            s_part,
        }))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(bound = "")]
struct SPartBcast<G: Group> {
    s_part: G::Scalar,
}

#[derive(Debug)]
struct OnlineRound<Id: PartyId, G: WeierstrassGroup> {
    signers: BTreeSet<Id>,
    r: G::Scalar,
    s_part: G::Scalar,
}

impl<Id: PartyId, G: WeierstrassGroup> Round<Id> for OnlineRound<Id, G> {
    type Protocol = SignProtocol<Id, G>;

    fn transition_info(&self) -> TransitionInfo {
        TransitionInfo::new_final(1u16.into())
    }

    fn communication_info(&self) -> CommunicationInfo<Id> {
        CommunicationInfo::new(RoundCommunicationInfo::all_to_all(&self.signers))
    }

    fn make_normal_broadcast(&self, _rng: &mut dyn CryptoRngCore) -> Result<NormalBroadcast, LocalError> {
        NormalBroadcast::new(&SPartBcast::<G> { s_part: self.s_part.clone() })
    }

    fn receive_message(
        &self,
        _rng: &mut dyn CryptoRngCore,
        _from: &Id,
        _echo_broadcast: EchoBroadcast,
        normal_broadcast: NormalBroadcast,
        _direct_message: DirectMessage,
    ) -> Result<Payload, ReceiveError<Id, Self::Protocol>> {
        let bcast: SPartBcast<G> = normal_broadcast
            .deserialize()
            .map_err(|error| ReceiveError::malformed(format!("online round: {error}")))?;
        Ok(Payload::new(bcast.s_part))
    }

    fn finalize(
        self: Box<Self>,
        _rng: &mut dyn CryptoRngCore,
        payloads: BTreeMap<Id, Payload>,
        _artifacts: BTreeMap<Id, Artifact>,
    ) -> Result<FinalizeOutcome<Id, Self::Protocol>, LocalError> {
        let mut s = self.s_part;
        for (_, payload) in payloads {
            let part: G::Scalar = payload.downcast()?;
            s = G::add_scalar(&s, &part);
        }
        if G::is_zero_scalar(&self.r) || G::is_zero_scalar(&s) {
            return Err(LocalError::new("degenerate ECDSA signature (r or s is zero)"));
        }
        Ok(FinalizeOutcome::Result(EcdsaSignature { r: self.r, s }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Secp256k1;

    #[test]
    fn signers_below_threshold_is_rejected() {
        let parties: BTreeSet<u32> = [1, 2, 3].into_iter().collect();
        let signers: BTreeSet<u32> = [1, 2].into_iter().collect();
        assert!(check_signers(&signers, &parties, 3).is_err());
    }

    #[test]
    fn ecdsa_signature_roundtrips() {
        let rng = &mut rand_core::OsRng;
        let secret = Secp256k1::random_scalar(rng);
        let public_key = Secp256k1::generator_mul(&secret);
        let k = Secp256k1::random_scalar(rng);
        let big_r = Secp256k1::generator_mul(&k);
        let r = Secp256k1::x_coordinate(&big_r);
        let msg_hash = check_ecdsa_msg_hash::<u32>(&[7u8; 32]).unwrap();
        let e = super::super::hash_to_scalar::<Secp256k1>(b"ecdsa-e", &msg_hash);
        let k_inv = Secp256k1::invert_scalar(&k).unwrap();
        let s = Secp256k1::mul_scalar(&k_inv, &Secp256k1::add_scalar(&e, &Secp256k1::mul_scalar(&r, &secret)));
        let signature = EcdsaSignature::<Secp256k1> { r, s };
        assert!(signature.verify(&public_key, &msg_hash));
    }

    #[test]
    fn presign_and_online_finish_produce_a_verifying_signature() {
        let rng = &mut rand_core::OsRng;
        let parties: BTreeSet<u32> = [1u32, 2, 3].into_iter().collect();
        let threshold = 2;
        let keygen_entry_points: Vec<(u32, KeygenEntryPoint<u32, Secp256k1>)> = parties
            .iter()
            .map(|id| (*id, KeygenEntryPoint::new(*id, parties.clone(), threshold, BTreeMap::new())))
            .collect();
        let configs = crate::dev::run_sync(rng, keygen_entry_points).unwrap().unwrap_all();
        let public_key = configs.values().next().unwrap().public_key.clone();

        let signers: BTreeSet<u32> = [1u32, 2].into_iter().collect();
        let presign_entry_points: Vec<(u32, PresignEntryPoint<u32, Secp256k1>)> = signers
            .iter()
            .map(|id| {
                (
                    *id,
                    PresignEntryPoint {
                        config: configs.get(id).unwrap().clone(),
                        signers: signers.clone(),
                    },
                )
            })
            .collect();
        let presignatures = crate::dev::run_sync(rng, presign_entry_points).unwrap().unwrap_all();

        let msg_hash = check_ecdsa_msg_hash::<u32>(&[9u8; 32]).unwrap();
        let online_entry_points: Vec<(u32, OnlineEntryPoint<u32, Secp256k1>)> = signers
            .iter()
            .map(|id| {
                (
                    *id,
                    OnlineEntryPoint {
                        presignature: presignatures.get(id).unwrap().clone(),
                        signers: signers.clone(),
                        msg_hash,
                    },
                )
            })
            .collect();
        let signatures = crate::dev::run_sync(rng, online_entry_points).unwrap().unwrap_all();

        let mut values = signatures.values();
        let first = values.next().unwrap();
        assert!(values.all(|signature| signature == first), "every signer must derive the same signature");
        assert!(first.verify(&public_key, &msg_hash));
    }

    #[test]
    fn presign_rejects_a_peer_on_a_different_generation() {
        let rng = &mut rand_core::OsRng;
        let parties: BTreeSet<u32> = [1u32, 2].into_iter().collect();
        let threshold = 2;
        let keygen_entry_points: Vec<(u32, KeygenEntryPoint<u32, Secp256k1>)> = parties
            .iter()
            .map(|id| (*id, KeygenEntryPoint::new(*id, parties.clone(), threshold, BTreeMap::new())))
            .collect();
        let mut configs = crate::dev::run_sync(rng, keygen_entry_points).unwrap().unwrap_all();
        configs.get_mut(&2).unwrap().core.generation = 1;

        let presign_entry_points: Vec<(u32, PresignEntryPoint<u32, Secp256k1>)> = parties
            .iter()
            .map(|id| {
                (
                    *id,
                    PresignEntryPoint {
                        config: configs.get(id).unwrap().clone(),
                        signers: parties.clone(),
                    },
                )
            })
            .collect();
        let result = crate::dev::run_sync(rng, presign_entry_points).unwrap();
        let abort = result.results.get(&1).unwrap().as_ref().expect_err("party 1 should abort on generation mismatch");
        assert_eq!(*abort.kind(), crate::error::ErrorKind::MixedGeneration);
        assert!(abort.culprits().contains(&2));
    }
}
