/*!
The three signing families sharing the round engine: [`cgg21`] (threshold
ECDSA, presignature + online finish), [`frost`] (threshold Schnorr/EdDSA),
and [`dyn_family`] (live committee re-sharing).

Per `SPEC_FULL.md` §8/§11, the concrete zero-knowledge machinery of CGG21 and
the Paillier-based multiplicative-to-additive conversion it depends on are
out of scope; this crate specifies and implements the round skeleton and
the parts expressible purely in terms of the abstract [`crate::group::Group`]
interface.
*/

pub mod cgg21;
mod dkg;
pub mod dyn_family;
pub mod frost;

use alloc::{collections::BTreeSet, vec::Vec};

use crate::{
    error::{Abort, ErrorKind},
    party::PartyId,
};

/// Checks the "signers set must be a subset of Config.parties and have
/// cardinality >= t" constraint from spec §4.3.
pub(crate) fn check_signers<Id: PartyId>(
    signers: &BTreeSet<Id>,
    parties: &BTreeSet<Id>,
    threshold: usize,
) -> Result<(), Abort<Id>> {
    if signers.len() < threshold {
        return Err(Abort::new(
            ErrorKind::InvalidThreshold,
            alloc::format!("{} signers is fewer than the threshold {threshold}", signers.len()),
        ));
    }
    if !parties.is_superset(signers) {
        return Err(Abort::new(
            ErrorKind::InvalidParticipants,
            "a signer is not a party of this Config",
        ));
    }
    Ok(())
}

/// Checks the "message hash for ECDSA MUST be exactly 32 bytes" constraint
/// from spec §4.3.
pub(crate) fn check_ecdsa_msg_hash<Id: PartyId>(msg_hash: &[u8]) -> Result<[u8; 32], Abort<Id>> {
    msg_hash
        .try_into()
        .map_err(|_| Abort::new(ErrorKind::MessageMalformed, "ECDSA message hash must be exactly 32 bytes"))
}

/// Reduces a message hash to a scalar. Used for both the ECDSA challenge
/// `e` and, via a distinct domain tag, Schnorr/FROST challenge derivation.
///
/// 32-byte hashes are interpreted directly as the canonical scalar encoding
/// when that succeeds (the standard construction for curves whose order is
/// within one bit of 2^256); otherwise they are reduced via the group's
/// hash-to-scalar construction, which remains a valid (if non-standard)
/// binding of hash to scalar.
pub(crate) fn hash_to_scalar<G: crate::group::Group>(domain: &[u8], bytes: &[u8]) -> G::Scalar {
    if domain == b"ecdsa-e" {
        if let Ok(scalar) = G::decode_scalar(bytes) {
            return scalar;
        }
    }
    G::hash_to_scalar(domain, bytes)
}

/// An ECDSA signature over a Weierstrass curve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcdsaSignature<G: crate::group::WeierstrassGroup> {
    pub r: G::Scalar,
    pub s: G::Scalar,
}

impl<G: crate::group::WeierstrassGroup> EcdsaSignature<G> {
    /// Verifies the signature against `public_key` and `msg_hash` per the
    /// standard ECDSA verification equation.
    pub fn verify(&self, public_key: &G::Point, msg_hash: &[u8; 32]) -> bool {
        let Some(s_inv) = G::invert_scalar(&self.s) else {
            return false;
        };
        let e = hash_to_scalar::<G>(b"ecdsa-e", msg_hash);
        let u1 = G::mul_scalar(&e, &s_inv);
        let u2 = G::mul_scalar(&self.r, &s_inv);
        let candidate = G::add_points(&G::generator_mul(&u1), &G::point_mul(&u2, public_key));
        if G::is_identity(&candidate) {
            return false;
        }
        G::x_coordinate(&candidate) == self.r
    }
}

/// A Schnorr signature (FROST's output shape): a nonce commitment point and
/// the aggregated response scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchnorrSignature<G: crate::group::Group> {
    pub r_point: G::Point,
    pub s: G::Scalar,
}

impl<G: crate::group::Group> SchnorrSignature<G> {
    /// Verifies the signature against `public_key` and `msg` by recomputing
    /// the Fiat-Shamir challenge and checking `s*G == R + c*Y`.
    pub fn verify(&self, public_key: &G::Point, msg: &[u8]) -> bool {
        let c = schnorr_challenge::<G>(&self.r_point, public_key, msg);
        let lhs = G::generator_mul(&self.s);
        let rhs = G::add_points(&self.r_point, &G::point_mul(&c, public_key));
        lhs == rhs
    }
}

/// The Fiat-Shamir challenge binding a Schnorr nonce commitment, the group
/// public key, and the message, shared by FROST's signing round and
/// signature verification so the two stay in lockstep.
pub(crate) fn schnorr_challenge<G: crate::group::Group>(r_point: &G::Point, public_key: &G::Point, msg: &[u8]) -> G::Scalar {
    let mut transcript = Vec::with_capacity(64 + msg.len());
    transcript.extend_from_slice(&G::encode_point(r_point));
    transcript.extend_from_slice(&G::encode_point(public_key));
    transcript.extend_from_slice(msg);
    G::hash_to_scalar(b"frost-challenge", &transcript)
}
