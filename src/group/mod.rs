/*!
The abstract group interface the round engine and the families build on.

Everything above this module treats a [`Group`] as a value: a curve name,
scalar/point arithmetic, sampling, and canonical encoding. The concrete
elliptic-curve math lives in the three submodules, one per supported curve;
none of it is re-derived here, it is delegated to `k256`, `p256`, and
`curve25519-dalek`/`ed25519-dalek`, matching how `synedrion` leans on the
same crates for its curve backend.
*/

mod ed25519;
mod p256;
mod polynomial;
mod secp256k1;

pub use ed25519::Ed25519;
pub use p256::P256;
pub use polynomial::{CommitmentVector, Polynomial};
pub use secp256k1::Secp256k1;

use alloc::{string::String, vec::Vec};
use core::fmt::Debug;

use rand_core::CryptoRngCore;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::LocalError;

/// A named prime-order group: scalar/point algebra, sampling, and canonical
/// encoding, as required by spec's "Group" entity.
///
/// Implemented for [`Secp256k1`], [`P256`], and [`Ed25519`]. Only
/// `Secp256k1` is fully exercised by the DYN re-sharing family (per spec,
/// DYN is only required to be exercised over that curve), but all three
/// support keygen/sign for their respective families.
pub trait Group: 'static + Debug + Clone + Send + Sync {
    /// A scalar value modulo the group order.
    type Scalar: Clone + Debug + Eq + Send + Sync + Serialize + DeserializeOwned + zeroize::Zeroize;
    /// A point on the curve (or, for Ed25519, on the twisted Edwards curve).
    type Point: Clone + Debug + Eq + Send + Sync + Serialize + DeserializeOwned;

    /// The group's canonical name, used to check two `Config`s agree on curve
    /// (part of the "same group name" compatibility check in spec §4.5).
    fn name() -> &'static str;

    /// The additive identity of the scalar field.
    fn zero_scalar() -> Self::Scalar;

    /// The multiplicative identity of the scalar field.
    fn one_scalar() -> Self::Scalar;

    /// Whether a scalar is the additive identity.
    fn is_zero_scalar(scalar: &Self::Scalar) -> bool;

    /// Samples a uniformly random nonzero scalar.
    fn random_scalar(rng: &mut dyn CryptoRngCore) -> Self::Scalar;

    fn add_scalar(a: &Self::Scalar, b: &Self::Scalar) -> Self::Scalar;
    fn sub_scalar(a: &Self::Scalar, b: &Self::Scalar) -> Self::Scalar;
    fn mul_scalar(a: &Self::Scalar, b: &Self::Scalar) -> Self::Scalar;
    fn negate_scalar(a: &Self::Scalar) -> Self::Scalar;

    /// Multiplicative inverse; `None` for the zero scalar.
    fn invert_scalar(a: &Self::Scalar) -> Option<Self::Scalar>;

    /// Deterministically maps a domain-separated byte string to a scalar
    /// (used for the party-ID embedding in [`crate::party::embed_scalar`]
    /// and for Fiat-Shamir-style challenge derivation).
    fn hash_to_scalar(domain: &[u8], bytes: &[u8]) -> Self::Scalar;

    /// The group's identity point.
    fn identity_point() -> Self::Point;

    /// Whether a point is the identity.
    fn is_identity(point: &Self::Point) -> bool;

    fn add_points(a: &Self::Point, b: &Self::Point) -> Self::Point;

    /// `scalar * generator`.
    fn generator_mul(scalar: &Self::Scalar) -> Self::Point;

    /// `scalar * point`.
    fn point_mul(scalar: &Self::Scalar, point: &Self::Point) -> Self::Point;

    /// Canonical (compressed) encoding of a point.
    fn encode_point(point: &Self::Point) -> Vec<u8>;

    /// Decodes a canonically-encoded point.
    fn decode_point(bytes: &[u8]) -> Result<Self::Point, LocalError>;

    /// Canonical encoding of a scalar (fixed width, big-endian).
    fn encode_scalar(scalar: &Self::Scalar) -> Vec<u8>;

    /// Decodes a canonically-encoded scalar.
    fn decode_scalar(bytes: &[u8]) -> Result<Self::Scalar, LocalError>;
}

/// Curves that support extracting an x-coordinate scalar from a point, as
/// required by ECDSA's `r` component. Only the two Weierstrass curves
/// implement this; calling it for Ed25519 is not meaningful and is simply
/// not offered.
pub trait WeierstrassGroup: Group {
    /// Extracts the x-coordinate of `point`, reduced modulo the scalar
    /// field order (ECDSA's `r`).
    fn x_coordinate(point: &Self::Point) -> Self::Scalar;
}

/// Returns the group's name as a `String`, for inclusion in error messages
/// and serialized `Config`s that need a human-readable curve tag.
pub fn group_name<G: Group>() -> String {
    String::from(G::name())
}
