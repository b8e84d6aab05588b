use alloc::{vec, vec::Vec};

use p256::{
    elliptic_curve::{
        group::GroupEncoding,
        ops::Reduce,
        sec1::{FromEncodedPoint, ToEncodedPoint},
        Field, PrimeField,
    },
    AffinePoint, ProjectivePoint, Scalar, U256,
};
use rand_core::CryptoRngCore;
use sha2::{Digest as Sha2Digest, Sha256};

use super::{Group, WeierstrassGroup};
use crate::error::LocalError;

/// NIST P-256, supported for the FROST Schnorr family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct P256;

impl Group for P256 {
    type Scalar = Scalar;
    type Point = ProjectivePoint;

    fn name() -> &'static str {
        "p256"
    }

    fn zero_scalar() -> Self::Scalar {
        Scalar::ZERO
    }

    fn one_scalar() -> Self::Scalar {
        Scalar::ONE
    }

    fn is_zero_scalar(scalar: &Self::Scalar) -> bool {
        bool::from(scalar.is_zero())
    }

    fn random_scalar(rng: &mut dyn CryptoRngCore) -> Self::Scalar {
        loop {
            let candidate = Scalar::random(&mut *rng);
            if !bool::from(candidate.is_zero()) {
                return candidate;
            }
        }
    }

    fn add_scalar(a: &Self::Scalar, b: &Self::Scalar) -> Self::Scalar {
        a + b
    }

    fn sub_scalar(a: &Self::Scalar, b: &Self::Scalar) -> Self::Scalar {
        a - b
    }

    fn mul_scalar(a: &Self::Scalar, b: &Self::Scalar) -> Self::Scalar {
        a * b
    }

    fn negate_scalar(a: &Self::Scalar) -> Self::Scalar {
        -a
    }

    fn invert_scalar(a: &Self::Scalar) -> Option<Self::Scalar> {
        Option::from(a.invert())
    }

    fn hash_to_scalar(domain: &[u8], bytes: &[u8]) -> Self::Scalar {
        let digest = Sha256::new_with_prefix(domain).chain_update(bytes).finalize();
        <Scalar as Reduce<U256>>::reduce_bytes(&digest.into())
    }

    fn identity_point() -> Self::Point {
        ProjectivePoint::IDENTITY
    }

    fn is_identity(point: &Self::Point) -> bool {
        bool::from(point.is_identity())
    }

    fn add_points(a: &Self::Point, b: &Self::Point) -> Self::Point {
        a + b
    }

    fn generator_mul(scalar: &Self::Scalar) -> Self::Point {
        ProjectivePoint::GENERATOR * scalar
    }

    fn point_mul(scalar: &Self::Scalar, point: &Self::Point) -> Self::Point {
        point * scalar
    }

    fn encode_point(point: &Self::Point) -> Vec<u8> {
        point.to_affine().to_encoded_point(true).as_bytes().to_vec()
    }

    fn decode_point(bytes: &[u8]) -> Result<Self::Point, LocalError> {
        let encoded = p256::EncodedPoint::from_bytes(bytes)
            .map_err(|error| LocalError::new(alloc::format!("invalid p256 point encoding: {error}")))?;
        let affine = Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
            .ok_or_else(|| LocalError::new("p256 point is not on the curve"))?;
        Ok(ProjectivePoint::from(affine))
    }

    fn encode_scalar(scalar: &Self::Scalar) -> Vec<u8> {
        scalar.to_repr().to_vec()
    }

    fn decode_scalar(bytes: &[u8]) -> Result<Self::Scalar, LocalError> {
        if bytes.len() != 32 {
            return Err(LocalError::new("p256 scalar must be 32 bytes"));
        }
        let mut repr = <Scalar as PrimeField>::Repr::default();
        repr.as_mut().copy_from_slice(bytes);
        Option::from(Scalar::from_repr(repr)).ok_or_else(|| LocalError::new("p256 scalar out of range"))
    }
}

impl WeierstrassGroup for P256 {
    fn x_coordinate(point: &Self::Point) -> Self::Scalar {
        let affine = point.to_affine();
        let encoded = affine.to_encoded_point(false);
        let x_bytes = encoded.x().expect("non-identity point has an x-coordinate");
        let mut padded = vec![0u8; 32];
        padded.copy_from_slice(x_bytes);
        <Scalar as Reduce<U256>>::reduce_bytes(padded.as_slice().into())
    }
}
