use alloc::{vec, vec::Vec};

use k256::{
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

/// The secp256k1 curve, as used by Bitcoin/Ethereum-style ECDSA and by the
/// DYN re-sharing protocol (the only curve it is fully exercised against).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Secp256k1;

impl Group for Secp256k1 {
    type Scalar = Scalar;
    type Point = ProjectivePoint;

    fn name() -> &'static str {
        "secp256k1"
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
        let encoded = k256::EncodedPoint::from_bytes(bytes)
            .map_err(|error| LocalError::new(alloc::format!("invalid secp256k1 point encoding: {error}")))?;
        let affine = Option::<AffinePoint>::from(AffinePoint::from_encoded_point(&encoded))
            .ok_or_else(|| LocalError::new("secp256k1 point is not on the curve"))?;
        Ok(ProjectivePoint::from(affine))
    }

    fn encode_scalar(scalar: &Self::Scalar) -> Vec<u8> {
        scalar.to_repr().to_vec()
    }

    fn decode_scalar(bytes: &[u8]) -> Result<Self::Scalar, LocalError> {
        if bytes.len() != 32 {
            return Err(LocalError::new("secp256k1 scalar must be 32 bytes"));
        }
        let mut repr = <Scalar as PrimeField>::Repr::default();
        repr.as_mut().copy_from_slice(bytes);
        Option::from(Scalar::from_repr(repr)).ok_or_else(|| LocalError::new("secp256k1 scalar out of range"))
    }
}

impl WeierstrassGroup for Secp256k1 {
    fn x_coordinate(point: &Self::Point) -> Self::Scalar {
        let affine = point.to_affine();
        let encoded = affine.to_encoded_point(false);
        let x_bytes = encoded.x().expect("non-identity point has an x-coordinate");
        let mut padded = vec![0u8; 32];
        padded.copy_from_slice(x_bytes);
        <Scalar as Reduce<U256>>::reduce_bytes(padded.as_slice().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_mul_matches_point_mul_of_one() {
        let one = <Secp256k1 as Group>::one_scalar();
        assert_eq!(
            <Secp256k1 as Group>::generator_mul(&one),
            <Secp256k1 as Group>::point_mul(&one, &<Secp256k1 as Group>::generator_mul(&one))
        );
    }

    #[test]
    fn point_roundtrips_through_encoding() {
        let scalar = <Secp256k1 as Group>::one_scalar() + <Secp256k1 as Group>::one_scalar();
        let point = <Secp256k1 as Group>::generator_mul(&scalar);
        let encoded = <Secp256k1 as Group>::encode_point(&point);
        let decoded = <Secp256k1 as Group>::decode_point(&encoded).unwrap();
        assert_eq!(point, decoded);
    }
}
