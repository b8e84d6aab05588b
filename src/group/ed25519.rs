use alloc::vec::Vec;

use curve25519_dalek::{
    constants::ED25519_BASEPOINT_POINT,
    edwards::{CompressedEdwardsY, EdwardsPoint},
    scalar::Scalar as DalekScalar,
};
use rand_core::CryptoRngCore;
use sha2::{Digest as Sha2Digest, Sha512};

use super::Group;
use crate::error::LocalError;

/// Edwards25519, used by the FROST Schnorr family in its EdDSA-compatible form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ed25519;

impl Group for Ed25519 {
    type Scalar = DalekScalar;
    type Point = EdwardsPoint;

    fn name() -> &'static str {
        "ed25519"
    }

    fn zero_scalar() -> Self::Scalar {
        DalekScalar::ZERO
    }

    fn one_scalar() -> Self::Scalar {
        DalekScalar::ONE
    }

    fn is_zero_scalar(scalar: &Self::Scalar) -> bool {
        *scalar == DalekScalar::ZERO
    }

    fn random_scalar(rng: &mut dyn CryptoRngCore) -> Self::Scalar {
        loop {
            let mut bytes = [0u8; 64];
            rng.fill_bytes(&mut bytes);
            let candidate = DalekScalar::from_bytes_mod_order_wide(&bytes);
            if candidate != DalekScalar::ZERO {
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
        if *a == DalekScalar::ZERO {
            None
        } else {
            Some(a.invert())
        }
    }

    fn hash_to_scalar(domain: &[u8], bytes: &[u8]) -> Self::Scalar {
        let digest = Sha512::new_with_prefix(domain).chain_update(bytes).finalize();
        let mut wide = [0u8; 64];
        wide.copy_from_slice(&digest);
        DalekScalar::from_bytes_mod_order_wide(&wide)
    }

    fn identity_point() -> Self::Point {
        EdwardsPoint::default()
    }

    fn is_identity(point: &Self::Point) -> bool {
        *point == EdwardsPoint::default()
    }

    fn add_points(a: &Self::Point, b: &Self::Point) -> Self::Point {
        a + b
    }

    fn generator_mul(scalar: &Self::Scalar) -> Self::Point {
        scalar * ED25519_BASEPOINT_POINT
    }

    fn point_mul(scalar: &Self::Scalar, point: &Self::Point) -> Self::Point {
        scalar * point
    }

    fn encode_point(point: &Self::Point) -> Vec<u8> {
        point.compress().to_bytes().to_vec()
    }

    fn decode_point(bytes: &[u8]) -> Result<Self::Point, LocalError> {
        if bytes.len() != 32 {
            return Err(LocalError::new("ed25519 point must be 32 bytes"));
        }
        let mut buf = [0u8; 32];
        buf.copy_from_slice(bytes);
        CompressedEdwardsY(buf)
            .decompress()
            .ok_or_else(|| LocalError::new("ed25519 point is not on the curve"))
    }

    fn encode_scalar(scalar: &Self::Scalar) -> Vec<u8> {
        scalar.to_bytes().to_vec()
    }

    fn decode_scalar(bytes: &[u8]) -> Result<Self::Scalar, LocalError> {
        if bytes.len() != 32 {
            return Err(LocalError::new("ed25519 scalar must be 32 bytes"));
        }
        let mut buf = [0u8; 32];
        buf.copy_from_slice(bytes);
        Option::from(DalekScalar::from_canonical_bytes(buf)).ok_or_else(|| LocalError::new("ed25519 scalar out of range"))
    }
}
