/*!
Secret-sharing polynomials and their Feldman/Pedersen commitment vectors.

Grounded on the VSS shape used throughout `key-share`/`cggmp21-keygen`'s DKG
rounds: a degree `t-1` polynomial with a distinguished constant term (the
secret), evaluated at party scalars, with a public commitment vector that
lets any recipient check its share against the polynomial without learning
the other coefficients.
*/

use alloc::vec::Vec;

use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use super::Group;

/// A secret-sharing polynomial of degree `threshold - 1`.
///
/// `coefficients[0]` is the distinguished constant term (the shared secret,
/// or — for a party in `NEW`-only during DYN resharing — zero).
#[derive(Debug, Clone)]
pub struct Polynomial<G: Group> {
    coefficients: Vec<G::Scalar>,
}

impl<G: Group> Polynomial<G> {
    /// Samples a random polynomial of degree `threshold - 1` with the given
    /// constant term.
    pub fn sample(rng: &mut dyn CryptoRngCore, threshold: usize, constant_term: G::Scalar) -> Self {
        let mut coefficients = Vec::with_capacity(threshold);
        coefficients.push(constant_term);
        for _ in 1..threshold {
            coefficients.push(G::random_scalar(rng));
        }
        Self { coefficients }
    }

    /// The identity polynomial: every coefficient, including the constant
    /// term, is zero. Used by parties in `NEW`-only during DYN resharing,
    /// which contribute no secret material but still participate in the
    /// transcript.
    pub fn zero(threshold: usize) -> Self {
        Self {
            coefficients: alloc::vec![G::zero_scalar(); threshold],
        }
    }

    /// The polynomial's degree bound (number of coefficients).
    pub fn threshold(&self) -> usize {
        self.coefficients.len()
    }

    /// The constant term, `f(0)`.
    pub fn constant_term(&self) -> &G::Scalar {
        &self.coefficients[0]
    }

    /// Evaluates the polynomial at `x` via Horner's method.
    pub fn eval(&self, x: &G::Scalar) -> G::Scalar {
        let mut acc = G::zero_scalar();
        for coeff in self.coefficients.iter().rev() {
            acc = G::add_scalar(&G::mul_scalar(&acc, x), coeff);
        }
        acc
    }

    /// The Feldman commitment vector `{g^{a_k}}` for `k = 0..threshold`.
    pub fn commit(&self) -> CommitmentVector<G> {
        CommitmentVector {
            points: self.coefficients.iter().map(G::generator_mul).collect(),
        }
    }
}

/// A Feldman commitment vector: `{g^{a_k} : k = 0..degree}`.
///
/// Lets a recipient of a share `f(x_j)` verify it against the sender's
/// public commitments, without learning `f`'s other coefficients, via
/// `g^{f(x_j)} == product_k (C_k)^{x_j^k}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct CommitmentVector<G: Group> {
    points: Vec<G::Point>,
}

impl<G: Group> CommitmentVector<G> {
    /// The number of coefficients committed to (the degree bound it was built from).
    pub fn degree(&self) -> usize {
        self.points.len()
    }

    /// The constant-term commitment, `C_0 = g^{f(0)}`.
    pub fn constant_term_commitment(&self) -> &G::Point {
        &self.points[0]
    }

    /// Evaluates the committed polynomial "in the exponent" at `x`, i.e.
    /// computes `g^{f(x)}` from the commitment vector alone.
    pub fn eval_in_exponent(&self, x: &G::Scalar) -> G::Point {
        let mut acc = G::identity_point();
        let mut power = G::one_scalar();
        for point in &self.points {
            let term = G::point_mul(&power, point);
            acc = G::add_points(&acc, &term);
            power = G::mul_scalar(&power, x);
        }
        acc
    }

    /// Checks that a given share `f(x)` is consistent with this commitment
    /// vector, i.e. `g^{share} == eval_in_exponent(x)`.
    pub fn verify_share(&self, x: &G::Scalar, share: &G::Scalar) -> bool {
        G::generator_mul(share) == self.eval_in_exponent(x)
    }

    /// Componentwise sum of several commitment vectors of the same degree
    /// (used to aggregate every OLD party's commitments into the public
    /// share of a new party during DYN resharing).
    pub fn sum(vectors: &[CommitmentVector<G>]) -> Option<CommitmentVector<G>> {
        let degree = vectors.first()?.points.len();
        if vectors.iter().any(|v| v.points.len() != degree) {
            return None;
        }
        let mut points = alloc::vec![G::identity_point(); degree];
        for vector in vectors {
            for (acc, point) in points.iter_mut().zip(vector.points.iter()) {
                *acc = G::add_points(acc, point);
            }
        }
        Some(CommitmentVector { points })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Secp256k1;

    #[test]
    fn share_verifies_against_commitment() {
        let rng = &mut rand_core::OsRng;
        let secret = Secp256k1::random_scalar(rng);
        let poly = Polynomial::<Secp256k1>::sample(rng, 3, secret);
        let commitment = poly.commit();
        let x = Secp256k1::random_scalar(rng);
        let share = poly.eval(&x);
        assert!(commitment.verify_share(&x, &share));

        let wrong_share = Secp256k1::add_scalar(&share, &Secp256k1::one_scalar());
        assert!(!commitment.verify_share(&x, &wrong_share));
    }

    #[test]
    fn constant_term_commitment_matches_secret() {
        let rng = &mut rand_core::OsRng;
        let secret = Secp256k1::random_scalar(rng);
        let poly = Polynomial::<Secp256k1>::sample(rng, 2, secret.clone());
        let commitment = poly.commit();
        assert_eq!(commitment.constant_term_commitment(), &Secp256k1::generator_mul(&secret));
    }
}
