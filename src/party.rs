/*!
Party identifiers and ordered participant sets.

Grounded on `manul::protocol::round::{PartyId, IdSet}`: a trait alias bundling
the bounds the engine needs from an identifier type, plus a quorum-aware set
used to describe what a round expects.
*/

use alloc::collections::BTreeSet;
use core::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::group::Group;

/// A trait alias for the bounds an opaque party identifier must satisfy.
///
/// Two distinct identifiers must embed to distinct nonzero scalars (see
/// [`embed_scalar`]); beyond that this crate does not care what an `Id`
/// actually is (a public key, a short string, a UUID).
pub trait PartyId: 'static + Debug + Clone + Ord + Send + Sync + Serialize + for<'de> Deserialize<'de> {}

impl<T> PartyId for T where T: 'static + Debug + Clone + Ord + Send + Sync + Serialize + for<'de> Deserialize<'de> {}

/// Deterministically embeds a party identifier into a nonzero scalar of `G`.
///
/// The embedding hashes the identifier's canonical bytes with the group's
/// hash-to-scalar construction and rejects (by incrementing a counter) the
/// vanishingly unlikely case of a zero result, so the embedding is total and
/// injective in practice.
pub fn embed_scalar<G: Group>(id_bytes: &[u8]) -> G::Scalar {
    let mut counter: u32 = 0;
    loop {
        let mut buf = alloc::vec::Vec::with_capacity(id_bytes.len() + 4);
        buf.extend_from_slice(id_bytes);
        buf.extend_from_slice(&counter.to_be_bytes());
        let scalar = G::hash_to_scalar(b"party-id", &buf);
        if !G::is_zero_scalar(&scalar) {
            return scalar;
        }
        counter += 1;
    }
}

/// A set of party IDs together with a quorum condition.
///
/// Ported from `manul::protocol::round::IdSet`: a round's
/// `communication_info` names the IDs it expects messages from together with
/// how many of them constitute a quorum, so the engine can finalize as soon
/// as a threshold-many answers are in rather than waiting for all of them.
#[derive(Debug, Clone)]
pub struct IdSet<Id> {
    ids: BTreeSet<Id>,
    threshold: usize,
}

impl<Id: Ord + Clone> IdSet<Id> {
    /// Every member of `ids` must respond; this is the common case for
    /// keygen and for the DYN protocol, where partial participation is not
    /// supported.
    pub fn all(ids: BTreeSet<Id>) -> Self {
        let threshold = ids.len();
        Self { ids, threshold }
    }

    /// Any `threshold`-sized subset of `ids` constitutes a quorum. Used for
    /// the signing rounds, where only the chosen `signers` subset needs to
    /// respond once the round is addressed to exactly that set.
    pub fn threshold(ids: BTreeSet<Id>, threshold: usize) -> Self {
        Self { ids, threshold }
    }

    /// An empty set (a round that expects no messages, e.g. round 3 of DYN
    /// for a party in `OLD \ NEW`).
    pub fn empty() -> Self {
        Self {
            ids: BTreeSet::new(),
            threshold: 0,
        }
    }

    /// All IDs this set was constructed from.
    pub fn ids(&self) -> &BTreeSet<Id> {
        &self.ids
    }

    /// Whether `responded` constitutes a quorum for this set.
    pub fn is_quorum(&self, responded: &BTreeSet<Id>) -> bool {
        self.ids.intersection(responded).count() >= self.threshold
    }

    /// Whether a quorum is still reachable given that `banned` parties will
    /// never respond (or have been excluded as misbehaving).
    pub fn is_quorum_possible(&self, banned: &BTreeSet<Id>) -> bool {
        let still_possible = self.ids.difference(banned).count();
        still_possible >= self.threshold
    }
}

/// Embeds a party identifier into a nonzero scalar of `G`, using the
/// identifier's canonical wire encoding as the bytes to embed.
///
/// Any two `Serialize` values that compare unequal produce different wire
/// bytes (postcard is a deterministic encoding), so this is injective
/// whenever `PartyId`'s `Ord`/`Serialize` agree, which every `Id` this crate
/// accepts must satisfy.
pub fn id_scalar<G: Group, Id: PartyId>(id: &Id) -> G::Scalar {
    let bytes = postcard::to_allocvec(id).unwrap_or_default();
    embed_scalar::<G>(&bytes)
}

/// An ordered, deduplicated participant list with a traversal order that
/// depends only on the identifiers themselves (never on insertion history).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartySet<Id>(BTreeSet<Id>);

impl<Id: PartyId> PartySet<Id> {
    /// Builds a party set, deduplicating the input.
    pub fn new(ids: impl IntoIterator<Item = Id>) -> Self {
        Self(ids.into_iter().collect())
    }

    /// Deterministic iteration order (ascending by `Ord`).
    pub fn iter(&self) -> impl Iterator<Item = &Id> {
        self.0.iter()
    }

    /// Number of distinct parties.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set has no parties.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `id` is a member.
    pub fn contains(&self, id: &Id) -> bool {
        self.0.contains(id)
    }

    /// Whether `other` is a subset of this set.
    pub fn is_superset_of(&self, other: &PartySet<Id>) -> bool {
        self.0.is_superset(&other.0)
    }

    pub(crate) fn as_btree_set(&self) -> &BTreeSet<Id> {
        &self.0
    }
}

/// Computes the Lagrange coefficient `lambda_j` such that, for any set of
/// `t` distinct evaluation points including `x_j`, `sum_j lambda_j * f(x_j)
/// == f(0)` for a polynomial `f` of degree less than `t`.
pub fn lagrange_coefficient<G: Group>(x_j: &G::Scalar, other_xs: &[G::Scalar]) -> G::Scalar {
    let mut numerator = G::one_scalar();
    let mut denominator = G::one_scalar();
    for x_m in other_xs {
        if x_m == x_j {
            continue;
        }
        numerator = G::mul_scalar(&numerator, x_m);
        let diff = G::sub_scalar(x_m, x_j);
        denominator = G::mul_scalar(&denominator, &diff);
    }
    let inv_denominator = G::invert_scalar(&denominator).expect("evaluation points are distinct");
    G::mul_scalar(&numerator, &inv_denominator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Secp256k1;

    #[test]
    fn distinct_ids_embed_to_distinct_scalars() {
        let a = embed_scalar::<Secp256k1>(b"party-a");
        let b = embed_scalar::<Secp256k1>(b"party-b");
        assert_ne!(a, b);
    }

    #[test]
    fn id_set_quorum() {
        let ids: BTreeSet<u32> = [1, 2, 3, 4, 5].into_iter().collect();
        let set = IdSet::threshold(ids, 3);
        let responded: BTreeSet<u32> = [1, 2].into_iter().collect();
        assert!(!set.is_quorum(&responded));
        let responded: BTreeSet<u32> = [1, 2, 5].into_iter().collect();
        assert!(set.is_quorum(&responded));
    }
}
