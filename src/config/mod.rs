/*!
Long-term per-party key material: the only object that survives across
sessions.

Grounded on `key-share`'s share/public-share invariants and `synedrion`'s
`KeyShare` field layout, expressed as a Rust sum type over the three
families per `SPEC_FULL.md` §7 (the source's interface-typed Config becomes
an enum here, following the re-architecture note in spec's design notes).
*/

mod cgg21;
mod dyn_config;
mod frost;

pub use cgg21::{Cgg21Aux, Cgg21Config, Cgg21ConfigWire};
pub use dyn_config::{DynConfig, DynConfigWire};
pub use frost::{FrostConfig, FrostConfigWire};

use alloc::{collections::BTreeMap, string::String, vec::Vec};

use serde::{Deserialize, Serialize};
use serde_encoded_bytes::{Base64, SliceLike};
use zeroize::Zeroizing;

use crate::{
    error::{Abort, ErrorKind, LocalError},
    group::Group,
    party::{lagrange_coefficient, PartyId},
};

/// The chassis fields every family's Config shares, per spec §3 "Config".
#[derive(Debug, Clone)]
pub struct ConfigCore<Id, G: Group> {
    pub id: Id,
    pub threshold: usize,
    pub generation: u64,
    pub private_share: Zeroizing<G::Scalar>,
    pub public_shares: BTreeMap<Id, G::Point>,
    pub chain_key: [u8; 32],
    pub rid: [u8; 32],
    /// Set only on a Config produced by [`crate::rollback::RollbackManager::rollback`]:
    /// the generation this Config was rolled back from.
    pub rollback_from: Option<u64>,
}

impl<Id: PartyId, G: Group> ConfigCore<Id, G> {
    /// Checks the invariants spec §3 assigns to `Validate`, except the
    /// group-public-key reconstruction check, which requires knowing the
    /// fixed `Y` and is checked by [`Config::validate`] against the family
    /// wrapper's stored `public_key`.
    pub fn validate_shape(&self) -> Result<(), Abort<Id>> {
        if self.threshold == 0 || self.threshold > self.public_shares.len() {
            return Err(Abort::new(
                ErrorKind::InvalidThreshold,
                "threshold must be in [1, |public_shares|]",
            ));
        }
        if G::is_zero_scalar(&self.private_share) {
            return Err(Abort::with_culprit(
                ErrorKind::VerificationFailed,
                self.id.clone(),
                "private share is zero",
            ));
        }
        if !self.public_shares.contains_key(&self.id) {
            return Err(Abort::new(
                ErrorKind::InvalidParticipants,
                "own id missing from public_shares",
            ));
        }
        for (id, point) in &self.public_shares {
            if G::is_identity(point) {
                return Err(Abort::with_culprit(
                    ErrorKind::VerificationFailed,
                    id.clone(),
                    "public share is the identity point",
                ));
            }
        }
        Ok(())
    }

    /// Reconstructs the group public key from any `threshold`-sized subset
    /// of `public_shares`, per spec §3's defining Config invariant. Returns
    /// `None` if fewer than `threshold` shares are available.
    pub fn reconstruct_public_key(&self) -> Option<G::Point> {
        if self.public_shares.len() < self.threshold {
            return None;
        }
        let chosen: Vec<(Id, G::Point)> = self
            .public_shares
            .iter()
            .take(self.threshold)
            .map(|(id, point)| (id.clone(), point.clone()))
            .collect();
        let xs: Vec<G::Scalar> = chosen
            .iter()
            .map(|(id, _)| crate::party::id_scalar::<G, Id>(id))
            .collect();
        let mut acc = G::identity_point();
        for (x_j, (_, p_j)) in xs.iter().zip(chosen.iter()) {
            let lambda = lagrange_coefficient::<G>(x_j, &xs);
            acc = G::add_points(&acc, &G::point_mul(&lambda, p_j));
        }
        Some(acc)
    }
}

/// A family-tagged Config, the sum type spec's design notes call for in
/// place of the source's interface-typed `Config`.
#[derive(Debug, Clone)]
pub enum Config<Id, G: Group> {
    Cgg21(Cgg21Config<Id, G>),
    Frost(FrostConfig<Id, G>),
    Dyn(DynConfig<Id, G>),
}

impl<Id: PartyId, G: Group> Config<Id, G> {
    pub fn core(&self) -> &ConfigCore<Id, G> {
        match self {
            Config::Cgg21(config) => &config.core,
            Config::Frost(config) => &config.core,
            Config::Dyn(config) => &config.core,
        }
    }

    pub fn group_public_key(&self) -> &G::Point {
        match self {
            Config::Cgg21(config) => &config.public_key,
            Config::Frost(config) => &config.public_key,
            Config::Dyn(config) => &config.public_key,
        }
    }

    /// Full validation per spec §3: shape invariants plus the defining
    /// "reconstruction equals `Y`" check.
    pub fn validate(&self) -> Result<(), Abort<Id>> {
        let core = self.core();
        core.validate_shape()?;
        let reconstructed = core
            .reconstruct_public_key()
            .ok_or_else(|| Abort::new(ErrorKind::InvalidParticipants, "not enough public shares to reconstruct Y"))?;
        if &reconstructed != self.group_public_key() {
            return Err(Abort::new(
                ErrorKind::VerificationFailed,
                "reconstructed public key does not match the Config's Y",
            ));
        }
        Ok(())
    }

    /// Two Configs are compatible for signing iff same group (guaranteed by
    /// both sharing the type parameter `G`), same `Y`, same generation
    /// (spec §4.5 "Compatibility").
    pub fn compatible_with(&self, other: &Self) -> Result<(), Abort<Id>> {
        if self.core().generation != other.core().generation {
            return Err(Abort::new(
                ErrorKind::MixedGeneration,
                alloc::format!(
                    "generation mismatch: {} vs {}",
                    self.core().generation,
                    other.core().generation
                ),
            ));
        }
        if self.group_public_key() != other.group_public_key() {
            return Err(Abort::new(ErrorKind::InvalidParticipants, "Configs disagree on Y"));
        }
        Ok(())
    }
}

/// A base64-on-the-wire byte string, matching the `SliceLike::<Base64>`
/// pattern `manul` uses for its own serialized evidence blobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct B64Bytes(#[serde(with = "SliceLike::<Base64>")] Box<[u8]>);

impl B64Bytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for B64Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into_boxed_slice())
    }
}

/// The pure-data, base64-encoded wire form of [`ConfigCore`], matching
/// spec §6's "Config serialization" field order exactly. Family Configs
/// embed this plus their own auxiliary fields (see `cgg21`/`frost`/`dyn_config`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigCoreWire<Id> {
    pub id: Id,
    pub threshold: usize,
    pub generation: u64,
    pub private_share: B64Bytes,
    pub public: BTreeMap<String, B64Bytes>,
    pub chain_key: B64Bytes,
    pub rid: B64Bytes,
    pub rollback_from: Option<u64>,
}

impl<Id: PartyId> ConfigCoreWire<Id> {
    pub fn from_core<G: Group>(core: &ConfigCore<Id, G>) -> Result<Self, LocalError>
    where
        Id: core::fmt::Display + core::str::FromStr,
    {
        let public = core
            .public_shares
            .iter()
            .map(|(id, point)| (alloc::format!("{id}"), G::encode_point(point).into()))
            .collect();
        Ok(Self {
            id: core.id.clone(),
            threshold: core.threshold,
            generation: core.generation,
            private_share: G::encode_scalar(&core.private_share).into(),
            public,
            chain_key: core.chain_key.to_vec().into(),
            rid: core.rid.to_vec().into(),
            rollback_from: core.rollback_from,
        })
    }

    pub fn into_core<G: Group>(self) -> Result<ConfigCore<Id, G>, LocalError>
    where
        Id: core::fmt::Display + core::str::FromStr,
    {
        let private_share = Zeroizing::new(G::decode_scalar(self.private_share.as_slice())?);
        let mut public_shares = BTreeMap::new();
        for (id_str, bytes) in self.public {
            let id = id_str
                .parse::<Id>()
                .map_err(|_| LocalError::new("failed to parse party id in Config"))?;
            public_shares.insert(id, G::decode_point(bytes.as_slice())?);
        }
        let chain_key = fixed_32(self.chain_key.as_slice())?;
        let rid = fixed_32(self.rid.as_slice())?;
        Ok(ConfigCore {
            id: self.id,
            threshold: self.threshold,
            generation: self.generation,
            private_share,
            public_shares,
            chain_key,
            rid,
            rollback_from: self.rollback_from,
        })
    }
}

fn fixed_32(bytes: &[u8]) -> Result<[u8; 32], LocalError> {
    bytes
        .try_into()
        .map_err(|_| LocalError::new(alloc::format!("expected 32 bytes, got {}", bytes.len())))
}
