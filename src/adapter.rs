/*!
A capability-typed surface unifying the three families behind one
`keygen`/`sign`/`refresh` API.

Grounded on `mpc-sdk-framework`'s multi-backend driver: that crate fronts
`synedrion` plus several `frost-*` crates behind a single signer trait,
dispatching to whichever backend a session's key material names. Here the
three families are distinguished by a zero-sized marker type
([`Cgg21`](crate::families::cgg21::Cgg21), [`Frost`](crate::families::frost::Frost),
[`Dyn`]) implementing [`ThresholdProtocol`], each producing and consuming its
own native `Config` while exposing the same entry-point-returning methods.
*/

use alloc::{collections::BTreeSet, vec::Vec};

use crate::{
    config::{Cgg21Config, DynConfig, FrostConfig},
    error::LocalError,
    families::{cgg21, dyn_family, frost},
    group::{Group, WeierstrassGroup},
    party::PartyId,
};

/// A short, stable identifier for a signing scheme, as spec §6's wire
/// messages use for their "protocol id" field (e.g. `"cgg21/sign"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeId {
    Cgg21,
    Frost,
    Dyn,
}

impl SchemeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemeId::Cgg21 => "cgg21",
            SchemeId::Frost => "frost",
            SchemeId::Dyn => "dyn",
        }
    }
}

/// Zero-sized marker identifying the DYN family in this adapter. DYN has no
/// signing operation of its own (see [`ThresholdProtocol::sign`]'s default),
/// only [`ThresholdProtocol::refresh`].
#[derive(Debug, Clone, Copy)]
pub struct Dyn;

/// A capability-typed wrapper over one family's native `Config`, presenting
/// the common `keygen`/`sign`/`refresh` surface spec §4.6 calls for.
///
/// Each family implements this for its own marker type, parameterized over
/// the identifier and group types shared across the adapter. `keygen`/
/// `sign`/`refresh` return the family's own concrete `EntryPoint` type
/// (via associated types) rather than a shared enum, since CGG21's entry
/// points need `WeierstrassGroup` where FROST's and DYN's only need `Group`.
pub trait ThresholdProtocol<Id: PartyId, G: Group> {
    /// This family's native per-party Config.
    type Config;

    /// This family's signature output. `Dyn` has none (its only operation is
    /// `refresh`), so it sets this to `()`.
    type Signature;

    /// The entry point `keygen` returns.
    type KeygenEntryPoint;

    /// The entry point `sign` returns.
    type SignEntryPoint;

    /// Builds the entry point for a fresh keygen session.
    fn keygen(own_id: Id, parties: BTreeSet<Id>, threshold: usize) -> Result<Self::KeygenEntryPoint, LocalError>;

    /// Builds the entry point for a direct-signing session over this
    /// family's Config, if this family supports signing directly (CGG21 and
    /// FROST do; DYN does not and returns an error).
    fn sign(config: Self::Config, signers: BTreeSet<Id>, message: Vec<u8>) -> Result<Self::SignEntryPoint, LocalError>;

    /// Builds the entry point for a re-sharing ("refresh") session over this
    /// family's Config, if this family supports it (DYN does; CGG21 and
    /// FROST do not — a caller wanting to reshare a CGG21/FROST Config
    /// should project it onto a `DynConfig` first, per this module's docs).
    fn refresh(
        config: Self::Config,
        new_parties: BTreeSet<Id>,
        new_threshold: usize,
    ) -> Result<dyn_family::ReshareEntryPoint<Id, G>, LocalError>;

    fn scheme() -> SchemeId;

    /// Whether this family supports live committee re-sharing without
    /// reconstructing the shared secret. Only `Dyn` does.
    fn supports_resharing() -> bool;
}

impl<Id: PartyId, G: WeierstrassGroup> ThresholdProtocol<Id, G> for cgg21::Cgg21 {
    type Config = Cgg21Config<Id, G>;
    type Signature = crate::families::EcdsaSignature<G>;
    type KeygenEntryPoint = cgg21::KeygenEntryPoint<Id, G>;
    type SignEntryPoint = cgg21::PresignEntryPoint<Id, G>;

    fn keygen(own_id: Id, parties: BTreeSet<Id>, threshold: usize) -> Result<Self::KeygenEntryPoint, LocalError> {
        Ok(cgg21::KeygenEntryPoint::new(own_id, parties, threshold, alloc::collections::BTreeMap::new()))
    }

    fn sign(config: Self::Config, signers: BTreeSet<Id>, _message: Vec<u8>) -> Result<Self::SignEntryPoint, LocalError> {
        Ok(cgg21::PresignEntryPoint { config, signers })
    }

    fn refresh(
        _config: Self::Config,
        _new_parties: BTreeSet<Id>,
        _new_threshold: usize,
    ) -> Result<dyn_family::ReshareEntryPoint<Id, G>, LocalError> {
        Err(LocalError::new(
            "CGG21 Configs do not support direct resharing; project onto a DynConfig first",
        ))
    }

    fn scheme() -> SchemeId {
        SchemeId::Cgg21
    }

    fn supports_resharing() -> bool {
        false
    }
}

impl<Id: PartyId, G: Group> ThresholdProtocol<Id, G> for frost::Frost {
    type Config = FrostConfig<Id, G>;
    type Signature = crate::families::SchnorrSignature<G>;
    type KeygenEntryPoint = frost::KeygenEntryPoint<Id, G>;
    type SignEntryPoint = frost::SignEntryPoint<Id, G>;

    fn keygen(own_id: Id, parties: BTreeSet<Id>, threshold: usize) -> Result<Self::KeygenEntryPoint, LocalError> {
        Ok(frost::KeygenEntryPoint::new(own_id, parties, threshold))
    }

    fn sign(config: Self::Config, signers: BTreeSet<Id>, message: Vec<u8>) -> Result<Self::SignEntryPoint, LocalError> {
        Ok(frost::SignEntryPoint { config, signers, message })
    }

    fn refresh(
        _config: Self::Config,
        _new_parties: BTreeSet<Id>,
        _new_threshold: usize,
    ) -> Result<dyn_family::ReshareEntryPoint<Id, G>, LocalError> {
        Err(LocalError::new(
            "FROST Configs do not support direct resharing; project onto a DynConfig first",
        ))
    }

    fn scheme() -> SchemeId {
        SchemeId::Frost
    }

    fn supports_resharing() -> bool {
        false
    }
}

impl<Id: PartyId, G: Group> ThresholdProtocol<Id, G> for Dyn {
    type Config = DynConfig<Id, G>;
    type Signature = ();
    type KeygenEntryPoint = core::convert::Infallible;
    type SignEntryPoint = core::convert::Infallible;

    fn keygen(_own_id: Id, _parties: BTreeSet<Id>, _threshold: usize) -> Result<Self::KeygenEntryPoint, LocalError> {
        Err(LocalError::new(
            "DYN has no keygen of its own; run CGG21 or FROST keygen, then project onto a DynConfig",
        ))
    }

    fn sign(_config: Self::Config, _signers: BTreeSet<Id>, _message: Vec<u8>) -> Result<Self::SignEntryPoint, LocalError> {
        Err(LocalError::new("DYN does not support signing; its only operation is resharing"))
    }

    fn refresh(
        config: Self::Config,
        new_parties: BTreeSet<Id>,
        new_threshold: usize,
    ) -> Result<dyn_family::ReshareEntryPoint<Id, G>, LocalError> {
        Ok(dyn_family::ReshareEntryPoint {
            config,
            new_parties,
            new_threshold,
        })
    }

    fn scheme() -> SchemeId {
        SchemeId::Dyn
    }

    fn supports_resharing() -> bool {
        true
    }
}

/// Projects a CGG21 Config's chassis fields onto a DYN Config so its
/// committee can be reshaped by [`dyn_family::reshare`] without CGG21 ever
/// needing a resharing round of its own — the "same external contract,
/// different internal ingredients" convenience spec §9's redesign notes call
/// for as an alternative to the source's CMP-wrapped reshare variant.
pub fn project_cgg21_to_dyn<Id: PartyId, G: Group>(config: &Cgg21Config<Id, G>) -> DynConfig<Id, G> {
    DynConfig {
        core: config.core.clone(),
        public_key: config.public_key.clone(),
    }
}

/// Projects a FROST Config's chassis fields onto a DYN Config, mirroring
/// [`project_cgg21_to_dyn`].
pub fn project_frost_to_dyn<Id: PartyId, G: Group>(config: &FrostConfig<Id, G>) -> DynConfig<Id, G> {
    DynConfig {
        core: config.core.clone(),
        public_key: config.public_key.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Secp256k1;

    #[test]
    fn dyn_marker_reports_resharing_support() {
        assert!(<Dyn as ThresholdProtocol<u32, Secp256k1>>::supports_resharing());
        assert!(!<cgg21::Cgg21 as ThresholdProtocol<u32, Secp256k1>>::supports_resharing());
        assert!(!<frost::Frost as ThresholdProtocol<u32, Secp256k1>>::supports_resharing());
    }

    #[test]
    fn scheme_ids_are_distinct() {
        assert_eq!(<Dyn as ThresholdProtocol<u32, Secp256k1>>::scheme().as_str(), "dyn");
        assert_eq!(<cgg21::Cgg21 as ThresholdProtocol<u32, Secp256k1>>::scheme().as_str(), "cgg21");
        assert_eq!(<frost::Frost as ThresholdProtocol<u32, Secp256k1>>::scheme().as_str(), "frost");
    }
}
