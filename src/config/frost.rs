use serde::{Deserialize, Serialize};

use super::{B64Bytes, ConfigCore, ConfigCoreWire};
use crate::{error::LocalError, group::Group, party::PartyId};

/// Per-party Config for the FROST (threshold Schnorr) family.
///
/// `verification_shares` is FROST's name for the public-share map already
/// carried in [`ConfigCore`]; it is duplicated here under the field name
/// the family's own sign round expects, matching spec §3's "FROST:
/// verification-share map" auxiliary-field note.
#[derive(Debug, Clone)]
pub struct FrostConfig<Id, G: Group> {
    pub core: ConfigCore<Id, G>,
    pub public_key: G::Point,
}

impl<Id: PartyId, G: Group> FrostConfig<Id, G> {
    pub fn verification_shares(&self) -> &alloc::collections::BTreeMap<Id, G::Point> {
        &self.core.public_shares
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrostConfigWire<Id> {
    #[serde(flatten)]
    pub core: ConfigCoreWire<Id>,
    pub public_key: B64Bytes,
}

impl<Id: PartyId> FrostConfigWire<Id> {
    pub fn from_config<G: Group>(config: &FrostConfig<Id, G>) -> Result<Self, LocalError>
    where
        Id: core::fmt::Display + core::str::FromStr,
    {
        Ok(Self {
            core: ConfigCoreWire::from_core(&config.core)?,
            public_key: G::encode_point(&config.public_key).into(),
        })
    }

    pub fn into_config<G: Group>(self) -> Result<FrostConfig<Id, G>, LocalError>
    where
        Id: core::fmt::Display + core::str::FromStr,
    {
        let public_key = G::decode_point(self.public_key.as_slice())?;
        Ok(FrostConfig {
            core: self.core.into_core()?,
            public_key,
        })
    }
}
