use serde::{Deserialize, Serialize};

use super::{B64Bytes, ConfigCore, ConfigCoreWire};
use crate::{error::LocalError, group::Group, party::PartyId};

/// Per-party Config for the DYN (dynamic re-sharing) family.
///
/// DYN has no auxiliary material beyond the shared chassis: its entire
/// distinguishing behavior lives in how a new Config of this shape is
/// produced (see [`crate::families::dyn_family::reshare`]), not in what it
/// stores at rest.
#[derive(Debug, Clone)]
pub struct DynConfig<Id, G: Group> {
    pub core: ConfigCore<Id, G>,
    pub public_key: G::Point,
}

impl<Id: PartyId, G: Group> DynConfig<Id, G> {
    pub fn validate(&self) -> Result<(), crate::error::Abort<Id>> {
        crate::config::Config::Dyn(self.clone()).validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynConfigWire<Id> {
    #[serde(flatten)]
    pub core: ConfigCoreWire<Id>,
    pub public_key: B64Bytes,
}

impl<Id: PartyId> DynConfigWire<Id> {
    pub fn from_config<G: Group>(config: &DynConfig<Id, G>) -> Result<Self, LocalError>
    where
        Id: core::fmt::Display + core::str::FromStr,
    {
        Ok(Self {
            core: ConfigCoreWire::from_core(&config.core)?,
            public_key: G::encode_point(&config.public_key).into(),
        })
    }

    pub fn into_config<G: Group>(self) -> Result<DynConfig<Id, G>, LocalError>
    where
        Id: core::fmt::Display + core::str::FromStr,
    {
        let public_key = G::decode_point(self.public_key.as_slice())?;
        Ok(DynConfig {
            core: self.core.into_core()?,
            public_key,
        })
    }
}
