use alloc::{collections::BTreeMap, vec::Vec};

use serde::{Deserialize, Serialize};

use super::{B64Bytes, ConfigCore, ConfigCoreWire};
use crate::{error::LocalError, group::Group, party::PartyId};

/// CGG21's auxiliary per-party material: Paillier moduli, Pedersen
/// parameters, and ElGamal public keys for the zero-knowledge proofs that
/// accompany presignature generation.
///
/// The concrete proof system is out of scope (spec §1 excludes "the
/// specific zero-knowledge proofs ... of CGG21"); these are carried as
/// opaque, already-validated blobs so the round skeleton in
/// [`crate::families::cgg21`] has somewhere to put them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cgg21Aux {
    pub paillier_modulus: Vec<u8>,
    pub pedersen_params: Vec<u8>,
    pub elgamal_public: Vec<u8>,
}

/// Per-party Config for the CGG21 (presignature + online finish) family.
#[derive(Debug, Clone)]
pub struct Cgg21Config<Id, G: Group> {
    pub core: ConfigCore<Id, G>,
    pub public_key: G::Point,
    pub aux: BTreeMap<Id, Cgg21Aux>,
}

impl<Id: PartyId, G: Group> Cgg21Config<Id, G> {
    pub fn validate(&self) -> Result<(), crate::error::Abort<Id>> {
        crate::config::Config::Cgg21(self.clone()).validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cgg21ConfigWire<Id> {
    #[serde(flatten)]
    pub core: ConfigCoreWire<Id>,
    pub public_key: B64Bytes,
    pub aux: BTreeMap<String, Cgg21Aux>,
}

impl<Id: PartyId> Cgg21ConfigWire<Id> {
    pub fn from_config<G: Group>(config: &Cgg21Config<Id, G>) -> Result<Self, LocalError>
    where
        Id: core::fmt::Display + core::str::FromStr,
    {
        Ok(Self {
            core: ConfigCoreWire::from_core(&config.core)?,
            public_key: G::encode_point(&config.public_key).into(),
            aux: config
                .aux
                .iter()
                .map(|(id, aux)| (alloc::format!("{id}"), aux.clone()))
                .collect(),
        })
    }

    pub fn into_config<G: Group>(self) -> Result<Cgg21Config<Id, G>, LocalError>
    where
        Id: core::fmt::Display + core::str::FromStr,
    {
        let public_key = G::decode_point(self.public_key.as_slice())?;
        let mut aux = BTreeMap::new();
        for (id_str, value) in self.aux {
            let id = id_str
                .parse::<Id>()
                .map_err(|_| LocalError::new("failed to parse party id in Cgg21Config"))?;
            aux.insert(id, value);
        }
        Ok(Cgg21Config {
            core: self.core.into_core()?,
            public_key,
            aux,
        })
    }
}
