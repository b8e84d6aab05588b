/*!
Convenience constructors for the common DYN re-sharing shapes.

Each one builds the `(OLD, NEW, t')` triple per spec and hands it to
[`ReshareEntryPoint`], mirroring how `manul::combinators::extend` wraps one
`EntryPoint` with a derived communication pattern rather than writing a new
round from scratch.
*/

use alloc::collections::BTreeSet;

use crate::{config::DynConfig, group::Group, party::PartyId};

use super::reshare::ReshareEntryPoint;

/// `NEW = OLD ∪ extra`, threshold unchanged.
pub fn add_parties<Id: PartyId, G: Group>(config: DynConfig<Id, G>, extra: BTreeSet<Id>) -> ReshareEntryPoint<Id, G> {
    let threshold = config.core.threshold;
    let mut new_parties: BTreeSet<Id> = config.core.public_shares.keys().cloned().collect();
    new_parties.extend(extra);
    ReshareEntryPoint {
        config,
        new_parties,
        new_threshold: threshold,
    }
}

/// `NEW = OLD \ gone`, with `t'` clamped to `|NEW|` if it would otherwise
/// exceed the new committee size.
pub fn remove_parties<Id: PartyId, G: Group>(
    config: DynConfig<Id, G>,
    gone: &BTreeSet<Id>,
    new_threshold: usize,
) -> ReshareEntryPoint<Id, G> {
    let new_parties: BTreeSet<Id> = config
        .core
        .public_shares
        .keys()
        .filter(|id| !gone.contains(id))
        .cloned()
        .collect();
    let new_threshold = new_threshold.min(new_parties.len());
    ReshareEntryPoint {
        config,
        new_parties,
        new_threshold,
    }
}

/// `NEW = OLD`, only the threshold changes.
pub fn change_threshold<Id: PartyId, G: Group>(config: DynConfig<Id, G>, new_threshold: usize) -> ReshareEntryPoint<Id, G> {
    let new_parties: BTreeSet<Id> = config.core.public_shares.keys().cloned().collect();
    ReshareEntryPoint {
        config,
        new_parties,
        new_threshold,
    }
}

/// `NEW = (OLD \ remove) ∪ add`, with an explicit new threshold.
pub fn migrate<Id: PartyId, G: Group>(
    config: DynConfig<Id, G>,
    remove: &BTreeSet<Id>,
    add: BTreeSet<Id>,
    new_threshold: usize,
) -> ReshareEntryPoint<Id, G> {
    let mut new_parties: BTreeSet<Id> = config
        .core
        .public_shares
        .keys()
        .filter(|id| !remove.contains(id))
        .cloned()
        .collect();
    new_parties.extend(add);
    ReshareEntryPoint {
        config,
        new_parties,
        new_threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Secp256k1;
    use alloc::collections::BTreeMap;

    fn sample_config() -> DynConfig<u32, Secp256k1> {
        let rng = &mut rand_core::OsRng;
        let secret = Secp256k1::random_scalar(rng);
        let mut public_shares = BTreeMap::new();
        public_shares.insert(1u32, Secp256k1::generator_mul(&secret));
        public_shares.insert(2u32, Secp256k1::generator_mul(&secret));
        public_shares.insert(3u32, Secp256k1::generator_mul(&secret));
        DynConfig {
            core: crate::config::ConfigCore {
                id: 1,
                threshold: 2,
                generation: 0,
                private_share: zeroize::Zeroizing::new(secret),
                public_shares,
                chain_key: [0u8; 32],
                rid: [0u8; 32],
                rollback_from: None,
            },
            public_key: Secp256k1::generator_mul(&Secp256k1::one_scalar()),
        }
    }

    #[test]
    fn add_parties_preserves_threshold() {
        let entry = add_parties(sample_config(), [4u32].into_iter().collect());
        assert_eq!(entry.new_threshold, 2);
        assert_eq!(entry.new_parties.len(), 4);
    }

    #[test]
    fn remove_parties_clamps_threshold() {
        let gone: BTreeSet<u32> = [2u32].into_iter().collect();
        let entry = remove_parties(sample_config(), &gone, 5);
        assert_eq!(entry.new_parties.len(), 2);
        assert_eq!(entry.new_threshold, 2);
    }
}
