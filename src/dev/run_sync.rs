/*!
A synchronous, in-process network for running a protocol to completion
without a real transport, for use in tests.

Ported in spirit from `manul::dev::run_sync`: that function drives every
party's `Session` by hand, routing each outbound `Message` to its
destination (or, for a broadcast, to every other party) and feeding the
result back in, repeating until every party has reached a terminal outcome.
This version drives [`Handler`] directly rather than `Session`, since this
crate folded the echo-round bookkeeping `manul::session::Session` would
otherwise expose into the handler itself.
*/

use alloc::{
    boxed::Box,
    collections::{BTreeMap, BTreeSet},
    vec::Vec,
};

use rand_core::CryptoRngCore;

use crate::{
    error::{Abort, LocalError},
    handler::Handler,
    party::PartyId,
    protocol::{EntryPoint, Protocol},
    session::{Message, SessionId},
};

/// The outcome of [`run_sync`]: each party's terminal result or abort,
/// keyed by id.
#[derive(Debug)]
pub struct ExecutionResult<Id: PartyId, P: Protocol<Id>> {
    pub results: BTreeMap<Id, Result<P::Result, Abort<Id>>>,
}

impl<Id: PartyId, P: Protocol<Id>> ExecutionResult<Id, P> {
    /// Panics unless every party finished with `Ok`, returning the map of
    /// results for tests that only care about the happy path.
    pub fn unwrap_all(self) -> BTreeMap<Id, P::Result> {
        self.results
            .into_iter()
            .map(|(id, outcome)| (id, outcome.unwrap_or_else(|abort| panic!("{id:?} aborted: {abort}"))))
            .collect()
    }
}

/// Runs one protocol session to completion across every listed party,
/// routing messages in-process with no serialization and no faults.
///
/// `entry_points` gives each party's id alongside the [`EntryPoint`] that
/// starts its half of the session; every party shares one session id and one
/// slice of `shared_randomness`, as a real deployment's session setup would
/// hand out to all participants before the first round begins.
pub fn run_sync<Id, P, EP>(
    rng: &mut dyn CryptoRngCore,
    entry_points: Vec<(Id, EP)>,
) -> Result<ExecutionResult<Id, P>, LocalError>
where
    Id: PartyId,
    P: Protocol<Id>,
    EP: EntryPoint<Id, Protocol = P>,
{
    let session_id = SessionId::new("dev::run_sync");
    let shared_randomness = b"dev::run_sync shared randomness";

    let all_ids: BTreeSet<Id> = entry_points.iter().map(|(id, _)| id.clone()).collect();
    let mut handlers: BTreeMap<Id, Handler<Id, P>> = BTreeMap::new();
    let mut queue: Vec<Message<Id>> = Vec::new();

    for (id, entry_point) in entry_points {
        let mut handler = Handler::new(rng, entry_point, shared_randomness, session_id.clone(), id.clone())?;
        queue.extend(handler.next_outbound());
        handlers.insert(id, handler);
    }

    while !queue.is_empty() {
        let mut deliveries: BTreeMap<Id, Vec<Message<Id>>> = BTreeMap::new();
        for message in queue.drain(..) {
            match &message.to {
                Some(to) => deliveries.entry(to.clone()).or_default().push(message),
                None => {
                    for id in all_ids.iter().filter(|id| **id != message.from) {
                        deliveries.entry(id.clone()).or_default().push(message.clone());
                    }
                }
            }
        }
        for (id, messages) in deliveries {
            if let Some(handler) = handlers.get_mut(&id) {
                for message in messages {
                    handler.handle_inbound(rng, message)?;
                }
            }
        }
        let mut next_queue = Vec::new();
        for handler in handlers.values_mut() {
            next_queue.extend(handler.next_outbound());
        }
        queue = next_queue;
        if handlers.values().all(Handler::is_finished) {
            break;
        }
    }

    // The queue ran dry with some handlers still waiting: nothing more is
    // ever going to arrive from an in-process network with no messages left
    // in flight, so this is exactly the point a real transport's own timeout
    // would give up and declare the missing senders at fault.
    for handler in handlers.values_mut() {
        handler.no_more_inbound()?;
    }

    let mut results = BTreeMap::new();
    for (id, handler) in handlers {
        let outcome = handler
            .result()
            .ok_or_else(|| LocalError::new("run_sync: session stalled before reaching a terminal outcome"))?;
        results.insert(id, outcome);
    }
    Ok(ExecutionResult { results })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        families::frost::{Frost, KeygenEntryPoint},
        group::Secp256k1,
    };

    #[test]
    fn run_sync_drives_frost_keygen_to_completion() {
        let _ = Frost;
        let rng = &mut rand_core::OsRng;
        let parties: BTreeSet<u32> = [1u32, 2, 3].into_iter().collect();
        let entry_points: Vec<(u32, KeygenEntryPoint<u32, Secp256k1>)> = parties
            .iter()
            .map(|id| (*id, KeygenEntryPoint::new(*id, parties.clone(), 2)))
            .collect();
        let result = run_sync(rng, entry_points).unwrap();
        let configs = result.unwrap_all();
        assert_eq!(configs.len(), 3);
        let mut public_keys = configs.values().map(|config| &config.public_key);
        let first = public_keys.next().unwrap();
        assert!(
            public_keys.all(|key| key == first),
            "every party must agree on the group public key"
        );
    }
}
