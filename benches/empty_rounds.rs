extern crate alloc;

use alloc::collections::{BTreeMap, BTreeSet};
use core::fmt::Debug;

use criterion::{criterion_group, criterion_main, Criterion};
use rand_core::{CryptoRngCore, OsRng};
use serde::{Deserialize, Serialize};
use tss_core::{
    dev::run_sync,
    error::LocalError,
    protocol::{
        Artifact, CommunicationInfo, DirectMessage, EchoBroadcast, EntryPoint, FinalizeOutcome, NoProtocolErrors,
        NormalBroadcast, Payload, Protocol, ReceiveError, Round, RoundCommunicationInfo,
    },
    protocol::{RoundId, TransitionInfo},
};

#[derive(Debug)]
pub struct EmptyProtocol;

impl<Id> Protocol<Id> for EmptyProtocol {
    type Result = ();
    type ProtocolError = NoProtocolErrors;
}

#[derive(Debug, Serialize, Deserialize)]
struct Round1DirectMessage;

#[derive(Debug, Serialize, Deserialize)]
struct Round1EchoBroadcast;

struct Round1Payload;

struct Round1Artifact;

#[derive(Clone)]
struct Inputs<Id> {
    rounds_num: u8,
    echo: bool,
    other_ids: BTreeSet<Id>,
}

#[derive(Debug)]
struct EmptyEntryPoint<Id> {
    inputs: Inputs<Id>,
}

impl<Id: 'static + Debug + Clone + Ord + Send + Sync + Serialize + for<'de> Deserialize<'de>> EntryPoint<Id>
    for EmptyEntryPoint<Id>
{
    type Protocol = EmptyProtocol;

    fn make_round(
        self,
        _rng: &mut dyn CryptoRngCore,
        _shared_randomness: &[u8],
        _id: &Id,
    ) -> Result<alloc::boxed::Box<dyn Round<Id, Protocol = Self::Protocol>>, LocalError> {
        Ok(alloc::boxed::Box::new(EmptyRound {
            round_counter: 1,
            inputs: self.inputs,
        }))
    }
}

struct EmptyRound<Id> {
    round_counter: u8,
    inputs: Inputs<Id>,
}

impl<Id: 'static + Debug + Clone + Ord + Send + Sync> Debug for EmptyRound<Id> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EmptyRound").field("round_counter", &self.round_counter).finish()
    }
}

impl<Id: 'static + Debug + Clone + Ord + Send + Sync + Serialize + for<'de> Deserialize<'de>> Round<Id>
    for EmptyRound<Id>
{
    type Protocol = EmptyProtocol;

    fn transition_info(&self) -> TransitionInfo {
        let id = RoundId::new(u16::from(self.round_counter));
        if self.round_counter == self.inputs.rounds_num {
            TransitionInfo::new_final(id)
        } else {
            TransitionInfo::new(id, [RoundId::new(u16::from(self.round_counter) + 1)].into_iter().collect())
        }
    }

    fn communication_info(&self) -> CommunicationInfo<Id> {
        let main_round = RoundCommunicationInfo::all_to_all(&self.inputs.other_ids);
        if self.inputs.echo {
            CommunicationInfo::with_echo(main_round)
        } else {
            CommunicationInfo::new(main_round)
        }
    }

    fn make_echo_broadcast(&self, _rng: &mut dyn CryptoRngCore) -> Result<EchoBroadcast, LocalError> {
        if self.inputs.echo {
            EchoBroadcast::new(&Round1EchoBroadcast)
        } else {
            Ok(EchoBroadcast::none())
        }
    }

    fn make_direct_message(
        &self,
        _rng: &mut dyn CryptoRngCore,
        _destination: &Id,
    ) -> Result<(DirectMessage, Option<Artifact>), LocalError> {
        let dm = DirectMessage::new(&Round1DirectMessage)?;
        Ok((dm, Some(Artifact::new(Round1Artifact))))
    }

    fn receive_message(
        &self,
        _rng: &mut dyn CryptoRngCore,
        _from: &Id,
        echo_broadcast: EchoBroadcast,
        _normal_broadcast: NormalBroadcast,
        direct_message: DirectMessage,
    ) -> Result<Payload, ReceiveError<Id, Self::Protocol>> {
        if self.inputs.echo {
            let _echo: Round1EchoBroadcast = criterion::black_box(echo_broadcast.deserialize()?);
        }
        let _direct: Round1DirectMessage = criterion::black_box(direct_message.deserialize()?);
        Ok(Payload::new(Round1Payload))
    }

    fn finalize(
        self: alloc::boxed::Box<Self>,
        _rng: &mut dyn CryptoRngCore,
        payloads: BTreeMap<Id, Payload>,
        artifacts: BTreeMap<Id, Artifact>,
    ) -> Result<FinalizeOutcome<Id, Self::Protocol>, LocalError> {
        for payload in payloads.into_values() {
            let _payload = payload.downcast::<Round1Payload>()?;
        }
        for artifact in artifacts.into_values() {
            let _artifact = artifact.downcast::<Round1Artifact>()?;
        }

        if self.round_counter == self.inputs.rounds_num {
            Ok(FinalizeOutcome::Result(()))
        } else {
            let round = EmptyRound {
                round_counter: self.round_counter + 1,
                inputs: self.inputs,
            };
            Ok(FinalizeOutcome::AnotherRound(alloc::boxed::Box::new(round)))
        }
    }
}

fn bench_empty_rounds(c: &mut Criterion) {
    // Benchmarks a full run of a protocol whose rounds do nothing but send
    // and receive empty messages: an "integration" benchmark for the whole
    // round engine, including the overhead of dev::run_sync's in-process
    // routing.

    let mut group = c.benchmark_group("Empty rounds");

    let nodes = 25u32;
    let rounds_num = 5u8;

    let all_ids: BTreeSet<u32> = (0..nodes).collect();

    let entry_points_no_echo = all_ids
        .iter()
        .map(|id| {
            let mut other_ids = all_ids.clone();
            other_ids.remove(id);
            (
                *id,
                EmptyEntryPoint {
                    inputs: Inputs {
                        rounds_num,
                        other_ids,
                        echo: false,
                    },
                },
            )
        })
        .collect::<Vec<_>>();

    group.bench_function("25 nodes, 5 rounds, no echo", |b| {
        b.iter(|| {
            let result = run_sync::<u32, EmptyProtocol, _>(&mut OsRng, entry_points_no_echo.clone()).unwrap();
            assert!(result.results.values().all(|outcome| outcome.is_ok()))
        })
    });

    let entry_points_echo = all_ids
        .iter()
        .map(|id| {
            let mut other_ids = all_ids.clone();
            other_ids.remove(id);
            (
                *id,
                EmptyEntryPoint {
                    inputs: Inputs {
                        rounds_num,
                        other_ids,
                        echo: true,
                    },
                },
            )
        })
        .collect::<Vec<_>>();

    group.sample_size(30);

    group.bench_function("25 nodes, 5 rounds, echo each round", |b| {
        b.iter(|| {
            let result = run_sync::<u32, EmptyProtocol, _>(&mut OsRng, entry_points_echo.clone()).unwrap();
            assert!(result.results.values().all(|outcome| outcome.is_ok()))
        })
    });

    group.finish()
}

criterion_group!(benches, bench_empty_rounds);
criterion_main!(benches);
