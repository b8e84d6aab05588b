use alloc::{boxed::Box, collections::BTreeMap, format, string::String};
use core::{any::Any, fmt::Debug};

use rand_core::CryptoRngCore;
use serde::{Deserialize, Serialize};

use super::{
    message::{DirectMessage, EchoBroadcast, NormalBroadcast},
    round_id::TransitionInfo,
};
use crate::{
    error::LocalError,
    party::{IdSet, PartyId},
};

/// Describes what other parties a round sends messages to, and what other
/// parties it expects messages from, for one communication channel.
///
/// Ported from `manul::protocol::round::RoundCommunicationInfo`.
#[derive(Debug, Clone)]
pub struct RoundCommunicationInfo<Id> {
    /// Destinations for this round's outbound messages.
    pub message_destinations: alloc::collections::BTreeSet<Id>,
    /// The parties (and quorum) this round expects inbound messages from.
    pub expecting_messages_from: IdSet<Id>,
}

impl<Id: PartyId> RoundCommunicationInfo<Id> {
    /// A round that sends to, and expects a response from, every one of `others`.
    pub fn all_to_all(others: &alloc::collections::BTreeSet<Id>) -> Self {
        Self {
            message_destinations: others.clone(),
            expecting_messages_from: IdSet::all(others.clone()),
        }
    }

    /// A round that sends to every one of `others` but only needs `threshold`-many to respond.
    pub fn threshold(others: &alloc::collections::BTreeSet<Id>, threshold: usize) -> Self {
        Self {
            message_destinations: others.clone(),
            expecting_messages_from: IdSet::threshold(others.clone(), threshold),
        }
    }

    /// A round that neither sends nor expects anything (e.g. the terminal
    /// round for a party dropping out of the committee).
    pub fn none() -> Self {
        Self {
            message_destinations: alloc::collections::BTreeSet::new(),
            expecting_messages_from: IdSet::empty(),
        }
    }
}

/// Whether, and how, the echo round following this round differs from the main round.
#[derive(Debug, Clone)]
pub enum EchoRoundCommunicationInfo<Id> {
    /// No echo round follows this one.
    None,
    /// The echo round uses the same destinations/expectations as the main round.
    SameAsMainRound,
    /// The echo round uses a custom communication pattern.
    Custom(RoundCommunicationInfo<Id>),
}

/// The full communication shape of a round: its main channel plus the
/// (optional) echo round that follows it.
#[derive(Debug, Clone)]
pub struct CommunicationInfo<Id> {
    pub main_round: RoundCommunicationInfo<Id>,
    pub echo_round: EchoRoundCommunicationInfo<Id>,
}

impl<Id: PartyId> CommunicationInfo<Id> {
    /// A round with no echo round following it.
    pub fn new(main_round: RoundCommunicationInfo<Id>) -> Self {
        Self {
            main_round,
            echo_round: EchoRoundCommunicationInfo::None,
        }
    }

    /// A broadcast round whose echo-broadcast payload must be seen
    /// identically by every destination before the round following it can
    /// finalize — the "broadcast reliability checks" spec calls for.
    pub fn with_echo(main_round: RoundCommunicationInfo<Id>) -> Self {
        Self {
            main_round,
            echo_round: EchoRoundCommunicationInfo::SameAsMainRound,
        }
    }
}

/// Type-erased payload produced by [`Round::receive_message`] and consumed
/// by [`Round::finalize`].
#[derive(Debug)]
pub struct Payload(pub Box<dyn Any + Send + Sync>);

impl Payload {
    pub fn new<T: 'static + Send + Sync>(payload: T) -> Self {
        Self(Box::new(payload))
    }

    pub fn empty() -> Self {
        Self::new(())
    }

    pub fn downcast<T: 'static>(self) -> Result<T, LocalError> {
        Ok(*(self
            .0
            .downcast::<T>()
            .map_err(|_| LocalError::new(format!("failed to downcast payload into {}", core::any::type_name::<T>())))?))
    }
}

/// Type-erased side information produced by [`Round::make_direct_message`]
/// (e.g. nonces used to build a destination-specific message) and consumed
/// by [`Round::finalize`].
#[derive(Debug)]
pub struct Artifact(pub Box<dyn Any + Send + Sync>);

impl Artifact {
    pub fn new<T: 'static + Send + Sync>(artifact: T) -> Self {
        Self(Box::new(artifact))
    }

    pub fn downcast<T: 'static>(self) -> Result<T, LocalError> {
        Ok(*(self
            .0
            .downcast::<T>()
            .map_err(|_| LocalError::new(format!("failed to downcast artifact into {}", core::any::type_name::<T>())))?))
    }
}

/// A distributed protocol: the family of rounds reachable from one
/// [`EntryPoint`], sharing a terminal result type and a provable-error type.
pub trait Protocol<Id>: 'static {
    /// The protocol's successful terminal result (a `Config`, a `Signature`,
    /// a `PreSignature`, depending on the family and operation).
    type Result: Debug;

    /// The provable-misbehavior type this protocol's rounds can report via
    /// [`ReceiveError::protocol`].
    type ProtocolError: ProtocolError<Id>;

    /// A short, stable identifier for this protocol, carried in every
    /// [`crate::session::Message`]'s envelope so a session only ever admits
    /// messages addressed to the protocol it is actually running (spec's
    /// wire envelope "protocol id" field).
    const PROTOCOL_ID: &'static str;
}

/// Describes a provable protocol-level error (a VSS check, a ZK proof, or a
/// partial-signature check that failed).
///
/// This crate's families report these at the granularity of a single
/// culprit-attributable failure (`VerificationFailed{culprit}`) without
/// modeling a full evidence-publication system: the specific zero-knowledge
/// proofs underlying CGG21 and FROST are out of scope, only the round
/// skeleton around them is this crate's concern.
pub trait ProtocolError<Id>: Debug + Clone + Send + Sync + Serialize + for<'de> Deserialize<'de> {
    /// A human-readable description of what went wrong.
    fn description(&self) -> String;
}

/// A stub protocol-error type for protocols that never produce a provable error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NoProtocolErrors;

impl<Id> ProtocolError<Id> for NoProtocolErrors {
    fn description(&self) -> String {
        unreachable!("NoProtocolErrors is never actually constructed")
    }
}

/// The error returned by [`Round::receive_message`].
#[derive(Debug)]
pub struct ReceiveError<Id, P: Protocol<Id>>(pub(crate) ReceiveErrorKind<Id, P>);

#[derive(Debug)]
pub(crate) enum ReceiveErrorKind<Id, P: Protocol<Id>> {
    Local(LocalError),
    Malformed(String),
    Protocol(P::ProtocolError),
    Unprovable(crate::error::RemoteError),
}

impl<Id, P: Protocol<Id>> ReceiveError<Id, P> {
    /// A local (should-never-happen) failure while processing the message.
    pub fn local(message: impl Into<String>) -> Self {
        Self(ReceiveErrorKind::Local(LocalError::new(message)))
    }

    /// The message failed well-formedness checks (spec's `MessageMalformed`).
    pub fn malformed(message: impl Into<String>) -> Self {
        Self(ReceiveErrorKind::Malformed(message.into()))
    }

    /// A culprit-attributable protocol error (spec's `VerificationFailed`).
    pub fn protocol(error: P::ProtocolError) -> Self {
        Self(ReceiveErrorKind::Protocol(error))
    }

    /// A fault that cannot (yet) be pinned on a specific party.
    pub fn unprovable(message: impl Into<String>) -> Self {
        Self(ReceiveErrorKind::Unprovable(crate::error::RemoteError::new(message)))
    }

    /// An unprovable fault that should ban its sender under a specific
    /// [`crate::error::ErrorKind`] rather than the default `VerificationFailed`
    /// (e.g. a generation mismatch, spec's `MixedGeneration`).
    pub fn unprovable_kind(kind: crate::error::ErrorKind, message: impl Into<String>) -> Self {
        Self(ReceiveErrorKind::Unprovable(crate::error::RemoteError::with_kind(kind, message)))
    }

    /// Consumes this error, returning its underlying kind, for the session
    /// driver to turn into transcript bookkeeping (ban the sender, record a
    /// provable/unprovable error).
    pub fn into_view(self) -> ReceiveErrorKindView<Id, P> {
        match self.0 {
            ReceiveErrorKind::Local(error) => ReceiveErrorKindView::Local(error),
            ReceiveErrorKind::Malformed(message) => ReceiveErrorKindView::Malformed(message),
            ReceiveErrorKind::Protocol(error) => ReceiveErrorKindView::Protocol(error),
            ReceiveErrorKind::Unprovable(error) => ReceiveErrorKindView::Unprovable(error),
        }
    }
}

/// The public view of a [`ReceiveError`]'s contents, exposed via
/// [`ReceiveError::into_view`] for the session driver to act on (ban the
/// sender, file a provable or unprovable fault) without leaking the inner
/// enum's representation into the public API surface directly.
#[derive(Debug)]
pub enum ReceiveErrorKindView<Id, P: Protocol<Id>> {
    Local(LocalError),
    Malformed(String),
    Protocol(P::ProtocolError),
    Unprovable(crate::error::RemoteError),
}

impl<Id, P: Protocol<Id>> From<LocalError> for ReceiveError<Id, P> {
    fn from(error: LocalError) -> Self {
        Self(ReceiveErrorKind::Local(error))
    }
}

/// The outcome of a successful [`Round::finalize`]: either another round to
/// run, or the protocol's terminal result.
pub enum FinalizeOutcome<Id: PartyId, P: Protocol<Id>> {
    AnotherRound(Box<dyn Round<Id, Protocol = P>>),
    Result(P::Result),
}

impl<Id: PartyId, P: Protocol<Id>> Debug for FinalizeOutcome<Id, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AnotherRound(_) => f.debug_tuple("AnotherRound").field(&"<round>").finish(),
            Self::Result(result) => f.debug_tuple("Result").field(result).finish(),
        }
    }
}

/// A round that can be created directly, as the starting point of a protocol run.
///
/// Ported from `manul::protocol::round::EntryPoint`. This is where the
/// family-specific constructors (keygen/sign/reshare) live: each one builds
/// its own `EntryPoint` impl that captures the `Config`/parameters it needs
/// and validates them (threshold range, generation match, participant
/// membership) before `make_round` ever runs, matching spec §4.3's "aborts
/// before any network activity" requirement.
pub trait EntryPoint<Id: PartyId> {
    type Protocol: Protocol<Id>;

    /// Creates the first round.
    ///
    /// `shared_randomness` is the same for every party in one session (akin
    /// to a session ID); `id` is this party's own identifier.
    fn make_round(
        self,
        rng: &mut dyn CryptoRngCore,
        shared_randomness: &[u8],
        id: &Id,
    ) -> Result<Box<dyn Round<Id, Protocol = Self::Protocol>>, LocalError>;
}

/// A single round of a protocol.
///
/// The execution layer ([`crate::session::Session`]) drives a round through:
/// creating outbound messages (`make_direct_message`/`make_echo_broadcast`/
/// `make_normal_broadcast`), processing inbound ones (`receive_message`),
/// and attempting to finalize once a quorum has responded (`finalize`).
///
/// Ported from `manul::protocol::round::Round`, trimmed of the
/// signature/wire-format generics this crate does not carry (see
/// `SPEC_FULL.md` §3 on why the core does not sign messages itself).
pub trait Round<Id: PartyId>: 'static + Debug + Send + Sync {
    type Protocol: Protocol<Id>;

    /// This round's position in the protocol's transition graph.
    fn transition_info(&self) -> TransitionInfo;

    /// Who this round talks to, and who it needs to hear from.
    fn communication_info(&self) -> CommunicationInfo<Id>;

    /// Builds the direct message (if any) for `destination`.
    #[allow(unused_variables)]
    fn make_direct_message(
        &self,
        rng: &mut dyn CryptoRngCore,
        destination: &Id,
    ) -> Result<(DirectMessage, Option<Artifact>), LocalError> {
        Ok((DirectMessage::none(), None))
    }

    /// Builds this round's echo broadcast (if any).
    #[allow(unused_variables)]
    fn make_echo_broadcast(&self, rng: &mut dyn CryptoRngCore) -> Result<EchoBroadcast, LocalError> {
        Ok(EchoBroadcast::none())
    }

    /// Builds this round's normal broadcast (if any).
    #[allow(unused_variables)]
    fn make_normal_broadcast(&self, rng: &mut dyn CryptoRngCore) -> Result<NormalBroadcast, LocalError> {
        Ok(NormalBroadcast::none())
    }

    /// Processes one verified inbound message (the engine has already
    /// checked protocol/session/round IDs, sender membership, and
    /// non-duplication before calling this).
    fn receive_message(
        &self,
        rng: &mut dyn CryptoRngCore,
        from: &Id,
        echo_broadcast: EchoBroadcast,
        normal_broadcast: NormalBroadcast,
        direct_message: DirectMessage,
    ) -> Result<Payload, ReceiveError<Id, Self::Protocol>>;

    /// Attempts to finalize the round once a quorum of payloads/artifacts has been collected.
    fn finalize(
        self: Box<Self>,
        rng: &mut dyn CryptoRngCore,
        payloads: BTreeMap<Id, Payload>,
        artifacts: BTreeMap<Id, Artifact>,
    ) -> Result<FinalizeOutcome<Id, Self::Protocol>, LocalError>;
}
