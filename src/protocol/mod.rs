/*!
API for protocol implementors: the round-based state machine that all three
signing families (CGG21, FROST, DYN) are built from.

A protocol is a directed acyclic graph of [`Round`]s reached from a single
[`EntryPoint`]. All rounds of one execution share the same [`Protocol`]
associated type, which names the terminal result and the provable-error
type. The [`session`](crate::session) module drives a `Round` through
verify/store/finalize; this module only describes the shape of a round.

Grounded on `manul::protocol`: the split of `Round::{make_direct_message,
make_echo_broadcast, make_normal_broadcast, receive_message, finalize}`, the
`Payload`/`Artifact` type-erased containers, and the `EntryPoint` trait are
carried over essentially unchanged. `CommunicationInfo`/`RoundCommunicationInfo`
are ported from `manul::protocol::round`.
*/

mod message;
mod round;
mod round_id;

pub use message::{DirectMessage, EchoBroadcast, MessageValidationError, NormalBroadcast};
pub use round::{
    Artifact, CommunicationInfo, EchoRoundCommunicationInfo, EntryPoint, FinalizeOutcome, NoProtocolErrors, Payload,
    Protocol, ProtocolError, ReceiveError, ReceiveErrorKindView, Round, RoundCommunicationInfo,
};
pub use round_id::{RoundId, TransitionInfo};
