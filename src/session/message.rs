use alloc::string::String;

use serde::{Deserialize, Serialize};

use crate::protocol::{DirectMessage, EchoBroadcast, NormalBroadcast, RoundId};

/// A session identifier: shared by every party in one protocol run, akin to
/// the `shared_randomness` passed to [`EntryPoint::make_round`](crate::protocol::EntryPoint::make_round).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One wire message: an envelope around the three message parts a round can
/// produce, addressed to a specific destination (`to = Some(id)`) or
/// broadcast to all current expected recipients (`to = None`, used for the
/// echo/normal broadcast parts, which are identical for every destination).
///
/// Ported from `manul::session::message::Message`/`SignedMessage`, with the
/// signature layer trimmed (see `SPEC_FULL.md` §3): this crate's
/// authentication is an external collaborator's concern, not this
/// envelope's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message<Id> {
    /// The [`Protocol::PROTOCOL_ID`](crate::protocol::Protocol::PROTOCOL_ID) of the
    /// protocol this message belongs to, so a session only ever admits messages
    /// addressed to the protocol it is actually running rather than, say, a
    /// stale message from a previous protocol reusing the same session id.
    pub protocol_id: String,
    pub session_id: SessionId,
    pub round_id: RoundId,
    pub from: Id,
    pub to: Option<Id>,
    pub echo_broadcast: EchoBroadcast,
    pub normal_broadcast: NormalBroadcast,
    pub direct_message: DirectMessage,
}

impl<Id: Clone> Message<Id> {
    /// A key identifying a would-be duplicate of this message: the engine
    /// rejects a second message from `from` for the same `(session_id,
    /// round_id, to)` slot rather than silently overwriting the first,
    /// matching `manul::session::session::Session::message_is_being_processed`/
    /// `message_is_cached`.
    pub fn dedup_key(&self) -> (SessionId, RoundId, Id, Option<Id>) {
        (self.session_id.clone(), self.round_id, self.from.clone(), self.to.clone())
    }
}
