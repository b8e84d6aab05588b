use alloc::{boxed::Box, format, string::String, vec::Vec};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::LocalError;

/// An opaque, length-prefixed, canonically-serialized message part.
///
/// A round produces up to three of these (direct message, echo broadcast,
/// normal broadcast); per spec §6, "encoding is length-prefixed canonical
/// binary; the payload is an enumerated content variant keyed by round
/// number" — the round number tag lives one level up, in the envelope
/// (see `crate::session::Message`), not inside the part itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePart(Option<Box<[u8]>>);

impl MessagePart {
    /// The empty part, used by rounds that do not send anything on this channel.
    pub fn none() -> Self {
        Self(None)
    }

    /// Serializes `payload` with the wire format used throughout this crate
    /// (`postcard`, a compact binary format, over JSON, for production wire
    /// messages).
    pub fn new<T: Serialize>(payload: &T) -> Result<Self, LocalError> {
        let bytes: Vec<u8> =
            postcard::to_allocvec(payload).map_err(|error| LocalError::new(format!("serialization failed: {error}")))?;
        Ok(Self(Some(bytes.into_boxed_slice())))
    }

    /// Whether this part carries no payload.
    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Attempts to deserialize the part as `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, LocalError> {
        let bytes = self
            .0
            .as_ref()
            .ok_or_else(|| LocalError::new("attempted to deserialize an empty message part"))?;
        postcard::from_bytes(bytes).map_err(|error| LocalError::new(format!("deserialization failed: {error}")))
    }

    /// Returns `Ok(())` if `bytes` cannot be deserialized as `T` — used by
    /// [`crate::protocol::Protocol::verify_direct_message_is_invalid`] and
    /// its siblings to let a round positively assert "this round never sends
    /// this kind of message", matching
    /// `manul::protocol::round::Round::verify_*_is_invalid`.
    pub fn verify_is_not<T: DeserializeOwned>(&self) -> Result<(), MessageValidationError> {
        if self.deserialize::<T>().is_ok() {
            Err(MessageValidationError::new("message unexpectedly deserialized"))
        } else {
            Ok(())
        }
    }
}

/// A direct (point-to-point) message part of a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMessage(pub(crate) MessagePart);

impl DirectMessage {
    pub fn none() -> Self {
        Self(MessagePart::none())
    }

    pub fn new<T: Serialize>(payload: &T) -> Result<Self, LocalError> {
        Ok(Self(MessagePart::new(payload)?))
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, LocalError> {
        self.0.deserialize()
    }
}

/// An echo-broadcast message part: sent identically to every destination,
/// with the execution layer guaranteeing (via an echo round) that every
/// destination saw the same bytes before the round is allowed to finalize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoBroadcast(pub(crate) MessagePart);

impl EchoBroadcast {
    pub fn none() -> Self {
        Self(MessagePart::none())
    }

    pub fn new<T: Serialize>(payload: &T) -> Result<Self, LocalError> {
        Ok(Self(MessagePart::new(payload)?))
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, LocalError> {
        self.0.deserialize()
    }
}

/// A normal-broadcast message part: sent identically to every destination,
/// without the echo round's additional reliability guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalBroadcast(pub(crate) MessagePart);

impl NormalBroadcast {
    pub fn none() -> Self {
        Self(MessagePart::none())
    }

    pub fn new<T: Serialize>(payload: &T) -> Result<Self, LocalError> {
        Ok(Self(MessagePart::new(payload)?))
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, LocalError> {
        self.0.deserialize()
    }
}

/// Returned by `verify_*_is_invalid` when a message part deserializes
/// successfully despite the round claiming it should not.
#[derive(Debug, Clone, displaydoc::Display)]
#[displaydoc("{0}")]
pub struct MessageValidationError(String);

impl MessageValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<LocalError> for MessageValidationError {
    fn from(error: LocalError) -> Self {
        Self(format!("{error}"))
    }
}
