/*!
Error types shared by the round engine, the session driver, and the families
built on top of it.

Splits a local bug (`LocalError`, should never happen, indicates a defect in
this crate or its caller) from a remote fault (`RemoteError`, a misbehaving
or confused peer).
*/

use alloc::{
    collections::BTreeSet,
    format,
    string::{String, ToString},
};
use core::fmt;

/// An error caused by a bug in this crate or in the calling code.
///
/// Should never be observed in a correct deployment; if it is, it indicates
/// an invariant of the round engine was violated.
#[derive(Debug, Clone, displaydoc::Display)]
#[displaydoc("{0}")]
pub struct LocalError(String);

impl LocalError {
    /// Creates a new local error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// An error caused by a peer's message that cannot (yet, or ever) be turned
/// into a provable accusation.
#[derive(Debug, Clone, displaydoc::Display)]
#[displaydoc("{message}")]
pub struct RemoteError {
    kind: ErrorKind,
    message: String,
}

impl RemoteError {
    /// Creates a new remote error with the given message, banning its sender
    /// under [`ErrorKind::VerificationFailed`] (the common case: a check
    /// that a peer's contribution is internally consistent failed).
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::VerificationFailed,
            message: message.into(),
        }
    }

    /// Creates a remote error that bans its sender under a specific
    /// [`ErrorKind`] other than the default `VerificationFailed` (e.g.
    /// [`ErrorKind::MixedGeneration`]).
    pub fn with_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The [`ErrorKind`] the sender should be banned under.
    pub fn kind(&self) -> ErrorKind {
        self.kind.clone()
    }
}

/// The taxonomy of ways a session can terminate unsuccessfully, per the
/// error kinds enumerated for the core (not the concrete per-protocol
/// zero-knowledge failures, which are external to this crate).
#[derive(Debug, Clone, PartialEq, Eq, displaydoc::Display)]
pub enum ErrorKind {
    /// the threshold is outside `[1, |parties|]`
    InvalidThreshold,
    /// the participant set is invalid (duplicate, unknown, or not a signer)
    InvalidParticipants,
    /// two Configs of different generations were combined in one session
    MixedGeneration,
    /// a message failed well-formedness checks
    MessageMalformed,
    /// a round completed without a message from a required party
    Missing,
    /// a commitment, share, proof, or signature check failed
    VerificationFailed,
    /// the requested generation is not present in the rollback buffer
    GenerationNotFound,
    /// the requested rollback target is not older than the current generation
    CannotRollForward,
    /// an internal invariant was violated (this is a bug)
    Internal,
}

/// A terminal session failure: an [`ErrorKind`] plus the set of parties
/// held responsible for it.
///
/// Two independent runs of the [`Handler`](crate::handler::Handler) given
/// identical inputs and an identical adversarial message sequence must
/// produce an identical `Abort` (same kind, same culprit set) — see
/// spec testable property "determinism of aborts".
#[derive(Debug, Clone)]
pub struct Abort<Id> {
    kind: ErrorKind,
    culprits: BTreeSet<Id>,
    message: String,
}

impl<Id: Ord> Abort<Id> {
    /// Creates an abort naming no particular culprit (a local or structural failure).
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            culprits: BTreeSet::new(),
            message: message.into(),
        }
    }

    /// Creates an abort naming a single culprit.
    pub fn with_culprit(kind: ErrorKind, culprit: Id, message: impl Into<String>) -> Self {
        let mut culprits = BTreeSet::new();
        culprits.insert(culprit);
        Self {
            kind,
            culprits,
            message: message.into(),
        }
    }

    /// Creates an abort naming a set of culprits.
    pub fn with_culprits(kind: ErrorKind, culprits: BTreeSet<Id>, message: impl Into<String>) -> Self {
        Self {
            kind,
            culprits,
            message: message.into(),
        }
    }

    /// The kind of failure.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The parties held responsible, if any.
    pub fn culprits(&self) -> &BTreeSet<Id> {
        &self.culprits
    }
}

impl<Id: Ord + fmt::Debug> fmt::Display for Abort<Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.culprits.is_empty() {
            write!(f, "{}: {}", self.kind, self.message)
        } else {
            write!(f, "{}: {} (culprits: {:?})", self.kind, self.message, self.culprits)
        }
    }
}

impl<Id> From<LocalError> for Abort<Id>
where
    Id: Ord,
{
    fn from(error: LocalError) -> Self {
        Abort::new(ErrorKind::Internal, error.0)
    }
}

pub(crate) fn internal(message: impl fmt::Display) -> LocalError {
    LocalError::new(message.to_string())
}

pub(crate) fn fmt_err(args: fmt::Arguments<'_>) -> LocalError {
    LocalError::new(format!("{args}"))
}
