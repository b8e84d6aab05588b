/*!
A generic, round-based execution engine for threshold signature protocols,
plus a dynamic committee-resharing protocol (DYN) built on top of it.

Three signing families share the engine in this crate:

- `cgg21`: a CGG21-style threshold ECDSA scheme (presignature + online finish).
- `frost`: FROST-style threshold Schnorr (secp256k1, P-256, ed25519).
- `dyn_family`: live re-sharing of a group's key material across an evolving
  committee, without ever reconstructing the shared secret.

The engine itself ([`protocol`], [`session`], [`handler`]) is agnostic to
which family is running: it only knows about [`protocol::Round`]s, messages,
and [`error::Abort`]s. See [`adapter`] for a capability-typed surface unifying
all three families behind one `keygen`/`sign`/`refresh` API.
*/

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod adapter;
pub mod config;
pub mod error;
pub mod families;
pub mod group;
pub mod handler;
pub mod network;
pub mod party;
pub mod protocol;
pub mod rollback;
pub mod session;
pub mod utils;

#[cfg(any(test, feature = "dev"))]
pub mod dev;
