/*!
Utilities for testing protocols: a synchronous in-process network
([`run_sync`]) and a single-malicious-party fault-injection combinator
([`misbehave`]).

Gated behind `test`/`dev` since none of this is meant for production use —
mirrors `manul::dev`'s split, minus the signature/session-parameters layer
this crate's [`crate::handler::Handler`] does not carry.
*/

mod misbehave;
mod run_sync;

pub use misbehave::{assert_culprit_identified, run_with_one_malicious_party, Behavior, Misbehaving, MisbehavingEntryPoint};
pub use run_sync::{run_sync, ExecutionResult};
