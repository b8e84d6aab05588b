/*!
The execution layer: drives a chain of [`Round`](crate::protocol::Round)s
to completion by collecting outbound messages, validating and storing
inbound ones, and finalizing once a quorum has responded.

Grounded on `manul::session::session` (`Session`, `RoundAccumulator`,
`CanFinalize`) and `manul::session::transcript` (`Transcript`,
`SessionReport`). The higher-level, blocking [`Handler`](crate::handler::Handler)
API that callers actually drive is one level up, in [`crate::handler`].
*/

mod accumulator;
mod echo;
mod message;
mod session;
mod transcript;

pub use accumulator::{CanFinalize, RoundAccumulator};
pub use echo::EchoRound;
pub use message::{Message, SessionId};
pub use session::{PreprocessOutcome, Session};
pub use transcript::{SessionOutcome, SessionReport, Transcript, TranscriptEntry};
