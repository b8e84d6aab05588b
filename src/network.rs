/*!
The external collaborators the round engine consumes but never implements
itself: a transport and a worker pool.

Per spec's external-collaborators contract, this crate ships only the
traits; a production caller supplies an authenticated, reliable-broadcast
transport and a real thread/task pool. The in-memory implementations used by
this crate's own tests live under [`crate::dev`], gated behind the `dev`
feature, and are not meant for production use.
*/

use alloc::boxed::Box;

use crate::{
    error::LocalError,
    protocol::{DirectMessage, EchoBroadcast, NormalBroadcast},
};

/// A message part tagged with which channel it travelled on, as handed to
/// [`Network::send`].
#[derive(Debug, Clone)]
pub enum NetworkPayload {
    Direct(DirectMessage),
    Echo(EchoBroadcast),
    Normal(NormalBroadcast),
}

/// The minimal transport the engine needs: authenticated point-to-point
/// delivery, and reliable broadcast when `to` is `None`.
///
/// Ported in spirit from the "duck-typed network objects" the source uses
/// for fault injection (see `SPEC_FULL.md`'s redesign notes): this crate
/// specifies only the one method the core actually calls, leaving
/// authentication, retries, and broadcast reliability to the implementation.
pub trait Network<Id> {
    /// Sends `payload` from `from` to `to` (`None` meaning "everyone").
    fn send(&self, from: &Id, to: Option<&Id>, payload: NetworkPayload) -> Result<(), LocalError>;
}

/// A handle to a scoped pool of worker threads/tasks for parallelising
/// per-round cryptographic work (commitment verification, polynomial
/// evaluation at many points) that must complete before `finalize` returns.
///
/// Acquired on session construction and released on drop, per spec's
/// "scoped resource... release on every exit path" teardown requirement;
/// `spawn_blocking` is deliberately synchronous-returning (`Result<T,
/// LocalError>` rather than a future) since the engine's suspension points
/// are round boundaries, not individual closures.
pub trait WorkerPool: Send + Sync {
    /// Runs `closure` on the pool, blocking the caller until it completes.
    fn spawn_blocking(&self, closure: Box<dyn FnOnce() -> Result<(), LocalError> + Send>) -> Result<(), LocalError>;
}

/// A trivial [`WorkerPool`] that runs everything on the calling thread.
///
/// Useful for tests and single-threaded embedding; teardown is a no-op, so
/// it is idempotent by construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlinePool;

impl WorkerPool for InlinePool {
    fn spawn_blocking(&self, closure: Box<dyn FnOnce() -> Result<(), LocalError> + Send>) -> Result<(), LocalError> {
        closure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn inline_pool_runs_closure_synchronously() {
        static RAN: AtomicBool = AtomicBool::new(false);
        let pool = InlinePool;
        pool.spawn_blocking(Box::new(|| {
            RAN.store(true, Ordering::SeqCst);
            Ok(())
        }))
        .unwrap();
        assert!(RAN.load(Ordering::SeqCst));
    }
}
