#![forbid(unsafe_code)]

//! Sampling Behaviors at the instant of Stream occurrences.
//!
//! The snapshot combinators are the only place where push and pull meet: an
//! occurrence on the trigger stream causes an immediate [`Behavior::pull`],
//! and the result is pushed downstream before the trigger's `push` returns.
//!
//! # Invariants
//!
//! 1. The pull happens after the occurrence is known and before the result
//!    is pushed, so it observes every mutation made earlier in the same
//!    tick.
//! 2. One downstream occurrence per trigger occurrence.
//!
//! # Failure Modes
//!
//! - **Evaluator panics**: unwinds out of the trigger's `push`. Nothing is
//!   delivered downstream for that occurrence and trigger listeners
//!   registered after the snapshot link are not invoked.

use crate::behavior::Behavior;
use crate::stream::Stream;

/// Stream of `behavior`'s value, pulled at each occurrence of `stream`.
///
/// The occurrence payload itself is discarded.
#[must_use]
pub fn snapshot<A: Clone + 'static, B: 'static>(
    behavior: &Behavior<A>,
    stream: &Stream<B>,
) -> Stream<A> {
    snapshot_with(|pulled: &A, _: &B| pulled.clone(), behavior, stream)
}

/// Stream of `f(&pulled, &occurrence)` for each occurrence of `stream`,
/// where `pulled` is `behavior`'s value at that instant.
#[must_use]
pub fn snapshot_with<A: Clone + 'static, B: 'static, C: 'static>(
    f: impl Fn(&A, &B) -> C + 'static,
    behavior: &Behavior<A>,
    stream: &Stream<B>,
) -> Stream<C> {
    let out = Stream::derived(vec![behavior.as_upstream()]);
    let weak_behavior = behavior.downgrade();
    stream.link(&out, move |value, out| {
        // `out` owns the Behavior, so it is alive whenever `out` is.
        if let Some(behavior) = Behavior::upgrade(&weak_behavior) {
            let pulled = behavior.pull();
            out.fire(&f(&pulled, value));
        }
    });
    out
}

impl<B: 'static> Stream<B> {
    #[must_use]
    pub fn snapshot<A: Clone + 'static>(&self, behavior: &Behavior<A>) -> Stream<A> {
        snapshot(behavior, self)
    }

    #[must_use]
    pub fn snapshot_with<A: Clone + 'static, C: 'static>(
        &self,
        behavior: &Behavior<A>,
        f: impl Fn(&A, &B) -> C + 'static,
    ) -> Stream<C> {
        snapshot_with(f, behavior, self)
    }
}
