#![forbid(unsafe_code)]

//! Pull-based values sampled on demand.
//!
//! # Design
//!
//! A [`Behavior<A>`] has one read operation, [`pull`](Behavior::pull),
//! which returns the value "as of now". There are three origins:
//!
//! - **Function**: an evaluator run fresh on every pull. Nothing is cached,
//!   so evaluators reading external mutable state always see its latest
//!   value.
//! - **Constant**: a fixed value.
//! - **Stream**: state accumulated from the occurrences of an upstream
//!   [`Stream`] by [`scan`] or [`hold`]. The state changes exactly once per
//!   upstream occurrence, and [`at`] exposes those changes as a Stream.
//!
//! # Invariants
//!
//! 1. For a Stream-origin Behavior the state is replaced before any
//!    listener of its [`at`] projection runs, so those listeners pulling
//!    the Behavior observe the post-update value.
//! 2. Pulls without an intervening upstream occurrence return the same
//!    value for Stream-origin and constant Behaviors.
//! 3. Pulling touches no bookkeeping of the Behavior itself.
//!
//! # Failure Modes
//!
//! - **Evaluator panics**: the panic unwinds out of `pull` (and out of any
//!   `push` that triggered the pull through a snapshot).
//! - **`at` on a non-Stream origin**: returns
//!   [`FrpError::NotStreamOrigin`]; there is no discrete change to project.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{FrpError, Result};
use crate::kind::{NodeKind, Origin, Reactive};
use crate::logging::debug;
use crate::stream::{Stream, Upstream};

pub(crate) enum BehaviorInner<A> {
    Function(Box<dyn Fn() -> A>),
    Constant(A),
    Accumulated {
        state: Rc<RefCell<A>>,
        changes: Stream<A>,
    },
}

/// A value that varies over time and is read by pulling.
///
/// Cloning a `Behavior` creates a new handle to the **same** inner state.
pub struct Behavior<A> {
    inner: Rc<BehaviorInner<A>>,
}

impl<A> Clone for Behavior<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A: fmt::Debug> fmt::Debug for Behavior<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("Behavior");
        out.field("origin", &self.origin());
        match &*self.inner {
            BehaviorInner::Function(_) => {}
            BehaviorInner::Constant(value) => {
                out.field("value", value);
            }
            BehaviorInner::Accumulated { state, .. } => {
                out.field("state", &*state.borrow());
            }
        }
        out.finish()
    }
}

impl<A> Reactive for Behavior<A> {
    fn kind(&self) -> Option<NodeKind> {
        Some(NodeKind::Behavior)
    }
}

impl<A> Behavior<A> {
    /// How this Behavior produces its value.
    #[must_use]
    pub fn origin(&self) -> Origin {
        match &*self.inner {
            BehaviorInner::Function(_) => Origin::Function,
            BehaviorInner::Constant(_) => Origin::Constant,
            BehaviorInner::Accumulated { .. } => Origin::Stream,
        }
    }

    /// Whether [`at`] can project this Behavior's changes.
    #[must_use]
    pub fn is_stream_origin(&self) -> bool {
        self.origin() == Origin::Stream
    }

    pub(crate) fn downgrade(&self) -> Weak<BehaviorInner<A>> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<BehaviorInner<A>>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }
}

impl<A: Clone + 'static> Behavior<A> {
    /// Behavior whose every pull calls `thunk`.
    #[must_use]
    pub fn from_fn(thunk: impl Fn() -> A + 'static) -> Self {
        Self {
            inner: Rc::new(BehaviorInner::Function(Box::new(thunk))),
        }
    }

    /// Behavior that always yields `value`.
    #[must_use]
    pub fn constant(value: A) -> Self {
        Self {
            inner: Rc::new(BehaviorInner::Constant(value)),
        }
    }

    /// Sample the value now.
    ///
    /// # Panics
    ///
    /// Propagates any panic raised by a function-origin evaluator.
    #[must_use]
    pub fn pull(&self) -> A {
        match &*self.inner {
            BehaviorInner::Function(thunk) => thunk(),
            BehaviorInner::Constant(value) => value.clone(),
            BehaviorInner::Accumulated { state, .. } => state.borrow().clone(),
        }
    }

    /// Function-origin Behavior applying `f` to each pull of `self`.
    #[must_use]
    pub fn map<B: Clone + 'static>(&self, f: impl Fn(A) -> B + 'static) -> Behavior<B> {
        let source = self.clone();
        Behavior::from_fn(move || f(source.pull()))
    }

    pub fn at(&self) -> Result<Stream<A>> {
        at(self)
    }

    /// Type-erased strong reference, for derived nodes that must keep this
    /// Behavior alive.
    pub(crate) fn as_upstream(&self) -> Upstream {
        Rc::clone(&self.inner) as Upstream
    }
}

/// Behavior whose every pull calls `thunk`.
#[must_use]
pub fn from_function<A: Clone + 'static>(thunk: impl Fn() -> A + 'static) -> Behavior<A> {
    Behavior::from_fn(thunk)
}

/// Accumulate the occurrences of `stream` into a Behavior.
///
/// The state starts at `initial` and becomes `f(&state, &a)` on every
/// occurrence `a`. The update happens before listeners of [`at`] are
/// notified.
#[must_use]
pub fn scan<A: 'static, B: Clone + 'static>(
    f: impl Fn(&B, &A) -> B + 'static,
    initial: B,
    stream: &Stream<A>,
) -> Behavior<B> {
    let state = Rc::new(RefCell::new(initial));
    let changes = Stream::derived(vec![Rc::clone(&state) as Upstream]);

    let weak_state = Rc::downgrade(&state);
    stream.link(&changes, move |value, changes| {
        let Some(state) = weak_state.upgrade() else {
            return;
        };
        // Clone out so no borrow is held while `f` or listeners run.
        let current = state.borrow().clone();
        let next = f(&current, value);
        *state.borrow_mut() = next.clone();
        changes.fire(&next);
    });

    Behavior {
        inner: Rc::new(BehaviorInner::Accumulated { state, changes }),
    }
}

/// Behavior holding the latest occurrence of `stream`, `initial` before
/// the first one.
#[must_use]
pub fn hold<A: Clone + 'static>(initial: A, stream: &Stream<A>) -> Behavior<A> {
    scan(|_, value: &A| value.clone(), initial, stream)
}

/// Stream of a Stream-origin Behavior's updated values.
///
/// # Errors
///
/// Returns [`FrpError::NotStreamOrigin`] for function-origin and constant
/// Behaviors, which have no discrete updates.
pub fn at<A>(behavior: &Behavior<A>) -> Result<Stream<A>> {
    match &*behavior.inner {
        BehaviorInner::Accumulated { changes, .. } => Ok(changes.clone()),
        _ => {
            let origin = behavior.origin();
            debug!(origin = %origin, "behavior.at_misuse");
            Err(FrpError::not_stream_origin(origin))
        }
    }
}

impl<A: 'static> Stream<A> {
    #[must_use]
    pub fn scan<B: Clone + 'static>(
        &self,
        initial: B,
        f: impl Fn(&B, &A) -> B + 'static,
    ) -> Behavior<B> {
        scan(f, initial, self)
    }
}

impl<A: Clone + 'static> Stream<A> {
    #[must_use]
    pub fn hold(&self, initial: A) -> Behavior<A> {
        hold(initial, self)
    }
}
