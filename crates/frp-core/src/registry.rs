#![forbid(unsafe_code)]

//! Ordered listener storage backing every [`Stream`](crate::Stream).
//!
//! # Invariants
//!
//! 1. Callbacks are invoked in registration order.
//! 2. Each callback present when [`Registry::notify`] starts runs exactly
//!    once for that call; callbacks added during the call do not run, and
//!    callbacks removed during the call still run.
//! 3. Removing an entry leaves the relative order of the others intact.
//! 4. Removing an unknown or already-removed [`Listener`] is a no-op.
//!
//! # Failure Modes
//!
//! - **Callback panics**: the panic unwinds out of `notify`; later
//!   callbacks are skipped for that call. No `RefCell` borrow is held while
//!   a callback runs, so the registry remains usable afterwards.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::logging::debug;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

fn next_listener_id() -> u64 {
    NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed)
}

/// Handle to a registered callback, used to request its removal.
///
/// Identities are unique for the whole process, so a handle presented to a
/// registry that never issued it matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Listener {
    id: u64,
}

impl Listener {
    /// Raw identity of this listener.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.id
    }
}

/// What a callback wants done with its entry after running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    Keep,
    /// The callback's target is gone; drop the entry.
    Detach,
}

type Callback<A> = Rc<dyn Fn(&A) -> Delivery>;

struct Entry<A> {
    id: u64,
    callback: Callback<A>,
}

/// Ordered collection of callbacks attached to a push source.
pub struct Registry<A> {
    entries: RefCell<Vec<Entry<A>>>,
}

impl<A: 'static> Registry<A> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
        }
    }

    /// Append `callback` and return its removal handle.
    pub fn subscribe(&self, callback: impl Fn(&A) + 'static) -> Listener {
        self.attach(move |value| {
            callback(value);
            Delivery::Keep
        })
    }

    /// Append a callback that may ask to be detached.
    pub(crate) fn attach(&self, callback: impl Fn(&A) -> Delivery + 'static) -> Listener {
        let id = next_listener_id();
        self.entries.borrow_mut().push(Entry {
            id,
            callback: Rc::new(callback),
        });
        Listener { id }
    }

    /// Remove `listener`. Returns whether an entry was actually removed.
    pub fn remove(&self, listener: Listener) -> bool {
        let mut entries = self.entries.borrow_mut();
        match entries.iter().position(|entry| entry.id == listener.id) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Invoke every callback present at entry, in registration order.
    pub fn notify(&self, value: &A) {
        let snapshot: Vec<(u64, Callback<A>)> = self
            .entries
            .borrow()
            .iter()
            .map(|entry| (entry.id, Rc::clone(&entry.callback)))
            .collect();

        let mut detached = Vec::new();
        for (id, callback) in snapshot {
            if callback(value) == Delivery::Detach {
                detached.push(id);
            }
        }

        if !detached.is_empty() {
            debug!(pruned = detached.len(), "registry.prune");
            self.entries
                .borrow_mut()
                .retain(|entry| !detached.contains(&entry.id));
        }
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl<A: 'static> Default for Registry<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for Registry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("listeners", &self.entries.borrow().len())
            .finish()
    }
}
