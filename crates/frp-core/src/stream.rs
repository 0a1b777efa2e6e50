#![forbid(unsafe_code)]

//! Push-based occurrence sources and their derivation combinators.
//!
//! # Design
//!
//! A [`Stream<A>`] is a shared handle to a node holding a [`Registry`].
//! Upstream registries hold *strong* edges to the nodes derived from them,
//! and derived nodes never point back at their upstream, so the graph has
//! no cycles. A derived node stays reachable through its upstream for as
//! long as it has a handle or a listener; once it has neither, the edge
//! detaches the next time the upstream fires and the node is freed.
//!
//! Each combinator is a free function; the methods on [`Stream`] forward to
//! them.
//!
//! # Invariants
//!
//! 1. `push` notifies every listener registered at that moment exactly
//!    once, in registration order, before returning.
//! 2. Derived streams preserve upstream occurrence order.
//! 3. `map` is 1:1; `filter` and `filter_map` only ever drop occurrences.
//! 4. `combine` forwards each occurrence of either input, unmodified, in
//!    the order the occurrences happened.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::kind::{NodeKind, Reactive};
use crate::logging::trace;
use crate::registry::{Delivery, Listener, Registry};

/// Non-stream state a derived node keeps alive (accumulator cells,
/// sampled Behaviors).
pub(crate) type Upstream = Rc<dyn Any>;

struct StreamNode<A> {
    registry: Registry<A>,
    /// Live [`Stream`] handles; edges from upstream are not counted.
    handles: Cell<usize>,
    _owned: Vec<Upstream>,
}

impl<A: 'static> StreamNode<A> {
    /// Nothing can observe this node any more.
    fn is_orphaned(&self) -> bool {
        self.handles.get() == 0 && self.registry.is_empty()
    }
}

/// Strong edge from an upstream registry to a derived node.
pub(crate) struct Edge<A> {
    node: Rc<StreamNode<A>>,
}

impl<A: 'static> Edge<A> {
    pub(crate) fn fire(&self, value: &A) {
        self.node.registry.notify(value);
    }
}

/// A push-based source of discrete occurrences.
///
/// Cloning a `Stream` creates a new handle to the **same** node.
pub struct Stream<A> {
    node: Rc<StreamNode<A>>,
}

impl<A> Clone for Stream<A> {
    fn clone(&self) -> Self {
        self.node.handles.set(self.node.handles.get() + 1);
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<A> Drop for Stream<A> {
    fn drop(&mut self) {
        self.node.handles.set(self.node.handles.get().saturating_sub(1));
    }
}

impl<A: 'static> Default for Stream<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for Stream<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("registry", &self.node.registry)
            .field("handles", &self.node.handles.get())
            .finish()
    }
}

impl<A> Reactive for Stream<A> {
    fn kind(&self) -> Option<NodeKind> {
        Some(NodeKind::Stream)
    }
}

impl<A: 'static> Stream<A> {
    /// Create a root stream with no listeners and no upstream.
    #[must_use]
    pub fn new() -> Self {
        Self::derived(Vec::new())
    }

    /// Fresh node that keeps `owned` alive as long as it exists.
    pub(crate) fn derived(owned: Vec<Upstream>) -> Self {
        Self {
            node: Rc::new(StreamNode {
                registry: Registry::new(),
                handles: Cell::new(1),
                _owned: owned,
            }),
        }
    }

    /// Forward each occurrence of `self` to `target` through `forward`.
    ///
    /// The edge holds `target` strongly and detaches once `target` has
    /// neither handles nor listeners.
    pub(crate) fn link<B: 'static>(
        &self,
        target: &Stream<B>,
        forward: impl Fn(&A, &Edge<B>) + 'static,
    ) -> Listener {
        let edge = Edge {
            node: Rc::clone(&target.node),
        };
        self.node.registry.attach(move |value| {
            if edge.node.is_orphaned() {
                return Delivery::Detach;
            }
            forward(value, &edge);
            // Forwarding may have pruned the last listener of a chain.
            if edge.node.is_orphaned() {
                Delivery::Detach
            } else {
                Delivery::Keep
            }
        })
    }

    /// Deliver an occurrence by reference.
    pub(crate) fn fire(&self, value: &A) {
        self.node.registry.notify(value);
    }

    /// Deliver occurrence `value` to every current listener.
    pub fn push(&self, value: A) {
        self.fire(&value);
    }

    /// Push each item of `values` in order.
    pub fn push_all(&self, values: impl IntoIterator<Item = A>) {
        for value in values {
            self.fire(&value);
        }
    }

    pub fn subscribe(&self, callback: impl Fn(&A) + 'static) -> Listener {
        subscribe(callback, self)
    }

    pub fn remove_listener(&self, listener: Listener) {
        remove_listener(listener, self);
    }

    #[must_use]
    pub fn map<B: 'static>(&self, f: impl Fn(&A) -> B + 'static) -> Stream<B> {
        map(f, self)
    }

    #[must_use]
    pub fn map_to<B: Clone + 'static>(&self, value: B) -> Stream<B> {
        map_to(value, self)
    }

    #[must_use]
    pub fn filter(&self, predicate: impl Fn(&A) -> bool + 'static) -> Stream<A> {
        filter(predicate, self)
    }

    #[must_use]
    pub fn filter_map<B: 'static>(&self, f: impl Fn(&A) -> Option<B> + 'static) -> Stream<B> {
        filter_map(f, self)
    }

    #[must_use]
    pub fn combine(&self, other: &Stream<A>) -> Stream<A> {
        combine(self, other)
    }

    /// Number of entries in this stream's registry, including links to
    /// derived streams.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.node.registry.len()
    }

    /// Whether two handles refer to the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Stream<A>) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }
}

/// Create a root stream with no listeners and no upstream.
#[must_use]
pub fn empty<A: 'static>() -> Stream<A> {
    Stream::new()
}

/// Attach `callback` to `stream`; it runs once per occurrence.
pub fn subscribe<A: 'static>(callback: impl Fn(&A) + 'static, stream: &Stream<A>) -> Listener {
    let listener = stream.node.registry.subscribe(callback);
    trace!(listener = listener.id(), "stream.subscribe");
    listener
}

/// Detach `listener` from `stream`. Unknown or already-removed listeners
/// are ignored.
pub fn remove_listener<A: 'static>(listener: Listener, stream: &Stream<A>) {
    if stream.node.registry.remove(listener) {
        trace!(listener = listener.id(), "stream.remove_listener");
    }
}

/// Stream of `f(a)` for each occurrence `a` of `stream`.
#[must_use]
pub fn map<A: 'static, B: 'static>(
    f: impl Fn(&A) -> B + 'static,
    stream: &Stream<A>,
) -> Stream<B> {
    let out = Stream::new();
    stream.link(&out, move |value, out| out.fire(&f(value)));
    out
}

/// Stream that emits `value` for each occurrence of `stream`.
#[must_use]
pub fn map_to<A: 'static, B: Clone + 'static>(value: B, stream: &Stream<A>) -> Stream<B> {
    map(move |_| value.clone(), stream)
}

/// Stream of the occurrences of `stream` for which `predicate` holds.
#[must_use]
pub fn filter<A: 'static>(
    predicate: impl Fn(&A) -> bool + 'static,
    stream: &Stream<A>,
) -> Stream<A> {
    let out = Stream::new();
    stream.link(&out, move |value, out| {
        if predicate(value) {
            out.fire(value);
        }
    });
    out
}

/// Map and filter in one step: `None` results are dropped.
#[must_use]
pub fn filter_map<A: 'static, B: 'static>(
    f: impl Fn(&A) -> Option<B> + 'static,
    stream: &Stream<A>,
) -> Stream<B> {
    let out = Stream::new();
    stream.link(&out, move |value, out| {
        if let Some(mapped) = f(value) {
            out.fire(&mapped);
        }
    });
    out
}

/// Stream carrying every occurrence of both `a` and `b`, as they happen.
#[must_use]
pub fn combine<A: 'static>(a: &Stream<A>, b: &Stream<A>) -> Stream<A> {
    let out = Stream::new();
    a.link(&out, |value, out| out.fire(value));
    b.link(&out, |value, out| out.fire(value));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    #[cfg(feature = "tracing")]
    use std::sync::{Arc, Mutex};
    #[cfg(feature = "tracing")]
    use tracing::Subscriber;
    #[cfg(feature = "tracing")]
    use tracing_subscriber::Layer;
    #[cfg(feature = "tracing")]
    use tracing_subscriber::layer::{Context, SubscriberExt};

    fn collect<A: Clone + 'static>(stream: &Stream<A>) -> Rc<RefCell<Vec<A>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        stream.subscribe(move |v: &A| sink.borrow_mut().push(v.clone()));
        seen
    }

    #[test]
    fn push_reaches_every_listener() {
        let s: Stream<i32> = empty();
        let first = collect(&s);
        let second = collect(&s);

        s.push(2);
        s.push(3);

        assert_eq!(*first.borrow(), vec![2, 3]);
        assert_eq!(*second.borrow(), vec![2, 3]);
    }

    #[test]
    fn removed_listener_stops_receiving() {
        let s: Stream<i32> = empty();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let l = s.subscribe(move |_: &i32| c.set(c.get() + 1));

        s.push(1);
        s.remove_listener(l);
        s.push(2);
        s.remove_listener(l);

        assert_eq!(count.get(), 1);
        assert_eq!(s.listener_count(), 0);
    }

    #[test]
    fn map_is_one_to_one() {
        let s: Stream<i32> = empty();
        let seen = collect(&s.map(|v| v + 2));
        s.push_all(0..5);
        assert_eq!(*seen.borrow(), vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn map_to_emits_constant() {
        let s: Stream<i32> = empty();
        let seen = collect(&s.map_to(7));
        s.push_all([1, 2, 3]);
        assert_eq!(*seen.borrow(), vec![7, 7, 7]);
    }

    #[test]
    fn filter_drops_silently() {
        let s: Stream<i32> = empty();
        let seen = collect(&filter(|v: &i32| v % 2 == 0, &s));
        s.push_all(0..10);
        assert_eq!(*seen.borrow(), vec![0, 2, 4, 6, 8]);
    }

    #[test]
    fn filter_map_combines_both() {
        let s: Stream<&str> = empty();
        let seen = collect(&s.filter_map(|v| v.parse::<u8>().ok()));
        s.push_all(["1", "x", "3"]);
        assert_eq!(*seen.borrow(), vec![1, 3]);
    }

    #[test]
    fn combine_interleaves_in_occurrence_order() {
        let a: Stream<i32> = empty();
        let b = empty();
        let seen = collect(&combine(&a, &b));

        a.push(1);
        b.push(2);
        b.push(3);
        a.push(4);

        assert_eq!(*seen.borrow(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn subscribed_temporary_keeps_receiving() {
        let s: Stream<i32> = empty();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        s.map(|v| v + 2).subscribe(move |v| sink.borrow_mut().push(*v));

        s.push_all(0..3);
        assert_eq!(*seen.borrow(), vec![2, 3, 4]);
        assert_eq!(s.listener_count(), 1);
    }

    #[test]
    fn chain_is_released_after_last_listener_removed() {
        let root: Stream<i32> = empty();
        let tail = root.filter(|v| v % 2 == 0).map(|v| v * 10);
        let node = Rc::downgrade(&tail.node);
        let l = tail.subscribe(|_| {});

        root.push(0);
        tail.remove_listener(l);
        drop(tail);
        assert!(node.upgrade().is_some());
        assert_eq!(root.listener_count(), 1);

        // One push releases the whole orphaned chain.
        root.push(2);
        assert_eq!(root.listener_count(), 0);
        assert!(node.upgrade().is_none());
    }

    #[test]
    fn dropped_derived_stream_is_pruned_from_upstream() {
        let root: Stream<i32> = empty();
        let mapped = root.map(|v| v + 1);
        assert_eq!(root.listener_count(), 1);

        drop(mapped);
        assert_eq!(root.listener_count(), 1);
        root.push(0);
        assert_eq!(root.listener_count(), 0);
    }

    #[test]
    fn clone_shares_node() {
        let s: Stream<u8> = empty();
        let t = s.clone();
        let seen = collect(&t);
        s.push(9);
        assert!(s.ptr_eq(&t));
        assert_eq!(*seen.borrow(), vec![9]);
    }

    #[test]
    fn reentrant_push_is_delivered_depth_first() {
        let s: Stream<i32> = empty();
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner = s.clone();
        let l = Rc::clone(&log);
        s.subscribe(move |v| {
            l.borrow_mut().push(format!("a{v}"));
            if *v == 0 {
                inner.push(1);
            }
        });
        let l = Rc::clone(&log);
        s.subscribe(move |v| l.borrow_mut().push(format!("b{v}")));

        s.push(0);
        assert_eq!(*log.borrow(), vec!["a0", "a1", "b1", "b0"]);
    }

    #[test]
    fn debug_format() {
        let s: Stream<i32> = empty();
        let m = s.map(|v| *v);
        let dbg = format!("{m:?}");
        assert!(dbg.contains("Stream"));
        assert!(dbg.contains("handles: 1"));
    }

    #[cfg(feature = "tracing")]
    struct MessageCapture {
        messages: Arc<Mutex<Vec<String>>>,
    }

    #[cfg(feature = "tracing")]
    impl<S: Subscriber> Layer<S> for MessageCapture {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            struct Msg {
                message: Option<String>,
            }
            impl tracing::field::Visit for Msg {
                fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                    if field.name() == "message" {
                        self.message = Some(value.to_string());
                    }
                }

                fn record_debug(
                    &mut self,
                    field: &tracing::field::Field,
                    value: &dyn std::fmt::Debug,
                ) {
                    if field.name() == "message" {
                        self.message = Some(format!("{value:?}").trim_matches('"').to_string());
                    }
                }
            }
            let mut msg = Msg { message: None };
            event.record(&mut msg);
            if let Some(message) = msg.message {
                self.messages.lock().expect("capture lock").push(message);
            }
        }
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn subscribe_and_remove_emit_trace_events() {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(MessageCapture {
            messages: Arc::clone(&messages),
        });
        let _guard = tracing::subscriber::set_default(subscriber);

        let s: Stream<i32> = empty();
        let l = s.subscribe(|_| {});
        s.remove_listener(l);
        s.remove_listener(l);

        let seen = messages.lock().expect("capture lock");
        assert_eq!(*seen, vec!["stream.subscribe", "stream.remove_listener"]);
    }
}
