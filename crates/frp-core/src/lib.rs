#![forbid(unsafe_code)]

//! Push-based streams and pull-based behaviors.
//!
//! This crate provides a small functional reactive core built from two dual
//! primitives:
//!
//! - [`Stream`]: a source of discrete occurrences, delivered synchronously
//!   to subscribers in registration order.
//! - [`Behavior`]: a time-varying value read by pulling it "now".
//!
//! Streams derive from streams ([`map`], [`map_to`], [`filter`],
//! [`filter_map`], [`combine`]), Behaviors derive from streams ([`scan`],
//! [`hold`]) and project back into streams ([`at`]), and the snapshot
//! combinators ([`snapshot`], [`snapshot_with`]) pull a Behavior at the
//! instant of each occurrence.
//!
//! # Architecture
//!
//! All nodes use `Rc`/`RefCell` and are single-threaded. Delivery is
//! depth-first and completes before `push` returns; there is no scheduler,
//! queue or batching. Each combinator is a free function with a thin method
//! wrapper on the node type.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use frp_core::{empty, from_function, snapshot_with};
//!
//! let n = Rc::new(Cell::new(10));
//! let source = Rc::clone(&n);
//! let level = from_function(move || source.get());
//!
//! let clicks = empty::<i32>();
//! let sums = snapshot_with(|level: &i32, click: &i32| level + click, &level, &clicks);
//!
//! let seen = Rc::new(Cell::new(0));
//! let sink = Rc::clone(&seen);
//! sums.subscribe(move |v| sink.set(*v));
//!
//! clicks.push(1);
//! assert_eq!(seen.get(), 11);
//! n.set(20);
//! clicks.push(1);
//! assert_eq!(seen.get(), 21);
//! ```

pub mod behavior;
pub mod error;
pub mod kind;
pub mod logging;
pub mod registry;
pub mod snapshot;
pub mod stream;

pub use behavior::{Behavior, at, from_function, hold, scan};
pub use error::{FrpError, Result};
pub use kind::{NodeKind, Origin, Reactive, is_behavior, is_stream};
pub use registry::{Listener, Registry};
pub use snapshot::{snapshot, snapshot_with};
pub use stream::{
    Stream, combine, empty, filter, filter_map, map, map_to, remove_listener, subscribe,
};
