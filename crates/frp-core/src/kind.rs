//! Runtime tags distinguishing reactive nodes from ordinary values.
//!
//! Every [`Stream`](crate::Stream) and [`Behavior`](crate::Behavior)
//! reports an explicit [`NodeKind`] through the [`Reactive`] trait. The
//! predicates [`is_stream`] and [`is_behavior`] check that tag, never the
//! shape of the value: a `Vec<Stream<A>>` or an `Option<Stream<A>>` is a
//! container, not a Stream.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;

/// Which reactive primitive a value is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Stream,
    Behavior,
}

/// How a [`Behavior`](crate::Behavior) produces its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Evaluated fresh on every pull.
    Function,
    /// Fixed value.
    Constant,
    /// Accumulated state updated by occurrences of an upstream Stream.
    Stream,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Function => "function",
            Self::Constant => "constant",
            Self::Stream => "stream",
        })
    }
}

/// Values that can be asked whether they are a reactive node.
///
/// The default answer is "no"; only the crate's own node types override
/// [`kind`](Reactive::kind).
pub trait Reactive {
    fn kind(&self) -> Option<NodeKind> {
        None
    }
}

/// True only for values constructed as a [`Stream`](crate::Stream).
///
/// The argument must implement [`Reactive`]. That covers the crate's node
/// types, primitives, strings, the common std collections, `fn` pointers
/// and `dyn Fn` trait objects (also behind `Box` or `Rc`). A closure has an
/// unnameable type, so pass it as `&dyn Fn(..)` or coerce it to a `fn`
/// pointer. Other types opt in with an empty `impl Reactive for T {}`,
/// which reports "not a node".
///
/// ```
/// use frp_core::{Reactive, empty, is_stream};
///
/// struct LooksLikeAStream {
///     listeners: Vec<u32>,
/// }
/// impl Reactive for LooksLikeAStream {}
///
/// let closure: &dyn Fn() -> i32 = &|| 1;
/// assert!(!is_stream(closure));
/// let boxed: Box<dyn Fn() -> i32> = Box::new(|| 1);
/// assert!(!is_stream(&boxed));
/// assert!(!is_stream(&LooksLikeAStream { listeners: vec![] }));
/// assert!(is_stream(&empty::<i32>()));
/// ```
#[must_use]
pub fn is_stream<T: Reactive + ?Sized>(value: &T) -> bool {
    value.kind() == Some(NodeKind::Stream)
}

/// True only for values constructed as a [`Behavior`](crate::Behavior).
#[must_use]
pub fn is_behavior<T: Reactive + ?Sized>(value: &T) -> bool {
    value.kind() == Some(NodeKind::Behavior)
}

macro_rules! inert {
    ($($ty:ty),* $(,)?) => {
        $(impl Reactive for $ty {})*
    };
}

inert!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    str,
    String,
);

impl<T> Reactive for [T] {}
impl<T, const N: usize> Reactive for [T; N] {}
impl<T> Reactive for Vec<T> {}
impl<T> Reactive for VecDeque<T> {}
impl<T> Reactive for Option<T> {}
impl<T> Reactive for HashSet<T> {}
impl<K, V> Reactive for HashMap<K, V> {}
impl<K, V> Reactive for BTreeMap<K, V> {}
impl<R> Reactive for fn() -> R {}
impl<A: ?Sized, R> Reactive for fn(&A) -> R {}
impl<'a, R> Reactive for dyn Fn() -> R + 'a {}
impl<'a, A: ?Sized, R> Reactive for dyn Fn(&A) -> R + 'a {}

impl<T: Reactive + ?Sized> Reactive for &T {
    fn kind(&self) -> Option<NodeKind> {
        (**self).kind()
    }
}

impl<T: Reactive + ?Sized> Reactive for Box<T> {
    fn kind(&self) -> Option<NodeKind> {
        (**self).kind()
    }
}

impl<T: Reactive + ?Sized> Reactive for Rc<T> {
    fn kind(&self) -> Option<NodeKind> {
        (**self).kind()
    }
}
