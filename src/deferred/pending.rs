//! Deferred values and call arguments.
//!
//! A [`Deferred`] is the result of a call made without a callback. It is
//! lazy: nothing runs until the deferred is consumed with
//! [`Deferred::resolve_with`], either by a caller or by [`join`] when the
//! deferred is used as an argument to another call.
//!
//! [`Argument`] is the tagged union of a concrete [`Value`] and a pending
//! [`Deferred`]; [`Arguments`] is a positional list of them.
//!
//! [`join`]: super::join

use std::fmt;

use smallvec::SmallVec;

use super::completion::Completion;
use super::value::{Fields, Value};

#[cfg(feature = "object")]
use crate::object::Handle;

/// A resolver: receives the port through which the deferred result is delivered.
type Resolver = Box<dyn FnOnce(Completion)>;

/// The internal state of a [`Deferred`].
enum DeferredState {
    /// The value is already known.
    Resolved(Value),
    /// The value is produced by running the resolver.
    Pending(Resolver),
}

/// A one-shot future result.
///
/// A `Deferred` is consumed exactly once: `resolve_with` takes `self`.
///
/// # Examples
///
/// ```rust
/// use sinch::deferred::Deferred;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let deferred = Deferred::new(|port| port.complete(21)).map(|value| {
///     (value.as_int().unwrap_or_default() * 2).into()
/// });
///
/// let result = Rc::new(Cell::new(0));
/// let sink = Rc::clone(&result);
/// deferred.resolve_with(move |value| sink.set(value.as_int().unwrap_or_default()));
/// assert_eq!(result.get(), 42);
/// ```
pub struct Deferred {
    state: DeferredState,
}

impl Deferred {
    /// Creates a pending deferred from a resolver.
    ///
    /// The resolver runs when the deferred is consumed and delivers through
    /// the port it is handed, immediately or later.
    pub fn new<F>(resolver: F) -> Self
    where
        F: FnOnce(Completion) + 'static,
    {
        Self {
            state: DeferredState::Pending(Box::new(resolver)),
        }
    }

    /// Creates a deferred whose value is already known.
    pub fn resolved(value: impl Into<Value>) -> Self {
        Self {
            state: DeferredState::Resolved(value.into()),
        }
    }

    /// Returns `true` if the value is already known.
    #[inline]
    pub const fn is_resolved(&self) -> bool {
        matches!(self.state, DeferredState::Resolved(_))
    }

    /// Consumes the deferred, delivering its value to `callback`.
    ///
    /// `callback` runs synchronously if the value is known or the resolver
    /// delivers immediately, otherwise whenever the resolver's port fires.
    pub fn resolve_with<K>(self, callback: K)
    where
        K: FnOnce(Value) + 'static,
    {
        match self.state {
            DeferredState::Resolved(value) => callback(value),
            DeferredState::Pending(resolver) => resolver(Completion::new(callback)),
        }
    }

    /// Applies `function` to the eventual value.
    pub fn map<F>(self, function: F) -> Self
    where
        F: FnOnce(Value) -> Value + 'static,
    {
        match self.state {
            DeferredState::Resolved(value) => Self::resolved(function(value)),
            DeferredState::Pending(resolver) => Self::new(move |port| {
                resolver(Completion::new(move |value| port.complete(function(value))));
            }),
        }
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            DeferredState::Resolved(value) => formatter.debug_tuple("Deferred").field(value).finish(),
            DeferredState::Pending(_) => formatter.debug_tuple("Deferred").field(&"<pending>").finish(),
        }
    }
}

/// One positional argument: a concrete value or a pending dependency.
#[derive(Debug)]
pub enum Argument {
    /// A concrete value.
    Value(Value),
    /// A value that is waited for before the receiving operation runs.
    Deferred(Deferred),
}

/// A positional argument list.
///
/// Most calls take a handful of arguments, so they are stored inline.
pub type Arguments = SmallVec<[Argument; 4]>;

impl From<Deferred> for Argument {
    fn from(deferred: Deferred) -> Self {
        Self::Deferred(deferred)
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

macro_rules! argument_from_value {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for Argument {
                fn from(value: $source) -> Self {
                    Self::Value(Value::from(value))
                }
            }
        )*
    };
}

argument_from_value!(bool, i32, i64, f64, &str, String, Vec<Value>, Fields, ());

#[cfg(feature = "object")]
argument_from_value!(Handle);

/// Converts resolved values back into an argument list.
pub(crate) fn arguments_from_values(values: Vec<Value>) -> Arguments {
    values.into_iter().map(Argument::Value).collect()
}

/// Builds an [`Arguments`] list, converting each element with `Argument::from`.
///
/// # Examples
///
/// ```rust
/// use sinch::args;
/// use sinch::deferred::{Argument, Deferred};
///
/// let arguments = args![1, "two", Deferred::resolved(3)];
/// assert_eq!(arguments.len(), 3);
/// assert!(matches!(arguments[2], Argument::Deferred(_)));
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::deferred::Arguments::new()
    };
    ($($argument:expr),+ $(,)?) => {{
        let mut arguments = $crate::deferred::Arguments::new();
        $(arguments.push($crate::deferred::Argument::from($argument));)+
        arguments
    }};
}
