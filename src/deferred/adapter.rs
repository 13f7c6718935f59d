//! Dual-mode callables.
//!
//! [`Callable`] wraps an operation so that the same call site works whether
//! the operation returns its result directly or delivers it later through a
//! [`Completion`] port, and whether the caller wants the result now (eager
//! mode, [`Callable::call_with`]) or wants to pass it on as a dependency of
//! another call (deferred mode, [`Callable::call`]).
//!
//! # Invocation
//!
//! 1. The arguments are resolved with [`join`].
//! 2. The operation runs with a fresh completion port owned by this
//!    invocation alone.
//! 3. A synchronous `Some(value)` return is delivered like a port firing.
//!    The slot is write-once: whichever of the two delivers first wins.
//!
//! # Examples
//!
//! ```rust
//! use sinch::args;
//! use sinch::deferred::{Callable, Value};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let add = Callable::new(|values, _port| {
//!     Some(Value::Int(values.iter().filter_map(Value::as_int).sum()))
//! });
//! let emit = Callable::new(|values, port| {
//!     port.complete(format!("called back: {}", values[0]));
//!     None
//! });
//!
//! let received = Rc::new(RefCell::new(None));
//! let sink = Rc::clone(&received);
//! emit.call_with(args![add.call(args![2, 3, 4])], move |value| {
//!     *sink.borrow_mut() = Some(value);
//! });
//!
//! assert_eq!(*received.borrow(), Some(Value::from("called back: 9")));
//! ```

use std::fmt;
use std::rc::Rc;

use super::completion::{Callback, Completion, Slot};
use super::join::join;
use super::pending::{Arguments, Deferred};
use super::value::Value;

/// An operation: receives its resolved arguments and a completion port.
///
/// Returning `Some(value)` delivers `value` synchronously; returning `None`
/// means the result arrives through the port.
pub type Operation = dyn Fn(Vec<Value>, Completion) -> Option<Value>;

/// An operation wrapped for sync/async-agnostic calling.
///
/// Cloning is cheap and shares the operation.
#[derive(Clone)]
pub struct Callable {
    operation: Rc<Operation>,
    name: Option<Rc<str>>,
}

impl Callable {
    /// Wraps `operation`.
    pub fn new<F>(operation: F) -> Self
    where
        F: Fn(Vec<Value>, Completion) -> Option<Value> + 'static,
    {
        Self {
            operation: Rc::new(operation),
            name: None,
        }
    }

    /// Attaches a name, used in log records.
    #[must_use]
    pub fn named(mut self, name: impl Into<Rc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the name given with [`named`](Self::named), if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Calls in deferred mode.
    ///
    /// Nothing runs yet. The returned [`Deferred`] resolves the arguments and
    /// runs the operation when it is consumed, for example by passing it as an
    /// argument to another call.
    pub fn call(&self, arguments: Arguments) -> Deferred {
        tracing::trace!(
            operation = self.name().unwrap_or("<anonymous>"),
            arity = arguments.len(),
            mode = "deferred",
            "call"
        );
        let callable = self.clone();
        Deferred::new(move |port| callable.run(arguments, port))
    }

    /// Calls in eager mode, delivering the result to `callback`.
    ///
    /// The operation runs as soon as every argument is resolved, which is
    /// before this method returns if none is pending.
    pub fn call_with<K>(&self, arguments: Arguments, callback: K)
    where
        K: FnOnce(Value) + 'static,
    {
        tracing::trace!(
            operation = self.name().unwrap_or("<anonymous>"),
            arity = arguments.len(),
            mode = "eager",
            "call"
        );
        self.run(arguments, Completion::new(callback));
    }

    /// Calls in eager mode when `callback` is present, in deferred mode otherwise.
    pub fn invoke(&self, arguments: Arguments, callback: Option<Callback>) -> Option<Deferred> {
        match callback {
            Some(callback) => {
                self.call_with(arguments, callback);
                None
            }
            None => Some(self.call(arguments)),
        }
    }

    fn run(&self, arguments: Arguments, outgoing: Completion) {
        let operation = Rc::clone(&self.operation);
        join(arguments, move |values| apply(&*operation, values, outgoing));
    }
}

/// Runs `operation` once with a fresh slot forwarding to `outgoing`.
fn apply(operation: &Operation, values: Vec<Value>, outgoing: Completion) {
    let slot = Slot::new(move |value| outgoing.complete(value));
    let returned = operation(values, Completion::from_slot(Rc::clone(&slot)));
    if let Some(value) = returned
        && slot.deliver(value).is_err()
    {
        tracing::warn!("operation returned a value after completing through its port; returned value dropped");
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Callable")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}
