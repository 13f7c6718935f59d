//! Deferred values, argument joins and dual-mode callables.
//!
//! This module provides the calling convention the rest of the crate is
//! built on:
//!
//! - [`Value`]: the dynamic values operations exchange
//! - [`Completion`]: a one-shot port an operation delivers its result through
//! - [`Deferred`]: a one-shot future result, produced by a call without callback
//! - [`join`]: waits for every deferred argument of a call, preserving order
//! - [`Callable`]: an operation callable with a callback (eager) or without
//!   one (deferred), whether it returns its result or completes later
//!
//! Everything here is single-threaded and callback-driven. No type in this
//! module is `Send`.
//!
//! # Examples
//!
//! ## Passing results as arguments
//!
//! ```rust
//! use sinch::args;
//! use sinch::deferred::{Callable, Value};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let add = Callable::new(|values, port| {
//!     port.complete(values.iter().filter_map(Value::as_int).sum::<i64>());
//!     None
//! });
//!
//! let received = Rc::new(RefCell::new(Value::Null));
//! let sink = Rc::clone(&received);
//! add.call(args![add.call(args![12]), add.call(args![22])])
//!     .resolve_with(move |value| *sink.borrow_mut() = value);
//!
//! assert_eq!(*received.borrow(), Value::Int(34));
//! ```

mod adapter;
mod completion;
mod error;
mod join;
mod pending;
mod value;

pub use adapter::{Callable, Operation};
pub use completion::{Callback, Completion};
pub use error::AlreadyResolvedError;
pub use join::join;
pub use pending::{Argument, Arguments, Deferred};
pub use value::{Fields, Value, merge, merge_fields};

pub(crate) use pending::arguments_from_values;

static_assertions::assert_not_impl_any!(Deferred: Send, Sync);
static_assertions::assert_not_impl_any!(Completion: Send, Sync);
static_assertions::assert_not_impl_any!(Callable: Send, Sync);
