//! # sinch
//!
//! Calls that look the same whether the work behind them finishes now or
//! later, and objects that can be used before they finish constructing.
//!
//! ## Overview
//!
//! - **Deferred values**: one-shot results passed around before they exist,
//!   usable directly as arguments to other calls
//! - **Argument join**: waits for every deferred argument of a call and
//!   hands over the values in their positional order
//! - **Callables**: operations that may return a result or complete a port
//!   later, callable with a callback or without one
//! - **Objects**: definitions with inheritance, asynchronous initializers,
//!   and placeholders that queue calls until the object is ready
//! - **Interface chaining**: calls on the object another object's method
//!   will produce, made before either exists
//!
//! Everything is single-threaded and callback-driven. Nothing here spawns,
//! blocks or polls; an executor, if any, belongs to the caller.
//!
//! ## Feature Flags
//!
//! - `deferred`: deferred values, argument join, callables (default)
//! - `object`: definitions, factories, handles and call queues (default)
//! - `serde`: `Serialize`/`Deserialize` for data values
//! - `full`: enable all features
//!
//! ## Example
//!
//! ```rust
//! use sinch::prelude::*;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let double = Callable::new(|values, _| values[0].as_int().map(|n| Value::Int(n * 2)));
//!
//! let received = Rc::new(RefCell::new(Value::Null));
//! let sink = Rc::clone(&received);
//! double
//!     .call(args![double.call(args![10])])
//!     .resolve_with(move |value| *sink.borrow_mut() = value);
//!
//! assert_eq!(*received.borrow(), Value::Int(40));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// Re-exports the public types of every enabled module and the [`args!`]
/// macro.
///
/// # Usage
///
/// ```rust
/// use sinch::prelude::*;
/// ```
pub mod prelude {

    #[cfg(feature = "deferred")]
    pub use crate::args;

    #[cfg(feature = "deferred")]
    pub use crate::deferred::*;

    #[cfg(feature = "object")]
    pub use crate::object::*;
}

#[cfg(feature = "deferred")]
pub mod deferred;

#[cfg(feature = "object")]
pub mod object;
