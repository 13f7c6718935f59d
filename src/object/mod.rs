//! Objects with asynchronous initialisation and queued calls.
//!
//! A kind is declared with a [`Definition`] and built into a [`Factory`].
//! Constructing an object returns a [`Handle`] right away. If the kind has an
//! initializer, the handle is a placeholder until the initializer completes:
//! every call made on it meanwhile is queued and replayed in order once the
//! object is ready. Callers never wait for construction.
//!
//! - [`Definition`]: method table, data fields, initializer, base
//! - [`Factory`]: constructs objects of one kind
//! - [`Instance`]: what method implementations operate on
//! - [`Handle`]: a reference to an object, ready or pending
//!
//! # Examples
//!
//! ```rust
//! use sinch::args;
//! use sinch::deferred::{Completion, Value};
//! use sinch::object::Definition;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let parked: Rc<RefCell<Option<Completion>>> = Rc::new(RefCell::new(None));
//! let store = Rc::clone(&parked);
//!
//! let cat = Definition::new("Cat")
//!     .initializer(move |this, values, port| {
//!         this.set("name", values[0].clone());
//!         *store.borrow_mut() = Some(port);
//!     })
//!     .method("meow", |this, _, _| {
//!         Some(format!("{} the cat meows.", this.get("name").unwrap_or_default()).into())
//!     })
//!     .build()
//!     .unwrap();
//!
//! let heard = Rc::new(RefCell::new(Vec::new()));
//! let kitty = cat.construct(args!["Kitty"]);
//! for _ in 0..2 {
//!     let sink = Rc::clone(&heard);
//!     kitty
//!         .call_with("meow", args![], move |value| sink.borrow_mut().push(value))
//!         .unwrap();
//! }
//! assert!(heard.borrow().is_empty());
//!
//! let port = parked.borrow_mut().take().unwrap();
//! port.done();
//! assert_eq!(
//!     *heard.borrow(),
//!     vec![Value::from("Kitty the cat meows."), Value::from("Kitty the cat meows.")]
//! );
//! ```

mod definition;
mod error;
mod factory;
mod handle;
mod queue;

pub use definition::{Definition, Initializer, MethodOperation};
pub use error::{CallError, DefinitionError};
pub use factory::{Factory, Instance};
pub use handle::Handle;

static_assertions::assert_not_impl_any!(Handle: Send, Sync);
static_assertions::assert_not_impl_any!(Factory: Send, Sync);
