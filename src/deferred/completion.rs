//! One-shot completion ports.
//!
//! A [`Completion`] is the write port an operation receives for delivering
//! its result later. Each port is backed by a write-once [`Slot`]: the first
//! delivery goes through, every later one is rejected. The adapter keeps a
//! second reference to the same slot so that a synchronous return and a port
//! firing can never both reach the caller.
//!
//! # Already-resolved policy
//!
//! [`Completion::complete`] drops a late delivery and logs it at `warn`
//! level. [`Completion::try_complete`] returns [`AlreadyResolvedError`]
//! instead, for callers that want to react.
//!
//! # Examples
//!
//! ```rust
//! use sinch::deferred::Completion;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let received = Rc::new(RefCell::new(None));
//! let sink = Rc::clone(&received);
//! let port = Completion::new(move |value| *sink.borrow_mut() = Some(value));
//!
//! port.complete(42);
//! assert_eq!(received.borrow().as_ref().and_then(|v| v.as_int()), Some(42));
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::error::AlreadyResolvedError;
use super::value::Value;

/// A boxed receiver of a single delivered value.
pub type Callback = Box<dyn FnOnce(Value)>;

/// A write-once cell holding the receiver of one delivery.
pub(crate) struct Slot {
    sink: RefCell<Option<Callback>>,
}

impl Slot {
    pub(crate) fn new<K>(sink: K) -> Rc<Self>
    where
        K: FnOnce(Value) + 'static,
    {
        Rc::new(Self {
            sink: RefCell::new(Some(Box::new(sink))),
        })
    }

    /// Hands `value` to the receiver, unless something was delivered before.
    pub(crate) fn deliver(&self, value: Value) -> Result<(), AlreadyResolvedError> {
        // The borrow ends with this statement, so the receiver may re-enter.
        let sink = self.sink.borrow_mut().take();
        let sink = sink.ok_or(AlreadyResolvedError)?;
        sink(value);
        Ok(())
    }

    pub(crate) fn is_resolved(&self) -> bool {
        self.sink.borrow().is_none()
    }
}

/// A one-shot completion port.
///
/// Consumed by [`complete`](Self::complete), so a single port can fire at
/// most once. Ports are not `Clone`; an operation that needs to deliver from
/// somewhere else moves its port there.
pub struct Completion {
    slot: Rc<Slot>,
}

impl Completion {
    /// Creates a port that delivers to `sink`.
    pub fn new<K>(sink: K) -> Self
    where
        K: FnOnce(Value) + 'static,
    {
        Self::from_slot(Slot::new(sink))
    }

    pub(crate) const fn from_slot(slot: Rc<Slot>) -> Self {
        Self { slot }
    }

    /// Delivers `value`.
    ///
    /// If the slot behind this port already delivered (for example because
    /// the operation also returned a value synchronously), `value` is dropped
    /// and a warning is logged.
    pub fn complete(self, value: impl Into<Value>) {
        if let Err(error) = self.try_complete(value) {
            tracing::warn!(%error, "completion fired after its result was delivered; value dropped");
        }
    }

    /// Delivers `value`, reporting a slot that already delivered.
    ///
    /// # Errors
    ///
    /// Returns [`AlreadyResolvedError`] if the slot behind this port already
    /// delivered a value.
    pub fn try_complete(self, value: impl Into<Value>) -> Result<(), AlreadyResolvedError> {
        self.slot.deliver(value.into())
    }

    /// Signals completion without a meaningful result.
    ///
    /// Equivalent to `complete(Value::Null)`; this is how initializers
    /// report that their object is ready.
    pub fn done(self) {
        self.complete(Value::Null);
    }

    /// Returns `true` if the slot behind this port already delivered.
    pub fn is_resolved(&self) -> bool {
        self.slot.is_resolved()
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Completion")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
