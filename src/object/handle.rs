//! Handles to objects that may still be under construction.
//!
//! A [`Handle`] is a node that is either pending (a placeholder with a call
//! queue and a list of readiness subscribers) or ready (bound to its
//! instance). Calls go through the same methods in both states: a pending
//! handle queues them, a ready handle runs them.
//!
//! # Interface chaining
//!
//! [`Handle::chain`] calls an interface method and returns, immediately, a
//! placeholder for the object that method will produce. Calls on that
//! placeholder are queued until the outer object is ready, the method has
//! run, and the produced object is ready too. Chains nest to any depth.
//!
//! The produced object must be of the declared result kind or of a kind
//! extending it. Anything else leaves the placeholder pending and logs a
//! warning.
//!
//! # Panics in queued calls
//!
//! A panic raised by a queued call propagates to whoever fired the
//! initializer's port. The object is still marked ready: calls made
//! afterwards run normally. Calls still queued behind the panicking one are
//! dropped with a warning, and so are the readiness subscribers.
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
//! let mouse = Definition::new("Mouse")
//!     .initializer(|this, values, port| {
//!         this.set("name", values[0].clone());
//!         port.done();
//!     })
//!     .method("squeak", |this, _, _| {
//!         Some(format!("{} squeaks", this.get("name").unwrap_or_default()).into())
//!     })
//!     .build()
//!     .unwrap();
//!
//! let catcher = mouse.clone();
//! let cat = Definition::new("Cat")
//!     .initializer(move |_, _, port| *store.borrow_mut() = Some(port))
//!     .interface("catch_mouse", &mouse, move |_, values, _| {
//!         Some(catcher.construct(values.into_iter().map(Into::into).collect()).into())
//!     })
//!     .build()
//!     .unwrap();
//!
//! let received = Rc::new(RefCell::new(Value::Null));
//! let sink = Rc::clone(&received);
//!
//! let kitty = cat.construct(args![]);
//! kitty
//!     .chain("catch_mouse", args!["Ralph"])
//!     .unwrap()
//!     .call_with("squeak", args![], move |value| *sink.borrow_mut() = value)
//!     .unwrap();
//! assert!(received.borrow().is_null());
//!
//! let port = parked.borrow_mut().take().unwrap();
//! port.done();
//! assert_eq!(*received.borrow(), Value::from("Ralph squeaks"));
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::deferred::{Arguments, Callback, Deferred, Value, arguments_from_values, join};

use super::definition::{Kind, Method};
use super::error::CallError;
use super::factory::Instance;
use super::queue::{CallEntry, CallQueue, QueueEntry};

type Subscriber = Box<dyn FnOnce(Handle)>;

enum Readiness {
    Pending(Vec<Subscriber>),
    Ready(Rc<Instance>),
}

struct Node {
    /// The kind calls are checked against. For a placeholder created by
    /// [`Handle::chain`] this is the interface's declared result kind.
    kind: Rc<Kind>,
    queue: CallQueue,
    readiness: RefCell<Readiness>,
}

/// A reference to an object, ready or still under construction.
///
/// Cloning is cheap; clones refer to the same node.
#[derive(Clone)]
pub struct Handle {
    node: Rc<Node>,
}

impl Handle {
    /// Creates a placeholder for an object of `kind`.
    pub(crate) fn pending(kind: Rc<Kind>) -> Self {
        tracing::debug!(kind = %kind.name, "placeholder created");
        Self {
            node: Rc::new(Node {
                kind,
                queue: CallQueue::new(),
                readiness: RefCell::new(Readiness::Pending(Vec::new())),
            }),
        }
    }

    /// Creates a handle bound to `instance`.
    pub(crate) fn ready(instance: Rc<Instance>) -> Self {
        Self {
            node: Rc::new(Node {
                kind: Rc::clone(instance.kind()),
                queue: CallQueue::triggered(Rc::clone(&instance)),
                readiness: RefCell::new(Readiness::Ready(instance)),
            }),
        }
    }

    /// Binds this placeholder to `instance`: drains the queued calls, then
    /// notifies the readiness subscribers.
    pub(crate) fn resolve(&self, instance: Rc<Instance>) {
        let settle = SettleOnUnwind {
            handle: self,
            instance: Some(Rc::clone(&instance)),
        };
        let triggered = self.node.queue.trigger(Rc::clone(&instance));
        settle.disarm();
        if !triggered {
            return;
        }

        let previous = std::mem::replace(
            &mut *self.node.readiness.borrow_mut(),
            Readiness::Ready(instance),
        );
        let subscribers = match previous {
            Readiness::Pending(subscribers) => subscribers,
            Readiness::Ready(_) => Vec::new(),
        };

        tracing::debug!(
            kind = self.kind_name(),
            subscribers = subscribers.len(),
            "object ready"
        );
        for subscriber in subscribers {
            subscriber(self.clone());
        }
    }

    pub(crate) fn instance(&self) -> Option<Rc<Instance>> {
        match &*self.node.readiness.borrow() {
            Readiness::Ready(instance) => Some(Rc::clone(instance)),
            Readiness::Pending(_) => None,
        }
    }

    /// Returns the name of the kind this handle was created for.
    pub fn kind_name(&self) -> &str {
        &self.node.kind.name
    }

    /// Returns the method names of this handle's kind, sorted.
    ///
    /// A placeholder exposes exactly the methods of the object it stands for.
    pub fn method_names(&self) -> Vec<&str> {
        self.node.kind.method_names()
    }

    /// Returns `true` once the object is ready and every queued call has run.
    pub fn is_ready(&self) -> bool {
        matches!(&*self.node.readiness.borrow(), Readiness::Ready(_))
    }

    /// Returns a copy of the field `key`, or `None` if the object is not
    /// ready or has no such field.
    pub fn field(&self, key: &str) -> Option<Value> {
        self.instance()?.get(key)
    }

    /// Returns `true` if both handles refer to the same node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    /// Calls `subscriber` once the object is ready.
    ///
    /// Runs `subscriber` immediately if it already is. Subscribers
    /// registered while the queue drains run right after the drain.
    pub fn when_ready<K>(&self, subscriber: K)
    where
        K: FnOnce(Self) + 'static,
    {
        {
            let mut readiness = self.node.readiness.borrow_mut();
            if let Readiness::Pending(subscribers) = &mut *readiness {
                subscribers.push(Box::new(subscriber));
                return;
            }
        }
        subscriber(self.clone());
    }

    /// Calls `method` in deferred mode.
    ///
    /// Nothing is queued until the returned [`Deferred`] is consumed. Then
    /// the arguments are resolved and the call is queued, or run if the
    /// object is ready.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::UnknownMethod`] if the kind has no such method.
    pub fn call(&self, method: &str, arguments: Arguments) -> Result<Deferred, CallError> {
        self.declared(method)?;
        let handle = self.clone();
        let method = method.to_string();
        Ok(Deferred::new(move |port| {
            handle.dispatch(method, arguments, Box::new(move |value| port.complete(value)));
        }))
    }

    /// Calls `method` in eager mode, delivering the result to `callback`.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::UnknownMethod`] if the kind has no such method.
    pub fn call_with<K>(&self, method: &str, arguments: Arguments, callback: K) -> Result<(), CallError>
    where
        K: FnOnce(Value) + 'static,
    {
        self.declared(method)?;
        self.dispatch(method.to_string(), arguments, Box::new(callback));
        Ok(())
    }

    /// Calls the interface method `method` and returns a placeholder for
    /// the object it produces.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::UnknownMethod`] if the kind has no such method and
    /// [`CallError::NotAnInterface`] if it is not declared as an interface.
    pub fn chain(&self, method: &str, arguments: Arguments) -> Result<Self, CallError> {
        let result = self
            .declared(method)?
            .result()
            .ok_or_else(|| CallError::NotAnInterface {
                kind: self.kind_name().to_string(),
                method: method.to_string(),
            })?;

        let nested = Self::pending(Rc::clone(result.kind()));
        self.node.queue.push(vec![
            QueueEntry::Call(CallEntry {
                method: method.to_string(),
                arguments,
                callback: None,
            }),
            QueueEntry::Interface(nested.adopt()),
        ]);
        Ok(nested)
    }

    fn declared(&self, method: &str) -> Result<&Method, CallError> {
        self.node
            .kind
            .method(method)
            .ok_or_else(|| CallError::UnknownMethod {
                kind: self.kind_name().to_string(),
                method: method.to_string(),
            })
    }

    fn dispatch(&self, method: String, arguments: Arguments, callback: Callback) {
        let handle = self.clone();
        join(arguments, move |values| {
            handle.node.queue.push(vec![QueueEntry::Call(CallEntry {
                method,
                arguments: arguments_from_values(values),
                callback: Some(callback),
            })]);
        });
    }

    /// The interface continuation for this placeholder: waits for the
    /// produced object to be ready, then binds this placeholder to it.
    fn adopt(&self) -> Callback {
        let nested = self.clone();
        Box::new(move |value| match value {
            Value::Object(inner) if inner.node.kind.derives_from(&nested.node.kind) => {
                inner.when_ready(move |ready| {
                    if let Some(instance) = ready.instance() {
                        nested.resolve(instance);
                    }
                });
            }
            Value::Object(inner) => tracing::warn!(
                kind = nested.kind_name(),
                produced = inner.kind_name(),
                "interface method produced an object of an unrelated kind; chained calls stay queued"
            ),
            other => tracing::warn!(
                kind = nested.kind_name(),
                result = %other,
                "interface method did not produce an object; chained calls stay queued"
            ),
        })
    }
}

/// Marks a handle ready if a queued call unwinds out of [`Handle::resolve`].
struct SettleOnUnwind<'a> {
    handle: &'a Handle,
    instance: Option<Rc<Instance>>,
}

impl SettleOnUnwind<'_> {
    fn disarm(mut self) {
        self.instance = None;
    }
}

impl Drop for SettleOnUnwind<'_> {
    fn drop(&mut self) {
        let Some(instance) = self.instance.take() else {
            return;
        };
        let Ok(mut readiness) = self.handle.node.readiness.try_borrow_mut() else {
            return;
        };
        let previous = std::mem::replace(&mut *readiness, Readiness::Ready(instance));
        drop(readiness);

        if let Readiness::Pending(subscribers) = previous
            && !subscribers.is_empty()
        {
            tracing::warn!(
                kind = self.handle.kind_name(),
                dropped = subscribers.len(),
                "queued call panicked; readiness subscribers dropped"
            );
        }
    }
}

impl PartialEq for Handle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Handle")
            .field("kind", &self.kind_name())
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::deferred::Completion;
    use crate::object::{Definition, Factory};
    use rstest::rstest;

    type Parked = Rc<RefCell<Vec<Completion>>>;

    fn parking_factory(name: &str, parked: &Parked) -> Factory {
        let store = Rc::clone(parked);
        Definition::new(name)
            .initializer(move |_, _, port| store.borrow_mut().push(port))
            .method("echo", |_, values, _| values.into_iter().next())
            .build()
            .unwrap()
    }

    fn release(parked: &Parked) {
        let ports: Vec<Completion> = parked.borrow_mut().drain(..).collect();
        for port in ports {
            port.done();
        }
    }

    fn collector() -> (Rc<RefCell<Vec<Value>>>, impl FnOnce(Value) + 'static) {
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);
        (received, move |value| sink.borrow_mut().push(value))
    }

    #[rstest]
    fn unknown_method_is_rejected_up_front() {
        let parked: Parked = Rc::new(RefCell::new(Vec::new()));
        let handle = parking_factory("Cat", &parked).construct(args![]);

        let error = handle.call_with("bark", args![], |_| {}).unwrap_err();
        assert_eq!(
            error,
            CallError::UnknownMethod {
                kind: "Cat".into(),
                method: "bark".into()
            }
        );
        assert!(handle.call("bark", args![]).is_err());
    }

    #[rstest]
    fn chain_requires_interface_declaration() {
        let parked: Parked = Rc::new(RefCell::new(Vec::new()));
        let handle = parking_factory("Cat", &parked).construct(args![]);

        let error = handle.chain("echo", args![]).unwrap_err();
        assert_eq!(
            error,
            CallError::NotAnInterface {
                kind: "Cat".into(),
                method: "echo".into()
            }
        );
    }

    #[rstest]
    fn deferred_call_on_placeholder_queues_only_when_consumed() {
        let parked: Parked = Rc::new(RefCell::new(Vec::new()));
        let handle = parking_factory("Cat", &parked).construct(args![]);
        let (received, callback) = collector();

        let deferred = handle.call("echo", args![1]).unwrap();
        release(&parked);
        assert!(handle.is_ready());
        assert!(received.borrow().is_empty());

        deferred.resolve_with(callback);
        assert_eq!(*received.borrow(), vec![Value::Int(1)]);
    }

    #[rstest]
    fn subscribers_fire_once_in_registration_order() {
        let parked: Parked = Rc::new(RefCell::new(Vec::new()));
        let handle = parking_factory("Cat", &parked).construct(args![]);
        let order = Rc::new(RefCell::new(Vec::new()));

        for index in 0..3 {
            let order = Rc::clone(&order);
            handle.when_ready(move |ready| {
                assert!(ready.is_ready());
                order.borrow_mut().push(index);
            });
        }
        assert!(order.borrow().is_empty());

        release(&parked);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);

        let late = Rc::clone(&order);
        handle.when_ready(move |_| late.borrow_mut().push(99));
        assert_eq!(*order.borrow(), vec![0, 1, 2, 99]);
    }

    #[rstest]
    fn second_resolution_is_ignored() {
        let parked: Parked = Rc::new(RefCell::new(Vec::new()));
        let factory = parking_factory("Cat", &parked);
        let handle = factory.construct(args![]);
        let fired = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&fired);
        handle.when_ready(move |_| *counter.borrow_mut() += 1);

        let first = Instance::new(Rc::clone(factory.kind()));
        let second = Instance::new(Rc::clone(factory.kind()));
        handle.resolve(Rc::clone(&first));
        handle.resolve(second);

        assert_eq!(*fired.borrow(), 1);
        assert!(Rc::ptr_eq(&handle.instance().unwrap(), &first));
    }

    #[rstest]
    fn interface_result_that_is_not_an_object_leaves_chain_pending() {
        let inner = Definition::new("Inner")
            .method("ping", |_, _, _| Some(Value::from("pong")))
            .build()
            .unwrap();
        let outer = Definition::new("Outer")
            .interface("make", &inner, |_, _, _| Some(Value::Int(7)))
            .build()
            .unwrap();
        let (received, callback) = collector();

        let nested = outer.construct(args![]).chain("make", args![]).unwrap();
        nested.call_with("ping", args![], callback).unwrap();

        assert!(!nested.is_ready());
        assert!(received.borrow().is_empty());
    }

    #[rstest]
    fn chain_on_ready_object_links_immediately() {
        let inner = Definition::new("Inner")
            .method("ping", |_, _, _| Some(Value::from("pong")))
            .build()
            .unwrap();
        let maker = inner.clone();
        let outer = Definition::new("Outer")
            .interface("make", &inner, move |_, _, _| Some(maker.construct(args![]).into()))
            .build()
            .unwrap();
        let (received, callback) = collector();

        let nested = outer.construct(args![]).chain("make", args![]).unwrap();
        assert!(nested.is_ready());

        nested.call_with("ping", args![], callback).unwrap();
        assert_eq!(*received.borrow(), vec![Value::from("pong")]);
    }

    #[rstest]
    fn interface_result_of_unrelated_kind_leaves_chain_pending() {
        let mouse = Definition::new("Mouse")
            .method("squeak", |_, _, _| Some(Value::from("squeak")))
            .build()
            .unwrap();
        let dog = Definition::new("Dog")
            .method("squeak", |_, _, _| Some(Value::from("woof")))
            .build()
            .unwrap();
        let cat = Definition::new("Cat")
            .interface("catch_mouse", &mouse, move |_, _, _| Some(dog.construct(args![]).into()))
            .build()
            .unwrap();
        let (received, callback) = collector();

        let nested = cat.construct(args![]).chain("catch_mouse", args![]).unwrap();
        nested.call_with("squeak", args![], callback).unwrap();

        assert!(!nested.is_ready());
        assert!(received.borrow().is_empty());
    }

    #[rstest]
    fn interface_result_of_derived_kind_is_adopted() {
        let parked: Parked = Rc::new(RefCell::new(Vec::new()));
        let inner = Definition::new("Inner")
            .method("ping", |_, _, _| Some(Value::from("pong")))
            .build()
            .unwrap();
        let special = Definition::new("Special")
            .extends(&inner)
            .initializer({
                let store = Rc::clone(&parked);
                move |_, _, port| store.borrow_mut().push(port)
            })
            .method("ping", |_, _, _| Some(Value::from("special pong")))
            .build()
            .unwrap();
        let outer = Definition::new("Outer")
            .interface("make", &inner, move |_, _, _| Some(special.construct(args![]).into()))
            .build()
            .unwrap();
        let (received, callback) = collector();

        let nested = outer.construct(args![]).chain("make", args![]).unwrap();
        nested.call_with("ping", args![], callback).unwrap();
        assert!(received.borrow().is_empty());

        release(&parked);
        assert!(nested.is_ready());
        assert_eq!(*received.borrow(), vec![Value::from("special pong")]);
    }

    #[rstest]
    fn panicking_queued_call_still_marks_object_ready() {
        use std::panic::{AssertUnwindSafe, catch_unwind};

        let parked: Parked = Rc::new(RefCell::new(Vec::new()));
        let store = Rc::clone(&parked);
        let handle = Definition::new("Cat")
            .initializer(move |_, _, port| store.borrow_mut().push(port))
            .method("echo", |_, values, _| {
                assert_ne!(values[0], Value::from("boom"), "boom");
                values.into_iter().next()
            })
            .build()
            .unwrap()
            .construct(args![]);
        let (received, callback) = collector();
        let notified = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&notified);

        handle.call_with("echo", args!["boom"], |_| {}).unwrap();
        handle.call_with("echo", args!["lost"], |_| {}).unwrap();
        handle.when_ready(move |_| *flag.borrow_mut() = true);

        let outcome = catch_unwind(AssertUnwindSafe(|| release(&parked)));

        assert!(outcome.is_err());
        assert!(handle.is_ready());
        assert!(!*notified.borrow());

        handle.call_with("echo", args!["ok"], callback).unwrap();
        assert_eq!(*received.borrow(), vec![Value::from("ok")]);
    }

    #[rstest]
    fn placeholder_exposes_kind_methods() {
        let parked: Parked = Rc::new(RefCell::new(Vec::new()));
        let factory = parking_factory("Cat", &parked);
        let handle = factory.construct(args![]);

        assert_eq!(handle.method_names(), factory.method_names());
        assert_eq!(handle.kind_name(), "Cat");
        assert!(format!("{handle:?}").contains("ready: false"));
        assert_eq!(handle, handle.clone());
    }
}
