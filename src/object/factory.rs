//! Object construction.
//!
//! A [`Factory`] builds objects of one kind. What it hands out is always a
//! [`Handle`]:
//!
//! - For kinds without an initializer, the object is created and the handle
//!   is ready immediately.
//! - For kinds with an initializer, the handle is a placeholder. The
//!   initializer runs (once the constructor arguments are resolved) with a
//!   completion port; calls made on the placeholder meanwhile are queued and
//!   replayed, in order, when the port fires.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::deferred::{Arguments, Callable, Completion, Fields, Value, join};

use super::definition::Kind;
use super::handle::Handle;

/// Builds objects of one kind.
///
/// Cloning is cheap and shares the kind.
///
/// # Examples
///
/// ```rust
/// use sinch::args;
/// use sinch::object::Definition;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let greeter = Definition::new("Greeter")
///     .initializer(|this, values, port| {
///         this.set("name", values[0].clone());
///         port.done();
///     })
///     .method("greet", |this, _, _| {
///         Some(format!("hello, {}", this.get("name").unwrap_or_default()).into())
///     })
///     .build()
///     .unwrap();
///
/// let handle = greeter.construct(args!["world"]);
/// assert!(handle.is_ready());
///
/// let received = Rc::new(RefCell::new(String::new()));
/// let sink = Rc::clone(&received);
/// handle
///     .call_with("greet", args![], move |value| *sink.borrow_mut() = value.to_string())
///     .unwrap();
/// assert_eq!(*received.borrow(), "hello, world");
/// ```
#[derive(Clone)]
pub struct Factory {
    kind: Rc<Kind>,
}

impl Factory {
    pub(crate) fn from_kind(kind: Kind) -> Self {
        Self {
            kind: Rc::new(kind),
        }
    }

    pub(crate) const fn kind(&self) -> &Rc<Kind> {
        &self.kind
    }

    /// Returns the kind's name.
    pub fn name(&self) -> &str {
        &self.kind.name
    }

    /// Returns the names of all methods, own and inherited, sorted.
    pub fn method_names(&self) -> Vec<&str> {
        self.kind.method_names()
    }

    /// Returns the initial data fields, after merging the base.
    pub fn fields(&self) -> &Fields {
        &self.kind.fields
    }

    /// Returns `true` if objects of this kind are initialised asynchronously.
    pub fn is_async(&self) -> bool {
        self.kind.initializer.is_some()
    }

    /// Constructs an object.
    ///
    /// Without an initializer the returned handle is ready; deferred
    /// `arguments` are still consumed, but their values are discarded. With one, the returned handle is a placeholder until
    /// the initializer completes.
    pub fn construct(&self, arguments: Arguments) -> Handle {
        let instance = Instance::new(Rc::clone(&self.kind));

        let Some(initializer) = self.kind.initializer.clone() else {
            let kind = self.name().to_string();
            join(arguments, move |values| {
                if !values.is_empty() {
                    tracing::debug!(
                        kind = %kind,
                        arguments = values.len(),
                        "kind has no initializer; constructor arguments ignored"
                    );
                }
            });
            return Handle::ready(instance);
        };

        let handle = Handle::pending(Rc::clone(&self.kind));
        let placeholder = handle.clone();
        join(arguments, move |values| {
            let target = Rc::clone(&instance);
            let port = Completion::new(move |_| placeholder.resolve(target));
            initializer(&*instance, values, port);
        });
        handle
    }

    /// Constructs an object and calls `on_ready` once it is ready.
    ///
    /// `on_ready` runs before this method returns when the object is ready
    /// immediately.
    pub fn construct_with<K>(&self, arguments: Arguments, on_ready: K) -> Handle
    where
        K: FnOnce(Handle) + 'static,
    {
        let handle = self.construct(arguments);
        handle.when_ready(on_ready);
        handle
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_tuple("Factory").field(&self.kind).finish()
    }
}

/// An object: its kind and its own copy of the data fields.
///
/// Method implementations receive the instance they are called on and use
/// it to read and write fields.
pub struct Instance {
    kind: Rc<Kind>,
    fields: RefCell<Fields>,
}

impl Instance {
    pub(crate) fn new(kind: Rc<Kind>) -> Rc<Self> {
        let fields = RefCell::new(kind.fields.clone());
        Rc::new(Self { kind, fields })
    }

    pub(crate) const fn kind(&self) -> &Rc<Kind> {
        &self.kind
    }

    /// Binds the method `name` to this instance.
    pub(crate) fn method(self: &Rc<Self>, name: &str) -> Option<Callable> {
        let operation = Rc::clone(self.kind.method(name)?.operation());
        let receiver = Rc::clone(self);
        let callable = Callable::new(move |values, port| operation(&*receiver, values, port));
        Some(callable.named(format!("{}::{name}", self.kind.name)))
    }

    /// Returns the kind's name.
    pub fn kind_name(&self) -> &str {
        &self.kind.name
    }

    /// Returns a copy of the field `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.fields.borrow().get(key).cloned()
    }

    /// Sets the field `key`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.borrow_mut().insert(key.into(), value.into());
    }

    /// Runs `function` with mutable access to all fields.
    ///
    /// # Panics
    ///
    /// Panics if `function` accesses this instance's fields again.
    pub fn update<R>(&self, function: impl FnOnce(&mut Fields) -> R) -> R {
        function(&mut *self.fields.borrow_mut())
    }

    /// Returns a copy of all fields.
    pub fn fields(&self) -> Fields {
        self.fields.borrow().clone()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Instance")
            .field("kind", &self.kind.name)
            .field("fields", &*self.fields.borrow())
            .finish()
    }
}
