//! Declarative object definitions.
//!
//! A [`Definition`] collects a method table, data fields, an optional
//! asynchronous initializer and an optional base to inherit from. It is
//! validated and merged once, by [`Definition::build`], into an immutable
//! [`Factory`].
//!
//! # Inheritance
//!
//! With [`Definition::extends`], the base's fields are merged underneath the
//! definition's own with [`merge_fields`]: nested maps merge key by key, and
//! the definition wins on any other conflict. Base methods are inherited
//! unless redeclared. A definition without an initializer inherits the
//! base's, so subclasses of asynchronously initialised kinds are
//! asynchronously initialised too.
//!
//! # Examples
//!
//! ```rust
//! use sinch::deferred::{Fields, Value};
//! use sinch::object::Definition;
//!
//! let cat = Definition::new("Cat")
//!     .field("counts", Fields::from([("meow".to_string(), Value::from(0))]))
//!     .method("hiss", |this, _, _| {
//!         Some(format!("{} the cat hisses.", this.get("name").unwrap_or_default()).into())
//!     })
//!     .build()
//!     .unwrap();
//!
//! let tiger = Definition::new("Tiger")
//!     .extends(&cat)
//!     .field("counts", Fields::from([("roars".to_string(), Value::from(0))]))
//!     .method("roar", |_, _, _| Some("roar".into()))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(tiger.method_names(), vec!["hiss", "roar"]);
//! assert_eq!(tiger.fields()["counts"].as_map().unwrap().len(), 2);
//! ```

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::deferred::{Completion, Fields, Value, merge_fields};

use super::error::DefinitionError;
use super::factory::{Factory, Instance};

/// A method implementation: receives the instance it is called on, the
/// resolved arguments and a completion port.
pub type MethodOperation = dyn Fn(&Instance, Vec<Value>, Completion) -> Option<Value>;

/// An asynchronous initializer: receives the instance under construction,
/// the constructor arguments and the port that marks the instance ready.
pub type Initializer = dyn Fn(&Instance, Vec<Value>, Completion);

/// An entry of a method table.
#[derive(Clone)]
pub(crate) enum Method {
    /// An ordinary method.
    Plain(Rc<MethodOperation>),
    /// A method whose result is an object of the `result` kind, possibly
    /// still under construction.
    Interface {
        result: Factory,
        operation: Rc<MethodOperation>,
    },
}

impl Method {
    pub(crate) const fn operation(&self) -> &Rc<MethodOperation> {
        match self {
            Self::Plain(operation) | Self::Interface { operation, .. } => operation,
        }
    }

    pub(crate) const fn result(&self) -> Option<&Factory> {
        match self {
            Self::Plain(_) => None,
            Self::Interface { result, .. } => Some(result),
        }
    }
}

/// A validated, merged definition shared by a factory and its objects.
pub(crate) struct Kind {
    pub(crate) name: String,
    pub(crate) fields: Fields,
    pub(crate) methods: FxHashMap<String, Method>,
    pub(crate) initializer: Option<Rc<Initializer>>,
    /// The kind this one extends, if any.
    pub(crate) base: Option<Rc<Kind>>,
}

impl Kind {
    pub(crate) fn method(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    pub(crate) fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns `true` if `self` is `ancestor` or extends it, directly or not.
    pub(crate) fn derives_from(self: &Rc<Self>, ancestor: &Rc<Self>) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if Rc::ptr_eq(kind, ancestor) {
                return true;
            }
            current = kind.base.as_ref();
        }
        false
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Kind")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("methods", &self.method_names())
            .field("asynchronous", &self.initializer.is_some())
            .field("base", &self.base.as_ref().map(|base| &base.name))
            .finish()
    }
}

/// A builder for object kinds.
///
/// Nothing is checked until [`build`](Self::build).
pub struct Definition {
    name: String,
    fields: Vec<(String, Value)>,
    methods: Vec<(String, Method)>,
    initializer: Option<Rc<Initializer>>,
    base: Option<Factory>,
}

impl Definition {
    /// Starts a definition named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            methods: Vec::new(),
            initializer: None,
            base: None,
        }
    }

    /// Declares a data field with its initial value.
    ///
    /// Every object gets its own copy of the initial value.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    /// Declares several data fields at once.
    #[must_use]
    pub fn fields(mut self, fields: Fields) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Declares a method.
    #[must_use]
    pub fn method<F>(mut self, name: impl Into<String>, operation: F) -> Self
    where
        F: Fn(&Instance, Vec<Value>, Completion) -> Option<Value> + 'static,
    {
        self.methods
            .push((name.into(), Method::Plain(Rc::new(operation))));
        self
    }

    /// Declares an interface method: one whose result is an object of the
    /// `result` kind.
    ///
    /// Calls chained on it with [`Handle::chain`](super::Handle::chain) are
    /// queued until both this object and the returned object are ready.
    #[must_use]
    pub fn interface<F>(mut self, name: impl Into<String>, result: &Factory, operation: F) -> Self
    where
        F: Fn(&Instance, Vec<Value>, Completion) -> Option<Value> + 'static,
    {
        self.methods.push((
            name.into(),
            Method::Interface {
                result: result.clone(),
                operation: Rc::new(operation),
            },
        ));
        self
    }

    /// Declares an asynchronous initializer.
    ///
    /// Objects of a kind with an initializer are handed out as placeholders
    /// that queue every call until the initializer's port fires.
    #[must_use]
    pub fn initializer<F>(mut self, initializer: F) -> Self
    where
        F: Fn(&Instance, Vec<Value>, Completion) + 'static,
    {
        self.initializer = Some(Rc::new(initializer));
        self
    }

    /// Inherits fields, methods and initializer from `base`.
    #[must_use]
    pub fn extends(mut self, base: &Factory) -> Self {
        self.base = Some(base.clone());
        self
    }

    /// Validates the definition, merges its base, and returns the factory.
    ///
    /// # Errors
    ///
    /// - [`DefinitionError::EmptyName`] if the name is empty.
    /// - [`DefinitionError::DuplicateField`] / [`DefinitionError::DuplicateMethod`]
    ///   if this definition declares a name twice (redeclaring a base's
    ///   name is an override, not a duplicate).
    /// - [`DefinitionError::FieldShadowsMethod`] if, after merging, a field
    ///   and a method share a name.
    pub fn build(self) -> Result<Factory, DefinitionError> {
        if self.name.is_empty() {
            return Err(DefinitionError::EmptyName);
        }

        let mut fields = Fields::new();
        for (field, value) in self.fields {
            if fields.contains_key(&field) {
                return Err(DefinitionError::DuplicateField {
                    kind: self.name,
                    field,
                });
            }
            fields.insert(field, value);
        }

        let mut methods = FxHashMap::default();
        for (method, declaration) in self.methods {
            if methods.contains_key(&method) {
                return Err(DefinitionError::DuplicateMethod {
                    kind: self.name,
                    method,
                });
            }
            methods.insert(method, declaration);
        }

        let mut initializer = self.initializer;
        if let Some(base) = &self.base {
            let base = base.kind();
            fields = merge_fields(fields, &base.fields);
            for (method, declaration) in &base.methods {
                methods
                    .entry(method.clone())
                    .or_insert_with(|| declaration.clone());
            }
            initializer = initializer.or_else(|| base.initializer.clone());
        }

        if let Some(name) = fields.keys().find(|field| methods.contains_key(*field)) {
            return Err(DefinitionError::FieldShadowsMethod {
                kind: self.name,
                name: name.clone(),
            });
        }

        tracing::debug!(
            kind = %self.name,
            base = self.base.as_ref().map(Factory::name),
            fields = fields.len(),
            methods = methods.len(),
            asynchronous = initializer.is_some(),
            "definition built"
        );

        Ok(Factory::from_kind(Kind {
            name: self.name,
            fields,
            methods,
            initializer,
            base: self.base.map(|base| Rc::clone(base.kind())),
        }))
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Definition")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field(
                "methods",
                &self.methods.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .field("asynchronous", &self.initializer.is_some())
            .field("base", &self.base.as_ref().map(Factory::name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn constant(text: &'static str) -> impl Fn(&Instance, Vec<Value>, Completion) -> Option<Value> {
        move |_, _, _| Some(Value::from(text))
    }

    fn counts(entries: &[&str]) -> Value {
        Value::Map(
            entries
                .iter()
                .map(|name| ((*name).to_string(), Value::Int(0)))
                .collect(),
        )
    }

    #[rstest]
    fn build_rejects_empty_name() {
        let result = Definition::new("").build();
        assert_eq!(result.unwrap_err(), DefinitionError::EmptyName);
    }

    #[rstest]
    fn build_rejects_duplicate_field() {
        let result = Definition::new("Cat")
            .field("name", "a")
            .field("name", "b")
            .build();
        assert_eq!(
            result.unwrap_err(),
            DefinitionError::DuplicateField {
                kind: "Cat".into(),
                field: "name".into()
            }
        );
    }

    #[rstest]
    fn build_rejects_field_named_like_method() {
        let result = Definition::new("Cat")
            .field("meow", 1)
            .method("meow", constant("meow"))
            .build();
        assert_eq!(
            result.unwrap_err(),
            DefinitionError::FieldShadowsMethod {
                kind: "Cat".into(),
                name: "meow".into()
            }
        );
    }

    #[rstest]
    fn build_rejects_field_shadowing_inherited_method() {
        let base = Definition::new("Cat")
            .method("meow", constant("meow"))
            .build()
            .unwrap();
        let result = Definition::new("Tiger").extends(&base).field("meow", 1).build();
        assert!(matches!(
            result,
            Err(DefinitionError::FieldShadowsMethod { .. })
        ));
    }

    #[rstest]
    fn extends_merges_nested_maps_additively() {
        let base = Definition::new("Cat")
            .field("counts", counts(&["a"]))
            .build()
            .unwrap();
        let sub = Definition::new("Tiger")
            .extends(&base)
            .field("counts", counts(&["b"]))
            .build()
            .unwrap();

        assert_eq!(sub.fields()["counts"], counts(&["a", "b"]));
    }

    #[rstest]
    fn extends_inherits_and_overrides_methods() {
        let base = Definition::new("Cat")
            .method("meow", constant("meow"))
            .method("hiss", constant("hiss"))
            .build()
            .unwrap();
        let sub = Definition::new("Tiger")
            .extends(&base)
            .method("meow", constant("roar"))
            .build()
            .unwrap();

        assert_eq!(sub.method_names(), vec!["hiss", "meow"]);
        let operation = Rc::clone(sub.kind().method("meow").unwrap().operation());
        let instance = Instance::new(Rc::clone(sub.kind()));
        let result = operation(&*instance, Vec::new(), Completion::new(|_| {}));
        assert_eq!(result, Some(Value::from("roar")));
    }

    #[rstest]
    fn extends_inherits_initializer_only_when_missing() {
        let base = Definition::new("Cat")
            .initializer(|_, _, port| port.done())
            .build()
            .unwrap();
        let inherited = Definition::new("Tiger").extends(&base).build().unwrap();
        let plain = Definition::new("Dog").build().unwrap();

        assert!(base.is_async());
        assert!(inherited.is_async());
        assert!(!plain.is_async());
    }

    #[rstest]
    fn interface_records_result_kind() {
        let mouse = Definition::new("Mouse").build().unwrap();
        let cat = Definition::new("Cat")
            .interface("catch_mouse", &mouse, |_, _, _| None)
            .method("meow", constant("meow"))
            .build()
            .unwrap();

        let kind = cat.kind();
        assert_eq!(
            kind.method("catch_mouse").and_then(Method::result).map(Factory::name),
            Some("Mouse")
        );
        assert!(kind.method("meow").and_then(Method::result).is_none());
    }

    #[rstest]
    fn derives_from_follows_the_base_chain() {
        let cat = Definition::new("Cat").build().unwrap();
        let tiger = Definition::new("Tiger").extends(&cat).build().unwrap();
        let sabre = Definition::new("Sabre").extends(&tiger).build().unwrap();
        let dog = Definition::new("Dog").build().unwrap();

        assert!(cat.kind().derives_from(cat.kind()));
        assert!(sabre.kind().derives_from(cat.kind()));
        assert!(!cat.kind().derives_from(tiger.kind()));
        assert!(!dog.kind().derives_from(cat.kind()));
    }

    #[rstest]
    fn debug_lists_declared_names() {
        let definition = Definition::new("Cat").method("meow", constant("meow"));
        let rendered = format!("{definition:?}");
        assert!(rendered.contains("Cat"));
        assert!(rendered.contains("meow"));
    }
}
