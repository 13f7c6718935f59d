//! Error types for definitions and method dispatch.

use thiserror::Error;

/// Represents a definition rejected by [`Definition::build`].
///
/// # Examples
///
/// ```rust
/// use sinch::object::{Definition, DefinitionError};
///
/// let error = Definition::new("Cat")
///     .method("meow", |_, _, _| None)
///     .method("meow", |_, _, _| None)
///     .build()
///     .unwrap_err();
///
/// assert_eq!(
///     error,
///     DefinitionError::DuplicateMethod { kind: "Cat".to_string(), method: "meow".to_string() }
/// );
/// ```
///
/// [`Definition::build`]: super::Definition::build
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// The definition has an empty name.
    #[error("definition name must not be empty")]
    EmptyName,
    /// A method is declared twice in the same definition.
    #[error("{kind}: method `{method}` is declared more than once")]
    DuplicateMethod {
        /// The definition's name.
        kind: String,
        /// The repeated method name.
        method: String,
    },
    /// A data field is declared twice in the same definition.
    #[error("{kind}: field `{field}` is declared more than once")]
    DuplicateField {
        /// The definition's name.
        kind: String,
        /// The repeated field name.
        field: String,
    },
    /// After merging the base definition, a field and a method share a name.
    #[error("{kind}: field `{name}` has the same name as a method")]
    FieldShadowsMethod {
        /// The definition's name.
        kind: String,
        /// The shared name.
        name: String,
    },
}

/// Represents a call rejected before anything was queued or run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// The object's kind declares no method with this name.
    #[error("{kind} has no method `{method}`")]
    UnknownMethod {
        /// The kind of the called object.
        kind: String,
        /// The requested method.
        method: String,
    },
    /// [`Handle::chain`](super::Handle::chain) was used on a method not
    /// declared as an interface.
    #[error("{kind}::{method} is not declared as an interface")]
    NotAnInterface {
        /// The kind of the called object.
        kind: String,
        /// The requested method.
        method: String,
    },
}
