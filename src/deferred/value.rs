//! Dynamic values passed between operations.
//!
//! Operations wrapped by [`Callable`](super::Callable) and methods declared
//! on a [`Definition`](crate::object::Definition) exchange [`Value`]s. A
//! value is either plain data (scalars, lists, string-keyed maps) or, with
//! the `object` feature, a [`Handle`] to an object that may still be under
//! construction.
//!
//! # Examples
//!
//! ```rust
//! use sinch::deferred::{Fields, Value, merge};
//!
//! let base = Value::from(Fields::from([("a".to_string(), Value::from(0))]));
//! let overlay = Value::from(Fields::from([("b".to_string(), Value::from(0))]));
//!
//! let merged = merge(overlay, &base);
//! let fields = merged.as_map().unwrap();
//! assert_eq!(fields.len(), 2);
//! ```

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "object")]
use crate::object::Handle;

/// String-keyed data fields, ordered by key.
pub type Fields = BTreeMap<String, Value>;

/// A dynamically typed value.
///
/// `Value::Null` is the default and is what [`Completion::done`] delivers.
///
/// [`Completion::done`]: super::Completion::done
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// No value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    Text(String),
    /// An ordered list of values.
    List(Vec<Value>),
    /// A string-keyed map of values.
    Map(Fields),
    /// A reference to an object, ready or still under construction.
    ///
    /// Object handles are runtime references and are never serialized.
    #[cfg(feature = "object")]
    #[cfg_attr(feature = "serde", serde(skip))]
    Object(Handle),
}

impl Value {
    /// Returns `true` if this is [`Value::Null`].
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the boolean, if this is a [`Value::Bool`].
    #[inline]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the integer, if this is a [`Value::Int`].
    #[inline]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the number as `f64`, if this is a [`Value::Float`] or a [`Value::Int`].
    #[inline]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    /// Returns the string slice, if this is a [`Value::Text`].
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the list, if this is a [`Value::List`].
    #[inline]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(values) => Some(values),
            _ => None,
        }
    }

    /// Returns the map, if this is a [`Value::Map`].
    #[inline]
    pub const fn as_map(&self) -> Option<&Fields> {
        match self {
            Self::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// Returns the map mutably, if this is a [`Value::Map`].
    #[inline]
    pub const fn as_map_mut(&mut self) -> Option<&mut Fields> {
        match self {
            Self::Map(fields) => Some(fields),
            _ => None,
        }
    }

    /// Returns the object handle, if this is a [`Value::Object`].
    #[cfg(feature = "object")]
    #[inline]
    pub const fn as_object(&self) -> Option<&Handle> {
        match self {
            Self::Object(handle) => Some(handle),
            _ => None,
        }
    }

    /// Consumes the value and returns the object handle, if this is a [`Value::Object`].
    #[cfg(feature = "object")]
    #[inline]
    pub fn into_object(self) -> Option<Handle> {
        match self {
            Self::Object(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Recursively merges `base` underneath `overlay`.
///
/// When both sides are maps, keys are merged one by one, recursing into
/// nested maps. Any other conflict is won by `overlay`. Keys only present in
/// `base` are copied over, which gives nested counter maps additive
/// semantics.
///
/// # Examples
///
/// ```rust
/// use sinch::deferred::{Fields, Value, merge};
///
/// let base = Value::from(Fields::from([
///     ("name".to_string(), Value::from("base")),
///     ("size".to_string(), Value::from(1)),
/// ]));
/// let overlay = Value::from(Fields::from([("name".to_string(), Value::from("sub"))]));
///
/// let merged = merge(overlay, &base);
/// let fields = merged.as_map().unwrap();
/// assert_eq!(fields["name"], Value::from("sub"));
/// assert_eq!(fields["size"], Value::from(1));
/// ```
pub fn merge(overlay: Value, base: &Value) -> Value {
    match (overlay, base) {
        (Value::Map(fields), Value::Map(base_fields)) => Value::Map(merge_fields(fields, base_fields)),
        (overlay, _) => overlay,
    }
}

/// [`merge`] applied to two field maps.
pub fn merge_fields(mut overlay: Fields, base: &Fields) -> Fields {
    for (key, base_value) in base {
        let merged = match overlay.remove(key) {
            Some(own) => merge(own, base_value),
            None => base_value.clone(),
        };
        overlay.insert(key.clone(), merged);
    }
    overlay
}

impl fmt::Display for Value {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(formatter, "null"),
            Self::Bool(value) => write!(formatter, "{value}"),
            Self::Int(value) => write!(formatter, "{value}"),
            Self::Float(value) => write!(formatter, "{value}"),
            Self::Text(value) => write!(formatter, "{value}"),
            Self::List(values) => {
                write!(formatter, "[")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        write!(formatter, ", ")?;
                    }
                    write!(formatter, "{value}")?;
                }
                write!(formatter, "]")
            }
            Self::Map(fields) => {
                write!(formatter, "{{")?;
                for (index, (key, value)) in fields.iter().enumerate() {
                    if index > 0 {
                        write!(formatter, ", ")?;
                    }
                    write!(formatter, "{key}: {value}")?;
                }
                write!(formatter, "}}")
            }
            #[cfg(feature = "object")]
            Self::Object(handle) => write!(formatter, "<{}>", handle.kind_name()),
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<Self>> for Value {
    fn from(values: Vec<Self>) -> Self {
        Self::List(values)
    }
}

impl From<Fields> for Value {
    fn from(fields: Fields) -> Self {
        Self::Map(fields)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::Null
    }
}

#[cfg(feature = "object")]
impl From<Handle> for Value {
    fn from(handle: Handle) -> Self {
        Self::Object(handle)
    }
}
