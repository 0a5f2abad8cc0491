//! Typed argument values and the converters that produce them.
//!
//! Every user-supplied parameter is declared with a [`Converter`]: a named
//! function from one raw token to a [`Value`].  After binding, handlers pull
//! strongly-typed values back out of [`Arguments`] through [`FromValue`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ConversionError, KernelError, Result};

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// A converted argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Free-form text.
    Str(String),
    /// Signed integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// Boolean flag value.
    Bool(bool),
    /// Values collected by a list parameter, in input order.
    List(Vec<Value>),
    /// An optional parameter that received no token.
    None,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::None => write!(f, "none"),
        }
    }
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

type ConvertFn = dyn Fn(&str) -> std::result::Result<Value, ConversionError> + Send + Sync;

/// A named `token -> Value` conversion.
///
/// Converters are cheap to clone (`Arc`-backed) so a single instance can be
/// shared between the declaration, the descriptor, and every invocation.
#[derive(Clone)]
pub struct Converter {
    name: Arc<str>,
    func: Arc<ConvertFn>,
}

impl Converter {
    /// Pass the token through unchanged.
    pub fn string() -> Self {
        Self::from_fn("str", |raw| Ok(Value::Str(raw.to_string())))
    }

    /// Parse a signed 64-bit integer.
    pub fn int() -> Self {
        Self::from_fn("int", |raw| {
            raw.parse::<i64>()
                .map(Value::Int)
                .map_err(|e| ConversionError::new("int", raw, e.to_string()))
        })
    }

    /// Parse a floating-point number.
    pub fn float() -> Self {
        Self::from_fn("float", |raw| {
            raw.parse::<f64>()
                .map(Value::Float)
                .map_err(|e| ConversionError::new("float", raw, e.to_string()))
        })
    }

    /// Parse a boolean.  Accepts `true/false`, `yes/no`, `on/off` and `1/0`
    /// in any case.
    pub fn bool() -> Self {
        Self::from_fn("bool", |raw| match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
            _ => Err(ConversionError::new("bool", raw, "not a boolean")),
        })
    }

    /// Build a converter from an arbitrary function.  The error string
    /// becomes the `reason` of the resulting [`ConversionError`].
    pub fn custom<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&str) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        let name: Arc<str> = Arc::from(name.into());
        let label = Arc::clone(&name);
        Self {
            name,
            func: Arc::new(move |raw| {
                func(raw).map_err(|reason| ConversionError::new(&*label, raw, reason))
            }),
        }
    }

    fn from_fn<F>(name: &str, func: F) -> Self
    where
        F: Fn(&str) -> std::result::Result<Value, ConversionError> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            func: Arc::new(func),
        }
    }

    /// Type name shown in usage strings and conversion errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Convert one raw token.
    pub fn convert(&self, raw: &str) -> std::result::Result<Value, ConversionError> {
        (self.func)(raw)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Converter").field(&self.name).finish()
    }
}

// ---------------------------------------------------------------------------
// Typed extraction
// ---------------------------------------------------------------------------

/// Types that can be read back out of a bound [`Value`].
pub trait FromValue: Sized {
    /// Type name reported when extraction fails.
    const EXPECTED: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "number";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    const EXPECTED: &'static str = "list";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::List(items) => items.iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::None => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

/// The call-ready argument mapping produced by the binder.
///
/// Entries are kept in descriptor order regardless of the order in which
/// the user supplied them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    entries: Vec<(String, Value)>,
}

impl Arguments {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: Value) {
        self.entries.push((name.into(), value));
    }

    /// Raw value for `name`, if bound.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Typed value for `name`.
    pub fn get<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self.value(name).ok_or_else(|| KernelError::UnknownArgument {
            name: name.to_string(),
        })?;
        T::from_value(value).ok_or_else(|| KernelError::ArgumentType {
            name: name.to_string(),
            expected: T::EXPECTED,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(name, value)` pairs in descriptor order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
