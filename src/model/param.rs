//! Rule parameter values.
//!
//! Rule parameters are loaded from JSON or YAML documents whose shape depends
//! on the evaluator that consumes them. Rather than carrying raw
//! `serde_json::Value`s around, every parameter is narrowed to a
//! [`ParamValue`] on load and each evaluator coerces explicitly.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A single rule parameter value.
///
/// Deserializes untagged from any JSON/YAML value. Objects are kept as
/// [`ParamValue::Object`] for custom evaluators; the built-in evaluators
/// never match on them.
///
/// # Example
///
/// ```
/// use flagwise::model::ParamValue;
///
/// let value: ParamValue = serde_json::from_str("[\"alice\", 7]").unwrap();
/// let list = value.as_list().unwrap();
/// assert_eq!(list[0], ParamValue::from("alice"));
/// assert_eq!(list[1].to_string(), "7");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<ParamValue>),
    Object(Map<String, Value>),
}

impl ParamValue {
    /// Returns `true` for [`ParamValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the string slice for [`ParamValue::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the elements for [`ParamValue::List`].
    pub fn as_list(&self) -> Option<&[ParamValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the fields for [`ParamValue::Object`].
    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Object(_) => "object",
        }
    }
}

/// String form of a value, as used for user and group matching.
///
/// Lists render as their comma-joined elements, objects as compact JSON and
/// `Null` as nothing.
impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => f.write_str(s),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Self::Object(fields) => {
                let json = serde_json::to_string(fields).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}
