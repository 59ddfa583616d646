use std::collections::HashMap;
use std::fmt::{self, Display};
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::{resolve, Path};
use crate::util::f64_as_exact_i64;

/// An attribute value represents any value that can appear in a document or in a [crate::Rule].
///
/// There is deliberately no variant for a missing value. A path that does not resolve is
/// represented as `None` wherever an `Option<&AttributeValue>` is expected, which keeps
/// "absent" distinct from [AttributeValue::Null].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Stores a string value.
    String(String),
    /// Stores an array of attribute values.
    Array(Vec<AttributeValue>),
    /// Stores a number.
    Number(f64),
    /// Stores a boolean.
    Bool(bool),
    /// Stores a map of attribute values.
    Object(HashMap<String, AttributeValue>),
    /// Stores a null value.
    Null,
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> AttributeValue {
        AttributeValue::String(s.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> AttributeValue {
        AttributeValue::String(s)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> AttributeValue {
        AttributeValue::Bool(b)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Number(i as f64)
    }
}

impl From<f64> for AttributeValue {
    fn from(f: f64) -> Self {
        AttributeValue::Number(f)
    }
}

impl<T> From<Vec<T>> for AttributeValue
where
    AttributeValue: From<T>,
{
    fn from(v: Vec<T>) -> AttributeValue {
        v.into_iter().collect()
    }
}

impl<S, T> From<HashMap<S, T>> for AttributeValue
where
    String: From<S>,
    AttributeValue: From<T>,
{
    fn from(hashmap: HashMap<S, T>) -> AttributeValue {
        hashmap.into_iter().collect()
    }
}

impl<T> FromIterator<T> for AttributeValue
where
    AttributeValue: From<T>,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        AttributeValue::Array(iter.into_iter().map(AttributeValue::from).collect())
    }
}

impl<S, T> FromIterator<(S, T)> for AttributeValue
where
    String: From<S>,
    AttributeValue: From<T>,
{
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        AttributeValue::Object(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<&Value> for AttributeValue {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => AttributeValue::Null,
            Value::Bool(b) => AttributeValue::Bool(*b),
            Value::Number(n) => match n.as_f64() {
                Some(float) => AttributeValue::Number(float),
                None => {
                    warn!("could not interpret '{:?}' as f64", n);
                    AttributeValue::String(n.to_string())
                }
            },
            Value::String(str) => AttributeValue::String(str.clone()),
            Value::Array(arr) => {
                AttributeValue::Array(arr.iter().map(AttributeValue::from).collect())
            }
            Value::Object(obj) => {
                AttributeValue::Object(obj.iter().map(|(k, v)| (k.into(), v.into())).collect())
            }
        }
    }
}

impl From<Value> for AttributeValue {
    fn from(v: Value) -> Self {
        AttributeValue::from(&v)
    }
}

/// The runtime type of a resolved value, as named by the `$type` operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeTag {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Null,
    /// The tag of an absent value.
    Undefined,
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::Number => "number",
            TypeTag::Boolean => "boolean",
            TypeTag::Object => "object",
            TypeTag::Array => "array",
            TypeTag::Null => "null",
            TypeTag::Undefined => "undefined",
        }
    }

    /// Returns the tag for a possibly absent value.
    pub fn of(value: Option<&AttributeValue>) -> TypeTag {
        value.map_or(TypeTag::Undefined, AttributeValue::type_tag)
    }
}

impl FromStr for TypeTag {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(TypeTag::String),
            "number" => Ok(TypeTag::Number),
            "boolean" => Ok(TypeTag::Boolean),
            "object" => Ok(TypeTag::Object),
            "array" => Ok(TypeTag::Array),
            "null" => Ok(TypeTag::Null),
            "undefined" => Ok(TypeTag::Undefined),
            _ => Err(()),
        }
    }
}

impl Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AttributeValue {
    /// Returns None unless self is a String. It will not convert.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns None unless self is a bool. It will not convert.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns None unless self is an Array.
    pub fn as_array(&self) -> Option<&Vec<AttributeValue>> {
        match self {
            AttributeValue::Array(values) => Some(values),
            _ => None,
        }
    }

    /// Returns None unless self is an Object.
    pub fn as_object(&self) -> Option<&HashMap<String, AttributeValue>> {
        match self {
            AttributeValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            AttributeValue::String(_) => TypeTag::String,
            AttributeValue::Array(_) => TypeTag::Array,
            AttributeValue::Number(_) => TypeTag::Number,
            AttributeValue::Bool(_) => TypeTag::Boolean,
            AttributeValue::Object(_) => TypeTag::Object,
            AttributeValue::Null => TypeTag::Null,
        }
    }

    /// Null, false, zero, NaN and the empty string are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            AttributeValue::Null => false,
            AttributeValue::Bool(b) => *b,
            AttributeValue::Number(f) => *f != 0.0 && !f.is_nan(),
            AttributeValue::String(s) => !s.is_empty(),
            AttributeValue::Array(_) | AttributeValue::Object(_) => true,
        }
    }

    /// Renders scalar values as the text a pattern is matched against.
    ///
    /// Numbers render in shortest form, so `3.0` becomes `"3"`. Magnitudes of at least 1e21 or
    /// below 1e-6 use a signed exponent, so `1e21` becomes `"1e+21"`. Null, arrays and objects
    /// have no string form and return None.
    pub fn coerce_to_string(&self) -> Option<String> {
        match self {
            AttributeValue::String(s) => Some(s.clone()),
            AttributeValue::Bool(b) => Some(b.to_string()),
            AttributeValue::Number(f) => Some(number_to_string(*f)),
            AttributeValue::Null | AttributeValue::Array(_) | AttributeValue::Object(_) => None,
        }
    }

    /// Looks up a nested value by dotted path. See [crate::resolve].
    pub fn get_path(&self, path: &Path) -> Option<&AttributeValue> {
        resolve(self, path)
    }
}

fn number_to_string(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if f != 0.0 && (f.abs() >= 1e21 || f.abs() < 1e-6) {
        return exponent_to_string(f);
    }
    match f64_as_exact_i64(f) {
        Some(i) => i.to_string(),
        None => f.to_string(),
    }
}

/// Formats `f` as shortest round-trip digits with a signed exponent, e.g. `1e+21` or `1.5e-7`.
fn exponent_to_string(f: f64) -> String {
    let formatted = format!("{:e}", f);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => formatted,
    }
}
