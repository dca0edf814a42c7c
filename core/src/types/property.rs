//! Property types declared on blueprints and the values entities carry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Declared type of a blueprint property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

/// A property value carried by an entity.
///
/// The variants cover the JSON shapes the catalog accepts. `null` is not a
/// value: an unset property is simply absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    Object(Map<String, Value>),
}

impl PropertyValue {
    /// The blueprint property type this value conforms to.
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::Bool(_) => PropertyType::Boolean,
            PropertyValue::Number(_) => PropertyType::Number,
            PropertyValue::String(_) => PropertyType::String,
            PropertyValue::Array(_) => PropertyType::Array,
            PropertyValue::Object(_) => PropertyType::Object,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Number(value.into())
    }
}

impl From<Vec<Value>> for PropertyValue {
    fn from(value: Vec<Value>) -> Self {
        PropertyValue::Array(value)
    }
}

impl From<Map<String, Value>> for PropertyValue {
    fn from(value: Map<String, Value>) -> Self {
        PropertyValue::Object(value)
    }
}

impl From<PropertyValue> for Value {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Bool(b) => Value::Bool(b),
            PropertyValue::Number(n) => Value::Number(n),
            PropertyValue::String(s) => Value::String(s),
            PropertyValue::Array(a) => Value::Array(a),
            PropertyValue::Object(o) => Value::Object(o),
        }
    }
}
