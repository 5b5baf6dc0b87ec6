//! Property lookup on caller-supplied model objects.
//!
//! Named placeholders such as `:name` or `?2.name` pull their value out of an
//! argument by property name. Anything that can answer "what is your `name`?"
//! implements [`PropertyReadable`]: maps, JSON objects, previously fetched rows,
//! and user types that opt in.

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::types::RowValues;

/// Read a named property from a model argument.
///
/// ```rust
/// use sql_facade::prelude::*;
///
/// struct Person {
///     first: String,
///     age: i64,
/// }
///
/// impl PropertyReadable for Person {
///     fn property(&self, name: &str) -> Option<RowValues> {
///         match name {
///             "first" => Some(RowValues::Text(self.first.clone())),
///             "age" => Some(RowValues::Int(self.age)),
///             _ => None,
///         }
///     }
/// }
///
/// let p = Person { first: "Ada".into(), age: 36 };
/// assert_eq!(p.property("age"), Some(RowValues::Int(36)));
/// ```
pub trait PropertyReadable: Send + Sync {
    /// Return the property value, or `None` when the property does not exist.
    fn property(&self, name: &str) -> Option<RowValues>;
}

impl PropertyReadable for HashMap<String, RowValues> {
    fn property(&self, name: &str) -> Option<RowValues> {
        self.get(name).cloned()
    }
}

impl PropertyReadable for BTreeMap<String, RowValues> {
    fn property(&self, name: &str) -> Option<RowValues> {
        self.get(name).cloned()
    }
}

impl PropertyReadable for JsonMap<String, JsonValue> {
    fn property(&self, name: &str) -> Option<RowValues> {
        self.get(name).cloned().map(RowValues::from)
    }
}

impl PropertyReadable for JsonValue {
    fn property(&self, name: &str) -> Option<RowValues> {
        self.as_object().and_then(|map| map.property(name))
    }
}

/// Map-like lookup on a plain value; only JSON objects carry properties.
pub(crate) fn value_property(value: &RowValues, name: &str) -> Option<RowValues> {
    match value {
        RowValues::JSON(json) => json.property(name),
        _ => None,
    }
}
