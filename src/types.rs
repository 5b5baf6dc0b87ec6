use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::SqlFacadeError;
use crate::model::PropertyReadable;

/// Values that can be stored in a database row or used as query parameters.
///
/// ```rust
/// use sql_facade::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RowValues::Bool(value) => Some(*value),
            RowValues::Int(1) => Some(true),
            RowValues::Int(0) => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

impl From<JsonValue> for RowValues {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => RowValues::Null,
            JsonValue::Bool(b) => RowValues::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => RowValues::Int(i),
                None => n.as_f64().map_or(RowValues::JSON(JsonValue::Number(n)), RowValues::Float),
            },
            JsonValue::String(s) => RowValues::Text(s),
            other @ (JsonValue::Array(_) | JsonValue::Object(_)) => RowValues::JSON(other),
        }
    }
}

macro_rules! row_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for RowValues {
                fn from(value: $ty) -> Self {
                    RowValues::$variant(value.into())
                }
            }
        )*
    };
}

row_value_from! {
    i64 => Int,
    i32 => Int,
    f64 => Float,
    bool => Bool,
    String => Text,
    &str => Text,
    NaiveDateTime => Timestamp,
    Vec<u8> => Blob,
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Driver-level SQL type tag used for stored-procedure out parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum SqlType {
    Integer,
    BigInt,
    Double,
    Decimal,
    Varchar,
    Boolean,
    Timestamp,
    Blob,
    Other,
}

/// A caller-supplied argument to a query, update, call or batch unit.
///
/// Named placeholders (`:name`, `?2.name`) read properties from `Model`
/// arguments; positional placeholders take `Value`s as given.
#[derive(Clone)]
pub enum Param {
    /// A plain value bound as-is.
    Value(RowValues),
    /// A property-bearing object consulted by named placeholders.
    Model(Arc<dyn PropertyReadable>),
    /// Out parameter of a stored procedure call.
    Out(SqlType),
    /// In/out parameter of a stored procedure call.
    InOut(RowValues, SqlType),
}

impl Param {
    pub fn model(model: impl PropertyReadable + 'static) -> Self {
        Param::Model(Arc::new(model))
    }

    /// Serialise any `Serialize` value into a map-backed model.
    ///
    /// # Errors
    /// Returns `SqlFacadeError::ConfigError` if serialisation fails or the value is not a
    /// struct/map.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self, SqlFacadeError> {
        match serde_json::to_value(value) {
            Ok(JsonValue::Object(map)) => Ok(Param::Model(Arc::new(map))),
            Ok(other) => Err(SqlFacadeError::ConfigError(format!(
                "expected an object-like model, got {other}"
            ))),
            Err(err) => Err(SqlFacadeError::ConfigError(format!(
                "failed to serialise model: {err}"
            ))),
        }
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&RowValues> {
        match self {
            Param::Value(value) | Param::InOut(value, _) => Some(value),
            Param::Model(_) | Param::Out(_) => None,
        }
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Param::Model(_) => f.debug_tuple("Model").field(&"<model>").finish(),
            Param::Out(ty) => f.debug_tuple("Out").field(ty).finish(),
            Param::InOut(value, ty) => f.debug_tuple("InOut").field(value).field(ty).finish(),
        }
    }
}

impl<T: Into<RowValues>> From<T> for Param {
    fn from(value: T) -> Self {
        Param::Value(value.into())
    }
}

/// A fully resolved parameter as handed to a driver statement.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementParam {
    In(RowValues),
    Out(SqlType),
    InOut(RowValues, SqlType),
}

impl StatementParam {
    #[must_use]
    pub fn value(&self) -> Option<&RowValues> {
        match self {
            StatementParam::In(value) | StatementParam::InOut(value, _) => Some(value),
            StatementParam::Out(_) => None,
        }
    }
}

/// Build a `Vec<Param>` from heterogeneous values.
///
/// ```rust
/// use sql_facade::params;
///
/// let args = params![1, "bob", true];
/// assert_eq!(args.len(), 3);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::types::Param>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::types::Param::from($value)),+]
    };
}
