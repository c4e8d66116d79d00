//! Typed values that can be rendered as Snowflake literals.
//!
//! A [`Value`] carries its own type tag. The tag is what the
//! [`LiteralEncoder`](super::encoder::LiteralEncoder) dispatches on, so a
//! value can only be rendered if a rule is registered for its tag.

use chrono::{NaiveDate, NaiveDateTime};

/// Type tag names for the built-in value kinds.
pub mod tags {
    pub const NULL: &str = "null";
    pub const TEXT: &str = "text";
    pub const INTEGER: &str = "integer";
    pub const BOOLEAN: &str = "boolean";
    pub const TIMESTAMP: &str = "timestamp";
    pub const DATE: &str = "date";
    pub const DECIMAL: &str = "decimal";
    pub const OBJECT: &str = "object";
    pub const ARRAY: &str = "array";
}

/// A host value plus its runtime type tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Boolean(bool),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Decimal(f64),
    /// Key/value pairs in insertion order.
    Object(Vec<(String, Value)>),
    Array(Vec<Value>),
    /// A value of a caller-defined type.
    ///
    /// `raw` is the literal text handed to whichever rule is registered
    /// under `type_name`.
    Extension { type_name: String, raw: String },
}

impl Value {
    /// The type tag used to look up this value's encoding rule.
    pub fn type_tag(&self) -> &str {
        match self {
            Value::Null => tags::NULL,
            Value::Text(_) => tags::TEXT,
            Value::Integer(_) => tags::INTEGER,
            Value::Boolean(_) => tags::BOOLEAN,
            Value::Timestamp(_) => tags::TIMESTAMP,
            Value::Date(_) => tags::DATE,
            Value::Decimal(_) => tags::DECIMAL,
            Value::Object(_) => tags::OBJECT,
            Value::Array(_) => tags::ARRAY,
            Value::Extension { type_name, .. } => type_name,
        }
    }

    /// Build an object value from key/value pairs, keeping their order.
    pub fn object<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Object(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build an array value.
    pub fn array<V, I>(items: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    /// Build a value of a caller-registered type.
    pub fn extension(type_name: impl Into<String>, raw: impl Into<String>) -> Self {
        Value::Extension {
            type_name: type_name.into(),
            raw: raw.into(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Text(s.clone())
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Integer(n as i64)
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Decimal(f)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Decimal(f as f64)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(ts: NaiveDateTime) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::array(items)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Decimal(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}
