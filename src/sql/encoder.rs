//! Value literal encoder.
//!
//! Converts a [`Value`] into Snowflake literal SQL tagged with an explicit
//! cast, e.g. `'sent'::text`, `42::number` or
//! `TO_VARIANT(OBJECT_CONSTRUCT('id',1::number))`.
//!
//! Encoding is dispatched on the value's type tag through a registry of
//! [`LiteralRule`]s. The built-in Snowflake registry covers:
//!
//! | Tag         | Rendered as                         |
//! |-------------|-------------------------------------|
//! | `null`      | `NULL` (never cast)                 |
//! | `text`      | `'...'::text`                       |
//! | `integer`   | `n::number`                         |
//! | `boolean`   | `true::boolean` / `false::boolean`  |
//! | `timestamp` | `'YYYY-MM-DD HH:MM:SS'::datetime`   |
//! | `date`      | `'YYYY-MM-DD'::datetime`            |
//! | `decimal`   | `1.5::float`                        |
//! | `object`    | `TO_VARIANT(OBJECT_CONSTRUCT(...))` |
//! | `array`     | `TO_VARIANT(ARRAY_CONSTRUCT(...))`  |
//!
//! Extension values are rendered by whatever rule the caller registers
//! for their tag. A tag with no rule is an [`EncodeError::UnregisteredType`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use super::helpers;
use super::value::{tags, Value};

/// Errors raised while encoding values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodeError {
    #[error("Unknown type '{type_name}'. Register an encoding rule for it with LiteralEncoder::register")]
    UnregisteredType { type_name: String },

    #[error("The '{rule}' rule cannot encode a value of type '{type_name}'")]
    RuleMismatch { rule: String, type_name: String },

    #[error("Cannot encode non-finite decimal {0}")]
    NonFiniteDecimal(f64),
}

/// An encoding rule for one type tag.
///
/// Composite rules receive the encoder so nested values are dispatched
/// through the same registry.
pub trait LiteralRule: fmt::Debug + Send + Sync {
    fn encode(&self, value: &Value, encoder: &LiteralEncoder) -> Result<String, EncodeError>;
}

/// Scalar rule: `<literal>::<warehouse_type>`, optionally single-quoted.
#[derive(Debug, Clone)]
pub struct ScalarRule {
    pub warehouse_type: String,
    pub quoted: bool,
}

impl ScalarRule {
    pub fn new(warehouse_type: impl Into<String>, quoted: bool) -> Self {
        Self {
            warehouse_type: warehouse_type.into(),
            quoted,
        }
    }

    fn raw_text(value: &Value) -> Result<String, EncodeError> {
        let text = match value {
            Value::Text(s) => s.clone(),
            Value::Integer(n) => n.to_string(),
            Value::Boolean(b) => helpers::format_bool_literal(*b).to_string(),
            Value::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Decimal(f) => {
                helpers::format_float(*f).ok_or(EncodeError::NonFiniteDecimal(*f))?
            }
            Value::Extension { raw, .. } => raw.clone(),
            Value::Null | Value::Object(_) | Value::Array(_) => {
                return Err(EncodeError::RuleMismatch {
                    rule: "scalar".to_string(),
                    type_name: value.type_tag().to_string(),
                })
            }
        };
        Ok(text)
    }
}

impl LiteralRule for ScalarRule {
    fn encode(&self, value: &Value, _encoder: &LiteralEncoder) -> Result<String, EncodeError> {
        let text = Self::raw_text(value)?;
        let literal = if self.quoted {
            helpers::quote_string_single(&text)
        } else {
            text
        };
        Ok(helpers::cast(&literal, &self.warehouse_type))
    }
}

/// Object rule: `TO_VARIANT(OBJECT_CONSTRUCT('k',<v>,...))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectRule;

impl LiteralRule for ObjectRule {
    fn encode(&self, value: &Value, encoder: &LiteralEncoder) -> Result<String, EncodeError> {
        let Value::Object(pairs) = value else {
            return Err(EncodeError::RuleMismatch {
                rule: tags::OBJECT.to_string(),
                type_name: value.type_tag().to_string(),
            });
        };

        let mut args = Vec::with_capacity(pairs.len() * 2);
        for (key, nested) in pairs {
            args.push(helpers::quote_string_single(key));
            args.push(encoder.encode(nested)?);
        }
        Ok(helpers::variant_object(&args))
    }
}

/// Array rule: `TO_VARIANT(ARRAY_CONSTRUCT(<v>,...))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayRule;

impl LiteralRule for ArrayRule {
    fn encode(&self, value: &Value, encoder: &LiteralEncoder) -> Result<String, EncodeError> {
        let Value::Array(items) = value else {
            return Err(EncodeError::RuleMismatch {
                rule: tags::ARRAY.to_string(),
                type_name: value.type_tag().to_string(),
            });
        };

        let encoded = items
            .iter()
            .map(|item| encoder.encode(item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(helpers::variant_array(&encoded))
    }
}

/// Registry of literal rules keyed by type tag.
#[derive(Debug, Clone)]
pub struct LiteralEncoder {
    rules: HashMap<String, Arc<dyn LiteralRule>>,
}

impl LiteralEncoder {
    /// An encoder with no rules registered. Only `NULL` encodes.
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// The built-in Snowflake type mapping.
    pub fn snowflake() -> Self {
        let mut encoder = Self::empty();
        encoder
            .register_scalar(tags::TEXT, "text", true)
            .register_scalar(tags::INTEGER, "number", false)
            .register_scalar(tags::BOOLEAN, "boolean", false)
            .register_scalar(tags::TIMESTAMP, "datetime", true)
            .register_scalar(tags::DATE, "datetime", true)
            .register_scalar(tags::DECIMAL, "float", false)
            .register(tags::OBJECT, ObjectRule)
            .register(tags::ARRAY, ArrayRule);
        encoder
    }

    /// Register (or replace) the rule for a type tag.
    pub fn register(&mut self, tag: impl Into<String>, rule: impl LiteralRule + 'static) -> &mut Self {
        self.rules.insert(tag.into(), Arc::new(rule));
        self
    }

    /// Register a [`ScalarRule`] for a type tag.
    pub fn register_scalar(
        &mut self,
        tag: impl Into<String>,
        warehouse_type: impl Into<String>,
        quoted: bool,
    ) -> &mut Self {
        self.register(tag, ScalarRule::new(warehouse_type, quoted))
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.rules.contains_key(tag)
    }

    /// Encode a value as a literal SQL expression.
    pub fn encode(&self, value: &Value) -> Result<String, EncodeError> {
        if value.is_null() {
            return Ok("NULL".to_string());
        }

        let tag = value.type_tag();
        let rule = self
            .rules
            .get(tag)
            .ok_or_else(|| EncodeError::UnregisteredType {
                type_name: tag.to_string(),
            })?;
        rule.encode(value, self)
    }
}

impl Default for LiteralEncoder {
    fn default() -> Self {
        Self::snowflake()
    }
}

static SNOWFLAKE_ENCODER: LazyLock<LiteralEncoder> = LazyLock::new(LiteralEncoder::snowflake);

/// Encode a value with the built-in Snowflake mapping.
pub fn encode(value: &Value) -> Result<String, EncodeError> {
    SNOWFLAKE_ENCODER.encode(value)
}
