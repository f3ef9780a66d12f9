//! Value types for variables and bindings.
//!
//! Every type is a stateless descriptor that knows how to validate,
//! serialize and unserialize a `serde_json::Value`, and which other types
//! it can accept values from.

use std::borrow::Cow;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use super::enums::EnumSpec;

static DECIMAL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)$").unwrap_or_else(|e| panic!("Invalid decimal regex: {e}"))
});

static LANGUAGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z]{2,3}([_-][a-z0-9]{2,8})*$")
        .unwrap_or_else(|e| panic!("Invalid language regex: {e}"))
});

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s,]+@[^@\s,]+\.[^@\s,]+$").unwrap_or_else(|e| panic!("Invalid email regex: {e}"))
});

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(https?|ftp)://[^\s/$.?#][^\s]*$").unwrap_or_else(|e| panic!("Invalid URL regex: {e}"))
});

static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+?[0-9][0-9 ().-]{3,}$").unwrap_or_else(|e| panic!("Invalid phone regex: {e}"))
});

/// A value could not be converted to a type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// The JSON shape cannot hold this type at all.
    #[error("expected {expected}, got {found}")]
    Mismatch {
        /// Expected type name
        expected: String,
        /// Offending value
        found: String,
    },
    /// The shape fits but the content is invalid.
    #[error("invalid {kind}: {value}")]
    Invalid {
        /// Type name
        kind: String,
        /// Offending value
        value: String,
    },
}

/// A value type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// `true` / `false`
    Boolean,
    /// Whole number
    Integer,
    /// Decimal number kept as a normalized string
    Decimal,
    /// Free text
    Text,
    /// Language code
    Language,
    /// One or more email addresses
    Email,
    /// Absolute URL
    Url,
    /// Phone number
    Phone,
    /// Reference to a host entity with the given model label
    Model(String),
    /// Member of an enumeration
    Enum(&'static EnumSpec),
}

impl Type {
    /// Create a model reference type.
    #[must_use]
    pub fn model(label: impl Into<String>) -> Self {
        Self::Model(label.into())
    }

    /// Stable identifier.
    #[must_use]
    pub const fn identifier(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Text => "text",
            Self::Language => "language",
            Self::Email => "email",
            Self::Url => "url",
            Self::Phone => "phone",
            Self::Model(_) => "model",
            Self::Enum(_) => "enum",
        }
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Boolean => "Boolean".to_string(),
            Self::Integer => "Integer Number".to_string(),
            Self::Decimal => "Decimal Number".to_string(),
            Self::Text => "Text".to_string(),
            Self::Language => "Language".to_string(),
            Self::Email => "Email Address".to_string(),
            Self::Url => "URL Address".to_string(),
            Self::Phone => "Phone Number".to_string(),
            Self::Model(label) => format!("Model ({label})"),
            Self::Enum(spec) => format!("Enum ({})", spec.name),
        }
    }

    /// Whether values of `other` may be bound where this type is expected.
    #[must_use]
    pub fn is_coercible_from(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text, _) => true,
            (Self::Model(label), Self::Model(other_label)) => label == other_label,
            (Self::Model(_), _) => false,
            _ => self.identifier() == other.identifier(),
        }
    }

    /// Check that a value is acceptable for this type.
    ///
    /// # Errors
    ///
    /// Returns a `TypeError` when the value cannot be converted, including
    /// enum values with no matching member.
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        let converted = self.unserialize(value)?;
        if let Self::Enum(spec) = self {
            if converted.is_null() && !value.is_null() {
                return Err(TypeError::Invalid {
                    kind: spec.name.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Convert an in-memory value to its stored form.
    #[must_use]
    pub fn serialize(&self, value: &Value) -> Value {
        match (self, value) {
            (Self::Enum(spec), Value::String(name)) => spec
                .by_name(name)
                .map_or_else(|| value.clone(), |member| Value::from(member.value)),
            _ => value.clone(),
        }
    }

    /// Convert a stored or user-supplied value to this type.
    ///
    /// `null` always converts to `null`. Enum values that match no member
    /// convert to `null` instead of failing.
    ///
    /// # Errors
    ///
    /// Returns a `TypeError` when the value cannot be converted.
    pub fn unserialize(&self, raw: &Value) -> Result<Value, TypeError> {
        if raw.is_null() {
            return Ok(Value::Null);
        }
        match self {
            Self::Boolean => unserialize_boolean(raw).ok_or_else(|| self.mismatch(raw)),
            Self::Integer => unserialize_integer(raw)
                .map(Value::from)
                .ok_or_else(|| self.mismatch(raw)),
            Self::Decimal => self.unserialize_decimal(raw),
            Self::Text => Ok(Value::String(as_text(raw))),
            Self::Language => {
                let code = self.expect_str(raw)?.trim().to_lowercase();
                if code.is_empty() {
                    return Ok(Value::Null);
                }
                self.check_pattern(&LANGUAGE_PATTERN, code)
            }
            Self::Email => self.unserialize_email(raw),
            Self::Url => {
                let url = self.expect_str(raw)?.trim().to_string();
                if url.is_empty() {
                    return Ok(Value::Null);
                }
                self.check_pattern(&URL_PATTERN, url)
            }
            Self::Phone => {
                let phone = self.expect_str(raw)?.trim().to_string();
                if phone.is_empty() {
                    return Ok(Value::Null);
                }
                self.check_pattern(&PHONE_PATTERN, phone)
            }
            Self::Model(label) => self.unserialize_model(label, raw),
            Self::Enum(spec) => Ok(unserialize_enum(spec, raw)),
        }
    }

    fn mismatch(&self, raw: &Value) -> TypeError {
        TypeError::Mismatch {
            expected: self.name(),
            found: raw.to_string(),
        }
    }

    /// Text of a string-typed value. Numbers are taken by their text form.
    fn expect_str<'v>(&self, raw: &'v Value) -> Result<Cow<'v, str>, TypeError> {
        match raw {
            Value::String(s) => Ok(Cow::Borrowed(s)),
            Value::Number(n) => Ok(Cow::Owned(n.to_string())),
            _ => Err(self.mismatch(raw)),
        }
    }

    fn check_pattern(&self, pattern: &Regex, candidate: String) -> Result<Value, TypeError> {
        if pattern.is_match(&candidate) {
            Ok(Value::String(candidate))
        } else {
            Err(TypeError::Invalid {
                kind: self.name(),
                value: candidate,
            })
        }
    }

    fn unserialize_decimal(&self, raw: &Value) -> Result<Value, TypeError> {
        let text = match raw {
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.trim().to_string(),
            _ => return Err(self.mismatch(raw)),
        };
        if text.is_empty() {
            return Ok(Value::Null);
        }
        self.check_pattern(&DECIMAL_PATTERN, text)
    }

    fn unserialize_email(&self, raw: &Value) -> Result<Value, TypeError> {
        let text = self.expect_str(raw)?;
        let addresses = split_emails(&text);
        if addresses.is_empty() {
            return Ok(Value::Null);
        }
        if let Some(bad) = addresses.iter().find(|a| !EMAIL_PATTERN.is_match(a)) {
            return Err(TypeError::Invalid {
                kind: self.name(),
                value: (*bad).to_string(),
            });
        }
        Ok(Value::String(addresses.join(", ")))
    }

    fn unserialize_model(&self, label: &str, raw: &Value) -> Result<Value, TypeError> {
        match raw {
            Value::Object(fields) => {
                if let Some(model) = fields.get("model").and_then(Value::as_str) {
                    if model != label {
                        return Err(TypeError::Invalid {
                            kind: self.name(),
                            value: format!("reference to {model}"),
                        });
                    }
                }
                let pk = fields
                    .get("pk")
                    .and_then(pk_text)
                    .ok_or_else(|| self.mismatch(raw))?;
                let mut normalized = fields.clone();
                normalized.insert("model".to_string(), Value::String(label.to_string()));
                normalized.insert("pk".to_string(), Value::String(pk));
                Ok(Value::Object(normalized))
            }
            Value::String(_) | Value::Number(_) => {
                let pk = pk_text(raw).ok_or_else(|| self.mismatch(raw))?;
                Ok(ModelRef::new(label, pk).to_value())
            }
            _ => Err(self.mismatch(raw)),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

fn unserialize_boolean(raw: &Value) -> Option<Value> {
    match raw {
        Value::Bool(b) => Some(Value::Bool(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(Value::Bool(false)),
            Some(1) => Some(Value::Bool(true)),
            _ => None,
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(Value::Bool(true)),
            "false" | "0" | "no" | "off" | "" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn unserialize_integer(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn unserialize_enum(spec: &EnumSpec, raw: &Value) -> Value {
    let member = raw
        .as_i64()
        .and_then(|v| spec.by_value(v))
        .or_else(|| {
            raw.as_str()
                .and_then(|s| s.trim().parse::<i64>().ok())
                .and_then(|v| spec.by_value(v))
        });
    if let Some(member) = member {
        Value::from(member.value)
    } else {
        debug!(target: "notify", "No {} member for {raw}", spec.name);
        Value::Null
    }
}

fn pk_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Split a comma separated address list, dropping blanks.
#[must_use]
pub fn split_emails(list: &str) -> Vec<&str> {
    list.split(',').map(str::trim).filter(|a| !a.is_empty()).collect()
}

/// Render a value as plain text (`null` becomes the empty string).
#[must_use]
pub fn as_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Truthiness of a value, as used by the boolean and emptiness conditions.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

/// Reference to a host entity.
///
/// The engine never owns the entity; it only carries its model label and
/// primary key around.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelRef {
    /// Model label, e.g. `shop.order`
    pub model: String,
    /// Primary key as text
    pub pk: String,
}

impl ModelRef {
    /// Create a reference.
    #[must_use]
    pub fn new(model: impl Into<String>, pk: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            pk: pk.into(),
        }
    }

    /// Read a reference out of a model value.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_object()?;
        let model = fields.get("model")?.as_str()?;
        let pk = fields.get("pk").and_then(pk_text)?;
        Some(Self::new(model, pk))
    }

    /// The canonical value form.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut fields = Map::new();
        fields.insert("model".to_string(), Value::String(self.model.clone()));
        fields.insert("pk".to_string(), Value::String(self.pk.clone()));
        Value::Object(fields)
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.model, self.pk)
    }
}
