//! Representation transform between internal values and wire tokens
//!
//! Backends apply a [`WireCodec`] at their boundary only: the diff engine
//! and the matchers always see normalized [`Value`]s, never wire tokens.

use crate::error::{Error, Result};
use crate::types::{Record, Value};

/// Per-field conversion between a [`Value`] and its textual wire form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Converter {
    /// Booleans written as fixed tokens, e.g. `yes`/`no`
    Bool {
        truthy: &'static str,
        falsy: &'static str,
    },
    /// Decimal integers
    Int,
    /// Passed through unchanged
    Text,
}

impl Converter {
    /// The ssh-style `yes`/`no` boolean converter
    pub const YES_NO: Self = Self::Bool {
        truthy: "yes",
        falsy: "no",
    };

    fn encode(&self, value: &Value) -> String {
        match (self, value) {
            (Self::Bool { truthy, falsy }, Value::Bool(b)) => {
                (if *b { truthy } else { falsy }).to_string()
            }
            (_, other) => other.to_string(),
        }
    }

    fn decode(&self, field: &str, token: &str) -> Result<Value> {
        match self {
            Self::Bool { truthy, falsy } => {
                if token.eq_ignore_ascii_case(truthy) {
                    Ok(Value::Bool(true))
                } else if token.eq_ignore_ascii_case(falsy) {
                    Ok(Value::Bool(false))
                } else {
                    Err(Error::Wire {
                        field: field.to_string(),
                        token: token.to_string(),
                        expected: format!("{truthy} or {falsy}"),
                    })
                }
            }
            Self::Int => token.parse::<i64>().map(Value::Int).map_err(|_| Error::Wire {
                field: field.to_string(),
                token: token.to_string(),
                expected: "an integer".to_string(),
            }),
            Self::Text => Ok(Value::Text(token.to_string())),
        }
    }
}

/// Lookup table of converters keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireCodec {
    converters: Vec<(String, Converter)>,
    case_insensitive: bool,
}

impl WireCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec where every listed field is a `yes`/`no` boolean
    pub fn yes_no<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        fields
            .into_iter()
            .fold(Self::new(), |codec, f| codec.field(f, Converter::YES_NO))
    }

    /// Register a converter for a field
    pub fn field(mut self, name: impl Into<String>, converter: Converter) -> Self {
        self.converters.push((name.into(), converter));
        self
    }

    /// Match field names ignoring ASCII case (ssh keywords are case-insensitive)
    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    fn converter(&self, field: &str) -> &Converter {
        self.converters
            .iter()
            .find(|(name, _)| {
                if self.case_insensitive {
                    name.eq_ignore_ascii_case(field)
                } else {
                    name == field
                }
            })
            .map_or(&Converter::Text, |(_, c)| c)
    }

    /// Render one value for the wire
    pub fn encode_value(&self, field: &str, value: &Value) -> String {
        self.converter(field).encode(value)
    }

    /// Parse one wire token back into a value
    pub fn decode_value(&self, field: &str, token: &str) -> Result<Value> {
        self.converter(field).decode(field, token)
    }

    /// Convert a record to ordered `(field, token)` pairs
    pub fn to_wire(&self, record: &Record) -> Vec<(String, String)> {
        record
            .iter()
            .map(|(k, v)| (k.to_string(), self.encode_value(k, v)))
            .collect()
    }

    /// Convert ordered `(field, token)` pairs back to a record
    pub fn from_wire<I, K, V>(&self, pairs: I) -> Result<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut record = Record::new();
        for (k, v) in pairs {
            let (k, v) = (k.as_ref(), v.as_ref());
            record.insert(k, self.decode_value(k, v)?);
        }
        Ok(record)
    }
}
