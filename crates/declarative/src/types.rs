//! Core types for declarative list reconciliation

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

/// A scalar field value, always held in normalized (internal) form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Value {
    /// Borrow the value as text, if it is text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as a bool, if it is one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

/// An insertion-ordered mapping from field name to value
///
/// Field order is significant for rendering: backends that write records
/// (the block config backend in particular) emit fields in this order.
/// Equality ignores it.
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl Eq for Record {}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a field; an existing key keeps its position and gets the new value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((key, value));
                None
            }
        }
    }

    /// Look up a field by exact name
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Remove a field, returning its value
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(pos).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterate over fields in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate over field names in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        write!(f, "}}")
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RecordVisitor;

        impl<'de> Visitor<'de> for RecordVisitor {
            type Value = Record;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of field names to scalar values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Record, A::Error> {
                let mut record = Record::new();
                while let Some((key, value)) = access.next_entry::<String, Value>()? {
                    record.insert(key, value);
                }
                Ok(record)
            }
        }

        deserializer.deserialize_map(RecordVisitor)
    }
}

/// One entry of a desired or observed list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Spec {
    /// A bare identifier, e.g. `"curl"`
    Primitive(String),
    /// A full record, e.g. `{ name = "curl", version = "7.81" }`
    Structured(Record),
}

impl Spec {
    /// Normalize to a structured record
    ///
    /// A Primitive `p` becomes `{identity_field: p}`; a Structured spec is
    /// borrowed as-is.
    pub fn normalize(&self, identity_field: &str) -> Cow<'_, Record> {
        match self {
            Self::Primitive(p) => Cow::Owned(Record::new().with(identity_field, p.as_str())),
            Self::Structured(r) => Cow::Borrowed(r),
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(_))
    }

    /// Look up a field; a Primitive only answers for `identity_field`
    pub fn field(&self, identity_field: &str, key: &str) -> Option<Value> {
        match self {
            Self::Primitive(p) if key == identity_field => Some(Value::Text(p.clone())),
            Self::Primitive(_) => None,
            Self::Structured(r) => r.get(key).cloned(),
        }
    }
}

impl From<&str> for Spec {
    fn from(s: &str) -> Self {
        Self::Primitive(s.to_string())
    }
}

impl From<String> for Spec {
    fn from(s: String) -> Self {
        Self::Primitive(s)
    }
}

impl From<Record> for Spec {
    fn from(r: Record) -> Self {
        Self::Structured(r)
    }
}

impl fmt::Display for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => write!(f, "{p}"),
            Self::Structured(r) => write!(f, "{r}"),
        }
    }
}

/// Result of asking a backend for the live state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Refresh {
    /// The observed list, queried fresh
    Available(Vec<Spec>),
    /// A prerequisite (usually the backend tool itself) is missing
    Unavailable { reason: String },
}

impl Refresh {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_insert_keeps_position() {
        let mut record = Record::new().with("Host", "a").with("Port", 22).with("User", "git");
        let previous = record.insert("Port", 2222);

        assert_eq!(previous, Some(Value::Int(22)));
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["Host", "Port", "User"]);
        assert_eq!(record.get("Port"), Some(&Value::Int(2222)));
    }

    #[test]
    fn test_record_equality_ignores_field_order() {
        let a = Record::new().with("name", "ll").with("command", "ls -l");
        let b = Record::new().with("command", "ls -l").with("name", "ll");

        assert_eq!(a, b);
        assert_ne!(a, b.clone().with("extra", true));
        assert_ne!(a, Record::new().with("name", "ll").with("command", "ls"));
        assert_eq!(a.keys().collect::<Vec<_>>(), vec!["name", "command"]);
    }

    #[test]
    fn test_record_remove() {
        let mut record = Record::new().with("name", "curl").with("version", "7.81");
        assert_eq!(record.remove("version"), Some(Value::from("7.81")));
        assert_eq!(record.remove("version"), None);
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_normalize_primitive() {
        let spec = Spec::from("curl");
        let record = spec.normalize("name");
        assert_eq!(record.as_ref(), &Record::new().with("name", "curl"));
    }

    #[test]
    fn test_normalize_structured_is_borrowed() {
        let spec = Spec::from(Record::new().with("name", "curl").with("version", "7.81"));
        assert!(matches!(spec.normalize("name"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_spec_field() {
        let spec = Spec::from("curl");
        assert_eq!(spec.field("name", "name"), Some(Value::from("curl")));
        assert_eq!(spec.field("name", "version"), None);
    }

    #[test]
    fn test_spec_deserialize_untagged() {
        let specs: Vec<Spec> =
            serde_json::from_str(r#"["curl", {"name": "git", "version": "2.40", "hold": true}]"#)
                .unwrap();

        assert_eq!(specs[0], Spec::from("curl"));
        let Spec::Structured(record) = &specs[1] else {
            panic!("expected structured spec");
        };
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["name", "version", "hold"]);
        assert_eq!(record.get("hold"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_record_display() {
        let record = Record::new().with("name", "curl").with("version", "7.81");
        assert_eq!(record.to_string(), "{name=curl, version=7.81}");
    }
}
