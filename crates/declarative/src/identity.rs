//! Identity resolution: "is this the same real-world entity?"
//!
//! Identity only ever looks at the designated identity fields. A backend
//! may declare several mutually exclusive identity fields (the block config
//! backend uses `Host` and `Match`); a record is keyed by the first one it
//! carries, and two records are the same entity only when they are keyed
//! by the same field with the same value.

use crate::types::{Spec, Value};

/// The identity fields of a backend, in priority order
///
/// The first field is the coercion target for Primitive specs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityFields {
    fields: Vec<String>,
}

impl IdentityFields {
    /// A single identity field, e.g. `name`
    pub fn single(field: impl Into<String>) -> Self {
        Self {
            fields: vec![field.into()],
        }
    }

    /// Mutually exclusive identity fields, e.g. `Host` or `Match`
    ///
    /// An empty list falls back to `name`.
    pub fn one_of<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if fields.is_empty() {
            return Self::single("name");
        }
        Self { fields }
    }

    /// The field a Primitive is coerced into
    pub fn primary(&self) -> &str {
        &self.fields[0]
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// The identity key of a spec: which identity field it carries, and its value
    pub fn key_of<'a>(&'a self, spec: &Spec) -> Option<(&'a str, Value)> {
        match spec {
            Spec::Primitive(p) => Some((self.primary(), Value::Text(p.clone()))),
            Spec::Structured(record) => self
                .fields
                .iter()
                .find_map(|f| record.get(f).map(|v| (f.as_str(), v.clone()))),
        }
    }

    /// Human-readable identity, e.g. `Host=github.com`
    pub fn describe(&self, spec: &Spec) -> String {
        match self.key_of(spec) {
            Some((field, value)) if field == self.primary() && self.fields.len() == 1 => {
                value.to_string()
            }
            Some((field, value)) => format!("{field}={value}"),
            None => spec.to_string(),
        }
    }
}

/// Decide whether two specs denote the same entity
///
/// Symmetric and reflexive. Non-identity fields are ignored. Two specs that
/// carry no identity field at all are the same entity only if they are equal.
pub fn is_same_entity(identity: &IdentityFields, a: &Spec, b: &Spec) -> bool {
    match (a, b) {
        (Spec::Primitive(x), Spec::Primitive(y)) => x == y,
        _ => match (identity.key_of(a), identity.key_of(b)) {
            (Some(ka), Some(kb)) => ka == kb,
            (None, None) => a == b,
            _ => false,
        },
    }
}
