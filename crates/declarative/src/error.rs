//! Error types for diffing and wire conversion

use thiserror::Error;

/// Errors raised by the reconciliation core
#[derive(Debug, Error)]
pub enum Error {
    /// Two desired entries denote the same entity
    #[error("duplicate desired entry for {identity}: {first} and {second}")]
    DuplicateIdentity {
        identity: String,
        first: String,
        second: String,
    },

    /// A spec has no value for any identity field
    #[error("entry {spec} has none of the identity fields: {fields}")]
    MissingIdentity { spec: String, fields: String },

    /// A wire token could not be converted back to an internal value
    #[error("invalid value for {field}: {token:?} ({expected})")]
    Wire {
        field: String,
        token: String,
        expected: String,
    },
}

/// Result alias for the reconciliation core
pub type Result<T> = std::result::Result<T, Error>;
