//! Equality comparison: "is this entity already in the desired state?"
//!
//! How a field that is absent from the desired side is treated differs per
//! backend, so it is an explicit [`MissingField`] policy rather than one
//! rule for everybody.

use crate::identity::{IdentityFields, is_same_entity};
use crate::types::{Record, Spec};
use serde::{Deserialize, Serialize};

/// Policy for fields the desired spec does not mention
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingField {
    /// Any unmentioned field is "don't care" (package backends)
    #[default]
    Wildcard,
    /// Only the listed fields are "don't care"; any other field the
    /// observed side carries forces inequality
    WildcardFields(Vec<String>),
    /// Unmentioned fields must be absent on both sides (block config)
    Strict,
}

impl MissingField {
    fn ignores(&self, field: &str) -> bool {
        match self {
            Self::Wildcard => true,
            Self::WildcardFields(fields) => fields.iter().any(|f| f == field),
            Self::Strict => false,
        }
    }
}

/// Decide whether `observed` already matches `desired`
///
/// Equality implies identity: specs that are not the same entity are never
/// equal, whatever their fields.
pub fn is_equal_state(
    identity: &IdentityFields,
    policy: &MissingField,
    desired: &Spec,
    observed: &Spec,
) -> bool {
    if !is_same_entity(identity, desired, observed) {
        return false;
    }

    let desired = desired.normalize(identity.primary());
    let observed = observed.normalize(identity.primary());
    records_match(policy, &desired, &observed)
}

fn records_match(policy: &MissingField, desired: &Record, observed: &Record) -> bool {
    let desired_fields_hold = desired
        .iter()
        .all(|(key, value)| observed.get(key) == Some(value));

    if !desired_fields_hold {
        return false;
    }

    observed
        .keys()
        .filter(|key| !desired.contains_key(key))
        .all(|key| policy.ignores(key))
}
