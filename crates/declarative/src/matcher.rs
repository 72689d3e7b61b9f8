//! Matcher strategies injected into the diff engine
//!
//! Every backend supplies a [`Matcher`]. Most use [`FieldMatcher`], which is
//! configured with identity fields and a [`MissingField`] policy; backends
//! whose rules are not field-shaped can pass closures through [`FnMatcher`].

use crate::equality::{MissingField, is_equal_state};
use crate::identity::{IdentityFields, is_same_entity};
use crate::types::Spec;
use std::fmt;

/// Identity and equality predicates for one backend
pub trait Matcher {
    /// Whether `a` and `b` denote the same real-world entity
    fn is_same_entity(&self, a: &Spec, b: &Spec) -> bool;

    /// Whether `observed` is already in the state `desired` asks for
    fn is_equal_state(&self, desired: &Spec, observed: &Spec) -> bool;

    /// Human-readable identity, used in messages and errors
    fn identity_of(&self, spec: &Spec) -> String {
        spec.to_string()
    }
}

/// Field-driven matcher: identity fields plus a missing-field policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatcher {
    pub identity: IdentityFields,
    pub missing: MissingField,
}

impl FieldMatcher {
    pub fn new(identity: IdentityFields, missing: MissingField) -> Self {
        Self { identity, missing }
    }

    /// Identity on `name`, unmentioned fields are don't-care
    pub fn by_name() -> Self {
        Self::new(IdentityFields::single("name"), MissingField::Wildcard)
    }

    pub fn with_missing(mut self, missing: MissingField) -> Self {
        self.missing = missing;
        self
    }
}

impl Matcher for FieldMatcher {
    fn is_same_entity(&self, a: &Spec, b: &Spec) -> bool {
        is_same_entity(&self.identity, a, b)
    }

    fn is_equal_state(&self, desired: &Spec, observed: &Spec) -> bool {
        is_equal_state(&self.identity, &self.missing, desired, observed)
    }

    fn identity_of(&self, spec: &Spec) -> String {
        self.identity.describe(spec)
    }
}

type Predicate = Box<dyn Fn(&Spec, &Spec) -> bool + Send + Sync>;

/// Closure-driven matcher
///
/// The equality closure is only consulted for specs the identity closure
/// already considers the same entity.
pub struct FnMatcher {
    same: Predicate,
    equal: Predicate,
}

impl FnMatcher {
    pub fn new<S, E>(same: S, equal: E) -> Self
    where
        S: Fn(&Spec, &Spec) -> bool + Send + Sync + 'static,
        E: Fn(&Spec, &Spec) -> bool + Send + Sync + 'static,
    {
        Self {
            same: Box::new(same),
            equal: Box::new(equal),
        }
    }
}

impl fmt::Debug for FnMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMatcher").finish_non_exhaustive()
    }
}

impl Matcher for FnMatcher {
    fn is_same_entity(&self, a: &Spec, b: &Spec) -> bool {
        (self.same)(a, b)
    }

    fn is_equal_state(&self, desired: &Spec, observed: &Spec) -> bool {
        (self.same)(desired, observed) && (self.equal)(desired, observed)
    }
}
