//! Backend trait for list-valued system state
//!
//! A backend owns one kind of entity (packages of one manager, blocks of one
//! config file, ...). It reports the live state and applies batches of
//! changes; deciding *which* changes is left to the diff engine.

use crate::matcher::Matcher;
use crate::types::{Refresh, Spec};
use anyhow::Result;

/// How a backend applies a modification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModifyStrategy {
    /// Remove the old entity, then add the new one
    #[default]
    Replace,
    /// Patch the entity where it is, keeping its position
    InPlace,
}

/// Core trait for reconciliation backends
///
/// # Example
///
/// ```ignore
/// use declarative::{Backend, FieldMatcher, Matcher, Refresh, Spec};
///
/// struct Listing { entries: Vec<Spec>, matcher: FieldMatcher }
///
/// impl Backend for Listing {
///     fn name(&self) -> &str { "listing" }
///     fn matcher(&self) -> &dyn Matcher { &self.matcher }
///     fn refresh(&mut self, _desired: &[Spec]) -> anyhow::Result<Refresh> {
///         Ok(Refresh::Available(self.entries.clone()))
///     }
///     fn add(&mut self, specs: &[Spec]) -> anyhow::Result<()> {
///         self.entries.extend_from_slice(specs);
///         Ok(())
///     }
///     fn remove(&mut self, specs: &[Spec]) -> anyhow::Result<()> {
///         self.entries.retain(|e| !specs.iter().any(|s| self.matcher.is_same_entity(s, e)));
///         Ok(())
///     }
/// }
/// ```
pub trait Backend {
    /// Short name used in messages and target filters, e.g. "apt"
    fn name(&self) -> &str;

    /// Identity and equality rules for this backend's entities
    fn matcher(&self) -> &dyn Matcher;

    /// Query the live system for the observed list
    ///
    /// `desired` tells backends that query per entity what to ask about.
    /// Returns [`Refresh::Unavailable`] when a prerequisite is missing.
    fn refresh(&mut self, desired: &[Spec]) -> Result<Refresh>;

    /// Whether the backend has a package index to refresh before installs
    fn has_index(&self) -> bool {
        false
    }

    /// Refresh the package index (e.g. `apt-get update`)
    fn refresh_index(&mut self) -> Result<()> {
        Ok(())
    }

    /// Create entities
    fn add(&mut self, specs: &[Spec]) -> Result<()>;

    /// Delete entities
    fn remove(&mut self, specs: &[Spec]) -> Result<()>;

    fn modify_strategy(&self) -> ModifyStrategy {
        ModifyStrategy::Replace
    }

    /// Modify entities; `new[i]` replaces `old[i]`
    ///
    /// Only called for [`ModifyStrategy::InPlace`] backends. The default
    /// falls back to remove then add.
    fn modify(&mut self, new: &[Spec], old: &[Spec]) -> Result<()> {
        self.remove(old)?;
        self.add(new)
    }
}

/// A boxed backend for type-erased storage
pub type BoxedBackend = Box<dyn Backend>;
