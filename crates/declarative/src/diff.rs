//! Three-way diff of desired against observed lists

use crate::error::{Error, Result};
use crate::matcher::Matcher;
use crate::types::Spec;
use serde::{Deserialize, Serialize};

/// Whether prior state is tracked between passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// The observed list only holds entities this tool managed before
    Stateful,
    /// No prior state: observed entities the caller never asked about are ignored
    #[default]
    Stateless,
}

/// What to do when two desired entries share an identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Fail the pass
    #[default]
    Reject,
    /// Keep the first entry, drop later ones with a warning
    FirstWins,
}

/// Options for [`compute`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffOptions {
    pub mode: Mode,
    pub duplicates: DuplicatePolicy,
}

/// An identity-matched pair of observed and desired specs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Observed side
    pub from: Spec,
    /// Desired side
    pub to: Spec,
}

/// Disjoint partition of the desired and observed lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    pub to_add: Vec<Spec>,
    pub to_remove: Vec<Spec>,
    pub to_modify: Vec<Change>,
    pub unchanged: Vec<Change>,
    /// Desired duplicates dropped under [`DuplicatePolicy::FirstWins`]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped: Vec<Spec>,
}

impl Diff {
    /// True when nothing needs to be added, removed or modified
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty() && self.to_modify.is_empty()
    }

    pub fn total_changes(&self) -> usize {
        self.to_add.len() + self.to_remove.len() + self.to_modify.len()
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            additions: self.to_add.len(),
            removals: self.to_remove.len(),
            modifications: self.to_modify.len(),
            unchanged: self.unchanged.len(),
        }
    }
}

/// Diff summary statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub additions: usize,
    pub removals: usize,
    pub modifications: usize,
    pub unchanged: usize,
}

impl DiffSummary {
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Compute the diff that converges `observed` to `desired`
///
/// Deterministic and order-stable: every output list follows the index
/// order of the list its entries came from.
pub fn compute(
    desired: &[Spec],
    observed: &[Spec],
    matcher: &dyn Matcher,
    opts: &DiffOptions,
) -> Result<Diff> {
    let mut diff = Diff::default();
    let desired = dedupe(desired, matcher, opts.duplicates, &mut diff.dropped)?;

    let observed: Vec<&Spec> = match opts.mode {
        Mode::Stateful => observed.iter().collect(),
        Mode::Stateless => observed
            .iter()
            .filter(|o| desired.iter().any(|d| matcher.is_same_entity(d, o)))
            .collect(),
    };

    let mut claimed = vec![false; observed.len()];

    for d in &desired {
        let pair = observed
            .iter()
            .enumerate()
            .find(|(i, o)| !claimed[*i] && matcher.is_same_entity(d, o));

        match pair {
            None => diff.to_add.push((*d).clone()),
            Some((i, o)) => {
                claimed[i] = true;
                let change = Change {
                    from: (*o).clone(),
                    to: (*d).clone(),
                };
                if matcher.is_equal_state(d, o) {
                    diff.unchanged.push(change);
                } else {
                    diff.to_modify.push(change);
                }
            }
        }
    }

    diff.to_remove = observed
        .iter()
        .zip(&claimed)
        .filter(|(_, claimed)| !**claimed)
        .map(|(o, _)| (*o).clone())
        .collect();

    Ok(diff)
}

fn dedupe<'a>(
    desired: &'a [Spec],
    matcher: &dyn Matcher,
    policy: DuplicatePolicy,
    dropped: &mut Vec<Spec>,
) -> Result<Vec<&'a Spec>> {
    let mut kept: Vec<&Spec> = Vec::with_capacity(desired.len());

    for spec in desired {
        match kept.iter().find(|k| matcher.is_same_entity(k, spec)) {
            None => kept.push(spec),
            Some(first) => match policy {
                DuplicatePolicy::Reject => {
                    return Err(Error::DuplicateIdentity {
                        identity: matcher.identity_of(spec),
                        first: first.to_string(),
                        second: spec.to_string(),
                    });
                }
                DuplicatePolicy::FirstWins => {
                    log::warn!(
                        "Ignoring duplicate entry {} (keeping {})",
                        spec,
                        first
                    );
                    dropped.push(spec.clone());
                }
            },
        }
    }

    Ok(kept)
}
