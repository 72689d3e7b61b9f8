//! Planner - refreshes a backend and diffs it against the desired list

use crate::backend::Backend;
use crate::diff::{self, Diff, DiffOptions, Mode};
use crate::types::{Refresh, Spec};
use anyhow::Result;

/// Outcome of planning one backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// The backend can't be queried (tool missing, ...); nothing to do
    Unavailable { reason: String },
    /// The diff to apply
    Ready(Diff),
}

impl Plan {
    pub fn diff(&self) -> Option<&Diff> {
        match self {
            Self::Ready(diff) => Some(diff),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn has_changes(&self) -> bool {
        self.diff().is_some_and(|d| !d.is_empty())
    }
}

/// Refresh `backend` and compute the diff against `desired`
///
/// In stateful mode `managed` holds the entities applied by the previous
/// pass; they are queried alongside `desired` so that entities dropped from
/// the desired list show up as removals. Stateless mode ignores `managed`.
pub fn plan<B: Backend + ?Sized>(
    backend: &mut B,
    desired: &[Spec],
    managed: &[Spec],
    opts: &DiffOptions,
) -> Result<Plan> {
    let mut query: Vec<Spec> = desired.to_vec();
    if opts.mode == Mode::Stateful {
        let matcher = backend.matcher();
        let extra: Vec<Spec> = managed
            .iter()
            .filter(|m| !query.iter().any(|q| matcher.is_same_entity(q, m)))
            .cloned()
            .collect();
        query.extend(extra);
    }

    let observed = match backend.refresh(&query)? {
        Refresh::Available(observed) => observed,
        Refresh::Unavailable { reason } => {
            log::warn!("{}: skipped, {}", backend.name(), reason);
            return Ok(Plan::Unavailable { reason });
        }
    };

    let observed = match opts.mode {
        Mode::Stateless => observed,
        // Only entities this tool is responsible for may be removed
        Mode::Stateful => {
            let matcher = backend.matcher();
            observed
                .into_iter()
                .filter(|o| query.iter().any(|q| matcher.is_same_entity(q, o)))
                .collect()
        }
    };

    let diff = diff::compute(desired, &observed, backend.matcher(), opts)?;
    log::debug!(
        "{}: {} to add, {} to remove, {} to modify, {} unchanged",
        backend.name(),
        diff.to_add.len(),
        diff.to_remove.len(),
        diff.to_modify.len(),
        diff.unchanged.len()
    );
    Ok(Plan::Ready(diff))
}
