//! Apply sequencer - runs a diff against a backend in a fixed order
//!
//! Order: refresh index, remove, add, in-place modify. Every step runs to
//! completion before the next starts and the first failure aborts the rest
//! of the pass; nothing is retried or rolled back.

use crate::backend::{Backend, ModifyStrategy};
use crate::diff::Diff;
use crate::progress::{ProgressCallback, Step};
use crate::types::Spec;
use anyhow::{Context, Result};

/// Options for [`apply`]
#[derive(Debug, Clone, Copy)]
pub struct ApplyOptions {
    /// Run the backend's index refresh before installing (if it has one)
    pub refresh_index: bool,
    /// Don't make changes, only report what would happen
    pub dry_run: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            refresh_index: true,
            dry_run: false,
        }
    }
}

/// Counts of what an apply pass did (or would do, for a dry run)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub unchanged: usize,
    pub index_refreshed: bool,
}

impl ApplySummary {
    pub fn total_changes(&self) -> usize {
        self.added + self.removed + self.modified
    }

    pub fn merge(&mut self, other: &ApplySummary) {
        self.added += other.added;
        self.removed += other.removed;
        self.modified += other.modified;
        self.unchanged += other.unchanged;
        self.index_refreshed |= other.index_refreshed;
    }
}

/// Apply a diff to a backend
pub fn apply<B, P>(
    diff: &Diff,
    backend: &mut B,
    opts: &ApplyOptions,
    progress: &mut P,
) -> Result<ApplySummary>
where
    B: Backend + ?Sized,
    P: ProgressCallback + ?Sized,
{
    let strategy = backend.modify_strategy();
    let old: Vec<Spec> = diff.to_modify.iter().map(|c| c.from.clone()).collect();
    let new: Vec<Spec> = diff.to_modify.iter().map(|c| c.to.clone()).collect();

    let mut removals = diff.to_remove.clone();
    let mut additions = diff.to_add.clone();
    if strategy == ModifyStrategy::Replace {
        removals.extend(old.iter().cloned());
        additions.extend(new.iter().cloned());
    }

    let mut summary = ApplySummary {
        added: diff.to_add.len(),
        removed: diff.to_remove.len(),
        modified: diff.to_modify.len(),
        unchanged: diff.unchanged.len(),
        index_refreshed: false,
    };

    if opts.dry_run {
        log::info!(
            "{}: dry run, {} change(s) not applied",
            backend.name(),
            summary.total_changes()
        );
        return Ok(summary);
    }

    let name = backend.name().to_string();

    let installs_pending = !diff.to_add.is_empty() || !diff.to_modify.is_empty();
    if opts.refresh_index && backend.has_index() && installs_pending {
        progress.on_step_start(&name, Step::RefreshIndex, 0);
        backend
            .refresh_index()
            .with_context(|| format!("{name}: failed to refresh package index"))?;
        progress.on_step_complete(&name, Step::RefreshIndex);
        summary.index_refreshed = true;
    }

    if !removals.is_empty() {
        run_step(&name, Step::Remove, &removals, progress, || {
            backend.remove(&removals)
        })?;
    }

    if !additions.is_empty() {
        run_step(&name, Step::Add, &additions, progress, || backend.add(&additions))?;
    }

    if strategy == ModifyStrategy::InPlace && !new.is_empty() {
        run_step(&name, Step::Modify, &new, progress, || backend.modify(&new, &old))?;
    }

    Ok(summary)
}

fn run_step<P, F>(name: &str, step: Step, specs: &[Spec], progress: &mut P, f: F) -> Result<()>
where
    P: ProgressCallback + ?Sized,
    F: FnOnce() -> Result<()>,
{
    log::debug!(
        "{name}: {step} {}",
        specs.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    );
    progress.on_step_start(name, step, specs.len());
    f().with_context(|| format!("{name}: {step} failed"))?;
    progress.on_step_complete(name, step);
    Ok(())
}
