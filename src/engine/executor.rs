//! Plans every backend, then applies them one after another

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use declarative::{ApplyOptions, ApplySummary, DiffOptions, Plan, ProgressCallback, plan};
use std::path::Path;

use crate::resource::{Managed, TextPreview};
use crate::state::ConvergeState;

use super::differ::display_plans;

/// Options for [`execute`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Skip the confirmation prompt
    pub yes: bool,
    /// Skip package index refreshes
    pub no_refresh_index: bool,
    /// Show text diffs for file-backed resources
    pub show_text: bool,
}

/// A backend with its computed plan
pub struct PlannedBackend {
    pub managed: Managed,
    pub plan: Plan,
    pub preview: Option<TextPreview>,
}

/// Summary of an apply run
#[derive(Debug, Default)]
pub struct ExecuteSummary {
    pub changes: ApplySummary,
    /// Backends that were applied
    pub applied: Vec<String>,
    /// Backends skipped as unavailable
    pub unavailable: Vec<String>,
    pub aborted: bool,
}

/// Refresh and diff every backend
///
/// Backends with nothing desired and nothing previously managed are left
/// out entirely, so a missing tool for an unused backend stays quiet.
pub fn plan_all(
    managed: Vec<Managed>,
    state: &ConvergeState,
    opts: &DiffOptions,
) -> Result<Vec<PlannedBackend>> {
    let mut planned = Vec::new();
    for mut backend in managed {
        let name = backend.name().to_string();
        let previous = state.managed(&name);
        if backend.desired.is_empty() && previous.is_empty() {
            log::debug!("{name}: nothing configured");
            continue;
        }

        let plan = plan(backend.resource.as_mut(), &backend.desired, previous, opts)
            .with_context(|| format!("Failed to plan {name}"))?;
        let preview = match plan.diff() {
            Some(diff) if !diff.is_empty() => backend.resource.preview(diff)?,
            _ => None,
        };
        planned.push(PlannedBackend {
            managed: backend,
            plan,
            preview,
        });
    }
    Ok(planned)
}

/// Show the plans, confirm, and apply them in order
///
/// The first failing backend stops the run. State is recorded for every
/// backend that completed before it.
pub fn execute<P: ProgressCallback>(
    mut planned: Vec<PlannedBackend>,
    state: &mut ConvergeState,
    state_file: &Path,
    opts: &ExecuteOptions,
    progress: &mut P,
) -> Result<ExecuteSummary> {
    display_plans(&planned, opts.show_text);

    let mut summary = ExecuteSummary {
        unavailable: planned
            .iter()
            .filter(|p| p.plan.diff().is_none())
            .map(|p| p.managed.name().to_string())
            .collect(),
        ..Default::default()
    };

    let pending = planned.iter().any(|p| p.plan.has_changes());
    if !pending {
        if !opts.dry_run {
            record_unchanged(&planned, state, state_file);
        }
        return Ok(summary);
    }

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(summary);
    }

    if !opts.yes && !confirm_proceed()? {
        println!();
        println!("  {} Aborted", "✗".red());
        summary.aborted = true;
        return Ok(summary);
    }

    let apply_opts = ApplyOptions {
        refresh_index: !opts.no_refresh_index,
        dry_run: false,
    };

    let result = apply_in_order(&mut planned, state, &apply_opts, progress, &mut summary);
    state.save_to(state_file)?;
    result?;

    print_summary(&summary);
    Ok(summary)
}

fn apply_in_order<P: ProgressCallback>(
    planned: &mut [PlannedBackend],
    state: &mut ConvergeState,
    opts: &ApplyOptions,
    progress: &mut P,
    summary: &mut ExecuteSummary,
) -> Result<()> {
    for backend in planned.iter_mut() {
        let Plan::Ready(diff) = &backend.plan else {
            continue;
        };
        let name = backend.managed.name().to_string();

        if !diff.is_empty() {
            let applied = declarative::apply(diff, backend.managed.resource.as_mut(), opts, progress)?;
            summary.changes.merge(&applied);
            summary.applied.push(name.clone());
        }
        state.record_applied(&name, &backend.managed.desired);
    }
    Ok(())
}

/// Keep the state file in step when everything already converged
fn record_unchanged(planned: &[PlannedBackend], state: &mut ConvergeState, state_file: &Path) {
    let mut touched = false;
    for backend in planned.iter().filter(|p| p.plan.diff().is_some()) {
        let name = backend.managed.name();
        if state.managed(name) != backend.managed.desired.as_slice() {
            state.record_applied(name, &backend.managed.desired);
            touched = true;
        }
    }
    if touched && let Err(e) = state.save_to(state_file) {
        log::warn!("Could not save state: {e:#}");
    }
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

fn print_summary(summary: &ExecuteSummary) {
    let changes = &summary.changes;
    println!();
    println!("  {} Converged {} backend(s)", "✓".green().bold(), summary.applied.len());

    if changes.added > 0 {
        println!("    • {} added", changes.added);
    }
    if changes.removed > 0 {
        println!("    • {} removed", changes.removed);
    }
    if changes.modified > 0 {
        println!("    • {} modified", changes.modified);
    }
    if changes.index_refreshed {
        println!("    • package index refreshed");
    }
    if !summary.unavailable.is_empty() {
        println!("    • skipped: {}", summary.unavailable.join(", ").dimmed());
    }
}
