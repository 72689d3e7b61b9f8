//! Plan display

use colored::Colorize;
use declarative::{Diff, Matcher, Plan, Spec};
use similar::TextDiff;

use super::executor::PlannedBackend;
use crate::resource::TextPreview;

/// Kind of one planned change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Remove,
    Modify,
}

/// One line of a rendered plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeLine {
    pub kind: ChangeKind,
    pub id: String,
    pub detail: String,
}

/// Fields of `to` that differ from `from`, as `key: old → new`
fn field_changes(from: &Spec, to: &Spec) -> String {
    let (Spec::Structured(old), Spec::Structured(new)) = (from, to) else {
        return format!("{from} → {to}");
    };

    let mut changes: Vec<String> = new
        .iter()
        .filter(|(key, value)| old.get(key) != Some(*value))
        .map(|(key, value)| match old.get(key) {
            Some(before) => format!("{key}: {before} → {value}"),
            None => format!("{key}: (unset) → {value}"),
        })
        .collect();
    changes.extend(
        old.iter()
            .filter(|(key, _)| new.get(key).is_none())
            .map(|(key, value)| format!("{key}: {value} → (unset)")),
    );

    if changes.is_empty() {
        format!("{from} → {to}")
    } else {
        changes.join(", ")
    }
}

/// Describe a diff line by line, in apply order
pub fn describe(diff: &Diff, matcher: &dyn Matcher) -> Vec<ChangeLine> {
    let removals = diff.to_remove.iter().map(|spec| ChangeLine {
        kind: ChangeKind::Remove,
        id: matcher.identity_of(spec),
        detail: "(will remove)".to_string(),
    });
    let additions = diff.to_add.iter().map(|spec| ChangeLine {
        kind: ChangeKind::Add,
        id: matcher.identity_of(spec),
        detail: match spec {
            Spec::Primitive(_) => String::new(),
            Spec::Structured(_) => spec.to_string(),
        },
    });
    let modifications = diff.to_modify.iter().map(|change| ChangeLine {
        kind: ChangeKind::Modify,
        id: matcher.identity_of(&change.to),
        detail: field_changes(&change.from, &change.to),
    });

    removals.chain(additions).chain(modifications).collect()
}

/// Unified diff between the before and after text of a file
pub fn text_diff(preview: &TextPreview) -> String {
    let path = preview.path.display().to_string();
    TextDiff::from_lines(&preview.before, &preview.after)
        .unified_diff()
        .context_radius(2)
        .header(&path, &path)
        .to_string()
}

fn print_text_diff(preview: &TextPreview) {
    for line in text_diff(preview).lines() {
        let styled = if line.starts_with("+++") || line.starts_with("---") {
            line.bold().to_string()
        } else if line.starts_with('+') {
            line.green().to_string()
        } else if line.starts_with('-') {
            line.red().to_string()
        } else if line.starts_with("@@") {
            line.cyan().to_string()
        } else {
            line.dimmed().to_string()
        };
        println!("│     {styled}");
    }
}

/// Print every backend's plan
pub fn display_plans(planned: &[PlannedBackend], show_text: bool) {
    let total: usize = planned
        .iter()
        .filter_map(|p| p.plan.diff())
        .map(Diff::total_changes)
        .sum();

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Convergence Plan".bold()
    );
    println!("│");

    for backend in planned {
        let name = backend.managed.name();
        match &backend.plan {
            Plan::Unavailable { reason } => {
                println!("│ {} {}", name.bold(), format!("(skipped: {reason})").dimmed());
            }
            Plan::Ready(diff) if diff.is_empty() => {
                println!(
                    "│ {} {}",
                    name.bold(),
                    format!("({} unchanged)", diff.unchanged.len()).dimmed()
                );
            }
            Plan::Ready(diff) => {
                println!("│ {}", name.bold());
                for line in describe(diff, backend.managed.resource.matcher()) {
                    let symbol = match line.kind {
                        ChangeKind::Add => "+".green(),
                        ChangeKind::Remove => "-".red(),
                        ChangeKind::Modify => "~".yellow(),
                    };
                    println!("│   {} {:<30} {}", symbol, line.id, line.detail.dimmed());
                }
                for spec in &diff.dropped {
                    println!(
                        "│   {} {:<30} {}",
                        "!".yellow(),
                        spec.to_string(),
                        "(duplicate, ignored)".dimmed()
                    );
                }
                if show_text && let Some(preview) = &backend.preview {
                    println!("│");
                    print_text_diff(preview);
                }
            }
        }
        println!("│");
    }

    println!("├─────────────────────────────────────────────────────┤");
    if total == 0 {
        println!("│ {} No changes needed", "✓".green());
    } else {
        println!(
            "│ Summary: {} to apply across {} backend(s)",
            total.to_string().bold(),
            planned.iter().filter(|p| p.plan.has_changes()).count()
        );
    }
    println!("└─────────────────────────────────────────────────────┘");
}
