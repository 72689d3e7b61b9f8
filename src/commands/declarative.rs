//! Declarative commands
//!
//! - `plan` - Show what apply would change
//! - `apply` - Make the system match the config
//! - `status` - Backend availability and entry counts

use anyhow::Result;
use declarative::{Mode, Plan, plan as plan_backend};
use std::path::PathBuf;

use crate::Context;
use crate::config::Config;
use crate::engine::{self, ExecuteOptions};
use crate::progress::StepProgress;
use crate::resource::{self, Managed};
use crate::state::ConvergeState;
use crate::ui;

/// Options for `converge apply`
#[derive(Debug, Clone, Default)]
pub struct ApplyRequest {
    pub target: Option<String>,
    pub mode: Option<Mode>,
    pub dry_run: bool,
    pub yes: bool,
    pub no_refresh_index: bool,
}

fn load(ctx: &Context, target: Option<&str>) -> Result<(Config, Vec<Managed>)> {
    let (config, path) = Config::load(ctx.config.as_deref())?;
    log::info!("Using config {}", path.display());
    let managed = resource::filter(resource::build(&config)?, target)?;
    Ok((config, managed))
}

pub fn plan(ctx: &Context, target: Option<&str>, mode: Option<Mode>) -> Result<()> {
    ui::header("Convergence Plan");

    let (config, managed) = load(ctx, target)?;
    let state = ConvergeState::load()?;
    let opts = config.settings.diff_options(mode);

    let planned = engine::plan_all(managed, &state, &opts)?;
    if planned.is_empty() {
        ui::info("Nothing configured");
        return Ok(());
    }
    engine::display_plans(&planned, true);
    Ok(())
}

pub fn apply(ctx: &Context, request: &ApplyRequest) -> Result<()> {
    ui::header("Applying Configuration");

    if request.dry_run {
        ui::warn("Dry run - no changes will be made");
    }

    let (config, managed) = load(ctx, request.target.as_deref())?;
    let state_file = ConvergeState::state_file()?;
    let mut state = ConvergeState::load_from(&state_file)?;
    let opts = config.settings.diff_options(request.mode);

    let planned = engine::plan_all(managed, &state, &opts)?;
    if planned.is_empty() {
        ui::info("Nothing configured");
        return Ok(());
    }

    let exec = ExecuteOptions {
        dry_run: request.dry_run,
        yes: request.yes,
        no_refresh_index: request.no_refresh_index,
        show_text: ctx.verbose > 0,
    };
    let mut progress = StepProgress::new(ctx.quiet);
    let summary = engine::execute(planned, &mut state, &state_file, &exec, &mut progress)?;

    if !summary.aborted && !request.dry_run {
        println!();
        ui::success("Apply complete!");
    }
    Ok(())
}

pub fn status(ctx: &Context) -> Result<()> {
    ui::header("Converge Status");

    let (config, managed) = load(ctx, None)?;
    let state_file = ConvergeState::state_file()?;
    let state = ConvergeState::load_from(&state_file)?;
    let opts = config.settings.diff_options(None);

    ui::kv("Mode", mode_name(opts.mode));
    ui::kv("State", &display_path(state_file));
    println!();

    for mut backend in managed {
        let name = backend.name().to_string();
        let previous = state.managed(&name);
        if backend.desired.is_empty() && previous.is_empty() {
            ui::dim(&format!("{name}: not configured"));
            continue;
        }

        let desired = ui::count(backend.desired.len(), "entry", "entries");
        match plan_backend(backend.resource.as_mut(), &backend.desired, previous, &opts)? {
            Plan::Unavailable { reason } => ui::warn(&format!("{name}: unavailable ({reason})")),
            Plan::Ready(diff) if diff.is_empty() => {
                ui::success(&format!("{name}: {desired}, in sync"));
            }
            Plan::Ready(diff) => ui::info(&format!(
                "{name}: {desired}, {} pending",
                ui::count(diff.total_changes(), "change", "changes")
            )),
        }
    }

    if let Some(updated) = state.last_updated {
        println!();
        ui::kv("Last applied", &updated.format("%Y-%m-%d %H:%M:%S UTC").to_string());
    }
    Ok(())
}

fn mode_name(mode: Mode) -> &'static str {
    match mode {
        Mode::Stateful => "stateful",
        Mode::Stateless => "stateless",
    }
}

fn display_path(path: PathBuf) -> String {
    match dirs::home_dir() {
        Some(home) => match path.strip_prefix(&home) {
            Ok(rest) => format!("~/{}", rest.display()),
            Err(_) => path.display().to_string(),
        },
        None => path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_name() {
        assert_eq!(mode_name(Mode::Stateful), "stateful");
        assert_eq!(mode_name(Mode::default()), "stateless");
    }

    #[test]
    fn test_display_path_outside_home() {
        assert_eq!(display_path(PathBuf::from("/etc/converge/state.toml")), "/etc/converge/state.toml");
    }

    #[test]
    fn test_display_path_abbreviates_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(
            display_path(home.join(".local/state/converge/state.toml")),
            "~/.local/state/converge/state.toml"
        );
    }
}
