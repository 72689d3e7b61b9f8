use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use declarative::Mode;
use std::path::PathBuf;

use crate::paths::ENV_CONFIG;

#[derive(Parser)]
#[command(name = "converge")]
#[command(version)]
#[command(about = "Converge packages, aliases, npm registries and ssh config to a declared state", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/converge/converge.toml)
    #[arg(short, long, global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan(PlanArgs),

    /// Make the system match the config
    Apply(ApplyArgs),

    /// Show backend availability and entry counts
    Status,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Override of `settings.mode`
#[derive(Args, Debug, Clone, Copy, Default)]
#[group(multiple = false)]
pub struct ModeArgs {
    /// Only touch entries named in the config
    #[arg(long)]
    pub stateless: bool,

    /// Also remove entries dropped from the config since the last apply
    #[arg(long)]
    pub stateful: bool,
}

impl ModeArgs {
    pub fn mode(self) -> Option<Mode> {
        match (self.stateless, self.stateful) {
            (true, _) => Some(Mode::Stateless),
            (_, true) => Some(Mode::Stateful),
            _ => None,
        }
    }
}

#[derive(Args)]
pub struct PlanArgs {
    /// Only plan one backend: apt, snap, brew, npm, aliases or ssh
    pub target: Option<String>,

    #[command(flatten)]
    pub mode: ModeArgs,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Only apply one backend: apt, snap, brew, npm, aliases or ssh
    pub target: Option<String>,

    /// Show the plan without changing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Don't ask for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Skip `apt-get update` / `brew update`
    #[arg(long)]
    pub no_refresh_index: bool,

    #[command(flatten)]
    pub mode: ModeArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from([
            "converge", "-vv", "apply", "ssh", "--dry-run", "--yes", "--stateful",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Command::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(args.target.as_deref(), Some("ssh"));
        assert!(args.dry_run && args.yes && !args.no_refresh_index);
        assert_eq!(args.mode.mode(), Some(Mode::Stateful));
    }

    #[test]
    fn test_mode_flags_conflict() {
        assert!(Cli::try_parse_from(["converge", "plan", "--stateless", "--stateful"]).is_err());
    }

    #[test]
    fn test_plan_defaults_to_configured_mode() {
        let cli = Cli::try_parse_from(["converge", "plan", "--config", "/tmp/c.toml"]).unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        let Command::Plan(args) = cli.command else {
            panic!("expected plan");
        };
        assert_eq!(args.target, None);
        assert_eq!(args.mode.mode(), None);
    }
}
