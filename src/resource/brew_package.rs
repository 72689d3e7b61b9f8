//! Homebrew formulae and casks

use anyhow::Result;
use declarative::{Backend, FieldMatcher, Matcher, Record, Refresh, Spec, batch_by_flags};

use super::{Resource, flag_field, identity_value};
use crate::config::PackageSection;
use crate::runner::{Cmd, Runner};

/// Formulae and casks managed with `brew`
///
/// Entries are `name` or `{ name, cask = true }`. Homebrew refuses to run
/// as root, so the section's `sudo` option is ignored.
pub struct Brew<R> {
    runner: R,
    matcher: FieldMatcher,
    refresh_index: bool,
}

impl<R: Runner> Brew<R> {
    pub fn new(runner: R, section: &PackageSection) -> Self {
        if section.sudo == Some(true) {
            log::warn!("brew: `sudo = true` ignored, Homebrew does not run as root");
        }
        Self {
            runner,
            matcher: FieldMatcher::by_name(),
            refresh_index: section.refresh_index,
        }
    }

    fn list(&self, kind: &str) -> Result<Vec<Spec>> {
        let output = self
            .runner
            .run(&Cmd::new("brew").args(["list", "--versions", kind]))?;
        Ok(parse_versions(&output.stdout, kind == "--cask"))
    }
}

/// Parse `brew list --versions` (`name v1 [v2 ...]`), keeping the newest
fn parse_versions(output: &str, cask: bool) -> Vec<Spec> {
    output
        .lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let name = cols.next()?;
            let mut record = Record::new().with("name", name);
            if let Some(version) = cols.last() {
                record.insert("version", version);
            }
            if cask {
                record.insert("cask", true);
            }
            Some(Spec::from(record))
        })
        .collect()
}

fn kind_flag(spec: &Spec) -> Vec<String> {
    if flag_field(spec, "name", "cask") {
        vec!["--cask".to_string()]
    } else {
        vec!["--formula".to_string()]
    }
}

impl<R: Runner> Brew<R> {
    fn run_batched(&self, verb: &str, specs: &[Spec]) -> Result<()> {
        for batch in batch_by_flags(specs, kind_flag) {
            let names = batch
                .specs
                .iter()
                .map(|s| identity_value(s, "name"))
                .collect::<Result<Vec<_>>>()?;
            let cmd = Cmd::new("brew").arg(verb).args(batch.flags).args(names);
            self.runner.run(&cmd)?;
        }
        Ok(())
    }
}

impl<R: Runner> Backend for Brew<R> {
    fn name(&self) -> &str {
        "brew"
    }

    fn matcher(&self) -> &dyn Matcher {
        &self.matcher
    }

    fn refresh(&mut self, _desired: &[Spec]) -> Result<Refresh> {
        if !self.runner.exists("brew") {
            return Ok(Refresh::Unavailable {
                reason: "brew not found".to_string(),
            });
        }
        let mut observed = self.list("--formula")?;
        observed.extend(self.list("--cask")?);
        Ok(Refresh::Available(observed))
    }

    fn has_index(&self) -> bool {
        self.refresh_index
    }

    fn refresh_index(&mut self) -> Result<()> {
        self.runner.run(&Cmd::new("brew").arg("update"))?;
        Ok(())
    }

    fn add(&mut self, specs: &[Spec]) -> Result<()> {
        self.run_batched("install", specs)
    }

    fn remove(&mut self, specs: &[Spec]) -> Result<()> {
        self.run_batched("uninstall", specs)
    }
}

impl<R: Runner> Resource for Brew<R> {}
