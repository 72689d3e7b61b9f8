//! apt packages (Debian, Ubuntu)

use anyhow::Result;
use declarative::{
    Backend, FieldMatcher, Matcher, ModifyStrategy, Record, Refresh, Spec, batch_by_flags,
};

use super::{Resource, identity_value, text_field};
use crate::config::PackageSection;
use crate::runner::{Cmd, Env, Runner};

/// `Package<TAB>Version<TAB>Status` per installed package
const QUERY_FORMAT: &str = "${Package}\t${Version}\t${db:Status-Abbrev}\n";

/// Packages installed through apt-get
///
/// Entries are `name` or `{ name, version, recommends }`. A pinned version
/// installs as `name=version`; `recommends = false` adds
/// `--no-install-recommends`. A version change reinstalls over the old
/// version, never through `apt-get remove`, which would take reverse
/// dependencies with it.
pub struct Apt<R> {
    runner: R,
    matcher: FieldMatcher,
    sudo: bool,
    refresh_index: bool,
    env: Env,
}

impl<R: Runner> Apt<R> {
    pub fn new(runner: R, section: &PackageSection) -> Self {
        Self {
            runner,
            matcher: FieldMatcher::by_name(),
            sudo: section.sudo.unwrap_or(true),
            refresh_index: section.refresh_index,
            env: Env::new().with("DEBIAN_FRONTEND", "noninteractive"),
        }
    }

    fn apt_get<I, S>(&self, args: I) -> Cmd
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Cmd::new("apt-get")
            .args(args)
            .env(&self.env)
            .sudo_if(self.sudo)
    }

    /// `apt-get install -y`, one run per distinct set of flags
    fn install(&self, specs: &[Spec], extra: &[&str]) -> Result<()> {
        for batch in batch_by_flags(specs, install_flags) {
            let tokens = batch
                .specs
                .iter()
                .map(|s| install_token(s))
                .collect::<Result<Vec<_>>>()?;
            let cmd = self.apt_get(
                ["install", "-y"]
                    .iter()
                    .chain(extra)
                    .map(ToString::to_string)
                    .chain(batch.flags)
                    .chain(tokens),
            );
            self.runner.run(&cmd)?;
        }
        Ok(())
    }
}

fn query_cmd() -> Cmd {
    Cmd::new("dpkg-query").args(["-W", "-f", QUERY_FORMAT])
}

/// Parse dpkg-query output, keeping only fully installed packages
fn parse_installed(output: &str) -> Vec<Spec> {
    output
        .lines()
        .filter_map(|line| {
            let mut cols = line.split('\t');
            let (name, version, status) = (cols.next()?, cols.next()?, cols.next()?);
            // ii: selected for install and installed
            status.starts_with("ii").then(|| {
                Spec::from(Record::new().with("name", name).with("version", version))
            })
        })
        .collect()
}

fn install_token(spec: &Spec) -> Result<String> {
    let name = identity_value(spec, "name")?;
    Ok(match text_field(spec, "name", "version") {
        Some(version) => format!("{name}={version}"),
        None => name,
    })
}

fn install_flags(spec: &Spec) -> Vec<String> {
    match spec.field("name", "recommends").and_then(|v| v.as_bool()) {
        Some(false) => vec!["--no-install-recommends".to_string()],
        _ => Vec::new(),
    }
}

impl<R: Runner> Backend for Apt<R> {
    fn name(&self) -> &str {
        "apt"
    }

    fn matcher(&self) -> &dyn Matcher {
        &self.matcher
    }

    fn refresh(&mut self, _desired: &[Spec]) -> Result<Refresh> {
        if !self.runner.exists("dpkg-query") {
            return Ok(Refresh::Unavailable {
                reason: "dpkg-query not found".to_string(),
            });
        }
        let output = self.runner.run(&query_cmd())?;
        Ok(Refresh::Available(parse_installed(&output.stdout)))
    }

    fn has_index(&self) -> bool {
        self.refresh_index
    }

    fn refresh_index(&mut self) -> Result<()> {
        self.runner.run(&self.apt_get(["update"]))?;
        Ok(())
    }

    fn add(&mut self, specs: &[Spec]) -> Result<()> {
        self.install(specs, &[])
    }

    fn remove(&mut self, specs: &[Spec]) -> Result<()> {
        let names = specs
            .iter()
            .map(|s| identity_value(s, "name"))
            .collect::<Result<Vec<_>>>()?;
        let cmd = self.apt_get(["remove".to_string(), "-y".to_string()].into_iter().chain(names));
        self.runner.run(&cmd)?;
        Ok(())
    }

    fn modify_strategy(&self) -> ModifyStrategy {
        ModifyStrategy::InPlace
    }

    fn modify(&mut self, new: &[Spec], _old: &[Spec]) -> Result<()> {
        self.install(new, &["--allow-downgrades"])
    }
}

impl<R: Runner> Resource for Apt<R> {}
