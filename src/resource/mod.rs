//! Concrete backends and the registry that builds them from config
//!
//! Every backend implements [`declarative::Backend`]. File-backed ones
//! additionally render a before/after text preview through [`Resource`].

use anyhow::{Result, bail};
use declarative::{Backend, Diff, Spec, Value};
use std::path::PathBuf;

use crate::config::Config;
use crate::runner::SystemRunner;

pub mod alias;
pub mod apt;
pub mod brew_package;
pub mod npm_registry;
pub mod snap;
pub mod ssh_config;

pub use alias::Aliases;
pub use apt::Apt;
pub use brew_package::Brew;
pub use npm_registry::NpmRegistry;
pub use snap::Snap;
pub use ssh_config::SshConfig;

/// Contents of a managed file before and after a diff is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPreview {
    pub path: PathBuf,
    pub before: String,
    pub after: String,
}

/// A backend as converge drives it
pub trait Resource: Backend {
    /// Render the file this backend would write for `diff`
    ///
    /// Only file-backed resources have one.
    fn preview(&self, _diff: &Diff) -> Result<Option<TextPreview>> {
        Ok(None)
    }
}

/// A resource paired with its desired list
pub struct Managed {
    pub resource: Box<dyn Resource>,
    pub desired: Vec<Spec>,
}

impl Managed {
    pub fn new(resource: impl Resource + 'static, desired: Vec<Spec>) -> Self {
        Self {
            resource: Box::new(resource),
            desired,
        }
    }

    pub fn name(&self) -> &str {
        self.resource.name()
    }
}

/// Backend names in apply order
pub const ORDER: [&str; 6] = ["apt", "snap", "brew", "npm", "aliases", "ssh"];

/// Build every backend from the config, in apply order
pub fn build(config: &Config) -> Result<Vec<Managed>> {
    let runner = SystemRunner;
    Ok(vec![
        Managed::new(Apt::new(runner, &config.apt), config.apt.packages.clone()),
        Managed::new(Snap::new(runner, &config.snap), config.snap.packages.clone()),
        Managed::new(Brew::new(runner, &config.brew), config.brew.packages.clone()),
        Managed::new(NpmRegistry::new(runner), config.npm.specs()),
        Managed::new(Aliases::new(config.aliases.path()?), config.aliases.specs()),
        Managed::new(SshConfig::new(config.ssh.path()?), config.ssh.hosts.clone()),
    ])
}

/// Keep only backends whose name matches `target`
pub fn filter(managed: Vec<Managed>, target: Option<&str>) -> Result<Vec<Managed>> {
    let Some(target) = target else {
        return Ok(managed);
    };
    if !ORDER.contains(&target) {
        bail!("Unknown target '{target}' (expected one of: {})", ORDER.join(", "));
    }
    Ok(managed.into_iter().filter(|m| m.name() == target).collect())
}

/// A field rendered as text, if present
pub(crate) fn text_field(spec: &Spec, identity: &str, key: &str) -> Option<String> {
    spec.field(identity, key).map(|v| match v {
        Value::Text(s) => s,
        other => other.to_string(),
    })
}

/// The identity value of a spec, or an error naming the missing field
pub(crate) fn identity_value(spec: &Spec, identity: &str) -> Result<String> {
    match text_field(spec, identity, identity) {
        Some(value) => Ok(value),
        None => bail!("Entry {spec} has no '{identity}' field"),
    }
}

/// Whether a boolean field is set to true
pub(crate) fn flag_field(spec: &Spec, identity: &str, key: &str) -> bool {
    spec.field(identity, key).and_then(|v| v.as_bool()) == Some(true)
}
