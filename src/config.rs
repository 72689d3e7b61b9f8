//! converge.toml - the desired state
//!
//! ```toml
//! [settings]
//! mode = "stateful"
//!
//! [apt]
//! packages = ["curl", { name = "htop", version = "3.0.5-7" }]
//!
//! [snap]
//! packages = [{ name = "code", classic = true }]
//!
//! [aliases]
//! file = "~/.bash_aliases"
//! [aliases.define]
//! ll = "ls -alF"
//!
//! [npm.registries]
//! default = "https://registry.npmjs.org/"
//! "@corp" = "https://npm.corp.example/"
//!
//! [[ssh.hosts]]
//! Host = "github.com"
//! User = "git"
//! AddKeysToAgent = true
//! ```

use anyhow::{Context, Result};
use declarative::{DiffOptions, DuplicatePolicy, Mode, Record, Spec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

/// Top-level config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub settings: Settings,
    pub apt: PackageSection,
    pub snap: PackageSection,
    pub brew: PackageSection,
    pub aliases: AliasSection,
    pub npm: NpmSection,
    pub ssh: SshSection,
}

/// Diff behaviour shared by every backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mode: Mode,
    pub duplicates: DuplicatePolicy,
}

impl Settings {
    pub fn diff_options(&self, mode_override: Option<Mode>) -> DiffOptions {
        DiffOptions {
            mode: mode_override.unwrap_or(self.mode),
            duplicates: self.duplicates,
        }
    }
}

/// `[apt]`, `[snap]`, `[brew]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageSection {
    pub packages: Vec<Spec>,
    /// Run the package manager through sudo (apt and snap default to yes)
    pub sudo: Option<bool>,
    /// Refresh the package index before installing
    pub refresh_index: bool,
}

impl Default for PackageSection {
    fn default() -> Self {
        Self {
            packages: Vec::new(),
            sudo: None,
            refresh_index: true,
        }
    }
}

/// `[aliases]`: alias name to command
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasSection {
    pub file: Option<String>,
    pub define: Record,
}

impl AliasSection {
    pub fn path(&self) -> Result<PathBuf> {
        match &self.file {
            Some(file) => Ok(paths::expand(file)),
            None => Ok(dirs::home_dir()
                .context("Could not determine home directory")?
                .join(".bash_aliases")),
        }
    }

    /// One `{ name, command }` spec per alias, in file order
    pub fn specs(&self) -> Vec<Spec> {
        self.define
            .iter()
            .map(|(name, command)| {
                Spec::from(
                    Record::new()
                        .with("name", name)
                        .with("command", command.to_string()),
                )
            })
            .collect()
    }
}

/// `[npm]`: registry URL per scope (`default` for the unscoped registry)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NpmSection {
    pub registries: Record,
}

impl NpmSection {
    pub fn specs(&self) -> Vec<Spec> {
        self.registries
            .iter()
            .map(|(scope, url)| {
                Spec::from(Record::new().with("scope", scope).with("url", url.to_string()))
            })
            .collect()
    }
}

/// `[ssh]`: Host/Match blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshSection {
    pub file: Option<String>,
    pub hosts: Vec<Spec>,
}

impl SshSection {
    pub fn path(&self) -> Result<PathBuf> {
        match &self.file {
            Some(file) => Ok(paths::expand(file)),
            None => Ok(dirs::home_dir()
                .context("Could not determine home directory")?
                .join(".ssh")
                .join("config")),
        }
    }
}

impl Config {
    /// Resolve the config file: explicit path (from `--config` or
    /// `CONVERGE_CONFIG`), else the default location
    pub fn locate(explicit: Option<&Path>) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(path.to_path_buf()),
            None => paths::config_file(),
        }
    }

    pub fn load(explicit: Option<&Path>) -> Result<(Self, PathBuf)> {
        let path = Self::locate(explicit)?;
        let config = Self::load_from(&path)?;
        Ok((config, path))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::Value;

    const SAMPLE: &str = r#"
[settings]
mode = "stateful"
duplicates = "first-wins"

[apt]
packages = ["curl", { name = "htop", version = "3.0.5-7" }]
refresh_index = false

[snap]
sudo = false
packages = [{ name = "code", classic = true, channel = "stable" }]

[aliases]
file = "/tmp/aliases"
[aliases.define]
ll = "ls -alF"
gs = "git status"

[npm.registries]
default = "https://registry.npmjs.org/"
"@corp" = "https://npm.corp.example/"

[[ssh.hosts]]
Host = "github.com"
User = "git"
AddKeysToAgent = true
Port = 22
"#;

    #[test]
    fn test_parse_sample() {
        let config: Config = toml::from_str(SAMPLE).unwrap();

        assert_eq!(config.settings.mode, Mode::Stateful);
        assert_eq!(config.settings.duplicates, DuplicatePolicy::FirstWins);

        assert_eq!(config.apt.packages.len(), 2);
        assert_eq!(config.apt.packages[0], Spec::from("curl"));
        assert_eq!(
            config.apt.packages[1].field("name", "version"),
            Some(Value::from("3.0.5-7"))
        );
        assert!(!config.apt.refresh_index);
        assert_eq!(config.apt.sudo, None);

        assert_eq!(config.snap.sudo, Some(false));
        assert_eq!(
            config.snap.packages[0].field("name", "classic"),
            Some(Value::Bool(true))
        );

        let host = &config.ssh.hosts[0];
        assert_eq!(host.field("Host", "Port"), Some(Value::Int(22)));
        assert_eq!(host.field("Host", "AddKeysToAgent"), Some(Value::Bool(true)));
    }

    #[test]
    fn test_alias_and_registry_specs_keep_order() {
        let config: Config = toml::from_str(SAMPLE).unwrap();

        let aliases = config.aliases.specs();
        assert_eq!(aliases.len(), 2);
        assert_eq!(aliases[0].field("name", "name"), Some(Value::from("ll")));
        assert_eq!(aliases[1].field("name", "command"), Some(Value::from("git status")));

        let registries = config.npm.specs();
        assert_eq!(registries[0].field("scope", "scope"), Some(Value::from("default")));
        assert_eq!(registries[1].field("scope", "scope"), Some(Value::from("@corp")));
    }

    #[test]
    fn test_ssh_fields_keep_declared_order() {
        let config: Config = toml::from_str(SAMPLE).unwrap();

        let Spec::Structured(host) = &config.ssh.hosts[0] else {
            panic!("expected a table");
        };
        assert_eq!(
            host.keys().collect::<Vec<_>>(),
            vec!["Host", "User", "AddKeysToAgent", "Port"]
        );
    }

    #[test]
    fn test_empty_config_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.settings.mode, Mode::Stateless);
        assert!(config.brew.packages.is_empty());
        assert!(config.brew.refresh_index);
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(toml::from_str::<Config>("[yum]\npackages = []\n").is_err());
    }

    #[test]
    fn test_mode_override() {
        let settings = Settings::default();
        assert_eq!(settings.diff_options(None).mode, Mode::Stateless);
        assert_eq!(settings.diff_options(Some(Mode::Stateful)).mode, Mode::Stateful);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("converge.toml");
        fs::write(&path, SAMPLE).unwrap();

        let (config, loaded) = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded, path);
        assert_eq!(config.aliases.path().unwrap(), PathBuf::from("/tmp/aliases"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("Could not read config file"));
    }
}
