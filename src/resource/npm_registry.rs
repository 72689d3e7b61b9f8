//! npm registry settings
//!
//! One entity per scope: `default` is the plain `registry` key, `@corp`
//! is `@corp:registry`.

use anyhow::{Context, Result};
use declarative::{
    Backend, FieldMatcher, IdentityFields, Matcher, MissingField, ModifyStrategy, Record, Refresh,
    Spec,
};

use super::{Resource, identity_value};
use crate::runner::{Cmd, Runner};

/// Scope name of the unscoped registry
pub const DEFAULT_SCOPE: &str = "default";

pub struct NpmRegistry<R> {
    runner: R,
    matcher: FieldMatcher,
}

impl<R: Runner> NpmRegistry<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            matcher: FieldMatcher::new(IdentityFields::single("scope"), MissingField::Strict),
        }
    }

    fn set(&self, spec: &Spec) -> Result<()> {
        let scope = identity_value(spec, "scope")?;
        let url = spec
            .field("scope", "url")
            .with_context(|| format!("npm registry '{scope}' has no url"))?;
        let cmd = Cmd::new("npm")
            .args(["config", "set"])
            .arg(config_key(&scope))
            .arg(url.to_string());
        self.runner.run(&cmd)?;
        Ok(())
    }
}

/// npm config key for a scope
fn config_key(scope: &str) -> String {
    if scope == DEFAULT_SCOPE {
        "registry".to_string()
    } else {
        format!("{scope}:registry")
    }
}

/// Extract registry settings from `npm config list --json`
fn parse_config(json: &str) -> Result<Vec<Spec>> {
    let config: serde_json::Value =
        serde_json::from_str(json).context("Invalid JSON from npm config list")?;
    let Some(entries) = config.as_object() else {
        return Ok(Vec::new());
    };

    Ok(entries
        .iter()
        .filter_map(|(key, value)| {
            let scope = if key == "registry" {
                DEFAULT_SCOPE
            } else {
                key.strip_suffix(":registry")
                    .filter(|scope| scope.starts_with('@'))?
            };
            let url = value.as_str()?;
            Some(Spec::from(Record::new().with("scope", scope).with("url", url)))
        })
        .collect())
}

impl<R: Runner> Backend for NpmRegistry<R> {
    fn name(&self) -> &str {
        "npm"
    }

    fn matcher(&self) -> &dyn Matcher {
        &self.matcher
    }

    fn refresh(&mut self, _desired: &[Spec]) -> Result<Refresh> {
        if !self.runner.exists("npm") {
            return Ok(Refresh::Unavailable {
                reason: "npm not found".to_string(),
            });
        }
        let output = self
            .runner
            .run(&Cmd::new("npm").args(["config", "list", "--json"]))?;
        Ok(Refresh::Available(parse_config(&output.stdout)?))
    }

    fn add(&mut self, specs: &[Spec]) -> Result<()> {
        specs.iter().try_for_each(|spec| self.set(spec))
    }

    fn remove(&mut self, specs: &[Spec]) -> Result<()> {
        for spec in specs {
            let scope = identity_value(spec, "scope")?;
            self.runner
                .run(&Cmd::new("npm").args(["config", "delete"]).arg(config_key(&scope)))?;
        }
        Ok(())
    }

    fn modify_strategy(&self) -> ModifyStrategy {
        ModifyStrategy::InPlace
    }

    fn modify(&mut self, new: &[Spec], _old: &[Spec]) -> Result<()> {
        self.add(new)
    }
}

impl<R: Runner> Resource for NpmRegistry<R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fake::FakeRunner;
    use declarative::{ApplyOptions, DiffOptions, NoProgress, Plan, apply, plan};

    const CONFIG: &str = r#"{
  "registry": "https://registry.npmjs.org/",
  "@corp:registry": "https://npm.corp.example/",
  "save-exact": true,
  "cache": "/home/me/.npm"
}"#;

    fn registry(scope: &str, url: &str) -> Spec {
        Spec::from(Record::new().with("scope", scope).with("url", url))
    }

    #[test]
    fn test_parse_config() {
        let specs = parse_config(CONFIG).unwrap();
        assert_eq!(
            specs,
            vec![
                registry("@corp", "https://npm.corp.example/"),
                registry("default", "https://registry.npmjs.org/"),
            ]
        );
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(parse_config("npm ERR!").is_err());
    }

    #[test]
    fn test_url_change_is_set_in_place() {
        let runner = FakeRunner::new().respond("npm config list --json", CONFIG);
        let mut backend = NpmRegistry::new(runner);
        let desired = vec![
            registry("default", "https://registry.npmjs.org/"),
            registry("@corp", "https://npm.corp.example/v2/"),
            registry("@oss", "https://npm.oss.example/"),
        ];

        let Plan::Ready(diff) = plan(&mut backend, &desired, &[], &DiffOptions::default()).unwrap()
        else {
            panic!("npm should be available");
        };
        apply(&diff, &mut backend, &ApplyOptions::default(), &mut NoProgress).unwrap();

        assert_eq!(
            backend.runner.mutations(&["npm config list --json"]),
            vec![
                "npm config set @oss:registry https://npm.oss.example/",
                "npm config set @corp:registry https://npm.corp.example/v2/",
            ]
        );
    }

    #[test]
    fn test_remove_default_registry() {
        let mut backend = NpmRegistry::new(FakeRunner::new());
        backend
            .remove(&[registry("default", "https://registry.npmjs.org/")])
            .unwrap();
        assert_eq!(backend.runner.calls(), vec!["npm config delete registry"]);
    }
}
