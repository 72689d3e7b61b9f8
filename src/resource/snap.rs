//! snap packages

use anyhow::Result;
use declarative::{
    Backend, FieldMatcher, IdentityFields, Matcher, MissingField, ModifyStrategy, Record,
    Refresh, Spec, batch_by_flags,
};

use super::{Resource, flag_field, identity_value, text_field};
use crate::config::PackageSection;
use crate::runner::{Cmd, Runner};

/// Snaps installed through `snap install`
///
/// Entries are `name` or `{ name, channel, classic }`. Channels are compared
/// without the `latest/` track prefix, so `stable` matches `latest/stable`.
/// A channel switch is a `snap refresh` of the installed snap.
pub struct Snap<R> {
    runner: R,
    matcher: FieldMatcher,
    sudo: bool,
}

impl<R: Runner> Snap<R> {
    pub fn new(runner: R, section: &PackageSection) -> Self {
        Self {
            runner,
            matcher: FieldMatcher::new(
                IdentityFields::single("name"),
                MissingField::WildcardFields(vec!["channel".to_string(), "classic".to_string()]),
            ),
            sudo: section.sudo.unwrap_or(true),
        }
    }

    fn snap<I, S>(&self, args: I) -> Cmd
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Cmd::new("snap").args(args).sudo_if(self.sudo)
    }

    /// Run `snap <verb> names... flags...`, one run per distinct set of flags
    fn each_batch(&self, verb: &str, specs: &[Spec]) -> Result<()> {
        for batch in batch_by_flags(specs, install_flags) {
            let names = batch
                .specs
                .iter()
                .map(|s| identity_value(s, "name"))
                .collect::<Result<Vec<_>>>()?;
            let cmd = self.snap(
                std::iter::once(verb.to_string())
                    .chain(names)
                    .chain(batch.flags),
            );
            self.runner.run(&cmd)?;
        }
        Ok(())
    }
}

/// Parse `snap list`
///
/// ```text
/// Name    Version   Rev    Tracking         Publisher   Notes
/// code    1.85.1    150    latest/stable    vscode**    classic
/// ```
fn parse_list(output: &str) -> Vec<Spec> {
    output
        .lines()
        .skip_while(|line| !line.starts_with("Name"))
        .skip(1)
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            let name = *cols.first()?;
            let mut record = Record::new().with("name", name);
            if let Some(&tracking) = cols.get(3).filter(|t| **t != "-") {
                let channel = tracking.strip_prefix("latest/").unwrap_or(tracking);
                record.insert("channel", channel);
            }
            let classic = cols
                .get(5)
                .is_some_and(|notes| notes.split(',').any(|n| n == "classic"));
            record.insert("classic", classic);
            Some(Spec::from(record))
        })
        .collect()
}

fn install_flags(spec: &Spec) -> Vec<String> {
    let mut flags = Vec::new();
    if let Some(channel) = text_field(spec, "name", "channel") {
        flags.push(format!("--channel={channel}"));
    }
    if flag_field(spec, "name", "classic") {
        flags.push("--classic".to_string());
    }
    flags
}

impl<R: Runner> Backend for Snap<R> {
    fn name(&self) -> &str {
        "snap"
    }

    fn matcher(&self) -> &dyn Matcher {
        &self.matcher
    }

    fn refresh(&mut self, _desired: &[Spec]) -> Result<Refresh> {
        if !self.runner.exists("snap") {
            return Ok(Refresh::Unavailable {
                reason: "snap not found".to_string(),
            });
        }
        let output = self.runner.run(&Cmd::new("snap").arg("list"))?;
        Ok(Refresh::Available(parse_list(&output.stdout)))
    }

    fn add(&mut self, specs: &[Spec]) -> Result<()> {
        self.each_batch("install", specs)
    }

    fn remove(&mut self, specs: &[Spec]) -> Result<()> {
        let names = specs
            .iter()
            .map(|s| identity_value(s, "name"))
            .collect::<Result<Vec<_>>>()?;
        self.runner
            .run(&self.snap(std::iter::once("remove".to_string()).chain(names)))?;
        Ok(())
    }

    fn modify_strategy(&self) -> ModifyStrategy {
        ModifyStrategy::InPlace
    }

    fn modify(&mut self, new: &[Spec], _old: &[Spec]) -> Result<()> {
        self.each_batch("refresh", new)
    }
}

impl<R: Runner> Resource for Snap<R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fake::FakeRunner;
    use declarative::{ApplyOptions, DiffOptions, NoProgress, Plan, Value, apply, plan};

    const LIST: &str = "\
Name    Version   Rev    Tracking         Publisher   Notes
code    1.85.1    150    latest/stable    vscode**    classic
core22  20240111  1122   latest/stable    canonical** base
lxd     5.21.1    28463  5.21/stable      canonical** -
";

    fn backend() -> Snap<FakeRunner> {
        let section = PackageSection {
            sudo: Some(false),
            ..Default::default()
        };
        Snap::new(FakeRunner::new().respond("snap list", LIST), &section)
    }

    #[test]
    fn test_parse_list() {
        let specs = parse_list(LIST);

        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].field("name", "channel"), Some(Value::from("stable")));
        assert_eq!(specs[0].field("name", "classic"), Some(Value::Bool(true)));
        assert_eq!(specs[1].field("name", "classic"), Some(Value::Bool(false)));
        assert_eq!(specs[2].field("name", "channel"), Some(Value::from("5.21/stable")));
    }

    #[test]
    fn test_parse_empty_list() {
        assert!(parse_list("No snaps are installed yet.\n").is_empty());
    }

    #[test]
    fn test_channel_and_classic_are_dont_care_when_unset() {
        let mut backend = backend();
        let desired = vec![
            Spec::from("code"),
            Spec::from(Record::new().with("name", "lxd").with("channel", "5.21/stable")),
        ];

        let plan = plan(&mut backend, &desired, &[], &DiffOptions::default()).unwrap();
        assert!(!plan.has_changes());
    }

    #[test]
    fn test_channel_switch_is_modify() {
        let mut backend = backend();
        let desired = vec![Spec::from(
            Record::new().with("name", "lxd").with("channel", "edge"),
        )];

        let Plan::Ready(diff) = plan(&mut backend, &desired, &[], &DiffOptions::default()).unwrap()
        else {
            panic!("snap should be available");
        };
        assert_eq!(diff.to_modify.len(), 1);

        apply(&diff, &mut backend, &ApplyOptions::default(), &mut NoProgress).unwrap();
        assert_eq!(
            backend.runner.mutations(&["snap list"]),
            vec!["snap refresh lxd --channel=edge"]
        );
    }

    #[test]
    fn test_mixed_flags_install_one_by_one() {
        let mut backend = backend();
        let classic = Spec::from(Record::new().with("name", "code").with("classic", true));

        backend.add(&[Spec::from("jq"), classic]).unwrap();

        assert_eq!(
            backend.runner.calls(),
            vec!["snap install jq", "snap install code --classic"]
        );
    }

    #[test]
    fn test_same_flags_install_together() {
        let mut backend = backend();
        backend.add(&[Spec::from("jq"), Spec::from("yq")]).unwrap();
        backend.remove(&[Spec::from("lxd"), Spec::from("core22")]).unwrap();

        assert_eq!(
            backend.runner.calls(),
            vec!["snap install jq yq", "snap remove lxd core22"]
        );
    }
}
