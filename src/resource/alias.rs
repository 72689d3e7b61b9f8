//! Shell aliases kept in a sourced file (`~/.bash_aliases` by default)
//!
//! Only `alias name='command'` lines are managed. Everything else in the
//! file (comments, functions, exports) is left untouched.

use anyhow::{Context, Result};
use declarative::{
    Backend, FieldMatcher, IdentityFields, Matcher, MissingField, ModifyStrategy, Record, Refresh,
    Spec,
};
use std::fs;
use std::path::{Path, PathBuf};

use super::{Resource, TextPreview, identity_value, text_field};

/// The lines of an alias file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct AliasFile {
    lines: Vec<String>,
}

/// Split `alias name=value` into name and raw value
fn parse_line(line: &str) -> Option<(&str, &str)> {
    let rest = line.trim_start().strip_prefix("alias")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let (name, value) = rest.trim_start().split_once('=')?;
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some((name, value.trim_end()))
}

/// Strip shell quoting from an alias value
fn unquote(value: &str) -> String {
    if let Some(inner) = value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
        inner.replace(r"'\''", "'")
    } else if let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        inner.replace(r#"\""#, "\"").replace(r"\\", r"\")
    } else {
        value.to_string()
    }
}

fn render_line(name: &str, command: &str) -> String {
    format!("alias {name}='{}'", command.replace('\'', r"'\''"))
}

impl AliasFile {
    fn parse(content: &str) -> Self {
        Self {
            lines: content.lines().map(str::to_string).collect(),
        }
    }

    fn read(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Self::parse(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, self.render())
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }

    fn entries(&self) -> Vec<Spec> {
        self.lines
            .iter()
            .filter_map(|line| parse_line(line))
            .map(|(name, value)| {
                Spec::from(Record::new().with("name", name).with("command", unquote(value)))
            })
            .collect()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| parse_line(line).is_some_and(|(n, _)| n == name))
    }

    fn append(&mut self, name: &str, command: &str) {
        self.lines.push(render_line(name, command));
    }

    /// Rewrite an alias where it stands, appending it if absent
    fn set(&mut self, name: &str, command: &str) {
        match self.position(name) {
            Some(i) => self.lines[i] = render_line(name, command),
            None => self.append(name, command),
        }
    }

    fn remove(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(i) => {
                self.lines.remove(i);
                true
            }
            None => {
                log::warn!("aliases: no alias '{name}' to remove");
                false
            }
        }
    }
}

fn name_and_command(spec: &Spec) -> Result<(String, String)> {
    let name = identity_value(spec, "name")?;
    let command = text_field(spec, "name", "command")
        .with_context(|| format!("alias '{name}' has no command"))?;
    Ok((name, command))
}

/// Aliases defined in one file
pub struct Aliases {
    path: PathBuf,
    matcher: FieldMatcher,
}

impl Aliases {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            matcher: FieldMatcher::new(IdentityFields::single("name"), MissingField::Strict),
        }
    }

    fn edit(&self, file: &mut AliasFile, diff: &declarative::Diff) -> Result<()> {
        for spec in &diff.to_remove {
            file.remove(&identity_value(spec, "name")?);
        }
        for spec in &diff.to_add {
            let (name, command) = name_and_command(spec)?;
            file.append(&name, &command);
        }
        for change in &diff.to_modify {
            let (name, command) = name_and_command(&change.to)?;
            file.set(&name, &command);
        }
        Ok(())
    }
}

impl Backend for Aliases {
    fn name(&self) -> &str {
        "aliases"
    }

    fn matcher(&self) -> &dyn Matcher {
        &self.matcher
    }

    fn refresh(&mut self, _desired: &[Spec]) -> Result<Refresh> {
        Ok(Refresh::Available(AliasFile::read(&self.path)?.entries()))
    }

    fn add(&mut self, specs: &[Spec]) -> Result<()> {
        let mut file = AliasFile::read(&self.path)?;
        for spec in specs {
            let (name, command) = name_and_command(spec)?;
            file.append(&name, &command);
        }
        file.write(&self.path)
    }

    fn remove(&mut self, specs: &[Spec]) -> Result<()> {
        let mut file = AliasFile::read(&self.path)?;
        for spec in specs {
            file.remove(&identity_value(spec, "name")?);
        }
        file.write(&self.path)
    }

    fn modify_strategy(&self) -> ModifyStrategy {
        ModifyStrategy::InPlace
    }

    fn modify(&mut self, new: &[Spec], _old: &[Spec]) -> Result<()> {
        let mut file = AliasFile::read(&self.path)?;
        for spec in new {
            let (name, command) = name_and_command(spec)?;
            file.set(&name, &command);
        }
        file.write(&self.path)
    }
}

impl Resource for Aliases {
    fn preview(&self, diff: &declarative::Diff) -> Result<Option<TextPreview>> {
        let before = AliasFile::read(&self.path)?;
        let mut after = before.clone();
        self.edit(&mut after, diff)?;
        Ok(Some(TextPreview {
            path: self.path.clone(),
            before: before.render(),
            after: after.render(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{ApplyOptions, DiffOptions, NoProgress, Plan, apply, plan};
    use pretty_assertions::assert_eq;

    const FILE: &str = "# my aliases\nalias ll='ls -alF'\nexport EDITOR=vim\nalias gs=\"git status\"\n";

    fn alias(name: &str, command: &str) -> Spec {
        Spec::from(Record::new().with("name", name).with("command", command))
    }

    fn setup(content: &str) -> (tempfile::TempDir, Aliases) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".bash_aliases");
        fs::write(&path, content).unwrap();
        let backend = Aliases::new(path);
        (dir, backend)
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("alias ll='ls -l'"), Some(("ll", "'ls -l'")));
        assert_eq!(parse_line("  alias  k=kubectl"), Some(("k", "kubectl")));
        assert_eq!(parse_line("aliasx=1"), None);
        assert_eq!(parse_line("# alias ll='ls'"), None);
        assert_eq!(parse_line("export A=1"), None);
    }

    #[test]
    fn test_quoting_round_trip() {
        let line = render_line("say", "echo 'hi'");
        assert_eq!(line, r"alias say='echo '\''hi'\'''");

        let (_, value) = parse_line(&line).unwrap();
        assert_eq!(unquote(value), "echo 'hi'");
        assert_eq!(unquote(r#""a \"b\"""#), r#"a "b""#);
    }

    #[test]
    fn test_refresh_reads_entries() {
        let (_dir, mut backend) = setup(FILE);
        let Refresh::Available(observed) = backend.refresh(&[]).unwrap() else {
            panic!("file backends are always available");
        };

        assert_eq!(observed, vec![alias("ll", "ls -alF"), alias("gs", "git status")]);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = Aliases::new(dir.path().join("none"));
        assert_eq!(backend.refresh(&[]).unwrap(), Refresh::Available(Vec::new()));
    }

    #[test]
    fn test_modify_keeps_position_and_other_lines() {
        let (_dir, mut backend) = setup(FILE);
        let desired = vec![
            alias("ll", "ls -la"),
            alias("gs", "git status"),
            alias("k", "kubectl"),
        ];

        let Plan::Ready(diff) = plan(&mut backend, &desired, &[], &DiffOptions::default()).unwrap()
        else {
            panic!("file backends are always available");
        };
        assert_eq!(diff.to_modify.len(), 1);
        apply(&diff, &mut backend, &ApplyOptions::default(), &mut NoProgress).unwrap();

        assert_eq!(
            fs::read_to_string(&backend.path).unwrap(),
            "# my aliases\nalias ll='ls -la'\nexport EDITOR=vim\nalias gs=\"git status\"\nalias k='kubectl'\n"
        );
    }

    #[test]
    fn test_remove_missing_alias_is_noop() {
        let (_dir, mut backend) = setup(FILE);
        backend.remove(&[alias("nope", "true")]).unwrap();
        assert_eq!(fs::read_to_string(&backend.path).unwrap(), FILE);
    }

    #[test]
    fn test_add_without_command_fails() {
        let (_dir, mut backend) = setup("");
        let err = backend.add(&[Spec::from("ll")]).unwrap_err();
        assert!(err.to_string().contains("has no command"));
    }

    #[test]
    fn test_preview_matches_apply() {
        let (_dir, mut backend) = setup(FILE);
        let desired = vec![alias("ll", "ls -alF")];
        let opts = DiffOptions {
            mode: declarative::Mode::Stateful,
            ..Default::default()
        };

        let Plan::Ready(diff) = plan(&mut backend, &desired, &[alias("gs", "git status")], &opts).unwrap()
        else {
            panic!("file backends are always available");
        };
        let preview = backend.preview(&diff).unwrap().unwrap();
        apply(&diff, &mut backend, &ApplyOptions::default(), &mut NoProgress).unwrap();

        assert_eq!(preview.before, FILE);
        assert_eq!(preview.after, fs::read_to_string(&backend.path).unwrap());
        assert_eq!(
            backend.refresh(&[]).unwrap(),
            Refresh::Available(vec![alias("ll", "ls -alF")])
        );
    }
}
