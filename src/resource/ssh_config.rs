//! ssh client config (`~/.ssh/config`)
//!
//! Entries are tables keyed by `Host` or `Match`:
//!
//! ```toml
//! [[ssh.hosts]]
//! Host = "github.com"
//! User = "git"
//! AddKeysToAgent = true
//! ```
//!
//! Keywords are case-insensitive and booleans are written as `yes`/`no`.
//! A changed block is removed and re-appended at the end of the file.

use anyhow::{Context, Result};
use blockconf::{Anchor, AnchorKind, Block, Document};
use declarative::{
    Backend, Converter, Diff, FieldMatcher, IdentityFields, Matcher, MissingField, Record,
    Refresh, Spec, Value, WireCodec,
};
use std::fs;
use std::path::PathBuf;

use super::{Resource, TextPreview};

/// Keywords whose value is `yes` or `no`
const YES_NO: &[&str] = &[
    "AddKeysToAgent",
    "BatchMode",
    "CheckHostIP",
    "Compression",
    "ExitOnForwardFailure",
    "ForwardAgent",
    "ForwardX11",
    "ForwardX11Trusted",
    "GSSAPIAuthentication",
    "HashKnownHosts",
    "IdentitiesOnly",
    "PasswordAuthentication",
    "PubkeyAuthentication",
    "StrictHostKeyChecking",
    "TCPKeepAlive",
    "UseKeychain",
    "VisualHostKey",
];

/// Keywords whose value is a number
const NUMERIC: &[&str] = &[
    "ConnectTimeout",
    "ConnectionAttempts",
    "NumberOfPasswordPrompts",
    "Port",
    "ServerAliveCountMax",
    "ServerAliveInterval",
];

/// Other keywords, listed for their spelling
const KNOWN: &[&str] = &[
    "CertificateFile",
    "Ciphers",
    "ControlMaster",
    "ControlPath",
    "ControlPersist",
    "HostName",
    "IdentityAgent",
    "IdentityFile",
    "KexAlgorithms",
    "LocalForward",
    "LogLevel",
    "PreferredAuthentications",
    "ProxyCommand",
    "ProxyJump",
    "RemoteForward",
    "RequestTTY",
    "SendEnv",
    "SetEnv",
    "User",
    "UserKnownHostsFile",
];

fn codec() -> WireCodec {
    NUMERIC
        .iter()
        .fold(WireCodec::yes_no(YES_NO.iter().copied()), |codec, k| {
            codec.field(*k, Converter::Int)
        })
        .case_insensitive()
}

/// The conventional spelling of a keyword, or the keyword as given
fn keyword_case(key: &str) -> &str {
    YES_NO
        .iter()
        .chain(NUMERIC)
        .chain(KNOWN)
        .chain(&["Host", "Match"])
        .find(|k| k.eq_ignore_ascii_case(key))
        .copied()
        .unwrap_or(key)
}

/// Decode a token, keeping it as text when it is not the expected kind
///
/// `AddKeysToAgent ask` and `Port %p`-style values are legal ssh even where
/// the keyword is usually boolean or numeric.
fn decode(codec: &WireCodec, key: &str, token: &str) -> Value {
    codec
        .decode_value(key, token)
        .unwrap_or_else(|_| Value::Text(token.to_string()))
}

/// The block anchor of a spec; a bare string is a `Host` pattern
fn anchor_of(spec: &Spec) -> Option<Anchor> {
    let record = spec.normalize("Host");
    record.iter().find_map(|(key, value)| {
        let kind = AnchorKind::from_keyword(key)?;
        Some(Anchor::new(kind, value.to_string()))
    })
}

/// Identity and equality over ssh entries
///
/// Both sides are brought to one form before comparing: keywords
/// lowercased, values passed through the wire codec so that `true`, `"yes"`
/// and `yes` in the file agree.
pub struct SshMatcher {
    codec: WireCodec,
    fields: FieldMatcher,
}

impl SshMatcher {
    fn new(codec: WireCodec) -> Self {
        Self {
            codec,
            fields: FieldMatcher::new(IdentityFields::one_of(["host", "match"]), MissingField::Strict),
        }
    }

    fn canonical(&self, spec: &Spec) -> Spec {
        let record = spec.normalize("Host");
        let canonical = record.iter().fold(Record::new(), |acc, (key, value)| {
            let token = self.codec.encode_value(key, value);
            acc.with(key.to_ascii_lowercase(), decode(&self.codec, key, &token))
        });
        Spec::from(canonical)
    }
}

impl Matcher for SshMatcher {
    fn is_same_entity(&self, a: &Spec, b: &Spec) -> bool {
        self.fields
            .is_same_entity(&self.canonical(a), &self.canonical(b))
    }

    fn is_equal_state(&self, desired: &Spec, observed: &Spec) -> bool {
        self.fields
            .is_equal_state(&self.canonical(desired), &self.canonical(observed))
    }

    fn identity_of(&self, spec: &Spec) -> String {
        anchor_of(spec).map_or_else(|| spec.to_string(), |anchor| anchor.to_string())
    }
}

/// Host and Match blocks in an ssh client config file
pub struct SshConfig {
    path: PathBuf,
    matcher: SshMatcher,
}

impl SshConfig {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            matcher: SshMatcher::new(codec()),
        }
    }

    fn codec(&self) -> &WireCodec {
        &self.matcher.codec
    }

    fn read(&self) -> Result<Document> {
        blockconf::parse_file(&self.path)
            .with_context(|| format!("Failed to parse {}", self.path.display()))
    }

    fn write(&self, doc: &Document) -> Result<()> {
        blockconf::write_file(doc, &self.path)?;
        Ok(())
    }

    /// An observed entry from a parsed block
    ///
    /// ssh uses the first value of a repeated keyword, so later ones are
    /// dropped.
    fn spec_of(&self, block: &Block) -> Spec {
        let record = block.fields.iter().fold(
            Record::new().with(block.anchor.kind.keyword(), block.anchor.value.as_str()),
            |acc, (key, token)| {
                if acc.keys().any(|k| k.eq_ignore_ascii_case(key)) {
                    log::debug!("ignoring repeated `{key}` in `{}`", block.anchor);
                    acc
                } else {
                    acc.with(key.as_str(), decode(self.codec(), key, token))
                }
            },
        );
        Spec::from(record)
    }

    /// The block to write for a desired entry
    fn block_of(&self, spec: &Spec) -> Result<Block> {
        let anchor = anchor_of(spec).with_context(|| format!("ssh entry {spec} has no Host or Match"))?;
        let record = spec.normalize("Host");
        let block = record
            .iter()
            .filter(|(key, _)| AnchorKind::from_keyword(key).is_none())
            .fold(Block::new(anchor), |block, (key, value)| {
                block.with_field(keyword_case(key), self.codec().encode_value(key, value))
            });
        Ok(block)
    }

    /// Remove the block each spec was observed from
    ///
    /// Several blocks may share an anchor, so the one whose content equals
    /// the spec goes; the first block with the anchor is the fallback.
    fn remove_from(&self, doc: &mut Document, specs: &[Spec]) -> Result<()> {
        for spec in specs {
            let anchor = anchor_of(spec).with_context(|| format!("ssh entry {spec} has no Host or Match"))?;
            let exact = doc.blocks.iter().position(|block| {
                let observed = self.spec_of(block);
                self.matcher.is_same_entity(spec, &observed)
                    && self.matcher.is_equal_state(spec, &observed)
            });
            match exact {
                Some(index) => {
                    doc.remove_at(index);
                }
                None => {
                    doc.remove(&anchor)?;
                }
            }
        }
        Ok(())
    }

    fn add_to(&self, doc: &mut Document, specs: &[Spec]) -> Result<()> {
        for spec in specs {
            doc.insert(self.block_of(spec)?);
        }
        Ok(())
    }
}

impl Backend for SshConfig {
    fn name(&self) -> &str {
        "ssh"
    }

    fn matcher(&self) -> &dyn Matcher {
        &self.matcher
    }

    fn refresh(&mut self, _desired: &[Spec]) -> Result<Refresh> {
        let doc = self.read()?;
        Ok(Refresh::Available(
            doc.blocks.iter().map(|b| self.spec_of(b)).collect(),
        ))
    }

    fn add(&mut self, specs: &[Spec]) -> Result<()> {
        let mut doc = self.read()?;
        self.add_to(&mut doc, specs)?;
        self.write(&doc)
    }

    fn remove(&mut self, specs: &[Spec]) -> Result<()> {
        let mut doc = self.read()?;
        self.remove_from(&mut doc, specs)?;
        self.write(&doc)
    }
}

impl Resource for SshConfig {
    fn preview(&self, diff: &Diff) -> Result<Option<TextPreview>> {
        let before = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", self.path.display()));
            }
        };

        let mut doc = self.read()?;
        let old: Vec<Spec> = diff.to_modify.iter().map(|c| c.from.clone()).collect();
        let new: Vec<Spec> = diff.to_modify.iter().map(|c| c.to.clone()).collect();
        self.remove_from(&mut doc, &diff.to_remove)?;
        self.remove_from(&mut doc, &old)?;
        self.add_to(&mut doc, &diff.to_add)?;
        self.add_to(&mut doc, &new)?;

        Ok(Some(TextPreview {
            path: self.path.clone(),
            before,
            after: blockconf::write_string(&doc),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{ApplyOptions, DiffOptions, Mode, NoProgress, Plan, apply, plan};
    use pretty_assertions::assert_eq;

    fn host(name: &str) -> Record {
        Record::new().with("Host", name)
    }

    fn setup(content: &str) -> (tempfile::TempDir, SshConfig) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ssh").join("config");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        (dir, SshConfig::new(path))
    }

    fn ready(plan: Plan) -> Diff {
        match plan {
            Plan::Ready(diff) => diff,
            Plan::Unavailable { reason } => panic!("ssh is always available: {reason}"),
        }
    }

    #[test]
    fn test_keyword_case() {
        assert_eq!(keyword_case("addkeystoagent"), "AddKeysToAgent");
        assert_eq!(keyword_case("HOSTNAME"), "HostName");
        assert_eq!(keyword_case("SomethingNew"), "SomethingNew");
    }

    #[test]
    fn test_refresh_decodes_wire_tokens() {
        let (_dir, mut backend) = setup("Host gh\n  port 2222\n  ForwardAgent no\n  AddKeysToAgent ask\n");
        let Refresh::Available(observed) = backend.refresh(&[]).unwrap() else {
            panic!("ssh is always available");
        };

        assert_eq!(
            observed,
            vec![Spec::from(
                host("gh")
                    .with("port", 2222)
                    .with("ForwardAgent", false)
                    .with("AddKeysToAgent", "ask")
            )]
        );
    }

    #[test]
    fn test_add_host_block() {
        let (_dir, mut backend) = setup("Host *\n  AddKeysToAgent yes\n");
        let desired = vec![
            Spec::from(host("*").with("AddKeysToAgent", true)),
            Spec::from(host("new.com").with("AddKeysToAgent", true)),
        ];

        let diff = ready(plan(&mut backend, &desired, &[], &DiffOptions::default()).unwrap());
        assert_eq!(diff.to_add.len(), 1);
        assert_eq!(diff.unchanged.len(), 1);
        apply(&diff, &mut backend, &ApplyOptions::default(), &mut NoProgress).unwrap();

        assert_eq!(
            fs::read_to_string(&backend.path).unwrap(),
            "Host *\n  AddKeysToAgent yes\n\nHost new.com\n  AddKeysToAgent yes\n"
        );
    }

    #[test]
    fn test_equality_ignores_keyword_case_and_wire_form() {
        let matcher = SshMatcher::new(codec());
        let desired = Spec::from(host("gh").with("Port", "22").with("ForwardAgent", "yes"));
        let observed = Spec::from(
            Record::new()
                .with("host", "gh")
                .with("port", 22)
                .with("forwardagent", true),
        );

        assert!(matcher.is_same_entity(&desired, &observed));
        assert!(matcher.is_equal_state(&desired, &observed));
        assert!(!matcher.is_equal_state(&Spec::from(host("gh")), &observed));
    }

    #[test]
    fn test_host_and_match_are_distinct_identities() {
        let matcher = SshMatcher::new(codec());
        let by_host = Spec::from(host("all"));
        let by_match = Spec::from(Record::new().with("Match", "all"));

        assert!(!matcher.is_same_entity(&by_host, &by_match));
        assert!(matcher.is_same_entity(&Spec::from("all"), &by_host));
        assert_eq!(matcher.identity_of(&by_match), "Match all");
    }

    #[test]
    fn test_changed_block_moves_to_end() {
        let (_dir, mut backend) =
            setup("Host a\n  User alice\n\nHost b\n  User bob\n");
        let desired = vec![
            Spec::from(host("a").with("User", "root")),
            Spec::from(host("b").with("User", "bob")),
        ];

        let diff = ready(plan(&mut backend, &desired, &[], &DiffOptions::default()).unwrap());
        let preview = backend.preview(&diff).unwrap().unwrap();
        apply(&diff, &mut backend, &ApplyOptions::default(), &mut NoProgress).unwrap();

        let written = fs::read_to_string(&backend.path).unwrap();
        assert_eq!(written, "Host b\n  User bob\n\nHost a\n  User root\n");
        assert_eq!(preview.after, written);
    }

    #[test]
    fn test_stateful_removal_keeps_unmanaged_blocks() {
        let (_dir, mut backend) = setup("Host keep\n  User me\n\nHost old\n  User me\n");
        let opts = DiffOptions {
            mode: Mode::Stateful,
            ..Default::default()
        };
        let managed = vec![Spec::from(host("old").with("User", "me"))];

        let diff = ready(plan(&mut backend, &[], &managed, &opts).unwrap());
        assert_eq!(diff.to_remove.len(), 1);
        apply(&diff, &mut backend, &ApplyOptions::default(), &mut NoProgress).unwrap();

        assert_eq!(
            fs::read_to_string(&backend.path).unwrap(),
            "Host keep\n  User me\n"
        );
    }

    #[test]
    fn test_duplicate_blocks_keep_the_matching_one() {
        let (_dir, mut backend) = setup("Host a\n  Port 22\n\nHost a\n  Port 2222\n");
        let desired = vec![Spec::from(host("a").with("Port", 22))];

        let diff = ready(plan(&mut backend, &desired, &[], &DiffOptions::default()).unwrap());
        assert_eq!(diff.to_remove, vec![Spec::from(host("a").with("Port", 2222))]);
        let preview = backend.preview(&diff).unwrap().unwrap();
        apply(&diff, &mut backend, &ApplyOptions::default(), &mut NoProgress).unwrap();

        let written = fs::read_to_string(&backend.path).unwrap();
        assert_eq!(written, "Host a\n  Port 22\n");
        assert_eq!(preview.after, written);

        let again = ready(plan(&mut backend, &desired, &[], &DiffOptions::default()).unwrap());
        assert!(again.is_empty());
    }

    #[test]
    fn test_repeated_keyword_uses_first_value() {
        let (_dir, mut backend) = setup("Host a\n  User alice\n  user bob\n");
        let Refresh::Available(observed) = backend.refresh(&[]).unwrap() else {
            panic!("ssh is always available");
        };
        assert_eq!(observed, vec![Spec::from(host("a").with("User", "alice"))]);

        let desired = vec![Spec::from(host("a").with("User", "bob"))];
        let diff = ready(plan(&mut backend, &desired, &[], &DiffOptions::default()).unwrap());
        assert_eq!(diff.to_modify.len(), 1);
        apply(&diff, &mut backend, &ApplyOptions::default(), &mut NoProgress).unwrap();

        assert_eq!(
            fs::read_to_string(&backend.path).unwrap(),
            "Host a\n  User bob\n"
        );
    }

    #[test]
    fn test_declared_field_order_is_written() {
        let (_dir, mut backend) = setup("");
        let config: crate::config::Config = toml::from_str(
            "[[ssh.hosts]]\nHost = \"gh\"\nUser = \"git\"\nAddKeysToAgent = true\n",
        )
        .unwrap();

        backend.add(&config.ssh.hosts).unwrap();
        assert_eq!(
            fs::read_to_string(&backend.path).unwrap(),
            "Host gh\n  User git\n  AddKeysToAgent yes\n"
        );
    }

    #[test]
    fn test_remove_missing_block_leaves_file() {
        let content = "Host a\n  User alice\n";
        let (_dir, mut backend) = setup(content);

        backend.remove(&[Spec::from("gone.example")]).unwrap();
        assert_eq!(fs::read_to_string(&backend.path).unwrap(), content);
    }

    #[test]
    fn test_missing_file_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = SshConfig::new(dir.path().join(".ssh/config"));

        assert_eq!(backend.refresh(&[]).unwrap(), Refresh::Available(Vec::new()));
        backend
            .add(&[Spec::from(host("gh").with("identityfile", "~/.ssh/gh"))])
            .unwrap();
        assert_eq!(
            fs::read_to_string(&backend.path).unwrap(),
            "Host gh\n  IdentityFile ~/.ssh/gh\n"
        );
    }

    #[test]
    fn test_entry_without_anchor_fails() {
        let (_dir, mut backend) = setup("");
        let err = backend
            .add(&[Spec::from(Record::new().with("User", "git"))])
            .unwrap_err();
        assert!(err.to_string().contains("no Host or Match"));
    }
}
