//! Core types for block config files.

use std::fmt;

/// Keyword that opens a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnchorKind {
    /// `Host <patterns>`
    Host,
    /// `Match <criteria>`
    Match,
}

impl AnchorKind {
    /// The keyword as written in the file.
    pub fn keyword(&self) -> &'static str {
        match self {
            AnchorKind::Host => "Host",
            AnchorKind::Match => "Match",
        }
    }

    /// Parse a keyword, ignoring case (`host`, `HOST`, ...).
    pub fn from_keyword(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("host") {
            Some(AnchorKind::Host)
        } else if s.eq_ignore_ascii_case("match") {
            Some(AnchorKind::Match)
        } else {
            None
        }
    }
}

impl fmt::Display for AnchorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// The identity of a block: its keyword and value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Anchor {
    /// Host or Match
    pub kind: AnchorKind,
    /// Everything after the keyword, e.g. `github.com` or `host a exec true`
    pub value: String,
}

impl Anchor {
    /// Create an anchor.
    pub fn new(kind: AnchorKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Create a `Host` anchor.
    pub fn host(value: impl Into<String>) -> Self {
        Self::new(AnchorKind::Host, value)
    }

    /// Create a `Match` anchor.
    pub fn matching(value: impl Into<String>) -> Self {
        Self::new(AnchorKind::Match, value)
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.value)
    }
}

/// One anchored block: the anchor line plus its `Key Value` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Anchor line
    pub anchor: Anchor,
    /// Body fields in file order
    pub fields: Vec<(String, String)>,
    /// Blank lines before the anchor line (only kept for the first block)
    pub leading_blank: usize,
    /// Blank lines after the last body line
    pub trailing_blank: usize,
}

impl Block {
    /// Create a block with no fields.
    pub fn new(anchor: Anchor) -> Self {
        Self {
            anchor,
            fields: Vec::new(),
            leading_blank: 0,
            trailing_blank: 0,
        }
    }

    /// Add a field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    /// Look up the first value of a field, ignoring keyword case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// A parsed block config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// Lines before the first anchor (global options), without comments
    pub preamble: Vec<String>,
    /// Blocks in file order
    pub blocks: Vec<Block>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the document has neither preamble nor blocks.
    pub fn is_empty(&self) -> bool {
        self.preamble.is_empty() && self.blocks.is_empty()
    }

    /// Anchors of every block, in order.
    pub fn anchors(&self) -> impl Iterator<Item = &Anchor> {
        self.blocks.iter().map(|b| &b.anchor)
    }
}
