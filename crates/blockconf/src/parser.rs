//! Parser for Host/Match block config files.
//!
//! Handles the ssh_config layout:
//! ```text
//! # global options
//! IdentitiesOnly yes
//!
//! Host github.com
//!   User git
//!   IdentityFile ~/.ssh/id_ed25519
//!
//! Match host *.internal exec "true"
//!   ProxyJump bastion
//! ```
//!
//! Full-line comments are dropped. Blank lines are only kept as counts
//! around blocks, enough to re-render the spacing between them.

use crate::error::{Error, Result};
use crate::types::{Anchor, AnchorKind, Block, Document};
use std::path::Path;

/// Parse a block config file from a path.
///
/// A file that doesn't exist yet parses as an empty document.
pub fn parse_file(path: &Path) -> Result<Document> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("{} does not exist, starting empty", path.display());
            return Ok(Document::new());
        }
        Err(source) => {
            return Err(Error::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    parse_string(&content)
}

/// Parse a block config file from a string.
///
/// Any body line that isn't `Key Value` fails the whole parse: a file we
/// only partly understood must not be written back.
pub fn parse_string(content: &str) -> Result<Document> {
    let mut document = Document::new();
    let mut current: Option<Block> = None;
    let mut pending_blank = 0;

    for (line_num, raw) in content.lines().enumerate() {
        let line = raw.trim();

        if line.starts_with('#') {
            continue;
        }

        if line.is_empty() {
            pending_blank += 1;
            continue;
        }

        if let Some(anchor) = parse_anchor(line, line_num + 1)? {
            let mut block = Block::new(anchor);
            match current.take() {
                Some(mut previous) => {
                    previous.trailing_blank = pending_blank;
                    document.blocks.push(previous);
                }
                None => block.leading_blank = pending_blank,
            }
            current = Some(block);
            pending_blank = 0;
            continue;
        }

        match current.as_mut() {
            Some(block) => {
                let (key, value) = split_field(line, line_num + 1)?;
                block.fields.push((key.to_string(), value.to_string()));
            }
            None => {
                if !document.preamble.is_empty() {
                    document
                        .preamble
                        .extend(std::iter::repeat_n(String::new(), pending_blank));
                }
                document.preamble.push(raw.trim_end().to_string());
            }
        }
        pending_blank = 0;
    }

    if let Some(mut last) = current {
        last.trailing_blank = pending_blank;
        document.blocks.push(last);
    }

    Ok(document)
}

/// Recognise a `Host <value>` / `Match <value>` line.
fn parse_anchor(line: &str, line_num: usize) -> Result<Option<Anchor>> {
    let (keyword, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));

    let kind = match AnchorKind::from_keyword(keyword) {
        Some(kind) => kind,
        None => return Ok(None),
    };

    let value = rest.trim();
    if value.is_empty() {
        return Err(Error::Parse {
            line: line_num,
            message: format!("{kind} without a value"),
        });
    }

    Ok(Some(Anchor::new(kind, value)))
}

/// Split a body line on the first run of whitespace.
fn split_field(line: &str, line_num: usize) -> Result<(&str, &str)> {
    match line.split_once(char::is_whitespace) {
        Some((key, value)) if !value.trim().is_empty() => Ok((key, value.trim())),
        _ => Err(Error::Parse {
            line: line_num,
            message: format!("expected `Key Value`, found {line:?}"),
        }),
    }
}
