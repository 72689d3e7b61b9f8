//! Render a [`Document`] back to text.

use crate::error::{Error, Result};
use crate::types::{Block, Document};
use std::path::Path;

/// Indentation used for block bodies.
const INDENT: &str = "  ";

/// Render a single block: the anchor line followed by its indented fields.
pub fn render_block(block: &Block) -> String {
    let mut out = format!("{}\n", block.anchor);
    for (key, value) in &block.fields {
        out.push_str(INDENT);
        out.push_str(key);
        out.push(' ');
        out.push_str(value);
        out.push('\n');
    }
    out
}

/// Render a whole document.
pub fn write_string(document: &Document) -> String {
    let mut out = String::new();

    for line in &document.preamble {
        out.push_str(line);
        out.push('\n');
    }

    for block in &document.blocks {
        out.push_str(&"\n".repeat(block.leading_blank));
        out.push_str(&render_block(block));
        out.push_str(&"\n".repeat(block.trailing_blank));
    }

    out
}

/// Write a document to disk, creating parent directories as needed.
pub fn write_file(document: &Document, path: &Path) -> Result<()> {
    let io_err = |source| Error::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    std::fs::write(path, write_string(document)).map_err(io_err)?;
    log::debug!("wrote {} block(s) to {}", document.blocks.len(), path.display());
    Ok(())
}
