//! Edits on a parsed [`Document`].
//!
//! Blocks are located by matching the anchor against each rendered anchor
//! line. The keyword and spacing are loose, so `host  example.com` in the
//! file finds `Host example.com`; the value is matched exactly.

use crate::error::Result;
use crate::types::{Anchor, Block, Document};
use regex::Regex;

/// Build the search pattern for an anchor line.
fn anchor_pattern(anchor: &Anchor) -> Result<Regex> {
    let words: Vec<String> = anchor
        .value
        .split_whitespace()
        .map(regex::escape)
        .collect();
    let pattern = format!(r"^\s*(?i:{})\s+{}\s*$", anchor.kind.keyword(), words.join(r"\s+"));
    Ok(Regex::new(&pattern)?)
}

impl Document {
    /// Index of the first block whose anchor line matches `anchor`.
    pub fn position(&self, anchor: &Anchor) -> Result<Option<usize>> {
        let pattern = anchor_pattern(anchor)?;
        Ok(self
            .blocks
            .iter()
            .position(|block| pattern.is_match(&block.anchor.to_string())))
    }

    /// Find the block for `anchor`.
    pub fn find(&self, anchor: &Anchor) -> Result<Option<&Block>> {
        Ok(self.position(anchor)?.map(|i| &self.blocks[i]))
    }

    /// Append a block after the last existing one, separated by exactly one
    /// blank line.
    pub fn insert(&mut self, mut block: Block) {
        block.trailing_blank = 0;
        match self.blocks.last_mut() {
            Some(last) => {
                last.trailing_blank = 1;
                block.leading_blank = 0;
            }
            None => block.leading_blank = usize::from(!self.preamble.is_empty()),
        }
        log::debug!("inserting block `{}`", block.anchor);
        self.blocks.push(block);
    }

    /// Remove the block for `anchor`.
    ///
    /// Returns `false` (and warns) if no block matched; the file is left as
    /// it was.
    pub fn remove(&mut self, anchor: &Anchor) -> Result<bool> {
        let Some(index) = self.position(anchor)? else {
            log::warn!("no block matching `{anchor}`, nothing to remove");
            return Ok(false);
        };

        Ok(self.remove_at(index).is_some())
    }

    /// Remove the block at `index`, keeping the spacing of its neighbours.
    pub fn remove_at(&mut self, index: usize) -> Option<Block> {
        if index >= self.blocks.len() {
            return None;
        }

        let removed = self.blocks.remove(index);
        if index > 0 {
            self.blocks[index - 1].trailing_blank = removed.trailing_blank;
        } else if let Some(next) = self.blocks.first_mut() {
            next.leading_blank = removed.leading_blank;
        }
        log::debug!("removed block `{}`", removed.anchor);
        Some(removed)
    }

    /// Replace the block for `old` with `block`.
    ///
    /// The old block is removed and the new one appended, so the block
    /// moves to the end of the file. Returns whether `old` was found.
    pub fn replace(&mut self, old: &Anchor, block: Block) -> Result<bool> {
        let found = self.remove(old)?;
        self.insert(block);
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::parse_string;
    use crate::types::{Anchor, Block};
    use crate::writer::write_string;
    use pretty_assertions::assert_eq;

    const THREE: &str = "Host a\n  Port 1\n\nHost b\n  Port 2\n\nHost c\n  Port 3\n";

    #[test]
    fn test_insert_after_single_block() {
        let mut document = parse_string("Host *\n  AddKeysToAgent yes\n").unwrap();
        document.insert(Block::new(Anchor::host("new.com")).with_field("AddKeysToAgent", "yes"));

        assert_eq!(
            write_string(&document),
            "Host *\n  AddKeysToAgent yes\n\nHost new.com\n  AddKeysToAgent yes\n"
        );
    }

    #[test]
    fn test_insert_collapses_extra_blank_lines() {
        let mut document = parse_string("Host a\n  Port 1\n\n\n\n").unwrap();
        document.insert(Block::new(Anchor::host("b")).with_field("Port", "2"));

        assert_eq!(write_string(&document), "Host a\n  Port 1\n\nHost b\n  Port 2\n");
    }

    #[test]
    fn test_insert_into_empty() {
        let mut document = parse_string("").unwrap();
        document.insert(Block::new(Anchor::host("a")).with_field("Port", "1"));

        assert_eq!(write_string(&document), "Host a\n  Port 1\n");
    }

    #[test]
    fn test_insert_after_preamble() {
        let mut document = parse_string("IdentitiesOnly yes\n").unwrap();
        document.insert(Block::new(Anchor::host("a")).with_field("Port", "1"));

        assert_eq!(write_string(&document), "IdentitiesOnly yes\n\nHost a\n  Port 1\n");
    }

    #[test]
    fn test_find() {
        let document = parse_string(THREE).unwrap();

        let block = document.find(&Anchor::host("b")).unwrap().unwrap();
        assert_eq!(block.get("Port"), Some("2"));
        assert!(document.find(&Anchor::host("d")).unwrap().is_none());
        assert!(document.find(&Anchor::matching("b")).unwrap().is_none());
    }

    #[test]
    fn test_find_ignores_keyword_case_and_spacing() {
        let document = parse_string("host   a   b\n  Port 1\n").unwrap();
        assert!(document.find(&Anchor::host("a b")).unwrap().is_some());
    }

    #[test]
    fn test_find_escapes_patterns() {
        let document = parse_string("Host *.example.com\n  Port 1\n").unwrap();

        assert!(document.find(&Anchor::host("*.example.com")).unwrap().is_some());
        assert!(document.find(&Anchor::host("a.example.com")).unwrap().is_none());
    }

    #[test]
    fn test_find_matches_value_case() {
        let document = parse_string("Host GitHub.com\n  Port 1\n").unwrap();

        assert!(document.find(&Anchor::host("GitHub.com")).unwrap().is_some());
        assert!(document.find(&Anchor::host("github.com")).unwrap().is_none());
    }

    #[test]
    fn test_remove_at_picks_the_duplicate() {
        let mut document = parse_string("Host a\n  Port 1\n\nHost a\n  Port 2\n").unwrap();

        let removed = document.remove_at(1).unwrap();
        assert_eq!(removed.get("Port"), Some("2"));
        assert_eq!(write_string(&document), "Host a\n  Port 1\n");
        assert!(document.remove_at(5).is_none());
    }

    #[test]
    fn test_remove_middle() {
        let mut document = parse_string(THREE).unwrap();

        assert!(document.remove(&Anchor::host("b")).unwrap());
        assert_eq!(write_string(&document), "Host a\n  Port 1\n\nHost c\n  Port 3\n");
    }

    #[test]
    fn test_remove_last() {
        let mut document = parse_string(THREE).unwrap();

        assert!(document.remove(&Anchor::host("c")).unwrap());
        assert_eq!(write_string(&document), "Host a\n  Port 1\n\nHost b\n  Port 2\n");
    }

    #[test]
    fn test_remove_first_keeps_preamble_spacing() {
        let mut document = parse_string("IdentitiesOnly yes\n\nHost a\n  Port 1\n\nHost b\n  Port 2\n").unwrap();

        assert!(document.remove(&Anchor::host("a")).unwrap());
        assert_eq!(write_string(&document), "IdentitiesOnly yes\n\nHost b\n  Port 2\n");
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut document = parse_string(THREE).unwrap();

        assert!(!document.remove(&Anchor::host("missing")).unwrap());
        assert_eq!(write_string(&document), THREE);
    }

    #[test]
    fn test_replace_moves_block_to_end() {
        let mut document = parse_string(THREE).unwrap();

        let found = document
            .replace(&Anchor::host("a"), Block::new(Anchor::host("a")).with_field("Port", "10"))
            .unwrap();

        assert!(found);
        assert_eq!(
            write_string(&document),
            "Host b\n  Port 2\n\nHost c\n  Port 3\n\nHost a\n  Port 10\n"
        );
    }
}
