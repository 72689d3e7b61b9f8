//! Host/Match block config files
//!
//! Reads and rewrites files laid out like `~/.ssh/config`: an optional
//! preamble of global options followed by `Host` and `Match` blocks, each
//! with an indented `Key Value` body.
//!
//! ```text
//! Host github.com
//!   User git
//!
//! Match host *.internal
//!   ProxyJump bastion
//! ```
//!
//! Comments are not preserved. Blank lines between blocks are, except
//! where an edit normalizes them.

pub mod edit;
pub mod error;
pub mod parser;
pub mod types;
pub mod writer;

pub use error::{Error, Result};
pub use parser::{parse_file, parse_string};
pub use types::{Anchor, AnchorKind, Block, Document};
pub use writer::{render_block, write_file, write_string};
