//! # Declarative
//!
//! Reconciliation of list-valued system state.
//!
//! Given a desired list of entities (packages, ssh host blocks, shell
//! aliases, ...) and the observed list read from the live system, compute
//! the additions, removals and modifications that converge one to the other,
//! then apply them through a pluggable backend.
//!
//! ## Core Concepts
//!
//! - **Spec**: one list entry, either a bare identifier or a [`Record`]
//! - **Matcher**: identity ("same entity?") and equality ("already in the
//!   desired state?") rules, injected per backend
//! - **Diff**: disjoint partition into add / remove / modify / unchanged
//! - **Backend**: refreshes the observed list and applies changes
//! - **WireCodec**: converts normalized values to the tokens a backend
//!   writes (`true` ↔ `yes`) at the backend boundary
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{ApplyOptions, DiffOptions, NoProgress, Plan, apply, plan};
//!
//! let mut backend = AptBackend::new(runner);
//! let desired = vec!["curl".into(), "wget".into()];
//!
//! if let Plan::Ready(diff) = plan(&mut backend, &desired, &[], &DiffOptions::default())? {
//!     apply(&diff, &mut backend, &ApplyOptions::default(), &mut NoProgress)?;
//! }
//! ```

pub mod apply;
pub mod backend;
pub mod batch;
pub mod diff;
pub mod equality;
pub mod error;
pub mod identity;
pub mod matcher;
pub mod planner;
pub mod progress;
pub mod types;
pub mod wire;

// Re-export main types at crate root
pub use apply::{ApplyOptions, ApplySummary, apply};
pub use backend::{Backend, BoxedBackend, ModifyStrategy};
pub use batch::{Batch, batch_by_flags};
pub use diff::{Change, Diff, DiffOptions, DiffSummary, DuplicatePolicy, Mode, compute};
pub use equality::{MissingField, is_equal_state};
pub use error::{Error, Result};
pub use identity::{IdentityFields, is_same_entity};
pub use matcher::{FieldMatcher, FnMatcher, Matcher};
pub use planner::{Plan, plan};
pub use progress::{NoProgress, ProgressCallback, Step};
pub use types::{Record, Refresh, Spec, Value};
pub use wire::{Converter, WireCodec};
