//! Execution engine
//!
//! 1. Planning - refresh every configured backend and diff it
//! 2. Display - show the changes, with text diffs for managed files
//! 3. Executing - apply backends in a fixed order, stopping at the first failure

pub mod differ;
pub mod executor;

pub use differ::display_plans;
pub use executor::{ExecuteOptions, execute, plan_all};
