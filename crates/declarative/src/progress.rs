//! Progress reporting for the apply sequencer
//!
//! Lets callers plug in spinners or log lines without the core depending
//! on a UI crate.

use std::fmt;

/// One step of an apply pass, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    RefreshIndex,
    Remove,
    Add,
    Modify,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RefreshIndex => "refresh index",
            Self::Remove => "remove",
            Self::Add => "add",
            Self::Modify => "modify",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress callback for apply operations
pub trait ProgressCallback {
    /// Called before a step runs against `count` entities
    fn on_step_start(&mut self, backend: &str, step: Step, count: usize);

    /// Called after a step succeeded
    fn on_step_complete(&mut self, backend: &str, step: Step);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_step_start(&mut self, _backend: &str, _step: Step, _count: usize) {}
    fn on_step_complete(&mut self, _backend: &str, _step: Step) {}
}
